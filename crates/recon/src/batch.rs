//! Write batching. The store rejects batches above a hard ceiling, so
//! persistence slices the decision list into fixed-size chunks. Slicing only:
//! order and grouping are never changed.

use crate::error::ReconError;

/// Per-batch write ceiling of the document store.
pub const MAX_BATCH_WRITES: usize = 500;

pub fn write_batches<T>(items: &[T], size: usize) -> Result<std::slice::Chunks<'_, T>, ReconError> {
    if size == 0 || size > MAX_BATCH_WRITES {
        return Err(ReconError::InvalidBatchSize {
            size,
            max: MAX_BATCH_WRITES,
        });
    }
    Ok(items.chunks(size))
}
