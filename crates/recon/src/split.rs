//! Split balancing. Lines must add up to the parent exactly; there is no
//! tolerance because a split decomposes one already-known amount.

use crate::error::ReconError;
use crate::model::{SplitLine, SplitVerdict};

/// `delta = parent − Σ lines`, balanced iff delta is zero.
pub fn balance(parent_cents: i64, line_cents: &[i64]) -> SplitVerdict {
    // i128 so that no combination of i64 inputs can wrap.
    let sum: i128 = line_cents.iter().map(|&c| c as i128).sum();
    let delta = parent_cents as i128 - sum;
    SplitVerdict {
        // Only saturates for absurd inputs; `balanced` is exact either way.
        delta_cents: i64::try_from(delta)
            .unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX }),
        balanced: delta == 0,
    }
}

pub fn balance_lines(parent_cents: i64, lines: &[SplitLine]) -> SplitVerdict {
    let cents: Vec<i64> = lines.iter().map(|l| l.amount_cents).collect();
    balance(parent_cents, &cents)
}

impl SplitVerdict {
    /// Commit guard.
    pub fn ensure_balanced(&self) -> Result<(), ReconError> {
        if self.balanced {
            Ok(())
        } else {
            Err(ReconError::Unbalanced {
                delta_cents: self.delta_cents,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_split() {
        let v = balance(10000, &[6000, 4000]);
        assert_eq!(v, SplitVerdict { delta_cents: 0, balanced: true });
        assert!(v.ensure_balanced().is_ok());
    }

    #[test]
    fn one_cent_short() {
        let v = balance(10000, &[6000, 3999]);
        assert_eq!(v, SplitVerdict { delta_cents: 1, balanced: false });
        assert_eq!(v.ensure_balanced(), Err(ReconError::Unbalanced { delta_cents: 1 }));
    }

    #[test]
    fn over_allocated_is_negative() {
        let v = balance(10000, &[6000, 4001]);
        assert_eq!(v.delta_cents, -1);
        assert!(!v.balanced);
    }

    #[test]
    fn negative_parent_with_signed_lines() {
        let v = balance(-2500, &[-3000, 500]);
        assert!(v.balanced);
    }

    #[test]
    fn no_lines() {
        assert_eq!(balance(0, &[]), SplitVerdict { delta_cents: 0, balanced: true });
        assert_eq!(balance(100, &[]).delta_cents, 100);
    }

    #[test]
    fn extreme_values_do_not_wrap() {
        let v = balance(i64::MAX, &[i64::MAX, 1]);
        assert_eq!(v.delta_cents, -1);
        let v = balance(i64::MIN, &[i64::MAX, i64::MAX]);
        assert_eq!(v.delta_cents, i64::MIN);
        assert!(!v.balanced);
    }

    #[test]
    fn lines_with_metadata() {
        let lines = vec![
            SplitLine {
                amount_cents: 7000,
                kind: "category".into(),
                category_id: Some("cat_rent".into()),
                contact_id: None,
            },
            SplitLine {
                amount_cents: 3000,
                kind: "contact".into(),
                category_id: None,
                contact_id: Some("c_1".into()),
            },
        ];
        assert!(balance_lines(10000, &lines).balanced);
    }
}
