//! Generic create/update/skip matcher driven by an `EntityKindConfig`.

use std::collections::BTreeMap;

use crate::error::ReconError;
use crate::exclusive::FlagClaim;
use crate::kind::EntityKindConfig;
use crate::model::{
    Action, ExistingEntity, Field, FieldChange, FieldValue, Fields, MatchDecision, MatchOutcome,
    MatchSummary, ParsedRow, RowSet, SkipReason, ValueType, Warning,
};
use crate::normalize::{normalize, MatchKey};

#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Matched rows are skipped ("already exists") instead of updated.
    pub only_create: bool,
    /// Give the exclusive flag to the first created row when nobody has it.
    pub promote_exclusive: bool,
    /// Replaces the kind's comparable field list.
    pub compare: Option<Vec<Field>>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            only_create: false,
            promote_exclusive: true,
            compare: None,
        }
    }
}

/// Classify every row as create / update / skip against `existing`.
///
/// Abort-class problems (missing key column, exclusive flag claimed twice)
/// return `Err` and no decisions. Same inputs always give the same outcome.
pub fn match_rows(
    config: &EntityKindConfig,
    input: &RowSet,
    existing: &[ExistingEntity],
    options: &MatchOptions,
) -> Result<MatchOutcome, ReconError> {
    if input.kind != config.kind {
        return Err(ReconError::ConfigValidation(format!(
            "rows are '{}' but matcher is configured for '{}'",
            input.kind, config.kind
        )));
    }

    for field in config.mandatory_columns() {
        if !input.columns.contains(&field) {
            return Err(ReconError::MissingColumn {
                source: config.kind.to_string(),
                column: field.to_string(),
            });
        }
    }

    let claim = match config.exclusive {
        Some(ref rule) => rule.check(&input.rows)?,
        None => FlagClaim::Unclaimed,
    };

    log::debug!(
        "matching {} {} row(s) against {} existing",
        input.rows.len(),
        config.kind,
        existing.len()
    );

    let mut warnings = Vec::new();

    let mut diff_fields = Vec::new();
    for field in config.diff_fields(options.compare.as_deref()) {
        if input.columns.contains(&field) {
            diff_fields.push(field);
        } else {
            warnings.push(Warning::MissingColumn { field });
        }
    }

    let index = build_index(config, existing, &mut warnings);

    let mut seen: BTreeMap<MatchKey, usize> = BTreeMap::new();
    let mut decisions = Vec::with_capacity(input.rows.len());

    for row in &input.rows {
        let decision = decide(config, row, &index, &mut seen, &diff_fields, options);
        if decision.action == Action::Create && decision.match_key.is_none() {
            for field in config.key.unparseable(row) {
                warnings.push(Warning::UnparseableIdentifier { row_index: row.row_index, field });
            }
        }
        decisions.push(decision);
    }

    if let Some(ref rule) = config.exclusive {
        let holders = rule.holders(existing);
        match claim {
            FlagClaim::Unclaimed if options.promote_exclusive && holders.is_empty() => {
                // Decisions and rows share order; a row that says "no" keeps it.
                let mut creates = decisions
                    .iter_mut()
                    .zip(&input.rows)
                    .filter(|(d, _)| d.action == Action::Create)
                    .peekable();
                let any_create = creates.peek().is_some();
                let eligible = creates
                    .find(|(_, row)| row.get(rule.flag) != Some(&FieldValue::Flag(false)));
                match eligible {
                    Some((first, _)) => {
                        first.promoted = Some(rule.flag);
                        warnings.push(Warning::ExclusiveFlagPromoted {
                            flag: rule.flag,
                            row_index: first.row_index,
                        });
                    }
                    None if any_create => {
                        warnings.push(Warning::ExclusiveFlagUnassigned { flag: rule.flag });
                    }
                    None => {}
                }
            }
            FlagClaim::ClaimedBy { row_index } => {
                let claimant = decisions
                    .iter()
                    .find(|d| d.row_index == row_index && d.action != Action::Skip);
                if let Some(d) = claimant {
                    for holder in holders {
                        if d.existing_id.as_deref() != Some(holder.id.as_str()) {
                            warnings.push(Warning::ExclusiveFlagMoved {
                                flag: rule.flag,
                                row_index,
                                previous_holder: holder.id.clone(),
                            });
                        }
                    }
                }
            }
            FlagClaim::Unclaimed => {}
        }
    }

    let summary = summarize(&decisions);
    log::info!(
        "{}: {} to create, {} to update, {} to skip",
        config.kind,
        summary.to_create,
        summary.to_update,
        summary.to_skip
    );
    for w in &warnings {
        log::warn!("{}: {w}", config.kind);
    }

    Ok(MatchOutcome {
        kind: config.kind,
        version: config.version,
        summary,
        decisions,
        warnings,
    })
}

fn build_index<'a>(
    config: &EntityKindConfig,
    existing: &'a [ExistingEntity],
    warnings: &mut Vec<Warning>,
) -> BTreeMap<MatchKey, Vec<&'a ExistingEntity>> {
    let mut index: BTreeMap<MatchKey, Vec<&ExistingEntity>> = BTreeMap::new();
    for entity in existing {
        if let Some(key) = config.key.key_for(entity) {
            index.entry(key).or_default().push(entity);
        }
    }

    for (key, entities) in &index {
        if entities.len() > 1 {
            warnings.push(Warning::DuplicateExistingKey {
                key: key.clone(),
                ids: entities.iter().map(|e| e.id.clone()).collect(),
            });
        }
    }

    index
}

fn decide(
    config: &EntityKindConfig,
    row: &ParsedRow,
    index: &BTreeMap<MatchKey, Vec<&ExistingEntity>>,
    seen: &mut BTreeMap<MatchKey, usize>,
    diff_fields: &[Field],
    options: &MatchOptions,
) -> MatchDecision {
    let mut decision = MatchDecision {
        row_index: row.row_index,
        action: Action::Skip,
        existing_id: None,
        match_key: None,
        changes: Vec::new(),
        reason: None,
        promoted: None,
    };

    if let Some(field) = config.required.iter().find(|f| !is_present(row, **f)) {
        decision.reason = Some(SkipReason::MissingRequiredField { field: *field });
        return decision;
    }

    // No canonical identifier: never guess via another field.
    let Some(key) = config.key.key_for(row) else {
        decision.action = Action::Create;
        return decision;
    };
    decision.match_key = Some(key.clone());

    if let Some(first_row) = seen.get(&key) {
        decision.reason = Some(SkipReason::DuplicateWithinFile { first_row: *first_row });
        return decision;
    }
    seen.insert(key.clone(), row.row_index);

    match index.get(&key).map(|v| v.as_slice()) {
        None | Some([]) => {
            decision.action = Action::Create;
        }
        Some([entity]) => {
            decision.existing_id = Some(entity.id.clone());
            if options.only_create {
                decision.reason = Some(SkipReason::AlreadyExists);
                return decision;
            }
            let changes = diff(row, entity, diff_fields);
            if changes.is_empty() {
                decision.reason = Some(SkipReason::NoChanges);
            } else {
                decision.action = Action::Update;
                decision.changes = changes;
            }
        }
        Some(entities) => {
            decision.reason = Some(SkipReason::AmbiguousExisting {
                candidates: entities.iter().map(|e| e.id.clone()).collect(),
            });
        }
    }

    decision
}

fn is_present(row: &ParsedRow, field: Field) -> bool {
    match row.get(field) {
        Some(FieldValue::Text(s)) => !s.trim().is_empty(),
        Some(_) => true,
        None => false,
    }
}

/// Field-by-field diff. Cells left empty in the import are "not provided".
pub fn diff(row: &ParsedRow, entity: &ExistingEntity, fields: &[Field]) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for &field in fields {
        let after = match row.get(field) {
            Some(FieldValue::Text(s)) => match s.trim() {
                "" => continue,
                t => FieldValue::Text(t.to_string()),
            },
            Some(v) => v.clone(),
            None => continue,
        };
        let before = entity.get(field);

        if !same_value(field, &after, before) {
            changes.push(FieldChange {
                field,
                before: before.cloned(),
                after,
            });
        }
    }

    changes
}

fn same_value(field: Field, after: &FieldValue, before: Option<&FieldValue>) -> bool {
    match (after, before) {
        (FieldValue::Text(a), Some(FieldValue::Text(b))) => {
            canonical_text(field, a) == canonical_text(field, b)
        }
        // An unset flag in the store reads as false.
        (FieldValue::Flag(a), None) if field.value_type() == ValueType::Flag => !a,
        (a, Some(b)) => a == b,
        (_, None) => false,
    }
}

fn canonical_text(field: Field, s: &str) -> String {
    field
        .normalizer()
        .and_then(|k| normalize(s, k))
        .unwrap_or_else(|| s.trim().to_string())
}

fn summarize(decisions: &[MatchDecision]) -> MatchSummary {
    let mut summary = MatchSummary::default();
    for d in decisions {
        match d.action {
            Action::Create => summary.to_create += 1,
            Action::Update => summary.to_update += 1,
            Action::Skip => summary.to_skip += 1,
        }
    }
    summary
}
