//! Entity kinds and the value object that parameterizes the matcher.
//!
//! One matcher serves every kind; what differs is data: which fields form
//! the key, which must be present, which are diffed, and which flag (if any)
//! is exclusive across the kind.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::exclusive::ExclusiveFlagRule;
use crate::model::{Field, FieldValue, Fields};
use crate::normalize::{normalize, FieldKind, MatchKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Contact,
    Category,
    BankAccount,
    Employee,
}

pub const ALL_KINDS: &[EntityKind] = &[
    EntityKind::Contact,
    EntityKind::Category,
    EntityKind::BankAccount,
    EntityKind::Employee,
];

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Category => "category",
            Self::BankAccount => "bank_account",
            Self::Employee => "employee",
        }
    }

    /// Built-in configuration for this kind.
    pub fn config(&self) -> EntityKindConfig {
        match self {
            Self::Contact => contact(),
            Self::Category => category(),
            Self::BankAccount => bank_account(),
            Self::Employee => employee(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        ALL_KINDS
            .iter()
            .find(|k| k.as_str() == wanted)
            .copied()
            .ok_or_else(|| format!("unknown entity kind '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Key strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPart {
    pub field: Field,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    Single(KeyPart),
    /// Every part must be present; otherwise the row has no key.
    Composite(Vec<KeyPart>),
}

impl KeyStrategy {
    pub fn fields(&self) -> Vec<Field> {
        match self {
            Self::Single(p) => vec![p.field],
            Self::Composite(parts) => parts.iter().map(|p| p.field).collect(),
        }
    }

    pub fn key_for(&self, item: &impl Fields) -> Option<MatchKey> {
        match self {
            Self::Single(p) => part_value(item, p).map(MatchKey::single),
            Self::Composite(parts) => {
                let values: Option<Vec<String>> =
                    parts.iter().map(|p| part_value(item, p)).collect();
                values.map(MatchKey::composite)
            }
        }
    }

    /// Key fields holding text that no normalizer accepts.
    pub fn unparseable(&self, item: &impl Fields) -> Vec<Field> {
        let parts = match self {
            Self::Single(p) => std::slice::from_ref(p),
            Self::Composite(parts) => parts.as_slice(),
        };
        parts
            .iter()
            .filter(|p| match item.get(p.field) {
                Some(FieldValue::Text(s)) => !s.trim().is_empty() && normalize(s, p.kind).is_none(),
                _ => false,
            })
            .map(|p| p.field)
            .collect()
    }
}

fn part_value(item: &impl Fields, part: &KeyPart) -> Option<String> {
    match item.get(part.field)? {
        FieldValue::Text(s) => normalize(s, part.kind),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Kind config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EntityKindConfig {
    pub kind: EntityKind,
    /// Bumped whenever the field lists below change meaning.
    pub version: u32,
    pub key: KeyStrategy,
    pub required: Vec<Field>,
    pub comparable: Vec<Field>,
    /// Never diffed, even when a caller asks for them.
    pub ignored: Vec<Field>,
    pub exclusive: Option<ExclusiveFlagRule>,
}

impl EntityKindConfig {
    /// Fields the diff looks at: `compare` (or the built-in list) minus `ignored`.
    pub fn diff_fields(&self, compare: Option<&[Field]>) -> Vec<Field> {
        compare
            .unwrap_or(self.comparable.as_slice())
            .iter()
            .filter(|f| !self.ignored.contains(f))
            .copied()
            .collect()
    }

    /// Key and required fields; a row set without one of these columns is unusable.
    pub fn mandatory_columns(&self) -> Vec<Field> {
        let mut out = self.key.fields();
        for f in &self.required {
            if !out.contains(f) {
                out.push(*f);
            }
        }
        out
    }

    /// Every field this kind reads from a source.
    pub fn known_fields(&self) -> Vec<Field> {
        let mut out = self.mandatory_columns();
        let rest = self
            .comparable
            .iter()
            .chain(self.ignored.iter())
            .chain(self.exclusive.iter().map(|r| &r.flag));
        for f in rest {
            if !out.contains(f) {
                out.push(*f);
            }
        }
        out
    }
}

fn contact() -> EntityKindConfig {
    EntityKindConfig {
        kind: EntityKind::Contact,
        version: 1,
        key: KeyStrategy::Single(KeyPart { field: Field::TaxId, kind: FieldKind::TaxId }),
        required: vec![Field::Name],
        comparable: vec![
            Field::Name,
            Field::ContactType,
            Field::Email,
            Field::Phone,
            Field::Iban,
            Field::Street,
            Field::Zip,
            Field::City,
            Field::Country,
            Field::IsActive,
        ],
        ignored: vec![Field::Note],
        exclusive: None,
    }
}

fn category() -> EntityKindConfig {
    EntityKindConfig {
        kind: EntityKind::Category,
        version: 1,
        key: KeyStrategy::Composite(vec![
            KeyPart { field: Field::CategoryType, kind: FieldKind::Name },
            KeyPart { field: Field::Name, kind: FieldKind::Name },
        ]),
        required: vec![Field::Name, Field::CategoryType],
        comparable: vec![Field::Name, Field::Description, Field::Order, Field::IsActive],
        ignored: vec![Field::Note],
        exclusive: None,
    }
}

fn bank_account() -> EntityKindConfig {
    EntityKindConfig {
        kind: EntityKind::BankAccount,
        version: 1,
        key: KeyStrategy::Single(KeyPart { field: Field::Iban, kind: FieldKind::Iban }),
        required: vec![Field::Name],
        comparable: vec![
            Field::Name,
            Field::BankName,
            Field::Bic,
            Field::Holder,
            Field::Order,
            Field::IsDefault,
            Field::IsActive,
        ],
        ignored: vec![Field::Note],
        exclusive: Some(ExclusiveFlagRule::new(Field::IsDefault)),
    }
}

fn employee() -> EntityKindConfig {
    EntityKindConfig {
        kind: EntityKind::Employee,
        version: 1,
        key: KeyStrategy::Single(KeyPart { field: Field::TaxId, kind: FieldKind::TaxId }),
        required: vec![Field::Name],
        comparable: vec![
            Field::Name,
            Field::Email,
            Field::Phone,
            Field::Iban,
            Field::Street,
            Field::Zip,
            Field::City,
            Field::Salary,
            Field::IsActive,
        ],
        ignored: vec![Field::Note],
        exclusive: None,
    }
}
