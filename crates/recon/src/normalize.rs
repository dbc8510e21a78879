//! Key normalization: canonical forms for identifying fields.
//!
//! Every function here is total: bad input yields `None`, never a panic.
//! Only ASCII case mapping is used for identifiers so results do not depend
//! on locale.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a raw value is canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Iban,
    TaxId,
    Name,
    Email,
    Phone,
    Zip,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iban => write!(f, "iban"),
            Self::TaxId => write!(f, "tax_id"),
            Self::Name => write!(f, "name"),
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::Zip => write!(f, "zip"),
        }
    }
}

/// Canonical string for `raw` under `kind`, or `None` if empty/unparseable.
pub fn normalize(raw: &str, kind: FieldKind) -> Option<String> {
    let out = match kind {
        FieldKind::Iban => alnum_upper(raw, |c| c.is_whitespace()),
        FieldKind::TaxId => {
            alnum_upper(raw, |c| c.is_whitespace() || matches!(c, '-' | '.' | '/'))
        }
        FieldKind::Name => normalize_name(raw),
        FieldKind::Email => normalize_email(raw),
        FieldKind::Phone => normalize_phone(raw),
        FieldKind::Zip => alnum_upper(raw, |c| c.is_whitespace() || c == '-'),
    }?;
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Free text as it is compared outside of keys: trimmed, case preserved.
pub fn trim_text(raw: &str) -> Option<&str> {
    let t = raw.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

fn alnum_upper(raw: &str, is_separator: impl Fn(char) -> bool) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_separator(c) {
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            return None;
        }
        out.push(c.to_ascii_uppercase());
    }
    Some(out)
}

fn normalize_name(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control() || c.is_whitespace()).collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed.to_lowercase())
}

fn normalize_email(raw: &str) -> Option<String> {
    let t = raw.trim();
    let (local, domain) = t.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    if t.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return None;
    }
    Some(t.to_ascii_lowercase())
}

fn normalize_phone(raw: &str) -> Option<String> {
    let t = raw.trim();
    let mut out = String::new();
    if t.starts_with('+') {
        out.push('+');
    }
    out.extend(t.chars().filter(|c| c.is_ascii_digit()));
    if let Some(rest) = out.strip_prefix("00") {
        out = format!("+{rest}");
    }
    if out.trim_start_matches('+').is_empty() {
        return None;
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// MatchKey
// ---------------------------------------------------------------------------

const KEY_SEPARATOR: char = '\u{1f}';

/// Normalized identity used to test an incoming row against existing entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    pub fn single(normalized: String) -> Self {
        Self(normalized)
    }

    /// Join already-normalized parts. A unit separator keeps `("a b", "c")`
    /// distinct from `("a", "b c")`.
    pub fn composite<I: IntoIterator<Item = String>>(parts: I) -> Self {
        let joined: Vec<String> = parts.into_iter().collect();
        Self(joined.join(&KEY_SEPARATOR.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in self.0.split(KEY_SEPARATOR) {
            if !first {
                write!(f, " / ")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}
