//! Decimal strings <-> integer cents.
//!
//! The only place amounts exist as text. Everything past this boundary is
//! `i64` minor units; no floating point is involved in either direction.

/// Parse a money string into cents:
/// - Strip currency symbols (`$`, `€`, `£`), thousands commas, whitespace
/// - Handle `(123.45)` → `-12345`
/// - At most two fractional digits unless the extra ones are zeros
/// - Returns None for empty or non-numeric input
pub fn parse_cents(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (paren_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();

    let (sign_negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if paren_negative && sign_negative {
        return None;
    }

    let (whole, frac) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 && frac[2..].chars().any(|c| c != '0') {
        return None;
    }

    let whole_cents = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().ok()?.checked_mul(100)?
    };
    let frac_cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac[..2].parse::<i64>().ok()?,
    };

    let cents = whole_cents.checked_add(frac_cents)?;
    Some(if paren_negative || sign_negative { -cents } else { cents })
}

/// Render cents as a plain decimal string with two fractional digits.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
