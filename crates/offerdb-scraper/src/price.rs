//! Best-effort conversion of loosely formatted Swedish price text.
//!
//! Accepts the forms seen on promotion cards: `25:90`, `25,90`, `15:-`,
//! `20-30` (a range, averaged), `7990` (öre written without a separator),
//! and any of these wrapped in currency or unit noise. Unparsable input is
//! worth nothing rather than an error.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static RANGE_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d:,.]+").expect("valid range part regex"));

const OERE_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Parses `text` into a price, returning zero when nothing usable is found.
///
/// A hyphenated `low-high` pair resolves to its mean when both ends are
/// positive; otherwise the whole text is parsed as a single price.
#[must_use]
pub fn parse_price(text: &str) -> Decimal {
    if text.is_empty() {
        return Decimal::ZERO;
    }

    if text.contains('-') {
        let mut parts = RANGE_PART_RE.find_iter(text).map(|m| m.as_str());
        if let (Some(low), Some(high)) = (parts.next(), parts.next()) {
            let low = clean_and_parse(low);
            let high = clean_and_parse(high);
            if low > Decimal::ZERO && high > Decimal::ZERO {
                return low + (high - low) / Decimal::TWO;
            }
        }
    }

    clean_and_parse(text)
}

/// Normalizes separators, strips noise, and applies the öre heuristic.
fn clean_and_parse(text: &str) -> Decimal {
    let cleaned: String = text
        .chars()
        .map(|c| if c == ':' || c == ',' { '.' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let Some(value) = parse_plain_decimal(&cleaned) else {
        return Decimal::ZERO;
    };

    // Four or more digits with no kronor separator are öre.
    if value > OERE_THRESHOLD && !text.contains(':') {
        value / Decimal::ONE_HUNDRED
    } else {
        value
    }
}

/// Parses digits with at most one `.`; either side of the point may be empty
/// but not both.
fn parse_plain_decimal(cleaned: &str) -> Option<Decimal> {
    let (int_part, frac_part) = match cleaned.split_once('.') {
        Some((_, frac)) if frac.contains('.') => return None,
        Some((int, frac)) => (int, frac),
        None => (cleaned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let literal = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    };

    Decimal::from_str(&literal).ok()
}

#[cfg(test)]
#[path = "price_test.rs"]
mod tests;
