use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

static TITLE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[—–|-].*$").unwrap());
static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*[чh]").unwrap());
static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*[мm]").unwrap());
static FIRST_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());
static THOUSANDS_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{1,3}(,\d{3})+$").unwrap());

/// Space variants that collapse to a plain ASCII space.
const SPACE_VARIANTS: &[char] = &[
    '\u{00A0}', '\u{1680}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}',
    '\u{2005}', '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{202F}',
    '\u{205F}', '\u{3000}',
];
/// Invisible characters removed outright.
const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{FEFF}'];

/// Date/time layouts tried in order. Date-only layouts are handled separately.
const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%H:%M %d.%m.%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// Canonical form of a piece of page text: entities unescaped, zero-width
/// characters dropped, space variants turned into ASCII spaces, whitespace
/// runs collapsed, trimmed.
pub fn normalize_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let unescaped = html_escape::decode_html_entities(input);
    unescaped
        .replace(ZERO_WIDTH, "")
        .replace(SPACE_VARIANTS, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `normalize_text` for optional input; `None` yields an empty string.
pub fn normalize_opt(input: Option<&str>) -> String {
    input.map(normalize_text).unwrap_or_default()
}

/// Integer reading of a loosely formatted number ("1 250", "1,250", "65%").
///
/// Every character other than ASCII digits is dropped, so separators of any
/// kind are read as thousands separators. A leading minus (ASCII or U+2212)
/// is kept.
pub fn parse_int_like(text: &str) -> Option<i64> {
    let cleaned = normalize_text(text);
    let negative = cleaned.starts_with('-') || cleaned.starts_with('\u{2212}');
    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Float reading of a loosely formatted number.
///
/// With a dot present, commas are thousands separators. Without one, a
/// single comma is the decimal point and repeated commas are thousands
/// separators. When the text carried a percent sign and the magnitude is
/// above 1 the value is turned into a fraction ("65%" -> 0.65, "0.65" -> 0.65).
pub fn parse_float_like(text: &str) -> Option<f64> {
    let cleaned = normalize_text(text);
    let had_percent = cleaned.contains('%');
    let value = parse_decimal(&cleaned, DecimalComma::Single)?;
    if had_percent && value.abs() > 1.0 {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

/// Monetary amount with currency markers stripped ("1 500 ₽", "2,000 руб").
///
/// A comma followed by exactly three digits is a thousands separator,
/// anything else follows the float rules. No percent handling.
pub fn parse_money(text: &str) -> Option<f64> {
    let cleaned = normalize_text(text);
    let compact: String = cleaned
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let mode = if THOUSANDS_COMMA_RE.is_match(&compact) {
        DecimalComma::Never
    } else {
        DecimalComma::Single
    };
    parse_decimal(&compact, mode).filter(|v| *v >= 0.0)
}

#[derive(Clone, Copy)]
enum DecimalComma {
    /// A lone comma acts as the decimal point when no dot is present.
    Single,
    /// Commas are always thousands separators.
    Never,
}

fn parse_decimal(cleaned: &str, comma: DecimalComma) -> Option<f64> {
    let negative = cleaned.starts_with('-') || cleaned.starts_with('\u{2212}');
    let has_dot = cleaned.contains('.');
    let comma_is_decimal = matches!(comma, DecimalComma::Single)
        && !has_dot
        && cleaned.matches(',').count() == 1;

    let mut out = String::with_capacity(cleaned.len());
    let mut seen_point = false;
    for c in cleaned.chars() {
        match c {
            '0'..='9' => out.push(c),
            '.' if !seen_point => {
                seen_point = true;
                out.push('.');
            }
            ',' if comma_is_decimal && !seen_point => {
                seen_point = true;
                out.push('.');
            }
            _ => {}
        }
    }
    if !out.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = out.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a timestamp in any of the known layouts. Date-only inputs land on
/// midnight; offsets are converted to UTC.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let cleaned = normalize_text(text);
    if cleaned.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(&cleaned, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.naive_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Duration in minutes from text like "45 мин", "1ч 23м" or "2h 5m".
/// A bare number is taken as minutes.
pub fn parse_duration_minutes(text: &str) -> Option<u32> {
    let lower = normalize_text(text).to_lowercase();
    let mut total: u32 = 0;
    if let Some(caps) = HOURS_RE.captures(&lower) {
        total = total.checked_add(caps[1].parse::<u32>().ok()?.checked_mul(60)?)?;
    }
    if let Some(caps) = MINUTES_RE.captures(&lower) {
        total = total.checked_add(caps[1].parse::<u32>().ok()?)?;
    }
    if total == 0 {
        if let Some(caps) = FIRST_NUMBER_RE.captures(&lower) {
            total = caps[1].parse().ok()?;
        }
    }
    (total > 0).then_some(total)
}

/// Drop a trailing " — Site" / " | Site" suffix from a title-like string.
pub fn strip_title_suffix(title: &str) -> String {
    let cleaned = normalize_text(title);
    TITLE_SUFFIX_RE.replace(&cleaned, "").trim().to_string()
}

/// First `max_chars` characters of `text`.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ── Tests ──
