use chrono::NaiveDateTime;
use tracing::warn;

use super::raw::{RawAttributeMap, RawValue};
use crate::error::{ConstructionError, FieldError, RecordKind};
use crate::parser::text::parse_money;

/// First phase of record construction: coerces fields one by one, collecting
/// every failure instead of stopping at the first.
pub(crate) struct FieldReader<'r> {
    raw: &'r RawAttributeMap,
    issues: Vec<FieldError>,
}

impl<'r> FieldReader<'r> {
    pub fn new(raw: &'r RawAttributeMap) -> Self {
        FieldReader {
            raw,
            issues: Vec::new(),
        }
    }

    /// First of `keys` present in the map.
    pub fn lookup(&self, keys: &[&str]) -> Option<&'r RawValue> {
        keys.iter().find_map(|k| self.raw.get(k))
    }

    pub fn required<T>(
        &mut self,
        field: &'static str,
        keys: &[&str],
        reason: &'static str,
        parse: impl Fn(&RawValue) -> Option<T>,
    ) -> Option<T> {
        let Some(value) = self.lookup(keys) else {
            self.issues.push(FieldError::Missing { field });
            return None;
        };
        let parsed = parse(value);
        if parsed.is_none() {
            self.issues.push(invalid(field, value, reason));
        }
        parsed
    }

    /// Unparseable optional values are logged and dropped.
    pub fn optional<T>(
        &self,
        field: &'static str,
        keys: &[&str],
        parse: impl Fn(&RawValue) -> Option<T>,
    ) -> Option<T> {
        let value = self.lookup(keys)?;
        let parsed = parse(value);
        if parsed.is_none() {
            warn!(field, raw = ?value.to_text(), "ignoring unparseable optional field");
        }
        parsed
    }

    pub fn required_text(&mut self, field: &'static str, keys: &[&str]) -> Option<String> {
        self.required(field, keys, "empty text", RawValue::as_clean_text)
    }

    pub fn required_datetime(&mut self, field: &'static str, keys: &[&str]) -> Option<NaiveDateTime> {
        self.required(field, keys, "no known date format matches", RawValue::as_datetime)
    }

    pub fn text(&self, field: &'static str, keys: &[&str]) -> Option<String> {
        self.optional(field, keys, RawValue::as_clean_text)
    }

    pub fn int(&self, field: &'static str, keys: &[&str]) -> Option<i64> {
        self.optional(field, keys, RawValue::as_int)
    }

    /// Non-negative counter.
    pub fn count(&self, field: &'static str, keys: &[&str]) -> Option<u32> {
        self.optional(field, keys, |v| v.as_int().and_then(|i| u32::try_from(i).ok()))
    }

    pub fn float(&self, field: &'static str, keys: &[&str]) -> Option<f64> {
        self.optional(field, keys, RawValue::as_float)
    }

    pub fn datetime(&self, field: &'static str, keys: &[&str]) -> Option<NaiveDateTime> {
        self.optional(field, keys, RawValue::as_datetime)
    }

    pub fn money(&self, field: &'static str, keys: &[&str]) -> Option<f64> {
        self.optional(field, keys, |v| v.to_text().and_then(|t| parse_money(&t)))
    }

    /// Rate in the 0..1 convention; anything above 1 is read as a percentage.
    pub fn rate(&self, field: &'static str, keys: &[&str]) -> Option<f64> {
        self.float(field, keys).map(normalize_rate)
    }

    pub fn push(&mut self, issue: FieldError) {
        self.issues.push(issue);
    }

    /// Second phase bail-out: every collected issue plus the raw map.
    pub fn into_error(self, kind: RecordKind) -> ConstructionError {
        ConstructionError::new(kind, self.issues, self.raw.clone())
    }
}

fn invalid(field: &'static str, value: &RawValue, reason: &'static str) -> FieldError {
    FieldError::Invalid {
        field,
        raw: value.to_text().unwrap_or_default(),
        reason,
    }
}

pub(crate) fn normalize_rate(rate: f64) -> f64 {
    let rate = if rate > 1.0 { rate / 100.0 } else { rate };
    round4(rate)
}

pub(crate) fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_collects_missing_and_invalid() {
        let raw: RawAttributeMap = [("seat", "abc")].into_iter().collect();
        let mut r = FieldReader::new(&raw);
        assert_eq!(r.required("seat", &["seat"], "not an integer", RawValue::as_int), None);
        assert_eq!(r.required_text("name", &["name", "name_text"]), None);
        let err = r.into_error(RecordKind::Participation);
        assert_eq!(err.issues.len(), 2);
        assert!(matches!(err.issues[0], FieldError::Invalid { field: "seat", .. }));
        assert_eq!(err.issues[1], FieldError::Missing { field: "name" });
    }

    #[test]
    fn optional_failures_are_not_issues() {
        let raw: RawAttributeMap = [("elo", "n/a"), ("fee", "1 500 ₽")].into_iter().collect();
        let r = FieldReader::new(&raw);
        assert_eq!(r.count("elo", &["elo"]), None);
        assert_eq!(r.money("fee", &["fee"]), Some(1500.0));
        assert!(r.into_error(RecordKind::Tournament).issues.is_empty());
    }

    #[test]
    fn lookup_prefers_earlier_keys() {
        let raw: RawAttributeMap = [("start_time", "bad"), ("start_time_text", "24.05.2025")]
            .into_iter()
            .collect();
        let r = FieldReader::new(&raw);
        assert_eq!(r.lookup(&["start_time", "start_time_text"]), Some(&RawValue::from("bad")));
    }

    #[test]
    fn rates() {
        assert_eq!(normalize_rate(65.0), 0.65);
        assert_eq!(normalize_rate(0.65432), 0.6543);
        assert_eq!(normalize_rate(1.0), 1.0);
    }
}
