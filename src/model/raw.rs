use std::collections::BTreeMap;

use serde::Serialize;

use crate::parser::payload::{PayloadNode, Scalar};
use crate::parser::text::{normalize_text, parse_datetime, parse_float_like, parse_int_like};

/// Diagnostic key always written by the extractors.
pub const FULL_TEXT_SNIPPET: &str = "full_text_snippet";
/// Key holding the structured object a payload strategy matched, kept verbatim.
pub const STRUCTURED_PAYLOAD: &str = "structured_payload";

/// Loosely-typed extraction value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Int(i64),
    Payload(PayloadNode),
}

impl RawValue {
    /// Value as display text, for error reports and lexicon lookups.
    pub fn to_text(&self) -> Option<String> {
        match self {
            RawValue::Text(t) => Some(t.clone()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Payload(p) => p.scalar_text(),
        }
    }

    /// Normalized, non-empty text.
    pub fn as_clean_text(&self) -> Option<String> {
        self.to_text()
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(i) => Some(*i),
            RawValue::Text(t) => parse_int_like(t),
            RawValue::Payload(PayloadNode::Scalar(Scalar::Int(i))) => Some(*i),
            RawValue::Payload(PayloadNode::Scalar(Scalar::Float(f))) if f.fract() == 0.0 => {
                Some(*f as i64)
            }
            RawValue::Payload(PayloadNode::Scalar(Scalar::Text(t))) => parse_int_like(t),
            RawValue::Payload(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            RawValue::Int(i) => Some(*i as f64),
            RawValue::Text(t) => parse_float_like(t),
            RawValue::Payload(PayloadNode::Scalar(Scalar::Int(i))) => Some(*i as f64),
            RawValue::Payload(PayloadNode::Scalar(Scalar::Float(f))) => Some(*f),
            RawValue::Payload(PayloadNode::Scalar(Scalar::Text(t))) => parse_float_like(t),
            RawValue::Payload(_) => None,
        }
    }

    pub fn as_datetime(&self) -> Option<chrono::NaiveDateTime> {
        self.to_text().and_then(|t| parse_datetime(&t))
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

impl From<PayloadNode> for RawValue {
    fn from(p: PayloadNode) -> Self {
        RawValue::Payload(p)
    }
}

/// Field name -> loosely-typed value, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawAttributeMap {
    fields: BTreeMap<String, RawValue>,
}

impl RawAttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<RawValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Insert only when `value` is present.
    pub fn insert_opt<V: Into<RawValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(v) = value {
            self.insert(key, v);
        }
    }

    /// Add every field of `other` that is not already present here.
    pub fn merge_missing(&mut self, other: RawAttributeMap) {
        for (k, v) in other.fields {
            self.fields.entry(k).or_insert(v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(RawValue::as_clean_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawAttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawAttributeMap {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_never_overwrites() {
        let mut base: RawAttributeMap = [("name", "first")].into_iter().collect();
        let later: RawAttributeMap = [("name", "second"), ("extra", "x")].into_iter().collect();
        base.merge_missing(later);
        assert_eq!(base.get("name"), Some(&RawValue::from("first")));
        assert_eq!(base.get("extra"), Some(&RawValue::from("x")));
    }

    #[test]
    fn coercions_across_variants() {
        assert_eq!(RawValue::from("1 250").as_int(), Some(1250));
        assert_eq!(RawValue::Int(7).as_float(), Some(7.0));
        assert_eq!(
            RawValue::Payload(PayloadNode::Scalar(Scalar::Float(3.0))).as_int(),
            Some(3)
        );
        assert_eq!(RawValue::Payload(PayloadNode::Array(vec![])).as_int(), None);
        assert_eq!(RawValue::from("   ").as_clean_text(), None);
    }

    #[test]
    fn serializes_as_plain_json_object() {
        let map: RawAttributeMap = [("a", RawValue::Int(1)), ("b", RawValue::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"a":1,"b":"x"}"#);
    }
}
