use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Serialize, Serializer};
use tracing::debug;

use super::text::normalize_text;

/// Recursion bound for `find_objects_with_keys`.
pub const DEFAULT_MAX_DEPTH: usize = 6;

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static ASSIGNMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:window\.|var\s+|let\s+|const\s+)[A-Za-z_$][\w$.]*\s*=\s*\{").unwrap()
});

const STRUCTURED_TYPES: &[&str] = &["application/ld+json", "application/json"];
const DATA_ISLAND_IDS: &[&str] = &[
    "__next_data__",
    "__nuxt_data__",
    "__nuxt__",
    "__apollo_state__",
    "__initial_state__",
    "initial-state",
    "__preloaded_state__",
];

/// A JSON payload pulled out of a page, reduced to three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadNode {
    Object(Vec<(String, PayloadNode)>),
    Array(Vec<PayloadNode>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PayloadNode {
    /// Field lookup on an object, ignoring key case.
    pub fn get_ci(&self, key: &str) -> Option<&PayloadNode> {
        match self {
            PayloadNode::Object(entries) => entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// First present key among `keys`, skipping nulls.
    pub fn first_of(&self, keys: &[&str]) -> Option<&PayloadNode> {
        keys.iter()
            .filter_map(|k| self.get_ci(k))
            .find(|v| !matches!(v, PayloadNode::Scalar(Scalar::Null)))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            PayloadNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar rendered as text; numbers keep their JSON spelling.
    pub fn scalar_text(&self) -> Option<String> {
        match self.as_scalar()? {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::Text(t) if t.is_empty() => None,
            Scalar::Text(t) => Some(t.clone()),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let entries: &[(String, PayloadNode)] = match self {
            PayloadNode::Object(entries) => entries,
            _ => &[],
        };
        entries.iter().map(|(k, _)| k.as_str())
    }
}

impl From<serde_json::Value> for PayloadNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => PayloadNode::Scalar(Scalar::Null),
            Value::Bool(b) => PayloadNode::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PayloadNode::Scalar(Scalar::Int(i)),
                None => PayloadNode::Scalar(Scalar::Float(n.as_f64().unwrap_or_default())),
            },
            Value::String(s) => PayloadNode::Scalar(Scalar::Text(normalize_text(&s))),
            Value::Array(items) => PayloadNode::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                PayloadNode::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&PayloadNode> for serde_json::Value {
    fn from(node: &PayloadNode) -> Self {
        use serde_json::Value;
        match node {
            PayloadNode::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
            PayloadNode::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            PayloadNode::Scalar(Scalar::Null) => Value::Null,
            PayloadNode::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            PayloadNode::Scalar(Scalar::Int(i)) => Value::from(*i),
            PayloadNode::Scalar(Scalar::Float(f)) => Value::from(*f),
            PayloadNode::Scalar(Scalar::Text(t)) => Value::String(t.clone()),
        }
    }
}

impl Serialize for PayloadNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

/// Raw text of every script block that may hold a machine-readable payload,
/// ordered: typed structured data, known data islands, then global
/// assignments of object literals.
pub fn locate_payload_blocks(document: &Html) -> Vec<String> {
    let mut typed = Vec::new();
    let mut islands = Vec::new();
    let mut assignments = Vec::new();

    for script in document.select(&SCRIPT_SEL) {
        let body: String = script.text().collect();
        if body.trim().is_empty() {
            continue;
        }
        let el = script.value();
        let kind = el.attr("type").map(|t| t.trim().to_ascii_lowercase());
        let id = el.attr("id").map(|t| t.trim().to_ascii_lowercase());

        if kind.as_deref().is_some_and(|k| STRUCTURED_TYPES.contains(&k))
            && id.as_deref().map_or(true, |i| !DATA_ISLAND_IDS.contains(&i))
        {
            typed.push(body);
        } else if id.as_deref().is_some_and(|i| DATA_ISLAND_IDS.contains(&i)) {
            islands.push(body);
        } else if let Some(m) = ASSIGNMENT_RE.find(&body) {
            // Keep from the opening brace on; recovery parsing trims the tail.
            assignments.push(body[m.end() - 1..].to_string());
        }
    }

    typed.into_iter().chain(islands).chain(assignments).collect()
}

/// Strict JSON parse, then a retry on the first balanced `{...}` span.
pub fn parse_payload(block: &str) -> Option<PayloadNode> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(block.trim()) {
        return Some(value.into());
    }
    let span = first_balanced_object(block)?;
    serde_json::from_str::<serde_json::Value>(span)
        .ok()
        .map(Into::into)
}

/// Every candidate block that parses, in candidate order.
pub fn locate_payloads(document: &Html) -> Vec<PayloadNode> {
    let blocks = locate_payload_blocks(document);
    let total = blocks.len();
    let parsed: Vec<PayloadNode> = blocks.iter().filter_map(|b| parse_payload(b)).collect();
    debug!(candidates = total, parsed = parsed.len(), "located structured payloads");
    parsed
}

/// Collect every object (depth-first, pre-order) whose keys intersect
/// `keys`, compared case-insensitively. The root sits at depth 0 and nothing
/// below `max_depth` is visited.
pub fn find_objects_with_keys<'a>(
    node: &'a PayloadNode,
    keys: &[&str],
    max_depth: usize,
) -> Vec<&'a PayloadNode> {
    let mut found = Vec::new();
    walk(node, keys, 0, max_depth, &mut found);
    found
}

fn walk<'a>(
    node: &'a PayloadNode,
    keys: &[&str],
    depth: usize,
    max_depth: usize,
    found: &mut Vec<&'a PayloadNode>,
) {
    if depth > max_depth {
        return;
    }
    match node {
        PayloadNode::Object(entries) => {
            if entries
                .iter()
                .any(|(k, _)| keys.iter().any(|want| k.eq_ignore_ascii_case(want)))
            {
                found.push(node);
            }
            for (_, child) in entries {
                walk(child, keys, depth + 1, max_depth, found);
            }
        }
        PayloadNode::Array(items) => {
            for child in items {
                walk(child, keys, depth + 1, max_depth, found);
            }
        }
        PayloadNode::Scalar(_) => {}
    }
}

/// Number of `keys` present on an object (case-insensitive).
pub fn key_overlap(node: &PayloadNode, keys: &[&str]) -> usize {
    node.keys()
        .filter(|k| keys.iter().any(|want| k.eq_ignore_ascii_case(want)))
        .count()
}

/// First brace-balanced span starting at the first `{`, aware of JSON strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn blocks_are_ordered_by_kind() {
        let html = r#"<html><head>
            <script>window.__STATE__ = {"a": 1};</script>
            <script id="__NEXT_DATA__" type="application/json">{"b": 2}</script>
            <script type="application/ld+json">{"c": 3}</script>
            <script>console.log("noise")</script>
        </head><body></body></html>"#;
        let blocks = locate_payload_blocks(&doc(html));
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("\"c\""));
        assert!(blocks[1].contains("\"b\""));
        assert!(blocks[2].starts_with('{'));
    }

    #[test]
    fn recovery_parse_takes_balanced_span() {
        let node = parse_payload(r#"{"user": {"name": "a}b"}, "n": 1}; initApp();"#).unwrap();
        let user = node.get_ci("user").unwrap();
        assert_eq!(user.get_ci("NAME").unwrap().scalar_text().as_deref(), Some("a}b"));
    }

    #[test]
    fn malformed_candidates_are_dropped() {
        let html = r#"<script type="application/ld+json">{"broken": </script>
            <script type="application/ld+json">{"ok": true}</script>"#;
        let payloads = locate_payloads(&doc(html));
        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].get_ci("ok").is_some());
    }

    #[test]
    fn embedded_strings_are_normalized() {
        let node = parse_payload(r#"{"login": "  Test&amp;Player  "}"#).unwrap();
        assert_eq!(
            node.get_ci("login").unwrap().scalar_text().as_deref(),
            Some("Test&Player")
        );
    }

    #[test]
    fn finds_nested_objects_case_insensitively() {
        let node = parse_payload(
            r#"{"props": {"pageProps": {"user": {"Login": "X", "rating": 1}, "list": [{"wins": 2}]}}}"#,
        )
        .unwrap();
        let found = find_objects_with_keys(&node, &["login", "wins"], DEFAULT_MAX_DEPTH);
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|n| key_overlap(n, &["login", "rating"]) == 2));
    }

    #[test]
    fn search_respects_depth_bound() {
        let node = parse_payload(r#"{"a": {"b": {"c": {"login": "deep"}}}}"#).unwrap();
        assert_eq!(find_objects_with_keys(&node, &["login"], 3).len(), 1);
        assert!(find_objects_with_keys(&node, &["login"], 2).is_empty());
    }

    #[test]
    fn serializes_back_to_json() {
        let node = parse_payload(r#"{"id": 3, "rate": 0.5, "tags": ["x", null]}"#).unwrap();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["tags"][1], serde_json::Value::Null);
    }
}
