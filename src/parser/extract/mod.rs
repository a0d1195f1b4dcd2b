pub mod player;
pub mod tournament;

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use super::page::Page;
use super::payload::{find_objects_with_keys, key_overlap, PayloadNode, DEFAULT_MAX_DEPTH};
use super::text::snippet;
use crate::model::raw::{RawAttributeMap, FULL_TEXT_SNIPPET};

pub use player::extract_player_fields;
pub use tournament::extract_tournament_fields;

/// Characters of visible text kept in `full_text_snippet`.
pub const SNIPPET_CHARS: usize = 200;

/// An extraction strategy: reads the page, returns only the fields it is sure of.
pub type Strategy = fn(&Page) -> RawAttributeMap;

/// schema.org types that never describe the entity being extracted.
const IGNORED_LD_TYPES: &[&str] = &[
    "organization",
    "website",
    "webpage",
    "breadcrumblist",
    "listitem",
    "sitenavigationelement",
    "imageobject",
];

static DASHES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[–—]").unwrap());

/// Run `strategies` in priority order, merging left to right without
/// overwriting, then append the diagnostic snippet.
pub fn run_strategies(page: &Page, strategies: &[(&'static str, Strategy)]) -> RawAttributeMap {
    let mut out = RawAttributeMap::new();
    for (name, strategy) in strategies {
        let partial = strategy(page);
        debug!(strategy = name, fields = partial.len(), "strategy finished");
        out.merge_missing(partial);
    }
    out.insert(FULL_TEXT_SNIPPET, snippet(&page.text, SNIPPET_CHARS));
    out
}

/// The payload object sharing the most keys with `keys`; earlier wins ties.
pub(crate) fn best_payload_object<'p>(
    payloads: &'p [PayloadNode],
    keys: &[&str],
) -> Option<&'p PayloadNode> {
    let mut best: Option<(&PayloadNode, usize)> = None;
    for payload in payloads {
        for obj in find_objects_with_keys(payload, keys, DEFAULT_MAX_DEPTH) {
            if is_ignored_ld_type(obj) {
                continue;
            }
            let score = key_overlap(obj, keys);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((obj, score));
            }
        }
    }
    best.map(|(obj, _)| obj)
}

fn is_ignored_ld_type(obj: &PayloadNode) -> bool {
    obj.get_ci("@type")
        .and_then(PayloadNode::scalar_text)
        .is_some_and(|t| IGNORED_LD_TYPES.contains(&t.to_lowercase().as_str()))
}

/// First match of `re` whose preceding text (last `window` chars) does not
/// match `context` and whose number is not immediately followed by `%`.
pub(crate) fn first_unqualified<'t>(
    re: &Regex,
    text: &'t str,
    context: Option<&Regex>,
    window: usize,
) -> Option<Captures<'t>> {
    re.captures_iter(text).find(|caps| {
        let m = caps.get(0).map_or(0..0, |m| m.range());
        let before = tail_chars(&text[..m.start], window).to_lowercase();
        let after = text[m.end..].trim_start();
        let disqualified = context.is_some_and(|c| c.is_match(&before));
        !disqualified && !after.starts_with('%')
    })
}

fn tail_chars(s: &str, n: usize) -> &str {
    let skip = s.chars().count().saturating_sub(n);
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

/// Page text with typographic dashes turned into ASCII hyphens.
pub(crate) fn scan_text(page: &Page) -> String {
    DASHES_RE.replace_all(&page.text, "-").into_owned()
}
