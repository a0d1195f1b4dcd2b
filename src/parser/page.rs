use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::payload::{locate_payloads, PayloadNode};
use super::text::normalize_text;

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static META_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());
static CANONICAL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel="canonical"]"#).unwrap());

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// One parsed page, shared by every extraction strategy.
pub struct Page<'a> {
    pub locator: &'a str,
    pub document: Html,
    /// Normalized visible text, text nodes joined by single spaces.
    pub text: String,
    pub payloads: Vec<PayloadNode>,
}

impl<'a> Page<'a> {
    pub fn parse(markup: &str, locator: &'a str) -> Self {
        let document = Html::parse_document(markup);
        let text = visible_text(&document);
        let payloads = locate_payloads(&document);
        Page {
            locator,
            document,
            text,
            payloads,
        }
    }

    /// Normalized text of the first element matching `selector`, if non-empty.
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.document
            .select(selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    }

    pub fn title(&self) -> Option<String> {
        self.first_text(&TITLE_SEL)
    }

    /// Content of a `<meta>` tag matched by its `property` or `name`.
    pub fn meta(&self, key: &str) -> Option<String> {
        self.document
            .select(&META_SEL)
            .find(|m| {
                let el = m.value();
                el.attr("property")
                    .or_else(|| el.attr("name"))
                    .is_some_and(|k| k.eq_ignore_ascii_case(key))
            })
            .and_then(|m| m.value().attr("content"))
            .map(normalize_text)
            .filter(|c| !c.is_empty())
    }

    pub fn canonical_url(&self) -> Option<String> {
        self.document
            .select(&CANONICAL_SEL)
            .find_map(|l| l.value().attr("href"))
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
    }
}

pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn visible_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let t: &str = text;
        let t = t.trim();
        if !t.is_empty() {
            parts.push(t);
        }
    }
    normalize_text(&parts.join(" "))
}
