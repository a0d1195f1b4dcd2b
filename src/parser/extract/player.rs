use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use tracing::debug;

use super::{best_payload_object, first_unqualified, run_strategies, scan_text, Strategy};
use crate::model::raw::{RawAttributeMap, RawValue, STRUCTURED_PAYLOAD};
use crate::parser::page::Page;
use crate::parser::payload::PayloadNode;
use crate::parser::text::{parse_float_like, parse_int_like, strip_title_suffix};

pub const SITE_BASE_URL: &str = "https://gomafia.pro";

const PLAYER_STRATEGIES: &[(&str, Strategy)] = &[
    ("structured_payload", from_payload),
    ("labeled_dom", from_labeled_dom),
    ("keyword_scan", from_keywords),
    ("page_metadata", from_metadata),
    ("source_locator", from_locator),
];

/// Keys that mark an object as a player profile.
const PLAYER_KEYS: &[&str] = &[
    "login", "nickname", "nick", "username", "name", "rating", "elo", "current_elo", "games",
    "games_played", "wins", "games_won", "win_rate", "winrate",
];

const ID_KEYS: &[&str] = &["id", "user_id", "player_id", "go_mafia_id"];
const NICK_KEYS: &[&str] = &["login", "nickname", "nick", "username", "name"];
/// (output field, payload keys) for counters passed through as text.
const COUNT_FIELDS: &[(&str, &[&str])] = &[
    ("current_elo", &["current_elo", "rating", "elo"]),
    ("table_elo", &["table_elo", "table_rating"]),
    ("max_elo", &["max_elo", "max_rating", "peak_rating", "peak_elo"]),
    ("games_played", &["games_played", "games", "total_games"]),
    ("games_won", &["games_won", "wins", "won"]),
    ("best_win_streak", &["best_win_streak", "best_streak"]),
    ("current_streak", &["current_streak", "streak"]),
    ("awards_count", &["awards_count", "awards"]),
    ("total_points", &["total_points", "points"]),
    ("average_points", &["average_points", "avg_points"]),
    ("registered_year", &["registered_year", "registration_year"]),
    ("last_game_at", &["last_game_at", "last_game"]),
    ("last_tournament_at", &["last_tournament_at", "last_tournament"]),
];
const RATE_KEYS: &[&str] = &["win_rate", "winrate", "winpercent", "win_percent"];
const ROLES: &[&str] = &["civilian", "mafia", "don", "sheriff"];

static NICK_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h1", "[class*=nickname]", "[itemprop=name]", ".profile-name", ".user-name"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static STATS_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/stats/(\d+)").unwrap());

const NUM: &str = r"(\d{1,3}(?:[ ,]\d{3})+|\d+)";
static ELO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:эло|elo|рейтинг|rating)\b\s*[:\-]?\s*{NUM}")).unwrap()
});
static ELO_CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:max|table|peak|макс|табл|пик)\S*\s*$").unwrap());
static TABLE_ELO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:табличн[а-яё]*\s+(?:эло|рейтинг)|table\s+(?:elo|rating))\s*[:\-]?\s*{NUM}"
    ))
    .unwrap()
});
static MAX_ELO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:максимальн[а-яё]*\s+(?:эло|рейтинг)|пиков[а-яё]*\s+(?:эло|рейтинг)|(?:max(?:imum)?|peak)\s+(?:elo|rating))\s*[:\-]?\s*{NUM}"
    ))
    .unwrap()
});
static PLAYED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:games\s+played|total\s+games|games|игр[а-яё]*|сыграно|партий)\b\s*[:\-]?\s*{NUM}"
    ))
    .unwrap()
});
static WON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:games\s+won|wins|won|побед[а-яё]*|выигра(?:л|но|ли|ны)|выигрыш[а-яё]*)\b\s*[:\-]?\s*{NUM}"
    ))
    .unwrap()
});
static RATE_CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:процент|rate)\S*\s*$").unwrap());
static RATE_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:win\s*rate|процент\s+побед|винрейт)\s*[:\-]?\s*(\d{1,3}(?:[.,]\d+)?)\s*(%?)",
    )
    .unwrap()
});
static RATE_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:[.,]\d+)?)\s*%").unwrap());
static REGISTERED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(на\s+сайте\s+с|member\s+since)\s*(\d{4})").unwrap()
});

/// Raw attribute map for a player profile page.
pub fn extract_player_fields(markup: &str, source_locator: &str) -> RawAttributeMap {
    let page = Page::parse(markup, source_locator);
    let mut raw = run_strategies(&page, PLAYER_STRATEGIES);
    canonicalize_profile_url(&mut raw);
    raw
}

/// Canonical profile URL for a site id.
pub fn profile_url_for(id: i64) -> String {
    format!("{SITE_BASE_URL}/stats/{id}")
}

/// Site id embedded in a profile locator.
pub fn player_id_from_locator(locator: &str) -> Option<i64> {
    STATS_ID_RE
        .captures(locator)
        .and_then(|c| c[1].parse().ok())
}

pub fn from_payload(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let Some(user) = best_payload_object(&page.payloads, PLAYER_KEYS) else {
        return raw;
    };

    raw.insert_opt("go_mafia_id", user.first_of(ID_KEYS).and_then(int_of));
    raw.insert_opt(
        "current_nickname",
        user.first_of(NICK_KEYS).and_then(PayloadNode::scalar_text),
    );
    for (field, keys) in COUNT_FIELDS {
        raw.insert_opt(field, user.first_of(keys).and_then(PayloadNode::scalar_text));
    }
    raw.insert_opt("win_rate", user.first_of(RATE_KEYS).and_then(rate_of));

    // Per-role stats, either flat ("mafia_games") or nested ("roles": {"mafia": {...}}).
    let nested = user.get_ci("roles");
    for role in ROLES {
        let games_key = format!("{role}_games");
        let rate_key = format!("{role}_win_rate");
        let inner = nested.and_then(|n| n.get_ci(role));
        let games = user
            .get_ci(&games_key)
            .or_else(|| inner.and_then(|i| i.first_of(&["games", "games_played"])))
            .and_then(PayloadNode::scalar_text);
        let rate = user
            .get_ci(&rate_key)
            .or_else(|| inner.and_then(|i| i.first_of(RATE_KEYS)))
            .and_then(rate_of);
        raw.insert_opt(&games_key, games);
        raw.insert_opt(&rate_key, rate);
    }

    raw.insert(STRUCTURED_PAYLOAD, user.clone());
    raw
}

pub fn from_labeled_dom(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let nickname = NICK_SELS
        .iter()
        .find_map(|sel| page.first_text(sel))
        .map(|t| strip_title_suffix(&t))
        .filter(|t| !t.is_empty());
    raw.insert_opt("current_nickname", nickname);
    raw
}

pub fn from_keywords(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let text = scan_text(page);

    if let Some(caps) = REGISTERED_RE.captures(&text) {
        let prefix = caps[1].to_lowercase();
        let phrase = if prefix.starts_with("member") {
            format!("member since {}", &caps[2])
        } else {
            format!("на сайте с {} года", &caps[2])
        };
        raw.insert("registration_text", phrase);
    }

    let count = |re: &Regex, ctx: Option<&Regex>| {
        first_unqualified(re, &text, ctx, 14).and_then(|c| parse_int_like(&c[1]))
    };
    raw.insert_opt("table_elo", count(&TABLE_ELO_RE, None));
    raw.insert_opt("max_elo", count(&MAX_ELO_RE, None));
    raw.insert_opt("current_elo", count(&ELO_RE, Some(&ELO_CONTEXT_RE)));
    raw.insert_opt("games_played", count(&PLAYED_RE, None));
    raw.insert_opt("games_won", count(&WON_RE, Some(&RATE_CONTEXT_RE)));

    let rate = RATE_KEYWORD_RE
        .captures(&text)
        .map(|c| format!("{}{}", &c[1], if c[2].is_empty() { "%" } else { &c[2] }))
        .or_else(|| RATE_BARE_RE.captures(&text).map(|c| format!("{}%", &c[1])))
        .and_then(|t| parse_float_like(&t));
    raw.insert_opt("win_rate", rate.map(|r| r.to_string()));

    debug!(fields = raw.len(), "player keyword scan");
    raw
}

pub fn from_metadata(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let title = page
        .meta("og:title")
        .or_else(|| page.title())
        .or_else(|| page.meta("description"))
        .map(|t| strip_title_suffix(&t))
        .filter(|t| !t.is_empty());
    raw.insert_opt("current_nickname", title);
    raw.insert_opt("canonical_url", page.canonical_url());
    raw
}

pub fn from_locator(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let id = player_id_from_locator(page.locator).or_else(|| {
        page.canonical_url()
            .and_then(|c| player_id_from_locator(&c))
    });
    match id {
        Some(id) => {
            raw.insert("go_mafia_id", id);
            raw.insert("profile_url", profile_url_for(id));
        }
        None => raw.insert("profile_url", page.locator),
    }
    raw
}

/// Non-web locators (fixtures, local files) are replaced by the canonical
/// profile URL once an id is known.
fn canonicalize_profile_url(raw: &mut RawAttributeMap) {
    let is_web = raw
        .get_text("profile_url")
        .is_some_and(|u| u.starts_with("http://") || u.starts_with("https://"));
    if is_web {
        return;
    }
    if let Some(id) = raw.get("go_mafia_id").and_then(RawValue::as_int) {
        raw.insert("profile_url", profile_url_for(id));
    }
}

fn int_of(node: &PayloadNode) -> Option<i64> {
    RawValue::Payload(node.clone()).as_int()
}

/// Rate in the 0..1 convention, rendered as text.
fn rate_of(node: &PayloadNode) -> Option<String> {
    let value = RawValue::Payload(node.clone()).as_float()?;
    let value = if value > 1.0 { value / 100.0 } else { value };
    Some(value.to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn text(raw: &RawAttributeMap, key: &str) -> Option<String> {
        raw.get(key).and_then(RawValue::to_text)
    }

    #[test]
    fn next_data_island() {
        let raw = extract_player_fields(&fixture("player_next_data"), "https://gomafia.pro/stats/3170");
        assert_eq!(raw.get("go_mafia_id"), Some(&RawValue::Int(3170)));
        assert_eq!(raw.get("current_nickname"), Some(&RawValue::from("TestPlayer")));
        assert_eq!(raw.get("current_elo"), Some(&RawValue::from("1250")));
        assert_eq!(raw.get("games_played"), Some(&RawValue::from("100")));
        assert_eq!(raw.get("games_won"), Some(&RawValue::from("65")));
        assert_eq!(text(&raw, "profile_url").as_deref(), Some("https://gomafia.pro/stats/3170"));
        assert!(raw.contains(STRUCTURED_PAYLOAD));
        assert!(!raw.contains("win_rate"));
    }

    #[test]
    fn ld_json_name_merges_with_text_scan() {
        let raw = extract_player_fields(&fixture("player_ldjson"), "file:///fixtures/player_ldjson.html");
        assert_eq!(text(&raw, "current_nickname").as_deref(), Some("LDUser"));
        assert_eq!(raw.get("current_elo"), Some(&RawValue::Int(1500)));
        assert_eq!(raw.get("games_played"), Some(&RawValue::Int(240)));
        assert_eq!(raw.get("games_won"), Some(&RawValue::Int(130)));
        // Canonical link supplies the id for a local fixture.
        assert_eq!(raw.get("go_mafia_id"), Some(&RawValue::Int(4242)));
        assert_eq!(text(&raw, "profile_url").as_deref(), Some("https://gomafia.pro/stats/4242"));
    }

    #[test]
    fn thin_spaces_and_russian_labels() {
        let raw = extract_player_fields(&fixture("player_thinspace"), "https://gomafia.pro/stats/77");
        assert_eq!(text(&raw, "current_nickname").as_deref(), Some("Тонкий Пробел"));
        assert_eq!(raw.get("current_elo"), Some(&RawValue::Int(1250)));
        assert_eq!(raw.get("max_elo"), Some(&RawValue::Int(1410)));
        assert_eq!(raw.get("games_played"), Some(&RawValue::Int(1024)));
        assert_eq!(raw.get("games_won"), Some(&RawValue::Int(512)));
        assert_eq!(raw.get("win_rate"), Some(&RawValue::from("0.5")));
        assert_eq!(text(&raw, "registration_text").as_deref(), Some("на сайте с 2021 года"));
    }

    #[test]
    fn english_labels() {
        let raw = extract_player_fields(&fixture("player_english_labels"), "https://gomafia.pro/stats/12");
        assert_eq!(text(&raw, "current_nickname").as_deref(), Some("EnglishPlayer"));
        assert_eq!(raw.get("current_elo"), Some(&RawValue::Int(1320)));
        assert_eq!(raw.get("table_elo"), Some(&RawValue::Int(1280)));
        assert_eq!(raw.get("games_played"), Some(&RawValue::Int(80)));
        assert_eq!(raw.get("games_won"), Some(&RawValue::Int(44)));
        assert_eq!(raw.get("win_rate"), Some(&RawValue::from("0.55")));
        assert_eq!(text(&raw, "registration_text").as_deref(), Some("member since 2019"));
    }

    #[test]
    fn exotic_numbers() {
        let raw = extract_player_fields(&fixture("player_exotic_numbers"), "https://gomafia.pro/stats/9");
        assert_eq!(text(&raw, "current_nickname").as_deref(), Some("ExoticNumbersPlayer"));
        assert_eq!(raw.get("games_played"), Some(&RawValue::Int(1250)));
        assert_eq!(raw.get("games_won"), Some(&RawValue::Int(700)));
        assert_eq!(raw.get("win_rate"), Some(&RawValue::from("0.56")));
    }

    #[test]
    fn title_fallback_strips_site_suffix() {
        let raw = extract_player_fields(
            "<html><head><title>Fallback — GoMafia</title></head><body></body></html>",
            "https://gomafia.pro/stats/1",
        );
        assert_eq!(text(&raw, "current_nickname").as_deref(), Some("Fallback"));
    }

    #[test]
    fn locator_id_does_not_override_payload_id() {
        let html = r#"<script type="application/ld+json">{"id": 5, "login": "A"}</script>"#;
        let raw = extract_player_fields(html, "https://gomafia.pro/stats/6");
        assert_eq!(raw.get("go_mafia_id"), Some(&RawValue::Int(5)));
        assert_eq!(text(&raw, "profile_url").as_deref(), Some("https://gomafia.pro/stats/6"));
    }

    #[test]
    fn garbage_markup_yields_only_locator_and_snippet() {
        let raw = extract_player_fields("<<<not html", "https://example.org/x");
        assert!(raw.contains("full_text_snippet"));
        assert_eq!(text(&raw, "profile_url").as_deref(), Some("https://example.org/x"));
        assert!(!raw.contains("go_mafia_id"));
    }
}
