use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use tracing::debug;

use super::{best_payload_object, first_unqualified, run_strategies, scan_text, Strategy};
use crate::model::raw::{RawAttributeMap, RawValue, STRUCTURED_PAYLOAD};
use crate::parser::page::Page;
use crate::parser::payload::PayloadNode;
use crate::parser::text::{normalize_text, parse_int_like, strip_title_suffix};

const TOURNAMENT_STRATEGIES: &[(&str, Strategy)] = &[
    ("structured_payload", from_payload),
    ("labeled_dom", from_labeled_dom),
    ("keyword_scan", from_keywords),
    ("page_metadata", from_metadata),
    ("source_locator", from_locator),
];

const TOURNAMENT_KEYS: &[&str] = &[
    "title", "name", "date_start", "start_date", "startdate", "date_end", "end_date", "enddate",
    "participants", "max_participants", "entry_fee", "prize_pool", "rounds", "status", "format",
    "organizer", "chief_judge", "location",
];

const ID_KEYS: &[&str] = &["tournament_id", "id"];
/// (output field, payload keys) for values passed through as text.
const TEXT_FIELDS: &[(&str, &[&str])] = &[
    ("name", &["title", "name"]),
    ("start_date_text", &["date_start", "start_date", "startdate", "start"]),
    ("end_date_text", &["date_end", "end_date", "enddate", "end"]),
    ("registration_end_text", &["registration_end", "registration_deadline", "reg_end"]),
    ("entry_fee_text", &["entry_fee", "fee", "price"]),
    ("prize_pool_text", &["prize_pool", "prize_fund", "prize"]),
    ("tournament_type_text", &["tournament_type", "type"]),
    ("status_text", &["status", "eventstatus"]),
    ("format_text", &["format", "game_format"]),
    ("location", &["location", "city", "venue", "place"]),
    ("organizer", &["organizer", "organiser", "club"]),
    ("chief_judge", &["chief_judge", "main_judge", "judge"]),
    ("description", &["description"]),
];
/// (output field, payload keys) for counters kept as integers.
const INT_FIELDS: &[(&str, &[&str])] = &[
    ("current_participants", &["current_participants", "participants_count", "participants"]),
    ("max_participants", &["max_participants", "max_players", "capacity", "maximumattendeecapacity"]),
    ("current_round", &["current_round", "round"]),
    ("total_rounds", &["total_rounds", "rounds"]),
    ("tables_count", &["tables_count", "tables"]),
];

static NAME_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h1", "[class*=tournament-title]", "[class*=tournament-name]", "[itemprop=name]"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static TOURNAMENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/tournaments?/(\d+)").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{2}\.\d{2}\.\d{4})(?:\s+(\d{1,2}:\d{2}))?").unwrap()
});
static REGISTRATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:регистраци[а-яё]*\s+до|registration\s+(?:until|closes|ends|deadline))\s*[:\-]?\s*(\d{2}\.\d{2}\.\d{4}(?:\s+\d{1,2}:\d{2})?)",
    )
    .unwrap()
});
static PARTICIPATION_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:участник[а-яё]*|игрок[а-яё]*|participants|players)\s*[:\-]?\s*(\d+)\s*(?:из|of|/)\s*(\d+)")
        .unwrap()
});
static PARTICIPATION_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:из|of)\s*(\d+)").unwrap());
static PARTICIPANT_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:участник[а-яё]*|participants)\s*[:\-]?\s*(\d+)").unwrap()
});
static COUNTER_CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:тур|раунд|round|стол|table)\S*\s*[:\-]?\s*$").unwrap());
static ROUND_PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:тур|раунд|round)\b\s*[:\-]?\s*(\d+)\s*(?:из|of|/)\s*(\d+)").unwrap()
});
static ROUND_TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:туров|раундов|rounds)\s*[:\-]?\s*(\d+)").unwrap()
});
static TABLES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:столов|столы|tables)\s*[:\-]?\s*(\d+)").unwrap()
});

const AMOUNT: &str = r"((?:\d[\d ,.]*)?\d\s*(?:₽|руб[а-яё]*\.?|rub|р\.)?)";
static ENTRY_FEE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:взнос[а-яё]*|стоимость\s+участия|entry\s+fee)\s*[:\-]?\s*{AMOUNT}"
    ))
    .unwrap()
});
static PRIZE_POOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:призов[а-яё]*\s+фонд|prize\s+(?:pool|fund))\s*[:\-]?\s*{AMOUNT}"
    ))
    .unwrap()
});
static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\d[\d ,.]*)?\d\s*(?:₽|руб[а-яё]*\.?|rub|р\.)").unwrap()
});
static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(регистрация\s+(?:открыта|закрыта)|заверш[её]н[а-яё]*|ид[её]т|в\s+процессе|отмен[её]н[а-яё]*|registration\s+(?:open|closed)|completed|finished|in\s+progress|ongoing|cancell?ed)",
    )
    .unwrap()
});

/// Raw attribute map for a tournament page.
pub fn extract_tournament_fields(markup: &str, source_locator: &str) -> RawAttributeMap {
    let page = Page::parse(markup, source_locator);
    run_strategies(&page, TOURNAMENT_STRATEGIES)
}

pub fn tournament_id_from_locator(locator: &str) -> Option<i64> {
    TOURNAMENT_ID_RE
        .captures(locator)
        .and_then(|c| c[1].parse().ok())
}

pub fn from_payload(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let Some(event) = best_payload_object(&page.payloads, TOURNAMENT_KEYS) else {
        return raw;
    };

    raw.insert_opt(
        "go_mafia_tournament_id",
        event
            .first_of(ID_KEYS)
            .and_then(|n| RawValue::Payload(n.clone()).as_int()),
    );
    for (field, keys) in TEXT_FIELDS {
        raw.insert_opt(field, event.first_of(keys).and_then(named_text));
    }
    for (field, keys) in INT_FIELDS {
        let value = event
            .first_of(keys)
            .and_then(|n| RawValue::Payload(n.clone()).as_int());
        raw.insert_opt(field, value);
    }

    raw.insert(STRUCTURED_PAYLOAD, event.clone());
    raw
}

pub fn from_labeled_dom(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let name = NAME_SELS
        .iter()
        .find_map(|sel| page.first_text(sel))
        .map(|t| strip_title_suffix(&t))
        .filter(|t| !t.is_empty());
    raw.insert_opt("name", name);
    raw
}

pub fn from_keywords(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let text = scan_text(page);

    // Registration cutoff first so its date is not taken as a start/end date.
    let registration = REGISTRATION_RE.captures(&text);
    let reserved = registration
        .as_ref()
        .and_then(|c| c.get(1))
        .map(|m| m.range());
    raw.insert_opt(
        "registration_end_text",
        registration.as_ref().map(|c| c[1].to_string()),
    );

    let mut dates = DATE_RE
        .captures_iter(&text)
        .filter(|c| {
            let start = c.get(0).map_or(0, |m| m.start());
            !reserved.as_ref().is_some_and(|r| r.contains(&start))
        })
        .map(|c| normalize_text(&c[0]));
    raw.insert_opt("start_date_text", dates.next());
    raw.insert_opt("end_date_text", dates.next());

    let participation = PARTICIPATION_KEYWORD_RE
        .captures(&text)
        .or_else(|| first_unqualified(&PARTICIPATION_BARE_RE, &text, Some(&COUNTER_CONTEXT_RE), 12));
    match participation {
        Some(caps) => {
            raw.insert("participation_text", format!("{} из {}", &caps[1], &caps[2]));
            raw.insert_opt("current_participants", parse_int_like(&caps[1]));
            raw.insert_opt("max_participants", parse_int_like(&caps[2]));
        }
        None => {
            let count = PARTICIPANT_COUNT_RE
                .captures(&text)
                .and_then(|c| parse_int_like(&c[1]));
            raw.insert_opt("current_participants", count);
        }
    }

    if let Some(caps) = ROUND_PROGRESS_RE.captures(&text) {
        raw.insert_opt("current_round", parse_int_like(&caps[1]));
        raw.insert_opt("total_rounds", parse_int_like(&caps[2]));
    } else if let Some(caps) = ROUND_TOTAL_RE.captures(&text) {
        raw.insert_opt("total_rounds", parse_int_like(&caps[1]));
    }
    raw.insert_opt(
        "tables_count",
        TABLES_RE.captures(&text).and_then(|c| parse_int_like(&c[1])),
    );

    let fee = ENTRY_FEE_RE.captures(&text).map(|c| c[1].trim().to_string());
    let prize = PRIZE_POOL_RE.captures(&text).map(|c| c[1].trim().to_string());
    if fee.is_none() && prize.is_none() {
        let fallback = CURRENCY_RE.find(&text).map(|m| m.as_str().trim().to_string());
        raw.insert_opt("prize_pool_text", fallback);
    }
    raw.insert_opt("entry_fee_text", fee);
    raw.insert_opt("prize_pool_text", prize);

    raw.insert_opt("status_text", STATUS_RE.captures(&text).map(|c| c[1].to_string()));

    debug!(fields = raw.len(), "tournament keyword scan");
    raw
}

pub fn from_metadata(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    let name = page
        .meta("og:title")
        .or_else(|| page.title())
        .map(|t| strip_title_suffix(&t))
        .filter(|t| !t.is_empty());
    raw.insert_opt("name", name);
    raw.insert_opt("description", page.meta("description"));
    raw.insert_opt("canonical_url", page.canonical_url());
    raw
}

pub fn from_locator(page: &Page) -> RawAttributeMap {
    let mut raw = RawAttributeMap::new();
    raw.insert("source_url", page.locator);
    let id = tournament_id_from_locator(page.locator).or_else(|| {
        page.canonical_url()
            .and_then(|c| tournament_id_from_locator(&c))
    });
    raw.insert_opt("go_mafia_tournament_id", id);
    raw
}

/// Scalar text, or the `name` of a nested object (schema.org `Place`, `Organization`).
fn named_text(node: &PayloadNode) -> Option<String> {
    match node {
        PayloadNode::Object(_) => node.get_ci("name").and_then(PayloadNode::scalar_text),
        _ => node.scalar_text(),
    }
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
    fn listing_page_dates_and_participation() {
        let raw = extract_tournament_fields(
            &fixture("tournament_listing"),
            "https://gomafia.pro/tournament/1875",
        );
        assert_eq!(text(&raw, "name").as_deref(), Some("Кубок Весны 2025"));
        assert_eq!(text(&raw, "start_date_text").as_deref(), Some("24.05.2025"));
        assert_eq!(text(&raw, "end_date_text").as_deref(), Some("25.05.2025"));
        assert_eq!(raw.get("current_participants"), Some(&RawValue::Int(230)));
        assert_eq!(raw.get("max_participants"), Some(&RawValue::Int(230)));
        assert_eq!(text(&raw, "participation_text").as_deref(), Some("230 из 230"));
        assert_eq!(raw.get("go_mafia_tournament_id"), Some(&RawValue::Int(1875)));
        assert_eq!(text(&raw, "source_url").as_deref(), Some("https://gomafia.pro/tournament/1875"));
    }

    #[test]
    fn detail_page_money_rounds_and_registration() {
        let raw = extract_tournament_fields(
            &fixture("tournament_detail"),
            "https://gomafia.pro/tournaments/42",
        );
        assert_eq!(text(&raw, "name").as_deref(), Some("Командный турнир Осень"));
        assert_eq!(text(&raw, "registration_end_text").as_deref(), Some("01.09.2025"));
        assert_eq!(text(&raw, "start_date_text").as_deref(), Some("06.09.2025 10:00"));
        assert_eq!(text(&raw, "end_date_text").as_deref(), Some("07.09.2025"));
        assert_eq!(raw.get("current_round"), Some(&RawValue::Int(3)));
        assert_eq!(raw.get("total_rounds"), Some(&RawValue::Int(10)));
        assert_eq!(raw.get("tables_count"), Some(&RawValue::Int(4)));
        assert_eq!(raw.get("current_participants"), Some(&RawValue::Int(36)));
        assert_eq!(raw.get("max_participants"), Some(&RawValue::Int(40)));
        assert_eq!(text(&raw, "entry_fee_text").as_deref(), Some("1 500 ₽"));
        assert_eq!(text(&raw, "prize_pool_text").as_deref(), Some("50 000 ₽"));
        assert_eq!(raw.get("go_mafia_tournament_id"), Some(&RawValue::Int(42)));
    }

    #[test]
    fn ld_json_event() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type": "Event", "name": "Summer Open", "startDate": "2025-07-01T10:00:00",
             "endDate": "2025-07-02T20:00:00", "location": {"@type": "Place", "name": "Moscow"},
             "organizer": {"@type": "Organization", "name": "Club X"}}
            </script></head><body><h1>Ignored Heading</h1></body></html>"#;
        let raw = extract_tournament_fields(html, "file:///t.html");
        assert_eq!(text(&raw, "name").as_deref(), Some("Summer Open"));
        assert_eq!(text(&raw, "start_date_text").as_deref(), Some("2025-07-01T10:00:00"));
        assert_eq!(text(&raw, "location").as_deref(), Some("Moscow"));
        assert_eq!(text(&raw, "organizer").as_deref(), Some("Club X"));
        assert!(raw.contains(STRUCTURED_PAYLOAD));
        assert!(!raw.contains("go_mafia_tournament_id"));
    }

    #[test]
    fn bare_currency_falls_back_to_prize_pool() {
        let raw = extract_tournament_fields(
            "<h1>Турнир</h1><p>Награды на сумму 20 000 руб.</p>",
            "https://gomafia.pro/tournament/7",
        );
        assert_eq!(text(&raw, "prize_pool_text").as_deref(), Some("20 000 руб."));
        assert!(!raw.contains("entry_fee_text"));
    }

    #[test]
    fn round_counter_is_not_participation() {
        let raw = extract_tournament_fields(
            "<h1>Лига</h1><p>Тур 2 из 8</p>",
            "https://gomafia.pro/tournament/8",
        );
        assert_eq!(raw.get("current_round"), Some(&RawValue::Int(2)));
        assert_eq!(raw.get("total_rounds"), Some(&RawValue::Int(8)));
        assert!(!raw.contains("current_participants"));
    }

    #[test]
    fn empty_markup_keeps_locator_and_snippet() {
        let raw = extract_tournament_fields("", "https://gomafia.pro/tournament/9");
        assert_eq!(raw.get("go_mafia_tournament_id"), Some(&RawValue::Int(9)));
        assert!(raw.contains("full_text_snippet"));
        assert!(!raw.contains("name"));
    }
}
