use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use super::fields::FieldReader;
use super::lexicon::{classify_tournament_format, classify_tournament_status, classify_tournament_type};
use super::raw::RawAttributeMap;
use crate::error::{ConstructionError, FieldError, RecordKind};

static PARTICIPATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:из|of|/)\s*(\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentType {
    #[default]
    Individual,
    Team,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    #[default]
    RoundRobin,
    Swiss,
    Ladder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    #[default]
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

/// Start and end of an event. The only way to build one checks that the end
/// is strictly after the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(rename = "start_date")]
    start: NaiveDateTime,
    #[serde(rename = "end_date")]
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, FieldError> {
        if end <= start {
            return Err(FieldError::DateOrder {
                start_field: "start_date",
                end_field: "end_date",
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Whole days between start and end; 0 for an event shorter than a day.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentRecord {
    pub go_mafia_tournament_id: Option<u64>,
    pub name: String,
    pub description: Option<String>,

    #[serde(flatten)]
    pub dates: DateRange,
    pub registration_end: Option<NaiveDateTime>,

    pub tournament_type: TournamentType,
    pub format: TournamentFormat,
    pub status: TournamentStatus,

    pub location: Option<String>,
    pub organizer: Option<String>,
    pub chief_judge: Option<String>,

    pub current_participants: Option<u32>,
    pub max_participants: Option<u32>,

    pub current_round: u32,
    pub total_rounds: Option<u32>,
    pub total_tables: Option<u32>,

    pub entry_fee: Option<f64>,
    pub prize_pool: Option<f64>,

    pub source_url: Option<String>,
}

/// Tournament type from the name first, then an explicit label, then the
/// individual default.
pub fn infer_tournament_type(name: &str, explicit: Option<&str>) -> TournamentType {
    classify_tournament_type(name)
        .or_else(|| explicit.and_then(classify_tournament_type))
        .unwrap_or_default()
}

pub fn build_tournament_record(raw: RawAttributeMap) -> Result<TournamentRecord, ConstructionError> {
    let mut r = FieldReader::new(&raw);

    let name = r.required_text("name", &["name"]);
    let start = r.required_datetime("start_date", &["start_date", "start_date_text"]);
    let end = r.required_datetime("end_date", &["end_date", "end_date_text"]);

    let (Some(name), Some(start), Some(end)) = (name, start, end) else {
        return Err(r.into_error(RecordKind::Tournament));
    };
    let dates = match DateRange::new(start, end) {
        Ok(d) => d,
        Err(issue) => {
            r.push(issue);
            return Err(r.into_error(RecordKind::Tournament));
        }
    };

    // "230 из 230" feeds both counters when they were not given separately.
    let participation = r
        .text("participation_text", &["participation_text"])
        .and_then(|t| {
            let caps = PARTICIPATION_RE.captures(&t)?;
            Some((caps[1].parse::<u32>().ok()?, caps[2].parse::<u32>().ok()?))
        });
    let current_participants = r
        .count("current_participants", &["current_participants"])
        .or(participation.map(|(c, _)| c));
    let max_participants = r
        .count("max_participants", &["max_participants"])
        .or(participation.map(|(_, m)| m))
        .filter(|m| *m > 0);

    let type_text = r.text("tournament_type", &["tournament_type", "tournament_type_text"]);

    Ok(TournamentRecord {
        go_mafia_tournament_id: r
            .int("go_mafia_tournament_id", &["go_mafia_tournament_id"])
            .and_then(|i| u64::try_from(i).ok()),
        tournament_type: infer_tournament_type(&name, type_text.as_deref()),
        name,
        description: r.text("description", &["description"]),
        dates,
        registration_end: r.datetime("registration_end", &["registration_end", "registration_end_text"]),
        format: r
            .text("format", &["format", "format_text"])
            .and_then(|t| classify_tournament_format(&t))
            .unwrap_or_default(),
        status: r
            .text("status", &["status", "status_text"])
            .and_then(|t| classify_tournament_status(&t))
            .unwrap_or_default(),
        location: r.text("location", &["location"]),
        organizer: r.text("organizer", &["organizer"]),
        chief_judge: r.text("chief_judge", &["chief_judge"]),
        current_participants,
        max_participants,
        current_round: r
            .count("current_round", &["current_round"])
            .filter(|c| *c >= 1)
            .unwrap_or(1),
        total_rounds: r.count("total_rounds", &["total_rounds"]).filter(|t| *t > 0),
        total_tables: r
            .count("total_tables", &["total_tables", "tables_count"])
            .filter(|t| *t > 0),
        entry_fee: r.money("entry_fee", &["entry_fee", "entry_fee_text"]),
        prize_pool: r.money("prize_pool", &["prize_pool", "prize_pool_text"]),
        source_url: r.text("source_url", &["source_url", "canonical_url"]),
    })
}

// ── Tests ──
