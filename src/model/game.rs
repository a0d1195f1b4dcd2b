use chrono::NaiveDateTime;
use serde::Serialize;

use super::fields::FieldReader;
use super::lexicon::{
    classify_game_format, classify_game_status, classify_game_type, classify_win_condition,
    classify_winning_team,
};
use super::participation::{label, TeamSide};
use super::raw::RawAttributeMap;
use crate::error::{ConstructionError, RecordKind};
use crate::parser::text::parse_duration_minutes;

pub const DEFAULT_PLAYER_COUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    Classic,
    Blitz,
    #[default]
    Tournament,
    Training,
    Championship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameFormat {
    Classic,
    Speed,
    Blitz,
    #[default]
    Tournament,
    Training,
    Championship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Pending,
    InProgress,
    #[default]
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WinCondition {
    Elimination,
    Voting,
    MafiaMajority,
    Timeout,
    Forfeit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    pub go_mafia_game_id: Option<String>,
    pub table_number: Option<u32>,
    pub table_name: Option<String>,
    pub moderator_name: Option<String>,

    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    /// Minutes.
    pub duration: Option<i64>,

    pub game_type: GameType,
    pub game_format: GameFormat,
    pub status: GameStatus,

    pub winning_team: TeamSide,
    pub win_condition: Option<WinCondition>,

    pub tournament_id: Option<String>,
    pub tournament_round: Option<u32>,
    pub tournament_stage: Option<String>,

    pub player_count: u32,
    pub mafia_count: u32,
    pub civilian_count: u32,
    pub special_roles: Vec<String>,
    pub venue: Option<String>,
}

impl GameRecord {
    /// Minutes between start and end, when the end is known.
    pub fn elapsed_minutes(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).num_minutes())
    }
}

pub fn build_game_record(raw: RawAttributeMap) -> Result<GameRecord, ConstructionError> {
    let mut r = FieldReader::new(&raw);

    let start = r.required_datetime("start_time", &["start_time", "start_time_text"]);
    let winner = r.required(
        "winning_team",
        &["winning_team", "winning_team_text"],
        "unknown winning team",
        label(classify_winning_team),
    );
    let (Some(start_time), Some(winning_team)) = (start, winner) else {
        return Err(r.into_error(RecordKind::Game));
    };

    let end_time = r.datetime("end_time", &["end_time", "end_time_text"]);
    let stated_duration = r.optional("duration", &["duration", "duration_text"], |v| {
        v.to_text()
            .and_then(|t| parse_duration_minutes(&t))
            .map(i64::from)
    });
    let player_count = r
        .count("player_count", &["player_count", "player_count_text"])
        .unwrap_or(DEFAULT_PLAYER_COUNT);
    let mafia_count = r
        .count("mafia_count", &["mafia_count", "mafia_count_text"])
        .unwrap_or(0);
    let civilian_count = r
        .count("civilian_count", &["civilian_count", "civilian_count_text"])
        .filter(|c| *c > 0)
        .unwrap_or_else(|| player_count.saturating_sub(mafia_count));

    let mut record = GameRecord {
        go_mafia_game_id: r.text("go_mafia_game_id", &["go_mafia_game_id"]),
        table_number: r.count("table_number", &["table_number", "table_text"]),
        table_name: r.text("table_name", &["table_name"]),
        moderator_name: r.text("moderator_name", &["moderator_name"]),
        start_time,
        end_time,
        duration: stated_duration,
        game_type: r
            .optional("game_type", &["game_type"], label(classify_game_type))
            .unwrap_or_default(),
        game_format: r
            .optional("game_format", &["game_format"], label(classify_game_format))
            .unwrap_or_default(),
        status: r
            .optional("status", &["status"], label(classify_game_status))
            .unwrap_or_default(),
        winning_team,
        win_condition: r.optional("win_condition", &["win_condition"], label(classify_win_condition)),
        tournament_id: r.text("tournament_id", &["tournament_id"]),
        tournament_round: r
            .count("tournament_round", &["tournament_round"])
            .filter(|n| *n > 0),
        tournament_stage: r.text("tournament_stage", &["tournament_stage"]),
        player_count,
        mafia_count,
        civilian_count,
        special_roles: r
            .text("special_roles", &["special_roles"])
            .map(|t| split_list(&t))
            .unwrap_or_default(),
        venue: r.text("venue", &["venue"]),
    };
    if let Some(minutes) = record.elapsed_minutes() {
        record.duration = (minutes > 0).then_some(minutes);
    }
    Ok(record)
}

fn split_list(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ──
