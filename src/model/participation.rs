use chrono::NaiveDateTime;
use serde::Serialize;

use super::fields::FieldReader;
use super::lexicon::{classify_outcome, classify_role, classify_team_side};
use super::raw::{RawAttributeMap, RawValue};
use crate::error::{ConstructionError, RecordKind};
use crate::parser::text::parse_duration_minutes;

pub const DEFAULT_DATA_SOURCE: &str = "gomafia_tournament";
pub const SEATS: std::ops::RangeInclusive<i64> = 1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Civilian,
    Mafia,
    Don,
    Sheriff,
    Doctor,
    Moderator,
}

impl PlayerRole {
    /// Side this role plays for; the moderator sits outside both teams.
    pub fn expected_side(self) -> TeamSide {
        match self {
            PlayerRole::Civilian | PlayerRole::Sheriff | PlayerRole::Doctor => TeamSide::Town,
            PlayerRole::Mafia | PlayerRole::Don => TeamSide::Mafia,
            PlayerRole::Moderator => TeamSide::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerRole::Civilian => "CIVILIAN",
            PlayerRole::Mafia => "MAFIA",
            PlayerRole::Don => "DON",
            PlayerRole::Sheriff => "SHERIFF",
            PlayerRole::Doctor => "DOCTOR",
            PlayerRole::Moderator => "MODERATOR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamSide {
    Town,
    Mafia,
    Neutral,
}

impl TeamSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamSide::Town => "TOWN",
            TeamSide::Mafia => "MAFIA",
            TeamSide::Neutral => "NEUTRAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamOutcome {
    TownWin,
    MafiaWin,
    Draw,
}

impl TeamOutcome {
    /// Winning side; a draw has none.
    pub fn winner(self) -> Option<TeamSide> {
        match self {
            TeamOutcome::TownWin => Some(TeamSide::Town),
            TeamOutcome::MafiaWin => Some(TeamSide::Mafia),
            TeamOutcome::Draw => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOutcome {
    Won,
    Lost,
    Draw,
}

impl GameOutcome {
    pub fn derive(team: TeamOutcome, side: TeamSide) -> GameOutcome {
        match team.winner() {
            None => GameOutcome::Draw,
            Some(winner) if winner == side => GameOutcome::Won,
            Some(_) => GameOutcome::Lost,
        }
    }
}

/// One player's seat in one game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameParticipationRecord {
    pub player_go_mafia_id: u64,
    pub game_identifier: String,
    pub seat_position: u8,
    pub nickname_at_time: String,

    pub role: PlayerRole,
    pub team_side: TeamSide,
    pub game_outcome: TeamOutcome,
    pub personal_outcome: GameOutcome,

    pub base_points: f64,
    pub bonus_points: f64,
    pub penalty_points: f64,
    pub total_points: f64,

    pub elo_before: u32,
    pub elo_after: u32,
    pub elo_change: i64,

    pub voting_accuracy: Option<f64>,
    pub night_actions: Option<u32>,
    pub speech_quality: Option<f64>,

    pub game_start_time: NaiveDateTime,
    pub game_end_time: Option<NaiveDateTime>,
    pub game_duration: Option<i64>,

    pub tournament_id: Option<String>,
    pub tournament_round: Option<u32>,
    pub tournament_stage: Option<String>,
    pub data_source: String,
}

impl GameParticipationRecord {
    /// Recompute every derived field from its inputs.
    pub fn recompute(&mut self) {
        self.elo_change = i64::from(self.elo_after) - i64::from(self.elo_before);
        self.total_points = self.base_points + self.bonus_points - self.penalty_points;
        self.personal_outcome = GameOutcome::derive(self.game_outcome, self.team_side);
        if let Some(end) = self.game_end_time {
            self.game_duration = Some((end - self.game_start_time).num_minutes());
        }
    }
}

pub fn build_participation_record(
    raw: RawAttributeMap,
) -> Result<GameParticipationRecord, ConstructionError> {
    let mut r = FieldReader::new(&raw);

    let player_id = r.required("player_go_mafia_id", &["player_go_mafia_id"], "not a positive id", |v| {
        v.as_int().filter(|i| *i > 0).and_then(|i| u64::try_from(i).ok())
    });
    let game_identifier = r.required_text("game_identifier", &["game_identifier"]);
    let seat = r.required("seat_position", &["seat_position", "seat"], "seat must be 1..=10", |v| {
        v.as_int()
            .filter(|s| SEATS.contains(s))
            .and_then(|s| u8::try_from(s).ok())
    });
    let nickname = r.required_text("nickname_at_time", &["nickname_at_time", "nickname"]);
    let role = r.required("role", &["role", "role_text"], "unknown role", label(classify_role));
    let outcome = r.required(
        "game_outcome",
        &["game_outcome", "outcome_text"],
        "unknown game outcome",
        label(classify_outcome),
    );
    let elo_before = r.required("elo_before", &["elo_before"], "not a non-negative rating", rating);
    let elo_after = r.required("elo_after", &["elo_after"], "not a non-negative rating", rating);
    let start = r.required_datetime("game_start_time", &["game_start_time", "game_start_time_text"]);

    let team_side = r.optional("team_side", &["team_side", "team_side_text"], label(classify_team_side));
    let end = r.datetime("game_end_time", &["game_end_time", "game_end_time_text"]);
    let duration = r.optional("game_duration", &["game_duration", "game_duration_text"], |v| {
        v.to_text()
            .and_then(|t| parse_duration_minutes(&t))
            .map(i64::from)
    });

    let (
        Some(player_go_mafia_id),
        Some(game_identifier),
        Some(seat_position),
        Some(nickname_at_time),
        Some(role),
        Some(game_outcome),
        Some(elo_before),
        Some(elo_after),
        Some(game_start_time),
    ) = (player_id, game_identifier, seat, nickname, role, outcome, elo_before, elo_after, start)
    else {
        return Err(r.into_error(RecordKind::Participation));
    };

    let team_side = team_side.unwrap_or_else(|| role.expected_side());
    let mut record = GameParticipationRecord {
        player_go_mafia_id,
        game_identifier,
        seat_position,
        nickname_at_time,
        role,
        team_side,
        game_outcome,
        personal_outcome: GameOutcome::derive(game_outcome, team_side),
        base_points: r.float("base_points", &["base_points"]).unwrap_or(0.0),
        bonus_points: r.float("bonus_points", &["bonus_points"]).unwrap_or(0.0),
        penalty_points: r.float("penalty_points", &["penalty_points"]).unwrap_or(0.0),
        total_points: 0.0,
        elo_before,
        elo_after,
        elo_change: 0,
        voting_accuracy: r.float("voting_accuracy", &["voting_accuracy"]),
        night_actions: r.count("night_actions", &["night_actions"]),
        speech_quality: r.float("speech_quality", &["speech_quality"]),
        game_start_time,
        game_end_time: end,
        game_duration: duration,
        tournament_id: r.text("tournament_id", &["tournament_id"]),
        tournament_round: r.count("tournament_round", &["tournament_round"]),
        tournament_stage: r.text("tournament_stage", &["tournament_stage"]),
        data_source: r
            .text("data_source", &["data_source"])
            .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string()),
    };
    record.recompute();
    Ok(record)
}

/// Adapt a lexicon lookup to a raw value.
pub(crate) fn label<T>(classify: fn(&str) -> Option<T>) -> impl Fn(&RawValue) -> Option<T> {
    move |v| v.to_text().and_then(|t| classify(&t))
}

fn rating(v: &RawValue) -> Option<u32> {
    v.as_int().and_then(|i| u32::try_from(i).ok())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;

    fn base() -> RawAttributeMap {
        [
            ("player_go_mafia_id", RawValue::Int(3170)),
            ("game_identifier", "1875-3-2".into()),
            ("seat_position", "4".into()),
            ("nickname_at_time", "TestPlayer".into()),
            ("role_text", "Шериф".into()),
            ("outcome_text", "Победа мирных".into()),
            ("elo_before", RawValue::Int(1250)),
            ("elo_after", RawValue::Int(1268)),
            ("game_start_time_text", "24.05.2025 12:00".into()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn derives_side_outcome_and_delta() {
        let rec = build_participation_record(base()).unwrap();
        assert_eq!(rec.role, PlayerRole::Sheriff);
        assert_eq!(rec.team_side, TeamSide::Town);
        assert_eq!(rec.game_outcome, TeamOutcome::TownWin);
        assert_eq!(rec.personal_outcome, GameOutcome::Won);
        assert_eq!(rec.elo_change, 18);
        assert_eq!(rec.data_source, DEFAULT_DATA_SOURCE);
    }

    #[test]
    fn total_points_is_recomputed() {
        let mut raw = base();
        raw.insert("base_points", "3");
        raw.insert("bonus_points", "1");
        raw.insert("penalty_points", "0.5");
        raw.insert("total_points", "999");
        let rec = build_participation_record(raw).unwrap();
        assert_eq!(rec.total_points, 3.5);
    }

    #[test]
    fn supplied_side_is_kept_even_when_inconsistent() {
        let mut raw = base();
        raw.insert("role_text", "Дон");
        raw.insert("team_side_text", "мирные");
        let rec = build_participation_record(raw).unwrap();
        assert_eq!(rec.role, PlayerRole::Don);
        assert_eq!(rec.team_side, TeamSide::Town);
        assert_eq!(rec.personal_outcome, GameOutcome::Won);
    }

    #[test]
    fn draw_and_loss() {
        assert_eq!(GameOutcome::derive(TeamOutcome::Draw, TeamSide::Mafia), GameOutcome::Draw);
        assert_eq!(GameOutcome::derive(TeamOutcome::MafiaWin, TeamSide::Town), GameOutcome::Lost);
        assert_eq!(GameOutcome::derive(TeamOutcome::TownWin, TeamSide::Neutral), GameOutcome::Lost);
    }

    #[test]
    fn duration_comes_from_timestamps() {
        let mut raw = base();
        raw.insert("game_end_time_text", "24.05.2025 12:47");
        raw.insert("game_duration_text", "5 мин");
        let rec = build_participation_record(raw).unwrap();
        assert_eq!(rec.game_duration, Some(47));
    }

    #[test]
    fn bad_seat_and_unknown_role_fail_together() {
        let mut raw = base();
        raw.insert("seat_position", "11");
        raw.insert("role_text", "зритель");
        let err = build_participation_record(raw).unwrap_err();
        let fields: Vec<_> = err.issues.iter().map(FieldError::field).collect();
        assert_eq!(fields, vec!["seat_position", "role"]);
        assert_eq!(err.kind, RecordKind::Participation);
        assert!(err.raw.contains("seat_position"));
    }
}
