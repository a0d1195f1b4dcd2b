use super::{Validate, ValidationResult};
use crate::model::participation::{PlayerRole, SEATS};
use crate::model::GameParticipationRecord;

/// Rating moves larger than this in one game are flagged.
pub const ELO_SWING_LIMIT: i64 = 200;
/// Point totals beyond this magnitude are flagged.
pub const POINTS_LIMIT: f64 = 10.0;

impl Validate for GameParticipationRecord {
    fn check(&self, result: &mut ValidationResult) {
        let mut missing = Vec::new();
        if self.player_go_mafia_id == 0 {
            missing.push("player_go_mafia_id");
        }
        if self.game_identifier.trim().is_empty() {
            missing.push("game_identifier");
        }
        if self.nickname_at_time.trim().is_empty() {
            missing.push("nickname_at_time");
        }
        if !missing.is_empty() {
            result.add_error(format!(
                "Missing required participation fields: {}",
                missing.join(", ")
            ));
        }

        if !SEATS.contains(&i64::from(self.seat_position)) {
            result.add_error(format!("Seat position {} is outside 1..10", self.seat_position));
        }

        if self.role != PlayerRole::Moderator && self.team_side != self.role.expected_side() {
            result.add_error(format!(
                "Role {} must play for team {}, not {}",
                self.role.as_str(),
                self.role.expected_side().as_str(),
                self.team_side.as_str()
            ));
        }

        if self.elo_change.abs() > ELO_SWING_LIMIT {
            result.add_warning(format!("Large ELO change: {}", self.elo_change));
        }

        if self.total_points.abs() > POINTS_LIMIT {
            result.add_warning(format!("Unusual total points: {}", self.total_points));
        }

        if let Some(end) = self.game_end_time {
            if end <= self.game_start_time {
                result.add_error("Game end time must be after start time");
            } else if let Some(minutes) = self.game_duration.filter(|m| !(10..=300).contains(m)) {
                result.add_warning(format!("Unusual game duration: {minutes} minutes"));
            }
        }

        if let Some(acc) = self.voting_accuracy.filter(|a| !(0.0..=1.0).contains(a)) {
            result.add_error(format!("Voting accuracy {acc} is outside 0..1"));
        }
        if let Some(q) = self.speech_quality.filter(|q| !(0.0..=10.0).contains(q)) {
            result.add_error(format!("Speech quality {q} is outside 0..10"));
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::participation::TeamSide;
    use crate::model::{build_participation_record, RawAttributeMap, RawValue};
    use crate::validate::validate;

    fn participation(extra: &[(&str, &str)]) -> GameParticipationRecord {
        let mut raw: RawAttributeMap = [
            ("player_go_mafia_id", RawValue::Int(3170)),
            ("game_identifier", "1875-3-2".into()),
            ("seat_position", "7".into()),
            ("nickname_at_time", "TestPlayer".into()),
            ("role_text", "Мафия".into()),
            ("outcome_text", "Победа мафии".into()),
            ("elo_before", RawValue::Int(1250)),
            ("elo_after", RawValue::Int(1271)),
            ("game_start_time_text", "24.05.2025 12:00".into()),
            ("game_end_time_text", "24.05.2025 12:45".into()),
            ("base_points", "1".into()),
            ("bonus_points", "0.4".into()),
        ]
        .into_iter()
        .collect();
        for (k, v) in extra {
            raw.insert(*k, *v);
        }
        build_participation_record(raw).unwrap()
    }

    #[test]
    fn consistent_participation_is_clean() {
        let v = validate(&participation(&[]));
        assert!(v.is_valid(), "{:?}", v.errors());
        assert!(v.warnings().is_empty(), "{:?}", v.warnings());
    }

    #[test]
    fn mafia_on_town_side_is_one_error() {
        let v = validate(&participation(&[("team_side_text", "мирные")]));
        assert_eq!(v.errors().len(), 1);
        assert!(v.errors()[0].contains("MAFIA"));

        let v = validate(&participation(&[("role_text", "Шериф"), ("team_side_text", "мафия")]));
        assert_eq!(v.errors().len(), 1);
    }

    #[test]
    fn side_rule_over_every_role_and_side() {
        let roles = [
            PlayerRole::Civilian,
            PlayerRole::Mafia,
            PlayerRole::Don,
            PlayerRole::Sheriff,
            PlayerRole::Doctor,
            PlayerRole::Moderator,
        ];
        let sides = [TeamSide::Town, TeamSide::Mafia, TeamSide::Neutral];
        for role in roles {
            for side in sides {
                let p = participation(&[("role_text", role.as_str()), ("team_side_text", side.as_str())]);
                assert_eq!((p.role, p.team_side), (role, side));
                let mismatched = role != PlayerRole::Moderator && side != role.expected_side();
                let v = validate(&p);
                assert_eq!(
                    v.errors().len(),
                    usize::from(mismatched),
                    "{} on {}: {:?}",
                    role.as_str(),
                    side.as_str(),
                    v.errors()
                );
            }
        }
    }

    #[test]
    fn moderator_has_no_side() {
        let mut p = participation(&[]);
        p.role = PlayerRole::Moderator;
        p.team_side = TeamSide::Town;
        assert!(validate(&p).is_valid());
    }

    #[test]
    fn swings_and_durations_warn() {
        let v = validate(&participation(&[
            ("elo_before", "1000"),
            ("elo_after", "1300"),
            ("bonus_points", "12"),
            ("game_end_time_text", "24.05.2025 12:05"),
        ]));
        assert!(v.is_valid());
        assert_eq!(v.warnings().len(), 3, "{:?}", v.warnings());
    }

    #[test]
    fn ratings_out_of_range() {
        let v = validate(&participation(&[("voting_accuracy", "1.4"), ("speech_quality", "11")]));
        assert_eq!(v.errors().len(), 2);
    }

    #[test]
    fn end_before_start() {
        let v = validate(&participation(&[("game_end_time_text", "24.05.2025 11:00")]));
        assert_eq!(v.errors(), ["Game end time must be after start time"]);
    }
}
