use std::ops::RangeInclusive;

use super::{Validate, ValidationResult};
use crate::model::GameRecord;

pub const PLAYER_COUNT_RANGE: RangeInclusive<u32> = 4..=20;
pub const MAFIA_RATIO_RANGE: RangeInclusive<f64> = 0.2..=0.4;
const GAME_MINUTES: RangeInclusive<i64> = 5..=300;

impl Validate for GameRecord {
    fn check(&self, result: &mut ValidationResult) {
        if let Some(minutes) = self.elapsed_minutes() {
            if minutes <= 0 {
                result.add_error("End time must be after start time");
            } else if !GAME_MINUTES.contains(&minutes) {
                result.add_warning(format!("Unusual game duration: {minutes} minutes"));
            }
        }

        if !PLAYER_COUNT_RANGE.contains(&self.player_count) {
            result.add_error(format!("Player count {} is outside 4..20", self.player_count));
        }

        let assigned = u64::from(self.mafia_count) + u64::from(self.civilian_count);
        if assigned > 0 && assigned != u64::from(self.player_count) {
            result.add_warning(format!(
                "Role count mismatch: {} mafia + {} civilians != {} players",
                self.mafia_count, self.civilian_count, self.player_count
            ));
        }

        if self.mafia_count > 0 && self.player_count > 0 {
            let ratio = f64::from(self.mafia_count) / f64::from(self.player_count);
            if !MAFIA_RATIO_RANGE.contains(&ratio) {
                result.add_warning(format!("Unusual mafia ratio: {:.1}%", ratio * 100.0));
            }
        }

        if self.tournament_id.is_some() && self.tournament_round.is_none() {
            result.add_warning("Tournament game missing round number");
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_game_record, RawAttributeMap};
    use crate::validate::validate;

    fn game(pairs: &[(&str, &str)]) -> GameRecord {
        let mut raw: RawAttributeMap = [
            ("start_time_text", "24.05.2025 12:00"),
            ("end_time_text", "24.05.2025 12:50"),
            ("winning_team_text", "Победа города"),
            ("mafia_count", "3"),
        ]
        .into_iter()
        .collect();
        for (k, v) in pairs {
            raw.insert(*k, *v);
        }
        build_game_record(raw).unwrap()
    }

    #[test]
    fn standard_table_is_clean() {
        let v = validate(&game(&[]));
        assert!(v.is_valid(), "{:?}", v.errors());
        assert!(v.warnings().is_empty(), "{:?}", v.warnings());
    }

    #[test]
    fn inverted_times_are_an_error() {
        let v = validate(&game(&[("end_time_text", "24.05.2025 11:00")]));
        assert_eq!(v.errors(), ["End time must be after start time"]);
    }

    #[test]
    fn short_game_and_heavy_mafia() {
        let v = validate(&game(&[("end_time_text", "24.05.2025 12:03"), ("mafia_count", "5")]));
        assert!(v.is_valid());
        assert_eq!(v.warnings().len(), 2, "{:?}", v.warnings());
    }

    #[test]
    fn tournament_game_needs_round() {
        let v = validate(&game(&[("tournament_id", "1234")]));
        assert_eq!(v.warnings(), ["Tournament game missing round number"]);
        assert!(validate(&game(&[("tournament_id", "1234"), ("tournament_round", "2")]))
            .warnings()
            .is_empty());
    }

    #[test]
    fn player_count_bounds() {
        let v = validate(&game(&[("player_count", "30"), ("civilian_count", "27")]));
        assert!(!v.is_valid());
        assert!(v.errors()[0].contains("Player count 30"));
    }

    #[test]
    fn huge_role_counts_do_not_overflow() {
        let v = validate(&game(&[("mafia_count", "4000000000"), ("civilian_count", "4000000000")]));
        assert!(v.warnings().iter().any(|w| w.starts_with("Role count mismatch")));
    }

    #[test]
    fn role_mismatch() {
        let v = validate(&game(&[("civilian_count", "6")]));
        assert_eq!(v.warnings().len(), 1);
        assert!(v.warnings()[0].starts_with("Role count mismatch"));
    }
}
