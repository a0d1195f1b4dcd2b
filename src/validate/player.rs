use super::{Validate, ValidationResult};
use crate::model::PlayerRecord;

/// Allowed gap between the published win rate and won/played.
pub const WIN_RATE_TOLERANCE: f64 = 0.01;

impl Validate for PlayerRecord {
    fn check(&self, result: &mut ValidationResult) {
        let mut missing = Vec::new();
        if self.go_mafia_id == 0 {
            missing.push("go_mafia_id");
        }
        if self.current_nickname.trim().is_empty() {
            missing.push("current_nickname");
        }
        if self.profile_url.trim().is_empty() {
            missing.push("profile_url");
        }
        if !missing.is_empty() {
            result.add_error(format!("Missing required player fields: {}", missing.join(", ")));
        }

        if self.games_won > self.games_played {
            result.add_error(format!(
                "Games won ({}) exceeds games played ({})",
                self.games_won, self.games_played
            ));
        }

        if let (Some(stored), Some(computed)) = (self.win_rate, self.computed_win_rate()) {
            if (stored - computed).abs() > WIN_RATE_TOLERANCE {
                result.add_warning(format!(
                    "Win rate mismatch: stored {stored:.4}, calculated {computed:.4}"
                ));
            }
        }

        let role_games = self.roles.total_games();
        if role_games > u64::from(self.games_played) {
            result.add_error(format!(
                "Role games total ({role_games}) exceeds games played ({})",
                self.games_played
            ));
        }

        if let (Some(max), Some(current)) = (self.max_elo, self.current_elo) {
            if max < current {
                result.add_warning(format!("Max ELO ({max}) is below current ELO ({current})"));
            }
        }

        let outside = |r: &f64| !(0.0..=1.0).contains(r);
        if let Some(rate) = self.win_rate.filter(outside) {
            result.add_error(format!("win_rate {rate} is outside 0..1"));
        }
        for (role, stats) in self.roles.iter() {
            if let Some(rate) = stats.win_rate.filter(outside) {
                result.add_error(format!("{role}_win_rate {rate} is outside 0..1"));
            }
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::player::{RoleBreakdown, RoleStats};
    use crate::model::{build_player_record, RawAttributeMap, RawValue};
    use crate::validate::validate;

    fn player() -> PlayerRecord {
        PlayerRecord {
            go_mafia_id: 3170,
            current_nickname: "TestPlayer".into(),
            profile_url: "https://gomafia.pro/stats/3170".into(),
            registered_year: None,
            current_elo: Some(1250),
            table_elo: None,
            max_elo: None,
            games_played: 100,
            games_won: 65,
            win_rate: None,
            average_points: None,
            roles: RoleBreakdown::default(),
            best_win_streak: 0,
            current_streak: 0,
            total_points: None,
            awards_count: 0,
            last_game_at: None,
            last_tournament_at: None,
            is_active: true,
        }
    }

    #[test]
    fn clean_player_is_perfect() {
        let v = validate(&player());
        assert!(v.is_valid());
        assert_eq!(v.quality_score(), 100.0);
    }

    #[test]
    fn more_wins_than_games() {
        let mut p = player();
        p.games_won = 120;
        let v = validate(&p);
        assert!(!v.is_valid());
        assert!(v.errors()[0].contains("Games won (120)"));
    }

    #[test]
    fn rate_drift_is_a_warning() {
        let mut p = player();
        p.win_rate = Some(0.6);
        let v = validate(&p);
        assert!(v.is_valid());
        assert_eq!(v.warnings().len(), 1);

        p.win_rate = Some(0.655);
        assert!(validate(&p).warnings().is_empty());
    }

    fn built(played: u32, won: u32, rate: Option<f64>) -> PlayerRecord {
        let mut raw: RawAttributeMap = [
            ("go_mafia_id", RawValue::Int(3170)),
            ("current_nickname", "TestPlayer".into()),
            ("profile_url", "https://gomafia.pro/stats/3170".into()),
        ]
        .into_iter()
        .collect();
        raw.insert("games_played", played.to_string());
        raw.insert("games_won", won.to_string());
        raw.insert_opt("win_rate", rate.map(|r| r.to_string()));
        build_player_record(raw).unwrap()
    }

    #[test]
    fn exact_rates_never_warn() {
        for played in 0..=50u32 {
            for won in 0..=played {
                let rate = (played > 0).then(|| f64::from(won) / f64::from(played));
                let v = validate(&built(played, won, rate));
                assert!(v.is_valid(), "{won}/{played}: {:?}", v.errors());
                assert!(v.warnings().is_empty(), "{won}/{played}: {:?}", v.warnings());
            }
        }
    }

    #[test]
    fn drifted_rates_warn_once() {
        for played in 1..=50u32 {
            for won in 0..=played {
                let exact = f64::from(won) / f64::from(played);
                let drifted = if exact + 0.02 <= 1.0 { exact + 0.02 } else { exact - 0.02 };
                let v = validate(&built(played, won, Some(drifted)));
                assert!(v.is_valid(), "{won}/{played}: {:?}", v.errors());
                assert_eq!(v.warnings().len(), 1, "{won}/{played}: {:?}", v.warnings());
            }
        }
    }

    #[test]
    fn out_of_range_rate_names_the_field_once() {
        let mut p = player();
        p.roles.don = RoleStats { games: 0, win_rate: Some(1.5) };
        let v = validate(&p);
        assert_eq!(v.errors(), ["don_win_rate 1.5 is outside 0..1"]);
    }

    #[test]
    fn every_check_runs() {
        let mut p = player();
        p.current_nickname = " ".into();
        p.max_elo = Some(1000);
        p.roles.mafia = RoleStats { games: 150, win_rate: Some(1.5) };
        let v = validate(&p);
        assert_eq!(v.errors().len(), 3, "{:?}", v.errors());
        assert_eq!(v.warnings().len(), 1);
        assert_eq!(v.quality_score(), 100.0 - 60.0 - 5.0);
    }
}
