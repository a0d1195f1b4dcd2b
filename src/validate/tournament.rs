use super::{Validate, ValidationResult};
use crate::model::TournamentRecord;

pub const MAX_TOURNAMENT_DAYS: i64 = 30;

impl Validate for TournamentRecord {
    fn check(&self, result: &mut ValidationResult) {
        if self.name.trim().is_empty() {
            result.add_error("Missing required tournament fields: name");
        }

        // Ordering itself is guaranteed by DateRange.
        match self.dates.span_days() {
            0 => result.add_warning("Single-day tournament"),
            days if days > MAX_TOURNAMENT_DAYS => {
                result.add_warning(format!("Very long tournament duration: {days} days"))
            }
            _ => {}
        }

        if let (Some(current), Some(max)) = (self.current_participants, self.max_participants) {
            if current > max {
                result.add_error(format!(
                    "Current participants ({current}) exceeds maximum ({max})"
                ));
            }
        }

        if let Some(total) = self.total_rounds {
            if self.current_round > total {
                result.add_error(format!(
                    "Current round ({}) exceeds total rounds ({total})",
                    self.current_round
                ));
            }
        }

        for (name, amount) in [("Entry fee", self.entry_fee), ("Prize pool", self.prize_pool)] {
            if let Some(amount) = amount.filter(|a| *a < 0.0) {
                result.add_error(format!("{name} cannot be negative: {amount}"));
            }
        }
    }
}

// ── Tests ──
