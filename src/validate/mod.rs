//! Record-level consistency checks. Every check runs; nothing short-circuits.

mod game;
mod participation;
mod player;
mod tournament;

use serde::Serialize;

pub use game::{MAFIA_RATIO_RANGE, PLAYER_COUNT_RANGE};
pub use participation::{ELO_SWING_LIMIT, POINTS_LIMIT};
pub use player::WIN_RATE_TOLERANCE;
pub use tournament::MAX_TOURNAMENT_DAYS;

pub const ERROR_PENALTY: f64 = 20.0;
pub const WARNING_PENALTY: f64 = 5.0;

/// Verdict of one validation pass over one record.
///
/// Validity is lost for good on the first error. The quality score starts at
/// 100 and drops by [`ERROR_PENALTY`] per error and [`WARNING_PENALTY`] per
/// warning, with no floor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    quality_score: f64,
}

impl Default for ValidationResult {
    fn default() -> Self {
        ValidationResult {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            quality_score: 100.0,
        }
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
        self.quality_score -= ERROR_PENALTY;
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
        self.quality_score -= WARNING_PENALTY;
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn summary(&self) -> String {
        format!(
            "Validation: {} (Quality: {:.1}%) - {} errors, {} warnings",
            if self.is_valid { "VALID" } else { "INVALID" },
            self.quality_score,
            self.errors.len(),
            self.warnings.len(),
        )
    }
}

/// A record that knows how to check itself.
pub trait Validate {
    fn check(&self, result: &mut ValidationResult);
}

pub fn validate<R: Validate + ?Sized>(record: &R) -> ValidationResult {
    let mut result = ValidationResult::new();
    record.check(&mut result);
    result
}

// ── Tests ──
