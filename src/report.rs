//! Whole-pipeline runs over one page: extract, build, validate.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ConstructionError, RecordKind};
use crate::model::{build_player_record, build_tournament_record, RawAttributeMap};
use crate::parser::{extract_player_fields, extract_tournament_fields};
use crate::validate::{validate, Validate, ValidationResult};

/// Everything known about one page after a run. The raw map is always kept so
/// a failure can be turned into a fixture.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub locator: String,
    pub kind: RecordKind,
    pub raw: RawAttributeMap,
    pub record: Option<serde_json::Value>,
    pub construction_error: Option<String>,
    pub validation: Option<ValidationResult>,
}

impl VerificationOutcome {
    /// Built and free of validation errors.
    pub fn passed(&self) -> bool {
        self.validation.as_ref().is_some_and(ValidationResult::is_valid)
    }
}

pub fn verify_player(markup: &str, source_locator: &str) -> VerificationOutcome {
    let raw = extract_player_fields(markup, source_locator);
    verify(RecordKind::Player, source_locator, raw, build_player_record)
}

pub fn verify_tournament(markup: &str, source_locator: &str) -> VerificationOutcome {
    let raw = extract_tournament_fields(markup, source_locator);
    verify(RecordKind::Tournament, source_locator, raw, build_tournament_record)
}

fn verify<R>(
    kind: RecordKind,
    locator: &str,
    raw: RawAttributeMap,
    build: fn(RawAttributeMap) -> Result<R, ConstructionError>,
) -> VerificationOutcome
where
    R: Validate + Serialize,
{
    let mut outcome = VerificationOutcome {
        locator: locator.to_string(),
        kind,
        raw: raw.clone(),
        record: None,
        construction_error: None,
        validation: None,
    };
    match build(raw) {
        Ok(record) => {
            let verdict = validate(&record);
            debug!(%kind, locator, summary = %verdict.summary(), "validated");
            outcome.record = serde_json::to_value(&record)
                .map_err(|e| warn!(%kind, locator, error = %e, "record not serializable"))
                .ok();
            outcome.validation = Some(verdict);
        }
        Err(e) => {
            warn!(%kind, locator, error = %e, "construction failed");
            outcome.construction_error = Some(e.to_string());
        }
    }
    outcome
}

/// Counts over a batch of outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub not_built: usize,
    pub warnings: usize,
    /// Mean quality over built records only.
    pub average_quality: Option<f64>,
}

pub fn summarize(outcomes: &[VerificationOutcome]) -> Summary {
    let mut s = Summary {
        total: outcomes.len(),
        ..Summary::default()
    };
    let mut quality = Vec::new();
    for o in outcomes {
        match &o.validation {
            None => s.not_built += 1,
            Some(v) => {
                if v.is_valid() {
                    s.valid += 1;
                } else {
                    s.invalid += 1;
                }
                s.warnings += v.warnings().len();
                quality.push(v.quality_score());
            }
        }
    }
    if !quality.is_empty() {
        s.average_quality = Some(quality.iter().sum::<f64>() / quality.len() as f64);
    }
    s
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages: {} valid, {} invalid, {} not built, {} warnings",
            self.total, self.valid, self.invalid, self.not_built, self.warnings
        )?;
        if let Some(q) = self.average_quality {
            write!(f, " (avg quality {q:.1}%)")?;
        }
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_page_passes() {
        let html = std::fs::read_to_string("tests/fixtures/player_next_data.html").unwrap();
        let o = verify_player(&html, "https://gomafia.pro/stats/3170");
        assert!(o.passed(), "{:?}", o.construction_error);
        assert_eq!(o.kind, RecordKind::Player);
        let record = o.record.unwrap();
        assert_eq!(record["go_mafia_id"], 3170);
        assert!(record["win_rate"].is_null());
    }

    #[test]
    fn empty_page_keeps_raw_and_error() {
        let o = verify_tournament("<html><body></body></html>", "https://gomafia.pro/tournament/9");
        assert!(!o.passed());
        assert!(o.validation.is_none());
        assert!(o.construction_error.unwrap().contains("tournament"));
        assert!(o.raw.contains("source_url"));
    }

    #[test]
    fn summary_counts() {
        let html = std::fs::read_to_string("tests/fixtures/tournament_listing.html").unwrap();
        let outcomes = vec![
            verify_tournament(&html, "https://gomafia.pro/tournament/1875"),
            verify_tournament("", "https://gomafia.pro/tournament/1"),
        ];
        let s = summarize(&outcomes);
        assert_eq!((s.total, s.valid, s.not_built), (2, 1, 1));
        assert_eq!(s.average_quality, Some(100.0));
        assert!(s.to_string().starts_with("2 pages: 1 valid"));
    }
}
