use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::raw::RawAttributeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Player,
    Tournament,
    Game,
    Participation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Player => "player",
            RecordKind::Tournament => "tournament",
            RecordKind::Game => "game",
            RecordKind::Participation => "game participation",
        })
    }
}

/// One field that could not be turned into its typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("required field `{field}` is missing")]
    Missing { field: &'static str },
    #[error("field `{field}` has unusable value {raw:?}: {reason}")]
    Invalid {
        field: &'static str,
        raw: String,
        reason: &'static str,
    },
    #[error("`{end_field}` ({end}) must be after `{start_field}` ({start})")]
    DateOrder {
        start_field: &'static str,
        end_field: &'static str,
        start: String,
        end: String,
    },
}

impl FieldError {
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::Missing { field } | FieldError::Invalid { field, .. } => *field,
            FieldError::DateOrder { end_field, .. } => *end_field,
        }
    }
}

/// A record could not be assembled. Carries every field issue found and the
/// raw map it was built from, so the page can be kept as a fixture.
#[derive(Debug, Clone, Error)]
#[error("cannot build {kind} record: {}", summarize(.issues))]
pub struct ConstructionError {
    pub kind: RecordKind,
    pub issues: Vec<FieldError>,
    pub raw: Box<RawAttributeMap>,
}

impl ConstructionError {
    pub fn new(kind: RecordKind, issues: Vec<FieldError>, raw: RawAttributeMap) -> Self {
        ConstructionError {
            kind,
            issues,
            raw: Box::new(raw),
        }
    }

    pub fn has_date_order_issue(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, FieldError::DateOrder { .. }))
    }
}

fn summarize(issues: &[FieldError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
