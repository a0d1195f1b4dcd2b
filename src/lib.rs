//! Extraction, normalization and validation of GoMafia player and tournament
//! pages.
//!
//! Markup goes through three independent stages:
//!
//! 1. [`extract_player_fields`] / [`extract_tournament_fields`] turn markup
//!    into a loosely typed [`RawAttributeMap`];
//! 2. [`build_player_record`] / [`build_tournament_record`] (and the game and
//!    participation builders) coerce the map into a typed record or fail with
//!    a [`ConstructionError`];
//! 3. [`validate`] checks a record and returns a quality-scored
//!    [`ValidationResult`].

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod validate;

pub use error::{ConstructionError, FieldError, RecordKind};
pub use model::{
    build_game_record, build_participation_record, build_player_record, build_tournament_record,
    GameParticipationRecord, GameRecord, PlayerRecord, RawAttributeMap, RawValue, TournamentRecord,
};
pub use parser::{extract_player_fields, extract_tournament_fields};
pub use validate::{validate, Validate, ValidationResult};
