//! Typed records and their two-phase builders.

mod fields;
pub mod game;
pub mod lexicon;
pub mod participation;
pub mod player;
pub mod raw;
pub mod tournament;

pub use game::{build_game_record, GameRecord};
pub use participation::{build_participation_record, GameParticipationRecord};
pub use player::{build_player_record, PlayerRecord};
pub use raw::{RawAttributeMap, RawValue};
pub use tournament::{build_tournament_record, DateRange, TournamentRecord};
