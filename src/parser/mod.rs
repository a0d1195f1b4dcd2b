pub mod extract;
pub mod page;
pub mod payload;
pub mod text;

pub use extract::{extract_player_fields, extract_tournament_fields};
