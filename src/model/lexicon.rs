//! Free-text labels (Russian and English) mapped onto closed enumerations by
//! substring match. Unmatched text yields `None`.

use super::game::{GameFormat, GameStatus, GameType, WinCondition};
use super::participation::{PlayerRole, TeamOutcome, TeamSide};
use super::tournament::{TournamentFormat, TournamentStatus, TournamentType};
use crate::parser::text::normalize_text;

/// Don and the town specials come before the plain team stems so that
/// "Дон мафии" is a don, not a mafioso.
const ROLES: &[(&str, PlayerRole)] = &[
    ("дон", PlayerRole::Don),
    ("don", PlayerRole::Don),
    ("шериф", PlayerRole::Sheriff),
    ("комиссар", PlayerRole::Sheriff),
    ("sheriff", PlayerRole::Sheriff),
    ("доктор", PlayerRole::Doctor),
    ("врач", PlayerRole::Doctor),
    ("doctor", PlayerRole::Doctor),
    ("ведущ", PlayerRole::Moderator),
    ("moderator", PlayerRole::Moderator),
    ("host", PlayerRole::Moderator),
    ("мафи", PlayerRole::Mafia),
    ("mafia", PlayerRole::Mafia),
    ("мирн", PlayerRole::Civilian),
    ("civilian", PlayerRole::Civilian),
    ("citizen", PlayerRole::Civilian),
];

/// Draw first: "ничья" pages often also name both teams.
const OUTCOMES: &[(&str, TeamOutcome)] = &[
    ("ничья", TeamOutcome::Draw),
    ("ничейн", TeamOutcome::Draw),
    ("draw", TeamOutcome::Draw),
    ("tie", TeamOutcome::Draw),
    ("мирн", TeamOutcome::TownWin),
    ("город", TeamOutcome::TownWin),
    ("красн", TeamOutcome::TownWin),
    ("town", TeamOutcome::TownWin),
    ("civilian", TeamOutcome::TownWin),
    ("red", TeamOutcome::TownWin),
    ("мафи", TeamOutcome::MafiaWin),
    ("черн", TeamOutcome::MafiaWin),
    ("чёрн", TeamOutcome::MafiaWin),
    ("mafia", TeamOutcome::MafiaWin),
    ("black", TeamOutcome::MafiaWin),
];

const SIDES: &[(&str, TeamSide)] = &[
    ("нейтрал", TeamSide::Neutral),
    ("neutral", TeamSide::Neutral),
    ("мирн", TeamSide::Town),
    ("город", TeamSide::Town),
    ("красн", TeamSide::Town),
    ("town", TeamSide::Town),
    ("red", TeamSide::Town),
    ("мафи", TeamSide::Mafia),
    ("черн", TeamSide::Mafia),
    ("чёрн", TeamSide::Mafia),
    ("mafia", TeamSide::Mafia),
    ("black", TeamSide::Mafia),
];

const TOURNAMENT_TYPES: &[(&str, TournamentType)] = &[
    ("команд", TournamentType::Team),
    ("team", TournamentType::Team),
    ("личн", TournamentType::Individual),
    ("individual", TournamentType::Individual),
    ("смешан", TournamentType::Mixed),
    ("mixed", TournamentType::Mixed),
];

const TOURNAMENT_STATUSES: &[(&str, TournamentStatus)] = &[
    ("отмен", TournamentStatus::Cancelled),
    ("cancel", TournamentStatus::Cancelled),
    ("заверш", TournamentStatus::Completed),
    ("окончен", TournamentStatus::Completed),
    ("completed", TournamentStatus::Completed),
    ("finished", TournamentStatus::Completed),
    ("ended", TournamentStatus::Completed),
    ("идет", TournamentStatus::Active),
    ("идёт", TournamentStatus::Active),
    ("в процессе", TournamentStatus::Active),
    ("active", TournamentStatus::Active),
    ("ongoing", TournamentStatus::Active),
    ("in progress", TournamentStatus::Active),
    ("live", TournamentStatus::Active),
    ("регистрац", TournamentStatus::Upcoming),
    ("предстоящ", TournamentStatus::Upcoming),
    ("скоро", TournamentStatus::Upcoming),
    ("upcoming", TournamentStatus::Upcoming),
    ("registration", TournamentStatus::Upcoming),
    ("scheduled", TournamentStatus::Upcoming),
];

const TOURNAMENT_FORMATS: &[(&str, TournamentFormat)] = &[
    ("double elim", TournamentFormat::DoubleElimination),
    ("двойн", TournamentFormat::DoubleElimination),
    ("single elim", TournamentFormat::SingleElimination),
    ("олимпийск", TournamentFormat::SingleElimination),
    ("плей офф", TournamentFormat::SingleElimination),
    ("playoff", TournamentFormat::SingleElimination),
    ("кругов", TournamentFormat::RoundRobin),
    ("round robin", TournamentFormat::RoundRobin),
    ("швейцар", TournamentFormat::Swiss),
    ("swiss", TournamentFormat::Swiss),
    ("лестниц", TournamentFormat::Ladder),
    ("ladder", TournamentFormat::Ladder),
];

const GAME_TYPES: &[(&str, GameType)] = &[
    ("чемпионат", GameType::Championship),
    ("championship", GameType::Championship),
    ("трениров", GameType::Training),
    ("training", GameType::Training),
    ("блиц", GameType::Blitz),
    ("blitz", GameType::Blitz),
    ("турнир", GameType::Tournament),
    ("tournament", GameType::Tournament),
    ("классик", GameType::Classic),
    ("classic", GameType::Classic),
];

const GAME_FORMATS: &[(&str, GameFormat)] = &[
    ("чемпионат", GameFormat::Championship),
    ("championship", GameFormat::Championship),
    ("трениров", GameFormat::Training),
    ("training", GameFormat::Training),
    ("скорост", GameFormat::Speed),
    ("speed", GameFormat::Speed),
    ("блиц", GameFormat::Blitz),
    ("blitz", GameFormat::Blitz),
    ("турнир", GameFormat::Tournament),
    ("tournament", GameFormat::Tournament),
    ("классик", GameFormat::Classic),
    ("classic", GameFormat::Classic),
];

const GAME_STATUSES: &[(&str, GameStatus)] = &[
    ("отмен", GameStatus::Cancelled),
    ("cancel", GameStatus::Cancelled),
    ("заверш", GameStatus::Completed),
    ("сыгран", GameStatus::Completed),
    ("completed", GameStatus::Completed),
    ("finished", GameStatus::Completed),
    ("идет", GameStatus::InProgress),
    ("идёт", GameStatus::InProgress),
    ("in progress", GameStatus::InProgress),
    ("ожида", GameStatus::Pending),
    ("pending", GameStatus::Pending),
];

const WIN_CONDITIONS: &[(&str, WinCondition)] = &[
    ("большинств", WinCondition::MafiaMajority),
    ("majority", WinCondition::MafiaMajority),
    ("голосов", WinCondition::Voting),
    ("voting", WinCondition::Voting),
    ("vote", WinCondition::Voting),
    ("отстрел", WinCondition::Elimination),
    ("убийств", WinCondition::Elimination),
    ("elimination", WinCondition::Elimination),
    ("время", WinCondition::Timeout),
    ("timeout", WinCondition::Timeout),
    ("техническ", WinCondition::Forfeit),
    ("дисквал", WinCondition::Forfeit),
    ("forfeit", WinCondition::Forfeit),
];

pub fn classify_role(text: &str) -> Option<PlayerRole> {
    classify(text, ROLES)
}

pub fn classify_outcome(text: &str) -> Option<TeamOutcome> {
    classify(text, OUTCOMES)
}

pub fn classify_team_side(text: &str) -> Option<TeamSide> {
    classify(text, SIDES)
}

pub fn classify_tournament_type(text: &str) -> Option<TournamentType> {
    classify(text, TOURNAMENT_TYPES)
}

pub fn classify_tournament_status(text: &str) -> Option<TournamentStatus> {
    classify(text, TOURNAMENT_STATUSES)
}

pub fn classify_tournament_format(text: &str) -> Option<TournamentFormat> {
    classify(text, TOURNAMENT_FORMATS)
}

pub fn classify_game_type(text: &str) -> Option<GameType> {
    classify(text, GAME_TYPES)
}

pub fn classify_game_format(text: &str) -> Option<GameFormat> {
    classify(text, GAME_FORMATS)
}

pub fn classify_game_status(text: &str) -> Option<GameStatus> {
    classify(text, GAME_STATUSES)
}

pub fn classify_win_condition(text: &str) -> Option<WinCondition> {
    classify(text, WIN_CONDITIONS)
}

/// Winning side named by free text; a draw maps to the neutral side.
pub fn classify_winning_team(text: &str) -> Option<TeamSide> {
    classify_outcome(text).map(|o| o.winner().unwrap_or(TeamSide::Neutral))
}

/// Lower-cased with `_` and `-` read as spaces, so enum spellings like
/// `ROUND_ROBIN` match the same stems as prose.
fn classify<T: Copy>(text: &str, table: &[(&str, T)]) -> Option<T> {
    let folded = normalize_text(&text.to_lowercase().replace(['_', '-'], " "));
    if folded.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|(stem, _)| has_stem(&folded, stem))
        .map(|(_, value)| *value)
}

/// A stem must start a word. Short ASCII stems ("red", "tie", "don") must
/// also end one, otherwise they hit "expired", "penalties" or "done".
fn has_stem(folded: &str, stem: &str) -> bool {
    let whole_word = stem.is_ascii() && stem.len() <= 4;
    folded.match_indices(stem).any(|(at, _)| {
        let starts = !folded[..at].chars().next_back().is_some_and(char::is_alphanumeric);
        let ends = !folded[at + stem.len()..].chars().next().is_some_and(char::is_alphanumeric);
        starts && (ends || !whole_word)
    })
}
