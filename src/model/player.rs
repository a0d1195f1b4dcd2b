use std::sync::LazyLock;

use chrono::{Datelike, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use super::fields::{normalize_rate, FieldReader};
use super::raw::RawAttributeMap;
use crate::error::{ConstructionError, FieldError, RecordKind};
use crate::parser::extract::player::{player_id_from_locator, profile_url_for};

pub const FIRST_REGISTRATION_YEAR: i32 = 2000;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RoleStats {
    pub games: u32,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RoleBreakdown {
    pub civilian: RoleStats,
    pub mafia: RoleStats,
    pub don: RoleStats,
    pub sheriff: RoleStats,
}

impl RoleBreakdown {
    pub fn total_games(&self) -> u64 {
        self.iter().map(|(_, s)| u64::from(s.games)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RoleStats)> {
        [
            ("civilian", &self.civilian),
            ("mafia", &self.mafia),
            ("don", &self.don),
            ("sheriff", &self.sheriff),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub go_mafia_id: u64,
    pub current_nickname: String,
    pub profile_url: String,
    pub registered_year: Option<i32>,

    pub current_elo: Option<u32>,
    pub table_elo: Option<u32>,
    pub max_elo: Option<u32>,

    pub games_played: u32,
    pub games_won: u32,
    /// Stored rate as published, 0..1. Left unset when the page had none.
    pub win_rate: Option<f64>,
    pub average_points: Option<f64>,
    pub roles: RoleBreakdown,

    pub best_win_streak: u32,
    pub current_streak: i32,
    pub total_points: Option<f64>,
    pub awards_count: u32,

    pub last_game_at: Option<NaiveDateTime>,
    pub last_tournament_at: Option<NaiveDateTime>,
    pub is_active: bool,
}

impl PlayerRecord {
    /// games_won / games_played, when any game was played.
    pub fn computed_win_rate(&self) -> Option<f64> {
        (self.games_played > 0).then(|| f64::from(self.games_won) / f64::from(self.games_played))
    }
}

pub fn build_player_record(raw: RawAttributeMap) -> Result<PlayerRecord, ConstructionError> {
    let mut r = FieldReader::new(&raw);

    let stated_id = r.optional("go_mafia_id", &["go_mafia_id"], |v| {
        v.as_int().filter(|i| *i > 0)
    });
    let nickname = r.required_text("current_nickname", &["current_nickname"]);
    let url = r.text("profile_url", &["profile_url"]);

    let url_id = url.as_deref().and_then(player_id_from_locator);
    let id = match (stated_id, url_id) {
        (Some(stated), Some(from_url)) if stated != from_url => {
            warn!(stated, from_url, "player id differs from profile url, using the url");
            Some(from_url)
        }
        (stated, from_url) => stated.or(from_url),
    };
    if id.is_none() {
        r.push(FieldError::Missing { field: "go_mafia_id" });
    }
    let profile_url = url.or_else(|| id.map(profile_url_for));
    if profile_url.is_none() {
        r.push(FieldError::Missing { field: "profile_url" });
    }

    let (Some(id), Some(current_nickname), Some(profile_url)) = (id, nickname, profile_url) else {
        return Err(r.into_error(RecordKind::Player));
    };
    let Ok(go_mafia_id) = u64::try_from(id) else {
        r.push(FieldError::Invalid {
            field: "go_mafia_id",
            raw: id.to_string(),
            reason: "negative id",
        });
        return Err(r.into_error(RecordKind::Player));
    };

    let role = |games: &'static str, rate: &'static str| RoleStats {
        games: r.count(games, &[games]).unwrap_or(0),
        win_rate: r.rate(rate, &[rate]),
    };
    let roles = RoleBreakdown {
        civilian: role("civilian_games", "civilian_win_rate"),
        mafia: role("mafia_games", "mafia_win_rate"),
        don: role("don_games", "don_win_rate"),
        sheriff: role("sheriff_games", "sheriff_win_rate"),
    };

    Ok(PlayerRecord {
        go_mafia_id,
        current_nickname,
        profile_url,
        registered_year: registered_year(&r),
        current_elo: r.count("current_elo", &["current_elo"]),
        table_elo: r.count("table_elo", &["table_elo"]),
        max_elo: r.count("max_elo", &["max_elo"]),
        games_played: r.count("games_played", &["games_played"]).unwrap_or(0),
        games_won: r.count("games_won", &["games_won"]).unwrap_or(0),
        win_rate: r.float("win_rate", &["win_rate"]).map(normalize_rate),
        average_points: r.float("average_points", &["average_points"]),
        roles,
        best_win_streak: r.count("best_win_streak", &["best_win_streak"]).unwrap_or(0),
        current_streak: r
            .int("current_streak", &["current_streak"])
            .and_then(|s| i32::try_from(s).ok())
            .unwrap_or(0),
        total_points: r.float("total_points", &["total_points"]),
        awards_count: r.count("awards_count", &["awards_count"]).unwrap_or(0),
        last_game_at: r.datetime("last_game_at", &["last_game_at"]),
        last_tournament_at: r.datetime("last_tournament_at", &["last_tournament_at"]),
        is_active: r
            .text("is_active", &["is_active"])
            .map_or(true, |t| !matches!(t.to_lowercase().as_str(), "false" | "0" | "no")),
    })
}

/// Year from `registered_year` or from phrases like "на сайте с 2022 года".
/// Years before 2000 or in the future are dropped.
fn registered_year(r: &FieldReader<'_>) -> Option<i32> {
    let year = r
        .int("registered_year", &["registered_year"])
        .and_then(|y| i32::try_from(y).ok())
        .or_else(|| {
            let text = r.text("registration_text", &["registration_text"])?;
            YEAR_RE.captures(&text)?[1].parse().ok()
        })?;
    let this_year = Utc::now().year();
    if (FIRST_REGISTRATION_YEAR..=this_year).contains(&year) {
        Some(year)
    } else {
        warn!(year, "ignoring implausible registration year");
        None
    }
}

// ── Tests ──
