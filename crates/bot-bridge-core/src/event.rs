//! Simulation events sent from the host to the peer
//!
//! Events serialize as flat, single-line records with an internal `event` tag:
//! `{"event":"hitByBullet","damage":4.0,"direction":90.0}`
//!
//! Variant names are camelCase on the wire. Field names that differ from the
//! Rust name are renamed explicitly, since `rename_all` on an enum only
//! touches variant names.

use serde::Serialize;

/// One simulation occurrence, forwarded to the peer as a single line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EventRecord {
    /// Session start, always the first record a peer sees
    Connected { round: u32 },

    /// Per-turn snapshot of the bot's own state
    Tick {
        turn: u32,
        energy: f64,
        x: f64,
        y: f64,
        direction: f64,
        #[serde(rename = "gunDirection")]
        gun_direction: f64,
        #[serde(rename = "radarDirection")]
        radar_direction: f64,
        #[serde(rename = "gunHeat")]
        gun_heat: f64,
        speed: f64,
    },

    /// Radar picked up another bot
    #[serde(rename = "scanned")]
    ScannedBot {
        distance: f64,
        energy: f64,
        x: f64,
        y: f64,
        direction: f64,
        speed: f64,
    },

    HitByBullet { damage: f64, direction: f64 },

    BulletHitBot {
        damage: f64,
        #[serde(rename = "botId")]
        victim_id: i32,
    },

    BulletHitWall,

    HitWall,

    /// Another bot died
    #[serde(rename = "opponentDeath")]
    BotDeath {
        #[serde(rename = "botId")]
        victim_id: i32,
    },

    /// This bot died; the last record of a session
    Death,

    RoundEnded {
        #[serde(skip_serializing_if = "Option::is_none")]
        rank: Option<u32>,
    },

    WonRound { turn: u32 },

    SkippedTurn { turn: u32 },

    Custom,
}

impl EventRecord {
    /// Wire tag of this record
    pub fn name(&self) -> &'static str {
        match self {
            EventRecord::Connected { .. } => "connected",
            EventRecord::Tick { .. } => "tick",
            EventRecord::ScannedBot { .. } => "scanned",
            EventRecord::HitByBullet { .. } => "hitByBullet",
            EventRecord::BulletHitBot { .. } => "bulletHitBot",
            EventRecord::BulletHitWall => "bulletHitWall",
            EventRecord::HitWall => "hitWall",
            EventRecord::BotDeath { .. } => "opponentDeath",
            EventRecord::Death => "death",
            EventRecord::RoundEnded { .. } => "roundEnded",
            EventRecord::WonRound { .. } => "wonRound",
            EventRecord::SkippedTurn { .. } => "skippedTurn",
            EventRecord::Custom => "custom",
        }
    }
}
