//! Match events: typed notifications, the pub/sub bus that carries them,
//! and the rolling log the strategist reads recent history from

pub mod bus;
pub mod log;

pub use bus::{EventBus, Subscription};
pub use log::{BattlefieldEvent, BattlefieldEventLog, EventTag};

use serde::Serialize;

use crate::core::types::DroneId;
use crate::reinforcement::ReinforcementEvent;
use crate::zone::{ZoneId, ZoneNotification};

/// Terminal state of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    InProgress,
    PlayerVictory,
    PlayerDefeat,
}

impl MatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOutcome::InProgress => "in_progress",
            MatchOutcome::PlayerVictory => "player_victory",
            MatchOutcome::PlayerDefeat => "player_defeat",
        }
    }

    pub fn is_over(&self) -> bool {
        !matches!(self, MatchOutcome::InProgress)
    }
}

/// Everything the game mode publishes to outside observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Zone(ZoneNotification),
    Reinforcement(ReinforcementEvent),
    DroneDestroyed { drone: DroneId, zone: ZoneId },
    /// Strategist reasoning intercepted by the player
    Transmission { text: String },
    MatchEnded { outcome: MatchOutcome },
}
