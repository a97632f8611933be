//! Rolling battlefield history
//!
//! The strategist only sees a handful of the most recent happenings, as short
//! snake_case tokens like `player_captured_alpha`.

use std::collections::VecDeque;

use serde::Serialize;

use crate::events::GameEvent;
use crate::reinforcement::ReinforcementEvent;
use crate::zone::{ZoneNotification, ZoneOwnership};

const DEFAULT_CAPACITY: usize = 32;

/// Category of a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTag {
    Capture,
    UnderAttack,
    Reinforcement,
    Squad,
    Casualty,
    Strategy,
    Match,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattlefieldEvent {
    pub at: f32,
    pub tag: EventTag,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct BattlefieldEventLog {
    events: VecDeque<BattlefieldEvent>,
    capacity: usize,
}

impl Default for BattlefieldEventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl BattlefieldEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, at: f32, tag: EventTag, token: impl Into<String>) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(BattlefieldEvent {
            at,
            tag,
            token: token.into(),
        });
    }

    /// Log a published game event if it is worth remembering
    pub fn record(&mut self, at: f32, event: &GameEvent) {
        if let Some((tag, token)) = token_for(event) {
            self.push(at, tag, token);
        }
    }

    /// Tokens of the last `count` events, oldest first
    pub fn recent_tokens(&self, count: usize) -> Vec<String> {
        let skip = self.events.len().saturating_sub(count);
        self.events.iter().skip(skip).map(|e| e.token.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattlefieldEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn token_for(event: &GameEvent) -> Option<(EventTag, String)> {
    let entry = match event {
        GameEvent::Zone(ZoneNotification::OwnershipChanged { zone, current, .. }) => match current {
            ZoneOwnership::Player => (EventTag::Capture, format!("player_captured_{zone}")),
            ZoneOwnership::Enemy => (EventTag::Capture, format!("enemy_recaptured_{zone}")),
        },
        GameEvent::Zone(ZoneNotification::UnderAttackChanged { zone, under_attack: true }) => {
            (EventTag::UnderAttack, format!("{zone}_under_attack"))
        }
        GameEvent::Zone(_) => return None,
        GameEvent::Reinforcement(r) => match r {
            ReinforcementEvent::ReactiveSpawned { target, .. } => {
                (EventTag::Reinforcement, format!("reinforcements_arrived_{target}"))
            }
            ReinforcementEvent::StrategicDispatched { target, .. } => {
                (EventTag::Squad, format!("squad_dispatched_{target}"))
            }
            ReinforcementEvent::SquadDestroyed { target, .. } => {
                (EventTag::Squad, format!("squad_destroyed_{target}"))
            }
            _ => return None,
        },
        GameEvent::DroneDestroyed { zone, .. } => (EventTag::Casualty, format!("drone_destroyed_{zone}")),
        GameEvent::Transmission { .. } => return None,
        GameEvent::MatchEnded { outcome } => (EventTag::Match, format!("match_ended_{}", outcome.as_str())),
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneId;

    #[test]
    fn test_rolling_capacity() {
        let mut log = BattlefieldEventLog::with_capacity(3);
        for i in 0..5 {
            log.push(i as f32, EventTag::Strategy, format!("e{i}"));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.recent_tokens(2), vec!["e3", "e4"]);
        assert_eq!(log.recent_tokens(10), vec!["e2", "e3", "e4"]);
    }

    #[test]
    fn test_record_tokens() {
        let mut log = BattlefieldEventLog::new();
        log.record(
            1.0,
            &GameEvent::Zone(ZoneNotification::OwnershipChanged {
                zone: ZoneId::Alpha,
                previous: ZoneOwnership::Enemy,
                current: ZoneOwnership::Player,
            }),
        );
        log.record(
            2.0,
            &GameEvent::Zone(ZoneNotification::ProgressChanged {
                zone: ZoneId::Alpha,
                progress: 0.5,
            }),
        );
        log.record(
            3.0,
            &GameEvent::DroneDestroyed {
                drone: crate::core::types::DroneId(4),
                zone: ZoneId::Bravo,
            },
        );
        assert_eq!(log.recent_tokens(5), vec!["player_captured_alpha", "drone_destroyed_bravo"]);
    }
}
