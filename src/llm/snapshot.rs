//! Battlefield snapshot sent to the decision service
//!
//! The JSON is written by hand so field order and null handling never change
//! under the service's feet.

use std::fmt::Write;

use serde::Serialize;

use crate::core::types::SimTime;
use crate::director::ZoneEnemyDirector;
use crate::events::BattlefieldEventLog;
use crate::reinforcement::ReinforcementManager;
use crate::world::{AttackStyle, PlayerState};
use crate::zone::{CapturableZone, ZoneId, ZoneOwnership};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSnapshot {
    pub id: ZoneId,
    pub owner: ZoneOwnership,
    pub defenders_count: u32,
    pub capture_progress: f32,
    pub seconds_since_captured: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub current_zone: Option<ZoneId>,
    pub health_percent: f32,
    pub last_attack_style: AttackStyle,
    pub zones_captured_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiResources {
    pub total_drones_alive: u32,
    pub reinforcement_squads_available: u32,
    pub reinforcement_cooldown_seconds: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattlefieldSnapshot {
    pub zones: Vec<ZoneSnapshot>,
    pub player: PlayerSnapshot,
    pub ai_resources: AiResources,
    pub match_time_seconds: f32,
    pub recent_events: Vec<String>,
}

impl BattlefieldSnapshot {
    /// Gather the current state of the match
    pub fn capture(
        time: SimTime,
        zones: &[CapturableZone],
        player: &PlayerState,
        director: &ZoneEnemyDirector,
        reinforcement: &ReinforcementManager,
        log: &BattlefieldEventLog,
        recent_event_count: usize,
    ) -> Self {
        let zone_snapshots = zones
            .iter()
            .map(|z| ZoneSnapshot {
                id: z.id,
                owner: z.ownership(),
                defenders_count: director.drones_in_zone(z.id),
                capture_progress: z.capture_progress(),
                seconds_since_captured: z.seconds_since_captured(time.now),
            })
            .collect();

        let current_zone = player
            .alive_position()
            .and_then(|p| zones.iter().find(|z| p.distance(z.center) <= z.radius))
            .map(|z| z.id);

        Self {
            zones: zone_snapshots,
            player: PlayerSnapshot {
                current_zone,
                health_percent: player.health_percent(),
                last_attack_style: player.last_attack_style,
                zones_captured_count: zones
                    .iter()
                    .filter(|z| z.ownership() == ZoneOwnership::Player)
                    .count() as u32,
            },
            ai_resources: AiResources {
                total_drones_alive: director.alive_count(),
                reinforcement_squads_available: reinforcement.squads_remaining(),
                reinforcement_cooldown_seconds: reinforcement.cooldown_remaining(time.now),
            },
            match_time_seconds: time.now,
            recent_events: log.recent_tokens(recent_event_count),
        }
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneSnapshot> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn player_zones(&self) -> impl Iterator<Item = &ZoneSnapshot> {
        self.zones.iter().filter(|z| z.owner == ZoneOwnership::Player)
    }

    /// Deterministic JSON for the decision service
    pub fn to_json(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str("{\"zones\":[");
        for (i, z) in self.zones.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str("{\"id\":");
            push_string(&mut out, z.id.as_str());
            out.push_str(",\"owner\":");
            push_string(&mut out, z.owner.as_str());
            let _ = write!(out, ",\"defenders_count\":{}", z.defenders_count);
            out.push_str(",\"capture_progress\":");
            push_number(&mut out, z.capture_progress, 3);
            out.push_str(",\"seconds_since_captured\":");
            match z.seconds_since_captured {
                Some(s) => push_number(&mut out, s, 1),
                None => out.push_str("null"),
            }
            out.push('}');
        }

        out.push_str("],\"player\":{\"current_zone\":");
        match self.player.current_zone {
            Some(zone) => push_string(&mut out, zone.as_str()),
            None => out.push_str("null"),
        }
        out.push_str(",\"health_percent\":");
        push_number(&mut out, self.player.health_percent, 1);
        out.push_str(",\"last_attack_style\":");
        push_string(&mut out, self.player.last_attack_style.as_str());
        let _ = write!(out, ",\"zones_captured_count\":{}}}", self.player.zones_captured_count);

        let _ = write!(
            out,
            ",\"ai_resources\":{{\"total_drones_alive\":{},\"reinforcement_squads_available\":{},\"reinforcement_cooldown_seconds\":",
            self.ai_resources.total_drones_alive, self.ai_resources.reinforcement_squads_available
        );
        push_number(&mut out, self.ai_resources.reinforcement_cooldown_seconds, 1);
        out.push('}');

        out.push_str(",\"match_time_seconds\":");
        push_number(&mut out, self.match_time_seconds, 1);

        out.push_str(",\"recent_events\":[");
        for (i, event) in self.recent_events.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_string(&mut out, event);
        }
        out.push_str("]}");
        out
    }
}

/// Fixed-precision number; non-finite values become `null`
fn push_number(out: &mut String, value: f32, decimals: usize) {
    if value.is_finite() {
        let _ = write!(out, "{:.*}", decimals, value);
    } else {
        out.push_str("null");
    }
}

fn push_string(out: &mut String, value: &str) {
    out.push('"');
    out.push_str(&escape_json(value));
    out.push('"');
}

/// Escape a string for inclusion in a JSON string literal
pub fn escape_json(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(escaped, "\\u{:04x}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}
