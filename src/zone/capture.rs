//! Per-zone capture state machine
//!
//! Ownership is binary but progress is continuous: 1.0 means fully
//! player-held, 0.0 fully enemy-held. "Contested" is derived from presence
//! each tick, never stored as a separate state.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::config::ZoneConfig;
use crate::core::types::{lerp, Vec2};
use crate::world::OverlapQuery;
use crate::zone::{ZoneCaptureActor, ZoneId, ZoneOwnership};

/// Recapture speed-up with four or more defenders
const MAX_PRESSURE_MULTIPLIER: f32 = 1.35;
/// Defenders beyond the first that still add pressure
const MAX_EXTRA_DEFENDERS: f32 = 3.0;
/// Progress band in which decay is slowed
const MIDDLE_BAND: (f32, f32) = (0.15, 0.85);
const MIDDLE_BAND_DECAY_SCALE: f32 = 0.75;

/// Notifications raised by a zone during a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoneNotification {
    OwnershipChanged {
        zone: ZoneId,
        previous: ZoneOwnership,
        current: ZoneOwnership,
    },
    UnderAttackChanged { zone: ZoneId, under_attack: bool },
    ContestedChanged { zone: ZoneId, contested: bool },
    ProgressChanged { zone: ZoneId, progress: f32 },
}

/// Result of one zone tick
#[derive(Debug, Clone, Default)]
pub struct ZoneTickReport {
    pub notifications: Vec<ZoneNotification>,
}

impl ZoneTickReport {
    /// The ownership change raised this tick, if any
    pub fn ownership_change(&self) -> Option<(ZoneId, ZoneOwnership)> {
        self.notifications.iter().find_map(|n| match n {
            ZoneNotification::OwnershipChanged { zone, current, .. } => Some((*zone, *current)),
            _ => None,
        })
    }
}

/// A capturable zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturableZone {
    pub id: ZoneId,
    pub center: Vec2,
    pub radius: f32,
    ownership: ZoneOwnership,
    capture_progress: f32,
    active_capture_actor: Option<ZoneCaptureActor>,
    is_player_inside: bool,
    alive_enemies_in_zone: u32,
    is_under_attack: bool,
    last_ownership_change_at: Option<f32>,

    player_capture_duration: f32,
    enemy_recapture_duration: f32,
    progress_decay_duration: f32,
}

impl CapturableZone {
    /// A zone starting enemy-owned with zero progress
    pub fn new(id: ZoneId, center: Vec2, radius: f32, config: &ZoneConfig) -> Self {
        Self {
            id,
            center,
            radius,
            ownership: ZoneOwnership::Enemy,
            capture_progress: 0.0,
            active_capture_actor: None,
            is_player_inside: false,
            alive_enemies_in_zone: 0,
            is_under_attack: false,
            last_ownership_change_at: None,
            player_capture_duration: config.player_capture_duration,
            enemy_recapture_duration: config.enemy_recapture_duration,
            progress_decay_duration: config.progress_decay_duration,
        }
    }

    /// Start with a specific owner; progress sits at that owner's extreme
    pub fn with_owner(mut self, owner: ZoneOwnership) -> Self {
        self.ownership = owner;
        self.capture_progress = match owner {
            ZoneOwnership::Player => 1.0,
            ZoneOwnership::Enemy => 0.0,
        };
        self
    }

    pub fn ownership(&self) -> ZoneOwnership {
        self.ownership
    }

    pub fn capture_progress(&self) -> f32 {
        self.capture_progress
    }

    pub fn active_capture_actor(&self) -> Option<ZoneCaptureActor> {
        self.active_capture_actor
    }

    pub fn is_player_inside(&self) -> bool {
        self.is_player_inside
    }

    pub fn alive_enemies_in_zone(&self) -> u32 {
        self.alive_enemies_in_zone
    }

    pub fn is_under_attack(&self) -> bool {
        self.is_under_attack
    }

    pub fn is_contested(&self) -> bool {
        self.is_player_inside && self.alive_enemies_in_zone > 0
    }

    /// Seconds since the last ownership flip, `None` if it never flipped
    pub fn seconds_since_captured(&self, now: f32) -> Option<f32> {
        self.last_ownership_change_at.map(|t| (now - t).max(0.0))
    }

    /// Sense presence through the overlap query, then advance progress
    pub fn tick(
        &mut self,
        dt: f32,
        now: f32,
        player_position: Option<Vec2>,
        query: &dyn OverlapQuery,
    ) -> ZoneTickReport {
        let player_inside = player_position
            .map(|p| p.distance(self.center) <= self.radius)
            .unwrap_or(false);

        let mut seen = AHashSet::new();
        for agent in query.agents_within(self.center, self.radius) {
            if agent.alive {
                seen.insert(agent.id);
            }
        }

        self.advance(dt, now, player_inside, seen.len() as u32)
    }

    /// Advance the state machine with already-sensed presence
    pub fn advance(
        &mut self,
        dt: f32,
        now: f32,
        player_inside: bool,
        alive_enemies: u32,
    ) -> ZoneTickReport {
        let mut report = ZoneTickReport::default();
        let was_contested = self.is_contested();

        self.is_player_inside = player_inside;
        self.alive_enemies_in_zone = alive_enemies;

        if was_contested != self.is_contested() {
            report.notifications.push(ZoneNotification::ContestedChanged {
                zone: self.id,
                contested: self.is_contested(),
            });
        }

        self.active_capture_actor = self.resolve_actor();

        let previous_progress = self.capture_progress;
        self.capture_progress = self.next_progress(dt);
        if self.capture_progress != previous_progress {
            report.notifications.push(ZoneNotification::ProgressChanged {
                zone: self.id,
                progress: self.capture_progress,
            });
        }

        let flipped_to = match self.ownership {
            ZoneOwnership::Enemy if self.capture_progress >= 1.0 => Some(ZoneOwnership::Player),
            ZoneOwnership::Player if self.capture_progress <= 0.0 => Some(ZoneOwnership::Enemy),
            _ => None,
        };
        if let Some(current) = flipped_to {
            let previous = self.ownership;
            self.ownership = current;
            self.last_ownership_change_at = Some(now);
            tracing::info!(zone = %self.id, ?previous, ?current, "zone ownership changed");
            report.notifications.push(ZoneNotification::OwnershipChanged {
                zone: self.id,
                previous,
                current,
            });
        }

        let under_attack = self.ownership == ZoneOwnership::Player
            && self.active_capture_actor == Some(ZoneCaptureActor::Enemy);
        if under_attack != self.is_under_attack {
            self.is_under_attack = under_attack;
            report.notifications.push(ZoneNotification::UnderAttackChanged {
                zone: self.id,
                under_attack,
            });
        }

        report
    }

    fn resolve_actor(&self) -> Option<ZoneCaptureActor> {
        match self.ownership {
            ZoneOwnership::Enemy if self.is_player_inside && self.alive_enemies_in_zone == 0 => {
                Some(ZoneCaptureActor::Player)
            }
            ZoneOwnership::Player if !self.is_player_inside && self.alive_enemies_in_zone > 0 => {
                Some(ZoneCaptureActor::Enemy)
            }
            _ => None,
        }
    }

    fn next_progress(&self, dt: f32) -> f32 {
        let p = self.capture_progress;
        match self.active_capture_actor {
            Some(ZoneCaptureActor::Player) => (p + dt / self.player_capture_duration).min(1.0),
            Some(ZoneCaptureActor::Enemy) => {
                let pressure = recapture_pressure(self.alive_enemies_in_zone);
                (p - dt / self.enemy_recapture_duration * pressure).max(0.0)
            }
            None if self.is_contested() => p,
            None => {
                // Idle: drift back toward the owner's extreme
                let target = match self.ownership {
                    ZoneOwnership::Player => 1.0,
                    ZoneOwnership::Enemy => 0.0,
                };
                let mut rate = dt / self.progress_decay_duration;
                if p > MIDDLE_BAND.0 && p < MIDDLE_BAND.1 {
                    rate *= MIDDLE_BAND_DECAY_SCALE;
                }
                if p < target {
                    (p + rate).min(target)
                } else {
                    (p - rate).max(target)
                }
            }
        }
    }
}

/// Recapture rate multiplier for `enemy_count` defenders
pub fn recapture_pressure(enemy_count: u32) -> f32 {
    let extra = (enemy_count as f32 - 1.0).clamp(0.0, MAX_EXTRA_DEFENDERS);
    lerp(1.0, MAX_PRESSURE_MULTIPLIER, extra / MAX_EXTRA_DEFENDERS)
}
