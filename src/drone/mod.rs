//! Drones: role tuning and the per-drone tactical state machine

pub mod controller;
pub mod tuning;

pub use controller::{DroneSenses, StateTransition, ZoneDroneController};
pub use tuning::{apply_post_spawn_bonus, DroneStats};

use serde::{Deserialize, Serialize};

use crate::core::types::{DroneId, Vec2};
use crate::zone::ZoneId;

/// Fixed at spawn; drives speed, detection and engage range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DroneRole {
    Basic,
    Flanker,
    Heavy,
}

/// Tactical state of a drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DroneState {
    Patrol,
    Alert,
    Engage,
    ReturnToZone,
    RelocateToTargetZone,
}

/// A living drone owned by the director
#[derive(Debug, Clone)]
pub struct Drone {
    pub id: DroneId,
    pub role: DroneRole,
    pub position: Vec2,
    pub stats: DroneStats,
    pub health: f32,
    pub controller: ZoneDroneController,
}

impl Drone {
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn home_zone(&self) -> ZoneId {
        self.controller.home_zone()
    }

    pub fn active_zone(&self) -> ZoneId {
        self.controller.active_zone()
    }

    pub fn state(&self) -> DroneState {
        self.controller.state()
    }

    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }
}
