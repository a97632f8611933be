//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use glam::Vec2;

/// Identifier for a drone, allocated monotonically by the director
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DroneId(pub u64);

impl std::fmt::Display for DroneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drone-{}", self.0)
    }
}

/// Unique identifier for strategic squads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SquadId(pub Uuid);

impl SquadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SquadId {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation clock for one frame
///
/// `frame` increments once per tick; `now` is elapsed match time in seconds.
/// Systems that care about "the same frame" compare `frame`, never `now`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    pub frame: u64,
    pub now: f32,
}

impl SimTime {
    pub fn new(frame: u64, now: f32) -> Self {
        Self { frame, now }
    }

    /// Advance by one frame of `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.frame += 1;
        self.now += dt;
    }
}

/// Linear interpolation, used by tuning curves
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_advance() {
        let mut time = SimTime::default();
        time.advance(0.5);
        time.advance(0.25);
        assert_eq!(time.frame, 2);
        assert!((time.now - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(1.0, 1.35, 0.0), 1.0);
        assert!((lerp(1.0, 1.35, 1.0) - 1.35).abs() < 1e-6);
    }
}
