//! Collaborators the simulation consumes but does not own
//!
//! Navigation, spatial overlap queries, the player's health state and the
//! HUD are provided by the host. The core only talks to them through the
//! narrow traits defined here.

pub mod navigation;
pub mod player;

pub use navigation::{LaneNavigator, PathService};
pub use player::{AttackStyle, PlayerState};

use crate::core::types::{DroneId, Vec2};
use crate::zone::{ZoneId, ZoneOwnership};

/// An agent reported by an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSighting {
    pub id: DroneId,
    pub position: Vec2,
    pub alive: bool,
}

/// Sphere-overlap style spatial query for enemy agents
pub trait OverlapQuery {
    /// Agents whose position lies within `radius` of `center`.
    /// May report the same agent more than once; callers deduplicate.
    fn agents_within(&self, center: Vec2, radius: f32) -> Vec<AgentSighting>;
}

/// Visual feedback sink (zone colors, progress bars, toasts, ticker)
pub trait HudSink {
    fn zone_state(&mut self, _zone: ZoneId, _owner: ZoneOwnership, _progress: f32, _contested: bool) {}
    fn toast(&mut self, _message: &str) {}
    fn transmission(&mut self, _text: &str) {}
}

/// HUD that discards everything, for headless runs
#[derive(Debug, Default)]
pub struct NullHud;

impl HudSink for NullHud {}
