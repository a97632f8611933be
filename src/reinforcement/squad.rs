//! Strategic squad tracking and dispatch outcomes

use serde::Serialize;
use thiserror::Error;

use crate::core::schedule::TaskHandle;
use crate::core::types::{DroneId, SquadId};
use crate::zone::ZoneId;

/// A dispatched squad, observed until every member is dead
#[derive(Debug, Clone, Serialize)]
pub struct StrategicSquad {
    pub id: SquadId,
    pub origin: ZoneId,
    pub target: ZoneId,
    pub members: Vec<DroneId>,
    pub spawned_at: f32,
}

impl StrategicSquad {
    /// True once no member is still alive according to `is_alive`
    pub fn is_destroyed(&self, is_alive: impl Fn(DroneId) -> bool) -> bool {
        self.members.iter().all(|id| !is_alive(*id))
    }
}

/// Accepted strategic dispatch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchReceipt {
    pub squad: SquadId,
    pub origin: ZoneId,
    pub target: ZoneId,
    pub size: u32,
    /// Simulation time at which the squad spawns
    pub arrives_at: f32,
    #[serde(skip)]
    pub handle: TaskHandle,
}

/// Why a strategic dispatch was refused. The message is the status string
/// shown on the debug surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("match has ended")]
    MatchEnded,
    #[error("reinforcements disabled")]
    Disabled,
    #[error("no strategic squads remaining")]
    NoSquadsRemaining,
    #[error("reinforcement cooldown active ({remaining:.1}s remaining)")]
    CooldownActive { remaining: f32 },
    #[error("no origin zone available for {target}")]
    NoOriginZone { target: ZoneId },
}

/// Notifications raised by the reinforcement manager
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReinforcementEvent {
    ReactiveScheduled { zone: ZoneId, fire_at: f32 },
    ReactiveCancelled { zone: ZoneId },
    ReactiveSpawned { origin: ZoneId, target: ZoneId, drones: u32 },
    StrategicDispatched { squad: SquadId, origin: ZoneId, target: ZoneId, size: u32 },
    SquadSpawned { squad: SquadId, target: ZoneId, drones: u32 },
    /// Spawn produced nothing; the squad went back to the pool
    SquadRefunded { squad: SquadId, target: ZoneId },
    SquadDestroyed { squad: SquadId, target: ZoneId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squad_destroyed_when_all_members_dead() {
        let squad = StrategicSquad {
            id: SquadId::new(),
            origin: ZoneId::Bravo,
            target: ZoneId::Alpha,
            members: vec![DroneId(1), DroneId(2)],
            spawned_at: 0.0,
        };
        assert!(!squad.is_destroyed(|id| id == DroneId(2)));
        assert!(squad.is_destroyed(|_| false));
    }

    #[test]
    fn test_dispatch_error_status_strings() {
        assert_eq!(DispatchError::NoSquadsRemaining.to_string(), "no strategic squads remaining");
        assert_eq!(
            DispatchError::CooldownActive { remaining: 4.0 }.to_string(),
            "reinforcement cooldown active (4.0s remaining)"
        );
        assert_eq!(
            DispatchError::NoOriginZone { target: ZoneId::Charlie }.to_string(),
            "no origin zone available for charlie"
        );
    }
}
