//! Drone registry owned by the director
//!
//! Replaces a process-wide list of active drones: anything that needs to
//! look at neighbours gets the registry (or a snapshot from it) explicitly.

use crate::core::types::{DroneId, Vec2};
use crate::drone::Drone;

#[derive(Debug, Clone, Default)]
pub struct DroneRegistry {
    drones: Vec<Drone>,
}

impl DroneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, drone: Drone) {
        self.drones.push(drone);
    }

    pub fn get(&self, id: DroneId) -> Option<&Drone> {
        self.drones.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: DroneId) -> Option<&mut Drone> {
        self.drones.iter_mut().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Drone> {
        self.drones.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Drone> {
        self.drones.iter_mut()
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = &Drone> {
        self.drones.iter().filter(|d| d.is_alive())
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    /// Positions of living drones, taken before a tick moves anyone
    pub fn alive_positions(&self) -> Vec<(DroneId, Vec2)> {
        self.iter_alive().map(|d| (d.id, d.position)).collect()
    }

    /// Remove and return dead drones
    pub fn remove_dead(&mut self) -> Vec<Drone> {
        let (dead, alive): (Vec<Drone>, Vec<Drone>) =
            std::mem::take(&mut self.drones).into_iter().partition(|d| !d.is_alive());
        self.drones = alive;
        dead
    }
}

/// Positions from `snapshot` within `radius` of `position`, excluding `id`
pub fn neighbors_within(snapshot: &[(DroneId, Vec2)], id: DroneId, position: Vec2, radius: f32) -> Vec<Vec2> {
    snapshot
        .iter()
        .filter(|(other, p)| *other != id && p.distance(position) < radius)
        .map(|(_, p)| *p)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_exclude_self_and_far() {
        let snapshot = vec![
            (DroneId(1), Vec2::ZERO),
            (DroneId(2), Vec2::new(1.0, 0.0)),
            (DroneId(3), Vec2::new(10.0, 0.0)),
        ];
        let n = neighbors_within(&snapshot, DroneId(1), Vec2::ZERO, 2.5);
        assert_eq!(n, vec![Vec2::new(1.0, 0.0)]);
    }
}
