//! Enemy director: owns the drone population
//!
//! Spawns the garrison and squads, applies role tuning, ticks every drone
//! controller with its neighbours, removes the dead, and answers "who holds
//! this zone" questions. Other systems only read through its queries or
//! call its explicit commands.

pub mod registry;

pub use registry::DroneRegistry;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::{DirectorConfig, DroneConfig};
use crate::core::types::{DroneId, Vec2};
use crate::drone::{
    apply_post_spawn_bonus, Drone, DroneRole, DroneSenses, DroneStats, StateTransition,
    ZoneDroneController,
};
use crate::world::{AgentSighting, OverlapQuery, PathService};
use crate::zone::{ZoneId, ZoneRouteNetwork};

/// What happened to the population during a tick
#[derive(Debug, Clone, Default)]
pub struct DirectorTickReport {
    pub transitions: Vec<(DroneId, StateTransition)>,
    pub destroyed: Vec<(DroneId, ZoneId)>,
    /// Drones whose combat behaviour was switched on (true) or off (false)
    pub combat_toggles: Vec<(DroneId, bool)>,
}

pub struct ZoneEnemyDirector {
    drone_config: DroneConfig,
    config: DirectorConfig,
    registry: DroneRegistry,
    next_id: u64,
    seed: u64,
    rng: ChaCha8Rng,
    /// Bookkeeping target of defenders per zone, moved by redistribution
    defender_allocation: [u32; 3],
}

impl ZoneEnemyDirector {
    pub fn new(drone_config: DroneConfig, config: DirectorConfig, seed: u64) -> Self {
        Self {
            drone_config,
            config,
            registry: DroneRegistry::new(),
            next_id: 1,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            defender_allocation: [0; 3],
        }
    }

    /// Spawn the starting garrison of every zone
    pub fn spawn_garrison(&mut self, routes: &ZoneRouteNetwork) -> Vec<DroneId> {
        let mut spawned = Vec::new();
        for zone in ZoneId::ALL {
            let center = routes.center(zone);
            let scatter = routes.radius(zone) * 0.5;
            for i in 0..self.config.defenders_per_zone as usize {
                let role = self.role_for(i);
                let position = center + self.random_offset(scatter);
                if let Some(id) = self.spawn_drone(role, zone, position) {
                    spawned.push(id);
                }
            }
            let garrisoned = self.drones_in_zone(zone);
            self.defender_allocation[zone.index()] += garrisoned;
        }
        tracing::info!(count = spawned.len(), "garrison spawned");
        spawned
    }

    /// Spawn a single drone. Returns `None` at the population cap.
    pub fn spawn_drone(&mut self, role: DroneRole, zone: ZoneId, position: Vec2) -> Option<DroneId> {
        if self.registry.iter_alive().count() >= self.config.max_drones {
            tracing::warn!(max = self.config.max_drones, "drone cap reached, spawn skipped");
            return None;
        }

        let id = DroneId(self.next_id);
        self.next_id += 1;

        let controller = ZoneDroneController::new(
            role,
            zone,
            &self.drone_config,
            self.seed ^ id.0.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        let stats = apply_post_spawn_bonus(DroneStats::base(&self.drone_config), role, &self.drone_config);

        self.registry.insert(Drone {
            id,
            role,
            position,
            stats,
            health: stats.max_health,
            controller,
        });
        Some(id)
    }

    /// Spawn a squad at `origin`'s approach point and send it to `target`
    pub fn spawn_squad(
        &mut self,
        origin: ZoneId,
        target: ZoneId,
        size: u32,
        routes: &ZoneRouteNetwork,
    ) -> Vec<DroneId> {
        let anchor = routes.approach_point(origin);
        let mut members = Vec::new();
        for i in 0..size as usize {
            let role = self.role_for(i);
            let position = anchor + self.random_offset(self.config.spawn_scatter);
            let Some(id) = self.spawn_drone(role, origin, position) else {
                break;
            };
            if let Some(drone) = self.registry.get_mut(id) {
                drone.controller.issue_relocation(target);
            }
            members.push(id);
        }
        self.defender_allocation[target.index()] += members.len() as u32;
        tracing::info!(%origin, %target, requested = size, spawned = members.len(), "squad spawned");
        members
    }

    /// Remove the dead, then tick every living drone
    pub fn tick(
        &mut self,
        dt: f32,
        player: Option<Vec2>,
        routes: &ZoneRouteNetwork,
        nav: &dyn PathService,
    ) -> DirectorTickReport {
        let mut report = DirectorTickReport::default();

        for dead in self.registry.remove_dead() {
            let zone = dead.active_zone();
            let slot = &mut self.defender_allocation[zone.index()];
            *slot = slot.saturating_sub(1);
            tracing::debug!(id = %dead.id, %zone, "drone destroyed");
            report.destroyed.push((dead.id, zone));
        }

        let snapshot = self.registry.alive_positions();
        let radius = self.drone_config.separation_radius;

        for drone in self.registry.iter_mut() {
            let neighbors = registry::neighbors_within(&snapshot, drone.id, drone.position, radius);
            let zone = drone.active_zone();
            let senses = DroneSenses {
                dt,
                player,
                zone_center: routes.center(zone),
                zone_radius: routes.radius(zone),
                neighbors: &neighbors,
                nav,
            };
            let was_fighting = drone.controller.combat_enabled();
            if let Some(transition) = drone.controller.tick(&mut drone.position, &senses) {
                report.transitions.push((drone.id, transition));
            }
            let fighting = drone.controller.combat_enabled();
            if fighting != was_fighting {
                report.combat_toggles.push((drone.id, fighting));
            }
        }

        report
    }

    /// Apply damage from an external source. Returns true if it killed the drone.
    pub fn damage_drone(&mut self, id: DroneId, amount: f32) -> bool {
        match self.registry.get_mut(id) {
            Some(drone) if drone.is_alive() => {
                drone.apply_damage(amount);
                !drone.is_alive()
            }
            _ => false,
        }
    }

    pub fn is_alive(&self, id: DroneId) -> bool {
        self.registry.get(id).is_some_and(|d| d.is_alive())
    }

    pub fn drone(&self, id: DroneId) -> Option<&Drone> {
        self.registry.get(id)
    }

    pub fn drones(&self) -> impl Iterator<Item = &Drone> {
        self.registry.iter_alive()
    }

    pub fn alive_count(&self) -> u32 {
        self.registry.iter_alive().count() as u32
    }

    /// Living drones assigned to `zone`
    pub fn drones_in_zone(&self, zone: ZoneId) -> u32 {
        self.registry
            .iter_alive()
            .filter(|d| d.active_zone() == zone)
            .count() as u32
    }

    /// Zone with the most assigned drones; `None` when nobody is alive
    pub fn zone_with_most_drones(&self) -> Option<ZoneId> {
        let mut best: Option<(ZoneId, u32)> = None;
        for zone in ZoneId::ALL {
            let count = self.drones_in_zone(zone);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((zone, count));
            }
        }
        best.map(|(zone, _)| zone)
    }

    /// Drones whose combat behaviour is currently running
    pub fn engaged_drones(&self) -> impl Iterator<Item = &Drone> {
        self.registry.iter_alive().filter(|d| d.controller.combat_enabled())
    }

    pub fn defender_allocation(&self, zone: ZoneId) -> u32 {
        self.defender_allocation[zone.index()]
    }

    /// Move up to `count` defenders of allocation from one zone to another,
    /// clamped to what `from` still has. Returns how many moved.
    /// Bookkeeping only: drones move through relocation orders.
    pub fn reallocate_defenders(&mut self, from: ZoneId, to: ZoneId, count: u32) -> u32 {
        if from == to {
            return 0;
        }
        let available = self.defender_allocation[from.index()];
        let moved = count.min(available);
        if moved < count {
            tracing::warn!(%from, requested = count, available, "defender allocation short, clamping");
        }
        if moved == 0 {
            return 0;
        }
        self.defender_allocation[from.index()] -= moved;
        self.defender_allocation[to.index()] += moved;
        tracing::info!(%from, %to, moved, "defender allocation moved");
        moved
    }

    fn role_for(&self, index: usize) -> DroneRole {
        let rotation = &self.config.role_rotation;
        if rotation.is_empty() {
            return DroneRole::Basic;
        }
        rotation[index % rotation.len()]
    }

    fn random_offset(&mut self, radius: f32) -> Vec2 {
        if radius <= 0.0 {
            return Vec2::ZERO;
        }
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let r = self.rng.gen::<f32>().sqrt() * radius;
        Vec2::new(angle.cos(), angle.sin()) * r
    }
}

impl OverlapQuery for ZoneEnemyDirector {
    fn agents_within(&self, center: Vec2, radius: f32) -> Vec<AgentSighting> {
        self.registry
            .iter()
            .filter(|d| d.position.distance(center) <= radius)
            .map(|d| AgentSighting {
                id: d.id,
                position: d.position,
                alive: d.is_alive(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ZoneConfig;
    use crate::drone::DroneState;
    use crate::world::LaneNavigator;

    fn setup() -> (ZoneEnemyDirector, ZoneRouteNetwork, LaneNavigator) {
        let routes = ZoneRouteNetwork::generate(&ZoneConfig::default());
        let nav = LaneNavigator::new(routes.clone(), 60.0);
        let director = ZoneEnemyDirector::new(DroneConfig::default(), DirectorConfig::default(), 3);
        (director, routes, nav)
    }

    #[test]
    fn test_garrison_spawn_and_role_tuning() {
        let (mut director, routes, _) = setup();
        let ids = director.spawn_garrison(&routes);
        assert_eq!(ids.len(), 12);
        assert_eq!(director.alive_count(), 12);
        for zone in ZoneId::ALL {
            assert_eq!(director.drones_in_zone(zone), 4);
            assert_eq!(director.defender_allocation(zone), 4);
        }

        let heavy = director.drones().find(|d| d.role == DroneRole::Heavy).unwrap();
        assert_eq!(heavy.health, 160.0);
        let basic = director.drones().find(|d| d.role == DroneRole::Basic).unwrap();
        assert_eq!(basic.health, 100.0);
    }

    #[test]
    fn test_squad_spawns_relocating() {
        let (mut director, routes, _) = setup();
        let squad = director.spawn_squad(ZoneId::Bravo, ZoneId::Alpha, 3, &routes);
        assert_eq!(squad.len(), 3);
        for id in &squad {
            let drone = director.drone(*id).unwrap();
            assert_eq!(drone.state(), DroneState::RelocateToTargetZone);
            assert_eq!(drone.active_zone(), ZoneId::Alpha);
            assert_eq!(drone.home_zone(), ZoneId::Bravo);
        }
        assert_eq!(director.drones_in_zone(ZoneId::Alpha), 3);
    }

    #[test]
    fn test_population_cap() {
        let (_, routes, _) = setup();
        let mut config = DirectorConfig::default();
        config.max_drones = 2;
        let mut director = ZoneEnemyDirector::new(DroneConfig::default(), config, 1);
        let squad = director.spawn_squad(ZoneId::Alpha, ZoneId::Bravo, 5, &routes);
        assert_eq!(squad.len(), 2);
    }

    #[test]
    fn test_dead_drones_removed_on_tick() {
        let (mut director, routes, nav) = setup();
        let squad = director.spawn_squad(ZoneId::Bravo, ZoneId::Alpha, 2, &routes);
        assert!(director.damage_drone(squad[0], 1000.0));
        assert!(!director.is_alive(squad[0]));
        // Dead but still reported by the overlap query until removal
        let report = director.tick(0.1, None, &routes, &nav);
        assert_eq!(report.destroyed, vec![(squad[0], ZoneId::Alpha)]);
        assert!(director.drone(squad[0]).is_none());
        assert_eq!(director.alive_count(), 1);
        assert!(!director.damage_drone(squad[0], 10.0));
    }

    #[test]
    fn test_zone_with_most_drones() {
        let (mut director, routes, _) = setup();
        assert_eq!(director.zone_with_most_drones(), None);
        director.spawn_squad(ZoneId::Alpha, ZoneId::Charlie, 3, &routes);
        director.spawn_squad(ZoneId::Alpha, ZoneId::Bravo, 1, &routes);
        assert_eq!(director.zone_with_most_drones(), Some(ZoneId::Charlie));
    }

    #[test]
    fn test_reallocate_defenders() {
        let (mut director, routes, _) = setup();
        director.spawn_garrison(&routes);
        assert_eq!(director.reallocate_defenders(ZoneId::Alpha, ZoneId::Bravo, 3), 3);
        assert_eq!(director.defender_allocation(ZoneId::Alpha), 1);
        assert_eq!(director.defender_allocation(ZoneId::Bravo), 7);
        assert_eq!(director.reallocate_defenders(ZoneId::Bravo, ZoneId::Bravo, 1), 0);
    }

    #[test]
    fn test_reallocate_clamps_to_allocation() {
        let (mut director, routes, _) = setup();
        director.spawn_garrison(&routes);
        director.reallocate_defenders(ZoneId::Alpha, ZoneId::Bravo, 3);

        // Alpha still has 4 drones standing in it but only 1 left in allocation
        assert_eq!(director.drones_in_zone(ZoneId::Alpha), 4);
        assert_eq!(director.reallocate_defenders(ZoneId::Alpha, ZoneId::Charlie, 2), 1);
        assert_eq!(director.defender_allocation(ZoneId::Alpha), 0);
        assert_eq!(director.defender_allocation(ZoneId::Charlie), 5);
        assert_eq!(director.reallocate_defenders(ZoneId::Alpha, ZoneId::Charlie, 1), 0);
    }

    #[test]
    fn test_overlap_query_reports_drones_in_radius() {
        let (mut director, routes, _) = setup();
        director.spawn_garrison(&routes);
        let center = routes.center(ZoneId::Charlie);
        let sightings = director.agents_within(center, routes.radius(ZoneId::Charlie));
        assert_eq!(sightings.len(), 4);
        assert!(sightings.iter().all(|s| s.alive));
    }

    #[test]
    fn test_tick_engages_player_in_zone() {
        let (mut director, routes, nav) = setup();
        director.spawn_garrison(&routes);
        let player = routes.center(ZoneId::Alpha);
        let mut toggled_on = 0;
        for _ in 0..60 {
            let report = director.tick(0.1, Some(player), &routes, &nav);
            toggled_on += report.combat_toggles.iter().filter(|(_, on)| *on).count();
        }
        assert!(toggled_on >= 4, "alpha garrison engages a player standing in it");
        assert!(director.engaged_drones().count() >= 4);
    }
}
