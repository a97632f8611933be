//! Drone tactical state machine
//!
//! Each tick: leash check, state transition, then movement for the
//! resulting state. Combat itself belongs to a role-specific collaborator
//! that is only switched on while the drone is in Engage.
//!
//! Transitions:
//! - Patrol -> Alert when the player is detected
//! - Alert -> Engage inside engage range, -> ReturnToZone when the player is lost
//! - Engage -> ReturnToZone after the player stays lost past the disengage delay
//! - ReturnToZone -> Patrol on arrival, -> Alert when the player is re-detected
//! - RelocateToTargetZone -> Patrol on arrival, -> Engage when the player is close
//! - any state except ReturnToZone/RelocateToTargetZone -> ReturnToZone past the leash

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::{DroneConfig, RoleTuning};
use crate::core::types::Vec2;
use crate::drone::{DroneRole, DroneState};
use crate::world::PathService;
use crate::zone::ZoneId;

/// Patrol wandering runs slower than purposeful movement
const PATROL_PACE: f32 = 0.6;
/// Engaged drones hold at this fraction of their engage range
const ENGAGE_HOLD_FRACTION: f32 = 0.8;
/// Relocating drones only break off for a player this much closer than usual
const RELOCATE_DETECTION_FRACTION: f32 = 0.9;
/// Fraction of the zone radius that counts as "at the center"
const ARRIVAL_RADIUS_FRACTION: f32 = 0.4;
const MIN_SEPARATION_DISTANCE: f32 = 0.1;

/// What the drone perceives this tick
pub struct DroneSenses<'a> {
    pub dt: f32,
    /// Position of the living player, `None` when dead or absent
    pub player: Option<Vec2>,
    pub zone_center: Vec2,
    pub zone_radius: f32,
    /// Positions of other living drones near this one
    pub neighbors: &'a [Vec2],
    pub nav: &'a dyn PathService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: DroneState,
    pub to: DroneState,
}

/// Navigation and timing numbers shared by every role
#[derive(Debug, Clone, Copy)]
struct TacticalSettings {
    zone_leash_distance: f32,
    disengage_delay: f32,
    lose_range_factor: f32,
    flank_offset: f32,
    patrol_retarget_interval: f32,
    patrol_radius_factor: f32,
    path_refresh_interval: f32,
    repath_distance: f32,
    corner_reach: f32,
    arrive_distance: f32,
    separation_radius: f32,
    separation_weight: f32,
    separation_nudge: f32,
}

impl From<&DroneConfig> for TacticalSettings {
    fn from(c: &DroneConfig) -> Self {
        Self {
            zone_leash_distance: c.zone_leash_distance,
            disengage_delay: c.disengage_delay,
            lose_range_factor: c.lose_range_factor,
            flank_offset: c.flank_offset,
            patrol_retarget_interval: c.patrol_retarget_interval,
            patrol_radius_factor: c.patrol_radius_factor,
            path_refresh_interval: c.path_refresh_interval,
            repath_distance: c.repath_distance,
            corner_reach: c.corner_reach,
            arrive_distance: c.arrive_distance,
            separation_radius: c.separation_radius,
            separation_weight: c.separation_weight,
            separation_nudge: c.separation_nudge,
        }
    }
}

/// Local path cache: corners toward the last requested goal
#[derive(Debug, Clone, Default)]
struct PathCache {
    corners: Vec<Vec2>,
    goal: Option<Vec2>,
    refresh_timer: f32,
}

/// Per-drone tactical controller
#[derive(Debug, Clone)]
pub struct ZoneDroneController {
    role: DroneRole,
    tuning: RoleTuning,
    settings: TacticalSettings,
    home_zone: ZoneId,
    active_zone: ZoneId,
    state: DroneState,
    has_relocation_order: bool,
    combat_enabled: bool,

    patrol_target: Option<Vec2>,
    patrol_timer: f32,
    lost_timer: f32,
    /// +1 or -1: which side a flanker swings to
    flank_side: f32,
    path: PathCache,
    rng: ChaCha8Rng,
}

impl ZoneDroneController {
    pub fn new(role: DroneRole, home_zone: ZoneId, config: &DroneConfig, seed: u64) -> Self {
        Self {
            role,
            tuning: config.tuning(role),
            settings: TacticalSettings::from(config),
            home_zone,
            active_zone: home_zone,
            state: DroneState::Patrol,
            has_relocation_order: false,
            combat_enabled: false,
            patrol_target: None,
            patrol_timer: 0.0,
            lost_timer: 0.0,
            flank_side: 1.0,
            path: PathCache::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn role(&self) -> DroneRole {
        self.role
    }

    pub fn tuning(&self) -> RoleTuning {
        self.tuning
    }

    pub fn state(&self) -> DroneState {
        self.state
    }

    pub fn home_zone(&self) -> ZoneId {
        self.home_zone
    }

    pub fn active_zone(&self) -> ZoneId {
        self.active_zone
    }

    pub fn has_relocation_order(&self) -> bool {
        self.has_relocation_order
    }

    /// Whether the role-specific combat collaborator should be running
    pub fn combat_enabled(&self) -> bool {
        self.combat_enabled
    }

    /// Order the drone to move to `target` and adopt it as its active zone
    pub fn issue_relocation(&mut self, target: ZoneId) -> Option<StateTransition> {
        self.active_zone = target;
        let transition = self.enter(DroneState::RelocateToTargetZone);
        self.has_relocation_order = true;
        transition
    }

    /// Advance one tick. Moves `position` and returns the state change, if any.
    pub fn tick(&mut self, position: &mut Vec2, senses: &DroneSenses) -> Option<StateTransition> {
        let tuning = self.tuning;
        let s = self.settings;

        let player_distance = senses.player.map(|p| p.distance(*position));
        let detected = player_distance.is_some_and(|d| d <= tuning.detection_range);
        let lost = player_distance.map_or(true, |d| d > tuning.detection_range * s.lose_range_factor);
        let from_center = position.distance(senses.zone_center);
        let arrival = s.arrive_distance.max(senses.zone_radius * ARRIVAL_RADIUS_FRACTION);

        let leashed = from_center > s.zone_leash_distance
            && !matches!(
                self.state,
                DroneState::ReturnToZone | DroneState::RelocateToTargetZone
            );

        let transition = if leashed {
            self.enter(DroneState::ReturnToZone)
        } else {
            match self.state {
                DroneState::Patrol if detected => self.enter(DroneState::Alert),
                DroneState::Alert if player_distance.is_some_and(|d| d <= tuning.engage_range) => {
                    self.enter(DroneState::Engage)
                }
                DroneState::Alert if lost => self.enter(DroneState::ReturnToZone),
                DroneState::Engage if lost => {
                    self.lost_timer += senses.dt;
                    if self.lost_timer > s.disengage_delay {
                        self.enter(DroneState::ReturnToZone)
                    } else {
                        None
                    }
                }
                DroneState::Engage => {
                    self.lost_timer = 0.0;
                    None
                }
                DroneState::ReturnToZone if from_center <= arrival => self.enter(DroneState::Patrol),
                DroneState::ReturnToZone if detected => self.enter(DroneState::Alert),
                DroneState::RelocateToTargetZone if from_center <= arrival => {
                    self.enter(DroneState::Patrol)
                }
                DroneState::RelocateToTargetZone
                    if player_distance
                        .is_some_and(|d| d <= tuning.detection_range * RELOCATE_DETECTION_FRACTION) =>
                {
                    self.enter(DroneState::Engage)
                }
                _ => None,
            }
        };

        self.act(position, senses);
        transition
    }

    fn enter(&mut self, next: DroneState) -> Option<StateTransition> {
        if next == self.state {
            return None;
        }
        let from = self.state;
        if from == DroneState::RelocateToTargetZone {
            self.has_relocation_order = false;
        }

        self.state = next;
        self.path = PathCache::default();
        self.lost_timer = 0.0;
        self.combat_enabled = next == DroneState::Engage;
        match next {
            DroneState::Alert => {
                self.flank_side = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            }
            DroneState::Patrol => self.patrol_target = None,
            _ => {}
        }

        tracing::debug!(role = ?self.role, zone = %self.active_zone, ?from, to = ?next, "drone state change");
        Some(StateTransition { from, to: next })
    }

    fn act(&mut self, position: &mut Vec2, senses: &DroneSenses) {
        let speed = self.tuning.move_speed;
        match self.state {
            DroneState::Patrol => {
                self.patrol_timer -= senses.dt;
                let retarget = match self.patrol_target {
                    None => true,
                    Some(t) => {
                        t.distance(*position) <= self.settings.corner_reach || self.patrol_timer <= 0.0
                    }
                };
                if retarget {
                    self.patrol_target = Some(self.pick_patrol_point(senses));
                    self.patrol_timer = self.settings.patrol_retarget_interval;
                }
                if let Some(target) = self.patrol_target {
                    self.steer(position, target, speed * PATROL_PACE, senses);
                }
            }
            DroneState::Alert => {
                if let Some(player) = senses.player {
                    let goal = self.approach_point(*position, player);
                    self.steer(position, goal, speed, senses);
                }
            }
            DroneState::Engage => {
                if let Some(player) = senses.player {
                    if position.distance(player) > self.tuning.engage_range * ENGAGE_HOLD_FRACTION {
                        self.steer(position, player, speed, senses);
                    }
                }
                let push = separation_push(*position, senses.neighbors, self.settings.separation_radius);
                *position += push * self.settings.separation_nudge * senses.dt;
            }
            DroneState::ReturnToZone | DroneState::RelocateToTargetZone => {
                self.steer(position, senses.zone_center, speed, senses);
            }
        }
    }

    /// Head-on for most roles; flankers aim to the side of the player
    fn approach_point(&self, position: Vec2, player: Vec2) -> Vec2 {
        if self.role != DroneRole::Flanker {
            return player;
        }
        let from_player = (position - player).normalize_or_zero();
        player + from_player.perp() * self.flank_side * self.settings.flank_offset
    }

    fn pick_patrol_point(&mut self, senses: &DroneSenses) -> Vec2 {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let reach = senses.zone_radius * self.settings.patrol_radius_factor;
        let r = self.rng.gen::<f32>().sqrt() * reach;
        let candidate = senses.zone_center + Vec2::new(angle.cos(), angle.sin()) * r;
        senses
            .nav
            .sample_position(candidate, senses.zone_radius)
            .unwrap_or(senses.zone_center)
    }

    /// Follow the cached path toward `goal`, blending in separation
    fn steer(&mut self, position: &mut Vec2, goal: Vec2, speed: f32, senses: &DroneSenses) {
        let s = self.settings;

        self.path.refresh_timer -= senses.dt;
        let goal_moved = self.path.goal.map_or(true, |g| g.distance(goal) > s.repath_distance);
        if goal_moved || self.path.refresh_timer <= 0.0 || self.path.corners.is_empty() {
            self.path.corners = senses
                .nav
                .find_path(*position, goal)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| vec![goal]);
            self.path.goal = Some(goal);
            self.path.refresh_timer = s.path_refresh_interval;
        }

        while self.path.corners.len() > 1 && self.path.corners[0].distance(*position) <= s.corner_reach {
            self.path.corners.remove(0);
        }

        let next = self.path.corners.first().copied().unwrap_or(goal);
        let to_next = next - *position;
        let dist = to_next.length();
        if dist < 1e-4 {
            return;
        }

        let mut dir = to_next / dist;
        let push = separation_push(*position, senses.neighbors, s.separation_radius);
        if push != Vec2::ZERO {
            dir = (dir + push * s.separation_weight).normalize_or_zero();
        }
        *position += dir * (speed * senses.dt).min(dist);
    }
}

/// Inverse-distance weighted push away from neighbours inside `radius`.
/// Length is capped at 1.
pub fn separation_push(position: Vec2, neighbors: &[Vec2], radius: f32) -> Vec2 {
    let mut push = Vec2::ZERO;
    for &other in neighbors {
        let offset = position - other;
        let d = offset.length();
        if d >= radius || d < 1e-5 {
            continue;
        }
        push += offset / d / d.max(MIN_SEPARATION_DISTANCE);
    }
    push.clamp_length_max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DirectNav;

    impl PathService for DirectNav {
        fn find_path(&self, _from: Vec2, to: Vec2) -> Option<Vec<Vec2>> {
            Some(vec![to])
        }
        fn sample_position(&self, position: Vec2, _max_distance: f32) -> Option<Vec2> {
            Some(position)
        }
    }

    fn controller(role: DroneRole) -> ZoneDroneController {
        ZoneDroneController::new(role, ZoneId::Alpha, &DroneConfig::default(), 11)
    }

    fn senses<'a>(player: Option<Vec2>, neighbors: &'a [Vec2]) -> DroneSenses<'a> {
        DroneSenses {
            dt: 0.1,
            player,
            zone_center: Vec2::ZERO,
            zone_radius: 8.0,
            neighbors,
            nav: &DirectNav,
        }
    }

    #[test]
    fn test_patrol_stays_inside_zone() {
        let mut c = controller(DroneRole::Basic);
        let mut pos = Vec2::ZERO;
        for _ in 0..300 {
            assert!(c.tick(&mut pos, &senses(None, &[])).is_none());
            assert!(pos.length() <= 8.0 + 1e-3);
        }
        assert_eq!(c.state(), DroneState::Patrol);
    }

    #[test]
    fn test_patrol_to_alert_to_engage() {
        let mut c = controller(DroneRole::Basic);
        let mut pos = Vec2::ZERO;
        let player = Vec2::new(12.0, 0.0);

        let t = c.tick(&mut pos, &senses(Some(player), &[])).unwrap();
        assert_eq!(t, StateTransition { from: DroneState::Patrol, to: DroneState::Alert });
        assert!(!c.combat_enabled());

        let mut engaged = false;
        for _ in 0..40 {
            if let Some(t) = c.tick(&mut pos, &senses(Some(player), &[])) {
                assert_eq!(t.to, DroneState::Engage);
                engaged = true;
                break;
            }
        }
        assert!(engaged);
        assert!(c.combat_enabled());
    }

    #[test]
    fn test_engage_disengages_after_delay() {
        let mut c = controller(DroneRole::Basic);
        let mut pos = Vec2::ZERO;
        c.enter(DroneState::Engage);

        // Player dead: lost, but only gives up after the 2.5 s delay
        for _ in 0..24 {
            assert!(c.tick(&mut pos, &senses(None, &[])).is_none());
        }
        let mut returned = false;
        for _ in 0..3 {
            if let Some(t) = c.tick(&mut pos, &senses(None, &[])) {
                assert_eq!(t.to, DroneState::ReturnToZone);
                returned = true;
                break;
            }
        }
        assert!(returned);
        assert!(!c.combat_enabled());
    }

    #[test]
    fn test_reacquiring_player_resets_lost_timer() {
        let mut c = controller(DroneRole::Basic);
        let mut pos = Vec2::ZERO;
        c.enter(DroneState::Engage);
        for _ in 0..20 {
            c.tick(&mut pos, &senses(None, &[]));
        }
        c.tick(&mut pos, &senses(Some(Vec2::new(3.0, 0.0)), &[]));
        for _ in 0..20 {
            assert!(c.tick(&mut pos, &senses(None, &[])).is_none());
        }
        assert_eq!(c.state(), DroneState::Engage);
    }

    #[test]
    fn test_leash_forces_return_from_engage_and_patrol() {
        for state in [DroneState::Engage, DroneState::Patrol, DroneState::Alert] {
            let mut c = controller(DroneRole::Basic);
            c.enter(state);
            let mut pos = Vec2::new(30.0, 0.0);
            let player = Some(Vec2::new(33.0, 0.0));
            let t = c.tick(&mut pos, &senses(player, &[]));
            assert_eq!(t.map(|t| t.to), Some(DroneState::ReturnToZone));
            assert_eq!(c.state(), DroneState::ReturnToZone);
        }
    }

    #[test]
    fn test_leash_ignored_while_relocating() {
        let mut c = controller(DroneRole::Basic);
        c.issue_relocation(ZoneId::Bravo);
        let mut pos = Vec2::new(60.0, 0.0);
        assert!(c.tick(&mut pos, &senses(None, &[])).is_none());
        assert_eq!(c.state(), DroneState::RelocateToTargetZone);
        assert!(pos.x < 60.0, "relocating drone moves toward the zone");
    }

    #[test]
    fn test_return_to_patrol_on_arrival() {
        let mut c = controller(DroneRole::Heavy);
        c.enter(DroneState::ReturnToZone);
        let mut pos = Vec2::new(15.0, 0.0);
        let mut arrived = false;
        for _ in 0..100 {
            if let Some(t) = c.tick(&mut pos, &senses(None, &[])) {
                assert_eq!(t.to, DroneState::Patrol);
                arrived = true;
                break;
            }
        }
        assert!(arrived);
    }

    #[test]
    fn test_returning_drone_redetects_player() {
        let mut c = controller(DroneRole::Basic);
        c.enter(DroneState::ReturnToZone);
        let mut pos = Vec2::new(18.0, 0.0);
        // Player is outside the leash ring but within detection range
        let t = c.tick(&mut pos, &senses(Some(Vec2::new(30.0, 0.0)), &[]));
        assert_eq!(
            t,
            Some(StateTransition { from: DroneState::ReturnToZone, to: DroneState::Alert })
        );
        assert_eq!(c.state(), DroneState::Alert);
    }

    #[test]
    fn test_relocation_completes_and_clears_order() {
        let mut c = controller(DroneRole::Flanker);
        let t = c.issue_relocation(ZoneId::Charlie).unwrap();
        assert_eq!(t.to, DroneState::RelocateToTargetZone);
        assert!(c.has_relocation_order());
        assert_eq!(c.active_zone(), ZoneId::Charlie);
        assert_eq!(c.home_zone(), ZoneId::Alpha);

        let mut pos = Vec2::new(20.0, 0.0);
        for _ in 0..100 {
            c.tick(&mut pos, &senses(None, &[]));
            if c.state() == DroneState::Patrol {
                break;
            }
        }
        assert_eq!(c.state(), DroneState::Patrol);
        assert!(!c.has_relocation_order());
    }

    #[test]
    fn test_relocating_drone_engages_close_player() {
        let mut c = controller(DroneRole::Basic);
        c.issue_relocation(ZoneId::Bravo);
        let mut pos = Vec2::new(20.0, 0.0);
        // 14 detection * 0.9 = 12.6; a player 13.5 away is ignored
        assert!(c.tick(&mut pos, &senses(Some(Vec2::new(33.5, 0.0)), &[])).is_none());
        let t = c.tick(&mut pos, &senses(Some(Vec2::new(25.0, 0.0)), &[]));
        assert_eq!(t.map(|t| t.to), Some(DroneState::Engage));
        assert!(!c.has_relocation_order());
    }

    #[test]
    fn test_flanker_swings_wide() {
        let player = Vec2::new(12.0, 0.0);

        let mut basic = controller(DroneRole::Basic);
        let mut basic_pos = Vec2::ZERO;
        basic.tick(&mut basic_pos, &senses(Some(player), &[]));
        basic.tick(&mut basic_pos, &senses(Some(player), &[]));
        assert!(basic_pos.y.abs() < 1e-4);

        let mut flanker = controller(DroneRole::Flanker);
        let mut flanker_pos = Vec2::ZERO;
        flanker.tick(&mut flanker_pos, &senses(Some(player), &[]));
        flanker.tick(&mut flanker_pos, &senses(Some(player), &[]));
        assert!(flanker_pos.y.abs() > 1e-3);
    }

    #[test]
    fn test_separation_push_points_away() {
        let push = separation_push(Vec2::ZERO, &[Vec2::new(1.0, 0.0)], 2.5);
        assert!(push.x < 0.0);
        assert!(push.length() <= 1.0 + 1e-6);

        let none = separation_push(Vec2::ZERO, &[Vec2::new(5.0, 0.0)], 2.5);
        assert_eq!(none, Vec2::ZERO);

        let closer = separation_push(Vec2::ZERO, &[Vec2::new(0.5, 0.0)], 2.5);
        let farther = separation_push(Vec2::ZERO, &[Vec2::new(2.0, 0.0)], 2.5);
        assert!(closer.length() > farther.length());
    }
}
