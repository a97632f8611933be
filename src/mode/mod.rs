//! Zone control game mode
//!
//! Owns every subsystem of a match and drives them in a fixed order each
//! tick:
//!
//! 1. advance the clock
//! 2. zones sense presence and move progress; ownership changes reach the
//!    reinforcement manager and the event log in the same frame
//! 3. the director ticks every drone
//! 4. the reinforcement manager fires due work and retires dead squads
//! 5. the strategist runs (or polls) its decision cycle
//! 6. win/loss is evaluated
//!
//! Everything that happens is published on the event bus and mirrored to
//! the HUD sink.

use serde::Serialize;

use crate::core::config::ZoneControlConfig;
use crate::core::types::{DroneId, SimTime, Vec2};
use crate::director::ZoneEnemyDirector;
use crate::events::{BattlefieldEventLog, EventBus, GameEvent, MatchOutcome, Subscription};
use crate::llm::service::DecisionService;
use crate::reinforcement::{ReinforcementEvent, ReinforcementManager};
use crate::strategy::{StrategistStatus, StrategyContext, SwarmStrategist};
use crate::world::{HudSink, LaneNavigator, NullHud, PathService, PlayerState};
use crate::zone::{CapturableZone, ZoneId, ZoneNotification, ZoneOwnership, ZoneRouteNetwork};

/// Arena slack beyond the zone ring that navigation still accepts
const NAV_BOUNDS_MARGIN: f32 = 20.0;

/// Per-zone line of a match summary
#[derive(Debug, Clone, Serialize)]
pub struct ZoneSummary {
    pub id: ZoneId,
    pub owner: ZoneOwnership,
    pub progress: f32,
    pub defenders: u32,
}

/// End-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub outcome: MatchOutcome,
    pub elapsed_seconds: f32,
    pub frames: u64,
    pub zones: Vec<ZoneSummary>,
    pub drones_alive: u32,
    pub squads_remaining: u32,
    pub player_health_percent: f32,
    pub strategist: StrategistStatus,
    pub recent_events: Vec<String>,
}

pub struct ZoneControlGameMode {
    config: ZoneControlConfig,
    routes: ZoneRouteNetwork,
    nav: Box<dyn PathService>,
    hud: Box<dyn HudSink>,
    zones: Vec<CapturableZone>,
    player: PlayerState,
    director: ZoneEnemyDirector,
    reinforcement: ReinforcementManager,
    strategist: SwarmStrategist,
    log: BattlefieldEventLog,
    bus: EventBus<GameEvent>,
    time: SimTime,
    outcome: MatchOutcome,
}

impl ZoneControlGameMode {
    /// Build a match and spawn the starting garrisons. Without a decision
    /// service the strategist runs offline.
    pub fn new(config: ZoneControlConfig, service: Option<Box<dyn DecisionService>>) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(problem) => {
                tracing::warn!(%problem, "invalid configuration, using defaults");
                let mut fallback = ZoneControlConfig::default();
                fallback.match_settings.seed = config.match_settings.seed;
                fallback
            }
        };

        let seed = config.match_settings.seed;
        let routes = ZoneRouteNetwork::generate(&config.zones);
        let zones = ZoneId::ALL
            .iter()
            .map(|&id| CapturableZone::new(id, routes.center(id), routes.radius(id), &config.zones))
            .collect();

        let mut director = ZoneEnemyDirector::new(config.drones.clone(), config.director.clone(), seed);
        let garrison = director.spawn_garrison(&routes);
        tracing::info!(seed, drones = garrison.len(), "match started");

        let nav = LaneNavigator::new(routes.clone(), config.zones.arena_radius + NAV_BOUNDS_MARGIN);

        Self {
            reinforcement: ReinforcementManager::new(config.reinforcement.clone(), seed.wrapping_add(1)),
            strategist: SwarmStrategist::new(
                config.strategist.clone(),
                config.decision_service.clone(),
                service,
                seed.wrapping_add(2),
            ),
            player: PlayerState::new(Vec2::ZERO, config.match_settings.player_max_health),
            nav: Box::new(nav),
            hud: Box::new(NullHud),
            zones,
            routes,
            director,
            log: BattlefieldEventLog::new(),
            bus: EventBus::new(),
            time: SimTime::default(),
            outcome: MatchOutcome::InProgress,
            config,
        }
    }

    pub fn with_hud(mut self, hud: Box<dyn HudSink>) -> Self {
        self.hud = hud;
        self
    }

    pub fn with_navigator(mut self, nav: Box<dyn PathService>) -> Self {
        self.nav = nav;
        self
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn outcome(&self) -> MatchOutcome {
        self.outcome
    }

    pub fn config(&self) -> &ZoneControlConfig {
        &self.config
    }

    pub fn routes(&self) -> &ZoneRouteNetwork {
        &self.routes
    }

    pub fn zones(&self) -> &[CapturableZone] {
        &self.zones
    }

    pub fn zone(&self, id: ZoneId) -> &CapturableZone {
        &self.zones[id.index()]
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// The host moves the player and applies damage through this
    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    pub fn director(&self) -> &ZoneEnemyDirector {
        &self.director
    }

    pub fn reinforcement(&self) -> &ReinforcementManager {
        &self.reinforcement
    }

    pub fn reinforcement_mut(&mut self) -> &mut ReinforcementManager {
        &mut self.reinforcement
    }

    pub fn strategist(&self) -> &SwarmStrategist {
        &self.strategist
    }

    pub fn strategist_mut(&mut self) -> &mut SwarmStrategist {
        &mut self.strategist
    }

    pub fn event_log(&self) -> &BattlefieldEventLog {
        &self.log
    }

    pub fn subscribe(&mut self) -> Subscription<GameEvent> {
        self.bus.subscribe()
    }

    /// Player damage to a drone. The corpse is collected on the next tick.
    pub fn damage_drone(&mut self, id: DroneId, amount: f32) -> bool {
        self.director.damage_drone(id, amount)
    }

    /// Advance the match by `dt` seconds. Returns everything published
    /// during the tick; nothing once the match is over.
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut published = Vec::new();
        if self.outcome.is_over() {
            return published;
        }

        self.time.advance(dt);
        let now = self.time.now;
        let player_position = self.player.alive_position();

        let mut notifications = Vec::new();
        for zone in &mut self.zones {
            let report = zone.tick(dt, now, player_position, &self.director);
            self.hud
                .zone_state(zone.id, zone.ownership(), zone.capture_progress(), zone.is_contested());
            notifications.extend(report.notifications);
        }
        for notification in notifications {
            self.emit(GameEvent::Zone(notification), &mut published);
            if let ZoneNotification::OwnershipChanged { zone, current, .. } = notification {
                self.hud.toast(&ownership_toast(zone, current));
                if let Some(event) = self.reinforcement.on_ownership_changed(zone, current, self.time) {
                    self.emit(GameEvent::Reinforcement(event), &mut published);
                }
            }
        }

        let report = self
            .director
            .tick(dt, player_position, &self.routes, self.nav.as_ref());
        for (drone, zone) in report.destroyed {
            self.emit(GameEvent::DroneDestroyed { drone, zone }, &mut published);
        }

        for event in self
            .reinforcement
            .tick(self.time, &self.zones, &mut self.director, &self.routes)
        {
            self.emit(GameEvent::Reinforcement(event), &mut published);
        }

        let output = {
            let mut ctx = StrategyContext {
                time: self.time,
                zones: &self.zones,
                player: &self.player,
                director: &mut self.director,
                reinforcement: &mut self.reinforcement,
                log: &self.log,
                match_ended: false,
            };
            self.strategist.tick(&mut ctx)
        };
        for event in output.events {
            self.emit(GameEvent::Reinforcement(event), &mut published);
        }
        if let Some(text) = output.transmission {
            self.hud.transmission(&text);
            self.emit(GameEvent::Transmission { text }, &mut published);
        }

        let outcome = self.evaluate_outcome();
        if outcome.is_over() {
            self.end_match(outcome, &mut published);
        }

        published
    }

    fn evaluate_outcome(&self) -> MatchOutcome {
        if self.player.is_dead() {
            return MatchOutcome::PlayerDefeat;
        }
        if self.zones.iter().all(|z| z.ownership() == ZoneOwnership::Player) {
            return MatchOutcome::PlayerVictory;
        }
        match self.config.match_settings.match_time_limit {
            Some(limit) if self.time.now >= limit => MatchOutcome::PlayerDefeat,
            _ => MatchOutcome::InProgress,
        }
    }

    fn end_match(&mut self, outcome: MatchOutcome, published: &mut Vec<GameEvent>) {
        self.outcome = outcome;
        self.reinforcement.on_match_ended();
        self.strategist.cancel_pending();
        tracing::info!(outcome = outcome.as_str(), elapsed = self.time.now, "match ended");
        self.hud.toast(match outcome {
            MatchOutcome::PlayerVictory => "All zones secured",
            _ => "Mission failed",
        });
        self.emit(GameEvent::MatchEnded { outcome }, published);
    }

    fn emit(&mut self, event: GameEvent, published: &mut Vec<GameEvent>) {
        if let GameEvent::Reinforcement(ReinforcementEvent::SquadSpawned { target, .. }) = &event {
            self.hud.toast(&format!("Enemy squad inbound to {}", target));
        }
        self.log.record(self.time.now, &event);
        self.bus.publish(event.clone());
        published.push(event);
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            outcome: self.outcome,
            elapsed_seconds: self.time.now,
            frames: self.time.frame,
            zones: self
                .zones
                .iter()
                .map(|z| ZoneSummary {
                    id: z.id,
                    owner: z.ownership(),
                    progress: z.capture_progress(),
                    defenders: self.director.drones_in_zone(z.id),
                })
                .collect(),
            drones_alive: self.director.alive_count(),
            squads_remaining: self.reinforcement.squads_remaining(),
            player_health_percent: self.player.health_percent(),
            strategist: self.strategist.status().clone(),
            recent_events: self.log.recent_tokens(self.config.strategist.recent_event_count),
        }
    }
}

fn ownership_toast(zone: ZoneId, owner: ZoneOwnership) -> String {
    match owner {
        ZoneOwnership::Player => format!("Zone {} captured", zone.as_str().to_uppercase()),
        ZoneOwnership::Enemy => format!("Zone {} lost", zone.as_str().to_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quiet_config() -> ZoneControlConfig {
        let mut config = ZoneControlConfig::default();
        config.director.defenders_per_zone = 0;
        config.reinforcement.auto_response = false;
        config.reinforcement.strategic_squads = 0;
        config.strategist.offline_mode = true;
        config
    }

    /// Park the player on `zone` for `seconds` in half-second ticks
    fn hold_zone(mode: &mut ZoneControlGameMode, zone: ZoneId, seconds: f32) -> Vec<GameEvent> {
        mode.player_mut().position = mode.routes().center(zone);
        let mut events = Vec::new();
        for _ in 0..(seconds / 0.5) as usize {
            events.extend(mode.tick(0.5));
        }
        events
    }

    #[derive(Default)]
    struct RecordingHud {
        toasts: Rc<RefCell<Vec<String>>>,
    }

    impl HudSink for RecordingHud {
        fn toast(&mut self, message: &str) {
            self.toasts.borrow_mut().push(message.to_string());
        }
    }

    #[test]
    fn test_garrison_spawned_at_start() {
        let mode = ZoneControlGameMode::new(ZoneControlConfig::default(), None);
        assert_eq!(mode.director().alive_count(), 12);
        assert!(mode.strategist().is_offline());
        assert!(mode.zones().iter().all(|z| z.ownership() == ZoneOwnership::Enemy));
    }

    #[test]
    fn test_capture_schedules_reactive_wave_same_frame() {
        let mut config = quiet_config();
        config.reinforcement.auto_response = true;
        let mut mode = ZoneControlGameMode::new(config, None);

        let events = hold_zone(&mut mode, ZoneId::Alpha, 8.0);
        assert_eq!(mode.zone(ZoneId::Alpha).ownership(), ZoneOwnership::Player);
        assert!(mode.reinforcement().has_pending_reactive(ZoneId::Alpha));

        let flip = events
            .iter()
            .position(|e| matches!(e, GameEvent::Zone(ZoneNotification::OwnershipChanged { .. })))
            .unwrap();
        let scheduled = events
            .iter()
            .position(|e| matches!(e, GameEvent::Reinforcement(ReinforcementEvent::ReactiveScheduled { .. })))
            .unwrap();
        assert_eq!(scheduled, flip + 1);
        assert!(mode
            .event_log()
            .recent_tokens(5)
            .contains(&"player_captured_alpha".to_string()));
    }

    #[test]
    fn test_victory_when_all_zones_held() {
        let toasts = Rc::new(RefCell::new(Vec::new()));
        let hud = RecordingHud { toasts: Rc::clone(&toasts) };
        let mut mode = ZoneControlGameMode::new(quiet_config(), None).with_hud(Box::new(hud));
        let mut sub = mode.subscribe();

        hold_zone(&mut mode, ZoneId::Alpha, 8.0);
        hold_zone(&mut mode, ZoneId::Bravo, 8.0);
        assert_eq!(mode.outcome(), MatchOutcome::InProgress);
        let events = hold_zone(&mut mode, ZoneId::Charlie, 8.0);

        assert_eq!(mode.outcome(), MatchOutcome::PlayerVictory);
        assert!(events.contains(&GameEvent::MatchEnded { outcome: MatchOutcome::PlayerVictory }));
        assert!(sub
            .drain()
            .contains(&GameEvent::MatchEnded { outcome: MatchOutcome::PlayerVictory }));
        assert!(toasts.borrow().iter().any(|t| t == "Zone CHARLIE captured"));
        assert!(mode.tick(0.5).is_empty());
    }

    #[test]
    fn test_player_death_is_defeat_and_cancels_work() {
        let mut config = quiet_config();
        config.reinforcement.auto_response = true;
        let mut mode = ZoneControlGameMode::new(config, None);
        hold_zone(&mut mode, ZoneId::Bravo, 8.0);
        assert!(mode.reinforcement().pending_tasks() > 0);

        mode.player_mut().apply_damage(1000.0);
        mode.tick(0.5);
        assert_eq!(mode.outcome(), MatchOutcome::PlayerDefeat);
        assert_eq!(mode.reinforcement().pending_tasks(), 0);
    }

    #[test]
    fn test_time_limit_is_defeat() {
        let mut config = quiet_config();
        config.match_settings.match_time_limit = Some(2.0);
        let mut mode = ZoneControlGameMode::new(config, None);
        for _ in 0..3 {
            mode.tick(0.5);
        }
        assert_eq!(mode.outcome(), MatchOutcome::InProgress);
        mode.tick(0.5);
        assert_eq!(mode.outcome(), MatchOutcome::PlayerDefeat);
    }

    #[test]
    fn test_killed_drone_reported_next_tick() {
        let mut mode = ZoneControlGameMode::new(ZoneControlConfig::default(), None);
        let id = mode.director().drones().next().map(|d| d.id).unwrap();
        assert!(mode.damage_drone(id, 10_000.0));
        let events = mode.tick(0.1);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::DroneDestroyed { drone, .. } if *drone == id)));
        assert_eq!(mode.director().alive_count(), 11);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let mut config = ZoneControlConfig::default();
        config.zones.player_capture_duration = 0.0;
        config.match_settings.seed = 99;
        let mode = ZoneControlGameMode::new(config, None);
        assert_eq!(mode.config().zones.player_capture_duration, 8.0);
        assert_eq!(mode.config().match_settings.seed, 99);
    }
}
