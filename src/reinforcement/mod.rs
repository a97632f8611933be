//! Reinforcement scheduling
//!
//! Two dispatch paths feed squads through the director:
//! - automatic: a zone flipping to the player schedules a delayed counter
//!   squad, cancelled if the zone flips back before it fires
//! - strategic: the strategist spends squads from a finite pool, gated by a
//!   cooldown that dispatches in the same frame are exempt from
//!
//! The pool and cooldown are only ever written here.

pub mod squad;

pub use squad::{DispatchError, DispatchReceipt, ReinforcementEvent, StrategicSquad};

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::ReinforcementConfig;
use crate::core::schedule::{Scheduler, TaskHandle};
use crate::core::types::{SimTime, SquadId};
use crate::director::ZoneEnemyDirector;
use crate::zone::{CapturableZone, ZoneId, ZoneOwnership, ZoneRouteNetwork};

/// Strategic squads never exceed this many drones
pub const MAX_SQUAD_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
enum ReinforcementTask {
    Reactive { target: ZoneId },
    Strategic { squad: SquadId, origin: ZoneId, target: ZoneId, size: u32 },
}

pub struct ReinforcementManager {
    config: ReinforcementConfig,
    scheduler: Scheduler<ReinforcementTask>,
    reactive_pending: AHashMap<ZoneId, TaskHandle>,
    squads: Vec<StrategicSquad>,
    squads_remaining: u32,
    last_dispatch: Option<SimTime>,
    auto_response: bool,
    disabled: bool,
    match_ended: bool,
    rng: ChaCha8Rng,
}

impl ReinforcementManager {
    pub fn new(config: ReinforcementConfig, seed: u64) -> Self {
        Self {
            squads_remaining: config.strategic_squads,
            auto_response: config.auto_response,
            config,
            scheduler: Scheduler::new(),
            reactive_pending: AHashMap::new(),
            squads: Vec::new(),
            last_dispatch: None,
            disabled: false,
            match_ended: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn squads_remaining(&self) -> u32 {
        self.squads_remaining
    }

    /// Squads currently alive on the field
    pub fn active_squads(&self) -> &[StrategicSquad] {
        &self.squads
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.len()
    }

    pub fn has_pending_reactive(&self, zone: ZoneId) -> bool {
        self.reactive_pending.contains_key(&zone)
    }

    /// Seconds until the next strategic dispatch is allowed
    pub fn cooldown_remaining(&self, now: f32) -> f32 {
        match self.last_dispatch {
            Some(last) => (self.config.strategic_cooldown - (now - last.now)).max(0.0),
            None => 0.0,
        }
    }

    /// Whether another strategic dispatch this frame skips the cooldown
    pub fn dispatched_this_frame(&self, time: SimTime) -> bool {
        self.last_dispatch.is_some_and(|last| last.frame == time.frame)
    }

    /// React to a zone ownership change raised this frame
    pub fn on_ownership_changed(&mut self, zone: ZoneId, current: ZoneOwnership, time: SimTime) -> Option<ReinforcementEvent> {
        match current {
            ZoneOwnership::Player => {
                if !self.auto_response || self.disabled || self.match_ended {
                    return None;
                }
                if self.reactive_pending.contains_key(&zone) {
                    return None;
                }
                let delay = self.sample(self.config.reactive_delay_min, self.config.reactive_delay_max);
                let fire_at = time.now + delay;
                let handle = self.scheduler.schedule(fire_at, ReinforcementTask::Reactive { target: zone });
                self.reactive_pending.insert(zone, handle);
                tracing::info!(%zone, delay, "reactive reinforcement scheduled");
                Some(ReinforcementEvent::ReactiveScheduled { zone, fire_at })
            }
            ZoneOwnership::Enemy => {
                let handle = self.reactive_pending.remove(&zone)?;
                self.scheduler.cancel(handle);
                tracing::info!(%zone, "reactive reinforcement cancelled");
                Some(ReinforcementEvent::ReactiveCancelled { zone })
            }
        }
    }

    /// Turn the automatic path on or off. Turning it off cancels pending work.
    pub fn set_auto_response(&mut self, enabled: bool) {
        self.auto_response = enabled;
        if !enabled {
            self.cancel_reactive();
        }
    }

    /// Stop all reinforcement activity and drop pending work
    pub fn disable(&mut self) {
        self.disabled = true;
        self.cancel_all();
    }

    pub fn on_match_ended(&mut self) {
        self.match_ended = true;
        self.cancel_all();
    }

    /// Try to spend one strategic squad on `target`.
    ///
    /// Checks, in order: match ended, squads remaining, cooldown (skipped for
    /// a second dispatch in the same frame), origin zone.
    pub fn try_dispatch_strategic_squad(
        &mut self,
        target: ZoneId,
        size: u32,
        time: SimTime,
        zones: &[CapturableZone],
        director: &ZoneEnemyDirector,
    ) -> Result<DispatchReceipt, DispatchError> {
        if self.match_ended {
            return Err(DispatchError::MatchEnded);
        }
        if self.disabled {
            return Err(DispatchError::Disabled);
        }
        if self.squads_remaining == 0 {
            return Err(DispatchError::NoSquadsRemaining);
        }
        if !self.dispatched_this_frame(time) {
            let remaining = self.cooldown_remaining(time.now);
            if remaining > 0.0 {
                return Err(DispatchError::CooldownActive { remaining });
            }
        }
        let origin = self
            .pick_origin(target, zones, director)
            .ok_or(DispatchError::NoOriginZone { target })?;

        let size = size.clamp(1, MAX_SQUAD_SIZE);
        let eta = self.sample(self.config.strategic_eta_min, self.config.strategic_eta_max);
        let squad = SquadId::new();
        let arrives_at = time.now + eta;
        let handle = self.scheduler.schedule(
            arrives_at,
            ReinforcementTask::Strategic { squad, origin, target, size },
        );

        self.squads_remaining -= 1;
        self.last_dispatch = Some(time);
        tracing::info!(%origin, %target, size, eta, remaining = self.squads_remaining, "strategic squad dispatched");

        Ok(DispatchReceipt {
            squad,
            origin,
            target,
            size,
            arrives_at,
            handle,
        })
    }

    /// Fire due tasks and retire squads whose members are all dead
    pub fn tick(
        &mut self,
        time: SimTime,
        zones: &[CapturableZone],
        director: &mut ZoneEnemyDirector,
        routes: &ZoneRouteNetwork,
    ) -> Vec<ReinforcementEvent> {
        let mut events = Vec::new();

        for (handle, task) in self.scheduler.drain_due(time.now) {
            match task {
                ReinforcementTask::Reactive { target } => {
                    if self.reactive_pending.get(&target) == Some(&handle) {
                        self.reactive_pending.remove(&target);
                    }
                    let Some(origin) = self.pick_origin(target, zones, director) else {
                        tracing::warn!(%target, "reactive reinforcement skipped, no origin zone");
                        continue;
                    };
                    let members = director.spawn_squad(origin, target, self.config.reactive_squad_size, routes);
                    events.push(ReinforcementEvent::ReactiveSpawned {
                        origin,
                        target,
                        drones: members.len() as u32,
                    });
                }
                ReinforcementTask::Strategic { squad, origin, target, size } => {
                    let members = director.spawn_squad(origin, target, size, routes);
                    if members.is_empty() {
                        self.squads_remaining += 1;
                        tracing::warn!(%target, "strategic squad spawned no drones, refunded");
                        events.push(ReinforcementEvent::SquadRefunded { squad, target });
                        continue;
                    }
                    events.push(ReinforcementEvent::SquadSpawned {
                        squad,
                        target,
                        drones: members.len() as u32,
                    });
                    self.squads.push(StrategicSquad {
                        id: squad,
                        origin,
                        target,
                        members,
                        spawned_at: time.now,
                    });
                }
            }
        }

        let (destroyed, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut self.squads)
            .into_iter()
            .partition(|s| s.is_destroyed(|id| director.is_alive(id)));
        self.squads = alive;
        for squad in destroyed {
            tracing::info!(target = %squad.target, "strategic squad destroyed");
            events.push(ReinforcementEvent::SquadDestroyed {
                squad: squad.id,
                target: squad.target,
            });
        }

        events
    }

    /// Random enemy-owned zone other than the target, else whichever zone
    /// holds the most drones
    fn pick_origin(&mut self, target: ZoneId, zones: &[CapturableZone], director: &ZoneEnemyDirector) -> Option<ZoneId> {
        let candidates: Vec<ZoneId> = zones
            .iter()
            .filter(|z| z.ownership() == ZoneOwnership::Enemy && z.id != target)
            .map(|z| z.id)
            .collect();
        if !candidates.is_empty() {
            return Some(candidates[self.rng.gen_range(0..candidates.len())]);
        }
        director.zone_with_most_drones()
    }

    fn cancel_reactive(&mut self) {
        let cancelled = self
            .scheduler
            .cancel_where(|t| matches!(t, ReinforcementTask::Reactive { .. }));
        self.reactive_pending.clear();
        if cancelled > 0 {
            tracing::info!(cancelled, "pending reactive reinforcements cancelled");
        }
    }

    fn cancel_all(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.reactive_pending.clear();
        if cancelled > 0 {
            tracing::info!(cancelled, "pending reinforcements cancelled");
        }
    }

    fn sample(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }
}
