//! Swarm strategist decision loop
//!
//! One decision cycle every randomised interval. A cycle snapshots the
//! battlefield, resolves a directive through the fallback chain, executes it
//! through the reinforcement manager or the director, and emits the
//! reasoning as a transmission.
//!
//! Resolution order:
//! - offline mode: offline heuristic
//! - called the service too recently: cached directive (re-validated), else heuristic
//! - otherwise ask the service; while the request is in flight the cycle is
//!   suspended and the rest of the simulation keeps ticking
//! - on any service failure: cached -> failure heuristic -> offline heuristic -> hold

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::core::config::{DecisionServiceConfig, StrategistConfig};
use crate::core::types::SimTime;
use crate::director::ZoneEnemyDirector;
use crate::events::BattlefieldEventLog;
use crate::llm::parser::{parse_directive, STRATEGIST_SYSTEM_PROMPT};
use crate::llm::service::{DecisionPoll, DecisionRequest, DecisionService, PendingDecision};
use crate::llm::snapshot::BattlefieldSnapshot;
use crate::reinforcement::{ReinforcementEvent, ReinforcementManager};
use crate::strategy::directive::{DirectiveSource, Order, StrategicDirective, ValidatedDirective};
use crate::strategy::heuristics::{failure_directive, offline_directive};
use crate::strategy::validator::{validate, validate_or_hold};
use crate::world::PlayerState;
use crate::zone::{CapturableZone, ZoneId};

/// Everything the strategist reads or commands during a tick
pub struct StrategyContext<'a> {
    pub time: SimTime,
    pub zones: &'a [CapturableZone],
    pub player: &'a PlayerState,
    pub director: &'a mut ZoneEnemyDirector,
    pub reinforcement: &'a mut ReinforcementManager,
    pub log: &'a BattlefieldEventLog,
    pub match_ended: bool,
}

/// Result of a tick in which a directive was executed
#[derive(Debug, Clone, Default)]
pub struct StrategistOutput {
    pub transmission: Option<String>,
    pub events: Vec<ReinforcementEvent>,
}

/// Debug surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct StrategistStatus {
    pub offline: bool,
    pub cycles: u32,
    pub service_calls: u32,
    pub service_failures: u32,
    pub awaiting_response: bool,
    pub next_decision_at: f32,
    pub last_source: Option<DirectiveSource>,
    pub last_directive: Option<ValidatedDirective>,
    /// Status string per executed leg
    pub last_execution: Vec<String>,
    pub last_error: Option<String>,
}

struct InFlight {
    pending: PendingDecision,
    submitted_at: f32,
}

pub struct SwarmStrategist {
    config: StrategistConfig,
    service_config: DecisionServiceConfig,
    service: Option<Box<dyn DecisionService>>,
    in_flight: Option<InFlight>,
    cached: Option<StrategicDirective>,
    last_call_at: Option<f32>,
    next_decision_at: f32,
    status: StrategistStatus,
    rng: ChaCha8Rng,
}

impl SwarmStrategist {
    pub fn new(
        config: StrategistConfig,
        service_config: DecisionServiceConfig,
        service: Option<Box<dyn DecisionService>>,
        seed: u64,
    ) -> Self {
        let offline = config.offline_mode || service.is_none();
        if !config.offline_mode && service.is_none() {
            tracing::warn!("no decision service available, strategist running offline");
        }

        let mut strategist = Self {
            config,
            service_config,
            service,
            in_flight: None,
            cached: None,
            last_call_at: None,
            next_decision_at: 0.0,
            status: StrategistStatus {
                offline,
                ..StrategistStatus::default()
            },
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        strategist.next_decision_at = strategist.decision_interval();
        strategist.status.next_decision_at = strategist.next_decision_at;
        strategist
    }

    pub fn status(&self) -> &StrategistStatus {
        &self.status
    }

    pub fn is_offline(&self) -> bool {
        self.status.offline
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Run the next cycle on the following tick
    pub fn request_immediate_decision(&mut self) {
        self.next_decision_at = 0.0;
    }

    /// Drop any request in flight; its reply will be discarded
    pub fn cancel_pending(&mut self) {
        if self.in_flight.take().is_some() {
            tracing::debug!("pending decision request abandoned");
        }
        self.status.awaiting_response = false;
    }

    pub fn tick(&mut self, ctx: &mut StrategyContext) -> StrategistOutput {
        if ctx.match_ended {
            self.cancel_pending();
            return StrategistOutput::default();
        }

        if self.in_flight.is_none() {
            if ctx.time.now < self.next_decision_at {
                return StrategistOutput::default();
            }
            if let Some(output) = self.start_cycle(ctx) {
                return output;
            }
        }

        self.poll_in_flight(ctx)
    }

    /// Begin a cycle. Resolves immediately unless the service is consulted.
    fn start_cycle(&mut self, ctx: &mut StrategyContext) -> Option<StrategistOutput> {
        self.status.cycles += 1;
        self.next_decision_at = ctx.time.now + self.decision_interval();
        self.status.next_decision_at = self.next_decision_at;
        let snapshot = self.snapshot(ctx);

        if self.status.offline {
            let directive = validate_or_hold(&offline_directive(&snapshot, &self.config), &snapshot);
            return Some(self.execute(directive, DirectiveSource::Offline, ctx));
        }

        let since_call = self.last_call_at.map(|t| ctx.time.now - t);
        if since_call.is_some_and(|s| s < self.config.min_seconds_between_calls) {
            let (directive, source) = match self.revalidated_cache(&snapshot) {
                Some(cached) => (cached, DirectiveSource::Cached),
                None => (
                    validate_or_hold(&offline_directive(&snapshot, &self.config), &snapshot),
                    DirectiveSource::OfflineHeuristic,
                ),
            };
            return Some(self.execute(directive, source, ctx));
        }

        let service = self.service.as_mut()?;
        let request = DecisionRequest::new(STRATEGIST_SYSTEM_PROMPT, snapshot.to_json(), &self.service_config);
        tracing::debug!(service = service.name(), "requesting directive");
        self.in_flight = Some(InFlight {
            pending: service.submit(request),
            submitted_at: ctx.time.now,
        });
        self.last_call_at = Some(ctx.time.now);
        self.status.service_calls += 1;
        self.status.awaiting_response = true;
        None
    }

    fn poll_in_flight(&mut self, ctx: &mut StrategyContext) -> StrategistOutput {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return StrategistOutput::default();
        };

        let outcome = match in_flight.pending.poll() {
            DecisionPoll::Pending => {
                if ctx.time.now - in_flight.submitted_at < self.config.request_timeout {
                    return StrategistOutput::default();
                }
                Err(format!("no response within {:.1}s", self.config.request_timeout))
            }
            DecisionPoll::Ready(Ok(response)) => {
                tracing::debug!(model = %response.model, latency_ms = response.latency_ms, "directive received");
                parse_directive(&response.raw_text).map_err(|e| format!("parse failed: {}", e))
            }
            DecisionPoll::Ready(Err(e)) => Err(e.to_string()),
        };
        self.in_flight = None;
        self.status.awaiting_response = false;

        // The world moved on while we waited
        let snapshot = self.snapshot(ctx);
        let resolved = outcome.and_then(|directive| match validate(&directive, &snapshot) {
            Ok(validated) => Ok((directive, validated)),
            Err(rejection) => Err(format!("validation failed: {}", rejection)),
        });

        match resolved {
            Ok((raw, validated)) => {
                self.cached = Some(raw);
                self.status.last_error = None;
                self.execute(validated, DirectiveSource::Service, ctx)
            }
            Err(reason) => {
                tracing::warn!(%reason, "decision service failed, falling back");
                self.status.service_failures += 1;
                self.status.last_error = Some(reason);
                let (directive, source) = self.fallback(&snapshot);
                self.execute(directive, source, ctx)
            }
        }
    }

    /// cached -> failure heuristic -> offline heuristic -> hold
    fn fallback(&self, snapshot: &BattlefieldSnapshot) -> (ValidatedDirective, DirectiveSource) {
        if let Some(cached) = self.revalidated_cache(snapshot) {
            return (cached, DirectiveSource::Cached);
        }
        if let Some(v) = failure_directive(snapshot, &self.config).and_then(|d| validate(&d, snapshot).ok()) {
            return (v, DirectiveSource::FailureHeuristic);
        }
        if let Ok(v) = validate(&offline_directive(snapshot, &self.config), snapshot) {
            return (v, DirectiveSource::OfflineHeuristic);
        }
        (
            validate_or_hold(&StrategicDirective::hold(""), snapshot),
            DirectiveSource::FallbackHold,
        )
    }

    fn revalidated_cache(&self, snapshot: &BattlefieldSnapshot) -> Option<ValidatedDirective> {
        self.cached.as_ref().and_then(|d| validate(d, snapshot).ok())
    }

    fn execute(&mut self, directive: ValidatedDirective, source: DirectiveSource, ctx: &mut StrategyContext) -> StrategistOutput {
        let mut events = Vec::new();
        let mut statuses = Vec::new();

        match directive.order {
            Order::Reinforce { target, squad_size } | Order::Recapture { target, squad_size } => {
                statuses.push(dispatch(ctx, target, squad_size, &mut events));
            }
            Order::Feint {
                decoy,
                decoy_size,
                real_target,
                real_size,
            } => {
                statuses.push(dispatch(ctx, decoy, decoy_size, &mut events));
                statuses.push(dispatch(ctx, real_target, real_size, &mut events));
            }
            Order::Redistribute { from, to, count } => {
                let moved = ctx.director.reallocate_defenders(from, to, count);
                let status = if moved == count {
                    format!("moved {} defenders from {} to {}", count, from, to)
                } else {
                    format!("moved {} of {} defenders from {} to {}, allocation short", moved, count, from, to)
                };
                statuses.push(status);
            }
            Order::Hold => statuses.push("holding".to_string()),
        }

        tracing::info!(
            source = source.as_str(),
            order = directive.order.kind().as_str(),
            result = %statuses.join("; "),
            "directive executed"
        );

        let transmission = directive.reasoning.clone();
        self.status.last_source = Some(source);
        self.status.last_directive = Some(directive);
        self.status.last_execution = statuses;

        StrategistOutput {
            transmission: Some(transmission),
            events,
        }
    }

    fn snapshot(&self, ctx: &StrategyContext) -> BattlefieldSnapshot {
        BattlefieldSnapshot::capture(
            ctx.time,
            ctx.zones,
            ctx.player,
            &*ctx.director,
            &*ctx.reinforcement,
            ctx.log,
            self.config.recent_event_count,
        )
    }

    fn decision_interval(&mut self) -> f32 {
        let (min, max) = (self.config.decision_interval_min, self.config.decision_interval_max);
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }
}

fn dispatch(ctx: &mut StrategyContext, target: ZoneId, size: u32, events: &mut Vec<ReinforcementEvent>) -> String {
    match ctx
        .reinforcement
        .try_dispatch_strategic_squad(target, size, ctx.time, ctx.zones, &*ctx.director)
    {
        Ok(receipt) => {
            events.push(ReinforcementEvent::StrategicDispatched {
                squad: receipt.squad,
                origin: receipt.origin,
                target: receipt.target,
                size: receipt.size,
            });
            format!("dispatched {} from {} to {}", receipt.size, receipt.origin, receipt.target)
        }
        Err(e) => e.to_string(),
    }
}
