//! Zone Control - headless match runner
//!
//! Plays one match with a scripted player bot against the drone swarm and
//! prints a summary. The strategist uses the configured decision service when
//! an API key is available and falls back to its heuristics otherwise.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::runtime::Runtime;

use zone_control::core::config::{load_config, ZoneControlConfig};
use zone_control::core::error::Result;
use zone_control::core::types::Vec2;
use zone_control::events::GameEvent;
use zone_control::llm::{DecisionService, LlmClient, LlmDecisionService};
use zone_control::world::AttackStyle;
use zone_control::zone::{ZoneId, ZoneOwnership};
use zone_control::{MatchSummary, ZoneControlGameMode};

/// Player bot tuning
const BOT_SPEED: f32 = 7.0;
const BOT_WEAPON_RANGE: f32 = 12.0;
const BOT_DAMAGE_PER_SECOND: f32 = 45.0;
/// Fraction of a drone's damage stat it lands per second while engaged
const DRONE_HIT_RATE: f32 = 0.35;

/// Headless Zone Control runner
#[derive(Parser, Debug)]
#[command(name = "zone-control")]
#[command(about = "Run a zone control match against the drone swarm and print a summary")]
struct Args {
    /// TOML configuration file (any section may be omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many simulated seconds
    #[arg(long, default_value_t = 300.0)]
    max_seconds: f32,

    /// Simulation ticks per simulated second
    #[arg(long, default_value_t = 20)]
    tick_rate: u32,

    /// Never contact the decision service
    #[arg(long)]
    offline: bool,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("zone_control=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ZoneControlConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.match_settings.seed = seed;
    }
    if args.offline {
        config.strategist.offline_mode = true;
    }

    // Decision requests run on this runtime while the match ticks on the main thread
    let rt = Runtime::new()?;
    let service = if config.strategist.offline_mode {
        None
    } else {
        match LlmClient::from_config(&config.decision_service) {
            Ok(client) => {
                let timeout = Duration::from_secs_f32(config.decision_service.timeout_seconds.max(0.1));
                Some(Box::new(LlmDecisionService::new(client, rt.handle().clone(), timeout)) as Box<dyn DecisionService>)
            }
            Err(e) => {
                tracing::warn!(error = %e, "decision service unavailable");
                None
            }
        }
    };

    let mut mode = ZoneControlGameMode::new(config, service);
    // A live service answers in wall-clock time, so keep the clock honest
    let paced = !mode.strategist().is_offline();

    let dt = 1.0 / args.tick_rate.max(1) as f32;
    let started = Instant::now();
    while !mode.outcome().is_over() && mode.time().now < args.max_seconds {
        drive_player(&mut mode, dt);
        for event in mode.tick(dt) {
            if let GameEvent::Transmission { text } = &event {
                tracing::info!(at = mode.time().now, "intercepted: {}", text);
            }
        }
        if paced {
            let target = Duration::from_secs_f32(mode.time().now);
            if let Some(ahead) = target.checked_sub(started.elapsed()) {
                std::thread::sleep(ahead);
            }
        }
    }

    let summary = mode.summary();
    match args.format.as_str() {
        "text" => print_text(&summary),
        _ => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

/// Scripted player: walk to the first zone not yet held, shoot the nearest
/// drone in range, and take fire from every engaged drone
fn drive_player(mode: &mut ZoneControlGameMode, dt: f32) {
    if mode.player().is_dead() {
        return;
    }

    let objective = ZoneId::ALL
        .into_iter()
        .find(|&z| mode.zone(z).ownership() == ZoneOwnership::Enemy)
        .map(|z| mode.routes().center(z));

    let position = mode.player().position;
    let nearest = mode
        .director()
        .drones()
        .map(|d| (d.id, d.position.distance(position)))
        .filter(|(_, dist)| *dist <= BOT_WEAPON_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id);

    let incoming: f32 = mode
        .director()
        .engaged_drones()
        .map(|d| d.stats.damage * DRONE_HIT_RATE * dt)
        .sum();

    if let Some(target) = nearest {
        mode.damage_drone(target, BOT_DAMAGE_PER_SECOND * dt);
    }

    let player = mode.player_mut();
    if nearest.is_some() {
        player.last_attack_style = AttackStyle::Ranged;
    }
    player.apply_damage(incoming);
    if let Some(goal) = objective {
        player.position = step_toward(player.position, goal, BOT_SPEED * dt);
    }
}

fn step_toward(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    if delta.length() <= max_step {
        to
    } else {
        from + delta.normalize_or_zero() * max_step
    }
}

fn print_text(summary: &MatchSummary) {
    println!("=== ZONE CONTROL ===");
    println!(
        "Outcome: {} after {:.1}s ({} frames)",
        summary.outcome.as_str(),
        summary.elapsed_seconds,
        summary.frames
    );
    println!("Player health: {:.0}%", summary.player_health_percent);
    for zone in &summary.zones {
        println!(
            "  {:<8} {:<7} progress {:.2}  defenders {}",
            zone.id.as_str(),
            zone.owner.as_str(),
            zone.progress,
            zone.defenders
        );
    }
    println!("Drones alive: {}  squads left: {}", summary.drones_alive, summary.squads_remaining);
    let status = &summary.strategist;
    println!(
        "Strategist: {} cycles, {} service calls, {} failures{}",
        status.cycles,
        status.service_calls,
        status.service_failures,
        if status.offline { " (offline)" } else { "" }
    );
    if !summary.recent_events.is_empty() {
        println!("Recent: {}", summary.recent_events.join(", "));
    }
}
