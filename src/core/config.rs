//! Match configuration with documented constants
//!
//! Every tuning number of the zone control mode lives here. The defaults
//! produce a playable match; a TOML file can override any subset of them
//! since every section is `#[serde(default)]`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::drone::DroneRole;

/// Capture timing and arena layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Seconds of uncontested presence for the player to take an enemy zone
    pub player_capture_duration: f32,

    /// Seconds for a single defender to take a zone back from the player
    ///
    /// More defenders shorten this, up to 1.35x faster at four or more.
    pub enemy_recapture_duration: f32,

    /// Seconds for progress to drift back to the owner's extreme when
    /// nobody is pushing it
    ///
    /// Decay runs 25% slower in the middle band (0.15..0.85) so a brief
    /// incursion doesn't snap back instantly.
    pub progress_decay_duration: f32,

    /// Radius of each capture area (world units)
    pub capture_radius: f32,

    /// Distance from the arena center to each zone center
    pub arena_radius: f32,

    /// Lateral bend of the lanes connecting zones
    pub lane_bend: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            player_capture_duration: 8.0,
            enemy_recapture_duration: 10.0,
            progress_decay_duration: 6.0,
            capture_radius: 8.0,
            arena_radius: 40.0,
            lane_bend: 6.0,
        }
    }
}

/// Per-role movement and sensing numbers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoleTuning {
    pub move_speed: f32,
    pub detection_range: f32,
    pub engage_range: f32,
}

/// Drone tactical tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    pub base_health: f32,
    pub base_damage: f32,
    pub basic: RoleTuning,
    pub flanker: RoleTuning,
    pub heavy: RoleTuning,
    /// Flat bonus applied to Heavy drones after spawn
    pub heavy_bonus_health: f32,
    pub heavy_bonus_damage: f32,

    /// Maximum distance from the active zone center before a forced return
    pub zone_leash_distance: f32,

    /// Seconds without sight of the player before an engaged drone gives up
    pub disengage_delay: f32,

    /// Detection range multiplier beyond which the player counts as lost
    ///
    /// At 1.25 a drone keeps chasing a little past the range it noticed the
    /// player at, which stops Alert/ReturnToZone from flickering at the edge.
    pub lose_range_factor: f32,

    /// Lateral offset flankers aim for when approaching the player
    pub flank_offset: f32,

    /// Seconds between patrol waypoint picks
    pub patrol_retarget_interval: f32,
    /// Fraction of the capture radius patrol points are drawn from
    pub patrol_radius_factor: f32,

    /// Seconds between path refreshes
    pub path_refresh_interval: f32,
    /// Goal displacement that forces an early path refresh
    pub repath_distance: f32,
    /// Distance at which a path corner counts as reached
    pub corner_reach: f32,
    /// Distance at which a zone center counts as reached
    pub arrive_distance: f32,

    /// Radius inside which neighbouring drones push each other apart
    pub separation_radius: f32,
    /// Blend weight of the separation push against path direction
    pub separation_weight: f32,
    /// Speed of the Engage-state separation nudge
    pub separation_nudge: f32,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            base_health: 100.0,
            base_damage: 10.0,
            basic: RoleTuning {
                move_speed: 4.5,
                detection_range: 14.0,
                engage_range: 9.0,
            },
            flanker: RoleTuning {
                move_speed: 6.0,
                detection_range: 16.0,
                engage_range: 7.0,
            },
            heavy: RoleTuning {
                move_speed: 3.2,
                detection_range: 12.0,
                engage_range: 11.0,
            },
            heavy_bonus_health: 60.0,
            heavy_bonus_damage: 6.0,
            zone_leash_distance: 22.0,
            disengage_delay: 2.5,
            lose_range_factor: 1.25,
            flank_offset: 5.0,
            patrol_retarget_interval: 4.0,
            patrol_radius_factor: 0.8,
            path_refresh_interval: 0.75,
            repath_distance: 1.5,
            corner_reach: 0.6,
            arrive_distance: 1.5,
            separation_radius: 2.5,
            separation_weight: 0.8,
            separation_nudge: 1.5,
        }
    }
}

impl DroneConfig {
    pub fn tuning(&self, role: DroneRole) -> RoleTuning {
        match role {
            DroneRole::Basic => self.basic,
            DroneRole::Flanker => self.flanker,
            DroneRole::Heavy => self.heavy,
        }
    }
}

/// Initial garrison and population limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Drones spawned in each zone at match start
    pub defenders_per_zone: u32,
    /// Role assigned to the n-th drone of a garrison or squad, cycling
    pub role_rotation: Vec<DroneRole>,
    /// Random scatter around a spawn point
    pub spawn_scatter: f32,
    /// Hard cap on living drones
    pub max_drones: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            defenders_per_zone: 4,
            role_rotation: vec![
                DroneRole::Basic,
                DroneRole::Basic,
                DroneRole::Flanker,
                DroneRole::Heavy,
            ],
            spawn_scatter: 2.0,
            max_drones: 40,
        }
    }
}

/// Reinforcement scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    /// Whether losing a zone schedules an automatic recapture wave
    pub auto_response: bool,
    /// Delay range before an automatic wave spawns (seconds)
    pub reactive_delay_min: f32,
    pub reactive_delay_max: f32,
    pub reactive_squad_size: u32,

    /// Finite pool of strategist-dispatched squads per match
    pub strategic_squads: u32,
    /// Minimum seconds between strategic dispatches in different frames
    pub strategic_cooldown: f32,
    /// ETA range of a strategic squad (seconds)
    pub strategic_eta_min: f32,
    pub strategic_eta_max: f32,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            auto_response: true,
            reactive_delay_min: 4.0,
            reactive_delay_max: 8.0,
            reactive_squad_size: 3,
            strategic_squads: 6,
            strategic_cooldown: 18.0,
            strategic_eta_min: 3.0,
            strategic_eta_max: 6.0,
        }
    }
}

/// Strategist decision loop pacing and heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategistConfig {
    /// Never consult the decision service, use heuristics only
    pub offline_mode: bool,
    /// Randomized interval between decision cycles (seconds)
    pub decision_interval_min: f32,
    pub decision_interval_max: f32,
    /// Minimum simulation seconds between two service calls
    pub min_seconds_between_calls: f32,
    /// Simulation seconds after which a pending service reply is discarded
    pub request_timeout: f32,
    /// A player-held zone older than this is a recapture priority
    pub recapture_after_seconds: f32,
    /// Defender count under which the player's zone gets reinforced
    pub low_defender_threshold: u32,
    /// Player health percentage that counts as critical
    pub critical_health_percent: f32,
    pub heuristic_squad_size: u32,
    pub failure_recapture_squad_size: u32,
    /// Event tokens included in each snapshot
    pub recent_event_count: usize,
}

impl Default for StrategistConfig {
    fn default() -> Self {
        Self {
            offline_mode: false,
            decision_interval_min: 12.0,
            decision_interval_max: 20.0,
            min_seconds_between_calls: 10.0,
            request_timeout: 8.0,
            recapture_after_seconds: 20.0,
            low_defender_threshold: 2,
            critical_health_percent: 25.0,
            heuristic_squad_size: 3,
            failure_recapture_squad_size: 4,
            recent_event_count: 6,
        }
    }
}

/// External decision service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionServiceConfig {
    pub api_url: String,
    pub model: String,
    /// Model used for the retry after a failed call
    pub retry_model: String,
    pub retry_count: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: f32,
    /// Key file consulted when no API key environment variable is set
    pub key_file: Option<PathBuf>,
}

impl Default for DecisionServiceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-5-haiku-latest".into(),
            retry_model: "claude-3-haiku-20240307".into(),
            retry_count: 1,
            max_tokens: 300,
            temperature: 0.7,
            timeout_seconds: 8.0,
            key_file: None,
        }
    }
}

/// Match-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub seed: u64,
    /// Optional time limit; the player loses when it runs out
    pub match_time_limit: Option<f32>,
    pub player_max_health: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            match_time_limit: None,
            player_max_health: 100.0,
        }
    }
}

/// Complete configuration of a zone control match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneControlConfig {
    pub zones: ZoneConfig,
    pub drones: DroneConfig,
    pub director: DirectorConfig,
    pub reinforcement: ReinforcementConfig,
    pub strategist: StrategistConfig,
    pub decision_service: DecisionServiceConfig,
    #[serde(rename = "match")]
    pub match_settings: MatchConfig,
}

impl ZoneControlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        let z = &self.zones;
        if z.player_capture_duration <= 0.0
            || z.enemy_recapture_duration <= 0.0
            || z.progress_decay_duration <= 0.0
        {
            return Err("Capture durations must be positive".into());
        }

        // Zones must not overlap or zone_at() becomes ambiguous
        let spacing = z.arena_radius * 3f32.sqrt();
        if z.capture_radius * 2.0 >= spacing {
            return Err(format!(
                "capture_radius ({}) too large for arena_radius ({}): zones would overlap",
                z.capture_radius, z.arena_radius
            ));
        }

        if self.drones.zone_leash_distance <= z.capture_radius {
            return Err(format!(
                "zone_leash_distance ({}) should exceed capture_radius ({})",
                self.drones.zone_leash_distance, z.capture_radius
            ));
        }

        if self.director.role_rotation.is_empty() {
            return Err("director.role_rotation must name at least one role".into());
        }

        let r = &self.reinforcement;
        if r.reactive_delay_min > r.reactive_delay_max {
            return Err(format!(
                "reactive_delay_min ({}) should be <= reactive_delay_max ({})",
                r.reactive_delay_min, r.reactive_delay_max
            ));
        }
        if r.strategic_eta_min > r.strategic_eta_max {
            return Err(format!(
                "strategic_eta_min ({}) should be <= strategic_eta_max ({})",
                r.strategic_eta_min, r.strategic_eta_max
            ));
        }

        let s = &self.strategist;
        if s.decision_interval_min <= 0.0 || s.decision_interval_min > s.decision_interval_max {
            return Err(format!(
                "decision interval [{}, {}] is not a valid positive range",
                s.decision_interval_min, s.decision_interval_max
            ));
        }

        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ZoneControlConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: ZoneControlConfig = toml::from_str(&contents)?;
    Ok(config)
}
