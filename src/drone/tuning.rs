//! Role-derived combat stats

use serde::{Deserialize, Serialize};

use crate::core::config::DroneConfig;
use crate::drone::DroneRole;

/// Health and damage of a spawned drone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneStats {
    pub max_health: f32,
    pub damage: f32,
}

impl DroneStats {
    /// Stats every drone starts with, before role bonuses
    pub fn base(config: &DroneConfig) -> Self {
        Self {
            max_health: config.base_health,
            damage: config.base_damage,
        }
    }
}

/// Apply the flat role bonus once the drone exists (only Heavy gets one)
pub fn apply_post_spawn_bonus(stats: DroneStats, role: DroneRole, config: &DroneConfig) -> DroneStats {
    match role {
        DroneRole::Heavy => DroneStats {
            max_health: stats.max_health + config.heavy_bonus_health,
            damage: stats.damage + config.heavy_bonus_damage,
        },
        DroneRole::Basic | DroneRole::Flanker => stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_heavy_gets_bonus() {
        let config = DroneConfig::default();
        let base = DroneStats::base(&config);
        assert_eq!(apply_post_spawn_bonus(base, DroneRole::Basic, &config), base);
        assert_eq!(apply_post_spawn_bonus(base, DroneRole::Flanker, &config), base);

        let heavy = apply_post_spawn_bonus(base, DroneRole::Heavy, &config);
        assert_eq!(heavy.max_health, 160.0);
        assert_eq!(heavy.damage, 16.0);
    }
}
