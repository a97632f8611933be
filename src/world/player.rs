//! Player state as seen by the simulation

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;

/// How the player last attacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStyle {
    #[default]
    None,
    Melee,
    Ranged,
    Ability,
}

impl AttackStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackStyle::None => "none",
            AttackStyle::Melee => "melee",
            AttackStyle::Ranged => "ranged",
            AttackStyle::Ability => "ability",
        }
    }
}

/// Health provider and position of the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub last_attack_style: AttackStyle,
}

impl PlayerState {
    pub fn new(position: Vec2, max_health: f32) -> Self {
        Self {
            position,
            health: max_health,
            max_health,
            last_attack_style: AttackStyle::None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn health_percent(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health * 100.0).clamp(0.0, 100.0)
    }

    /// Position if alive; dead players are invisible to zones and drones
    pub fn alive_position(&self) -> Option<Vec2> {
        (!self.is_dead()).then_some(self.position)
    }

    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount.max(0.0)).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_percent_and_death() {
        let mut player = PlayerState::new(Vec2::ZERO, 200.0);
        assert_eq!(player.health_percent(), 100.0);
        player.apply_damage(150.0);
        assert_eq!(player.health_percent(), 25.0);
        assert!(player.alive_position().is_some());
        player.apply_damage(80.0);
        assert!(player.is_dead());
        assert_eq!(player.health, 0.0);
        assert!(player.alive_position().is_none());
    }
}
