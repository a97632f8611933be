//! Directive validation against the current snapshot
//!
//! A rejected directive is never an error for the caller: `validate_or_hold`
//! swaps it for a hold carrying a default reasoning.

use thiserror::Error;

use crate::llm::snapshot::BattlefieldSnapshot;
use crate::strategy::directive::{DirectiveOrder, Order, StrategicDirective, ValidatedDirective};
use crate::zone::ZoneId;

pub const DEFAULT_HOLD_REASONING: &str = "Holding current positions while the swarm regroups.";

/// Cooldown left that still counts as ready
pub const COOLDOWN_SLACK: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("unknown order '{0}'")]
    UnknownOrder(String),
    #[error("{field} does not name a zone ({token:?})")]
    UnknownZone { field: &'static str, token: Option<String> },
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("{0} and {1} must differ")]
    SameZone(&'static str, &'static str),
    #[error("{zone} has {available} defenders, {requested} requested")]
    InsufficientDefenders { zone: ZoneId, available: u32, requested: u32 },
    #[error("{required} squads required, {available} available")]
    NoSquads { required: u32, available: u32 },
    #[error("cooldown active ({0:.1}s)")]
    CooldownActive(f32),
    #[error("{requested} drones requested, {alive} alive")]
    NotEnoughDrones { requested: u32, alive: u32 },
}

/// Check a directive against the snapshot
pub fn validate(directive: &StrategicDirective, snapshot: &BattlefieldSnapshot) -> Result<ValidatedDirective, Rejection> {
    let order = match directive.order_kind() {
        DirectiveOrder::Reinforce | DirectiveOrder::Recapture => {
            let target = zone_field("target_zone", &directive.target_zone)?;
            let squad_size = positive("squad_size", directive.squad_size)?;
            check_capacity(snapshot, 1, squad_size)?;
            if directive.order_kind() == DirectiveOrder::Reinforce {
                Order::Reinforce { target, squad_size }
            } else {
                Order::Recapture { target, squad_size }
            }
        }
        DirectiveOrder::Redistribute => {
            let from = zone_field("from_zone", &directive.from_zone)?;
            let to = zone_field("to_zone", &directive.to_zone)?;
            if from == to {
                return Err(Rejection::SameZone("from_zone", "to_zone"));
            }
            let count = positive("count", directive.count)?;
            let available = snapshot.zone(from).map_or(0, |z| z.defenders_count);
            if available < count {
                return Err(Rejection::InsufficientDefenders {
                    zone: from,
                    available,
                    requested: count,
                });
            }
            Order::Redistribute { from, to, count }
        }
        DirectiveOrder::Feint => {
            let decoy = zone_field("decoy_zone", &directive.decoy_zone)?;
            let real_target = zone_field("real_target_zone", &directive.real_target_zone)?;
            if decoy == real_target {
                return Err(Rejection::SameZone("decoy_zone", "real_target_zone"));
            }
            let decoy_size = positive("decoy_size", directive.decoy_size)?;
            let real_size = positive("real_size", directive.real_size)?;
            check_capacity(snapshot, 2, decoy_size.saturating_add(real_size))?;
            Order::Feint {
                decoy,
                decoy_size,
                real_target,
                real_size,
            }
        }
        DirectiveOrder::Hold => Order::Hold,
        DirectiveOrder::Invalid => return Err(Rejection::UnknownOrder(directive.order.clone())),
    };

    let reasoning = if directive.reasoning.trim().is_empty() {
        DEFAULT_HOLD_REASONING.to_string()
    } else {
        directive.reasoning.trim().to_string()
    };
    Ok(ValidatedDirective {
        order,
        reasoning,
        rejection: None,
    })
}

/// Validate, downgrading any rejection to a hold
pub fn validate_or_hold(directive: &StrategicDirective, snapshot: &BattlefieldSnapshot) -> ValidatedDirective {
    validate(directive, snapshot).unwrap_or_else(|rejection| {
        tracing::info!(order = %directive.order, %rejection, "directive rejected, holding");
        ValidatedDirective {
            order: Order::Hold,
            reasoning: DEFAULT_HOLD_REASONING.to_string(),
            rejection: Some(rejection.to_string()),
        }
    })
}

fn zone_field(field: &'static str, token: &Option<String>) -> Result<ZoneId, Rejection> {
    token
        .as_deref()
        .and_then(ZoneId::parse)
        .ok_or_else(|| Rejection::UnknownZone {
            field,
            token: token.clone(),
        })
}

fn positive(field: &'static str, value: Option<i64>) -> Result<u32, Rejection> {
    match value {
        Some(v) if v > 0 => Ok(u32::try_from(v).unwrap_or(u32::MAX)),
        _ => Err(Rejection::NonPositive { field }),
    }
}

fn check_capacity(snapshot: &BattlefieldSnapshot, squads: u32, drones: u32) -> Result<(), Rejection> {
    let resources = &snapshot.ai_resources;
    if resources.reinforcement_squads_available < squads {
        return Err(Rejection::NoSquads {
            required: squads,
            available: resources.reinforcement_squads_available,
        });
    }
    if resources.reinforcement_cooldown_seconds > COOLDOWN_SLACK {
        return Err(Rejection::CooldownActive(resources.reinforcement_cooldown_seconds));
    }
    if drones > resources.total_drones_alive {
        return Err(Rejection::NotEnoughDrones {
            requested: drones,
            alive: resources.total_drones_alive,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::snapshot::{AiResources, PlayerSnapshot, ZoneSnapshot};
    use crate::world::AttackStyle;
    use crate::zone::ZoneOwnership;

    fn snapshot(squads: u32, cooldown: f32, alive: u32) -> BattlefieldSnapshot {
        BattlefieldSnapshot {
            zones: ZoneId::ALL
                .iter()
                .map(|&id| ZoneSnapshot {
                    id,
                    owner: ZoneOwnership::Enemy,
                    defenders_count: 3,
                    capture_progress: 0.0,
                    seconds_since_captured: None,
                })
                .collect(),
            player: PlayerSnapshot {
                current_zone: None,
                health_percent: 100.0,
                last_attack_style: AttackStyle::None,
                zones_captured_count: 0,
            },
            ai_resources: AiResources {
                total_drones_alive: alive,
                reinforcement_squads_available: squads,
                reinforcement_cooldown_seconds: cooldown,
            },
            match_time_seconds: 30.0,
            recent_events: vec![],
        }
    }

    fn directive(order: &str) -> StrategicDirective {
        StrategicDirective {
            order: order.into(),
            reasoning: "because".into(),
            ..StrategicDirective::default()
        }
    }

    #[test]
    fn test_valid_recapture() {
        let d = StrategicDirective::recapture(ZoneId::Alpha, 4, "take it back");
        let v = validate(&d, &snapshot(2, 0.0, 9)).unwrap();
        assert_eq!(v.order, Order::Recapture { target: ZoneId::Alpha, squad_size: 4 });
        assert_eq!(v.reasoning, "take it back");
    }

    #[test]
    fn test_unknown_zone_downgrades_to_hold() {
        let d = StrategicDirective {
            target_zone: Some("delta".into()),
            squad_size: Some(2),
            ..directive("reinforce")
        };
        let v = validate_or_hold(&d, &snapshot(2, 0.0, 9));
        assert!(v.is_hold());
        assert!(!v.reasoning.is_empty());
        assert!(v.was_downgraded());
    }

    #[test]
    fn test_non_positive_counts_rejected() {
        let d = StrategicDirective {
            target_zone: Some("alpha".into()),
            squad_size: Some(0),
            ..directive("recapture")
        };
        assert_eq!(
            validate(&d, &snapshot(2, 0.0, 9)),
            Err(Rejection::NonPositive { field: "squad_size" })
        );
        let missing = StrategicDirective {
            target_zone: Some("alpha".into()),
            ..directive("recapture")
        };
        assert!(validate(&missing, &snapshot(2, 0.0, 9)).is_err());
    }

    #[test]
    fn test_capacity_checks() {
        let d = StrategicDirective::reinforce(ZoneId::Bravo, 3, "x");
        assert!(matches!(validate(&d, &snapshot(0, 0.0, 9)), Err(Rejection::NoSquads { .. })));
        assert!(matches!(validate(&d, &snapshot(2, 3.0, 9)), Err(Rejection::CooldownActive(_))));
        assert!(validate(&d, &snapshot(2, 0.04, 9)).is_ok());
        assert!(matches!(validate(&d, &snapshot(2, 0.0, 2)), Err(Rejection::NotEnoughDrones { .. })));
    }

    #[test]
    fn test_redistribute_rules() {
        let ok = StrategicDirective {
            from_zone: Some("alpha".into()),
            to_zone: Some("charlie".into()),
            count: Some(3),
            ..directive("redistribute")
        };
        assert!(validate(&ok, &snapshot(0, 10.0, 9)).is_ok());

        let too_many = StrategicDirective { count: Some(4), ..ok.clone() };
        assert!(matches!(
            validate(&too_many, &snapshot(0, 0.0, 9)),
            Err(Rejection::InsufficientDefenders { available: 3, requested: 4, .. })
        ));

        let same = StrategicDirective {
            to_zone: Some("alpha".into()),
            ..ok
        };
        assert!(matches!(validate(&same, &snapshot(0, 0.0, 9)), Err(Rejection::SameZone(..))));
    }

    #[test]
    fn test_feint_needs_two_squads() {
        let d = StrategicDirective {
            decoy_zone: Some("alpha".into()),
            decoy_size: Some(2),
            real_target_zone: Some("bravo".into()),
            real_size: Some(4),
            ..directive("feint")
        };
        assert!(matches!(
            validate(&d, &snapshot(1, 0.0, 9)),
            Err(Rejection::NoSquads { required: 2, available: 1 })
        ));
        assert!(validate(&d, &snapshot(2, 0.0, 9)).is_ok());
        assert!(matches!(
            validate(&d, &snapshot(2, 0.0, 5)),
            Err(Rejection::NotEnoughDrones { requested: 6, .. })
        ));
    }

    #[test]
    fn test_oversized_feint_sizes_rejected() {
        let d = crate::llm::parse_directive(
            r#"{"order":"feint","decoy_zone":"alpha","decoy_size":99999999999,"real_target_zone":"bravo","real_size":1,"reasoning":"x"}"#,
        )
        .unwrap();
        assert!(matches!(
            validate(&d, &snapshot(2, 0.0, 9)),
            Err(Rejection::NotEnoughDrones { requested: u32::MAX, alive: 9 })
        ));

        let both_huge = StrategicDirective {
            decoy_size: Some(i64::MAX),
            real_size: Some(i64::from(u32::MAX)),
            ..d
        };
        assert!(validate_or_hold(&both_huge, &snapshot(2, 0.0, 9)).is_hold());
    }

    #[test]
    fn test_hold_always_valid_and_unknown_order_rejected() {
        let v = validate(&StrategicDirective::hold(""), &snapshot(0, 99.0, 0)).unwrap();
        assert!(v.is_hold());
        assert_eq!(v.reasoning, DEFAULT_HOLD_REASONING);
        assert!(matches!(
            validate(&directive("retreat"), &snapshot(2, 0.0, 9)),
            Err(Rejection::UnknownOrder(_))
        ));
    }
}
