//! Strategic directives
//!
//! `StrategicDirective` is what came out of parsing (or a heuristic): loose
//! string tokens that may reference zones that do not exist.
//! `ValidatedDirective` is the only thing execution accepts; its zones are
//! real `ZoneId`s and its counts are positive.

use serde::{Deserialize, Serialize};

use crate::zone::{normalize_zone_token, ZoneId};

/// Order kind named by a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveOrder {
    Reinforce,
    Recapture,
    Redistribute,
    Hold,
    Feint,
    Invalid,
}

impl DirectiveOrder {
    pub fn parse(token: &str) -> Self {
        match token.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase().as_str() {
            "reinforce" => DirectiveOrder::Reinforce,
            "recapture" => DirectiveOrder::Recapture,
            "redistribute" => DirectiveOrder::Redistribute,
            "hold" => DirectiveOrder::Hold,
            "feint" => DirectiveOrder::Feint,
            _ => DirectiveOrder::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveOrder::Reinforce => "reinforce",
            DirectiveOrder::Recapture => "recapture",
            DirectiveOrder::Redistribute => "redistribute",
            DirectiveOrder::Hold => "hold",
            DirectiveOrder::Feint => "feint",
            DirectiveOrder::Invalid => "invalid",
        }
    }
}

/// An unvalidated directive. Tokens are lowercase with any `zone_` prefix
/// removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategicDirective {
    pub order: String,
    pub target_zone: Option<String>,
    pub from_zone: Option<String>,
    pub to_zone: Option<String>,
    pub decoy_zone: Option<String>,
    pub real_target_zone: Option<String>,
    pub squad_size: Option<i64>,
    pub count: Option<i64>,
    pub decoy_size: Option<i64>,
    pub real_size: Option<i64>,
    pub reasoning: String,
}

impl StrategicDirective {
    pub fn new(order: DirectiveOrder, reasoning: impl Into<String>) -> Self {
        Self {
            order: order.as_str().to_string(),
            reasoning: reasoning.into(),
            ..Self::default()
        }
    }

    pub fn hold(reasoning: impl Into<String>) -> Self {
        Self::new(DirectiveOrder::Hold, reasoning)
    }

    pub fn reinforce(target: ZoneId, squad_size: u32, reasoning: impl Into<String>) -> Self {
        Self {
            target_zone: Some(target.as_str().to_string()),
            squad_size: Some(i64::from(squad_size)),
            ..Self::new(DirectiveOrder::Reinforce, reasoning)
        }
    }

    pub fn recapture(target: ZoneId, squad_size: u32, reasoning: impl Into<String>) -> Self {
        Self {
            target_zone: Some(target.as_str().to_string()),
            squad_size: Some(i64::from(squad_size)),
            ..Self::new(DirectiveOrder::Recapture, reasoning)
        }
    }

    pub fn order_kind(&self) -> DirectiveOrder {
        DirectiveOrder::parse(&self.order)
    }

    /// Lowercase every token and strip zone prefixes
    pub fn normalize(&mut self) {
        self.order = self.order.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase();
        for zone in [
            &mut self.target_zone,
            &mut self.from_zone,
            &mut self.to_zone,
            &mut self.decoy_zone,
            &mut self.real_target_zone,
        ] {
            if let Some(token) = zone.as_mut() {
                *token = normalize_zone_token(token);
            }
        }
    }
}

/// Where an executed directive came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveSource {
    /// Offline mode, never consulted the service
    Offline,
    /// Last successful directive, re-validated
    Cached,
    /// Fresh from the decision service
    Service,
    /// Heuristic reacting to a service failure
    FailureHeuristic,
    /// Generic rule-based heuristic
    OfflineHeuristic,
    /// Nothing else was usable
    FallbackHold,
}

impl DirectiveSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveSource::Offline => "offline",
            DirectiveSource::Cached => "cached",
            DirectiveSource::Service => "service",
            DirectiveSource::FailureHeuristic => "failure_heuristic",
            DirectiveSource::OfflineHeuristic => "offline_heuristic",
            DirectiveSource::FallbackHold => "fallback_hold",
        }
    }
}

/// A directive execution can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum Order {
    Reinforce { target: ZoneId, squad_size: u32 },
    Recapture { target: ZoneId, squad_size: u32 },
    Redistribute { from: ZoneId, to: ZoneId, count: u32 },
    Feint { decoy: ZoneId, decoy_size: u32, real_target: ZoneId, real_size: u32 },
    Hold,
}

impl Order {
    pub fn kind(&self) -> DirectiveOrder {
        match self {
            Order::Reinforce { .. } => DirectiveOrder::Reinforce,
            Order::Recapture { .. } => DirectiveOrder::Recapture,
            Order::Redistribute { .. } => DirectiveOrder::Redistribute,
            Order::Feint { .. } => DirectiveOrder::Feint,
            Order::Hold => DirectiveOrder::Hold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedDirective {
    pub order: Order,
    pub reasoning: String,
    /// Why the original directive was replaced by a hold, if it was
    pub rejection: Option<String>,
}

impl ValidatedDirective {
    pub fn is_hold(&self) -> bool {
        self.order == Order::Hold
    }

    pub fn was_downgraded(&self) -> bool {
        self.rejection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_parse() {
        assert_eq!(DirectiveOrder::parse("Recapture"), DirectiveOrder::Recapture);
        assert_eq!(DirectiveOrder::parse(" \"FEINT\" "), DirectiveOrder::Feint);
        assert_eq!(DirectiveOrder::parse("retreat"), DirectiveOrder::Invalid);
    }

    #[test]
    fn test_normalize_tokens() {
        let mut d = StrategicDirective {
            order: "Reinforce".into(),
            target_zone: Some("Zone_Bravo".into()),
            from_zone: Some("ALPHA".into()),
            ..StrategicDirective::default()
        };
        d.normalize();
        assert_eq!(d.order, "reinforce");
        assert_eq!(d.target_zone.as_deref(), Some("bravo"));
        assert_eq!(d.from_zone.as_deref(), Some("alpha"));
        assert_eq!(d.order_kind(), DirectiveOrder::Reinforce);
    }
}
