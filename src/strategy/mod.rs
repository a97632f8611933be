//! Swarm strategy: directives, their validation, the rule-based fallbacks and
//! the decision loop that ties them to the reinforcement manager

pub mod directive;
pub mod heuristics;
pub mod strategist;
pub mod validator;

pub use directive::{DirectiveOrder, DirectiveSource, Order, StrategicDirective, ValidatedDirective};
pub use heuristics::{failure_directive, offline_directive};
pub use strategist::{StrategistOutput, StrategistStatus, StrategyContext, SwarmStrategist};
pub use validator::{validate, validate_or_hold, Rejection, DEFAULT_HOLD_REASONING};
