//! Decision service integration
//!
//! The service proposes directives; it never moves drones itself. Its reply
//! is parsed defensively and validated before anything acts on it.

pub mod client;
pub mod parser;
pub mod service;
pub mod snapshot;

pub use client::{resolve_api_key, ApiFormat, LlmClient};
pub use parser::{parse_directive, ParseError, STRATEGIST_SYSTEM_PROMPT};
pub use service::{
    DecisionPoll, DecisionRequest, DecisionResponse, DecisionService, LlmDecisionService,
    PendingDecision, ScriptedDecisionService,
};
pub use snapshot::BattlefieldSnapshot;
