//! Zone Control - headless strategic layer of a zone capture game mode
//!
//! Three capturable zones, a drone swarm defending them, a reinforcement
//! scheduler, and a strategist that asks an external decision service (or
//! its own heuristics) where to send the next squad.

pub mod core;
pub mod director;
pub mod drone;
pub mod events;
pub mod llm;
pub mod mode;
pub mod reinforcement;
pub mod strategy;
pub mod world;
pub mod zone;

pub use mode::{MatchSummary, ZoneControlGameMode};
