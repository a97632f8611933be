pub mod config;
pub mod error;
pub mod schedule;
pub mod types;

pub use config::{load_config, ZoneControlConfig};
pub use error::{Result, ZoneError};
pub use schedule::{Scheduler, TaskHandle};
pub use types::{DroneId, SimTime, SquadId};
