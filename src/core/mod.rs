pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{BehaviorError, Result};
pub use types::{EntityId, ItemId, PackId, Species, Tick, Vec2};
