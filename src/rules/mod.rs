pub mod loader;
pub mod thresholds;

pub use loader::{load_ecology_table, parse_ecology_table, EcologyTable};
pub use thresholds::{policy, set_policy, PartialThresholds, ThresholdPolicy, ThresholdSet};
