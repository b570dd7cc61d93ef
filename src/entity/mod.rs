pub mod agent;
pub mod carry;
pub mod needs;
pub mod pack;
pub mod species;

pub use agent::{Agent, AgentExtension};
pub use carry::{CarrySlot, FoodItem};
pub use needs::{HasNeeds, NeedKind, NeedsState};
pub use pack::{PackMembership, PackRank, PackRoster};
pub use species::{Diet, ProfileBook, SpeciesProfile};
