use thiserror::Error;

use crate::core::types::{EntityId, ItemId};
use crate::entity::pack::PackRank;
use crate::simulation::goal::GoalKind;

/// Everything that can go wrong inside the behavior core.
///
/// All of these are recovered within the tick that produced them; none is
/// fatal to the host.
#[derive(Error, Debug)]
pub enum BehaviorError {
    /// Routine scheduling outcome rather than a fault
    #[error("Precondition unmet for goal {0:?}")]
    PreconditionUnmet(GoalKind),

    #[error("Target lost: {0:?}")]
    TargetLost(EntityId),

    #[error("Navigation unreachable for {agent:?} while running {goal:?}")]
    NavigationUnreachable { agent: EntityId, goal: GoalKind },

    #[error("Invalid rank transition for {agent:?} at {rank}: {reason}")]
    InvalidRankTransition {
        agent: EntityId,
        rank: PackRank,
        reason: String,
    },

    #[error("Inconsistent needs state on {0:?}")]
    InconsistentNeedsState(EntityId),

    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("Entity {0:?} does not belong to a pack")]
    NotPackMember(EntityId),

    #[error("Carry slot of {agent:?} already holds {held:?}")]
    CarrySlotOccupied { agent: EntityId, held: ItemId },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BehaviorError>;
