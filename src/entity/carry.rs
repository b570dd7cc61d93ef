//! Single-slot food carrying for predators and scavengers

use serde::{Deserialize, Serialize};

use crate::core::error::{BehaviorError, Result};
use crate::core::types::{EntityId, ItemId, Vec2};

/// A food item, either lying in the world or held in a carry slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: ItemId,
    /// Free-form item kind, e.g. "mutton" or "chicken"
    pub kind: String,
    /// Hunger restored when eaten
    pub nutrition: f32,
    pub position: Vec2,
}

impl FoodItem {
    pub fn new(kind: impl Into<String>, nutrition: f32, position: Vec2) -> Self {
        Self {
            id: ItemId::new(),
            kind: kind.into(),
            nutrition,
            position,
        }
    }
}

/// Holds at most one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarrySlot(Option<FoodItem>);

impl CarrySlot {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn held(&self) -> Option<&FoodItem> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Take hold of `item`. An occupied slot rejects the pickup and keeps
    /// whatever it already held.
    pub fn pick_up(&mut self, item: &FoodItem, owner: EntityId) -> Result<()> {
        if let Some(held) = &self.0 {
            return Err(BehaviorError::CarrySlotOccupied {
                agent: owner,
                held: held.id,
            });
        }
        self.0 = Some(item.clone());
        Ok(())
    }

    /// Release the held item for eating or handing over
    pub fn consume(&mut self) -> Option<FoodItem> {
        self.0.take()
    }
}
