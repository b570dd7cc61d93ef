//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for agents
///
/// Ordered so that every "nearest" or "first" selection can break ties on
/// the lowest identifier and stay reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id, used by tests and seeded scenarios
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier shared by every member of one pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackId(pub Uuid);

impl PackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a food item lying in the world or carried by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation tick counter
pub type Tick = u64;

/// Simulated animal species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Cow,
    Sheep,
    Pig,
    Goat,
    Horse,
    Llama,
    Chicken,
    Rabbit,
    Fox,
    Wolf,
    Cod,
    Salmon,
    TropicalFish,
    Dolphin,
    Squid,
}

impl Species {
    pub const ALL: [Species; 15] = [
        Species::Cow,
        Species::Sheep,
        Species::Pig,
        Species::Goat,
        Species::Horse,
        Species::Llama,
        Species::Chicken,
        Species::Rabbit,
        Species::Fox,
        Species::Wolf,
        Species::Cod,
        Species::Salmon,
        Species::TropicalFish,
        Species::Dolphin,
        Species::Squid,
    ];

    /// Key used in configuration tables
    pub fn key(&self) -> &'static str {
        match self {
            Species::Cow => "cow",
            Species::Sheep => "sheep",
            Species::Pig => "pig",
            Species::Goat => "goat",
            Species::Horse => "horse",
            Species::Llama => "llama",
            Species::Chicken => "chicken",
            Species::Rabbit => "rabbit",
            Species::Fox => "fox",
            Species::Wolf => "wolf",
            Species::Cod => "cod",
            Species::Salmon => "salmon",
            Species::TropicalFish => "tropical_fish",
            Species::Dolphin => "dolphin",
            Species::Squid => "squid",
        }
    }

    pub fn is_aquatic(&self) -> bool {
        matches!(
            self,
            Species::Cod | Species::Salmon | Species::TropicalFish | Species::Dolphin | Species::Squid
        )
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .iter()
            .copied()
            .find(|species| species.key() == s)
            .ok_or_else(|| format!("unknown species '{}'", s))
    }
}

/// 2D position on the ground plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `radians` (0 = +x, counter-clockwise)
    pub fn from_angle(radians: f32) -> Self {
        Self { x: radians.cos(), y: radians.sin() }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }

    /// Heading of this vector in radians
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Centroid of a set of points, `None` when empty
    pub fn centroid(points: impl IntoIterator<Item = Vec2>) -> Option<Vec2> {
        let mut sum = Vec2::ZERO;
        let mut count = 0usize;
        for p in points {
            sum = sum + p;
            count += 1;
        }
        (count > 0).then(|| sum * (1.0 / count as f32))
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y }
    }
}
