//! Declarative species profiles
//!
//! A profile lists everything that differs between species: diet, decay
//! rates, who hunts whom, flocking style and the ordered goal list every
//! agent of the species is built with.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::config::SimulationConfig;
use crate::core::types::Species;
use crate::simulation::flock::FlockSettings;
use crate::simulation::goal::GoalKind;
use crate::simulation::predator::{PredatorTargetSelector, PreyFilter};

/// What a species forages for in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diet {
    Grass,
    Seeds,
    Roots,
    Meat,
    Plankton,
}

/// Need loss per tick before `tick_dt` scaling
const GRAZER_HUNGER_DECAY: f32 = 0.01;
const PREDATOR_HUNGER_DECAY: f32 = 0.012;
const LAND_THIRST_DECAY: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct SpeciesProfile {
    pub species: Species,
    pub diet: Diet,
    pub hunger_decay: f32,
    /// Zero for aquatic species
    pub thirst_decay: f32,
    /// Species this one flees from
    pub predators: Vec<Species>,
    /// Individual hunting, `None` for species that never hunt
    pub hunt: Option<PredatorTargetSelector>,
    /// Large prey a pack Alpha may pick for a coordinated hunt
    pub pack_hunt: Option<PredatorTargetSelector>,
    pub flock: Option<FlockSettings>,
    pub carries_items: bool,
    pub protects_young: bool,
    pub forms_packs: bool,
    /// Goals in registration order
    pub goals: Vec<GoalKind>,
}

impl SpeciesProfile {
    pub fn builtin(species: Species, config: &SimulationConfig) -> Self {
        use GoalKind::*;
        use Species::*;

        let hunting = |prey: &[Species]| {
            Some(PredatorTargetSelector::new(
                config.detection_radius,
                PreyFilter::species(prey.to_vec()),
            ))
        };
        let thirst_decay = if species.is_aquatic() { 0.0 } else { LAND_THIRST_DECAY };

        let mut profile = Self {
            species,
            diet: Diet::Grass,
            hunger_decay: GRAZER_HUNGER_DECAY,
            thirst_decay,
            predators: Vec::new(),
            hunt: None,
            pack_hunt: None,
            flock: None,
            carries_items: false,
            protects_young: false,
            forms_packs: false,
            goals: Vec::new(),
        };

        match species {
            Cow | Sheep | Goat | Horse | Llama | Pig => {
                profile.diet = if species == Pig { Diet::Roots } else { Diet::Grass };
                profile.predators = vec![Wolf];
                profile.flock = Some(FlockSettings::herd(species));
                profile.protects_young = true;
                profile.goals = vec![
                    FleePredator,
                    Retreat,
                    ProtectOffspring,
                    SeekWater,
                    SeekFood,
                    HerdCohesion,
                    Wander,
                ];
            }
            Chicken | Rabbit => {
                profile.diet = if species == Chicken { Diet::Seeds } else { Diet::Grass };
                profile.predators = vec![Fox, Wolf];
                if species == Chicken {
                    profile.flock = Some(FlockSettings::herd(species));
                }
                profile.goals = vec![FleePredator, Retreat, SeekWater, SeekFood, HerdCohesion, Wander];
            }
            Fox => {
                profile.diet = Diet::Meat;
                profile.hunger_decay = PREDATOR_HUNGER_DECAY;
                profile.predators = vec![Wolf];
                profile.hunt = hunting(&[Chicken, Rabbit]);
                profile.carries_items = true;
                profile.goals = vec![
                    FleePredator,
                    Retreat,
                    SeekWater,
                    EatCarried,
                    PickUpFood,
                    Hunt,
                    Wander,
                ];
            }
            Wolf => {
                profile.diet = Diet::Meat;
                profile.hunger_decay = PREDATOR_HUNGER_DECAY;
                profile.hunt = hunting(&[Sheep, Pig, Goat, Chicken, Rabbit, Fox]);
                profile.pack_hunt = hunting(&[Cow, Horse, Llama, Sheep, Pig, Goat]);
                profile.flock = Some(FlockSettings::pack());
                profile.carries_items = true;
                profile.forms_packs = true;
                profile.goals = vec![
                    Retreat,
                    SeekWater,
                    EatCarried,
                    PickUpFood,
                    PackHunt,
                    Hunt,
                    ShareFood,
                    HerdCohesion,
                    Wander,
                ];
            }
            Cod | Salmon | TropicalFish => {
                profile.diet = Diet::Plankton;
                profile.predators = vec![Dolphin];
                profile.flock = Some(FlockSettings::school(species));
                profile.goals = vec![FleePredator, SeekFood, HerdCohesion, Wander];
            }
            Squid => {
                profile.diet = Diet::Plankton;
                profile.predators = vec![Dolphin];
                profile.goals = vec![FleePredator, SeekFood, Wander];
            }
            Dolphin => {
                profile.diet = Diet::Meat;
                profile.hunger_decay = PREDATOR_HUNGER_DECAY;
                profile.hunt = hunting(&[Cod, Salmon]);
                profile.flock = Some(FlockSettings::school(species));
                profile.goals = vec![Retreat, Hunt, HerdCohesion, Wander];
            }
        }

        profile
    }

    pub fn is_predator(&self) -> bool {
        self.hunt.is_some()
    }

    pub fn fears(&self, other: Species) -> bool {
        self.predators.contains(&other)
    }
}

/// Profiles shared by every agent of a species
#[derive(Debug, Clone, Default)]
pub struct ProfileBook {
    profiles: AHashMap<Species, Arc<SpeciesProfile>>,
}

impl ProfileBook {
    pub fn builtin(config: &SimulationConfig) -> Self {
        let profiles = Species::ALL
            .iter()
            .map(|&species| (species, Arc::new(SpeciesProfile::builtin(species, config))))
            .collect();
        Self { profiles }
    }

    /// Replace the profile of one species
    pub fn insert(&mut self, profile: SpeciesProfile) {
        self.profiles.insert(profile.species, Arc::new(profile));
    }

    pub fn get(&self, species: Species) -> Option<&Arc<SpeciesProfile>> {
        self.profiles.get(&species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_species_has_goals() {
        let book = ProfileBook::builtin(&SimulationConfig::default());
        for species in Species::ALL {
            let profile = book.get(species).unwrap();
            assert!(!profile.goals.is_empty(), "{} has no goals", species);
            assert_eq!(profile.goals.last(), Some(&GoalKind::Wander));
        }
    }

    #[test]
    fn test_aquatic_species_do_not_thirst() {
        let config = SimulationConfig::default();
        assert_eq!(SpeciesProfile::builtin(Species::Cod, &config).thirst_decay, 0.0);
        assert!(SpeciesProfile::builtin(Species::Cow, &config).thirst_decay > 0.0);
    }

    #[test]
    fn test_food_web() {
        let config = SimulationConfig::default();
        let fox = SpeciesProfile::builtin(Species::Fox, &config);
        assert!(fox.is_predator());
        assert!(fox.fears(Species::Wolf));
        let sheep = SpeciesProfile::builtin(Species::Sheep, &config);
        assert!(!sheep.is_predator());
        assert!(sheep.fears(Species::Wolf));
        assert!(!sheep.fears(Species::Fox));
    }
}
