//! User facing description of a reaction network.
//!
//! A [`Network`] is a named list of [`Species`] with initial copy counts and a list of
//! [`Reaction`] channels. It is only a description: [`crate::ReactionNetwork::compile`]
//! validates it and turns it into the indexed form the simulation algorithms run on.
//!
//! ```
//! use crn_ssa::network::{Network, Species, reaction::Reaction};
//!
//! let mut network = Network::new("birth-death");
//! network.add_species(Species::new("X", 5)).unwrap();
//! network.add_reaction(Reaction::parse("birth", 2.0, "X --> 2 X").unwrap()).unwrap();
//! network.add_reaction(Reaction::parse("death", 1.0, "X --> 0").unwrap()).unwrap();
//! assert_eq!(network.num_reactions(), 2);
//! ```

pub mod formula;
pub mod loader;
pub mod reaction;
pub mod species;

use std::fmt::Display;

use log::debug;
pub use reaction::Reaction;
use serde::{Deserialize, Serialize};
pub use species::Species;

use crate::error::{Result, SimError};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Network {
    name: String,
    #[serde(default)]
    species: Vec<Species>,
    #[serde(default)]
    reactions: Vec<Reaction>,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            species: Vec::new(),
            reactions: Vec::new(),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Adds a species; names must be unique within the network.
    pub fn add_species(&mut self, species: Species) -> Result<()> {
        if self.get_species(&species.get_name().0).is_some() {
            return Err(SimError::DuplicateSpecies(species.get_name().0.clone()));
        }
        debug!("network {}: adding species {}", self.name, species);
        self.species.push(species);
        Ok(())
    }

    /// Adds a reaction; names must be unique within the network. Species referenced by the
    /// reaction are checked when the network is compiled, so reactions may be added first.
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<()> {
        if self.get_reaction(reaction.get_name()).is_some() {
            return Err(SimError::DuplicateReaction(reaction.get_name().to_string()));
        }
        debug!("network {}: adding reaction {}", self.name, reaction);
        self.reactions.push(reaction);
        Ok(())
    }

    /// Chaining form of [`Network::add_species`]
    pub fn with_species(mut self, name: &str, initial: u64) -> Result<Self> {
        self.add_species(Species::new(name, initial))?;
        Ok(self)
    }

    /// Chaining form of [`Network::add_reaction`] taking a formula
    pub fn with_reaction(mut self, name: &str, rate: f64, formula: &str) -> Result<Self> {
        self.add_reaction(Reaction::parse(name, rate, formula)?)?;
        Ok(self)
    }

    pub fn get_species(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|species| species.get_name().0 == name)
    }

    pub fn get_species_mut(&mut self, name: &str) -> Option<&mut Species> {
        self.species.iter_mut().find(|species| species.get_name().0 == name)
    }

    pub fn get_reaction(&self, name: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|reaction| reaction.get_name() == name)
    }

    pub fn get_reaction_mut(&mut self, name: &str) -> Option<&mut Reaction> {
        self.reactions.iter_mut().find(|reaction| reaction.get_name() == name)
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[ network {} ]", self.name)?;
        writeln!(f, "species ({}):", self.species.len())?;
        for species in &self.species {
            writeln!(f, "  {}", species)?;
        }
        writeln!(f, "reactions ({}):", self.reactions.len())?;
        for reaction in &self.reactions {
            writeln!(f, "  {}", reaction)?;
        }
        Ok(())
    }
}
