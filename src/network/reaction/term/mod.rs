use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::super::species::{Count, Name};

/// Contains the data for a single term on one side of a reaction.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Term {
    species_name: Name,
    coefficient: Count,
}

impl Term {
    pub fn new(species_name: Name, coefficient: Count) -> Self {
        Term {
            species_name,
            coefficient,
        }
    }

    /// Returns a Count tuple struct reference
    pub fn get_coefficient(&self) -> &Count {
        &self.coefficient
    }

    /// Returns a Name tuple struct reference
    pub fn get_species_name(&self) -> &Name {
        &self.species_name
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.coefficient.0 == 1 {
            write!(f, "{}", self.species_name)
        } else {
            write!(f, "{} {}", self.coefficient.0, self.species_name)
        }
    }
}
