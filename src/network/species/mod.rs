use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Tuple struct wrapper around the name of a species
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(pub String);

/// Tuple struct wrapper around a copy count or a stoichiometric coefficient
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Count(pub u64);

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Name(name.to_string())
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named population with an integer initial copy count.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    name: Name,
    initial: Count,
}

impl Species {
    pub fn new(name: impl Into<String>, initial: u64) -> Self {
        Self {
            name: Name(name.into()),
            initial: Count(initial),
        }
    }

    /// Returns a Name tuple struct reference
    pub fn get_name(&self) -> &Name {
        &self.name
    }

    /// Returns the copy count the species starts every trial with
    pub fn get_initial(&self) -> Count {
        self.initial
    }

    /// Overrides the initial copy count
    pub fn set_initial(&mut self, initial: u64) {
        self.initial = Count(initial);
    }
}

impl Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.initial.0)
    }
}
