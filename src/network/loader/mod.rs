//! Reading networks from CSV and JSON.
//!
//! CSV input comes as two tables, each with a header row:
//! - species: `name,count`
//! - reactions: `name,rate,formula` where `formula` uses the `A + 2 B --> C` notation
//!
//! JSON input is the serde form of [`Network`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;
use serde::Deserialize;

use super::reaction::Reaction;
use super::species::Species;
use super::Network;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct SpeciesRecord {
    name: String,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct ReactionRecord {
    name: String,
    rate: f64,
    formula: String,
}

impl Network {
    /// Builds a network from a species table and a reaction table.
    pub fn from_csv<S: Read, R: Read>(name: &str, species: S, reactions: R) -> Result<Self> {
        let mut network = Network::new(name);

        let mut species_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(species);
        for record in species_reader.deserialize() {
            let record: SpeciesRecord = record?;
            network.add_species(Species::new(record.name, record.count))?;
        }

        let mut reaction_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reactions);
        for record in reaction_reader.deserialize() {
            let record: ReactionRecord = record?;
            network.add_reaction(Reaction::parse(record.name, record.rate, &record.formula)?)?;
        }

        info!(
            "loaded network {} with {} species and {} reactions",
            name,
            network.num_species(),
            network.num_reactions()
        );
        Ok(network)
    }

    /// File path form of [`Network::from_csv`]
    pub fn from_csv_files(name: &str, species: impl AsRef<Path>, reactions: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv(name, File::open(species)?, File::open(reactions)?)
    }

    /// Reads the serde form of a network. Species and reactions go through
    /// [`Network::add_species`] and [`Network::add_reaction`], so duplicates are rejected.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let parsed: Network = serde_json::from_reader(reader)?;
        let mut network = Network::new(parsed.name);
        for species in parsed.species {
            network.add_species(species)?;
        }
        for reaction in parsed.reactions {
            network.add_reaction(reaction)?;
        }
        Ok(network)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
