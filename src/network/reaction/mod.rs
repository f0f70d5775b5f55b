pub mod term;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use term::Term;

use super::formula;
use super::species::{Count, Name};
use crate::error::{Result, SimError};

/// Represents a single reaction channel: a list of reactants and products plus a
/// mass action rate constant scaling how often the channel fires.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawReaction")]
pub struct Reaction {
    name: String,
    rate: f64,
    reactants: Vec<Term>,
    products: Vec<Term>,
}

impl Reaction {
    /// Terms naming the same species on one side are merged, so `A + A` and `2 A` build the same reaction.
    pub fn new(name: impl Into<String>, rate: f64, reactants: Vec<Term>, products: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            rate,
            reactants: merge_terms(reactants),
            products: merge_terms(products),
        }
    }

    /// Builds a reaction from a formula such as `gene + P2 --> P2_gene` or `0 --> X`.
    pub fn parse(name: impl Into<String>, rate: f64, formula: &str) -> Result<Self> {
        let (reactants, products) = formula::parse(formula)?;
        Ok(Self::new(name, rate, reactants, products))
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the list of reactants for a reaction
    pub fn get_reactants(&self) -> &Vec<Term> {
        &self.reactants
    }

    /// Returns a reference to the list of products for a reaction
    pub fn get_products(&self) -> &Vec<Term> {
        &self.products
    }

    /// Returns the rate constant for a reaction
    pub fn get_rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Sum of reactant coefficients
    pub fn order(&self) -> u64 {
        self.reactants.iter().map(|term| term.get_coefficient().0).sum()
    }

    /// Every species named by either side, reactants first, without repeats.
    pub fn species_names(&self) -> Vec<&Name> {
        let mut names: Vec<&Name> = Vec::new();
        for term in self.reactants.iter().chain(self.products.iter()) {
            if !names.contains(&term.get_species_name()) {
                names.push(term.get_species_name());
            }
        }
        names
    }
}

/// Reaction as written in a serialized network, before its terms are merged.
#[derive(Deserialize)]
struct RawReaction {
    name: String,
    rate: f64,
    #[serde(default)]
    reactants: Vec<Term>,
    #[serde(default)]
    products: Vec<Term>,
}

impl TryFrom<RawReaction> for Reaction {
    type Error = SimError;

    fn try_from(raw: RawReaction) -> Result<Self> {
        if let Some(term) = raw
            .reactants
            .iter()
            .chain(raw.products.iter())
            .find(|term| term.get_coefficient().0 == 0)
        {
            return Err(SimError::ZeroCoefficient {
                reaction: raw.name,
                species: term.get_species_name().0.clone(),
            });
        }
        Ok(Self::new(raw.name, raw.rate, raw.reactants, raw.products))
    }
}

fn merge_terms(terms: Vec<Term>) -> Vec<Term> {
    let mut merged: Vec<Term> = Vec::with_capacity(terms.len());
    for term in terms {
        if term.get_coefficient().0 == 0 {
            continue;
        }
        match merged
            .iter_mut()
            .find(|existing| existing.get_species_name() == term.get_species_name())
        {
            Some(existing) => {
                let coefficient = existing.get_coefficient().0 + term.get_coefficient().0;
                *existing = Term::new(existing.get_species_name().clone(), Count(coefficient));
            }
            None => merged.push(term),
        }
    }
    merged
}

fn write_side(f: &mut std::fmt::Formatter<'_>, terms: &[Term]) -> std::fmt::Result {
    if terms.is_empty() {
        return write!(f, "0");
    }
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            write!(f, " + ")?;
        }
        write!(f, "{}", term)?;
    }
    Ok(())
}

impl Display for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.name)?;
        write_side(f, &self.reactants)?;
        write!(f, " --> ")?;
        write_side(f, &self.products)?;
        write!(f, " (k = {})", self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_terms_are_merged() {
        let reaction = Reaction::new(
            "dimerization",
            1.0,
            vec![Term::new(Name::from("P"), Count(1)), Term::new(Name::from("P"), Count(1))],
            vec![Term::new(Name::from("P2"), Count(1))],
        );
        assert_eq!(reaction.get_reactants(), &vec![Term::new(Name::from("P"), Count(2))]);
        assert_eq!(reaction.order(), 2);
    }

    #[test]
    fn deserialized_terms_are_merged() {
        let json = r#"{"name": "pair", "rate": 1.0,
            "reactants": [{"species_name": "P", "coefficient": 1}, {"species_name": "P", "coefficient": 1}],
            "products": [{"species_name": "P2", "coefficient": 1}]}"#;
        let reaction: Reaction = serde_json::from_str(json).unwrap();
        assert_eq!(reaction, Reaction::parse("pair", 1.0, "2 P --> P2").unwrap());

        let zero = r#"{"name": "nothing", "rate": 1.0, "reactants": [{"species_name": "P", "coefficient": 0}]}"#;
        let error = serde_json::from_str::<Reaction>(zero).unwrap_err();
        assert!(error.to_string().contains("zero coefficient"));
    }

    #[test]
    fn display_matches_formula_notation() {
        let reaction = Reaction::parse("birth", 2.0, "X --> 2 X").unwrap();
        assert_eq!(reaction.to_string(), "birth: X --> 2 X (k = 2)");

        let source = Reaction::parse("immigration", 0.5, "0 --> X").unwrap();
        assert_eq!(source.to_string(), "immigration: 0 --> X (k = 0.5)");
    }

    #[test]
    fn species_names_are_unique() {
        let reaction = Reaction::parse("translation", 10.0, "mRNA --> mRNA + P").unwrap();
        let names: Vec<&str> = reaction.species_names().iter().map(|n| n.0.as_str()).collect();
        assert_eq!(names, vec!["mRNA", "P"]);
    }
}
