use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use crate::error::{Result, SimError};
use crate::network::Network;

/// Indexed form of a [`Network`] which the simulation algorithms run on.
/// - species
///     - names in declaration order, a state vector is indexed the same way
/// - reactants
///     - per reaction, the (species, coefficient) pairs mass action reads
/// - changes
///     - per reaction, the non zero net change of each species it touches
/// - dependents
///     - per reaction, the reactions whose propensity may change when it fires
/// - readers
///     - per species, the reactions whose propensity reads its count
#[derive(Clone, Debug)]
pub struct ReactionNetwork {
    name: String,
    species: Arc<Vec<String>>,
    initial: Vec<u64>,
    reaction_names: Vec<String>,
    rates: Vec<f64>,
    reactants: Vec<Vec<(usize, u64)>>,
    changes: Vec<Vec<(usize, i64)>>,
    dependents: Vec<Vec<usize>>,
    readers: Vec<Vec<usize>>,
}

impl ReactionNetwork {
    /// Validates a network and builds its indexed form along with the dependency graphs.
    pub fn compile(network: &Network) -> Result<Self> {
        if network.num_species() == 0 {
            return Err(SimError::EmptyNetwork(network.get_name().to_string()));
        }

        let mut index = HashMap::new();
        let mut species = Vec::with_capacity(network.num_species());
        let mut initial = Vec::with_capacity(network.num_species());
        for (i, s) in network.species().iter().enumerate() {
            if index.insert(s.get_name().0.clone(), i).is_some() {
                return Err(SimError::DuplicateSpecies(s.get_name().0.clone()));
            }
            species.push(s.get_name().0.clone());
            initial.push(s.get_initial().0);
        }

        let num_reactions = network.num_reactions();
        let mut reaction_names: Vec<String> = Vec::with_capacity(num_reactions);
        let mut rates = Vec::with_capacity(num_reactions);
        let mut reactants = Vec::with_capacity(num_reactions);
        let mut changes = Vec::with_capacity(num_reactions);
        let mut seen = HashSet::with_capacity(num_reactions);

        for reaction in network.reactions() {
            let name = reaction.get_name().to_string();
            if !seen.insert(name.clone()) {
                return Err(SimError::DuplicateReaction(name));
            }
            let rate = reaction.get_rate();
            if !rate.is_finite() || rate < 0.0 {
                return Err(SimError::InvalidRate { reaction: name, rate });
            }

            let lookup = |species_name: &str| {
                index.get(species_name).copied().ok_or_else(|| SimError::UnknownSpecies {
                    reaction: name.clone(),
                    species: species_name.to_string(),
                })
            };

            let mut inputs = Vec::new();
            let mut delta: Vec<(usize, i64)> = Vec::new();
            for term in reaction.get_reactants() {
                let s = lookup(&term.get_species_name().0)?;
                inputs.push((s, term.get_coefficient().0));
                delta.push((s, -(term.get_coefficient().0 as i64)));
            }
            for term in reaction.get_products() {
                let s = lookup(&term.get_species_name().0)?;
                match delta.iter_mut().find(|(species, _)| *species == s) {
                    Some((_, change)) => *change += term.get_coefficient().0 as i64,
                    None => delta.push((s, term.get_coefficient().0 as i64)),
                }
            }
            delta.retain(|(_, change)| *change != 0);
            delta.sort_unstable();

            reaction_names.push(name);
            rates.push(rate);
            reactants.push(inputs);
            changes.push(delta);
        }

        let mut readers = vec![Vec::new(); species.len()];
        for (j, inputs) in reactants.iter().enumerate() {
            for &(s, _) in inputs {
                readers[s].push(j);
            }
        }

        let dependents = changes
            .iter()
            .map(|delta| {
                let mut affected: Vec<usize> = delta
                    .iter()
                    .flat_map(|&(s, _)| readers[s].iter().copied())
                    .collect();
                affected.sort_unstable();
                affected.dedup();
                affected
            })
            .collect();

        debug!(
            "compiled network {}: {} species, {} reactions",
            network.get_name(),
            species.len(),
            num_reactions
        );

        Ok(Self {
            name: network.get_name().to_string(),
            species: Arc::new(species),
            initial,
            reaction_names,
            rates,
            reactants,
            changes,
            dependents,
            readers,
        })
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn species_names(&self) -> &Arc<Vec<String>> {
        &self.species
    }

    pub fn reaction_name(&self, j: usize) -> &str {
        &self.reaction_names[j]
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_reactions(&self) -> usize {
        self.rates.len()
    }

    pub fn species_index(&self, name: &str) -> Result<usize> {
        self.species
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| SimError::NoSuchSpecies(name.to_string()))
    }

    pub fn initial_state(&self) -> &[u64] {
        &self.initial
    }

    /// Overrides the initial count of one species without recompiling.
    pub fn set_initial(&mut self, name: &str, count: u64) -> Result<()> {
        let s = self.species_index(name)?;
        self.initial[s] = count;
        Ok(())
    }

    pub fn rate(&self, j: usize) -> f64 {
        self.rates[j]
    }

    pub fn reactants(&self, j: usize) -> &[(usize, u64)] {
        &self.reactants[j]
    }

    pub fn changes(&self, j: usize) -> &[(usize, i64)] {
        &self.changes[j]
    }

    /// Reactions whose propensity must be refreshed after reaction `j` fires.
    pub fn dependents(&self, j: usize) -> &[usize] {
        &self.dependents[j]
    }

    /// Reactions whose propensity reads species `s`.
    pub fn readers(&self, s: usize) -> &[usize] {
        &self.readers[s]
    }

    /// Mass action propensity of reaction `j`, `k * prod_i C(x_i, v_i)`.
    pub fn propensity(&self, j: usize, state: &[u64]) -> f64 {
        self.propensity_with(j, |s| state[s])
    }

    /// Mass action propensity reading counts through `count`, used for propensity bounds.
    pub fn propensity_with(&self, j: usize, count: impl Fn(usize) -> u64) -> f64 {
        let mut a = self.rates[j];
        for &(s, coefficient) in &self.reactants[j] {
            a *= binomial(count(s), coefficient);
            if a == 0.0 {
                break;
            }
        }
        a
    }

    /// Fires reaction `j` `times` times. The state is left untouched if any count would go negative.
    pub fn apply(&self, j: usize, state: &mut [u64], times: u64) -> Result<()> {
        for &(s, change) in &self.changes[j] {
            if change < 0 && state[s] < change.unsigned_abs() * times {
                return Err(SimError::NegativePopulation {
                    reaction: self.reaction_names[j].clone(),
                    species: self.species[s].clone(),
                });
            }
        }
        for &(s, change) in &self.changes[j] {
            if change < 0 {
                state[s] -= change.unsigned_abs() * times;
            } else {
                state[s] += change as u64 * times;
            }
        }
        Ok(())
    }

    /// Net change of every species over a bundle of `(reaction, firings)` pairs.
    pub fn net_change(&self, firings: &[(usize, u64)]) -> Vec<i128> {
        let mut net = vec![0i128; self.species.len()];
        for &(j, times) in firings {
            for &(s, change) in &self.changes[j] {
                net[s] += change as i128 * times as i128;
            }
        }
        net
    }

    /// Fires every `(reaction, firings)` pair at once. Only the summed change has to keep the
    /// counts non negative; the state is left untouched when it does not.
    pub fn apply_leap(&self, firings: &[(usize, u64)], state: &mut [u64]) -> Result<()> {
        let net = self.net_change(firings);
        let mut next = Vec::with_capacity(state.len());
        for (s, (&x, &change)) in state.iter().zip(net.iter()).enumerate() {
            let count = x as i128 + change;
            if count < 0 {
                let reaction = firings
                    .iter()
                    .find(|&&(j, _)| self.changes[j].iter().any(|&(species, c)| species == s && c < 0))
                    .map(|&(j, _)| self.reaction_names[j].clone())
                    .unwrap_or_default();
                return Err(SimError::NegativePopulation {
                    reaction,
                    species: self.species[s].clone(),
                });
            }
            next.push(count as u64);
        }
        state.copy_from_slice(&next);
        Ok(())
    }
}

/// Number of ways to pick `n` molecules out of `x`, as a float.
pub fn binomial(x: u64, n: u64) -> f64 {
    if x < n {
        return 0.0;
    }
    let mut c = 1.0;
    for m in 0..n {
        c *= (x - m) as f64 / (m + 1) as f64;
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::reaction::Reaction;
    use crate::network::species::Species;

    fn dimer_network() -> Network {
        Network::new("dimer")
            .with_species("P", 10)
            .and_then(|n| n.with_species("P2", 0))
            .and_then(|n| n.with_reaction("dimerization", 0.5, "2 P --> P2"))
            .and_then(|n| n.with_reaction("dissociation", 1.0, "P2 --> 2 P"))
            .and_then(|n| n.with_reaction("degradation", 0.1, "P --> 0"))
            .unwrap()
    }

    #[test]
    fn binomial_counts_combinations() {
        assert_eq!(binomial(10, 0), 1.0);
        assert_eq!(binomial(10, 1), 10.0);
        assert_eq!(binomial(10, 2), 45.0);
        assert_eq!(binomial(3, 3), 1.0);
        assert_eq!(binomial(2, 3), 0.0);
    }

    #[test]
    fn mass_action_propensities() {
        let network = ReactionNetwork::compile(&dimer_network()).unwrap();
        let state = network.initial_state().to_vec();
        assert_eq!(network.propensity(0, &state), 0.5 * 45.0);
        assert_eq!(network.propensity(1, &state), 0.0);
        assert_eq!(network.propensity(2, &state), 1.0);
    }

    #[test]
    fn dependency_graph() {
        let network = ReactionNetwork::compile(&dimer_network()).unwrap();
        // every reaction changes P, which all of them but dissociation read
        assert_eq!(network.dependents(0), &[0, 1, 2]);
        assert_eq!(network.dependents(1), &[0, 1, 2]);
        assert_eq!(network.dependents(2), &[0, 2]);
        assert_eq!(network.readers(0), &[0, 2]);
        assert_eq!(network.readers(1), &[1]);
    }

    #[test]
    fn catalysts_have_no_net_change() {
        let network = Network::new("catalysis")
            .with_species("gene", 1)
            .and_then(|n| n.with_species("mRNA", 0))
            .and_then(|n| n.with_reaction("transcription", 1.0, "gene --> gene + mRNA"))
            .unwrap();
        let network = ReactionNetwork::compile(&network).unwrap();
        assert_eq!(network.changes(0), &[(1, 1)]);
        assert!(network.dependents(0).is_empty());
    }

    #[test]
    fn apply_refuses_negative_counts() {
        let network = ReactionNetwork::compile(&dimer_network()).unwrap();
        let mut state = vec![3, 0];
        network.apply(0, &mut state, 1).unwrap();
        assert_eq!(state, vec![1, 1]);
        assert!(matches!(
            network.apply(0, &mut state, 1),
            Err(SimError::NegativePopulation { .. })
        ));
        assert_eq!(state, vec![1, 1]);
        network.apply(1, &mut state, 1).unwrap();
        assert_eq!(state, vec![3, 0]);
    }

    #[test]
    fn leaps_only_check_the_summed_change() {
        let network = Network::new("isomerization")
            .with_species("A", 10)
            .and_then(|n| n.with_species("B", 10))
            .and_then(|n| n.with_reaction("forward", 1.0, "A --> B"))
            .and_then(|n| n.with_reaction("backward", 1.0, "B --> A"))
            .unwrap();
        let network = ReactionNetwork::compile(&network).unwrap();

        // forward alone would take A to -5, backward makes up for it
        let mut state = network.initial_state().to_vec();
        network.apply_leap(&[(0, 15), (1, 12)], &mut state).unwrap();
        assert_eq!(state, vec![7, 13]);
        assert_eq!(network.net_change(&[(0, 15), (1, 12)]), vec![-3, 3]);

        assert!(matches!(
            network.apply_leap(&[(0, 30), (1, 12)], &mut state),
            Err(SimError::NegativePopulation { reaction, species }) if reaction == "forward" && species == "A"
        ));
        assert_eq!(state, vec![7, 13]);
    }

    #[test]
    fn compile_validates() {
        let empty = Network::new("empty");
        assert!(matches!(ReactionNetwork::compile(&empty), Err(SimError::EmptyNetwork(_))));

        let mut unknown = Network::new("unknown").with_species("X", 1).unwrap();
        unknown.add_reaction(Reaction::parse("conversion", 1.0, "X --> Y").unwrap()).unwrap();
        assert!(matches!(
            ReactionNetwork::compile(&unknown),
            Err(SimError::UnknownSpecies { species, .. }) if species == "Y"
        ));

        let mut negative = Network::new("negative").with_species("X", 1).unwrap();
        negative.add_reaction(Reaction::parse("decay", -1.0, "X --> 0").unwrap()).unwrap();
        assert!(matches!(ReactionNetwork::compile(&negative), Err(SimError::InvalidRate { .. })));

        let mut no_reactions = Network::new("still");
        no_reactions.add_species(Species::new("X", 1)).unwrap();
        assert_eq!(ReactionNetwork::compile(&no_reactions).unwrap().num_reactions(), 0);
    }

    #[test]
    fn initial_counts_can_be_overridden() {
        let mut network = ReactionNetwork::compile(&dimer_network()).unwrap();
        network.set_initial("P2", 4).unwrap();
        assert_eq!(network.initial_state(), &[10, 4]);
        assert!(network.set_initial("Q", 1).is_err());
    }
}
