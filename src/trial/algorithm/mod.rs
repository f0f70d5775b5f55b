//! Stochastic simulation algorithms.
//!
//! Every algorithm implements [`Method`]: it proposes the next [`Event`] from the current
//! state and, once the trial accepts it, commits it and brings its caches up to date.

pub mod direct;
pub mod first_reaction;
pub mod next_reaction;
pub mod optimized_direct;
pub mod rejection;
pub mod sorting_direct;
pub mod tau_leaping;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::reaction_network::ReactionNetwork;

/// Number of incremental total updates between two full resums of the propensity total.
const RESUM_INTERVAL: usize = 1024;

/// Algorithm selector for a simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Gillespie's direct method
    Direct,
    /// Gillespie's first reaction method
    FirstReaction,
    /// Gibson and Bruck's next reaction method
    NextReaction,
    /// Direct method searching reactions in the order of their firing frequency
    /// measured over a short pre-simulation
    OptimizedDirect { presimulation_steps: usize },
    /// Direct method which moves a reaction one slot up the search order every time it fires
    SortingDirect,
    /// Rejection SSA working on propensity bounds over fluctuation intervals of relative width `delta`
    Rejection { delta: f64 },
    /// Tau leaping with Cao, Gillespie and Petzold step size selection
    TauLeaping { epsilon: f64 },
}

impl Algorithm {
    pub fn optimized_direct() -> Self {
        Algorithm::OptimizedDirect { presimulation_steps: 1000 }
    }

    pub fn rejection() -> Self {
        Algorithm::Rejection { delta: 0.1 }
    }

    pub fn tau_leaping() -> Self {
        Algorithm::TauLeaping { epsilon: 0.03 }
    }

    /// Exact algorithms sample the jump process without approximation.
    pub fn is_exact(&self) -> bool {
        !matches!(self, Algorithm::TauLeaping { .. })
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Algorithm::Rejection { delta } if !(delta > 0.0 && delta < 1.0) => Err(SimError::InvalidParameter(
                format!("rejection delta must lie in (0, 1), got {}", delta),
            )),
            Algorithm::TauLeaping { epsilon } if !(epsilon > 0.0 && epsilon < 1.0) => Err(SimError::InvalidParameter(
                format!("tau leaping epsilon must lie in (0, 1), got {}", epsilon),
            )),
            _ => Ok(()),
        }
    }

    /// Creates a fresh method instance for one trial.
    pub fn method(&self, rate_cache: RateCache) -> Box<dyn Method> {
        match *self {
            Algorithm::Direct => Box::new(direct::Direct::new(rate_cache)),
            Algorithm::FirstReaction => Box::new(first_reaction::FirstReaction::new(rate_cache)),
            Algorithm::NextReaction => Box::new(next_reaction::NextReaction::new()),
            Algorithm::OptimizedDirect { presimulation_steps } => {
                Box::new(optimized_direct::OptimizedDirect::new(presimulation_steps))
            }
            Algorithm::SortingDirect => Box::new(sorting_direct::SortingDirect::new()),
            Algorithm::Rejection { delta } => Box::new(rejection::Rejection::new(delta)),
            Algorithm::TauLeaping { epsilon } => Box::new(tau_leaping::TauLeaping::new(epsilon, rate_cache)),
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Direct
    }
}

/// How propensities are kept current between events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RateCache {
    /// Recompute every propensity after each event
    Full,
    /// Recompute only the propensities of reactions depending on the fired one
    #[default]
    Dependent,
}

/// Next change proposed by a method
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A single reaction firing at an absolute time
    Fire { time: f64, reaction: usize },
    /// Several firings bundled into one leap ending at an absolute time
    Leap { time: f64, firings: Vec<(usize, u64)> },
    /// No reaction can fire any more
    Stall,
}

impl Event {
    pub fn time(&self) -> Option<f64> {
        match self {
            Event::Fire { time, .. } | Event::Leap { time, .. } => Some(*time),
            Event::Stall => None,
        }
    }
}

pub trait Method: Send {
    /// Prepares the method for a new trajectory starting from `state`.
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], t: f64, rng: &mut StdRng);

    /// Proposes the next event without touching the state.
    fn next_event(
        &mut self,
        network: &ReactionNetwork,
        state: &[u64],
        t: f64,
        t_final: f64,
        rng: &mut StdRng,
    ) -> Result<Event>;

    /// Applies an event previously returned by `next_event` and updates cached rates.
    fn commit(&mut self, network: &ReactionNetwork, state: &mut [u64], event: &Event, rng: &mut StdRng) -> Result<()>;
}

/// Applies the firings carried by an event to the state.
pub fn apply_event(network: &ReactionNetwork, state: &mut [u64], event: &Event) -> Result<()> {
    match event {
        Event::Fire { reaction, .. } => network.apply(*reaction, state, 1),
        Event::Leap { firings, .. } => network.apply_leap(firings, state),
        Event::Stall => Ok(()),
    }
}

/// Cached propensities and their total, refreshed according to a [`RateCache`] strategy.
#[derive(Debug, Clone)]
pub struct Propensities {
    values: Vec<f64>,
    total: f64,
    mode: RateCache,
    updates: usize,
}

impl Propensities {
    pub fn new(mode: RateCache) -> Self {
        Self {
            values: Vec::new(),
            total: 0.0,
            mode,
            updates: 0,
        }
    }

    /// Recomputes every propensity.
    pub fn reset(&mut self, network: &ReactionNetwork, state: &[u64]) {
        self.values = (0..network.num_reactions())
            .map(|j| network.propensity(j, state))
            .collect();
        self.resum();
    }

    fn resum(&mut self) {
        self.total = self.values.iter().sum();
        self.updates = 0;
    }

    /// Brings propensities up to date after `fired` changed the state.
    pub fn refresh(&mut self, network: &ReactionNetwork, state: &[u64], fired: &[usize]) {
        match self.mode {
            RateCache::Full => self.reset(network, state),
            RateCache::Dependent => {
                for &j in fired {
                    for &k in network.dependents(j) {
                        let new = network.propensity(k, state);
                        self.total += new - self.values[k];
                        self.values[k] = new;
                    }
                }
                self.updates += 1;
                if self.updates >= RESUM_INTERVAL || self.total < 0.0 {
                    self.resum();
                }
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn get(&self, j: usize) -> f64 {
        self.values[j]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Picks the reaction at which the running sum of propensities first exceeds `target`.
    /// Rounding can leave `target` past the last bucket, the last reaction with positive
    /// propensity is taken then.
    pub fn select(&self, target: f64) -> Option<usize> {
        let mut sum = 0.0;
        let mut last = None;
        for (j, &a) in self.values.iter().enumerate() {
            if a > 0.0 {
                sum += a;
                last = Some(j);
                if sum > target {
                    return last;
                }
            }
        }
        last
    }

    /// Same as [`Propensities::select`] walking reactions in `order`; returns the position in `order`.
    pub fn select_ordered(&self, order: &[usize], target: f64) -> Option<usize> {
        let mut sum = 0.0;
        let mut last = None;
        for (position, &j) in order.iter().enumerate() {
            let a = self.values[j];
            if a > 0.0 {
                sum += a;
                last = Some(position);
                if sum > target {
                    return last;
                }
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    fn network() -> ReactionNetwork {
        let network = Network::new("three")
            .with_species("A", 4)
            .and_then(|n| n.with_species("B", 0))
            .and_then(|n| n.with_reaction("conversion", 1.0, "A --> B"))
            .and_then(|n| n.with_reaction("back", 2.0, "B --> A"))
            .and_then(|n| n.with_reaction("decay", 0.5, "A --> 0"))
            .unwrap();
        ReactionNetwork::compile(&network).unwrap()
    }

    #[test]
    fn select_walks_cumulative_sums() {
        let network = network();
        let mut rates = Propensities::new(RateCache::Full);
        rates.reset(&network, &[4, 0]);
        assert_eq!(rates.values(), &[4.0, 0.0, 2.0]);
        assert_eq!(rates.total(), 6.0);
        assert_eq!(rates.select(0.0), Some(0));
        assert_eq!(rates.select(3.99), Some(0));
        assert_eq!(rates.select(4.5), Some(2));
        // past the end falls back to the last reaction that can fire
        assert_eq!(rates.select(6.0), Some(2));
        assert_eq!(rates.select_ordered(&[2, 1, 0], 1.0), Some(0));
        assert_eq!(rates.select_ordered(&[2, 1, 0], 2.5), Some(2));
    }

    #[test]
    fn dependent_and_full_refresh_agree() {
        let network = network();
        let mut full = Propensities::new(RateCache::Full);
        let mut dependent = Propensities::new(RateCache::Dependent);
        let mut state = vec![4, 0];
        full.reset(&network, &state);
        dependent.reset(&network, &state);

        for j in [0, 0, 1, 2, 0] {
            network.apply(j, &mut state, 1).unwrap();
            full.refresh(&network, &state, &[j]);
            dependent.refresh(&network, &state, &[j]);
            assert_eq!(full.values(), dependent.values());
            assert!((full.total() - dependent.total()).abs() < 1e-12);
        }
    }

    #[test]
    fn parameters_are_validated() {
        assert!(Algorithm::rejection().validate().is_ok());
        assert!(Algorithm::tau_leaping().validate().is_ok());
        assert!(Algorithm::Rejection { delta: 1.5 }.validate().is_err());
        assert!(Algorithm::TauLeaping { epsilon: 0.0 }.validate().is_err());
        assert!(!Algorithm::tau_leaping().is_exact());
        assert!(Algorithm::NextReaction.is_exact());
    }

    #[test]
    fn stalled_network_selects_nothing() {
        let network = network();
        let mut rates = Propensities::new(RateCache::Dependent);
        rates.reset(&network, &[0, 0]);
        assert_eq!(rates.total(), 0.0);
        assert_eq!(rates.select(0.0), None);
    }
}
