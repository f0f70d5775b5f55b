use log::trace;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Exp1, Poisson};

use super::direct::direct_step;
use super::{apply_event, Event, Method, Propensities, RateCache};
use crate::error::{Result, SimError};
use crate::reaction_network::ReactionNetwork;

/// Reactions that can fire fewer times than this before exhausting a reactant are critical.
const CRITICAL_FIRINGS: u64 = 10;
/// A leap shorter than this many mean waiting times is not worth taking.
const LEAP_THRESHOLD: f64 = 10.0;
/// Exact steps taken once a leap has been judged too short.
const EXACT_STEPS: usize = 100;

/// Explicit tau leaping with the step size selection of Cao, Gillespie and Petzold (2006).
///
/// Critical reactions are kept out of the Poisson leap and fire at most once per leap.
/// A leap that would drive a count negative is retried with half the step, and when the
/// selected step is too short the method falls back to a run of exact direct method steps.
pub struct TauLeaping {
    epsilon: f64,
    rates: Propensities,
    // per species: highest reaction order it takes part in as a reactant, and the largest
    // coefficient it has in a reaction of that order
    highest_order: Vec<(u64, u64)>,
    exact_steps: usize,
}

impl TauLeaping {
    pub fn new(epsilon: f64, rate_cache: RateCache) -> Self {
        Self {
            epsilon,
            rates: Propensities::new(rate_cache),
            highest_order: Vec::new(),
            exact_steps: 0,
        }
    }

    /// `g_i` of the step size bound, how strongly the relative change of a species moves
    /// the propensities of the highest order reactions it feeds.
    fn g(&self, s: usize, x: u64) -> f64 {
        let (order, coefficient) = self.highest_order[s];
        let x = x as f64;
        match (order, coefficient) {
            (1, _) => 1.0,
            (2, 2) if x > 1.0 => 2.0 + 1.0 / (x - 1.0),
            (2, _) => 2.0,
            (3, 3) if x > 2.0 => 3.0 + 1.0 / (x - 1.0) + 2.0 / (x - 2.0),
            (3, 2) if x > 1.0 => 1.5 * (2.0 + 1.0 / (x - 1.0)),
            (3, _) => 3.0,
            (order, _) => order as f64,
        }
    }

    /// Largest number of times reaction `j` can fire before one of its consumed species runs out.
    fn firings_left(network: &ReactionNetwork, state: &[u64], j: usize) -> u64 {
        network
            .changes(j)
            .iter()
            .filter(|(_, change)| *change < 0)
            .map(|&(s, change)| state[s] / change.unsigned_abs())
            .min()
            .unwrap_or(u64::MAX)
    }

    fn select_tau(&self, network: &ReactionNetwork, state: &[u64], critical: &[bool]) -> f64 {
        let mut mean = vec![0.0; network.num_species()];
        let mut variance = vec![0.0; network.num_species()];
        for j in 0..network.num_reactions() {
            let a = self.rates.get(j);
            if critical[j] || a <= 0.0 {
                continue;
            }
            for &(s, change) in network.changes(j) {
                let change = change as f64;
                mean[s] += change * a;
                variance[s] += change * change * a;
            }
        }

        let mut tau = f64::INFINITY;
        for (s, &x) in state.iter().enumerate() {
            if self.highest_order[s].0 == 0 {
                continue;
            }
            let bound = (self.epsilon * x as f64 / self.g(s, x)).max(1.0);
            if mean[s] != 0.0 {
                tau = tau.min(bound / mean[s].abs());
            }
            if variance[s] > 0.0 {
                tau = tau.min(bound * bound / variance[s]);
            }
        }
        tau
    }

    fn sample_leap(
        &self,
        network: &ReactionNetwork,
        critical: &[bool],
        tau: f64,
        fire_critical: bool,
        critical_total: f64,
        rng: &mut StdRng,
    ) -> Result<Vec<(usize, u64)>> {
        let mut firings = Vec::new();
        for j in 0..network.num_reactions() {
            let mean = self.rates.get(j) * tau;
            if critical[j] || mean <= 0.0 {
                continue;
            }
            let poisson = Poisson::new(mean).map_err(|e| {
                SimError::InvalidParameter(format!("poisson mean {} for {}: {}", mean, network.reaction_name(j), e))
            })?;
            let k = poisson.sample(rng) as u64;
            if k > 0 {
                firings.push((j, k));
            }
        }

        if fire_critical {
            let target = rng.gen::<f64>() * critical_total;
            let mut sum = 0.0;
            let mut chosen = None;
            for j in (0..network.num_reactions()).filter(|&j| critical[j]) {
                let a = self.rates.get(j);
                if a > 0.0 {
                    sum += a;
                    chosen = Some(j);
                    if sum > target {
                        break;
                    }
                }
            }
            if let Some(j) = chosen {
                firings.push((j, 1));
            }
        }
        Ok(firings)
    }

    fn keeps_counts_nonnegative(network: &ReactionNetwork, state: &[u64], firings: &[(usize, u64)]) -> bool {
        let net = network.net_change(firings);
        state.iter().zip(net).all(|(&x, change)| x as i128 + change >= 0)
    }
}

impl Method for TauLeaping {
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], _t: f64, _rng: &mut StdRng) {
        self.rates.reset(network, state);
        self.exact_steps = 0;
        self.highest_order = vec![(0, 0); network.num_species()];
        for j in 0..network.num_reactions() {
            let order: u64 = network.reactants(j).iter().map(|&(_, c)| c).sum();
            for &(s, coefficient) in network.reactants(j) {
                let entry = &mut self.highest_order[s];
                if order > entry.0 {
                    *entry = (order, coefficient);
                } else if order == entry.0 {
                    entry.1 = entry.1.max(coefficient);
                }
            }
        }
    }

    fn next_event(
        &mut self,
        network: &ReactionNetwork,
        state: &[u64],
        t: f64,
        t_final: f64,
        rng: &mut StdRng,
    ) -> Result<Event> {
        let total = self.rates.total();
        if total <= 0.0 {
            return Ok(Event::Stall);
        }
        if self.exact_steps > 0 {
            self.exact_steps -= 1;
            return Ok(direct_step(&self.rates, t, rng));
        }

        let critical: Vec<bool> = (0..network.num_reactions())
            .map(|j| self.rates.get(j) > 0.0 && Self::firings_left(network, state, j) < CRITICAL_FIRINGS)
            .collect();
        let critical_total: f64 = (0..network.num_reactions())
            .filter(|&j| critical[j])
            .map(|j| self.rates.get(j))
            .sum();

        let mut tau_noncritical = self.select_tau(network, state, &critical);
        if tau_noncritical < LEAP_THRESHOLD / total {
            trace!("leap of {} too short at t = {}, switching to exact steps", tau_noncritical, t);
            self.exact_steps = EXACT_STEPS - 1;
            return Ok(direct_step(&self.rates, t, rng));
        }

        let tau_critical = if critical_total > 0.0 {
            rng.sample::<f64, _>(Exp1) / critical_total
        } else {
            f64::INFINITY
        };

        loop {
            let (mut tau, mut fire_critical) = if tau_noncritical < tau_critical {
                (tau_noncritical, false)
            } else {
                (tau_critical, true)
            };
            let mut time = t + tau;
            if time > t_final {
                tau = t_final - t;
                time = t_final;
                fire_critical = false;
            }

            let firings = self.sample_leap(network, &critical, tau, fire_critical, critical_total, rng)?;
            if Self::keeps_counts_nonnegative(network, state, &firings) {
                // a leap holding one firing is an ordinary reaction event
                if let [(reaction, 1)] = firings.as_slice() {
                    return Ok(Event::Fire {
                        time,
                        reaction: *reaction,
                    });
                }
                return Ok(Event::Leap { time, firings });
            }
            trace!("leap of {} at t = {} overshot, halving", tau, t);
            tau_noncritical = tau / 2.0;
        }
    }

    fn commit(&mut self, network: &ReactionNetwork, state: &mut [u64], event: &Event, _rng: &mut StdRng) -> Result<()> {
        apply_event(network, state, event)?;
        match event {
            Event::Fire { reaction, .. } => self.rates.refresh(network, state, &[*reaction]),
            Event::Leap { firings, .. } => {
                let fired: Vec<usize> = firings.iter().map(|&(j, _)| j).collect();
                self.rates.refresh(network, state, &fired);
            }
            Event::Stall => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::network::Network;

    fn decay(initial: u64) -> ReactionNetwork {
        let network = Network::new("decay")
            .with_species("X", initial)
            .and_then(|n| n.with_reaction("decay", 1.0, "X --> 0"))
            .unwrap();
        ReactionNetwork::compile(&network).unwrap()
    }

    #[test]
    fn g_follows_highest_order() {
        let network = Network::new("orders")
            .with_species("A", 10)
            .and_then(|n| n.with_species("B", 10))
            .and_then(|n| n.with_species("C", 10))
            .and_then(|n| n.with_reaction("first", 1.0, "A --> B"))
            .and_then(|n| n.with_reaction("dimer", 1.0, "2 B --> C"))
            .and_then(|n| n.with_reaction("hetero", 1.0, "A + C --> B"))
            .unwrap();
        let network = ReactionNetwork::compile(&network).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut method = TauLeaping::new(0.03, RateCache::Dependent);
        method.initialize(&network, network.initial_state(), 0.0, &mut rng);
        assert_eq!(method.highest_order, vec![(2, 1), (2, 2), (2, 1)]);
        assert_eq!(method.g(0, 10), 2.0);
        assert!((method.g(1, 11) - 2.1).abs() < 1e-12);
    }

    #[test]
    fn leaps_on_large_populations() {
        let network = decay(100_000);
        let mut rng = StdRng::seed_from_u64(2);
        let mut method = TauLeaping::new(0.03, RateCache::Dependent);
        let mut state = network.initial_state().to_vec();
        method.initialize(&network, &state, 0.0, &mut rng);

        let event = method.next_event(&network, &state, 0.0, 10.0, &mut rng).unwrap();
        match &event {
            Event::Leap { time, firings } => {
                // mean 1, variance 1 per molecule: tau = epsilon
                assert!((time - 0.03).abs() < 1e-12);
                assert_eq!(firings.len(), 1);
                assert!(firings[0].1 > 2000 && firings[0].1 < 4000);
            }
            other => panic!("expected a leap, got {:?}", other),
        }
        method.commit(&network, &mut state, &event, &mut rng).unwrap();
        assert!(state[0] < 100_000);
        assert_eq!(method.rates.get(0), state[0] as f64);
    }

    #[test]
    fn small_populations_fall_back_to_exact_steps() {
        let network = decay(5);
        let mut rng = StdRng::seed_from_u64(4);
        let mut method = TauLeaping::new(0.03, RateCache::Full);
        let mut state = network.initial_state().to_vec();
        method.initialize(&network, &state, 0.0, &mut rng);

        let mut t = 0.0;
        loop {
            let event = method.next_event(&network, &state, t, 1e6, &mut rng).unwrap();
            match event {
                Event::Fire { time, .. } => {
                    method.commit(&network, &mut state, &event, &mut rng).unwrap();
                    t = time;
                }
                Event::Stall => break,
                Event::Leap { .. } => panic!("five molecules should never leap"),
            }
        }
        assert_eq!(state, vec![0]);
    }

    /// `X` decays at rate 1; a huge, slowly decaying reservoir `Y` keeps the total propensity
    /// high enough that leaps are never judged too short.
    fn decay_beside_reservoir(x: u64) -> ReactionNetwork {
        let network = Network::new("reservoir")
            .with_species("X", x)
            .and_then(|n| n.with_species("Y", 1_000_000_000))
            .and_then(|n| n.with_reaction("decay", 1.0, "X --> 0"))
            .and_then(|n| n.with_reaction("drain", 1e-6, "Y --> 0"))
            .unwrap();
        ReactionNetwork::compile(&network).unwrap()
    }

    #[test]
    fn overshooting_leaps_are_halved() {
        // with epsilon close to 1 the first leap expects 9.9 decays out of 10 molecules
        let network = decay_beside_reservoir(10);
        let mut halved = 0;
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut method = TauLeaping::new(0.99, RateCache::Dependent);
            let mut state = network.initial_state().to_vec();
            method.initialize(&network, &state, 0.0, &mut rng);

            let event = method.next_event(&network, &state, 0.0, 1e6, &mut rng).unwrap();
            let time = event.time().unwrap();
            if time < 0.9 {
                halved += 1;
            } else {
                assert!((time - 0.99).abs() < 1e-9, "seed {}: leap of {}", seed, time);
            }
            method.commit(&network, &mut state, &event, &mut rng).unwrap();
            assert!(state[0] <= 10);
        }
        assert!(halved > 0);
    }

    #[test]
    fn critical_reactions_fire_once_per_leap() {
        // five X left, so the decay is critical while the reservoir keeps leaping
        let network = decay_beside_reservoir(5);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut method = TauLeaping::new(0.03, RateCache::Dependent);
            let mut state = network.initial_state().to_vec();
            method.initialize(&network, &state, 0.0, &mut rng);

            let mut t = 0.0;
            while state[0] > 0 {
                let event = method.next_event(&network, &state, t, 1e6, &mut rng).unwrap();
                let decays: u64 = match &event {
                    Event::Leap { firings, .. } => firings.iter().filter(|(j, _)| *j == 0).map(|(_, k)| k).sum(),
                    Event::Fire { reaction, .. } => (*reaction == 0) as u64,
                    Event::Stall => panic!("reservoir cannot stall"),
                };
                assert_eq!(decays, 1, "seed {}", seed);

                let before = state[0];
                method.commit(&network, &mut state, &event, &mut rng).unwrap();
                assert_eq!(state[0], before - 1);
                t = event.time().unwrap();
            }
        }
    }

    #[test]
    fn leaps_stop_at_the_horizon() {
        let network = decay(100_000);
        let mut rng = StdRng::seed_from_u64(8);
        let mut method = TauLeaping::new(0.03, RateCache::Dependent);
        let state = network.initial_state().to_vec();
        method.initialize(&network, &state, 0.0, &mut rng);
        let event = method.next_event(&network, &state, 0.99, 1.0, &mut rng).unwrap();
        assert!((event.time().unwrap() - 1.0).abs() < 1e-12);
    }
}
