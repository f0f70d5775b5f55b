use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;

use super::{apply_event, Event, Method};
use crate::error::Result;
use crate::reaction_network::ReactionNetwork;

/// Candidate rejections tolerated, per reaction, before the exact total is checked for zero.
const REJECTIONS_PER_REACTION: usize = 64;

/// Rejection based SSA (Thanh, Priami and Zunino).
///
/// Each species carries a fluctuation interval around its count and each reaction the lower
/// and upper bound of its propensity over those intervals. Candidates are drawn from the
/// upper bounds and accepted against the lower bound first, the exact propensity only being
/// evaluated when that squeeze fails. Bounds are rebuilt only for species leaving their interval.
pub struct Rejection {
    delta: f64,
    lower: Vec<u64>,
    upper: Vec<u64>,
    a_lower: Vec<f64>,
    a_upper: Vec<f64>,
    upper_total: f64,
}

impl Rejection {
    pub fn new(delta: f64) -> Self {
        Self {
            delta,
            lower: Vec::new(),
            upper: Vec::new(),
            a_lower: Vec::new(),
            a_upper: Vec::new(),
            upper_total: 0.0,
        }
    }

    fn set_interval(&mut self, s: usize, count: u64) {
        let x = count as f64;
        let spread = x * self.delta;
        self.lower[s] = (x - spread).floor().max(0.0) as u64;
        self.upper[s] = (x + spread).ceil() as u64;
    }

    fn set_bounds(&mut self, network: &ReactionNetwork, j: usize) {
        let lower = &self.lower;
        let upper = &self.upper;
        self.a_lower[j] = network.propensity_with(j, |s| lower[s]);
        self.a_upper[j] = network.propensity_with(j, |s| upper[s]);
    }

    fn select_candidate(&self, target: f64) -> Option<usize> {
        let mut sum = 0.0;
        let mut last = None;
        for (j, &a) in self.a_upper.iter().enumerate() {
            if a > 0.0 {
                sum += a;
                last = Some(j);
                if sum > target {
                    break;
                }
            }
        }
        last
    }
}

impl Method for Rejection {
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], _t: f64, _rng: &mut StdRng) {
        self.lower = vec![0; network.num_species()];
        self.upper = vec![0; network.num_species()];
        for (s, &count) in state.iter().enumerate() {
            self.set_interval(s, count);
        }
        self.a_lower = vec![0.0; network.num_reactions()];
        self.a_upper = vec![0.0; network.num_reactions()];
        for j in 0..network.num_reactions() {
            self.set_bounds(network, j);
        }
        self.upper_total = self.a_upper.iter().sum();
    }

    fn next_event(
        &mut self,
        network: &ReactionNetwork,
        state: &[u64],
        t: f64,
        _t_final: f64,
        rng: &mut StdRng,
    ) -> Result<Event> {
        if self.upper_total <= 0.0 {
            return Ok(Event::Stall);
        }

        let guard = REJECTIONS_PER_REACTION * network.num_reactions().max(1);
        let mut waiting = 0.0;
        let mut rejections = 0;
        loop {
            let candidate = match self.select_candidate(rng.gen::<f64>() * self.upper_total) {
                Some(j) => j,
                None => return Ok(Event::Stall),
            };
            waiting += rng.sample::<f64, _>(Exp1) / self.upper_total;

            let threshold = rng.gen::<f64>() * self.a_upper[candidate];
            if threshold < self.a_lower[candidate] || threshold < network.propensity(candidate, state) {
                return Ok(Event::Fire {
                    time: t + waiting,
                    reaction: candidate,
                });
            }

            rejections += 1;
            if rejections >= guard {
                // bounds can stay positive while every exact propensity is zero
                let exact: f64 = (0..network.num_reactions()).map(|j| network.propensity(j, state)).sum();
                if exact <= 0.0 {
                    return Ok(Event::Stall);
                }
                rejections = 0;
            }
        }
    }

    fn commit(&mut self, network: &ReactionNetwork, state: &mut [u64], event: &Event, _rng: &mut StdRng) -> Result<()> {
        apply_event(network, state, event)?;
        let fired = match event {
            Event::Fire { reaction, .. } => *reaction,
            _ => return Ok(()),
        };

        let mut stale: Vec<usize> = Vec::new();
        for &(s, _) in network.changes(fired) {
            if state[s] < self.lower[s] || state[s] > self.upper[s] {
                self.set_interval(s, state[s]);
                stale.extend_from_slice(network.readers(s));
            }
        }
        if stale.is_empty() {
            return Ok(());
        }

        stale.sort_unstable();
        stale.dedup();
        for j in stale {
            self.set_bounds(network, j);
        }
        self.upper_total = self.a_upper.iter().sum();
        Ok(())
    }
}
