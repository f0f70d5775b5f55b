use log::trace;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;

use super::direct::direct_step;
use super::{apply_event, Event, Method, Propensities, RateCache};
use crate::error::Result;
use crate::reaction_network::ReactionNetwork;

/// Optimized direct method (Cao, Li and Petzold).
///
/// A short pre-simulation counts how often each reaction fires, and the linear search of
/// the direct method then walks reactions from most to least frequent. Propensities are
/// always refreshed through the dependency graph.
pub struct OptimizedDirect {
    presimulation_steps: usize,
    rates: Propensities,
    order: Vec<usize>,
}

impl OptimizedDirect {
    pub fn new(presimulation_steps: usize) -> Self {
        Self {
            presimulation_steps,
            rates: Propensities::new(RateCache::Dependent),
            order: Vec::new(),
        }
    }

    pub fn search_order(&self) -> &[usize] {
        &self.order
    }

    fn presimulate(&mut self, network: &ReactionNetwork, state: &[u64], rng: &mut StdRng) -> Vec<u64> {
        let mut counts = vec![0u64; network.num_reactions()];
        let mut scratch = state.to_vec();
        let mut t = 0.0;
        for _ in 0..self.presimulation_steps {
            match direct_step(&self.rates, t, rng) {
                Event::Fire { time, reaction } => {
                    if network.apply(reaction, &mut scratch, 1).is_err() {
                        break;
                    }
                    counts[reaction] += 1;
                    t = time;
                    self.rates.refresh(network, &scratch, &[reaction]);
                }
                _ => break,
            }
        }
        counts
    }
}

impl Method for OptimizedDirect {
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], _t: f64, rng: &mut StdRng) {
        self.rates.reset(network, state);
        let counts = self.presimulate(network, state, rng);

        let mut order: Vec<usize> = (0..network.num_reactions()).collect();
        order.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
        trace!("optimized direct search order {:?} from counts {:?}", order, counts);
        self.order = order;

        self.rates.reset(network, state);
    }

    fn next_event(
        &mut self,
        _network: &ReactionNetwork,
        _state: &[u64],
        t: f64,
        _t_final: f64,
        rng: &mut StdRng,
    ) -> Result<Event> {
        let total = self.rates.total();
        if total <= 0.0 {
            return Ok(Event::Stall);
        }
        let waiting: f64 = rng.sample(Exp1);
        let target = rng.gen::<f64>() * total;
        Ok(match self.rates.select_ordered(&self.order, target) {
            Some(position) => Event::Fire {
                time: t + waiting / total,
                reaction: self.order[position],
            },
            None => Event::Stall,
        })
    }

    fn commit(&mut self, network: &ReactionNetwork, state: &mut [u64], event: &Event, _rng: &mut StdRng) -> Result<()> {
        apply_event(network, state, event)?;
        if let Event::Fire { reaction, .. } = event {
            self.rates.refresh(network, state, &[*reaction]);
        }
        Ok(())
    }
}
