use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;

use super::{apply_event, Event, Method, Propensities, RateCache};
use crate::error::Result;
use crate::reaction_network::ReactionNetwork;

/// Sorting direct method (McCollum et al.): the fired reaction swaps places with its
/// predecessor in the search order, so frequent reactions drift to the front.
pub struct SortingDirect {
    rates: Propensities,
    order: Vec<usize>,
    last_position: Option<usize>,
}

impl SortingDirect {
    pub fn new() -> Self {
        Self {
            rates: Propensities::new(RateCache::Dependent),
            order: Vec::new(),
            last_position: None,
        }
    }

    pub fn search_order(&self) -> &[usize] {
        &self.order
    }
}

impl Default for SortingDirect {
    fn default() -> Self {
        Self::new()
    }
}

impl Method for SortingDirect {
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], _t: f64, _rng: &mut StdRng) {
        self.rates.reset(network, state);
        self.order = (0..network.num_reactions()).collect();
        self.last_position = None;
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
        self.last_position = self.rates.select_ordered(&self.order, target);
        Ok(match self.last_position {
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
            if let Some(position) = self.last_position.take() {
                if position > 0 && self.order[position] == *reaction {
                    self.order.swap(position, position - 1);
                }
            }
        }
        Ok(())
    }
}
