use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;

use super::{apply_event, Event, Method, Propensities, RateCache};
use crate::error::Result;
use crate::reaction_network::ReactionNetwork;

/// Gillespie's first reaction method: one tentative exponential time per reaction, the earliest fires.
pub struct FirstReaction {
    rates: Propensities,
}

impl FirstReaction {
    pub fn new(rate_cache: RateCache) -> Self {
        Self {
            rates: Propensities::new(rate_cache),
        }
    }
}

impl Method for FirstReaction {
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], _t: f64, _rng: &mut StdRng) {
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
        let mut first: Option<(usize, f64)> = None;
        for (j, &a) in self.rates.values().iter().enumerate() {
            if a <= 0.0 {
                continue;
            }
            let waiting = rng.sample::<f64, _>(Exp1) / a;
            if first.map_or(true, |(_, best)| waiting < best) {
                first = Some((j, waiting));
            }
        }

        Ok(match first {
            Some((reaction, waiting)) => Event::Fire {
                time: t + waiting,
                reaction,
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
