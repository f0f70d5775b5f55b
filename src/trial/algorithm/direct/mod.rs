use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;

use super::{apply_event, Event, Method, Propensities, RateCache};
use crate::error::Result;
use crate::reaction_network::ReactionNetwork;

/// Gillespie's direct method: an exponential waiting time on the total propensity,
/// then a reaction picked with probability proportional to its propensity.
pub struct Direct {
    rates: Propensities,
}

impl Direct {
    pub fn new(rate_cache: RateCache) -> Self {
        Self {
            rates: Propensities::new(rate_cache),
        }
    }
}

/// Draws one direct method step from a propensity cache.
pub(crate) fn direct_step(rates: &Propensities, t: f64, rng: &mut StdRng) -> Event {
    let total = rates.total();
    if total <= 0.0 {
        return Event::Stall;
    }
    let waiting: f64 = rng.sample(Exp1);
    let target = rng.gen::<f64>() * total;
    match rates.select(target) {
        Some(reaction) => Event::Fire {
            time: t + waiting / total,
            reaction,
        },
        None => Event::Stall,
    }
}

impl Method for Direct {
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
        Ok(direct_step(&self.rates, t, rng))
    }

    fn commit(&mut self, network: &ReactionNetwork, state: &mut [u64], event: &Event, _rng: &mut StdRng) -> Result<()> {
        apply_event(network, state, event)?;
        if let Event::Fire { reaction, .. } = event {
            self.rates.refresh(network, state, &[*reaction]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::network::Network;

    #[test]
    fn picks_the_only_possible_reaction() {
        let network = Network::new("decay")
            .with_species("X", 3)
            .and_then(|n| n.with_reaction("decay", 1.0, "X --> 0"))
            .and_then(|n| n.with_reaction("dimer decay", 1.0, "2 X --> 0"))
            .unwrap();
        let network = ReactionNetwork::compile(&network).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut method = Direct::new(RateCache::Dependent);
        let mut state = vec![1];
        method.initialize(&network, &state, 0.0, &mut rng);

        let event = method.next_event(&network, &state, 0.0, 10.0, &mut rng).unwrap();
        match event {
            Event::Fire { time, reaction } => {
                assert_eq!(reaction, 0);
                assert!(time > 0.0);
            }
            other => panic!("unexpected event {:?}", other),
        }

        method.commit(&network, &mut state, &event, &mut rng).unwrap();
        assert_eq!(state, vec![0]);
        assert_eq!(method.next_event(&network, &state, 1.0, 10.0, &mut rng).unwrap(), Event::Stall);
    }
}
