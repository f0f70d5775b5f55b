pub mod queue;

use queue::IndexedQueue;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::Exp1;

use super::{apply_event, Event, Method};
use crate::error::Result;
use crate::reaction_network::ReactionNetwork;

/// Gibson and Bruck's next reaction method.
///
/// Keeps an absolute putative firing time per reaction in an indexed priority queue.
/// After a firing only the fired reaction draws a new exponential, the times of its
/// dependents are rescaled by the ratio of old to new propensity.
pub struct NextReaction {
    rates: Vec<f64>,
    queue: IndexedQueue,
}

impl NextReaction {
    pub fn new() -> Self {
        Self {
            rates: Vec::new(),
            queue: IndexedQueue::default(),
        }
    }
}

impl Default for NextReaction {
    fn default() -> Self {
        Self::new()
    }
}

fn putative_time(t: f64, a: f64, rng: &mut StdRng) -> f64 {
    if a > 0.0 {
        t + rng.sample::<f64, _>(Exp1) / a
    } else {
        f64::INFINITY
    }
}

impl Method for NextReaction {
    fn initialize(&mut self, network: &ReactionNetwork, state: &[u64], t: f64, rng: &mut StdRng) {
        self.rates = (0..network.num_reactions())
            .map(|j| network.propensity(j, state))
            .collect();
        let times = self.rates.iter().map(|&a| putative_time(t, a, rng)).collect();
        self.queue = IndexedQueue::new(times);
    }

    fn next_event(
        &mut self,
        _network: &ReactionNetwork,
        _state: &[u64],
        _t: f64,
        _t_final: f64,
        _rng: &mut StdRng,
    ) -> Result<Event> {
        Ok(match self.queue.peek() {
            Some((reaction, time)) if time.is_finite() => Event::Fire { time, reaction },
            _ => Event::Stall,
        })
    }

    fn commit(&mut self, network: &ReactionNetwork, state: &mut [u64], event: &Event, rng: &mut StdRng) -> Result<()> {
        apply_event(network, state, event)?;
        let (t, fired) = match event {
            Event::Fire { time, reaction } => (*time, *reaction),
            _ => return Ok(()),
        };

        let a = network.propensity(fired, state);
        self.rates[fired] = a;
        self.queue.update(fired, putative_time(t, a, rng));

        for &k in network.dependents(fired) {
            if k == fired {
                continue;
            }
            let old = self.rates[k];
            let new = network.propensity(k, state);
            let old_time = self.queue.time(k);
            let time = if old > 0.0 && new > 0.0 && old_time.is_finite() {
                t + (old / new) * (old_time - t)
            } else {
                putative_time(t, new, rng)
            };
            self.rates[k] = new;
            self.queue.update(k, time);
        }
        Ok(())
    }
}
