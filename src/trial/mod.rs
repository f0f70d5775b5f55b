use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use results::TrialResult;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::output::SamplePath;
use crate::reaction_network::ReactionNetwork;
use algorithm::{Algorithm, RateCache};

pub mod algorithm;
pub mod results;
pub mod save_at;

/// Settings shared by every trial of a simulation
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub algorithm: Algorithm,
    pub rate_cache: RateCache,
    pub t_final: f64,
    /// Explicit save times, `None` records every event
    pub save_points: Option<Vec<f64>>,
    pub max_steps: Option<u64>,
}

/// Object specifying return granularity for a trial
///  - Minimal returns only the finished sample path
///  - Full additionally streams every record as it is written
#[derive(Clone)]
pub enum TrialReturn {
    Minimal,
    Full(SyncSender<TrialResult>),
}

/// Why a trial stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The next event would happen after the final time
    Horizon,
    /// No reaction can fire any more
    Absorbed,
    /// The step limit was reached before the final time
    MaxSteps,
    /// The engine asked the trial to stop
    Cancelled,
}

/// The runtime environment for a single trial. Once the object has been initialized
/// the simulate method may be called on it in order to sample one path of the network.
pub struct Trial {
    reaction_network: Arc<ReactionNetwork>,
    settings: Arc<RunSettings>,
    id: usize,
    seed: u64,
    cancel: Arc<AtomicBool>,
    trial_return: TrialReturn,
}

impl Trial {
    pub fn from(
        reaction_network: Arc<ReactionNetwork>,
        settings: Arc<RunSettings>,
        id: usize,
        seed: u64,
        cancel: Arc<AtomicBool>,
        trial_return: TrialReturn,
    ) -> Self {
        Self {
            reaction_network,
            settings,
            id,
            seed,
            cancel,
            trial_return,
        }
    }

    /// Runs the selected algorithm from the initial state until the final time, an absorbing
    /// state, the step limit or cancellation, whichever comes first.
    pub fn simulate(self) -> Result<SamplePath> {
        let network = &*self.reaction_network;
        let settings = &*self.settings;
        let t_final = settings.t_final;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut method = settings.algorithm.method(settings.rate_cache);
        let mut state = network.initial_state().to_vec();
        let mut t = 0.0;
        let mut steps: u64 = 0;

        let progress = match &self.trial_return {
            TrialReturn::Minimal => None,
            TrialReturn::Full(sender) => Some(sender),
        };
        let mut recorder = Recorder::new(self.id, settings.save_points.clone(), progress);
        recorder.start(t, &state);
        method.initialize(network, &state, t, &mut rng);

        let stop = loop {
            if self.cancel.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if settings.max_steps.map_or(false, |max| steps >= max) {
                break StopReason::MaxSteps;
            }

            let event = method.next_event(network, &state, t, t_final, &mut rng)?;
            let time = match event.time() {
                Some(time) => time,
                None => break StopReason::Absorbed,
            };
            if time > t_final {
                break StopReason::Horizon;
            }

            recorder.before_jump(time, &state);
            method.commit(network, &mut state, &event, &mut rng)?;
            t = time;
            steps += 1;
            recorder.after_jump(t, &state);

            if t >= t_final {
                break StopReason::Horizon;
            }
        };

        let end = match stop {
            StopReason::Horizon | StopReason::Absorbed => t_final,
            StopReason::MaxSteps | StopReason::Cancelled => t,
        };
        recorder.finish(end, &state);
        debug!("trial {} stopped ({:?}) after {} steps at t = {}", self.id, stop, steps, t);

        let (times, states) = recorder.into_records();
        Ok(SamplePath::new(
            self.id,
            self.seed,
            network.species_names().clone(),
            times,
            states,
            stop,
            steps,
            end,
        ))
    }
}

/// Writes records either at every event or at fixed save points.
struct Recorder<'trial> {
    id: usize,
    points: Option<Vec<f64>>,
    next_point: usize,
    times: Vec<f64>,
    states: Vec<Vec<u64>>,
    progress: Option<&'trial SyncSender<TrialResult>>,
}

impl<'trial> Recorder<'trial> {
    fn new(id: usize, points: Option<Vec<f64>>, progress: Option<&'trial SyncSender<TrialResult>>) -> Self {
        Self {
            id,
            points,
            next_point: 0,
            times: Vec::new(),
            states: Vec::new(),
            progress,
        }
    }

    fn record(&mut self, time: f64, state: &[u64]) {
        trace!("trial {} record t = {} {:?}", self.id, time, state);
        self.times.push(time);
        self.states.push(state.to_vec());
        if let Some(sender) = self.progress {
            // the engine stops listening once it gives up on the ensemble
            let _ = sender.send(TrialResult::IntermediateStep {
                trial: self.id,
                time,
                state: state.to_vec(),
            });
        }
    }

    fn start(&mut self, t: f64, state: &[u64]) {
        if self.points.is_none() {
            self.record(t, state);
        }
    }

    /// Records save points the process passes in the state it holds before jumping at `time`.
    fn before_jump(&mut self, time: f64, state: &[u64]) {
        self.flush_points(state, |p| p < time);
    }

    fn after_jump(&mut self, t: f64, state: &[u64]) {
        if self.points.is_none() {
            self.record(t, state);
        }
    }

    /// Closes the path at `end`, where the process holds `state`.
    fn finish(&mut self, end: f64, state: &[u64]) {
        if self.points.is_some() {
            self.flush_points(state, |p| p <= end);
        } else if self.times.last().map_or(true, |&last| last < end) {
            self.record(end, state);
        }
    }

    fn flush_points(&mut self, state: &[u64], due: impl Fn(f64) -> bool) {
        loop {
            let point = match &self.points {
                Some(points) if self.next_point < points.len() && due(points[self.next_point]) => {
                    points[self.next_point]
                }
                _ => return,
            };
            self.record(point, state);
            self.next_point += 1;
        }
    }

    fn into_records(self) -> (Vec<f64>, Vec<Vec<u64>>) {
        (self.times, self.states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::trial::save_at::SaveAt;

    fn decay(initial: u64) -> Arc<ReactionNetwork> {
        let network = Network::new("decay")
            .with_species("X", initial)
            .and_then(|n| n.with_reaction("decay", 1.0, "X --> 0"))
            .unwrap();
        Arc::new(ReactionNetwork::compile(&network).unwrap())
    }

    fn settings(algorithm: Algorithm, t_final: f64, save_at: SaveAt, max_steps: Option<u64>) -> Arc<RunSettings> {
        Arc::new(RunSettings {
            algorithm,
            rate_cache: RateCache::Dependent,
            t_final,
            save_points: save_at.resolve(t_final).unwrap(),
            max_steps,
        })
    }

    fn run(network: Arc<ReactionNetwork>, settings: Arc<RunSettings>, seed: u64) -> SamplePath {
        Trial::from(network, settings, 0, seed, Arc::new(AtomicBool::new(false)), TrialReturn::Minimal)
            .simulate()
            .unwrap()
    }

    #[test]
    fn every_event_is_recorded() {
        let path = run(decay(10), settings(Algorithm::Direct, 1e6, SaveAt::Every, None), 1);
        assert_eq!(path.stop_reason(), StopReason::Absorbed);
        assert_eq!(path.steps(), 10);
        // initial state, ten decays and the closing record at the final time
        assert_eq!(path.len(), 12);
        assert_eq!(path[0], [10]);
        assert_eq!(path[10], [0]);
        assert_eq!(path.time(11), 1e6);
        assert!(path.times().windows(2).all(|w| w[0] <= w[1]));
        for (i, state) in path.states().iter().take(11).enumerate() {
            assert_eq!(state[0], 10 - i as u64);
        }
    }

    #[test]
    fn save_points_hold_the_state_in_force() {
        let t_final = 2.0;
        let every = run(decay(50), settings(Algorithm::Direct, t_final, SaveAt::Every, None), 9);
        let gridded = run(decay(50), settings(Algorithm::Direct, t_final, SaveAt::Interval(0.5), None), 9);

        assert_eq!(gridded.times(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
        for (i, &t) in gridded.times().iter().enumerate() {
            assert_eq!(Some(gridded[i].to_vec()), every.state_at(t).map(|s| s.to_vec()));
        }
    }

    #[test]
    fn step_limit_truncates_the_path() {
        let path = run(decay(100), settings(Algorithm::Direct, 1000.0, SaveAt::Interval(1.0), Some(5)), 2);
        assert_eq!(path.stop_reason(), StopReason::MaxSteps);
        assert_eq!(path.steps(), 5);
        assert!(path.end_time() < 1000.0);
        assert!(path.times().iter().all(|&t| t <= path.end_time()));
    }

    #[test]
    fn cancelled_trials_stop_immediately() {
        let cancel = Arc::new(AtomicBool::new(true));
        let path = Trial::from(
            decay(100),
            settings(Algorithm::NextReaction, 10.0, SaveAt::Every, None),
            3,
            4,
            cancel,
            TrialReturn::Minimal,
        )
        .simulate()
        .unwrap();
        assert_eq!(path.stop_reason(), StopReason::Cancelled);
        assert_eq!(path.trial(), 3);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn full_return_streams_records() {
        let (sender, receiver) = std::sync::mpsc::sync_channel(64);
        let path = Trial::from(
            decay(5),
            settings(Algorithm::Direct, 1e6, SaveAt::Every, None),
            0,
            5,
            Arc::new(AtomicBool::new(false)),
            TrialReturn::Full(sender),
        )
        .simulate()
        .unwrap();
        let streamed: Vec<f64> = receiver
            .try_iter()
            .map(|result| match result {
                TrialResult::IntermediateStep { time, .. } => time,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(streamed, path.times());
    }

    #[test]
    fn same_seed_same_path() {
        for algorithm in [
            Algorithm::Direct,
            Algorithm::FirstReaction,
            Algorithm::NextReaction,
            Algorithm::optimized_direct(),
            Algorithm::SortingDirect,
            Algorithm::rejection(),
            Algorithm::tau_leaping(),
        ] {
            let a = run(decay(200), settings(algorithm, 1.0, SaveAt::Interval(0.1), None), 42);
            let b = run(decay(200), settings(algorithm, 1.0, SaveAt::Interval(0.1), None), 42);
            assert_eq!(a.states(), b.states(), "{:?}", algorithm);
            assert_eq!(a.len(), 11);
        }
    }
}
