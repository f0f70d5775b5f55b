//! # Description
//! Stochastic simulation engine for chemical reaction networks. A network of species and
//! mass action reactions is read as a continuous-time Markov jump process and sampled with
//! one of several stochastic simulation algorithms, either one path at a time or as an
//! ensemble of independent trials run on a thread pool.
//!
//! # Usage
//! ```
//! use crn_ssa::{models, Algorithm, Builder, SaveAt};
//!
//! let network = models::birth_death_immigration(2.0, 1.0, 0.5, 5).unwrap();
//! let (simulator, _responses) = Builder::new(&network, 4.0)
//!     .unwrap()
//!     .algorithm(Algorithm::Direct)
//!     .save_at(SaveAt::Interval(1.0))
//!     .trials(20)
//!     .seed(1)
//!     .build()
//!     .unwrap();
//!
//! let ensemble = simulator.simulate().unwrap();
//! let summary = ensemble.summary(&[0.0, 2.0, 4.0]);
//! assert_eq!(summary.mean[0], vec![5.0]);
//! ```
//!
//! # Settings
//! - <algorithm>
//!     Which SSA samples the paths, defaults to the direct method
//! - <rate_cache>
//!     How propensities are refreshed between events, defaults to the dependency graph
//! - <t_final>
//!     Final simulation time, required
//! - <save_at>
//!     Every event or fixed save points, defaults to every event
//! - <trials>
//!     Number of sample paths in an ensemble, defaults to 100
//! - <max_steps>
//!     Optional cap on events per trial
//! - <runtime>
//!     Optional wall clock limit on an ensemble in seconds
//!     - once reached the ensemble is returned with the trials finished so far
//! - <seed>
//!     Master seed, every trial seed is derived from it
//!
//! Accepted network sources:
//!     - code, through [`network::Network`]
//!     - CSV species and reaction tables
//!     - JSON

pub mod error;
pub mod models;
pub mod network;
pub mod output;
pub mod reaction_network;
pub mod trial;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, sync_channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use threadpool::ThreadPool;

pub use error::{Result, SimError};
pub use network::Network;
pub use output::ensemble::{Ensemble, Summary};
pub use output::export::Table;
pub use output::SamplePath;
pub use reaction_network::ReactionNetwork;
pub use trial::algorithm::{Algorithm, RateCache};
pub use trial::save_at::SaveAt;
pub use trial::StopReason;
use trial::{results::TrialResult, RunSettings, Trial, TrialReturn};

type TrialID = usize;

/// Messages streamed to the frontend while an ensemble runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResponse {
    /// A record written by a trial, only sent by verbose simulators
    IntermediateStep { trial: TrialID, time: f64, state: Vec<u64> },
    TrialFinished { trial: TrialID, steps: u64, stop_reason: StopReason },
    EnsembleFinished { trials: usize, complete: bool },
}

/// This is a builder object containing defaults and methods for constructing a Simulator.
pub struct Builder {
    // set externally
    algorithm: Algorithm,
    rate_cache: RateCache,
    t_final: f64,
    save_at: SaveAt,
    num_trials: usize,
    max_steps: Option<u64>,
    max_runtime: Option<u64>,
    seed: Option<u64>,
    num_threads: Option<usize>,
    verbose: bool,

    prime_network: ReactionNetwork,
}

impl Builder {
    /// Compiles the network and starts from default values
    ///
    /// algorithm = direct method
    /// rate cache = dependency graph
    /// save at = every event
    /// trials = 100
    /// runtime = unlimited
    /// seed = random
    pub fn new(network: &Network, t_final: f64) -> Result<Self> {
        Ok(Self::from_parsed(ReactionNetwork::compile(network)?, t_final))
    }

    /// Starts from an already compiled network
    pub fn from_parsed(prime_network: ReactionNetwork, t_final: f64) -> Self {
        Self {
            algorithm: Algorithm::default(),
            rate_cache: RateCache::default(),
            t_final,
            save_at: SaveAt::default(),
            num_trials: 100,
            max_steps: None,
            max_runtime: None,
            seed: None,
            num_threads: None,
            verbose: false,
            prime_network,
        }
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn rate_cache(mut self, rate_cache: RateCache) -> Self {
        self.rate_cache = rate_cache;
        self
    }

    pub fn t_final(mut self, t_final: f64) -> Self {
        self.t_final = t_final;
        self
    }

    pub fn save_at(mut self, save_at: SaveAt) -> Self {
        self.save_at = save_at;
        self
    }

    /// Sets the number of trials to be executed to a manual value
    pub fn trials(mut self, count: usize) -> Self {
        self.num_trials = count;
        self
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Sets the maximum runtime of an ensemble in seconds
    pub fn runtime(mut self, seconds: u64) -> Self {
        self.max_runtime = Some(seconds);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn threads(mut self, count: usize) -> Self {
        self.num_threads = Some(count);
        self
    }

    /// Toggles streaming of every record to the frontend receiver
    pub fn verbose(mut self) -> Self {
        self.verbose = !self.verbose;
        self
    }

    /// Consumes builder object and outputs a Simulator along with the frontend receiver
    pub fn build(self) -> Result<(Simulator, Receiver<EngineResponse>)> {
        if !self.t_final.is_finite() || self.t_final <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "final time must be positive, got {}",
                self.t_final
            )));
        }
        if self.num_trials == 0 {
            return Err(SimError::InvalidParameter("at least one trial is required".to_string()));
        }
        if self.num_threads == Some(0) {
            return Err(SimError::InvalidParameter("at least one thread is required".to_string()));
        }
        self.algorithm.validate()?;
        let save_points = self.save_at.resolve(self.t_final)?;

        let mut pool = threadpool::Builder::new().thread_name("CrnSsaTrialThread".to_string());
        if let Some(count) = self.num_threads {
            pool = pool.num_threads(count);
        }
        let (runtime_sender, runtime_receiver) = channel();

        let simulator = Simulator {
            settings: Arc::new(RunSettings {
                algorithm: self.algorithm,
                rate_cache: self.rate_cache,
                t_final: self.t_final,
                save_points,
                max_steps: self.max_steps,
            }),
            num_trials: self.num_trials,
            max_runtime: self.max_runtime,
            seed: self.seed.unwrap_or_else(rand::random),
            verbose: self.verbose,
            computation_threads: pool.build(),
            prime_network: Arc::new(self.prime_network),
            runtime_sender,
        };

        Ok((simulator, runtime_receiver))
    }
}

/// Simulation driver running single paths or ensembles of a compiled network
pub struct Simulator {
    settings: Arc<RunSettings>,
    num_trials: usize,
    max_runtime: Option<u64>,
    seed: u64,
    verbose: bool,

    computation_threads: ThreadPool,
    prime_network: Arc<ReactionNetwork>,
    runtime_sender: Sender<EngineResponse>,
}

impl Simulator {
    pub fn network(&self) -> &ReactionNetwork {
        &self.prime_network
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn num_trials(&self) -> usize {
        self.num_trials
    }

    /// Seeds of every trial in order, derived from the master seed.
    fn trial_seeds(&self) -> Vec<u64> {
        let mut master = StdRng::seed_from_u64(self.seed);
        (0..self.num_trials).map(|_| master.gen()).collect()
    }

    fn trial(&self, id: usize, seed: u64, cancel: Arc<AtomicBool>, trial_return: TrialReturn) -> Trial {
        Trial::from(
            self.prime_network.clone(),
            self.settings.clone(),
            id,
            seed,
            cancel,
            trial_return,
        )
    }

    fn respond(&self, response: EngineResponse) {
        if self.runtime_sender.send(response).is_err() {
            debug!("frontend receiver dropped, response discarded");
        }
    }

    /// Samples one path in the calling thread. It is the path trial 0 of [`Simulator::simulate`] produces.
    pub fn simulate_path(&self) -> Result<SamplePath> {
        let seed = self.trial_seeds()[0];
        self.trial(0, seed, Arc::new(AtomicBool::new(false)), TrialReturn::Minimal)
            .simulate()
    }

    /// Runs every trial on the thread pool and gathers the sample paths into an ensemble.
    pub fn simulate(&self) -> Result<Ensemble> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let deadline = self.max_runtime.map(|seconds| clock + Duration::from_secs(seconds));
        let cancel = Arc::new(AtomicBool::new(false));

        info!(
            "simulating {} trials of {} with {:?} up to t = {}",
            self.num_trials,
            self.prime_network.get_name(),
            self.settings.algorithm,
            self.settings.t_final
        );

        let (computation_threads_sender, computation_threads_receiver) = sync_channel(32);
        for (id, seed) in self.trial_seeds().into_iter().enumerate() {
            let trial_return = if self.verbose {
                TrialReturn::Full(computation_threads_sender.clone())
            } else {
                TrialReturn::Minimal
            };
            let trial = self.trial(id, seed, cancel.clone(), trial_return);
            let sender = computation_threads_sender.clone();
            self.computation_threads.execute(move || {
                let result = match trial.simulate() {
                    Ok(path) => TrialResult::Finished(path),
                    Err(error) => TrialResult::Failed(id, error),
                };
                // the receiver is gone once the ensemble was cut short
                let _ = sender.send(result);
            });
        }
        drop(computation_threads_sender);

        let mut paths = Vec::with_capacity(self.num_trials);
        let mut complete = true;
        while paths.len() < self.num_trials {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    computation_threads_receiver.recv_timeout(remaining)
                }
                None => computation_threads_receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(TrialResult::IntermediateStep { trial, time, state }) => {
                    self.respond(EngineResponse::IntermediateStep { trial, time, state });
                }
                Ok(TrialResult::Finished(path)) => {
                    debug!(
                        "trial {} finished after {} steps ({:?}), received {} trials",
                        path.trial(),
                        path.steps(),
                        path.stop_reason(),
                        paths.len() + 1
                    );
                    self.respond(EngineResponse::TrialFinished {
                        trial: path.trial(),
                        steps: path.steps(),
                        stop_reason: path.stop_reason(),
                    });
                    paths.push(path);
                }
                Ok(TrialResult::Failed(id, error)) => {
                    warn!("trial {} failed: {}", id, error);
                    cancel.store(true, Ordering::Relaxed);
                    return Err(error);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "forced termination because max runtime was reached after {} of {} trials, results may not be accurate",
                        paths.len(),
                        self.num_trials
                    );
                    cancel.store(true, Ordering::Relaxed);
                    complete = false;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    cancel.store(true, Ordering::Relaxed);
                    return Err(SimError::WorkersDisconnected);
                }
            }
        }

        let elapsed = clock.elapsed();
        info!("received {} trials in {:?}", paths.len(), elapsed);
        self.respond(EngineResponse::EnsembleFinished {
            trials: paths.len(),
            complete,
        });

        Ok(Ensemble::new(
            self.prime_network.get_name().to_string(),
            self.prime_network.species_names().clone(),
            paths,
            complete,
            started_at,
            elapsed,
        ))
    }
}
