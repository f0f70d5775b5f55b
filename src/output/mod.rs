//! Sample paths and ensembles, with the accessors used to slice and summarize them.

pub mod ensemble;
pub mod export;

use std::ops::Index;
use std::sync::Arc;

use crate::error::{Result, SimError};
use crate::trial::StopReason;

/// The recorded (time, state) pairs of one realization of the jump process.
///
/// Between records the process is taken to hold the last recorded state, so a path
/// is read as a right continuous step function over `[times[0], end_time]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePath {
    trial: usize,
    seed: u64,
    species: Arc<Vec<String>>,
    times: Vec<f64>,
    states: Vec<Vec<u64>>,
    stop_reason: StopReason,
    steps: u64,
    end_time: f64,
}

impl SamplePath {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        trial: usize,
        seed: u64,
        species: Arc<Vec<String>>,
        times: Vec<f64>,
        states: Vec<Vec<u64>>,
        stop_reason: StopReason,
        steps: u64,
        end_time: f64,
    ) -> Self {
        Self {
            trial,
            seed,
            species,
            times,
            states,
            stop_reason,
            steps,
            end_time,
        }
    }

    pub fn trial(&self) -> usize {
        self.trial
    }

    /// Seed the trial's generator was created from; rerunning with it reproduces the path.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[Vec<u64>] {
        &self.states
    }

    pub fn time(&self, i: usize) -> f64 {
        self.times[i]
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Number of events committed by the trial, leaps counting once.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Time up to which the path describes the process.
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn final_state(&self) -> Option<&[u64]> {
        self.states.last().map(Vec::as_slice)
    }

    pub fn species_index(&self, name: &str) -> Result<usize> {
        self.species
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| SimError::NoSuchSpecies(name.to_string()))
    }

    /// Last recorded state at or before `t`, `None` outside the span the path covers.
    pub fn state_at(&self, t: f64) -> Option<&[u64]> {
        if self.is_empty() || t < self.times[0] || t > self.end_time {
            return None;
        }
        let i = self.times.partition_point(|&time| time <= t);
        Some(&self.states[i - 1])
    }

    /// Count of one species at each record.
    pub fn series(&self, species: &str) -> Result<Vec<u64>> {
        let s = self.species_index(species)?;
        Ok(self.states.iter().map(|state| state[s]).collect())
    }

    pub fn value_at(&self, species: &str, t: f64) -> Result<Option<u64>> {
        let s = self.species_index(species)?;
        Ok(self.state_at(t).map(|state| state[s]))
    }

    /// Pairs of counts of two species at each record, for phase portraits.
    pub fn phase(&self, x: &str, y: &str) -> Result<Vec<(u64, u64)>> {
        let (x, y) = (self.species_index(x)?, self.species_index(y)?);
        Ok(self.states.iter().map(|state| (state[x], state[y])).collect())
    }

    /// Records with `from <= t <= to`.
    pub fn window(&self, from: f64, to: f64) -> impl Iterator<Item = (f64, &[u64])> + '_ {
        self.times
            .iter()
            .zip(self.states.iter())
            .filter(move |(&t, _)| t >= from && t <= to)
            .map(|(&t, state)| (t, state.as_slice()))
    }
}

impl Index<usize> for SamplePath {
    type Output = [u64];

    fn index(&self, i: usize) -> &Self::Output {
        &self.states[i]
    }
}
