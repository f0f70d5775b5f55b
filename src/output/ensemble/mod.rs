use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::SamplePath;
use crate::error::{Result, SimError};

/// Independent sample paths of one network, used for Monte Carlo estimates.
#[derive(Debug, Clone)]
pub struct Ensemble {
    network: String,
    species: Arc<Vec<String>>,
    paths: Vec<SamplePath>,
    complete: bool,
    started_at: DateTime<Utc>,
    elapsed: Duration,
}

/// Per time point mean and standard deviation of every species over an ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub species: Vec<String>,
    pub times: Vec<f64>,
    /// `mean[i][s]` for time `i` and species `s`
    pub mean: Vec<Vec<f64>>,
    pub std: Vec<Vec<f64>>,
    /// Number of paths covering each time
    pub samples: Vec<usize>,
}

impl Ensemble {
    pub(crate) fn new(
        network: String,
        species: Arc<Vec<String>>,
        mut paths: Vec<SamplePath>,
        complete: bool,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        paths.sort_by_key(|path| path.trial());
        Self {
            network,
            species,
            paths,
            complete,
            started_at,
            elapsed,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn paths(&self) -> &[SamplePath] {
        &self.paths
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SamplePath> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// False when the runtime limit cut the ensemble short.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn species_index(&self, name: &str) -> Result<usize> {
        self.species
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| SimError::NoSuchSpecies(name.to_string()))
    }

    /// Counts of one species at time `t` over every path covering `t`.
    pub fn values_at(&self, species: &str, t: f64) -> Result<Vec<u64>> {
        let s = self.species_index(species)?;
        let values: Vec<u64> = self
            .paths
            .iter()
            .filter_map(|path| path.state_at(t).map(|state| state[s]))
            .collect();
        if values.is_empty() {
            return Err(SimError::InvalidParameter(format!("no sample path covers t = {}", t)));
        }
        Ok(values)
    }

    /// Mean and standard deviation of every species at each of `times`.
    pub fn summary(&self, times: &[f64]) -> Summary {
        let num_species = self.species.len();
        let mut mean = Vec::with_capacity(times.len());
        let mut std = Vec::with_capacity(times.len());
        let mut samples = Vec::with_capacity(times.len());

        for &t in times {
            let states: Vec<&[u64]> = self.paths.iter().filter_map(|path| path.state_at(t)).collect();
            let n = states.len();
            let mut m = vec![f64::NAN; num_species];
            let mut sd = vec![f64::NAN; num_species];
            if n > 0 {
                for s in 0..num_species {
                    let mu = states.iter().map(|state| state[s] as f64).sum::<f64>() / n as f64;
                    m[s] = mu;
                    sd[s] = if n > 1 {
                        let ss: f64 = states.iter().map(|state| (state[s] as f64 - mu).powi(2)).sum();
                        (ss / (n - 1) as f64).sqrt()
                    } else {
                        0.0
                    };
                }
            }
            mean.push(m);
            std.push(sd);
            samples.push(n);
        }

        Summary {
            species: self.species.to_vec(),
            times: times.to_vec(),
            mean,
            std,
            samples,
        }
    }

    /// Mean count of every species at each of `times`; NaN where no path covers the time.
    pub fn mean(&self, times: &[f64]) -> Vec<Vec<f64>> {
        self.summary(times).mean
    }

    /// Number of paths holding each count of `species` at time `t`.
    pub fn histogram(&self, species: &str, t: f64) -> Result<BTreeMap<u64, usize>> {
        let mut histogram = BTreeMap::new();
        for value in self.values_at(species, t)? {
            *histogram.entry(value).or_insert(0) += 1;
        }
        Ok(histogram)
    }

    /// Empirical distribution of `species` at time `t`.
    pub fn distribution(&self, species: &str, t: f64) -> Result<BTreeMap<u64, f64>> {
        let histogram = self.histogram(species, t)?;
        let n: usize = histogram.values().sum();
        Ok(histogram
            .into_iter()
            .map(|(value, count)| (value, count as f64 / n as f64))
            .collect())
    }

    /// Fraction of paths in which `species` is extinct at time `t`.
    pub fn extinction_probability(&self, species: &str, t: f64) -> Result<f64> {
        let values = self.values_at(species, t)?;
        Ok(values.iter().filter(|&&v| v == 0).count() as f64 / values.len() as f64)
    }

    pub fn final_states(&self) -> Vec<&[u64]> {
        self.paths.iter().filter_map(|path| path.final_state()).collect()
    }
}

impl<'a> IntoIterator for &'a Ensemble {
    type Item = &'a SamplePath;
    type IntoIter = std::slice::Iter<'a, SamplePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}
