use crate::error::SimError;
use crate::output::SamplePath;

type ID = usize;

/// The different types of data which may be sent back from a trial
#[derive(Debug)]
pub enum TrialResult {
    /// A record written by a trial streaming its progress
    IntermediateStep { trial: ID, time: f64, state: Vec<u64> },
    Finished(SamplePath),
    Failed(ID, SimError),
}
