use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// When a trial records its state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum SaveAt {
    /// The initial state, every event, and the state at the final time
    #[default]
    Every,
    /// The state at each of the given times
    Points(Vec<f64>),
    /// The state at `0, dt, 2 dt, ...` up to the final time
    Interval(f64),
}

impl SaveAt {
    /// Expands into explicit save times, `None` meaning every event.
    pub fn resolve(&self, t_final: f64) -> Result<Option<Vec<f64>>> {
        match self {
            SaveAt::Every => Ok(None),
            SaveAt::Points(points) => {
                if let Some(p) = points.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > t_final) {
                    return Err(SimError::InvalidSavePoints(format!(
                        "{} lies outside [0, {}]",
                        p, t_final
                    )));
                }
                if points.windows(2).any(|w| w[1] < w[0]) {
                    return Err(SimError::InvalidSavePoints("times must be sorted".to_string()));
                }
                Ok(Some(points.clone()))
            }
            SaveAt::Interval(dt) => {
                if !dt.is_finite() || *dt <= 0.0 {
                    return Err(SimError::InvalidSavePoints(format!("interval {} must be positive", dt)));
                }
                let n = (t_final / dt + 1e-9).floor() as usize;
                Ok(Some((0..=n).map(|i| (i as f64 * dt).min(t_final)).collect()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_expands_to_grid() {
        let points = SaveAt::Interval(0.25).resolve(1.0).unwrap().unwrap();
        assert_eq!(points, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let points = SaveAt::Interval(0.3).resolve(1.0).unwrap().unwrap();
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| *p <= 1.0));

        let points = SaveAt::Interval(0.1).resolve(1.0).unwrap().unwrap();
        assert_eq!(points.len(), 11);
    }

    #[test]
    fn points_are_validated() {
        assert_eq!(SaveAt::Every.resolve(1.0).unwrap(), None);
        assert!(SaveAt::Points(vec![0.0, 0.5, 1.0]).resolve(1.0).is_ok());
        assert!(SaveAt::Points(vec![0.5, 0.2]).resolve(1.0).is_err());
        assert!(SaveAt::Points(vec![-0.1]).resolve(1.0).is_err());
        assert!(SaveAt::Points(vec![2.0]).resolve(1.0).is_err());
        assert!(SaveAt::Points(vec![f64::NAN]).resolve(1.0).is_err());
        assert!(SaveAt::Interval(0.0).resolve(1.0).is_err());
    }
}
