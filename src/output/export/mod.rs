//! Tabular views of paths, ensembles and summaries, ready for CSV or any plotting tool.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;

use super::ensemble::{Ensemble, Summary};
use super::SamplePath;
use crate::error::Result;

/// Rows of numeric cells under named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let c = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| row[c]).collect())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_csv(File::create(path)?)?;
        info!("wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

fn path_rows(path: &SamplePath, prefix: Option<f64>) -> impl Iterator<Item = Vec<f64>> + '_ {
    path.times().iter().zip(path.states()).map(move |(&t, state)| {
        prefix
            .into_iter()
            .chain(std::iter::once(t))
            .chain(state.iter().map(|&count| count as f64))
            .collect()
    })
}

impl SamplePath {
    /// Columns `t, <species...>`
    pub fn to_table(&self) -> Table {
        let columns = std::iter::once("t".to_string()).chain(self.species().iter().cloned()).collect();
        Table {
            columns,
            rows: path_rows(self, None).collect(),
        }
    }
}

impl Ensemble {
    /// Columns `trial, t, <species...>`, paths stacked in trial order.
    pub fn to_table(&self) -> Table {
        let columns = ["trial", "t"]
            .iter()
            .map(|c| c.to_string())
            .chain(self.species().iter().cloned())
            .collect();
        Table {
            columns,
            rows: self
                .iter()
                .flat_map(|path| path_rows(path, Some(path.trial() as f64)))
                .collect(),
        }
    }
}

impl Summary {
    /// Columns `t, mean_<species>..., std_<species>...`
    pub fn to_table(&self) -> Table {
        let columns = std::iter::once("t".to_string())
            .chain(self.species.iter().map(|s| format!("mean_{}", s)))
            .chain(self.species.iter().map(|s| format!("std_{}", s)))
            .collect();
        let rows = self
            .times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                std::iter::once(t)
                    .chain(self.mean[i].iter().copied())
                    .chain(self.std[i].iter().copied())
                    .collect()
            })
            .collect();
        Table { columns, rows }
    }
}
