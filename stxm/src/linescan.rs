//! Display regridding of line scans.
//!
//! A line scan image has one column per energy sample, and energies are
//! usually denser around an absorption edge. For display the columns are
//! repeated onto a uniform energy axis: grid point `e0 + m * step` shows the
//! last acquired column at or below it. The final sample is appended once so
//! every acquired column is visible. The acquired data are never modified.

use crate::config::LineScanConfig;
use crate::error::{Error, Result};
use crate::image::Image;

#[derive(Debug, Clone, PartialEq)]
pub struct RegriddedScan {
    pub image: Image,
    /// Energy of each regridded column.
    pub energies: Vec<f64>,
    /// Acquired column shown in each regridded column.
    pub source_columns: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct LineScanRegridder {
    config: LineScanConfig,
}

impl LineScanRegridder {
    pub fn new(config: LineScanConfig) -> Self {
        Self { config }
    }

    pub fn regrid(&self, image: &Image, energies: &[f64]) -> Result<RegriddedScan> {
        if energies.len() != image.width() {
            return Err(Error::EnergyCountMismatch {
                energies: energies.len(),
                columns: image.width(),
            });
        }
        let (&first, &last) = match (energies.first(), energies.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::EmptyLineScan),
        };
        if let Some(index) = energies
            .iter()
            .enumerate()
            .position(|(i, e)| !e.is_finite() || (i > 0 && *e < energies[i - 1]))
        {
            return Err(Error::UnsortedEnergies { index });
        }

        let step = self.config.energy_step;
        let estimated = ((last - first) / step).ceil() as usize + 1;
        if estimated > self.config.max_columns {
            return Err(Error::GridTooLarge {
                columns: estimated,
                limit: self.config.max_columns,
            });
        }

        let mut grid: Vec<f64> = (0..)
            .map(|m| first + m as f64 * step)
            .take_while(|&e| e < last)
            .collect();

        let mut source_columns = Vec::with_capacity(grid.len() + 1);
        let mut source = 0;
        for &e in &grid {
            while source + 1 < energies.len() && energies[source + 1] <= e {
                source += 1;
            }
            source_columns.push(source);
        }
        source_columns.push(energies.len() - 1);
        grid.push(last);

        let regridded = Image::from_fn(source_columns.len(), image.height(), |x, y| {
            image[(source_columns[x], y)]
        });

        tracing::debug!(
            acquired = energies.len(),
            regridded = source_columns.len(),
            step,
            "Regridded line scan"
        );

        Ok(RegriddedScan {
            image: regridded,
            energies: grid,
            source_columns,
        })
    }
}
