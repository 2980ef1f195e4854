#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Gridded raster layers and zonal statistics.
//!
//! A [`GridRaster`] is a north-up grid of cell values in either WGS84 or
//! Web Mercator. Zonal statistics consider every valid cell whose centre
//! lies within (or on the boundary of) the query geometry.

pub mod projection;
pub mod zonal;

pub use projection::{Crs, to_raster_projection};
pub use zonal::{CategoryArea, RasterStatistics, ZonalStats};

use std::ops::Range;
use std::path::Path;

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Errors from loading or querying rasters.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// No valid cell centre fell inside the query geometry.
    #[error("No values were found within the geometry")]
    NoValuesInGeometry,

    /// The raster header disagrees with its data.
    #[error("Invalid raster: {message}")]
    Shape {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A north-up grid of cell values.
///
/// `values` is row-major starting at the top-left cell. Cells equal to
/// `no_data`, or NaN, are invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRaster {
    pub crs: Crs,
    /// Top-left corner `[x, y]` in raster CRS units.
    pub origin: [f64; 2],
    /// Cell `[width, height]` in raster CRS units.
    pub cell_size: [f64; 2],
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub no_data: Option<f64>,
    pub values: Vec<f64>,
}

impl GridRaster {
    /// Parses and validates a raster from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the header disagrees
    /// with the data.
    pub fn from_json(json: &str) -> Result<Self, RasterError> {
        let raster: Self = serde_json::from_str(json)?;
        raster.validate()?;
        Ok(raster)
    }

    /// Reads and validates a raster JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn read(path: &Path) -> Result<Self, RasterError> {
        let raster = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::debug!(
            "Loaded {}x{} raster ({}) from {}",
            raster.width,
            raster.height,
            raster.crs,
            path.display()
        );
        Ok(raster)
    }

    /// Checks that dimensions and cell sizes are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Shape`] describing the first inconsistency.
    pub fn validate(&self) -> Result<(), RasterError> {
        let expected = self.width * self.height;
        if self.values.len() != expected {
            return Err(RasterError::Shape {
                message: format!(
                    "{}x{} grid needs {expected} values, found {}",
                    self.width,
                    self.height,
                    self.values.len()
                ),
            });
        }
        if !(self.cell_size[0] > 0.0 && self.cell_size[1] > 0.0) {
            return Err(RasterError::Shape {
                message: format!("cell size must be positive, got {:?}", self.cell_size),
            });
        }
        Ok(())
    }

    /// Valid value at a cell, or `None` for nodata.
    #[must_use]
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let value = self.values[row * self.width + col];
        if value.is_nan() || self.no_data.is_some_and(|nd| (value - nd).abs() < f64::EPSILON) {
            return None;
        }
        Some(value)
    }

    /// Cell centre in raster CRS units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_centre(&self, col: usize, row: usize) -> Coord<f64> {
        Coord {
            x: (col as f64 + 0.5).mul_add(self.cell_size[0], self.origin[0]),
            y: (row as f64 + 0.5).mul_add(-self.cell_size[1], self.origin[1]),
        }
    }

    /// Ground area of one cell in the given row, in square metres.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_area_m2(&self, row: usize) -> f64 {
        let [cell_width, cell_height] = self.cell_size;
        match self.crs {
            Crs::Wgs84 => {
                let top = (row as f64).mul_add(-cell_height, self.origin[1]);
                let bottom = top - cell_height;
                let r = projection::EARTH_RADIUS_M;
                r * r
                    * cell_width.to_radians()
                    * (top.to_radians().sin() - bottom.to_radians().sin()).abs()
            }
            Crs::WebMercator => {
                let lat = projection::mercator_latitude(self.cell_centre(0, row).y);
                let scale = lat.to_radians().cos();
                cell_width * cell_height * scale * scale
            }
        }
    }

    /// Column and row ranges of cells overlapping `rect` (raster CRS).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn cell_window(&self, rect: &Rect<f64>) -> (Range<usize>, Range<usize>) {
        let [cell_width, cell_height] = self.cell_size;
        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;

        let col_start = clamp(((rect.min().x - self.origin[0]) / cell_width).floor(), self.width);
        let col_end = clamp(((rect.max().x - self.origin[0]) / cell_width).ceil(), self.width);
        let row_start = clamp(((self.origin[1] - rect.max().y) / cell_height).floor(), self.height);
        let row_end = clamp(((self.origin[1] - rect.min().y) / cell_height).ceil(), self.height);

        (col_start..col_end, row_start..row_end)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// 4x4 one-degree grid anchored at (0, 4) with values 1..=16 and a
    /// nodata cell at the top-left.
    pub fn grid() -> GridRaster {
        let mut values: Vec<f64> = (1..=16).map(f64::from).collect();
        values[0] = -9999.0;
        GridRaster {
            crs: Crs::Wgs84,
            origin: [0.0, 4.0],
            cell_size: [1.0, 1.0],
            width: 4,
            height: 4,
            no_data: Some(-9999.0),
            values,
        }
    }
}
