//! Zonal statistics over cells whose centre falls within a geometry.

use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use serde::Serialize;

use crate::projection::to_raster_projection;
use crate::{GridRaster, RasterError};

/// Statistics over the valid cells within a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonalStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
    /// Number of valid cells.
    pub valid: usize,
    /// Ground area of the valid cells in square metres.
    pub area: f64,
}

/// Ground area covered by one categorical class value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryArea {
    pub value: f64,
    pub count: usize,
    /// Square metres.
    pub area: f64,
}

/// Raster layers that can summarise the cells under a WGS84 geometry.
pub trait RasterStatistics {
    /// Quantitative statistics of valid cells within `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::NoValuesInGeometry`] if no valid cell centre
    /// lies within the geometry.
    fn zonal_stats(&self, geometry: &MultiPolygon<f64>) -> Result<ZonalStats, RasterError>;

    /// Area per categorical value within `geometry`, in the order of
    /// `values`. Values with no cells report zero.
    fn categorical_area(&self, geometry: &MultiPolygon<f64>, values: &[f64]) -> Vec<CategoryArea>;
}

impl GridRaster {
    /// Valid cells whose centre intersects the geometry, as `(row, value)`.
    fn cells_within(&self, geometry: &MultiPolygon<f64>) -> Vec<(usize, f64)> {
        let projected = to_raster_projection(geometry, self.crs);
        let Some(rect) = projected.bounding_rect() else {
            return vec![];
        };
        let (cols, rows) = self.cell_window(&rect);

        let mut cells = vec![];
        for row in rows {
            for col in cols.clone() {
                let Some(value) = self.value(col, row) else {
                    continue;
                };
                if projected.intersects(&Point::from(self.cell_centre(col, row))) {
                    cells.push((row, value));
                }
            }
        }
        cells
    }
}

impl RasterStatistics for GridRaster {
    #[allow(clippy::cast_precision_loss)]
    fn zonal_stats(&self, geometry: &MultiPolygon<f64>) -> Result<ZonalStats, RasterError> {
        let cells = self.cells_within(geometry);
        if cells.is_empty() {
            return Err(RasterError::NoValuesInGeometry);
        }

        let mut stats = ZonalStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            sum: 0.0,
            valid: cells.len(),
            area: 0.0,
        };
        for &(row, value) in &cells {
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
            stats.sum += value;
            stats.area += self.cell_area_m2(row);
        }
        stats.mean = stats.sum / cells.len() as f64;

        Ok(stats)
    }

    fn categorical_area(&self, geometry: &MultiPolygon<f64>, values: &[f64]) -> Vec<CategoryArea> {
        let mut areas: Vec<CategoryArea> = values
            .iter()
            .map(|&value| CategoryArea {
                value,
                count: 0,
                area: 0.0,
            })
            .collect();

        for (row, cell) in self.cells_within(geometry) {
            if let Some(entry) = areas.iter_mut().find(|a| (a.value - cell).abs() < 1e-9) {
                entry.count += 1;
                entry.area += self.cell_area_m2(row);
            }
        }

        areas
    }
}
