#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Overlap engines.
//!
//! Each engine takes a [`Sketch`] and a reference dataset of one geometry
//! type and produces [`Metric`]s: one per child sketch for drill-down and,
//! for collections, one rollup flagged `isCollection`. Rollups are always
//! computed against the dissolved union of children so overlapping
//! children never double count.

pub mod line;
pub mod point;
pub mod polygon;
pub mod raster;

pub use line::{WATERWAY_BUFFER_KM, overlap_line_count};
pub use point::{PointOverlapOptions, overlap_point};
pub use polygon::{overlap_polygon_area, overlap_polygon_sum};
pub use raster::{RasterExtremes, RasterStat, raster_extremes, raster_metrics};

use mpa_report_metric_models::Metric;
use mpa_report_raster::RasterError;
use mpa_report_sketch_models::{Sketch, SketchFeature};

/// Errors that can occur while computing overlap.
#[derive(Debug, thiserror::Error)]
pub enum OverlapError {
    /// Raster statistics failed for a reason other than an empty zone.
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
}

/// Metric for one child sketch, annotated with its name.
fn child_metric(metric_id: &str, child: &SketchFeature, value: Option<f64>) -> Metric {
    Metric::new(metric_id, value)
        .with_sketch(child.id.as_str())
        .with_extra("sketchName", child.name.as_str())
}

/// Rollup metric for a whole collection.
fn collection_metric(metric_id: &str, sketch: &Sketch, value: Option<f64>) -> Metric {
    Metric::new(metric_id, value)
        .with_sketch(sketch.id())
        .with_extra("sketchName", sketch.name())
        .with_extra("isCollection", true)
}

#[cfg(test)]
pub(crate) mod test_support {
    use geo::{Coord, LineString, MultiPolygon, Polygon, Rect, coord};
    use mpa_report_sketch_models::{Sketch, SketchCollection, SketchFeature};

    pub fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(
                coord! { x: min_x, y: min_y },
                coord! { x: min_x + size, y: min_y + size },
            )
            .to_polygon(),
        ])
    }

    /// Approximate circle as a 64-gon, in degrees.
    pub fn circle(x: f64, y: f64, radius: f64) -> MultiPolygon<f64> {
        let ring: Vec<Coord<f64>> = (0..=64)
            .map(|i| {
                let angle = f64::from(i) / 64.0 * std::f64::consts::TAU;
                coord! { x: radius.mul_add(angle.cos(), x), y: radius.mul_add(angle.sin(), y) }
            })
            .collect();
        MultiPolygon(vec![Polygon::new(LineString(ring), vec![])])
    }

    pub fn collection(children: Vec<MultiPolygon<f64>>) -> Sketch {
        Sketch::Collection(SketchCollection::new(
            "collection",
            "Collection",
            children
                .into_iter()
                .enumerate()
                .map(|(i, g)| SketchFeature::new(format!("child{i}"), format!("Child {i}"), g))
                .collect(),
        ))
    }

    pub fn single(geometry: MultiPolygon<f64>) -> Sketch {
        Sketch::Single(SketchFeature::new("single", "Single", geometry))
    }
}
