//! Point overlap engine.
//!
//! Per-child values use plain point-in-polygon containment, so a point in
//! the overlap of two children counts toward both. The collection rollup
//! counts each point once: when children overlap, points are tested
//! against the dissolved union; otherwise the child values are summed.

use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use mpa_report_metric_models::Metric;
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{ReferenceFeature, dissolve_children, is_degenerate};

use crate::{child_metric, collection_metric};

/// Default number of points tested per batch.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Options for [`overlap_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointOverlapOptions<'a> {
    /// Points are tested in batches of this size.
    pub chunk_size: usize,
    /// Whether collections also report one metric per child.
    pub include_child_metrics: bool,
    /// Sum this numeric property instead of counting points.
    pub sum_property: Option<&'a str>,
}

impl Default for PointOverlapOptions<'_> {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            include_child_metrics: true,
            sum_property: None,
        }
    }
}

/// Count (or property sum) of points within `geometry`, boundary
/// inclusive. `None` for degenerate geometry.
fn points_within(
    geometry: &MultiPolygon<f64>,
    features: &[ReferenceFeature<Point<f64>>],
    options: &PointOverlapOptions<'_>,
) -> Option<f64> {
    if is_degenerate(geometry) {
        return None;
    }
    let rect = geometry.bounding_rect()?;

    let weight = |feature: &ReferenceFeature<Point<f64>>| match options.sum_property {
        Some(property) => feature.number_property(property).unwrap_or(0.0),
        None => 1.0,
    };

    Some(
        features
            .chunks(options.chunk_size.max(1))
            .map(|chunk| {
                chunk
                    .iter()
                    .filter(|f| rect.intersects(&f.geometry) && geometry.intersects(&f.geometry))
                    .map(weight)
                    .sum::<f64>()
            })
            .sum(),
    )
}

/// Point count or sum per child plus, for collections, a rollup that
/// counts points in overlapping children once.
#[must_use]
pub fn overlap_point(
    metric_id: &str,
    features: &[ReferenceFeature<Point<f64>>],
    sketch: &Sketch,
    options: &PointOverlapOptions<'_>,
) -> Vec<Metric> {
    let child_metrics: Vec<Metric> = sketch
        .children()
        .iter()
        .map(|child| child_metric(metric_id, child, points_within(&child.geometry, features, options)))
        .collect();

    if !sketch.is_collection() {
        return child_metrics;
    }

    let dissolved = dissolve_children(sketch);
    let total = if dissolved.overlapping {
        log::debug!("{metric_id}: children overlap, counting against dissolved union");
        points_within(&dissolved.geometry, features, options)
    } else {
        child_metrics.iter().filter_map(|m| m.value).reduce(|a, b| a + b)
    };
    let rollup = collection_metric(metric_id, sketch, total);

    let mut metrics = if options.include_child_metrics {
        child_metrics
    } else {
        vec![]
    };
    metrics.push(rollup);
    metrics
}
