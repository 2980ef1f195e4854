//! Line overlap engine.

use std::collections::BTreeSet;

use geo::{BoundingRect, Intersects, MultiLineString, MultiPolygon};
use mpa_report_metric_models::Metric;
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{FeatureIndex, ReferenceFeature, buffer_km, is_degenerate};

/// Buffer applied around sketches when counting nearby waterways.
pub const WATERWAY_BUFFER_KM: f64 = 1.0;

/// Counts reference lines intersecting any child buffered by `buffer`
/// kilometres. A line near several children counts once. Touching the
/// buffered boundary counts as intersecting.
///
/// Returns a single metric for the sketch, or nothing when no child has
/// usable geometry.
#[must_use]
pub fn overlap_line_count(
    metric_id: &str,
    features: &[ReferenceFeature<MultiLineString<f64>>],
    sketch: &Sketch,
    buffer: f64,
) -> Vec<Metric> {
    let buffered: Vec<MultiPolygon<f64>> = sketch
        .children()
        .iter()
        .filter(|child| !is_degenerate(&child.geometry))
        .map(|child| buffer_km(&child.geometry, buffer))
        .collect();

    if buffered.is_empty() {
        log::debug!("{metric_id}: sketch {} has no geometry to buffer", sketch.id());
        return vec![];
    }

    let index = FeatureIndex::new(features);
    let mut matched = BTreeSet::new();
    for geometry in &buffered {
        let Some(rect) = geometry.bounding_rect() else {
            continue;
        };
        matched.extend(
            index
                .candidates(&rect)
                .into_iter()
                .filter(|&i| features[i].geometry.intersects(geometry))
                .map(|i| features[i].index),
        );
    }

    #[allow(clippy::cast_precision_loss)]
    let count = matched.len() as f64;
    vec![Metric::new(metric_id, Some(count)).with_sketch(sketch.id())]
}
