//! Polygon overlap engine.

use std::collections::BTreeSet;

use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon};
use mpa_report_metric_models::Metric;
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{
    FeatureIndex, ReferenceFeature, dissolve_children, geodesic_area, is_degenerate,
};

use crate::{child_metric, collection_metric};

/// Area of `geometry` covered by the indexed reference polygons, in
/// square metres. `None` for degenerate geometry.
fn covered_area(
    geometry: &MultiPolygon<f64>,
    features: &[ReferenceFeature<MultiPolygon<f64>>],
    index: &FeatureIndex,
) -> Option<f64> {
    if is_degenerate(geometry) {
        return None;
    }
    let rect = geometry.bounding_rect()?;

    Some(
        index
            .candidates(&rect)
            .into_iter()
            .map(|i| geodesic_area(&geometry.intersection(&features[i].geometry)))
            .sum(),
    )
}

/// Area of overlap between reference polygons and each child, plus for
/// collections a rollup that never double counts overlapping children.
///
/// Reference polygons are assumed not to overlap each other.
#[must_use]
pub fn overlap_polygon_area(
    metric_id: &str,
    features: &[ReferenceFeature<MultiPolygon<f64>>],
    sketch: &Sketch,
) -> Vec<Metric> {
    let index = FeatureIndex::new(features);

    let mut metrics: Vec<Metric> = sketch
        .children()
        .iter()
        .map(|child| child_metric(metric_id, child, covered_area(&child.geometry, features, &index)))
        .collect();

    if sketch.is_collection() {
        let dissolved = dissolve_children(sketch);
        let value = if dissolved.overlapping {
            covered_area(&dissolved.geometry, features, &index)
        } else {
            metrics
                .iter()
                .filter_map(|m| m.value)
                .reduce(|a, b| a + b)
        };
        metrics.push(collection_metric(metric_id, sketch, value));
    }

    log::debug!("{metric_id}: polygon area overlap over {} features", features.len());
    metrics
}

/// Positions of features whose geometry intersects `geometry`.
fn intersecting(
    geometry: &MultiPolygon<f64>,
    features: &[ReferenceFeature<MultiPolygon<f64>>],
    index: &FeatureIndex,
) -> BTreeSet<usize> {
    let Some(rect) = geometry.bounding_rect() else {
        return BTreeSet::new();
    };
    index
        .candidates(&rect)
        .into_iter()
        .filter(|&i| features[i].geometry.intersects(geometry))
        .collect()
}

/// Sum of a numeric property over reference polygons intersecting each
/// child. The collection rollup counts each feature once even when it
/// touches several children. Features lacking the property contribute
/// nothing.
#[must_use]
pub fn overlap_polygon_sum(
    metric_id: &str,
    features: &[ReferenceFeature<MultiPolygon<f64>>],
    sketch: &Sketch,
    sum_property: &str,
) -> Vec<Metric> {
    let index = FeatureIndex::new(features);
    let sum = |positions: &BTreeSet<usize>| -> f64 {
        positions
            .iter()
            .filter_map(|&i| features[i].number_property(sum_property))
            .sum()
    };

    let mut seen = BTreeSet::new();
    let mut metrics = vec![];
    for child in sketch.children() {
        if is_degenerate(&child.geometry) {
            metrics.push(child_metric(metric_id, child, None));
            continue;
        }
        let positions = intersecting(&child.geometry, features, &index);
        metrics.push(child_metric(metric_id, child, Some(sum(&positions))));
        seen.extend(positions);
    }

    if sketch.is_collection() {
        metrics.push(collection_metric(metric_id, sketch, Some(sum(&seen))));
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection, single, square};
    use geojson::JsonObject;

    fn polygons(geometries: Vec<(MultiPolygon<f64>, f64)>) -> Vec<ReferenceFeature<MultiPolygon<f64>>> {
        geometries
            .into_iter()
            .enumerate()
            .map(|(index, (geometry, population))| {
                let mut properties = JsonObject::new();
                properties.insert("Population".to_string(), population.into());
                ReferenceFeature {
                    index,
                    id: None,
                    properties,
                    geometry,
                }
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() / b.abs().max(1.0) < 1e-6
    }

    #[test]
    fn disjoint_partial_and_contained_overlaps() {
        let features = polygons(vec![(square(0.0, 0.0, 0.1), 0.0)]);
        let full = geodesic_area(&square(0.0, 0.0, 0.1));

        let disjoint = overlap_polygon_area("size", &features, &single(square(1.0, 1.0, 0.1)));
        assert_eq!(disjoint[0].value, Some(0.0));

        let partial = overlap_polygon_area("size", &features, &single(square(0.05, 0.0, 0.1)));
        assert!((partial[0].value.unwrap() / full - 0.5).abs() < 1e-3);

        let contains = overlap_polygon_area("size", &features, &single(square(-1.0, -1.0, 2.0)));
        assert!(close(contains[0].value.unwrap(), full));
    }

    #[test]
    fn disjoint_children_roll_up_to_sum() {
        let features = polygons(vec![(square(0.0, 0.0, 1.0), 0.0)]);
        let sketch = collection(vec![square(0.0, 0.0, 0.1), square(0.5, 0.5, 0.1)]);
        let metrics = overlap_polygon_area("size", &features, &sketch);

        let sum = metrics[0].value.unwrap() + metrics[1].value.unwrap();
        assert!(metrics[2].is_collection());
        assert!(close(metrics[2].value.unwrap(), sum));
    }

    #[test]
    fn overlapping_children_roll_up_to_dissolved_area() {
        let features = polygons(vec![(square(0.0, 0.0, 1.0), 0.0)]);
        let sketch = collection(vec![square(0.0, 0.0, 0.1), square(0.05, 0.0, 0.1)]);
        let metrics = overlap_polygon_area("size", &features, &sketch);

        let naive = metrics[0].value.unwrap() + metrics[1].value.unwrap();
        let rollup = metrics[2].value.unwrap();
        assert!(rollup < naive);
        assert!((rollup / (naive * 0.75) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn degenerate_child_has_null_area() {
        let features = polygons(vec![(square(0.0, 0.0, 1.0), 0.0)]);
        let metrics = overlap_polygon_area("size", &features, &single(MultiPolygon(vec![])));
        assert_eq!(metrics[0].value, None);
    }

    #[test]
    fn polygon_sum_counts_shared_feature_once_in_rollup() {
        let features = polygons(vec![
            (square(0.09, 0.0, 0.02), 100.0),
            (square(0.0, 0.5, 0.02), 7.0),
            (square(5.0, 5.0, 1.0), 1000.0),
        ]);
        let sketch = collection(vec![square(0.0, 0.0, 0.1), square(0.1, 0.0, 0.1)]);
        let metrics = overlap_polygon_sum("population", &features, &sketch, "Population");

        assert_eq!(metrics[0].value, Some(100.0));
        assert_eq!(metrics[1].value, Some(100.0));
        assert_eq!(metrics[2].value, Some(100.0));
    }
}
