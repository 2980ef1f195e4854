//! Dissolving sketch children and measuring area.

use geo::{BooleanOps, GeodesicArea, MultiPolygon};
use mpa_report_sketch_models::{Sketch, SketchFeature};
use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};

use crate::compute_envelope;
use crate::clip::is_degenerate;

/// Shared area, relative to the smaller child, below which two children
/// only touch. Clipping snaps coordinates and leaves slivers along shared
/// edges.
const OVERLAP_TOLERANCE: f64 = 1e-6;

/// Geodesic area of a multipolygon in square metres.
#[must_use]
pub fn geodesic_area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.geodesic_area_unsigned()
}

/// Unions every geometry into a single multipolygon. Empty inputs are
/// skipped; no input yields an empty multipolygon.
pub fn union_all<'a>(geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    geometries
        .into_iter()
        .filter(|g| !g.0.is_empty())
        .fold(MultiPolygon(vec![]), |acc, g| {
            if acc.0.is_empty() {
                g.clone()
            } else {
                acc.union(g)
            }
        })
}

/// A sketch's children dissolved into one geometry.
#[derive(Debug, Clone)]
pub struct Dissolved {
    pub geometry: MultiPolygon<f64>,
    /// Whether any two children share area.
    pub overlapping: bool,
}

/// Dissolves all children of a sketch and detects whether they overlap.
#[must_use]
pub fn dissolve_children(sketch: &Sketch) -> Dissolved {
    let children = sketch.children();
    let geometry = union_all(children.iter().map(|c| &c.geometry));

    if children.len() < 2 {
        return Dissolved {
            geometry,
            overlapping: false,
        };
    }

    let overlapping = match overlapping_pair(children) {
        Some((a, b)) => {
            log::debug!(
                "Sketch {} children {} and {} overlap",
                sketch.id(),
                children[a].id,
                children[b].id
            );
            true
        }
        None => false,
    };

    Dissolved {
        geometry,
        overlapping,
    }
}

/// First pair of children sharing area. Candidate pairs come from an
/// R-tree of child envelopes; each candidate is confirmed by the geodesic
/// area of the exact intersection.
fn overlapping_pair(children: &[SketchFeature]) -> Option<(usize, usize)> {
    let envelopes: Vec<GeomWithData<Rectangle<[f64; 2]>, usize>> = children
        .iter()
        .enumerate()
        .filter(|(_, c)| !is_degenerate(&c.geometry))
        .map(|(i, c)| GeomWithData::new(Rectangle::from_aabb(compute_envelope(&c.geometry)), i))
        .collect();
    let tree = RTree::bulk_load(envelopes);

    let mut pairs: Vec<(usize, usize)> = tree
        .intersection_candidates_with_other_tree(&tree)
        .map(|(a, b)| (a.data, b.data))
        .filter(|(a, b)| a < b)
        .collect();
    pairs.sort_unstable();

    pairs.into_iter().find(|&(a, b)| {
        let (a_geom, b_geom) = (&children[a].geometry, &children[b].geometry);
        let shared = geodesic_area(&a_geom.intersection(b_geom));
        let smaller = geodesic_area(a_geom).min(geodesic_area(b_geom));
        shared > smaller * OVERLAP_TOLERANCE
    })
}

/// Union of all children of a sketch.
#[must_use]
pub fn union_children(sketch: &Sketch) -> MultiPolygon<f64> {
    union_all(sketch.children().iter().map(|c| &c.geometry))
}

/// Whether any two children of a sketch overlap.
#[must_use]
pub fn has_overlap(sketch: &Sketch) -> bool {
    dissolve_children(sketch).overlapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;
    use mpa_report_sketch_models::{SketchCollection, SketchFeature};

    fn collection(children: Vec<MultiPolygon<f64>>) -> Sketch {
        Sketch::Collection(SketchCollection::new(
            "c",
            "Collection",
            children
                .into_iter()
                .enumerate()
                .map(|(i, g)| SketchFeature::new(format!("s{i}"), format!("Sketch {i}"), g))
                .collect(),
        ))
    }

    #[test]
    fn one_degree_square_at_equator_is_about_12300_km2() {
        let area = geodesic_area(&square(0.0, 0.0, 1.0));
        assert!((area / 1e6 - 12_308.0).abs() < 50.0, "area was {area}");
    }

    #[test]
    fn disjoint_children_do_not_overlap() {
        let sketch = collection(vec![square(0.0, 0.0, 0.1), square(1.0, 1.0, 0.1)]);
        let dissolved = dissolve_children(&sketch);
        assert!(!dissolved.overlapping);
        assert_eq!(dissolved.geometry.0.len(), 2);
    }

    #[test]
    fn overlapping_children_are_detected_and_merged() {
        let sketch = collection(vec![square(0.0, 0.0, 0.1), square(0.05, 0.0, 0.1)]);
        assert!(has_overlap(&sketch));

        let merged = union_children(&sketch);
        assert_eq!(merged.0.len(), 1);
        let expected = geodesic_area(&square(0.0, 0.0, 0.1)) * 1.5;
        assert!((geodesic_area(&merged) - expected).abs() / expected < 1e-3);
    }

    #[test]
    fn disjoint_children_near_vanuatu_do_not_overlap() {
        let sketch = collection(vec![
            square(168.10, -17.80, 0.05),
            square(168.30, -17.75, 0.05),
            square(168.50, -17.70, 0.05),
        ]);
        let dissolved = dissolve_children(&sketch);
        assert!(!dissolved.overlapping);
        assert_eq!(dissolved.geometry.0.len(), 3);
    }

    #[test]
    fn children_sharing_an_edge_do_not_overlap() {
        let sketch = collection(vec![square(168.0, -17.0, 0.1), square(168.1, -17.0, 0.1)]);
        assert!(!has_overlap(&sketch));
    }

    #[test]
    fn small_overlap_between_distant_children_is_detected() {
        let sketch = collection(vec![
            square(168.0, -17.0, 0.1),
            square(169.0, -17.0, 0.1),
            square(168.095, -17.0, 0.1),
        ]);
        assert!(has_overlap(&sketch));
    }

    #[test]
    fn single_sketch_never_overlaps() {
        let sketch = Sketch::Single(SketchFeature::new("a", "A", square(0.0, 0.0, 1.0)));
        assert!(!has_overlap(&sketch));
    }

    #[test]
    fn union_of_nothing_is_empty() {
        assert!(union_all(std::iter::empty()).0.is_empty());
    }
}
