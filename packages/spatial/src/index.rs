//! R-tree bounding-box prefilter over reference features.
//!
//! Exact intersection tests are expensive, so engines first ask the index
//! which features have envelopes overlapping a sketch's bounding box and
//! only run exact predicates on those candidates.

use geo::{BoundingRect, Rect};
use rstar::{AABB, RTree, RTreeObject};

use crate::compute_envelope;
use crate::feature::ReferenceFeature;

/// A feature envelope stored in the R-tree.
struct IndexEntry {
    /// Position of the feature in the indexed slice.
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bounding-box index over a slice of reference features.
pub struct FeatureIndex {
    tree: RTree<IndexEntry>,
}

impl FeatureIndex {
    /// Bulk-loads envelopes for every feature.
    #[must_use]
    pub fn new<G>(features: &[ReferenceFeature<G>]) -> Self
    where
        G: BoundingRect<f64>,
        G::Output: Into<Option<Rect<f64>>>,
    {
        let entries = features
            .iter()
            .enumerate()
            .map(|(position, feature)| IndexEntry {
                position,
                envelope: compute_envelope(&feature.geometry),
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Positions of features whose envelope intersects `rect`, ascending.
    #[must_use]
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let query = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Number of indexed features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::square;
    use geo::coord;

    fn feature(index: usize, x: f64, y: f64) -> ReferenceFeature<geo::MultiPolygon<f64>> {
        ReferenceFeature {
            index,
            id: None,
            properties: geojson::JsonObject::new(),
            geometry: square(x, y, 1.0),
        }
    }

    #[test]
    fn returns_only_overlapping_envelopes() {
        let features = vec![feature(0, 0.0, 0.0), feature(1, 5.0, 5.0), feature(2, 0.5, 0.5)];
        let index = FeatureIndex::new(&features);
        assert_eq!(index.len(), 3);

        let rect = Rect::new(coord! { x: 0.2, y: 0.2 }, coord! { x: 0.8, y: 0.8 });
        assert_eq!(index.candidates(&rect), vec![0, 2]);
    }

    #[test]
    fn touching_envelopes_are_candidates() {
        let features = vec![feature(0, 0.0, 0.0)];
        let index = FeatureIndex::new(&features);
        let rect = Rect::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 2.0, y: 2.0 });
        assert_eq!(index.candidates(&rect), vec![0]);
    }
}
