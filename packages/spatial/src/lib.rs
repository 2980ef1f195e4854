#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geometry utilities shared by the overlap engines.
//!
//! Dissolves sketch collections into non-overlapping regions, measures
//! geodesic area, buffers by kilometres, clips sketches to planning
//! geographies, and prefilters reference features through an R-tree of
//! bounding boxes before exact geometry predicates run.

pub mod buffer;
pub mod clip;
pub mod feature;
pub mod index;
pub mod union;

pub use buffer::buffer_km;
pub use clip::{clip_to_geography, is_degenerate};
pub use feature::ReferenceFeature;
pub use index::FeatureIndex;
pub use union::{Dissolved, dissolve_children, geodesic_area, has_overlap, union_all, union_children};

use geo::BoundingRect;
use rstar::AABB;

/// Compute the bounding box envelope for any geometry with a bounding
/// rectangle. Empty geometries collapse to the origin.
#[must_use]
pub fn compute_envelope<G>(geometry: &G) -> AABB<[f64; 2]>
where
    G: BoundingRect<f64>,
    G::Output: Into<Option<geo::Rect<f64>>>,
{
    geometry.bounding_rect().into().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use geo::{MultiPolygon, Rect, coord};

    /// Axis-aligned square polygon in degrees.
    pub fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(
                coord! { x: min_x, y: min_y },
                coord! { x: min_x + size, y: min_y + size },
            )
            .to_polygon(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    #[test]
    fn envelope_of_empty_geometry_is_origin() {
        let envelope = compute_envelope(&MultiPolygon::<f64>(vec![]));
        assert_eq!(envelope, AABB::from_point([0.0, 0.0]));
    }
}
