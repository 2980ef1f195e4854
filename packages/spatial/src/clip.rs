//! Clipping sketches to planning geographies.

use geo::{BooleanOps, CoordsIter, MultiPolygon};
use mpa_report_sketch_models::Sketch;

use crate::union::union_all;

/// Returns a copy of `sketch` with every child intersected with the
/// dissolved geography. A child with no overlap becomes an empty
/// geometry, which [`is_degenerate`] reports as such.
#[must_use]
pub fn clip_to_geography(sketch: &Sketch, geography: &[MultiPolygon<f64>]) -> Sketch {
    let boundary = union_all(geography);

    sketch.with_children_geometry(|child| {
        if boundary.0.is_empty() {
            log::debug!("Geography is empty; child {} clipped to nothing", child.id);
            return MultiPolygon(vec![]);
        }
        let clipped = child.geometry.intersection(&boundary);
        if clipped.0.is_empty() {
            log::debug!("Child {} does not overlap the geography", child.id);
        }
        clipped
    })
}

/// Whether a geometry carries no usable area: no polygons, or every
/// coordinate sits at (0, 0).
#[must_use]
pub fn is_degenerate(geometry: &MultiPolygon<f64>) -> bool {
    geometry.0.is_empty() || geometry.coords_iter().all(|c| c.x.abs() < f64::EPSILON && c.y.abs() < f64::EPSILON)
}
