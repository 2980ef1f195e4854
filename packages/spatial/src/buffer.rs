//! Outward buffering by a distance in kilometres.
//!
//! Geometries are in longitude/latitude degrees. They are projected into a
//! local equirectangular plane centred on their bounding box, buffered in
//! metres, and projected back.

use geo::{BoundingRect, Buffer, Coord, MapCoords, MultiPolygon};

/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

struct LocalPlane {
    lon0: f64,
    lat0: f64,
    cos_lat0: f64,
}

impl LocalPlane {
    fn centred_on(geometry: &MultiPolygon<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        let centre = rect.center();
        Some(Self {
            lon0: centre.x,
            lat0: centre.y,
            cos_lat0: centre.y.to_radians().cos().max(1e-6),
        })
    }

    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.lon0).to_radians() * EARTH_RADIUS_M * self.cos_lat0,
            y: (c.y - self.lat0).to_radians() * EARTH_RADIUS_M,
        }
    }

    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x / (EARTH_RADIUS_M * self.cos_lat0)).to_degrees() + self.lon0,
            y: (c.y / EARTH_RADIUS_M).to_degrees() + self.lat0,
        }
    }
}

/// Buffers a multipolygon outward by `km` kilometres. Empty input and
/// non-positive distances return the input unchanged.
#[must_use]
pub fn buffer_km(geometry: &MultiPolygon<f64>, km: f64) -> MultiPolygon<f64> {
    if km <= 0.0 {
        return geometry.clone();
    }
    let Some(plane) = LocalPlane::centred_on(geometry) else {
        return geometry.clone();
    };

    let projected = geometry.map_coords(|c| plane.forward(c));
    projected.buffer(km * 1000.0).map_coords(|c| plane.inverse(c))
}
