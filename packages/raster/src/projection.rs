//! Raster coordinate reference systems.

use geo::{Coord, MapCoords, MultiPolygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Mean earth radius in metres, for cell areas on the sphere.
pub(crate) const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Spherical Web Mercator radius in metres.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of Web Mercator.
const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Supported raster coordinate systems.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Longitude/latitude degrees (EPSG:4326).
    #[serde(alias = "EPSG:4326")]
    #[strum(to_string = "EPSG:4326", serialize = "wgs84")]
    Wgs84,
    /// Spherical Mercator metres (EPSG:3857).
    #[serde(alias = "EPSG:3857")]
    #[strum(to_string = "EPSG:3857", serialize = "web_mercator")]
    WebMercator,
}

/// Projects a WGS84 coordinate into Web Mercator metres.
#[must_use]
pub fn mercator_forward(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    Coord {
        x: MERCATOR_RADIUS_M * c.x.to_radians(),
        y: MERCATOR_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Latitude in degrees of a Web Mercator northing.
#[must_use]
pub fn mercator_latitude(y: f64) -> f64 {
    (2.0f64.mul_add((y / MERCATOR_RADIUS_M).exp().atan(), -std::f64::consts::FRAC_PI_2)).to_degrees()
}

/// Reprojects a WGS84 geometry into the raster's coordinate system.
#[must_use]
pub fn to_raster_projection(geometry: &MultiPolygon<f64>, crs: Crs) -> MultiPolygon<f64> {
    match crs {
        Crs::Wgs84 => geometry.clone(),
        Crs::WebMercator => geometry.map_coords(mercator_forward),
    }
}
