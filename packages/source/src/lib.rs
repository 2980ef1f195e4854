#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Reference dataset access.
//!
//! Each backend implements the [`FeatureSource`] trait to fetch vector
//! features (optionally restricted to a bounding box) and raster layers
//! by datasource URL. Local files, HTTP and in-memory fixtures are
//! supported.

pub mod file;
pub mod http;
pub mod memory;
pub mod retry;

pub use file::FileSource;
pub use http::HttpSource;
pub use memory::MemorySource;

use std::sync::Arc;

use async_trait::async_trait;
use geo::{BoundingRect, Intersects, Rect};
use geojson::GeoJson;
use mpa_report_raster::{GridRaster, RasterError};

/// Errors that can occur while fetching reference data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unusable status.
    #[error("HTTP status error: {message}")]
    Status {
        /// Description of what went wrong.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Raster parsing failed.
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No dataset is registered under the URL.
    #[error("Dataset not found: {url}")]
    NotFound {
        /// The requested URL.
        url: String,
    },
}

/// Trait that all reference data backends implement.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetches the features of a vector dataset. When `bbox` is given,
    /// only features whose bounding box intersects it are returned, in
    /// dataset order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the dataset cannot be read or parsed.
    async fn fetch_features(
        &self,
        url: &str,
        bbox: Option<&Rect<f64>>,
    ) -> Result<Vec<geojson::Feature>, SourceError>;

    /// Fetches a raster layer.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the layer cannot be read or parsed.
    async fn fetch_raster(&self, url: &str) -> Result<GridRaster, SourceError>;
}

/// Chooses a backend for a data base URL: `http(s)://` selects
/// [`HttpSource`], anything else (including `file://`) selects
/// [`FileSource`].
#[must_use]
pub fn source_for_base_url(base_url: &str) -> Arc<dyn FeatureSource> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        log::debug!("Using HTTP reference data at {base_url}");
        Arc::new(HttpSource::new(base_url))
    } else {
        let root = base_url.strip_prefix("file://").unwrap_or(base_url);
        log::debug!("Using file reference data at {root}");
        Arc::new(FileSource::new(root))
    }
}

/// Parses a `GeoJSON` document into a list of features. A bare geometry
/// or single feature becomes a one-element list.
///
/// # Errors
///
/// Returns [`SourceError::GeoJson`] if the document is not valid `GeoJSON`.
pub fn parse_features(json: &str) -> Result<Vec<geojson::Feature>, SourceError> {
    Ok(match json.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![geojson::Feature {
            geometry: Some(geometry),
            ..geojson::Feature::default()
        }],
    })
}

/// Keeps features whose geometry bounding box intersects `bbox`.
/// Features without a geometry are dropped.
#[must_use]
pub fn filter_by_bbox(features: Vec<geojson::Feature>, bbox: Option<&Rect<f64>>) -> Vec<geojson::Feature> {
    let Some(bbox) = bbox else {
        return features;
    };

    let before = features.len();
    let kept: Vec<_> = features
        .into_iter()
        .filter(|feature| {
            feature
                .geometry
                .clone()
                .and_then(|g| geo::Geometry::<f64>::try_from(g).ok())
                .and_then(|g| g.bounding_rect())
                .is_some_and(|rect| rect.intersects(bbox))
        })
        .collect();

    log::debug!("Bounding box filter kept {} of {before} features", kept.len());
    kept
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Three features: a polygon near the origin, a point far away and a
    /// feature with no geometry.
    pub const FEATURES: &str = r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature", "properties": { "class": "reef" },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] } },
        { "type": "Feature", "properties": { "class": "island" },
          "geometry": { "type": "Point", "coordinates": [50, 50] } },
        { "type": "Feature", "properties": {}, "geometry": null }
    ] }"#;

    pub const RASTER: &str = r#"{ "crs": "wgs84", "origin": [0, 1], "cellSize": [1, 1],
        "width": 1, "height": 1, "values": [7] }"#;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn parses_collections_and_bare_geometries() {
        assert_eq!(parse_features(test_support::FEATURES).unwrap().len(), 3);
        let single = parse_features(r#"{ "type": "Point", "coordinates": [1, 2] }"#).unwrap();
        assert_eq!(single.len(), 1);
        assert!(single[0].geometry.is_some());
    }

    #[test]
    fn bbox_filter_keeps_intersecting_features() {
        let features = parse_features(test_support::FEATURES).unwrap();
        let bbox = Rect::new(coord! { x: 0.5, y: 0.5 }, coord! { x: 2.0, y: 2.0 });

        let kept = filter_by_bbox(features.clone(), Some(&bbox));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].property("class"), Some(&serde_json::json!("reef")));

        assert_eq!(filter_by_bbox(features, None).len(), 3);
    }
}
