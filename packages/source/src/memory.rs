//! In-memory reference data, for tests and precomputed fixtures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo::Rect;
use mpa_report_raster::GridRaster;

use crate::{FeatureSource, SourceError, filter_by_bbox};

/// Serves datasets registered by URL.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    features: BTreeMap<String, Vec<geojson::Feature>>,
    rasters: BTreeMap<String, GridRaster>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vector dataset.
    #[must_use]
    pub fn with_features(mut self, url: impl Into<String>, features: Vec<geojson::Feature>) -> Self {
        self.features.insert(url.into(), features);
        self
    }

    /// Registers a raster layer.
    #[must_use]
    pub fn with_raster(mut self, url: impl Into<String>, raster: GridRaster) -> Self {
        self.rasters.insert(url.into(), raster);
        self
    }
}

#[async_trait]
impl FeatureSource for MemorySource {
    async fn fetch_features(
        &self,
        url: &str,
        bbox: Option<&Rect<f64>>,
    ) -> Result<Vec<geojson::Feature>, SourceError> {
        let features = self.features.get(url).ok_or_else(|| SourceError::NotFound {
            url: url.to_string(),
        })?;
        Ok(filter_by_bbox(features.clone(), bbox))
    }

    async fn fetch_raster(&self, url: &str) -> Result<GridRaster, SourceError> {
        self.rasters.get(url).cloned().ok_or_else(|| SourceError::NotFound {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_features;
    use crate::test_support::{FEATURES, RASTER};

    #[tokio::test]
    async fn serves_registered_datasets() {
        let source = MemorySource::new()
            .with_features("reefs", parse_features(FEATURES).unwrap())
            .with_raster("depth", GridRaster::from_json(RASTER).unwrap());

        assert_eq!(source.fetch_features("reefs", None).await.unwrap().len(), 3);
        assert_eq!(source.fetch_raster("depth").await.unwrap().width, 1);
        assert!(matches!(
            source.fetch_raster("missing").await,
            Err(SourceError::NotFound { .. })
        ));
    }
}
