//! Reference data read from a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use geo::Rect;
use mpa_report_raster::GridRaster;

use crate::{FeatureSource, SourceError, filter_by_bbox, parse_features};

/// Reads datasets from files under a root directory.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a dataset URL against the root. Absolute paths and
    /// `file://` URLs are used as-is.
    #[must_use]
    pub fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn read(&self, url: &str) -> Result<String, SourceError> {
        let path = self.resolve(url);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SourceError::NotFound {
                url: path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl FeatureSource for FileSource {
    async fn fetch_features(
        &self,
        url: &str,
        bbox: Option<&Rect<f64>>,
    ) -> Result<Vec<geojson::Feature>, SourceError> {
        let body = self.read(url).await?;
        let features = parse_features(&body)?;
        log::debug!("Read {} features from {url}", features.len());
        Ok(filter_by_bbox(features, bbox))
    }

    async fn fetch_raster(&self, url: &str) -> Result<GridRaster, SourceError> {
        Ok(GridRaster::from_json(&self.read(url).await?)?)
    }
}
