//! Reference data served over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use geo::Rect;
use mpa_report_raster::GridRaster;

use crate::{FeatureSource, SourceError, filter_by_bbox, parse_features, retry};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetches datasets relative to a base URL.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Creates a source rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves a dataset URL. Absolute URLs pass through unchanged.
    #[must_use]
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl FeatureSource for HttpSource {
    async fn fetch_features(
        &self,
        url: &str,
        bbox: Option<&Rect<f64>>,
    ) -> Result<Vec<geojson::Feature>, SourceError> {
        let url = self.resolve(url);
        log::debug!("Fetching features from {url}");
        let body = retry::send_text(|| self.client.get(&url)).await?;
        Ok(filter_by_bbox(parse_features(&body)?, bbox))
    }

    async fn fetch_raster(&self, url: &str) -> Result<GridRaster, SourceError> {
        let url = self.resolve(url);
        log::debug!("Fetching raster from {url}");
        let body = retry::send_text(|| self.client.get(&url)).await?;
        Ok(GridRaster::from_json(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_urls() {
        let source = HttpSource::new("https://data.example.org/reports/");
        assert_eq!(
            source.resolve("/reefs.geojson"),
            "https://data.example.org/reports/reefs.geojson"
        );
        assert_eq!(source.resolve("http://other/x.json"), "http://other/x.json");
    }
}
