#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Post-processing shared by every report.
//!
//! - [`normalize`]: deterministic rekey + sort of metric arrays
//! - [`percent`]: conversion of absolute values to percent-of-total
//! - [`baseline`]: reading and writing precalculated global totals

pub mod baseline;
pub mod normalize;
pub mod percent;

pub use normalize::{normalize_metrics, rekey_metrics, sort_metrics};
pub use percent::to_percent_metric;

use mpa_report_metric_models::Metric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during metric post-processing.
#[derive(Debug, Error)]
pub enum MetricError {
    /// A value metric had no matching baseline entry. Indicates the live
    /// computation and the precalculated totals disagree on classes.
    #[error("No baseline metric found for metric '{metric_id}' class {class_id:?}")]
    MissingBaseline {
        /// Metric id of the value metric.
        metric_id: String,
        /// Class id that could not be matched.
        class_id: Option<String>,
    },

    /// Baseline file I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Baseline JSON was malformed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The payload every report returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    /// Normalized metrics.
    pub metrics: Vec<Metric>,
}

impl ReportResult {
    /// Wraps metrics after running them through [`normalize_metrics`].
    #[must_use]
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self {
            metrics: normalize_metrics(metrics),
        }
    }
}

/// Returns the metrics belonging to any of the given sketch ids.
#[must_use]
pub fn metrics_with_sketch_id<'a>(metrics: &'a [Metric], sketch_ids: &[&str]) -> Vec<&'a Metric> {
    metrics
        .iter()
        .filter(|m| {
            m.sketch_id
                .as_deref()
                .is_some_and(|id| sketch_ids.contains(&id))
        })
        .collect()
}
