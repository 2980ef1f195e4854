#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Reports: each reads its metric group from the [`Project`], fetches
//! reference data through a [`FeatureSource`], runs the overlap engines
//! (fanned out per class through a [`ClassExecutor`]) and returns
//! normalized metrics.

pub mod executor;
pub mod fetch;
pub mod habitat;
pub mod nearshore;
pub mod ous;
pub mod preprocess;
pub mod raster;
pub mod stations;

pub use executor::{ClassExecutor, ClassTask, LocalExecutor};

use std::collections::BTreeSet;
use std::sync::Arc;

use mpa_report_metric::{MetricError, ReportResult, to_percent_metric};
use mpa_report_metric_models::Metric;
use mpa_report_overlap::OverlapError;
use mpa_report_project::{Project, ProjectError};
use mpa_report_sketch_models::Sketch;
use mpa_report_source::{FeatureSource, SourceError};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Errors that can occur while running a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Configuration mismatch.
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Reference data could not be fetched.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// An overlap engine failed.
    #[error("Overlap error: {0}")]
    Overlap(#[from] OverlapError),

    /// Metric post-processing failed.
    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    /// Output serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A drawn shape cannot be preprocessed.
    #[error("{message}")]
    Validation {
        /// Reason shown to the user.
        message: String,
    },

    /// No report with this name.
    #[error("Unknown report: {name}")]
    UnknownReport {
        /// Requested name.
        name: String,
    },
}

/// Everything a report needs besides the sketch.
#[derive(Clone)]
pub struct ReportContext {
    pub project: Arc<Project>,
    pub source: Arc<dyn FeatureSource>,
    pub executor: Arc<dyn ClassExecutor>,
}

impl ReportContext {
    /// Creates a context running classes on a default [`LocalExecutor`].
    #[must_use]
    pub fn new(project: Arc<Project>, source: Arc<dyn FeatureSource>) -> Self {
        Self {
            project,
            source,
            executor: Arc::new(LocalExecutor::default()),
        }
    }

    /// Returns a copy using `executor` for class fan-out.
    #[must_use]
    pub fn with_executor(self, executor: Arc<dyn ClassExecutor>) -> Self {
        Self { executor, ..self }
    }
}

/// Metrics plus the per-station records behind them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReport<S> {
    pub metrics: Vec<Metric>,
    pub stations: Vec<S>,
}

/// Every report the CLI can run, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Report {
    Size,
    #[strum(serialize = "geomorphACA")]
    GeomorphAca,
    #[strum(serialize = "benthicACA")]
    BenthicAca,
    #[strum(serialize = "reefExtentACA")]
    ReefExtentAca,
    Bathymetry,
    Dhw,
    Gfw,
    Mangroves,
    BleachingAlerts,
    Population,
    LandUse,
    Waterways,
    Sites,
    Richness,
    BenthicCover,
    JuvenileCoralDensity,
    FishBiomass,
    FishDensity,
    InvertDensity,
    Isotopes,
    Seamounts,
    OusDemographics,
}

/// Runs a report by name and serializes its output.
///
/// # Errors
///
/// Returns [`ReportError`] if the report fails.
pub async fn run_report(
    ctx: &ReportContext,
    report: Report,
    sketch: &Sketch,
) -> Result<serde_json::Value, ReportError> {
    log::info!("Running {report} for sketch {}", sketch.id());

    let output = match report {
        Report::Size => serde_json::to_value(habitat::size(ctx, sketch).await?)?,
        Report::GeomorphAca | Report::BenthicAca | Report::ReefExtentAca => {
            serde_json::to_value(habitat::habitat(ctx, report.as_ref(), sketch, None).await?)?
        }
        Report::Bathymetry => serde_json::to_value(raster::bathymetry(ctx, sketch).await?)?,
        Report::Dhw => serde_json::to_value(raster::dhw(ctx, sketch).await?)?,
        Report::Gfw | Report::Mangroves | Report::BleachingAlerts => serde_json::to_value(
            raster::raster_class_metrics(ctx, report.as_ref(), sketch).await?,
        )?,
        Report::Population => serde_json::to_value(nearshore::population(ctx, sketch).await?)?,
        Report::LandUse => serde_json::to_value(nearshore::land_use(ctx, sketch).await?)?,
        Report::Waterways => serde_json::to_value(nearshore::waterways(ctx, sketch).await?)?,
        Report::Sites => serde_json::to_value(stations::sites(ctx, sketch).await?)?,
        Report::Richness
        | Report::BenthicCover
        | Report::JuvenileCoralDensity
        | Report::FishBiomass
        | Report::FishDensity
        | Report::InvertDensity => {
            serde_json::to_value(stations::station_means(ctx, report.as_ref(), sketch).await?)?
        }
        Report::Isotopes => serde_json::to_value(stations::isotopes(ctx, sketch).await?)?,
        Report::Seamounts => serde_json::to_value(stations::seamounts(ctx, sketch).await?)?,
        Report::OusDemographics => {
            serde_json::to_value(ous::ous_demographics(ctx, sketch).await?)?
        }
    };

    log::info!("Finished {report} for sketch {}", sketch.id());
    Ok(output)
}

/// Converts report metrics to fractions of the project's precalculated
/// totals, renaming them `{metric_id}Perc`.
///
/// # Errors
///
/// Returns [`ReportError::Metric`] if a class has no baseline.
pub fn percent_of_total(project: &Project, result: &ReportResult) -> Result<ReportResult, ReportError> {
    let mut percents = vec![];
    let metric_ids: BTreeSet<&str> = result.metrics.iter().map(|m| m.metric_id.as_str()).collect();

    for metric_id in metric_ids {
        let metrics: Vec<Metric> = result
            .metrics
            .iter()
            .filter(|m| m.metric_id == metric_id)
            .cloned()
            .collect();
        let totals = project.precalc_metrics(metric_id, None);
        let percent_id = format!("{metric_id}Perc");
        percents.extend(to_percent_metric(&metrics, &totals, Some(&percent_id))?);
    }

    Ok(ReportResult::new(percents))
}
