#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for running sketch reports and precalculating baselines.
//!
//! ```text
//! mpa_report report <name> --sketch <sketch.geojson> [--percent]
//! mpa_report precalc-ous --input <survey.geojson> --output <totals.json>
//! mpa_report precalc-counts --metric-group seamounts --output <counts.json>
//! mpa_report sort-ous --input <survey.geojson> --output <sorted.geojson>
//! mpa_report preprocess clipToOcean --input <drawn.geojson>
//! ```
//!
//! Reference data is read from the project data URL, overridden by the
//! `MPA_REPORT_DATA_URL` environment variable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mpa_report_metric::ReportResult;
use mpa_report_metric::baseline::write_baseline;
use mpa_report_project::Project;
use mpa_report_reports::executor::DEFAULT_CONCURRENCY;
use mpa_report_reports::preprocess::Preprocessor;
use mpa_report_reports::{LocalExecutor, Report, ReportContext, ReportError};
use mpa_report_sketch_models::Sketch;
use mpa_report_source::parse_features;

#[derive(Parser)]
#[command(name = "mpa_report", about = "Run MPA sketch reports and precalculate baselines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one report against a sketch and print its JSON output
    Report {
        /// Report name, e.g. `size`, `geomorphACA`, `ousDemographics`
        name: String,
        /// Sketch `GeoJSON` file (Feature or `FeatureCollection`)
        #[arg(long)]
        sketch: PathBuf,
        /// Express metrics as fractions of the precalculated totals
        #[arg(long)]
        percent: bool,
        /// Classes computed concurrently
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    /// Write demographic totals over every survey row
    PrecalcOus {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Write per-class point counts of a metric group's datasets
    PrecalcCounts {
        #[arg(long)]
        metric_group: String,
        #[arg(long)]
        output: PathBuf,
        /// Geography the counts are tagged with
        #[arg(long, default_value = "eez")]
        geography: String,
    },
    /// Sort survey rows by respondent id
    SortOus {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Clip a drawn shape and print the resulting feature
    Preprocess {
        /// Preprocessor name: `clipToOcean`, `clipToOceanEez` or `clipToLand`
        name: String,
        /// `GeoJSON` Feature with Polygon or `MultiPolygon` geometry
        #[arg(long)]
        input: PathBuf,
    },
}

fn read_features(path: &Path) -> Result<Vec<geojson::Feature>, Box<dyn std::error::Error>> {
    let features = parse_features(&std::fs::read_to_string(path)?)?;
    log::info!("Read {} features from {}", features.len(), path.display());
    Ok(features)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let project = Arc::new(Project::load()?);

    match cli.command {
        Commands::Report {
            name,
            sketch,
            percent,
            concurrency,
        } => {
            let report: Report = name
                .parse()
                .map_err(|_| ReportError::UnknownReport { name: name.clone() })?;
            let sketch: Sketch = std::fs::read_to_string(&sketch)?.parse()?;
            let ctx = ReportContext::new(project.clone(), project.source())
                .with_executor(Arc::new(LocalExecutor::new(concurrency)));

            let mut output = mpa_report_reports::run_report(&ctx, report, &sketch).await?;
            if percent {
                let result: ReportResult = serde_json::from_value(output)?;
                output = serde_json::to_value(mpa_report_reports::percent_of_total(&project, &result)?)?;
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::PrecalcOus { input, output } => {
            let metrics = mpa_report_reports::ous::ous_baseline(&read_features(&input)?);
            write_baseline(&output, metrics)?;
            log::info!("Wrote demographic baseline to {}", output.display());
        }
        Commands::PrecalcCounts {
            metric_group,
            output,
            geography,
        } => {
            let ctx = ReportContext::new(project.clone(), project.source());
            let metrics =
                mpa_report_reports::stations::point_count_baseline(&ctx, &metric_group, &geography)
                    .await?;
            write_baseline(&output, metrics)?;
            log::info!("Wrote {metric_group} counts to {}", output.display());
        }
        Commands::SortOus { input, output } => {
            let sorted = mpa_report_reports::ous::sort_survey(&read_features(&input)?);
            let collection = geojson::FeatureCollection {
                bbox: None,
                features: sorted,
                foreign_members: None,
            };
            std::fs::write(&output, serde_json::to_string(&collection)?)?;
            log::info!("Wrote sorted survey to {}", output.display());
        }
        Commands::Preprocess { name, input } => {
            let preprocessor: Preprocessor = name
                .parse()
                .map_err(|_| ReportError::UnknownReport { name: name.clone() })?;
            let feature: geojson::Feature = std::fs::read_to_string(&input)?.parse()?;
            let ctx = ReportContext::new(project.clone(), project.source());

            let clipped = mpa_report_reports::preprocess::preprocess(&ctx, preprocessor, feature).await?;
            println!("{}", serde_json::to_string_pretty(&clipped)?);
        }
    }

    Ok(())
}
