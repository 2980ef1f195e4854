//! Point dataset reports: survey stations, per-class station means and
//! seamount counts.

use std::collections::{BTreeMap, BTreeSet};

use futures::FutureExt as _;
use geo::{Intersects, Point};
use mpa_report_metric::ReportResult;
use mpa_report_metric_models::Metric;
use mpa_report_overlap::{PointOverlapOptions, overlap_point};
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{ReferenceFeature, is_degenerate};
use serde::Serialize;

use crate::{ClassTask, ReportContext, ReportError, StationReport, fetch};

/// Geography seamount counts are reported in.
pub const SEAMOUNT_GEOGRAPHY: &str = "eez";

/// Points of `ds` inside any child, boundary inclusive.
async fn points_in_sketch(
    ctx: &ReportContext,
    metric_id: &str,
    sketch: &Sketch,
) -> Result<Vec<ReferenceFeature<Point<f64>>>, ReportError> {
    let group = ctx.project.metric_group(metric_id)?;
    let ds = ctx.project.class_vector_datasource(group, None)?;
    let children: Vec<_> = sketch
        .children()
        .iter()
        .filter(|c| !is_degenerate(&c.geometry))
        .collect();

    Ok(fetch::points(ctx, ds, Some(sketch))
        .await?
        .into_iter()
        .filter(|p| children.iter().any(|c| c.geometry.intersects(&p.geometry)))
        .collect())
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// One survey site inside the sketch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteStation {
    pub station_id: String,
    pub island: String,
    pub province: String,
}

/// Station count, distinct island count and distinct province count of
/// survey sites inside the sketch.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn sites(
    ctx: &ReportContext,
    sketch: &Sketch,
) -> Result<StationReport<SiteStation>, ReportError> {
    let points = points_in_sketch(ctx, "sites", sketch).await?;

    let mut station_count = 0_u32;
    let mut islands = BTreeSet::new();
    let mut provinces = BTreeSet::new();
    let mut stations = vec![];

    for point in &points {
        let station_id = point.string_property("station_id").unwrap_or_default();
        let island = point.string_property("island").unwrap_or_default();
        let province = point.string_property("province").unwrap_or_default();

        if !station_id.is_empty() {
            station_count += 1;
        }
        if !island.is_empty() {
            islands.insert(island.clone());
        }
        if !province.is_empty() {
            provinces.insert(province.clone());
        }
        stations.push(SiteStation {
            station_id,
            island,
            province,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let metrics = vec![
        Metric::new("stations", Some(f64::from(station_count))).with_sketch(sketch.id()),
        Metric::new("islands", Some(islands.len() as f64)).with_sketch(sketch.id()),
        Metric::new("provinces", Some(provinces.len() as f64)).with_sketch(sketch.id()),
    ];

    Ok(StationReport {
        metrics: ReportResult::new(metrics).metrics,
        stations,
    })
}

/// Per-class attribute values of one station. Classes the station does
/// not report are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStation {
    pub station_id: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Mean of each class attribute of `metric_id` over stations inside the
/// sketch, as for `richness`, `benthicCover` or `fishBiomass`. Each class
/// id names the station property holding its value. A class with no
/// reporting station has a `None` mean.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn station_means(
    ctx: &ReportContext,
    metric_id: &str,
    sketch: &Sketch,
) -> Result<StationReport<ClassStation>, ReportError> {
    let group = ctx.project.metric_group(metric_id)?;
    let points = points_in_sketch(ctx, metric_id, sketch).await?;
    log::debug!("{metric_id}: {} stations in {}", points.len(), sketch.id());

    let stations: Vec<ClassStation> = points
        .iter()
        .map(|p| ClassStation {
            station_id: p.string_property("station_id").unwrap_or_default(),
            values: group
                .classes
                .iter()
                .filter_map(|c| {
                    p.number_property(&c.class_id)
                        .filter(|v| v.is_finite())
                        .map(|v| (c.class_id.clone(), v))
                })
                .collect(),
        })
        .collect();

    let metrics = group
        .classes
        .iter()
        .map(|c| {
            let value = mean(stations.iter().filter_map(|s| s.values.get(&c.class_id).copied()));
            Metric::new(&group.metric_id, value)
                .with_class(c.class_id.as_str())
                .with_sketch(sketch.id())
        })
        .collect();

    Ok(StationReport {
        metrics: ReportResult::new(metrics).metrics,
        stations,
    })
}

/// Nitrogen isotope ratio at one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsotopeStation {
    pub station_id: String,
    pub ratio: Option<f64>,
}

/// Mean ratio of `mean_d15n` to `mean_total_n` over stations inside the
/// sketch. Stations missing either value, or with zero total nitrogen,
/// have no ratio and do not contribute.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn isotopes(
    ctx: &ReportContext,
    sketch: &Sketch,
) -> Result<StationReport<IsotopeStation>, ReportError> {
    let group = ctx.project.metric_group("isotopes")?;
    let points = points_in_sketch(ctx, "isotopes", sketch).await?;

    let stations: Vec<IsotopeStation> = points
        .iter()
        .map(|p| IsotopeStation {
            station_id: p.string_property("station_id").unwrap_or_default(),
            ratio: p
                .number_property("mean_d15n")
                .zip(p.number_property("mean_total_n"))
                .filter(|(_, total)| *total != 0.0)
                .map(|(d15n, total)| d15n / total),
        })
        .collect();

    let value = mean(stations.iter().filter_map(|s| s.ratio));
    let metrics = group
        .classes
        .iter()
        .map(|c| {
            Metric::new(&group.metric_id, value)
                .with_class(c.class_id.as_str())
                .with_sketch(sketch.id())
        })
        .collect();

    Ok(StationReport {
        metrics: ReportResult::new(metrics).metrics,
        stations,
    })
}

/// Seamount counts per class, per child and for the collection, counting
/// a feature inside overlapping children once.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn seamounts(ctx: &ReportContext, sketch: &Sketch) -> Result<ReportResult, ReportError> {
    let group = ctx.project.metric_group("seamounts")?;

    let mut tasks = vec![];
    for class in &group.classes {
        let ds = ctx
            .project
            .class_vector_datasource(group, Some(class.class_id.as_str()))?;
        let class_id = class.class_id.as_str();

        tasks.push(ClassTask::new(
            class_id,
            async move {
                let points = fetch::points(ctx, ds, Some(sketch)).await?;
                Ok(
                    overlap_point(&group.metric_id, &points, sketch, &PointOverlapOptions::default())
                        .into_iter()
                        .map(|m| m.with_class(class_id).with_geography(SEAMOUNT_GEOGRAPHY))
                        .collect(),
                )
            }
            .boxed(),
        ));
    }

    Ok(ReportResult::new(ctx.executor.execute(tasks).await?))
}

/// Total point count of every class datasource of a metric group, as
/// baseline metrics tagged with `geography_id`. Classes whose dataset
/// cannot be read are logged and skipped.
///
/// # Errors
///
/// Returns [`ReportError`] if the metric group is not configured.
pub async fn point_count_baseline(
    ctx: &ReportContext,
    metric_id: &str,
    geography_id: &str,
) -> Result<Vec<Metric>, ReportError> {
    let group = ctx.project.metric_group(metric_id)?;

    let mut metrics = vec![];
    for class in &group.classes {
        let ds = ctx
            .project
            .class_vector_datasource(group, Some(class.class_id.as_str()))?;
        match fetch::points(ctx, ds, None).await {
            Ok(points) => {
                #[allow(clippy::cast_precision_loss)]
                let count = points.len() as f64;
                log::info!("{metric_id} {}: {count} features", class.class_id);
                metrics.push(
                    Metric::new(&group.metric_id, Some(count))
                        .with_class(class.class_id.as_str())
                        .with_geography(geography_id),
                );
            }
            Err(e) => log::error!("Error processing class {}: {e}", class.class_id),
        }
    }

    Ok(metrics)
}
