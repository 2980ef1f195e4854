//! Raster-backed reports.

use futures::FutureExt as _;
use mpa_report_metric::ReportResult;
use mpa_report_metric_models::MeasurementType;
use mpa_report_overlap::{RasterExtremes, RasterStat, raster_extremes, raster_metrics};
use mpa_report_sketch_models::Sketch;
use serde::Serialize;

use crate::{ClassTask, ReportContext, ReportError, fetch};

/// Units of bathymetry values.
pub const BATHYMETRY_UNITS: &str = "meters";

/// Depth extremes under one sketch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BathymetryResult {
    #[serde(flatten)]
    pub extremes: RasterExtremes,
    pub units: &'static str,
}

/// Depth min/mean/max per child. The collection record holds the min of
/// child mins and the max of child maxes, each clamped to at most zero so
/// a collection never reports land elevation as depth.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration, fetch or statistics failure.
pub async fn bathymetry(
    ctx: &ReportContext,
    sketch: &Sketch,
) -> Result<Vec<BathymetryResult>, ReportError> {
    let group = ctx.project.metric_group("bathymetry")?;
    let ds = ctx.project.class_raster_datasource(group, None)?;
    let raster = fetch::raster(ctx, ds).await?;

    Ok(raster_extremes(&raster, sketch)?
        .into_iter()
        .map(|mut extremes| {
            if extremes.is_collection {
                extremes.min = extremes.min.map(|v| v.min(0.0));
                extremes.max = extremes.max.map(|v| v.min(0.0));
            }
            BathymetryResult {
                extremes,
                units: BATHYMETRY_UNITS,
            }
        })
        .collect())
}

/// Degree heating week statistics for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DhwResult {
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub year: i32,
}

/// Degree heating week min/mean/max per year class for a single sketch.
/// Collections yield an empty list.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration, fetch or statistics failure.
pub async fn dhw(ctx: &ReportContext, sketch: &Sketch) -> Result<Vec<DhwResult>, ReportError> {
    if sketch.is_collection() {
        log::debug!("dhw: {} is a collection, nothing to report", sketch.id());
        return Ok(vec![]);
    }

    let group = ctx.project.metric_group("dhw")?;
    let mut results = vec![];
    for class in &group.classes {
        let year = class
            .class_id
            .parse()
            .map_err(|_| mpa_report_project::ProjectError::InvalidClassKey {
                metric_id: group.metric_id.clone(),
                message: format!("class '{}' is not a year", class.class_id),
            })?;
        let ds = ctx
            .project
            .class_raster_datasource(group, Some(class.class_id.as_str()))?;
        let raster = fetch::raster(ctx, ds).await?;

        let extremes = raster_extremes(&raster, sketch)?;
        let stats = extremes.first();
        results.push(DhwResult {
            min: stats.and_then(|s| s.min),
            mean: stats.and_then(|s| s.mean),
            max: stats.and_then(|s| s.max),
            year,
        });
    }

    results.sort_by_key(|r| r.year);
    Ok(results)
}

/// Per-class raster metrics. Categorical datasources report the area of
/// cells holding the class value; quantitative datasources report the
/// group's statistic: cell value sum for fishing effort (`gfw`), valid
/// cell count for `bleachingAlerts` and valid cell area otherwise.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration, fetch or statistics failure.
pub async fn raster_class_metrics(
    ctx: &ReportContext,
    metric_id: &str,
    sketch: &Sketch,
) -> Result<ReportResult, ReportError> {
    let group = ctx.project.metric_group(metric_id)?;

    let mut tasks = vec![];
    for class in &group.classes {
        let ds = ctx
            .project
            .class_raster_datasource(group, Some(class.class_id.as_str()))?;
        let stat = match ds.measurement_type {
            Some(MeasurementType::Categorical) => {
                let value = class
                    .numeric_class_id
                    .or_else(|| class.class_id.parse().ok())
                    .ok_or_else(|| mpa_report_project::ProjectError::InvalidClassKey {
                        metric_id: group.metric_id.clone(),
                        message: format!("class '{}' has no numeric value", class.class_id),
                    })?;
                RasterStat::Categorical(value)
            }
            _ if group.metric_id == "gfw" => RasterStat::Sum,
            _ if group.metric_id == "bleachingAlerts" => RasterStat::Valid,
            _ => RasterStat::Area,
        };
        let class_id = class.class_id.as_str();

        tasks.push(ClassTask::new(
            class_id,
            async move {
                let raster = fetch::raster(ctx, ds).await?;
                Ok(raster_metrics(&raster, &group.metric_id, sketch, &stat)?
                    .into_iter()
                    .map(|m| m.with_class(class_id))
                    .collect())
            }
            .boxed(),
        ));
    }

    Ok(ReportResult::new(ctx.executor.execute(tasks).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection, context, single, square};
    use mpa_report_raster::{Crs, GridRaster};
    use mpa_report_source::MemorySource;

    /// 2x2 one-degree grid over [0, 2] x [0, 2], top row first.
    fn grid(values: [f64; 4]) -> GridRaster {
        GridRaster {
            crs: Crs::Wgs84,
            origin: [0.0, 2.0],
            cell_size: [1.0, 1.0],
            width: 2,
            height: 2,
            no_data: None,
            values: values.to_vec(),
        }
    }

    #[tokio::test]
    async fn bathymetry_clamps_collection_extremes() {
        let source = MemorySource::new().with_raster("bathymetry.json", grid([5.0, -10.0, -20.0, -30.0]));
        let ctx = context(source);
        // Children over the top-left (land) and bottom-left cells.
        let sketch = collection(vec![square(0.25, 1.25, 0.5), square(0.25, 0.25, 0.5)]);

        let results = bathymetry(&ctx, &sketch).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].extremes.max, Some(5.0));
        assert_eq!(results[1].extremes.min, Some(-20.0));

        let rollup = &results[2].extremes;
        assert!(rollup.is_collection);
        assert_eq!(rollup.min, Some(-20.0));
        assert_eq!(rollup.max, Some(0.0));
        assert_eq!(results[2].units, "meters");
    }

    #[tokio::test]
    async fn bathymetry_of_empty_sketch_is_null() {
        let source = MemorySource::new().with_raster("bathymetry.json", grid([1.0; 4]));
        let ctx = context(source);

        let results = bathymetry(&ctx, &single(geo::MultiPolygon(vec![]))).await.unwrap();
        assert_eq!(results[0].extremes.min, None);
        assert_eq!(results[0].extremes.mean, None);
        assert_eq!(results[0].extremes.max, None);
    }

    #[tokio::test]
    async fn dhw_reports_each_year_and_skips_collections() {
        let mut source = MemorySource::new();
        for (i, year) in (2019..=2024).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let v = i as f64;
            source = source.with_raster(format!("dhw_{year}.json"), grid([v, v + 1.0, v + 2.0, v + 3.0]));
        }
        let ctx = context(source);

        let results = dhw(&ctx, &single(square(0.1, 0.1, 1.8))).await.unwrap();
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].year, 2019);
        assert_eq!(results[0].min, Some(0.0));
        assert_eq!(results[0].max, Some(3.0));
        assert_eq!(results[5].mean, Some(6.5));

        let collection = collection(vec![square(0.1, 0.1, 0.5)]);
        assert!(dhw(&ctx, &collection).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gfw_sums_cell_values_per_year() {
        let mut source = MemorySource::new();
        for year in 2019..=2024 {
            source = source.with_raster(format!("gfw_{year}.json"), grid([1.0, 2.0, 3.0, 4.0]));
        }
        let ctx = context(source);

        let result = raster_class_metrics(&ctx, "gfw", &single(square(0.1, 0.1, 1.8)))
            .await
            .unwrap();
        assert_eq!(result.metrics.len(), 6);
        assert!(result.metrics.iter().all(|m| m.value == Some(10.0)));
    }

    #[tokio::test]
    async fn bleaching_alerts_report_categorical_area() {
        let source = MemorySource::new().with_raster("bleaching_alerts_2024.json", grid([0.0, 4.0, 4.0, 2.0]));
        let ctx = context(source);

        let result = raster_class_metrics(&ctx, "bleachingAlerts", &single(square(0.1, 0.1, 1.8)))
            .await
            .unwrap();
        let area = |class_id: &str| {
            result
                .metrics
                .iter()
                .find(|m| m.class_id.as_deref() == Some(class_id))
                .and_then(|m| m.value)
                .unwrap()
        };
        assert!(area("4") > area("2"));
        assert!(area("2") > 0.0);
        assert!(area("1").abs() < f64::EPSILON);
    }
}
