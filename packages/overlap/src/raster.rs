//! Raster overlap engine.
//!
//! Child geometries are handed to a [`RasterStatistics`] primitive, which
//! reprojects them into the raster's CRS. Degenerate children (for example
//! a child clipped away by a planning geography) and children over no
//! populated cells produce `None` values instead of errors. Any other
//! statistics failure propagates.
//!
//! # Bathymetry sign convention
//!
//! Depth rasters are negative-down. [`raster_extremes`] reports the raw
//! statistical `min` and `max`, so the *shallowest* point of a sketch is
//! `max` and the *deepest* is `min`. Callers relabel as needed.

use geo::MultiPolygon;
use mpa_report_metric_models::Metric;
use mpa_report_raster::{RasterError, RasterStatistics, ZonalStats};
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{is_degenerate, union_children};
use serde::Serialize;

use crate::{OverlapError, child_metric, collection_metric};

/// Statistic reported by [`raster_metrics`].
#[derive(Debug, Clone, PartialEq)]
pub enum RasterStat {
    /// Sum of valid cell values.
    Sum,
    /// Ground area of valid cells, square metres.
    Area,
    /// Number of valid cells.
    Valid,
    /// Ground area of cells equal to a class value, square metres.
    Categorical(f64),
}

/// Min/mean/max of a raster under one sketch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterExtremes {
    pub sketch_id: String,
    pub sketch_name: String,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_collection: bool,
}

/// Zonal statistics for one geometry, mapping empty zones to `None`.
fn zonal<R: RasterStatistics + ?Sized>(
    raster: &R,
    geometry: &MultiPolygon<f64>,
) -> Result<Option<ZonalStats>, OverlapError> {
    if is_degenerate(geometry) {
        return Ok(None);
    }
    match raster.zonal_stats(geometry) {
        Ok(stats) => Ok(Some(stats)),
        Err(RasterError::NoValuesInGeometry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Min/mean/max per child, plus for collections a rollup holding the min
/// of child mins and the max of child maxes.
///
/// # Errors
///
/// Returns [`OverlapError::Raster`] for statistics failures other than an
/// empty zone.
pub fn raster_extremes<R: RasterStatistics + ?Sized>(
    raster: &R,
    sketch: &Sketch,
) -> Result<Vec<RasterExtremes>, OverlapError> {
    let mut results = sketch
        .children()
        .iter()
        .map(|child| {
            let stats = zonal(raster, &child.geometry)?;
            if stats.is_none() {
                log::debug!("No raster values under {}", child.id);
            }
            Ok(RasterExtremes {
                sketch_id: child.id.clone(),
                sketch_name: child.name.clone(),
                min: stats.map(|s| s.min),
                mean: stats.map(|s| s.mean),
                max: stats.map(|s| s.max),
                is_collection: false,
            })
        })
        .collect::<Result<Vec<_>, OverlapError>>()?;

    if sketch.is_collection() {
        let min = results.iter().filter_map(|r| r.min).reduce(f64::min);
        let max = results.iter().filter_map(|r| r.max).reduce(f64::max);
        results.push(RasterExtremes {
            sketch_id: sketch.id().to_string(),
            sketch_name: sketch.name().to_string(),
            min,
            mean: None,
            max,
            is_collection: true,
        });
    }

    Ok(results)
}

#[allow(clippy::cast_precision_loss)]
fn stat_value<R: RasterStatistics + ?Sized>(
    raster: &R,
    geometry: &MultiPolygon<f64>,
    stat: &RasterStat,
) -> Result<Option<f64>, OverlapError> {
    Ok(match stat {
        RasterStat::Categorical(_) if is_degenerate(geometry) => None,
        RasterStat::Categorical(value) => raster
            .categorical_area(geometry, &[*value])
            .first()
            .map(|c| c.area),
        RasterStat::Sum => zonal(raster, geometry)?.map(|s| s.sum),
        RasterStat::Area => zonal(raster, geometry)?.map(|s| s.area),
        RasterStat::Valid => zonal(raster, geometry)?.map(|s| s.valid as f64),
    })
}

/// One metric per child plus, for collections, a rollup computed against
/// the dissolved union of children.
///
/// # Errors
///
/// Returns [`OverlapError::Raster`] for statistics failures other than an
/// empty zone.
pub fn raster_metrics<R: RasterStatistics + ?Sized>(
    raster: &R,
    metric_id: &str,
    sketch: &Sketch,
    stat: &RasterStat,
) -> Result<Vec<Metric>, OverlapError> {
    let mut metrics = sketch
        .children()
        .iter()
        .map(|child| {
            let value = stat_value(raster, &child.geometry, stat)?;
            Ok(child_metric(metric_id, child, value))
        })
        .collect::<Result<Vec<_>, OverlapError>>()?;

    if sketch.is_collection() {
        let union = union_children(sketch);
        let value = stat_value(raster, &union, stat)?;
        metrics.push(collection_metric(metric_id, sketch, value));
    }

    Ok(metrics)
}
