//! Reference data loading for reports.

use geo::{MultiLineString, MultiPolygon, Point, Rect};
use mpa_report_metric_models::Datasource;
use mpa_report_raster::GridRaster;
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::ReferenceFeature;
use mpa_report_spatial::feature::{line_features, point_features, polygon_features};

use crate::{ReportContext, ReportError};

async fn features_in(
    ctx: &ReportContext,
    ds: &Datasource,
    bbox: Option<Rect<f64>>,
) -> Result<Vec<geojson::Feature>, ReportError> {
    let features = ctx.source.fetch_features(&ds.path, bbox.as_ref()).await?;
    log::debug!("{}: fetched {} features", ds.datasource_id, features.len());
    Ok(features)
}

/// Polygon features of `ds` within the sketch bounding box.
///
/// # Errors
///
/// Returns [`ReportError::Source`] if the dataset cannot be read.
pub async fn polygons(
    ctx: &ReportContext,
    ds: &Datasource,
    sketch: &Sketch,
) -> Result<Vec<ReferenceFeature<MultiPolygon<f64>>>, ReportError> {
    polygons_in_bbox(ctx, ds, sketch.bbox()).await
}

/// Polygon features of `ds` within `bbox`, or all of them without one.
///
/// # Errors
///
/// Returns [`ReportError::Source`] if the dataset cannot be read.
pub async fn polygons_in_bbox(
    ctx: &ReportContext,
    ds: &Datasource,
    bbox: Option<Rect<f64>>,
) -> Result<Vec<ReferenceFeature<MultiPolygon<f64>>>, ReportError> {
    Ok(polygon_features(features_in(ctx, ds, bbox).await?))
}

/// Point features of `ds` within the sketch bounding box. Without a
/// sketch every point is returned.
///
/// # Errors
///
/// Returns [`ReportError::Source`] if the dataset cannot be read.
pub async fn points(
    ctx: &ReportContext,
    ds: &Datasource,
    sketch: Option<&Sketch>,
) -> Result<Vec<ReferenceFeature<Point<f64>>>, ReportError> {
    let bbox = sketch.and_then(Sketch::bbox);
    Ok(point_features(features_in(ctx, ds, bbox).await?))
}

/// Line features of `ds` within the sketch bounding box.
///
/// # Errors
///
/// Returns [`ReportError::Source`] if the dataset cannot be read.
pub async fn lines(
    ctx: &ReportContext,
    ds: &Datasource,
    sketch: &Sketch,
) -> Result<Vec<ReferenceFeature<MultiLineString<f64>>>, ReportError> {
    Ok(line_features(features_in(ctx, ds, sketch.bbox()).await?))
}

/// Raw features of `ds` within the sketch bounding box.
///
/// # Errors
///
/// Returns [`ReportError::Source`] if the dataset cannot be read.
pub async fn raw_features(
    ctx: &ReportContext,
    ds: &Datasource,
    sketch: Option<&Sketch>,
) -> Result<Vec<geojson::Feature>, ReportError> {
    features_in(ctx, ds, sketch.and_then(Sketch::bbox)).await
}

/// Raster layer of `ds`. The datasource nodata value applies when the
/// layer does not carry its own.
///
/// # Errors
///
/// Returns [`ReportError::Source`] if the layer cannot be read.
pub async fn raster(ctx: &ReportContext, ds: &Datasource) -> Result<GridRaster, ReportError> {
    let mut raster = ctx.source.fetch_raster(&ds.path).await?;
    if raster.no_data.is_none() {
        raster.no_data = ds.no_data_value;
    }
    log::debug!(
        "{}: loaded {}x{} raster",
        ds.datasource_id,
        raster.width,
        raster.height
    );
    Ok(raster)
}
