//! Classed polygon area reports: sketch size and habitat extents.

use std::collections::BTreeMap;

use futures::FutureExt as _;
use futures::future::try_join_all;
use geo::MultiPolygon;
use mpa_report_metric::ReportResult;
use mpa_report_metric_models::{Metric, MetricGroup};
use mpa_report_overlap::overlap_polygon_area;
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{ReferenceFeature, clip_to_geography};

use crate::{ClassTask, ReportContext, ReportError, fetch};

type Polygons = Vec<ReferenceFeature<MultiPolygon<f64>>>;

/// Fetches each distinct vector datasource of `group` once.
async fn polygons_by_datasource(
    ctx: &ReportContext,
    group: &MetricGroup,
    sketch: &Sketch,
) -> Result<BTreeMap<String, Polygons>, ReportError> {
    let mut datasources = BTreeMap::new();
    for class in &group.classes {
        let ds = ctx
            .project
            .class_vector_datasource(group, Some(class.class_id.as_str()))?;
        datasources.insert(ds.datasource_id.clone(), ds);
    }

    let fetched = try_join_all(datasources.into_values().map(|ds| async move {
        Ok::<_, ReportError>((ds.datasource_id.clone(), fetch::polygons(ctx, ds, sketch).await?))
    }))
    .await?;

    Ok(fetched.into_iter().collect())
}

/// Polygon overlap area for every class of a metric group. Classes with a
/// class key only count reference polygons the discriminator assigns to
/// them. Metrics are tagged with `geography_id` when given.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn classed_polygon_area(
    ctx: &ReportContext,
    metric_id: &str,
    sketch: &Sketch,
    geography_id: Option<&str>,
) -> Result<Vec<Metric>, ReportError> {
    let group = ctx.project.metric_group(metric_id)?;
    let features = polygons_by_datasource(ctx, group, sketch).await?;

    let mut tasks = vec![];
    for class in &group.classes {
        let ds = ctx
            .project
            .class_vector_datasource(group, Some(class.class_id.as_str()))?;
        let discriminator = ctx.project.class_discriminator(group, &class.class_id)?;
        let all = features.get(&ds.datasource_id).map_or(&[][..], Vec::as_slice);
        let class_id = class.class_id.as_str();

        tasks.push(ClassTask::new(
            class_id,
            async move {
                let selected: Polygons = match &discriminator {
                    Some(discriminator) => all
                        .iter()
                        .filter(|f| discriminator.matches(&f.properties, class_id))
                        .cloned()
                        .collect(),
                    None => all.to_vec(),
                };

                Ok(overlap_polygon_area(&group.metric_id, &selected, sketch)
                    .into_iter()
                    .map(|m| {
                        let m = m.with_class(class_id);
                        match geography_id {
                            Some(id) => m.with_geography(id),
                            None => m,
                        }
                    })
                    .collect())
            }
            .boxed(),
        ));
    }

    ctx.executor.execute(tasks).await
}

/// Clips a sketch to a planning geography (the project default when
/// `geography_id` is `None`), returning the clipped sketch and the
/// geography id used.
///
/// # Errors
///
/// Returns [`ReportError`] if the geography or its boundary cannot be
/// loaded.
pub async fn clip_sketch(
    ctx: &ReportContext,
    sketch: &Sketch,
    geography_id: Option<&str>,
) -> Result<(Sketch, String), ReportError> {
    let geography = match geography_id {
        Some(id) => ctx.project.geography(id)?,
        None => ctx.project.default_geography()?,
    };
    let ds = ctx.project.vector_datasource(&geography.datasource_id)?;
    let boundary: Vec<MultiPolygon<f64>> = fetch::polygons(ctx, ds, sketch)
        .await?
        .into_iter()
        .map(|f| f.geometry)
        .collect();

    log::debug!(
        "Clipping {} to geography {} ({} boundary polygons)",
        sketch.id(),
        geography.geography_id,
        boundary.len()
    );
    Ok((
        clip_to_geography(sketch, &boundary),
        geography.geography_id.clone(),
    ))
}

/// Area of each `size` class under the sketch, in square metres.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn size(ctx: &ReportContext, sketch: &Sketch) -> Result<ReportResult, ReportError> {
    Ok(ReportResult::new(
        classed_polygon_area(ctx, "size", sketch, None).await?,
    ))
}

/// Habitat area per class within a planning geography.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn habitat(
    ctx: &ReportContext,
    metric_id: &str,
    sketch: &Sketch,
    geography_id: Option<&str>,
) -> Result<ReportResult, ReportError> {
    let (clipped, geography_id) = clip_sketch(ctx, sketch, geography_id).await?;
    Ok(ReportResult::new(
        classed_polygon_area(ctx, metric_id, &clipped, Some(&geography_id)).await?,
    ))
}
