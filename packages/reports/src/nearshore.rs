//! Reports over land-side datasets, measured within a buffer around the
//! sketch.

use futures::FutureExt as _;
use mpa_report_metric::ReportResult;
use mpa_report_overlap::{WATERWAY_BUFFER_KM, overlap_line_count, overlap_polygon_sum};
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::{ReferenceFeature, buffer_km, is_degenerate};

use crate::habitat::classed_polygon_area;
use crate::{ClassTask, ReportContext, ReportError, fetch};

/// Buffer around sketches when summing coastal population.
pub const POPULATION_BUFFER_KM: f64 = 0.5;
/// Buffer around sketches when measuring adjacent land use.
pub const LAND_USE_BUFFER_KM: f64 = 1.0;
/// Population property summed over census polygons.
pub const POPULATION_PROPERTY: &str = "Population";

fn buffer_sketch(sketch: &Sketch, km: f64) -> Sketch {
    sketch.with_children_geometry(|child| buffer_km(&child.geometry, km))
}

/// Population of census polygons within [`POPULATION_BUFFER_KM`] of each
/// child. A polygon near several children counts once in the collection
/// total.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn population(ctx: &ReportContext, sketch: &Sketch) -> Result<ReportResult, ReportError> {
    let group = ctx.project.metric_group("population")?;
    let buffered = buffer_sketch(sketch, POPULATION_BUFFER_KM);
    let buffered = &buffered;

    let mut tasks = vec![];
    for class in &group.classes {
        let ds = ctx
            .project
            .class_vector_datasource(group, Some(class.class_id.as_str()))?;
        let discriminator = ctx.project.class_discriminator(group, &class.class_id)?;
        let class_id = class.class_id.as_str();

        tasks.push(ClassTask::new(
            class_id,
            async move {
                let features: Vec<ReferenceFeature<_>> = fetch::polygons(ctx, ds, buffered)
                    .await?
                    .into_iter()
                    .filter(|f| {
                        discriminator
                            .as_ref()
                            .is_none_or(|d| d.matches(&f.properties, class_id))
                    })
                    .collect();

                Ok(
                    overlap_polygon_sum(&group.metric_id, &features, buffered, POPULATION_PROPERTY)
                        .into_iter()
                        .map(|m| m.with_class(class_id))
                        .collect(),
                )
            }
            .boxed(),
        ));
    }

    Ok(ReportResult::new(ctx.executor.execute(tasks).await?))
}

/// Land-use area per class within [`LAND_USE_BUFFER_KM`] of the sketch.
/// A sketch with any child lacking geometry yields no metrics.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn land_use(ctx: &ReportContext, sketch: &Sketch) -> Result<ReportResult, ReportError> {
    if sketch.children().iter().any(|c| is_degenerate(&c.geometry)) {
        log::debug!("landUse: {} has a child without geometry", sketch.id());
        return Ok(ReportResult::default());
    }

    let buffered = buffer_sketch(sketch, LAND_USE_BUFFER_KM);
    Ok(ReportResult::new(
        classed_polygon_area(ctx, "landUse", &buffered, None).await?,
    ))
}

/// Number of distinct waterways within [`WATERWAY_BUFFER_KM`] of the
/// sketch.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn waterways(ctx: &ReportContext, sketch: &Sketch) -> Result<ReportResult, ReportError> {
    let group = ctx.project.metric_group("waterways")?;
    let ds = ctx.project.class_vector_datasource(group, None)?;
    let class_id = group.classes.first().map(|c| c.class_id.clone());

    let lines = fetch::lines(ctx, ds, &buffer_sketch(sketch, WATERWAY_BUFFER_KM)).await?;
    let metrics = overlap_line_count(&group.metric_id, &lines, sketch, WATERWAY_BUFFER_KM)
        .into_iter()
        .map(|m| match &class_id {
            Some(class_id) => m.with_class(class_id.as_str()),
            None => m,
        })
        .collect();

    Ok(ReportResult::new(metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection, context, feature, single, square};
    use geo::{LineString, MultiPolygon};
    use mpa_report_source::MemorySource;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_features(
                "population.geojson",
                vec![
                    feature(
                        serde_json::json!({ "Population": 120 }),
                        geo::Geometry::MultiPolygon(square(0.1, 0.0, 0.002)),
                    ),
                    feature(
                        serde_json::json!({ "Population": 5000 }),
                        geo::Geometry::MultiPolygon(square(1.0, 1.0, 0.1)),
                    ),
                ],
            )
            .with_features(
                "land_use.geojson",
                vec![
                    feature(
                        serde_json::json!({ "class": "Forest" }),
                        geo::Geometry::MultiPolygon(square(0.1, 0.0, 0.005)),
                    ),
                    feature(
                        serde_json::json!({ "class": "Settlement" }),
                        geo::Geometry::MultiPolygon(square(2.0, 2.0, 0.1)),
                    ),
                ],
            )
            .with_features(
                "waterways.geojson",
                vec![
                    feature(
                        serde_json::json!({}),
                        geo::Geometry::LineString(LineString::from(vec![(0.104, -1.0), (0.104, 1.0)])),
                    ),
                    feature(
                        serde_json::json!({}),
                        geo::Geometry::LineString(LineString::from(vec![(3.0, 3.0), (3.1, 3.1)])),
                    ),
                ],
            )
    }

    #[tokio::test]
    async fn population_counts_polygons_near_the_sketch() {
        let ctx = context(source());
        // The populated cell sits just east of the sketch edge.
        let sketch = single(square(0.0, 0.0, 0.0995));

        let result = population(&ctx, &sketch).await.unwrap();
        assert_eq!(result.metrics.len(), 1);
        assert_eq!(result.metrics[0].value, Some(120.0));
        assert_eq!(result.metrics[0].class_id.as_deref(), Some("population"));
    }

    #[tokio::test]
    async fn land_use_reports_buffered_area_per_class() {
        let ctx = context(source());
        let result = land_use(&ctx, &single(square(0.0, 0.0, 0.0995))).await.unwrap();

        let value = |class_id: &str| {
            result
                .metrics
                .iter()
                .find(|m| m.class_id.as_deref() == Some(class_id))
                .and_then(|m| m.value)
                .unwrap()
        };
        assert!(value("Forest") > 0.0);
        assert!(value("Settlement").abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn land_use_skips_sketches_missing_geometry() {
        let ctx = context(source());
        let sketch = collection(vec![square(0.0, 0.0, 0.1), MultiPolygon(vec![])]);
        assert!(land_use(&ctx, &sketch).await.unwrap().metrics.is_empty());
    }

    #[tokio::test]
    async fn waterways_counts_nearby_lines_once() {
        let ctx = context(source());
        let sketch = collection(vec![square(0.0, 0.0, 0.1), square(0.05, 0.0, 0.1)]);

        let result = waterways(&ctx, &sketch).await.unwrap();
        assert_eq!(result.metrics.len(), 1);
        assert_eq!(result.metrics[0].value, Some(1.0));
        assert_eq!(result.metrics[0].sketch_id.as_deref(), Some("collection"));
    }
}
