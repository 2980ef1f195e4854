//! Sketch preprocessors. Each clips a drawn shape against land or EEZ
//! boundaries and keeps the largest remaining polygon.

use geo::{BooleanOps as _, BoundingRect as _, GeodesicArea as _, MultiPolygon, Polygon};
use mpa_report_sketch_models::to_multi_polygon;
use mpa_report_spatial::{geodesic_area, is_degenerate, union_all};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::{ReportContext, ReportError, fetch};

/// Land polygons.
pub const LAND_DATASOURCE: &str = "land";

/// EEZ boundaries unioned with land.
pub const EEZ_LAND_UNION_DATASOURCE: &str = "eezLandUnion";

/// Every preprocessor the CLI can run, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Preprocessor {
    /// Removes land.
    ClipToOcean,
    /// Removes land, then keeps the part inside the EEZ.
    ClipToOceanEez,
    /// Keeps the part on land.
    ClipToLand,
}

impl Preprocessor {
    const fn nothing_left(self) -> &'static str {
        match self {
            Self::ClipToOcean => "Feature is not in the ocean",
            Self::ClipToOceanEez => "Feature is outside of EEZ boundary",
            Self::ClipToLand => "Feature is outside of land boundary",
        }
    }
}

fn invalid(message: &str) -> ReportError {
    ReportError::Validation {
        message: message.to_string(),
    }
}

/// Polygons of `datasource_id` within the bounding box of `geometry`.
async fn boundary(
    ctx: &ReportContext,
    datasource_id: &str,
    geometry: &MultiPolygon<f64>,
) -> Result<Vec<MultiPolygon<f64>>, ReportError> {
    let ds = ctx.project.vector_datasource(datasource_id)?;
    let features = fetch::polygons_in_bbox(ctx, ds, geometry.bounding_rect()).await?;
    Ok(features.into_iter().map(|f| f.geometry).collect())
}

async fn erase_land(ctx: &ReportContext, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, ReportError> {
    let land = boundary(ctx, LAND_DATASOURCE, geometry).await?;
    if land.is_empty() {
        return Ok(geometry.clone());
    }
    Ok(geometry.difference(&union_all(&land)))
}

fn biggest_polygon(geometry: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    geometry
        .0
        .into_iter()
        .map(|p| (p.geodesic_area_unsigned(), p))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, p)| p)
}

/// Clips `geometry` as `preprocessor` describes and returns the largest
/// remaining polygon.
///
/// # Errors
///
/// Returns [`ReportError::Validation`] if the input has no area or nothing
/// is left after clipping, and [`ReportError`] on configuration or fetch
/// failure.
pub async fn clip_polygon(
    ctx: &ReportContext,
    preprocessor: Preprocessor,
    geometry: &MultiPolygon<f64>,
) -> Result<Polygon<f64>, ReportError> {
    if is_degenerate(geometry) {
        return Err(invalid("Input must be a polygon"));
    }

    let clipped = match preprocessor {
        Preprocessor::ClipToOcean => erase_land(ctx, geometry).await?,
        Preprocessor::ClipToOceanEez => {
            let ocean = erase_land(ctx, geometry).await?;
            let eez = boundary(ctx, EEZ_LAND_UNION_DATASOURCE, geometry).await?;
            ocean.intersection(&union_all(&eez))
        }
        Preprocessor::ClipToLand => {
            let land = boundary(ctx, LAND_DATASOURCE, geometry).await?;
            geometry.intersection(&union_all(&land))
        }
    };

    let area = geodesic_area(&clipped);
    log::debug!("{preprocessor}: {} polygons, {area:.0} m² left", clipped.0.len());
    if area <= 0.0 {
        return Err(invalid(preprocessor.nothing_left()));
    }
    biggest_polygon(clipped).ok_or_else(|| invalid(preprocessor.nothing_left()))
}

/// Preprocesses a drawn `GeoJSON` feature. The returned feature keeps the
/// input's id and properties with its geometry replaced.
///
/// # Errors
///
/// Returns [`ReportError::Validation`] for non-polygonal input or when
/// nothing is left after clipping.
pub async fn preprocess(
    ctx: &ReportContext,
    preprocessor: Preprocessor,
    feature: geojson::Feature,
) -> Result<geojson::Feature, ReportError> {
    let geometry = feature
        .geometry
        .clone()
        .and_then(|g| to_multi_polygon(g).ok())
        .ok_or_else(|| invalid("Input must be a polygon"))?;

    let polygon = clip_polygon(ctx, preprocessor, &geometry).await?;
    Ok(geojson::Feature {
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&polygon))),
        ..feature
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, feature, square};
    use geo::{BoundingRect as _, Rect, coord};
    use mpa_report_source::MemorySource;

    fn strip(min_x: f64, max_x: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![
            Rect::new(coord! { x: min_x, y: -1.0 }, coord! { x: max_x, y: 2.0 }).to_polygon(),
        ])
    }

    fn source(land: Vec<MultiPolygon<f64>>, eez: Vec<MultiPolygon<f64>>) -> MemorySource {
        let features = |shapes: Vec<MultiPolygon<f64>>| -> Vec<geojson::Feature> {
            shapes
                .into_iter()
                .map(|g| feature(serde_json::json!({}), geo::Geometry::MultiPolygon(g)))
                .collect()
        };
        MemorySource::new()
            .with_features("land.geojson", features(land))
            .with_features("eez_land_union.geojson", features(eez))
    }

    fn x_range(polygon: &Polygon<f64>) -> (f64, f64) {
        let rect = polygon.bounding_rect().unwrap();
        (rect.min().x, rect.max().x)
    }

    fn close(actual: (f64, f64), expected: (f64, f64)) -> bool {
        (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9
    }

    #[tokio::test]
    async fn ocean_clip_removes_land() {
        let ctx = context(source(vec![square(0.0, 0.0, 1.0)], vec![]));
        let polygon = clip_polygon(&ctx, Preprocessor::ClipToOcean, &square(0.5, 0.0, 1.0))
            .await
            .unwrap();
        assert!(close(x_range(&polygon), (1.0, 1.5)));
    }

    #[tokio::test]
    async fn ocean_clip_keeps_biggest_piece() {
        let ctx = context(source(vec![strip(0.4, 0.5)], vec![]));
        let polygon = clip_polygon(&ctx, Preprocessor::ClipToOcean, &square(0.0, 0.0, 1.0))
            .await
            .unwrap();
        assert!(close(x_range(&polygon), (0.5, 1.0)));
    }

    #[tokio::test]
    async fn shape_entirely_on_land_is_not_in_the_ocean() {
        let ctx = context(source(vec![square(0.0, 0.0, 1.0)], vec![]));
        let err = clip_polygon(&ctx, Preprocessor::ClipToOcean, &square(0.2, 0.2, 0.5))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Feature is not in the ocean");
    }

    #[tokio::test]
    async fn eez_clip_removes_land_then_keeps_eez() {
        let ctx = context(source(vec![square(0.0, 0.0, 1.0)], vec![square(0.0, 0.0, 1.2)]));
        let polygon = clip_polygon(&ctx, Preprocessor::ClipToOceanEez, &square(0.5, 0.0, 1.0))
            .await
            .unwrap();
        assert!(close(x_range(&polygon), (1.0, 1.2)));
    }

    #[tokio::test]
    async fn eez_clip_without_eez_fails() {
        let ctx = context(source(vec![], vec![square(10.0, 10.0, 1.0)]));
        let err = clip_polygon(&ctx, Preprocessor::ClipToOceanEez, &square(0.0, 0.0, 1.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Feature is outside of EEZ boundary");
    }

    #[tokio::test]
    async fn land_clip_keeps_land() {
        let ctx = context(source(vec![square(0.0, 0.0, 1.0)], vec![]));
        let polygon = clip_polygon(&ctx, Preprocessor::ClipToLand, &square(0.5, 0.0, 1.0))
            .await
            .unwrap();
        assert!(close(x_range(&polygon), (0.5, 1.0)));

        let err = clip_polygon(&ctx, Preprocessor::ClipToLand, &square(3.0, 3.0, 1.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Feature is outside of land boundary");
    }

    #[tokio::test]
    async fn preprocess_keeps_properties_and_rejects_points() {
        let ctx = context(source(vec![square(0.0, 0.0, 1.0)], vec![]));
        let drawn = feature(
            serde_json::json!({ "name": "Reef" }),
            geo::Geometry::MultiPolygon(square(0.5, 0.0, 1.0)),
        );

        let clipped = preprocess(&ctx, Preprocessor::ClipToOcean, drawn).await.unwrap();
        assert_eq!(clipped.property("name").and_then(serde_json::Value::as_str), Some("Reef"));
        assert!(matches!(
            clipped.geometry.map(|g| g.value),
            Some(geojson::Value::Polygon(_))
        ));

        let point = feature(serde_json::json!({}), geo::Geometry::Point(geo::Point::new(0.5, 0.5)));
        let err = preprocess(&ctx, Preprocessor::ClipToOcean, point).await.unwrap_err();
        assert!(matches!(err, ReportError::Validation { .. }));
        assert_eq!(err.to_string(), "Input must be a polygon");
    }

    #[test]
    fn preprocessor_names() {
        assert_eq!("clipToOceanEez".parse::<Preprocessor>().unwrap(), Preprocessor::ClipToOceanEez);
        assert_eq!(Preprocessor::ClipToLand.to_string(), "clipToLand");
    }
}
