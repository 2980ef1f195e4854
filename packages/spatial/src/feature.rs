//! Typed reference features converted from raw `GeoJSON`.

use geo::{MultiLineString, MultiPolygon, Point};
use geojson::JsonObject;

/// A reference dataset feature with typed geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceFeature<G> {
    /// Position in the fetched feature list. Used as identity when
    /// deduplicating across children.
    pub index: usize,
    /// `GeoJSON` feature id, if present.
    pub id: Option<String>,
    /// Raw feature properties.
    pub properties: JsonObject,
    /// Feature geometry.
    pub geometry: G,
}

impl<G> ReferenceFeature<G> {
    /// Reads a property as a number, accepting numeric strings.
    #[must_use]
    pub fn number_property(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads a property as a string, stringifying numbers and booleans.
    #[must_use]
    pub fn string_property(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Keeps polygonal features, skipping anything else.
#[must_use]
pub fn polygon_features(features: Vec<geojson::Feature>) -> Vec<ReferenceFeature<MultiPolygon<f64>>> {
    convert(features, |geometry| match geometry {
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        _ => None,
    })
}

/// Keeps point features, skipping anything else.
#[must_use]
pub fn point_features(features: Vec<geojson::Feature>) -> Vec<ReferenceFeature<Point<f64>>> {
    convert(features, |geometry| match geometry {
        geo::Geometry::Point(p) => Some(p),
        _ => None,
    })
}

/// Keeps linear features, skipping anything else.
#[must_use]
pub fn line_features(features: Vec<geojson::Feature>) -> Vec<ReferenceFeature<MultiLineString<f64>>> {
    convert(features, |geometry| match geometry {
        geo::Geometry::LineString(ls) => Some(MultiLineString(vec![ls])),
        geo::Geometry::MultiLineString(mls) => Some(mls),
        _ => None,
    })
}

fn convert<G>(
    features: Vec<geojson::Feature>,
    select: impl Fn(geo::Geometry<f64>) -> Option<G>,
) -> Vec<ReferenceFeature<G>> {
    let mut skipped = 0usize;
    let converted: Vec<_> = features
        .into_iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let id = feature.id.as_ref().map(|id| match id {
                geojson::feature::Id::String(s) => s.clone(),
                geojson::feature::Id::Number(n) => n.to_string(),
            });
            let geometry = feature
                .geometry
                .and_then(|g| geo::Geometry::<f64>::try_from(g).ok())
                .and_then(&select);

            let Some(geometry) = geometry else {
                skipped += 1;
                return None;
            };

            Some(ReferenceFeature {
                index,
                id,
                properties: feature.properties.unwrap_or_default(),
                geometry,
            })
        })
        .collect();

    if skipped > 0 {
        log::debug!("Skipped {skipped} features with missing or mismatched geometry");
    }

    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(json: &str) -> Vec<geojson::Feature> {
        match json.parse::<geojson::GeoJson>().unwrap() {
            geojson::GeoJson::FeatureCollection(collection) => collection.features,
            other => panic!("expected a feature collection, got {other:?}"),
        }
    }

    const MIXED: &str = r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature", "properties": { "Population": "120", "class": 3 },
          "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] } },
        { "type": "Feature", "properties": { "name": "river" },
          "geometry": { "type": "LineString", "coordinates": [[0,0],[1,1]] } },
        { "type": "Feature", "properties": {}, "geometry": null },
        { "type": "Feature", "id": 7, "properties": { "station_id": "S1" },
          "geometry": { "type": "Point", "coordinates": [0.5, 0.5] } }
    ] }"#;

    #[test]
    fn filters_by_geometry_type_and_keeps_index() {
        assert_eq!(polygon_features(features(MIXED)).len(), 1);
        assert_eq!(line_features(features(MIXED))[0].index, 1);

        let points = point_features(features(MIXED));
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].index, 3);
        assert_eq!(points[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn reads_typed_properties() {
        let polygons = polygon_features(features(MIXED));
        assert_eq!(polygons[0].number_property("Population"), Some(120.0));
        assert_eq!(polygons[0].string_property("class").as_deref(), Some("3"));
        assert_eq!(polygons[0].number_property("missing"), None);
    }
}
