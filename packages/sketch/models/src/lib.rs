#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sketch and sketch collection geometry types.
//!
//! A sketch is a user-drawn candidate protected area. Reports accept either
//! a single sketch or a named collection of child sketches, modelled here
//! as the [`Sketch`] tagged union so every engine matches exhaustively on
//! the two shapes instead of probing at runtime.

use geo::{BoundingRect, MultiPolygon, Rect};
use geojson::{GeoJson, JsonObject};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building a sketch from `GeoJSON`.
#[derive(Debug, Error)]
pub enum SketchError {
    /// The input could not be parsed as `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// A required property was absent.
    #[error("Sketch is missing required property '{name}'")]
    MissingProperty {
        /// Name of the missing property.
        name: &'static str,
    },

    /// The geometry type cannot describe an area.
    #[error("Unsupported sketch geometry type: {kind}")]
    UnsupportedGeometry {
        /// `GeoJSON` geometry type that was encountered.
        kind: String,
    },

    /// A bare geometry was supplied where a feature was expected.
    #[error("Expected a Feature or FeatureCollection, found a bare geometry")]
    NotAFeature,
}

/// A single polygonal sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchFeature {
    /// Sketch identifier.
    pub id: String,
    /// Human-readable sketch name.
    pub name: String,
    /// Sketch geometry. Empty when an upstream clip removed everything.
    pub geometry: MultiPolygon<f64>,
}

impl SketchFeature {
    /// Creates a sketch feature.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            geometry,
        }
    }

    /// Returns the identity of this sketch without its geometry.
    #[must_use]
    pub fn properties(&self) -> ChildProperties {
        ChildProperties {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// A named group of child sketches reported both as a whole and per child.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchCollection {
    /// Collection identifier.
    pub id: String,
    /// Human-readable collection name.
    pub name: String,
    /// Child sketches, each independently addressable.
    pub children: Vec<SketchFeature>,
}

impl SketchCollection {
    /// Creates a sketch collection.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<SketchFeature>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children,
        }
    }
}

/// Identity of one child sketch, as exposed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildProperties {
    /// Child sketch identifier.
    pub id: String,
    /// Child sketch name.
    pub name: String,
}

/// Either a single sketch or a collection of sketches.
#[derive(Debug, Clone, PartialEq)]
pub enum Sketch {
    /// One polygonal sketch.
    Single(SketchFeature),
    /// A named group of sketches.
    Collection(SketchCollection),
}

impl Sketch {
    /// Returns the top-level identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Single(feature) => &feature.id,
            Self::Collection(collection) => &collection.id,
        }
    }

    /// Returns the top-level name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Single(feature) => &feature.name,
            Self::Collection(collection) => &collection.name,
        }
    }

    /// Whether this is a collection.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Returns the individual sketches. A single sketch is its own only child.
    #[must_use]
    pub fn children(&self) -> &[SketchFeature] {
        match self {
            Self::Single(feature) => std::slice::from_ref(feature),
            Self::Collection(collection) => &collection.children,
        }
    }

    /// Returns id/name pairs for every child sketch.
    #[must_use]
    pub fn child_properties(&self) -> Vec<ChildProperties> {
        self.children()
            .iter()
            .map(SketchFeature::properties)
            .collect()
    }

    /// Bounding box over all child geometries, `None` when every child is
    /// empty.
    #[must_use]
    pub fn bbox(&self) -> Option<Rect<f64>> {
        self.children()
            .iter()
            .filter_map(|child| child.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }

    /// Returns a copy with every child geometry replaced by `f(child)`.
    ///
    /// Identity and structure are preserved.
    #[must_use]
    pub fn with_children_geometry<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&SketchFeature) -> MultiPolygon<f64>,
    {
        let mut remap = |child: &SketchFeature| SketchFeature {
            geometry: f(child),
            ..child.clone()
        };

        match self {
            Self::Single(feature) => Self::Single(remap(feature)),
            Self::Collection(collection) => Self::Collection(SketchCollection {
                id: collection.id.clone(),
                name: collection.name.clone(),
                children: collection.children.iter().map(&mut remap).collect(),
            }),
        }
    }
}

impl std::str::FromStr for Sketch {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let geojson: GeoJson = s.parse()?;
        Self::try_from(geojson)
    }
}

impl TryFrom<GeoJson> for Sketch {
    type Error = SketchError;

    fn try_from(geojson: GeoJson) -> Result<Self, Self::Error> {
        match geojson {
            GeoJson::Feature(feature) => Ok(Self::Single(SketchFeature::try_from(feature)?)),
            GeoJson::FeatureCollection(collection) => {
                let properties = collection
                    .foreign_members
                    .as_ref()
                    .and_then(|members| members.get("properties"))
                    .and_then(serde_json::Value::as_object)
                    .ok_or(SketchError::MissingProperty { name: "properties" })?;

                let id = property_string(properties, "id")
                    .ok_or(SketchError::MissingProperty { name: "id" })?;
                let name = property_string(properties, "name").unwrap_or_else(|| id.clone());

                let children = collection
                    .features
                    .into_iter()
                    .map(SketchFeature::try_from)
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Self::Collection(SketchCollection { id, name, children }))
            }
            GeoJson::Geometry(_) => Err(SketchError::NotAFeature),
        }
    }
}

impl TryFrom<geojson::Feature> for SketchFeature {
    type Error = SketchError;

    fn try_from(feature: geojson::Feature) -> Result<Self, Self::Error> {
        let empty = JsonObject::new();
        let properties = feature.properties.as_ref().unwrap_or(&empty);

        let id = property_string(properties, "id")
            .or_else(|| {
                feature.id.as_ref().map(|id| match id {
                    geojson::feature::Id::String(s) => s.clone(),
                    geojson::feature::Id::Number(n) => n.to_string(),
                })
            })
            .ok_or(SketchError::MissingProperty { name: "id" })?;
        let name = property_string(properties, "name").unwrap_or_else(|| id.clone());

        let geometry = match feature.geometry {
            Some(geometry) => to_multi_polygon(geometry)?,
            None => MultiPolygon(vec![]),
        };

        Ok(Self { id, name, geometry })
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`], accepting
/// `Polygon` and `MultiPolygon` input.
///
/// # Errors
///
/// Returns [`SketchError::UnsupportedGeometry`] for non-areal geometries.
pub fn to_multi_polygon(geometry: geojson::Geometry) -> Result<MultiPolygon<f64>, SketchError> {
    let kind = geometry_kind(&geometry.value);
    match geo::Geometry::<f64>::try_from(geometry)? {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err(SketchError::UnsupportedGeometry { kind }),
    }
}

/// Returns the `GeoJSON` type name of a geometry value.
fn geometry_kind(value: &geojson::Value) -> String {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
    .to_string()
}

/// Reads a property as a string, accepting numeric ids.
fn property_string(properties: &JsonObject, key: &str) -> Option<String> {
    match properties.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
