#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Ocean-use survey (OUS) rows and the demographic aggregate built from
//! them.
//!
//! Survey exports are loose: numeric fields arrive as numbers or strings
//! and optional text fields may be null. [`SurveyValue`] accepts either
//! shape so rows deserialize without loss and validation happens in the
//! aggregator.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Village bucket for rows without a village.
pub const UNKNOWN_VILLAGE: &str = "unknown-village";
/// Sector bucket for rows without a sector.
pub const UNKNOWN_SECTOR: &str = "unknown-sector";
/// Gear bucket for rows without a fishing method.
pub const UNKNOWN_GEAR: &str = "unknown-gear";

/// A survey field that may be encoded as a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurveyValue {
    Number(f64),
    Text(String),
    /// Anything else (booleans, arrays, ...). Never numeric.
    Other(serde_json::Value),
}

impl SurveyValue {
    /// Numeric value, parsing strings. Non-finite values are rejected.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().ok()?,
            Self::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Value as a map key. Integral numbers render without a fraction.
    #[must_use]
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Number(n) if n.fract().abs() < f64::EPSILON && n.abs() < 1e15 => {
                Some(format!("{n:.0}"))
            }
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Self::Other(_) => None,
        }
    }
}

/// Properties of one survey shape. A respondent contributes one row per
/// sector they reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OusProperties {
    #[serde(default)]
    pub resp_id: Option<SurveyValue>,
    #[serde(default)]
    pub sector: Option<SurveyValue>,
    #[serde(default)]
    pub village: Option<SurveyValue>,
    /// Comma-separated gear list.
    #[serde(default)]
    pub fishing_method: Option<SurveyValue>,
    /// Size of the household or group the respondent speaks for.
    #[serde(default)]
    pub number_of_ppl: Option<SurveyValue>,
    /// People the respondent represents within this row's sector.
    #[serde(default)]
    pub rep_in_sector: Option<SurveyValue>,
}

impl OusProperties {
    /// Village name, or [`UNKNOWN_VILLAGE`].
    #[must_use]
    pub fn village_or_unknown(&self) -> String {
        self.village
            .as_ref()
            .and_then(SurveyValue::as_key)
            .unwrap_or_else(|| UNKNOWN_VILLAGE.to_string())
    }

    /// Sector name, or [`UNKNOWN_SECTOR`].
    #[must_use]
    pub fn sector_or_unknown(&self) -> String {
        self.sector
            .as_ref()
            .and_then(SurveyValue::as_key)
            .unwrap_or_else(|| UNKNOWN_SECTOR.to_string())
    }

    /// Gear tokens split on commas and trimmed, or [`UNKNOWN_GEAR`].
    #[must_use]
    pub fn gears(&self) -> Vec<String> {
        let methods = self
            .fishing_method
            .as_ref()
            .and_then(SurveyValue::as_key)
            .unwrap_or_default();
        let gears: Vec<String> = methods
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if gears.is_empty() {
            vec![UNKNOWN_GEAR.to_string()]
        } else {
            gears
        }
    }
}

/// One survey shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OusFeature {
    pub properties: OusProperties,
    /// Empty when the source row had no polygonal geometry.
    pub geometry: MultiPolygon<f64>,
    /// Raw `GeoJSON` properties, kept so rows can be written back out.
    pub raw_properties: geojson::JsonObject,
}

impl OusFeature {
    /// Reads a survey row from a `GeoJSON` feature. Properties that do not
    /// fit the survey schema are left as `None`.
    #[must_use]
    pub fn from_feature(feature: &geojson::Feature) -> Self {
        let raw_properties = feature.properties.clone().unwrap_or_default();
        let properties = serde_json::from_value(serde_json::Value::Object(raw_properties.clone()))
            .unwrap_or_default();
        let geometry = feature
            .geometry
            .clone()
            .and_then(|g| geo::Geometry::<f64>::try_from(g).ok())
            .and_then(|g| match g {
                geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
                geo::Geometry::MultiPolygon(mp) => Some(mp),
                _ => None,
            })
            .unwrap_or_else(|| MultiPolygon(vec![]));

        Self {
            properties,
            geometry,
            raw_properties,
        }
    }
}

/// People counts by bucket.
pub type ClassCountStats = BTreeMap<String, f64>;

/// Unique-person counts for a set of survey rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OusStats {
    pub people: f64,
    pub by_sector: ClassCountStats,
    pub by_village: ClassCountStats,
    pub by_gear: ClassCountStats,
}
