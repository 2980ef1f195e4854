#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metric records and the static configuration that describes them.
//!
//! [`Metric`] is the output contract handed to the rendering layer. The
//! remaining types ([`MetricGroup`], [`DataClass`], [`Datasource`],
//! [`Geography`]) describe which classes exist for a metric family and
//! which reference dataset backs each class. They are read-only input to
//! the overlap engines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Free-form per-metric annotations (sketch name, collection flag, ...).
///
/// A `BTreeMap` keeps serialisation order stable across runs.
pub type MetricExtra = BTreeMap<String, serde_json::Value>;

/// A single named, classed measurement tied optionally to a sketch.
///
/// `value` is `None` when there is no data for the sketch (for example a
/// raster with no populated cells under it), which is distinct from a
/// measured zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Statistic family (e.g. "size", "bathymetry").
    pub metric_id: String,
    /// Sub-category within the family (habitat type, year, sector, ...).
    #[serde(default)]
    pub class_id: Option<String>,
    /// Sketch this value belongs to. `None` for global baselines.
    #[serde(default)]
    pub sketch_id: Option<String>,
    /// Optional grouping (e.g. protection level).
    #[serde(default)]
    pub group_id: Option<String>,
    /// Geography the value was computed within.
    #[serde(default)]
    pub geography_id: Option<String>,
    /// Measured value.
    #[serde(default)]
    pub value: Option<f64>,
    /// Additional annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<MetricExtra>,
}

impl Metric {
    /// Creates a metric with only a family id and a value.
    #[must_use]
    pub fn new(metric_id: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            metric_id: metric_id.into(),
            class_id: None,
            sketch_id: None,
            group_id: None,
            geography_id: None,
            value,
            extra: None,
        }
    }

    /// Returns a copy with the class id set.
    #[must_use]
    pub fn with_class(self, class_id: impl Into<String>) -> Self {
        Self {
            class_id: Some(class_id.into()),
            ..self
        }
    }

    /// Returns a copy with the sketch id set.
    #[must_use]
    pub fn with_sketch(self, sketch_id: impl Into<String>) -> Self {
        Self {
            sketch_id: Some(sketch_id.into()),
            ..self
        }
    }

    /// Returns a copy with the geography id set.
    #[must_use]
    pub fn with_geography(self, geography_id: impl Into<String>) -> Self {
        Self {
            geography_id: Some(geography_id.into()),
            ..self
        }
    }

    /// Returns a copy with the group id set.
    #[must_use]
    pub fn with_group(self, group_id: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            ..self
        }
    }

    /// Returns a copy with one extra annotation added.
    #[must_use]
    pub fn with_extra(self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let mut extra = self.extra.unwrap_or_default();
        extra.insert(key.into(), value.into());
        Self {
            extra: Some(extra),
            ..self
        }
    }

    /// Returns a copy with the metric id replaced.
    #[must_use]
    pub fn with_metric_id(self, metric_id: impl Into<String>) -> Self {
        Self {
            metric_id: metric_id.into(),
            ..self
        }
    }

    /// Whether this metric was flagged as a collection-level rollup.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.extra
            .as_ref()
            .and_then(|extra| extra.get("isCollection"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Kind of backing dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasourceKind {
    /// Features (points, lines, polygons).
    Vector,
    /// Gridded cell values.
    Raster,
}

/// How raster cell values should be interpreted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MeasurementType {
    /// Cell values are measurements (depth, effort hours, ...).
    Quantitative,
    /// Cell values are class codes.
    Categorical,
}

/// A reference dataset registered with the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    /// Unique datasource identifier.
    pub datasource_id: String,
    /// Vector or raster.
    pub kind: DatasourceKind,
    /// Path relative to the data bucket (e.g. `"eez.geojson"`).
    pub path: String,
    /// Raster interpretation. Ignored for vector datasources.
    #[serde(default)]
    pub measurement_type: Option<MeasurementType>,
    /// Raster nodata value, when the file does not carry one.
    #[serde(default)]
    pub no_data_value: Option<f64>,
}

/// One class within a metric group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataClass {
    /// Class identifier, unique within its metric group.
    pub class_id: String,
    /// Display label.
    #[serde(default)]
    pub display: String,
    /// Datasource backing this class, overriding the group datasource.
    #[serde(default)]
    pub datasource_id: Option<String>,
    /// Feature property whose value selects members of this class,
    /// overriding the group class key.
    #[serde(default)]
    pub class_key: Option<String>,
    /// Cell value of this class in a categorical raster.
    #[serde(default)]
    pub numeric_class_id: Option<f64>,
}

/// A family of related classed metrics and their backing datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricGroup {
    /// Metric id assigned to every metric this group produces.
    pub metric_id: String,
    /// Datasource shared by every class that does not override it.
    #[serde(default)]
    pub datasource_id: Option<String>,
    /// Feature property discriminating classes, shared by every class that
    /// does not override it.
    #[serde(default)]
    pub class_key: Option<String>,
    /// Classes in display order.
    pub classes: Vec<DataClass>,
}

impl MetricGroup {
    /// Returns the class with the given id.
    #[must_use]
    pub fn class(&self, class_id: &str) -> Option<&DataClass> {
        self.classes.iter().find(|c| c.class_id == class_id)
    }

    /// Returns every class id in display order.
    #[must_use]
    pub fn class_ids(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.class_id.as_str()).collect()
    }
}

/// A planning boundary that sketches can be clipped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geography {
    /// Unique geography identifier.
    pub geography_id: String,
    /// Display label.
    #[serde(default)]
    pub display: String,
    /// Vector datasource holding the boundary polygons.
    pub datasource_id: String,
    /// Group name used to pick a default (e.g. `"default-boundary"`).
    #[serde(default)]
    pub groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_serializes_nulls_and_skips_missing_extra() {
        let metric = Metric::new("size", Some(12.5)).with_class("eez");
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "metricId": "size",
                "classId": "eez",
                "sketchId": null,
                "groupId": null,
                "geographyId": null,
                "value": 12.5,
            })
        );
    }

    #[test]
    fn metric_deserializes_sparse_records() {
        let metric: Metric =
            serde_json::from_str(r#"{ "metricId": "ousPeopleCount", "value": 3 }"#).unwrap();
        assert_eq!(metric.class_id, None);
        assert_eq!(metric.value, Some(3.0));
    }

    #[test]
    fn collection_flag_reads_extra() {
        let metric = Metric::new("x", None).with_extra("isCollection", true);
        assert!(metric.is_collection());
        assert!(!Metric::new("x", None).is_collection());
    }

    #[test]
    fn datasource_kind_parses_from_snake_case() {
        assert_eq!("raster".parse::<DatasourceKind>().unwrap(), DatasourceKind::Raster);
        assert_eq!(MeasurementType::Categorical.as_ref(), "categorical");
    }
}
