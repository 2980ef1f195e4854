//! Compile-time registry of project configuration.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a new metric group requires creating a TOML file in
//! `config/metric_groups/` and adding a corresponding entry here.

use mpa_report_metric_models::{Datasource, Geography, MetricGroup};
use serde::Deserialize;

use crate::ProjectError;

/// Number of registered metric groups. Updated when new groups are added.
/// Enforced by a test.
#[cfg(test)]
const EXPECTED_METRIC_GROUP_COUNT: usize = 22;

const PROJECT_TOML: &str = include_str!("../config/project.toml");
const DATASOURCES_TOML: &str = include_str!("../config/datasources.toml");
const GEOGRAPHIES_TOML: &str = include_str!("../config/geographies.toml");

/// Precalculated baseline metrics, a JSON array of metrics.
pub const PRECALC_METRICS_JSON: &str = include_str!("../config/precalc/metrics.json");

/// Embedded metric group definitions.
const METRIC_GROUP_TOMLS: &[(&str, &str)] = &[
    ("size", include_str!("../config/metric_groups/size.toml")),
    (
        "geomorph_aca",
        include_str!("../config/metric_groups/geomorph_aca.toml"),
    ),
    (
        "benthic_aca",
        include_str!("../config/metric_groups/benthic_aca.toml"),
    ),
    (
        "reef_extent_aca",
        include_str!("../config/metric_groups/reef_extent_aca.toml"),
    ),
    (
        "bathymetry",
        include_str!("../config/metric_groups/bathymetry.toml"),
    ),
    ("dhw", include_str!("../config/metric_groups/dhw.toml")),
    ("gfw", include_str!("../config/metric_groups/gfw.toml")),
    (
        "mangroves",
        include_str!("../config/metric_groups/mangroves.toml"),
    ),
    (
        "bleaching_alerts",
        include_str!("../config/metric_groups/bleaching_alerts.toml"),
    ),
    (
        "population",
        include_str!("../config/metric_groups/population.toml"),
    ),
    ("land_use", include_str!("../config/metric_groups/land_use.toml")),
    (
        "waterways",
        include_str!("../config/metric_groups/waterways.toml"),
    ),
    ("sites", include_str!("../config/metric_groups/sites.toml")),
    ("richness", include_str!("../config/metric_groups/richness.toml")),
    ("isotopes", include_str!("../config/metric_groups/isotopes.toml")),
    (
        "benthic_cover",
        include_str!("../config/metric_groups/benthic_cover.toml"),
    ),
    (
        "juvenile_coral_density",
        include_str!("../config/metric_groups/juvenile_coral_density.toml"),
    ),
    (
        "fish_biomass",
        include_str!("../config/metric_groups/fish_biomass.toml"),
    ),
    (
        "fish_density",
        include_str!("../config/metric_groups/fish_density.toml"),
    ),
    (
        "invert_density",
        include_str!("../config/metric_groups/invert_density.toml"),
    ),
    ("seamounts", include_str!("../config/metric_groups/seamounts.toml")),
    ("ous", include_str!("../config/metric_groups/ous.toml")),
];

/// Project-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    /// Base URL of the reference data bucket.
    pub data_url: String,
    /// Geography used when a report does not name one.
    pub default_geography: String,
}

#[derive(Deserialize)]
struct DatasourceFile {
    datasources: Vec<Datasource>,
}

#[derive(Deserialize)]
struct GeographyFile {
    geographies: Vec<Geography>,
}

fn parse<T: for<'de> Deserialize<'de>>(name: &str, toml_str: &str) -> Result<T, ProjectError> {
    toml::de::from_str(toml_str).map_err(|e| ProjectError::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Returns the embedded project settings.
///
/// # Errors
///
/// Returns [`ProjectError::Parse`] if the embedded TOML is malformed.
pub fn settings() -> Result<ProjectSettings, ProjectError> {
    parse("project", PROJECT_TOML)
}

/// Returns every registered datasource.
///
/// # Errors
///
/// Returns [`ProjectError::Parse`] if the embedded TOML is malformed.
pub fn all_datasources() -> Result<Vec<Datasource>, ProjectError> {
    Ok(parse::<DatasourceFile>("datasources", DATASOURCES_TOML)?.datasources)
}

/// Returns every registered geography.
///
/// # Errors
///
/// Returns [`ProjectError::Parse`] if the embedded TOML is malformed.
pub fn all_geographies() -> Result<Vec<Geography>, ProjectError> {
    Ok(parse::<GeographyFile>("geographies", GEOGRAPHIES_TOML)?.geographies)
}

/// Returns every registered metric group.
///
/// # Errors
///
/// Returns [`ProjectError::Parse`] naming the first group whose TOML is
/// malformed.
pub fn all_metric_groups() -> Result<Vec<MetricGroup>, ProjectError> {
    METRIC_GROUP_TOMLS
        .iter()
        .map(|(name, toml_str)| parse(name, toml_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpa_report_metric_models::DatasourceKind;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_metric_groups() {
        let groups = all_metric_groups().unwrap();
        assert_eq!(
            groups.len(),
            EXPECTED_METRIC_GROUP_COUNT,
            "Expected {EXPECTED_METRIC_GROUP_COUNT} metric groups, found {}. \
             Update EXPECTED_METRIC_GROUP_COUNT after adding/removing groups.",
            groups.len()
        );
    }

    #[test]
    fn metric_ids_are_unique() {
        let groups = all_metric_groups().unwrap();
        let mut seen = BTreeSet::new();
        for group in &groups {
            assert!(
                seen.insert(&group.metric_id),
                "Duplicate metric group: {}",
                group.metric_id
            );
        }
    }

    #[test]
    fn datasource_ids_are_unique() {
        let datasources = all_datasources().unwrap();
        let mut seen = BTreeSet::new();
        for ds in &datasources {
            assert!(
                seen.insert(&ds.datasource_id),
                "Duplicate datasource: {}",
                ds.datasource_id
            );
        }
    }

    #[test]
    fn all_groups_have_required_fields() {
        for group in &all_metric_groups().unwrap() {
            assert!(!group.metric_id.is_empty(), "Group has empty metric id");
            assert!(
                !group.classes.is_empty(),
                "Group {} has no classes",
                group.metric_id
            );
            for class in &group.classes {
                assert!(
                    !class.class_id.is_empty(),
                    "Group {} has a class with an empty id",
                    group.metric_id
                );
            }
        }
    }

    #[test]
    fn rasters_declare_measurement_type() {
        for ds in all_datasources().unwrap() {
            if ds.kind == DatasourceKind::Raster {
                assert!(
                    ds.measurement_type.is_some(),
                    "Raster {} has no measurement type",
                    ds.datasource_id
                );
            }
        }
    }

    #[test]
    fn settings_name_a_registered_geography() {
        let settings = settings().unwrap();
        let geographies = all_geographies().unwrap();
        assert!(
            geographies
                .iter()
                .any(|g| g.geography_id == settings.default_geography)
        );
    }
}
