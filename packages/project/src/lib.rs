#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Project configuration: which datasources exist, how metric groups map
//! their classes onto them, which geographies sketches can be clipped to,
//! and the precalculated baselines used for percent-of-total values.
//!
//! Everything is embedded at compile time (see [`registry`]) and
//! validated once by [`Project::load`].

pub mod discriminator;
pub mod registry;

pub use discriminator::ClassDiscriminator;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use mpa_report_metric::MetricError;
use mpa_report_metric::baseline::{baseline_for, parse_baseline};
use mpa_report_metric_models::{Datasource, DatasourceKind, Geography, Metric, MetricGroup};
use mpa_report_source::{FeatureSource, source_for_base_url};

use crate::registry::ProjectSettings;

/// Environment variable overriding the configured data bucket URL.
pub const DATA_URL_ENV: &str = "MPA_REPORT_DATA_URL";

/// Configuration errors. All of them indicate a deployment mismatch and
/// are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// No datasource with this id.
    #[error("Datasource not found: {datasource_id}")]
    DatasourceNotFound {
        /// Requested datasource id.
        datasource_id: String,
    },

    /// No metric group with this metric id.
    #[error("Metric group not found: {metric_id}")]
    MetricGroupNotFound {
        /// Requested metric id.
        metric_id: String,
    },

    /// The metric group has no class with this id.
    #[error("Class '{class_id}' not found in metric group {metric_id}")]
    ClassNotFound {
        /// Metric group id.
        metric_id: String,
        /// Requested class id.
        class_id: String,
    },

    /// No geography with this id.
    #[error("Geography not found: {geography_id}")]
    GeographyNotFound {
        /// Requested geography id.
        geography_id: String,
    },

    /// A vector datasource was required.
    #[error("Expected vector datasource for {datasource_id}")]
    ExpectedVector {
        /// Offending datasource id.
        datasource_id: String,
    },

    /// A raster datasource was required.
    #[error("Expected raster datasource for {datasource_id}")]
    ExpectedRaster {
        /// Offending datasource id.
        datasource_id: String,
    },

    /// A class key cannot discriminate the group's classes.
    #[error("Invalid class key for metric group {metric_id}: {message}")]
    InvalidClassKey {
        /// Metric group id.
        metric_id: String,
        /// What is wrong.
        message: String,
    },

    /// Configuration is inconsistent (duplicate ids, dangling references).
    #[error("Invalid project configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },

    /// Embedded TOML failed to parse.
    #[error("Failed to parse project config '{name}': {message}")]
    Parse {
        /// Config entry name.
        name: String,
        /// Parser message.
        message: String,
    },

    /// Baseline metrics failed to parse.
    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),
}

/// Validated project configuration.
#[derive(Debug, Clone)]
pub struct Project {
    settings: ProjectSettings,
    datasources: BTreeMap<String, Datasource>,
    metric_groups: BTreeMap<String, MetricGroup>,
    geographies: Vec<Geography>,
    precalc: Vec<Metric>,
}

impl Project {
    /// Loads and validates the embedded project configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError`] if any embedded file fails to parse or the
    /// configuration is inconsistent.
    pub fn load() -> Result<Self, ProjectError> {
        Self::new(
            registry::settings()?,
            registry::all_datasources()?,
            registry::all_metric_groups()?,
            registry::all_geographies()?,
            parse_baseline(registry::PRECALC_METRICS_JSON)?,
        )
    }

    /// Builds a project from parts, validating that ids are unique, every
    /// reference resolves and every class key can discriminate its classes.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError`] describing the first inconsistency found.
    pub fn new(
        settings: ProjectSettings,
        datasources: Vec<Datasource>,
        metric_groups: Vec<MetricGroup>,
        geographies: Vec<Geography>,
        precalc: Vec<Metric>,
    ) -> Result<Self, ProjectError> {
        let mut datasource_map = BTreeMap::new();
        for ds in datasources {
            if let Some(previous) = datasource_map.insert(ds.datasource_id.clone(), ds) {
                return Err(ProjectError::Invalid {
                    message: format!("duplicate datasource '{}'", previous.datasource_id),
                });
            }
        }

        let mut group_map = BTreeMap::new();
        for group in metric_groups {
            if let Some(previous) = group_map.insert(group.metric_id.clone(), group) {
                return Err(ProjectError::Invalid {
                    message: format!("duplicate metric group '{}'", previous.metric_id),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for geography in &geographies {
            if !seen.insert(geography.geography_id.as_str()) {
                return Err(ProjectError::Invalid {
                    message: format!("duplicate geography '{}'", geography.geography_id),
                });
            }
        }

        let project = Self {
            settings,
            datasources: datasource_map,
            metric_groups: group_map,
            geographies,
            precalc,
        };
        project.validate()?;

        log::debug!(
            "Loaded project with {} datasources, {} metric groups, {} geographies",
            project.datasources.len(),
            project.metric_groups.len(),
            project.geographies.len()
        );
        Ok(project)
    }

    fn validate(&self) -> Result<(), ProjectError> {
        for group in self.metric_groups.values() {
            let mut class_ids = BTreeSet::new();
            for class in &group.classes {
                if !class_ids.insert(class.class_id.as_str()) {
                    return Err(ProjectError::Invalid {
                        message: format!(
                            "metric group '{}' repeats class '{}'",
                            group.metric_id, class.class_id
                        ),
                    });
                }
                self.metric_group_datasource(group, Some(class.class_id.as_str()))?;
                if let Some(key) = self.class_key(group, &class.class_id) {
                    ClassDiscriminator::new(group, key)?;
                }
            }
        }

        if !self.geographies.iter().any(|g| g.geography_id == self.settings.default_geography) {
            return Err(ProjectError::GeographyNotFound {
                geography_id: self.settings.default_geography.clone(),
            });
        }
        for geography in &self.geographies {
            self.vector_datasource(&geography.datasource_id)?;
        }

        Ok(())
    }

    /// Data bucket URL, preferring [`DATA_URL_ENV`] when set.
    #[must_use]
    pub fn data_url(&self) -> String {
        std::env::var(DATA_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.settings.data_url.clone())
    }

    /// Reference data backend for [`Self::data_url`].
    #[must_use]
    pub fn source(&self) -> Arc<dyn FeatureSource> {
        source_for_base_url(&self.data_url())
    }

    /// Looks up a metric group by metric id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::MetricGroupNotFound`] if unknown.
    pub fn metric_group(&self, metric_id: &str) -> Result<&MetricGroup, ProjectError> {
        self.metric_groups
            .get(metric_id)
            .ok_or_else(|| ProjectError::MetricGroupNotFound {
                metric_id: metric_id.to_string(),
            })
    }

    /// Every registered metric group, ordered by metric id.
    pub fn metric_groups(&self) -> impl Iterator<Item = &MetricGroup> {
        self.metric_groups.values()
    }

    /// Looks up a datasource by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::DatasourceNotFound`] if unknown.
    pub fn datasource(&self, datasource_id: &str) -> Result<&Datasource, ProjectError> {
        self.datasources
            .get(datasource_id)
            .ok_or_else(|| ProjectError::DatasourceNotFound {
                datasource_id: datasource_id.to_string(),
            })
    }

    /// The datasource backing a class of `group`: the class's own
    /// datasource if it has one, else the group's. Without a class id the
    /// group datasource is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ClassNotFound`] for an unknown class and
    /// [`ProjectError::DatasourceNotFound`] when nothing resolves.
    pub fn metric_group_datasource(
        &self,
        group: &MetricGroup,
        class_id: Option<&str>,
    ) -> Result<&Datasource, ProjectError> {
        let class_datasource = match class_id {
            Some(class_id) => group
                .class(class_id)
                .ok_or_else(|| ProjectError::ClassNotFound {
                    metric_id: group.metric_id.clone(),
                    class_id: class_id.to_string(),
                })?
                .datasource_id
                .as_deref(),
            None => None,
        };

        let datasource_id = class_datasource
            .or(group.datasource_id.as_deref())
            .ok_or_else(|| ProjectError::DatasourceNotFound {
                datasource_id: format!("{}:{}", group.metric_id, class_id.unwrap_or("*")),
            })?;
        self.datasource(datasource_id)
    }

    /// Looks up a datasource and checks it is vector.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ExpectedVector`] for a raster datasource.
    pub fn vector_datasource(&self, datasource_id: &str) -> Result<&Datasource, ProjectError> {
        ensure_kind(self.datasource(datasource_id)?, DatasourceKind::Vector)
    }

    /// The vector datasource backing a class of `group`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ExpectedVector`] for a raster datasource, or
    /// any lookup error of [`Self::metric_group_datasource`].
    pub fn class_vector_datasource(
        &self,
        group: &MetricGroup,
        class_id: Option<&str>,
    ) -> Result<&Datasource, ProjectError> {
        ensure_kind(self.metric_group_datasource(group, class_id)?, DatasourceKind::Vector)
    }

    /// The raster datasource backing a class of `group`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ExpectedRaster`] for a vector datasource, or
    /// any lookup error of [`Self::metric_group_datasource`].
    pub fn class_raster_datasource(
        &self,
        group: &MetricGroup,
        class_id: Option<&str>,
    ) -> Result<&Datasource, ProjectError> {
        ensure_kind(self.metric_group_datasource(group, class_id)?, DatasourceKind::Raster)
    }

    /// Property discriminating `class_id` within `group`, if any.
    #[must_use]
    pub fn class_key<'a>(&self, group: &'a MetricGroup, class_id: &str) -> Option<&'a str> {
        group
            .class(class_id)
            .and_then(|c| c.class_key.as_deref())
            .or(group.class_key.as_deref())
    }

    /// Discriminator selecting members of `class_id`, or `None` when the
    /// class takes every feature of its datasource.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::InvalidClassKey`] if the key cannot
    /// discriminate the group's classes.
    pub fn class_discriminator(
        &self,
        group: &MetricGroup,
        class_id: &str,
    ) -> Result<Option<ClassDiscriminator>, ProjectError> {
        self.class_key(group, class_id)
            .map(|key| ClassDiscriminator::new(group, key))
            .transpose()
    }

    /// Looks up a geography by id.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::GeographyNotFound`] if unknown.
    pub fn geography(&self, geography_id: &str) -> Result<&Geography, ProjectError> {
        self.geographies
            .iter()
            .find(|g| g.geography_id == geography_id)
            .ok_or_else(|| ProjectError::GeographyNotFound {
                geography_id: geography_id.to_string(),
            })
    }

    /// The geography reports use when none is requested.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::GeographyNotFound`] if the configured default
    /// is unknown.
    pub fn default_geography(&self) -> Result<&Geography, ProjectError> {
        self.geography(&self.settings.default_geography)
    }

    /// Precalculated baseline metrics for a metric id, optionally
    /// restricted to a geography.
    #[must_use]
    pub fn precalc_metrics(&self, metric_id: &str, geography_id: Option<&str>) -> Vec<Metric> {
        baseline_for(&self.precalc, metric_id, geography_id)
    }
}

fn ensure_kind(ds: &Datasource, kind: DatasourceKind) -> Result<&Datasource, ProjectError> {
    if ds.kind == kind {
        return Ok(ds);
    }
    let datasource_id = ds.datasource_id.clone();
    Err(match kind {
        DatasourceKind::Vector => ProjectError::ExpectedVector { datasource_id },
        DatasourceKind::Raster => ProjectError::ExpectedRaster { datasource_id },
    })
}
