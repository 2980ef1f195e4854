//! Typed lookup of a feature's class from its properties.

use std::collections::BTreeSet;

use mpa_report_metric_models::MetricGroup;
use serde_json::{Map, Value};

use crate::ProjectError;

/// Maps a reference feature to one of a metric group's class ids by
/// reading a single property.
///
/// Built and validated when the project loads, so a group whose classes
/// cannot be discriminated fails early instead of silently matching
/// nothing at report time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDiscriminator {
    class_key: String,
    class_ids: BTreeSet<String>,
}

impl ClassDiscriminator {
    /// Builds the discriminator for the classes of `group` that use
    /// `class_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::InvalidClassKey`] if the key is empty or the
    /// classes sharing it have empty or duplicate ids.
    pub fn new(group: &MetricGroup, class_key: &str) -> Result<Self, ProjectError> {
        let invalid = |message: String| ProjectError::InvalidClassKey {
            metric_id: group.metric_id.clone(),
            message,
        };

        if class_key.trim().is_empty() {
            return Err(invalid("class key is empty".to_string()));
        }

        let mut class_ids = BTreeSet::new();
        for class in group
            .classes
            .iter()
            .filter(|c| c.class_key.as_deref().or(group.class_key.as_deref()) == Some(class_key))
        {
            if class.class_id.trim().is_empty() {
                return Err(invalid(format!("class key '{class_key}' has a class with an empty id")));
            }
            if !class_ids.insert(class.class_id.clone()) {
                return Err(invalid(format!(
                    "class id '{}' appears more than once",
                    class.class_id
                )));
            }
        }

        if class_ids.is_empty() {
            return Err(invalid(format!("no classes use class key '{class_key}'")));
        }

        Ok(Self {
            class_key: class_key.to_string(),
            class_ids,
        })
    }

    /// Property read by this discriminator.
    #[must_use]
    pub fn class_key(&self) -> &str {
        &self.class_key
    }

    /// The known class id of a feature, if its discriminating property
    /// names one. Numeric properties match their decimal rendering.
    #[must_use]
    pub fn class_of(&self, properties: &Map<String, Value>) -> Option<&str> {
        let value = match properties.get(&self.class_key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        self.class_ids.get(value.as_str()).map(String::as_str)
    }

    /// Whether a feature belongs to `class_id`.
    #[must_use]
    pub fn matches(&self, properties: &Map<String, Value>, class_id: &str) -> bool {
        self.class_of(properties) == Some(class_id)
    }
}
