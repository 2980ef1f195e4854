//! Precalculated baseline files.
//!
//! Baselines are JSON arrays of [`Metric`] with `sketchId: null`, produced
//! offline and read at report time as percent-of-total denominators.

use std::path::Path;

use mpa_report_metric_models::Metric;

use crate::MetricError;
use crate::normalize::normalize_metrics;

/// Parses a baseline JSON array.
///
/// # Errors
///
/// Returns [`MetricError::Json`] if the document is not an array of metrics.
pub fn parse_baseline(json: &str) -> Result<Vec<Metric>, MetricError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a baseline JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_baseline(path: &Path) -> Result<Vec<Metric>, MetricError> {
    let json = std::fs::read_to_string(path)?;
    parse_baseline(&json)
}

/// Normalizes and writes baseline metrics as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_baseline(path: &Path, metrics: Vec<Metric>) -> Result<(), MetricError> {
    let metrics = normalize_metrics(metrics);
    let json = serde_json::to_string_pretty(&metrics)?;
    std::fs::write(path, json)?;
    log::info!("Wrote {} baseline metrics to {}", metrics.len(), path.display());
    Ok(())
}

/// Selects the baseline metrics for one metric id, optionally restricted to
/// a geography. Baselines without a geography match any geography.
#[must_use]
pub fn baseline_for(baseline: &[Metric], metric_id: &str, geography_id: Option<&str>) -> Vec<Metric> {
    baseline
        .iter()
        .filter(|m| m.metric_id == metric_id)
        .filter(|m| match (geography_id, m.geography_id.as_deref()) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASELINE: &str = r#"[
        { "metricId": "seamounts", "classId": "deep", "geographyId": "eez", "value": 12 },
        { "metricId": "seamounts", "classId": "shallow", "geographyId": "eez", "value": 3 },
        { "metricId": "seamounts", "classId": "deep", "geographyId": "nearshore", "value": 1 },
        { "metricId": "ousPeopleCount", "classId": "ousPeopleCount_all", "value": 250 }
    ]"#;

    #[test]
    fn parses_sparse_baseline() {
        let baseline = parse_baseline(BASELINE).unwrap();
        assert_eq!(baseline.len(), 4);
        assert_eq!(baseline[0].value, Some(12.0));
        assert_eq!(baseline[3].geography_id, None);
    }

    #[test]
    fn filters_by_metric_and_geography() {
        let baseline = parse_baseline(BASELINE).unwrap();
        let eez = baseline_for(&baseline, "seamounts", Some("eez"));
        assert_eq!(eez.len(), 2);

        let ous = baseline_for(&baseline, "ousPeopleCount", Some("eez"));
        assert_eq!(ous.len(), 1);
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            parse_baseline(r#"{ "metricId": "x" }"#),
            Err(MetricError::Json(_))
        ));
    }
}
