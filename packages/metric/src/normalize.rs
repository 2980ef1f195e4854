//! Canonical ordering and rekeying of metric arrays.
//!
//! Engines complete in arbitrary order when fanned out, so every report
//! passes its output through [`normalize_metrics`] before returning.
//! Repeated runs over identical input serialize byte-for-byte identically.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use mpa_report_metric_models::{Metric, MetricExtra};

/// Sorts metrics by metric id, class id, sketch id, geography id and group
/// id, with `None` before any value. The sort is stable.
#[must_use]
pub fn sort_metrics(mut metrics: Vec<Metric>) -> Vec<Metric> {
    metrics.sort_by(compare_metrics);
    metrics
}

fn compare_metrics(a: &Metric, b: &Metric) -> Ordering {
    a.metric_id
        .cmp(&b.metric_id)
        .then_with(|| a.class_id.cmp(&b.class_id))
        .then_with(|| a.sketch_id.cmp(&b.sketch_id))
        .then_with(|| a.geography_id.cmp(&b.geography_id))
        .then_with(|| a.group_id.cmp(&b.group_id))
}

/// Strips identifiers not meant for external consumption.
///
/// Empty-string ids become `None`, `extra` keys starting with `_` are
/// dropped, and an `extra` map left empty is removed.
#[must_use]
pub fn rekey_metrics(metrics: Vec<Metric>) -> Vec<Metric> {
    metrics.into_iter().map(rekey_metric).collect()
}

fn rekey_metric(metric: Metric) -> Metric {
    let extra = metric
        .extra
        .map(|extra| {
            extra
                .into_iter()
                .filter(|(key, _)| !key.starts_with('_'))
                .collect::<MetricExtra>()
        })
        .filter(|extra| !extra.is_empty());

    Metric {
        metric_id: metric.metric_id,
        class_id: non_blank(metric.class_id),
        sketch_id: non_blank(metric.sketch_id),
        group_id: non_blank(metric.group_id),
        geography_id: non_blank(metric.geography_id),
        value: metric.value,
        extra,
    }
}

fn non_blank(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.is_empty())
}

/// Rekeys then sorts. Logs a warning for every duplicated
/// `(metricId, classId, sketchId, geographyId)` key, since duplicate
/// production is an engine defect.
#[must_use]
pub fn normalize_metrics(metrics: Vec<Metric>) -> Vec<Metric> {
    let sorted = sort_metrics(rekey_metrics(metrics));

    for (key, count) in duplicate_keys(&sorted) {
        log::warn!("Metric key {key:?} produced {count} times");
    }

    sorted
}

type MetricKey<'a> = (&'a str, Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// Returns each uniqueness key that appears more than once, with its count.
#[must_use]
pub fn duplicate_keys(metrics: &[Metric]) -> Vec<(MetricKey<'_>, usize)> {
    let mut counts: BTreeMap<MetricKey<'_>, usize> = BTreeMap::new();
    for m in metrics {
        *counts
            .entry((
                m.metric_id.as_str(),
                m.class_id.as_deref(),
                m.sketch_id.as_deref(),
                m.geography_id.as_deref(),
            ))
            .or_default() += 1;
    }

    counts.into_iter().filter(|(_, count)| *count > 1).collect()
}
