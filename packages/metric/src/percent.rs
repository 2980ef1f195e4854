//! Percent-of-total conversion against precalculated baselines.

use mpa_report_metric_models::Metric;

use crate::MetricError;

/// Converts value metrics into fractions of their baseline total.
///
/// Each metric is matched to the baseline with the same class id and
/// group id (and the same geography id when both carry one). The result keeps every field of
/// the input metric, optionally under `metric_id_override`, with
/// `value = metric.value / baseline.value`.
///
/// A zero or missing baseline value yields `None` rather than NaN or
/// infinity, as does a `None` input value.
///
/// # Errors
///
/// Returns [`MetricError::MissingBaseline`] if any metric has no matching
/// baseline entry.
pub fn to_percent_metric(
    metrics: &[Metric],
    totals: &[Metric],
    metric_id_override: Option<&str>,
) -> Result<Vec<Metric>, MetricError> {
    metrics
        .iter()
        .map(|metric| {
            let total = find_total(metric, totals).ok_or_else(|| MetricError::MissingBaseline {
                metric_id: metric.metric_id.clone(),
                class_id: metric.class_id.clone(),
            })?;

            let value = match (metric.value, total.value) {
                (Some(value), Some(denominator)) if denominator != 0.0 => Some(value / denominator),
                (Some(_), _) => {
                    log::warn!(
                        "Baseline for {} class {:?} is zero or empty, percent left null",
                        metric.metric_id,
                        metric.class_id
                    );
                    None
                }
                (None, _) => None,
            };

            let percent = Metric {
                value,
                ..metric.clone()
            };

            Ok(match metric_id_override {
                Some(id) => percent.with_metric_id(id),
                None => percent,
            })
        })
        .collect()
}

fn find_total<'a>(metric: &Metric, totals: &'a [Metric]) -> Option<&'a Metric> {
    totals.iter().find(|total| {
        total.class_id == metric.class_id
            && total.group_id == metric.group_id
            && match (&metric.geography_id, &total.geography_id) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals() -> Vec<Metric> {
        vec![
            Metric::new("size", Some(200.0)).with_class("eez"),
            Metric::new("size", Some(50.0)).with_class("nearshore"),
            Metric::new("size", Some(0.0)).with_class("empty"),
        ]
    }

    #[test]
    fn percent_times_total_recovers_value() {
        let values = vec![
            Metric::new("size", Some(37.0)).with_class("eez").with_sketch("s1"),
            Metric::new("size", Some(12.5))
                .with_class("nearshore")
                .with_sketch("s1"),
        ];
        let totals = totals();
        let percents = to_percent_metric(&values, &totals, Some("sizePerc")).unwrap();

        for (value, percent) in values.iter().zip(&percents) {
            let total = find_total(value, &totals).unwrap();
            let recovered = percent.value.unwrap() * total.value.unwrap();
            assert!((recovered - value.value.unwrap()).abs() < 1e-9);
            assert_eq!(percent.metric_id, "sizePerc");
            assert_eq!(percent.sketch_id, value.sketch_id);
        }
    }

    #[test]
    fn zero_baseline_yields_null() {
        let values = vec![Metric::new("size", Some(1.0)).with_class("empty")];
        let percents = to_percent_metric(&values, &totals(), None).unwrap();
        assert_eq!(percents[0].value, None);
        assert_eq!(percents[0].metric_id, "size");
    }

    #[test]
    fn missing_baseline_fails_loudly() {
        let values = vec![Metric::new("size", Some(1.0)).with_class("offshore")];
        let err = to_percent_metric(&values, &totals(), None).unwrap_err();
        assert!(matches!(
            err,
            MetricError::MissingBaseline { class_id: Some(ref c), .. } if c == "offshore"
        ));
    }

    #[test]
    fn matches_geography_when_both_present() {
        let totals = vec![
            Metric::new("habitat", Some(10.0))
                .with_class("reef")
                .with_geography("nearshore"),
            Metric::new("habitat", Some(100.0))
                .with_class("reef")
                .with_geography("eez"),
        ];
        let values = vec![
            Metric::new("habitat", Some(5.0))
                .with_class("reef")
                .with_geography("eez"),
        ];
        let percents = to_percent_metric(&values, &totals, None).unwrap();
        assert!((percents[0].value.unwrap() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn matches_group_when_class_ids_collide() {
        let totals = vec![
            Metric::new("ousPeopleCount", Some(40.0))
                .with_class("Fishing")
                .with_group("sector"),
            Metric::new("ousPeopleCount", Some(8.0))
                .with_class("Fishing")
                .with_group("village"),
        ];
        let values = vec![
            Metric::new("ousPeopleCount", Some(4.0))
                .with_class("Fishing")
                .with_group("village")
                .with_sketch("s1"),
        ];
        let percents = to_percent_metric(&values, &totals, None).unwrap();
        assert!((percents[0].value.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(percents[0].group_id.as_deref(), Some("village"));
    }

    #[test]
    fn group_without_baseline_fails() {
        let values = vec![Metric::new("size", Some(1.0)).with_class("eez").with_group("nearshore")];
        assert!(to_percent_metric(&values, &totals(), None).is_err());
    }
}
