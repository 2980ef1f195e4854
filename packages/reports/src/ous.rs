//! Ocean use survey demographics.

use mpa_report_demographics::{OUS_METRIC_ID, aggregate_ous, ous_metrics, sort_by_respondent};
use mpa_report_demographics_models::OusFeature;
use mpa_report_metric::ReportResult;
use mpa_report_metric_models::Metric;
use mpa_report_sketch_models::Sketch;

use crate::{ReportContext, ReportError, fetch};

fn survey_rows(features: &[geojson::Feature]) -> Vec<OusFeature> {
    features.iter().map(OusFeature::from_feature).collect()
}

/// Unique people represented by survey shapes overlapping the sketch, in
/// total and per sector, village and gear.
///
/// # Errors
///
/// Returns [`ReportError`] on configuration or fetch failure.
pub async fn ous_demographics(ctx: &ReportContext, sketch: &Sketch) -> Result<ReportResult, ReportError> {
    let group = ctx.project.metric_group(OUS_METRIC_ID)?;
    let ds = ctx.project.class_vector_datasource(group, None)?;

    let rows = survey_rows(&fetch::raw_features(ctx, ds, Some(sketch)).await?);
    let stats = aggregate_ous(&rows, Some(sketch));
    log::debug!(
        "ousDemographics: {} survey rows near {}, {} people",
        rows.len(),
        sketch.id(),
        stats.people
    );

    Ok(ReportResult::new(ous_metrics(&stats, Some(sketch.id()))))
}

/// Demographic totals over every survey row, for use as the percent
/// baseline.
#[must_use]
pub fn ous_baseline(features: &[geojson::Feature]) -> Vec<Metric> {
    let stats = aggregate_ous(&survey_rows(features), None);
    ReportResult::new(ous_metrics(&stats, None)).metrics
}

/// Survey features ordered by respondent id. Rows without polygonal
/// geometry are written back without geometry.
#[must_use]
pub fn sort_survey(features: &[geojson::Feature]) -> Vec<geojson::Feature> {
    let mut rows = survey_rows(features);
    sort_by_respondent(&mut rows);

    rows.into_iter()
        .map(|row| geojson::Feature {
            geometry: (!row.geometry.0.is_empty()).then(|| {
                geojson::Geometry::new(geojson::Value::from(&geo::Geometry::MultiPolygon(
                    row.geometry,
                )))
            }),
            properties: Some(row.raw_properties),
            ..geojson::Feature::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, feature, single, square};
    use mpa_report_demographics::OUS_TOTAL_CLASS_ID;
    use mpa_report_source::MemorySource;

    fn survey() -> Vec<geojson::Feature> {
        let shape = |x: f64| geo::Geometry::MultiPolygon(square(x, 0.0, 1.0));
        vec![
            feature(
                serde_json::json!({
                    "resp_id": 2, "number_of_ppl": 5, "rep_in_sector": 3,
                    "village": "Apia", "sector": "Commercial", "fishing_method": "Net"
                }),
                shape(0.0),
            ),
            feature(
                serde_json::json!({
                    "resp_id": 2, "number_of_ppl": 5, "rep_in_sector": 4,
                    "village": "Apia", "sector": "Subsistence", "fishing_method": "Net"
                }),
                shape(0.0),
            ),
            feature(
                serde_json::json!({
                    "resp_id": 1, "number_of_ppl": 2, "rep_in_sector": 2,
                    "village": "Falealupo", "sector": "Commercial", "fishing_method": "Line"
                }),
                shape(5.0),
            ),
            feature(serde_json::json!({ "resp_id": 3, "village": "Apia" }), shape(0.0)),
        ]
    }

    fn value(metrics: &[Metric], class_id: &str) -> Option<f64> {
        metrics
            .iter()
            .find(|m| m.class_id.as_deref() == Some(class_id))
            .and_then(|m| m.value)
    }

    #[tokio::test]
    async fn counts_each_respondent_once_under_the_sketch() {
        let ctx = context(MemorySource::new().with_features("ous_demographics.geojson", survey()));
        let result = ous_demographics(&ctx, &single(square(0.2, 0.2, 0.5))).await.unwrap();

        assert_eq!(value(&result.metrics, OUS_TOTAL_CLASS_ID), Some(4.0));
        assert_eq!(value(&result.metrics, "Apia"), Some(4.0));
        assert_eq!(value(&result.metrics, "Commercial"), Some(3.0));
        assert_eq!(value(&result.metrics, "Subsistence"), Some(4.0));
        assert_eq!(value(&result.metrics, "Falealupo"), None);
        assert!(result.metrics.iter().all(|m| m.sketch_id.as_deref() == Some("single")));
    }

    #[tokio::test]
    async fn demographics_convert_to_fractions_of_survey_totals() {
        let ctx = context(MemorySource::new().with_features("ous_demographics.geojson", survey()));
        let result = ous_demographics(&ctx, &single(square(0.2, 0.2, 0.5))).await.unwrap();

        let percent = crate::percent_of_total(&ctx.project, &result).unwrap();
        assert_eq!(percent.metrics.len(), result.metrics.len());
        assert!(percent.metrics.iter().all(|m| m.metric_id == "ousPeopleCountPerc"));

        let fraction = |group: Option<&str>, class_id: &str| {
            percent
                .metrics
                .iter()
                .find(|m| m.group_id.as_deref() == group && m.class_id.as_deref() == Some(class_id))
                .and_then(|m| m.value)
                .unwrap()
        };
        assert!((fraction(None, OUS_TOTAL_CLASS_ID) - 4.0 / 1874.0).abs() < 1e-12);
        assert!((fraction(Some("village"), "Apia") - 4.0 / 731.0).abs() < 1e-12);
        assert!((fraction(Some("gear"), "Net") - 3.0 / 802.0).abs() < 1e-12);
    }

    #[test]
    fn baseline_includes_every_row() {
        let metrics = ous_baseline(&survey());
        assert_eq!(value(&metrics, OUS_TOTAL_CLASS_ID), Some(6.0));
        assert_eq!(value(&metrics, "Falealupo"), Some(2.0));
        assert!(metrics.iter().all(|m| m.sketch_id.is_none()));
    }

    #[test]
    fn sorts_rows_by_respondent() {
        let sorted = sort_survey(&survey());
        let ids: Vec<i64> = sorted
            .iter()
            .map(|f| f.property("resp_id").and_then(serde_json::Value::as_i64).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 2, 3]);
        assert!(sorted.iter().all(|f| f.geometry.is_some()));
    }
}
