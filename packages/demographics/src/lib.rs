#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Demographic deduplication for ocean-use survey rows.
//!
//! Respondents contribute one row per sector, and each row repeats how
//! many people the respondent represents in that sector. A respondent is
//! counted toward `people` and their village once, at the largest
//! represented figure seen across their rows, clamped to their stated
//! group size. Each sector and gear bucket receives a respondent at most
//! once.
//!
//! A row is skipped when its `resp_id` is missing or blank. A numeric
//! `resp_id` of `0` is a valid respondent and is counted like any other.
//!
//! [`OusAggregator`] owns all per-respondent tracking state and is built
//! fresh for every aggregation run.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use geo::Intersects;
use mpa_report_demographics_models::{OusFeature, OusStats, SurveyValue};
use mpa_report_metric_models::Metric;
use mpa_report_sketch_models::Sketch;
use mpa_report_spatial::union_children;

/// Metric id of every demographic metric.
pub const OUS_METRIC_ID: &str = "ousPeopleCount";
/// Class id of the total people metric.
pub const OUS_TOTAL_CLASS_ID: &str = "ousPeopleCount_all";

/// What has been counted for one respondent so far.
#[derive(Debug, Default)]
struct RespondentState {
    /// Largest represented figure counted toward `people`.
    max_people: f64,
    sectors: BTreeSet<String>,
    gears: BTreeSet<String>,
}

/// A survey row that passed validation.
struct ValidRow {
    resp_id: String,
    total_people: f64,
    rep_in_sector: f64,
    village: String,
    sector: String,
    gears: Vec<String>,
}

impl ValidRow {
    fn parse(row: &OusFeature) -> Option<Self> {
        let properties = &row.properties;
        let Some(resp_id) = properties.resp_id.as_ref().and_then(SurveyValue::as_key) else {
            log::warn!("Survey row missing respondent id, skipping: {:?}", row.raw_properties);
            return None;
        };
        let number = |value: Option<&SurveyValue>, name: &str| {
            let parsed = value.and_then(SurveyValue::as_f64);
            if parsed.is_none() {
                log::warn!("Survey row for respondent {resp_id} has no usable {name}, skipping");
            }
            parsed
        };
        let total_people = number(properties.number_of_ppl.as_ref(), "number_of_ppl")?;
        let rep_in_sector = number(properties.rep_in_sector.as_ref(), "rep_in_sector")?;

        Some(Self {
            resp_id,
            total_people,
            rep_in_sector,
            village: properties.village_or_unknown(),
            sector: properties.sector_or_unknown(),
            gears: properties.gears(),
        })
    }
}

/// Folds survey rows into unique-person counts.
#[derive(Debug, Default)]
pub struct OusAggregator {
    respondents: BTreeMap<String, RespondentState>,
    stats: OusStats,
    skipped: usize,
}

impl OusAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one survey row. Invalid rows are logged and skipped.
    pub fn add(&mut self, row: &OusFeature) {
        let Some(row) = ValidRow::parse(row) else {
            self.skipped += 1;
            return;
        };
        let stats = &mut self.stats;
        let represented = row.rep_in_sector.min(row.total_people);

        let state = self.respondents.entry(row.resp_id).or_insert_with(|| {
            stats.people += represented;
            *stats.by_village.entry(row.village.clone()).or_default() += represented;
            RespondentState {
                max_people: represented,
                ..RespondentState::default()
            }
        });

        if represented > state.max_people {
            let added = represented - state.max_people;
            stats.people += added;
            *stats.by_village.entry(row.village.clone()).or_default() += added;
            state.max_people = represented;
        }

        if state.sectors.insert(row.sector.clone()) {
            *stats.by_sector.entry(row.sector).or_default() += row.rep_in_sector;
        }

        for gear in row.gears {
            if state.gears.insert(gear.clone()) {
                *stats.by_gear.entry(gear).or_default() += row.rep_in_sector;
            }
        }
    }

    /// Number of rows skipped as invalid.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consumes the aggregator, returning the counts.
    #[must_use]
    pub fn finish(self) -> OusStats {
        if self.skipped > 0 {
            log::warn!("Skipped {} invalid survey rows", self.skipped);
        }
        log::debug!(
            "Aggregated {} respondents into {} people",
            self.respondents.len(),
            self.stats.people
        );
        self.stats
    }
}

/// Aggregates survey rows. When a sketch is given, only rows whose
/// geometry intersects the union of its children are counted; otherwise
/// every row is in scope.
#[must_use]
pub fn aggregate_ous(rows: &[OusFeature], sketch: Option<&Sketch>) -> OusStats {
    let region = sketch.map(union_children);
    let mut aggregator = OusAggregator::new();

    for row in rows {
        let in_scope = region
            .as_ref()
            .is_none_or(|region| !row.geometry.0.is_empty() && row.geometry.intersects(region));
        if in_scope {
            aggregator.add(row);
        }
    }

    aggregator.finish()
}

/// Metrics for aggregated counts: the total under
/// [`OUS_TOTAL_CLASS_ID`], then one per sector, village and gear bucket.
/// Buckets carry the bucket kind as their group id.
#[must_use]
pub fn ous_metrics(stats: &OusStats, sketch_id: Option<&str>) -> Vec<Metric> {
    let metric = |class_id: &str, value: f64| {
        let metric = Metric::new(OUS_METRIC_ID, Some(value)).with_class(class_id);
        match sketch_id {
            Some(id) => metric.with_sketch(id),
            None => metric,
        }
    };

    let mut metrics = vec![metric(OUS_TOTAL_CLASS_ID, stats.people)];
    for (group, buckets) in [
        ("sector", &stats.by_sector),
        ("village", &stats.by_village),
        ("gear", &stats.by_gear),
    ] {
        metrics.extend(
            buckets
                .iter()
                .map(|(class_id, &value)| metric(class_id, value).with_group(group)),
        );
    }
    metrics
}

/// Sorts survey rows by respondent id, numerically when both ids are
/// numeric. The sort is stable.
pub fn sort_by_respondent(rows: &mut [OusFeature]) {
    let id = |row: &OusFeature| row.properties.resp_id.clone();
    rows.sort_by(|a, b| match (id(a), id(b)) {
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.as_key().cmp(&b.as_key()),
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
