use std::{cmp::Ordering, collections::HashSet};

use statrs::statistics::Statistics;

use crate::model::{
    constants::{DYNAMIC_FLOOR_MEAN_FRACTION, DYNAMIC_FLOOR_MIN_SAMPLES, DYNAMIC_FLOOR_PERCENTILE, MIN_PARTICIPANTS},
    structures::{metric_category::MetricCategory, performance::MetricSample}
};

/// Account names allowed to take part in normalization (e.g. guild members).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster(HashSet<String>);

impl Roster {
    pub fn new<I, S>(accounts: I) -> Roster
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        Roster(accounts.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, account_name: &str) -> bool {
        self.0.contains(account_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPerformance {
    pub account_name: String,
    pub profession: String,
    pub metric_value: f64,
    pub z_score: f64,
    /// 1 = best in session
    pub rank: usize,
    pub population_size: usize,
    /// `rank / population_size * 100`
    pub normalized_rank: f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSession {
    pub metric: MetricCategory,
    pub mean: f64,
    pub std_dev: f64,
    pub floor: f64,
    pub performances: Vec<NormalizedPerformance>
}

/// Turns one session's raw values for `metric` into z-scores and ranks.
///
/// Returns `None` when fewer than two participants survive filtering; the
/// session then carries no signal for this metric and must be skipped.
pub fn normalize_session(
    metric: MetricCategory,
    samples: &[MetricSample],
    roster: Option<&Roster>
) -> Option<NormalizedSession> {
    let eligible: Vec<&MetricSample> = samples
        .iter()
        .filter(|s| metric.accepts(s.value))
        .filter(|s| roster.is_none_or(|r| r.contains(&s.account_name)))
        .collect();

    if eligible.len() < MIN_PARTICIPANTS {
        return None;
    }

    let values: Vec<f64> = eligible.iter().map(|s| s.value).collect();
    let floor = dynamic_floor(metric, &values);

    let filtered: Vec<&MetricSample> = eligible.iter().copied().filter(|s| s.value > floor).collect();

    // A floor that leaves too few participants is dropped rather than losing the session
    let (population, floor) = if filtered.len() >= MIN_PARTICIPANTS {
        (filtered, floor)
    } else if floor > 0.0 {
        (eligible, 0.0)
    } else {
        return None;
    };

    Some(score_population(metric, population, floor))
}

/// 25th percentile of the positive values for support metrics, raised to
/// the median when it is below 10% of the mean. Zero for everything else.
pub fn dynamic_floor(metric: MetricCategory, values: &[f64]) -> f64 {
    if !metric.is_support() || values.len() < DYNAMIC_FLOOR_MIN_SAMPLES {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let percentile_index = ((sorted.len() as f64 * DYNAMIC_FLOOR_PERCENTILE) as usize).saturating_sub(1);
    let floor = sorted[percentile_index];

    if floor < sorted.iter().mean() * DYNAMIC_FLOOR_MEAN_FRACTION {
        return sorted[sorted.len() / 2];
    }

    floor
}

fn score_population(metric: MetricCategory, mut population: Vec<&MetricSample>, floor: f64) -> NormalizedSession {
    population.sort_by(|a, b| {
        let by_value = if metric.lower_is_better() {
            a.value.partial_cmp(&b.value)
        } else {
            b.value.partial_cmp(&a.value)
        };

        by_value
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.account_name.cmp(&b.account_name))
            .then_with(|| a.profession.cmp(&b.profession))
    });

    let mean = population.iter().map(|s| s.value).mean();
    let std_dev = match population.iter().map(|s| s.value).std_dev() {
        sd if sd == 0.0 || !sd.is_finite() => 1.0,
        sd => sd
    };

    let population_size = population.len();
    let performances = population
        .into_iter()
        .enumerate()
        .map(|(i, sample)| {
            let rank = i + 1;
            let z_score = (sample.value - mean) / std_dev;

            NormalizedPerformance {
                account_name: sample.account_name.clone(),
                profession: sample.profession.clone(),
                metric_value: sample.value,
                z_score: if metric.lower_is_better() { -z_score } else { z_score },
                rank,
                population_size,
                normalized_rank: rank as f64 / population_size as f64 * 100.0
            }
        })
        .collect();

    NormalizedSession {
        metric,
        mean,
        std_dev,
        floor,
        performances
    }
}
