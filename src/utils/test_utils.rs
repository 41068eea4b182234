use crate::model::structures::{
    metric_category::MetricCategory,
    performance::{MetricSample, PerformanceMetrics, PerformanceRecord, SessionTimestamp},
    rating_state::{RatingHistoryEntry, RatingState},
    track::{Track, TrackKey}
};
use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strum::IntoEnumIterator;

const DEFAULT_PROFESSION: &str = "Weaver";
const PROFESSIONS: [&str; 6] = ["Firebrand", "Scourge", "Druid", "Chronomancer", "Weaver", "Willbender"];

/// Account name used by the positional generators: `player{n}.1000`, 1-based.
pub fn account(n: usize) -> String {
    format!("player{}.1000", n)
}

/// Evening session `n` days after 2025-01-01.
pub fn session_time(n: i64) -> SessionTimestamp {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(20, 0, 0))
        .expect("valid base date")
        + Duration::days(n)
}

pub fn generate_samples(values: &[f64]) -> Vec<MetricSample> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| MetricSample {
            account_name: account(i + 1),
            profession: DEFAULT_PROFESSION.to_string(),
            value: *value
        })
        .collect()
}

/// A record with a single non-zero metric.
pub fn generate_record(
    timestamp: SessionTimestamp,
    account_name: &str,
    profession: &str,
    metric: MetricCategory,
    value: f64
) -> PerformanceRecord {
    let mut metrics = PerformanceMetrics::default();
    metrics.set(metric, value);

    PerformanceRecord {
        timestamp,
        account_name: account_name.to_string(),
        profession: profession.to_string(),
        fight_time: 300.0,
        metrics
    }
}

/// One session where `player{i+1}.1000` (Weaver) scores `values[i]` in `metric`.
pub fn generate_session(timestamp: SessionTimestamp, metric: MetricCategory, values: &[f64]) -> Vec<PerformanceRecord> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| generate_record(timestamp, &account(i + 1), DEFAULT_PROFESSION, metric, *value))
        .collect()
}

/// Random but reproducible history: `n_sessions` sessions drawn from a pool
/// of `n_players` accounts with fixed professions. The first two accounts
/// attend every session, the rest about 80% of them.
pub fn generate_session_log(seed: u64, n_sessions: usize, n_players: usize) -> Vec<PerformanceRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(n_sessions * n_players);

    for s in 0..n_sessions {
        let timestamp = session_time(s as i64);

        for p in 0..n_players {
            if p >= 2 && !rng.random_bool(0.8) {
                continue;
            }

            let mut metrics = PerformanceMetrics::default();
            for metric in MetricCategory::iter() {
                // Roughly one in five values is missing
                let value = if rng.random_bool(0.2) {
                    0.0
                } else {
                    match metric {
                        MetricCategory::Dps => rng.random_range(500.0..4500.0),
                        MetricCategory::Healing | MetricCategory::Barrier => rng.random_range(50.0..1500.0),
                        MetricCategory::DistanceToTag => rng.random_range(0.0..900.0),
                        _ => rng.random_range(0.01..5.0)
                    }
                };
                metrics.set(metric, value);
            }

            records.push(PerformanceRecord {
                timestamp,
                account_name: account(p + 1),
                profession: PROFESSIONS[p % PROFESSIONS.len()].to_string(),
                fight_time: rng.random_range(60.0..900.0),
                metrics
            });
        }
    }

    records
}

pub fn generate_rating_state(account_name: &str, profession: &str, track: Track, rating: f64, composite: f64) -> RatingState {
    let mut state = RatingState::new(TrackKey::new(account_name, profession, track));
    state.rating = rating;
    state.rd = 200.0;
    state.games_played = 3;
    state.total_rank_sum = 150.0;
    state.average_rank = 50.0;
    state.composite_score = composite;

    state
}

pub fn generate_history_entry(key: TrackKey, timestamp: SessionTimestamp, rating: f64) -> RatingHistoryEntry {
    RatingHistoryEntry {
        key,
        timestamp,
        rating,
        rd: 200.0,
        volatility: 0.06
    }
}
