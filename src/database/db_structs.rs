use std::str::FromStr;

use chrono::NaiveDateTime;
use itertools::Itertools;
use strum::IntoEnumIterator;
use tokio_postgres::Row;

use crate::{
    error::{ProcessorError, ProcessorResult},
    model::structures::{
        metric_category::MetricCategory,
        performance::{PerformanceMetrics, PerformanceRecord},
        rating_state::{RatingHistoryEntry, RatingState},
        track::{Track, TrackKey}
    }
};

pub const RATING_STATE_COLUMNS: &str = "account_name, profession, track, rating, rd, volatility, games_played, \
    total_rank_sum, average_rank, total_stat_value, average_stat_value, composite_score, leaderboard_rank, \
    leaderboard_percentile";

pub const RATING_HISTORY_COLUMNS: &str = "account_name, profession, track, timestamp, rating, rd, volatility";

/// `timestamp, account_name, profession, fight_time` followed by every metric column.
pub fn performance_columns() -> String {
    ["timestamp", "account_name", "profession", "fight_time"]
        .into_iter()
        .chain(MetricCategory::iter().map(|m| m.column()))
        .join(", ")
}

pub fn parse_track(label: &str) -> ProcessorResult<Track> {
    Track::from_str(label).map_err(|_| ProcessorError::InvalidRecord(format!("unknown track '{}'", label)))
}

pub fn performance_from_row(row: &Row) -> ProcessorResult<PerformanceRecord> {
    let mut metrics = PerformanceMetrics::default();
    for metric in MetricCategory::iter() {
        metrics.set(metric, row.try_get::<_, f64>(metric.column())?);
    }

    Ok(PerformanceRecord {
        timestamp: row.try_get::<_, NaiveDateTime>("timestamp")?,
        account_name: row.try_get("account_name")?,
        profession: row.try_get("profession")?,
        fight_time: row.try_get("fight_time")?,
        metrics
    })
}

fn key_from_row(row: &Row) -> ProcessorResult<TrackKey> {
    Ok(TrackKey {
        account_name: row.try_get("account_name")?,
        profession: row.try_get("profession")?,
        track: parse_track(row.try_get("track")?)?
    })
}

pub fn rating_state_from_row(row: &Row) -> ProcessorResult<RatingState> {
    Ok(RatingState {
        key: key_from_row(row)?,
        rating: row.try_get("rating")?,
        rd: row.try_get("rd")?,
        volatility: row.try_get("volatility")?,
        games_played: row.try_get("games_played")?,
        total_rank_sum: row.try_get("total_rank_sum")?,
        average_rank: row.try_get("average_rank")?,
        total_stat_value: row.try_get("total_stat_value")?,
        average_stat_value: row.try_get("average_stat_value")?,
        composite_score: row.try_get("composite_score")?,
        leaderboard_rank: row.try_get("leaderboard_rank")?,
        leaderboard_percentile: row.try_get("leaderboard_percentile")?
    })
}

pub fn history_entry_from_row(row: &Row) -> ProcessorResult<RatingHistoryEntry> {
    Ok(RatingHistoryEntry {
        key: key_from_row(row)?,
        timestamp: row.try_get("timestamp")?,
        rating: row.try_get("rating")?,
        rd: row.try_get("rd")?,
        volatility: row.try_get("volatility")?
    })
}
