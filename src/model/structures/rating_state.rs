use serde::{Deserialize, Serialize};

use crate::model::{
    composite::composite_score,
    constants::{DEFAULT_RATING, DEFAULT_RD, DEFAULT_VOLATILITY},
    glicko::Rating,
    structures::{performance::SessionTimestamp, track::TrackKey}
};

/// Current rating of one track. Created on first qualifying session,
/// mutated once per qualifying session afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingState {
    pub key: TrackKey,
    pub rating: f64,
    pub rd: f64,
    pub volatility: f64,
    pub games_played: i32,
    /// Sum of session normalized ranks (percentiles, 0 = best)
    pub total_rank_sum: f64,
    pub average_rank: f64,
    pub total_stat_value: f64,
    /// Mean raw metric value. Group tracks have no single unit and hold the
    /// mean combined z-score instead.
    pub average_stat_value: f64,
    pub composite_score: f64,
    /// Assigned by [`crate::model::rating_tracker::RatingTracker::sort`], 1 = best within the track
    pub leaderboard_rank: i32,
    pub leaderboard_percentile: f64
}

impl RatingState {
    pub fn new(key: TrackKey) -> RatingState {
        RatingState {
            key,
            rating: DEFAULT_RATING,
            rd: DEFAULT_RD,
            volatility: DEFAULT_VOLATILITY,
            games_played: 0,
            total_rank_sum: 0.0,
            average_rank: 0.0,
            total_stat_value: 0.0,
            average_stat_value: 0.0,
            composite_score: DEFAULT_RATING,
            leaderboard_rank: 0,
            leaderboard_percentile: 0.0
        }
    }

    pub fn current(&self) -> Rating {
        Rating {
            rating: self.rating,
            rd: self.rd,
            volatility: self.volatility
        }
    }

    /// Applies the outcome of one session: the updated rating plus the
    /// rank/stat bookkeeping, then recomputes the composite score.
    pub fn record_session(&mut self, updated: Rating, normalized_rank: f64, stat_value: f64) {
        self.rating = updated.rating;
        self.rd = updated.rd;
        self.volatility = updated.volatility;

        self.games_played += 1;
        self.total_rank_sum += normalized_rank;
        self.average_rank = self.total_rank_sum / self.games_played as f64;
        self.total_stat_value += stat_value;
        self.average_stat_value = self.total_stat_value / self.games_played as f64;

        self.composite_score = composite_score(self.rating, self.average_rank, self.rd);
    }
}

/// Snapshot of a track right after one session update. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
    pub key: TrackKey,
    pub timestamp: SessionTimestamp,
    pub rating: f64,
    pub rd: f64,
    pub volatility: f64
}

impl RatingHistoryEntry {
    pub fn snapshot(state: &RatingState, timestamp: SessionTimestamp) -> RatingHistoryEntry {
        RatingHistoryEntry {
            key: state.key.clone(),
            timestamp,
            rating: state.rating,
            rd: state.rd,
            volatility: state.volatility
        }
    }
}
