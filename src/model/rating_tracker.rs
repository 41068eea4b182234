use std::{cmp::Ordering, collections::BTreeSet};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    error::StoreError,
    model::{
        store::RatingStore,
        structures::{
            metric_category::MetricCategory,
            performance::SessionTimestamp,
            rating_state::RatingState,
            track::{Track, TrackKey}
        }
    }
};

/// In-memory RatingState table. Used as the working copy of every replay
/// and as the canonical mirror of the persisted `session_ratings` table.
#[derive(Debug, Clone, Default)]
pub struct RatingTracker {
    // `leaderboard_rank` and `leaderboard_percentile` are only valid after `sort`
    states: IndexMap<TrackKey, RatingState>,
    processed_through: Option<SessionTimestamp>
}

/// All tracks of one account, best rating first.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    pub account_name: String,
    pub tracks: Vec<RatingState>,
    pub summary: ProfileSummary
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub professions: Vec<String>,
    pub tracks: Vec<Track>,
    pub mean_rating: f64,
    pub total_games: i32
}

impl RatingTracker {
    pub fn new() -> RatingTracker {
        RatingTracker::default()
    }

    pub fn from_states(states: Vec<RatingState>) -> RatingTracker {
        let mut tracker = RatingTracker::new();
        for state in states {
            tracker.insert_or_update(state);
        }

        tracker.sort();
        tracker
    }

    /// Sets the marker of the newest session already applied, as persisted
    /// next to the states.
    pub fn with_processed_through(mut self, processed_through: Option<SessionTimestamp>) -> RatingTracker {
        self.processed_through = processed_through;
        self
    }

    pub fn insert_or_update(&mut self, state: RatingState) {
        self.states.insert(state.key.clone(), state);
    }

    pub fn get_rating(&self, key: &TrackKey) -> Option<&RatingState> {
        self.states.get(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &RatingState> {
        self.states.values()
    }

    pub fn into_states(self) -> Vec<RatingState> {
        self.states.into_values().collect()
    }

    /// Takes every state of `other`. Keys present in both are overwritten.
    pub fn absorb(&mut self, other: RatingTracker) {
        self.processed_through = self.processed_through.max(other.processed_through);
        self.states.extend(other.states);
        self.sort();
    }

    /// Orders states by composite descending and assigns the per-track
    /// `leaderboard_rank` and `leaderboard_percentile`.
    pub fn sort(&mut self) {
        self.states.sort_by(|_, a, _, b| compare_composite(a, b));

        let tracks: BTreeSet<Track> = self.states.values().map(|s| s.key.track).collect();
        for track in tracks {
            let track_leaderboard: Vec<&mut RatingState> =
                self.states.values_mut().filter(|s| s.key.track == track).collect();
            let count = track_leaderboard.len() as i32;

            for (i, state) in track_leaderboard.into_iter().enumerate() {
                let rank = i as i32 + 1;
                state.leaderboard_rank = rank;
                state.leaderboard_percentile = RatingTracker::percentile(rank, count).unwrap_or_default();
            }
        }
    }

    /// Composite-descending ranking. Distance-to-tag entries with a single
    /// session at distance zero (a commander's one-off appearance) are left out.
    pub fn leaderboard(&self, track: Option<Track>, limit: Option<usize>) -> Vec<RatingState> {
        self.states
            .values()
            .filter(|s| track.is_none_or(|t| s.key.track == t))
            .filter(|s| !is_one_off_commander(s))
            .sorted_by(|a, b| compare_composite(a, b))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn profile(&self, account_name: &str) -> Option<PlayerProfile> {
        let tracks: Vec<RatingState> = self
            .states
            .values()
            .filter(|s| s.key.account_name == account_name)
            .sorted_by(|a, b| {
                b.rating
                    .partial_cmp(&a.rating)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.key.cmp(&b.key))
            })
            .cloned()
            .collect();

        if tracks.is_empty() {
            return None;
        }

        let summary = ProfileSummary {
            professions: tracks.iter().map(|s| s.key.profession.clone()).sorted().dedup().collect(),
            tracks: tracks.iter().map(|s| s.key.track).sorted().dedup().collect(),
            mean_rating: tracks.iter().map(|s| s.rating).sum::<f64>() / tracks.len() as f64,
            total_games: tracks.iter().map(|s| s.games_played).sum()
        };

        Some(PlayerProfile {
            account_name: account_name.to_string(),
            tracks,
            summary
        })
    }

    /// `P = (n/N) * 100`
    fn percentile(rank: i32, total: i32) -> Option<f64> {
        match rank.cmp(&1) {
            Ordering::Less => None,
            _ => {
                let n = total - rank; // Tracks ranked below this one
                Some(n as f64 / total as f64 * 100.0)
            }
        }
    }
}

fn compare_composite(a: &RatingState, b: &RatingState) -> Ordering {
    b.composite_score
        .partial_cmp(&a.composite_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.key.cmp(&b.key))
}

fn is_one_off_commander(state: &RatingState) -> bool {
    state.key.track == Track::Metric(MetricCategory::DistanceToTag)
        && state.games_played == 1
        && state.average_stat_value == 0.0
}

impl RatingStore for RatingTracker {
    type Checkpoint = RatingTracker;

    fn get(&self, key: &TrackKey) -> Result<Option<RatingState>, StoreError> {
        Ok(self.get_rating(key).cloned())
    }

    fn upsert(&mut self, state: RatingState) -> Result<(), StoreError> {
        self.insert_or_update(state);
        Ok(())
    }

    fn leaderboard(&self, track: Option<Track>, limit: Option<usize>) -> Result<Vec<RatingState>, StoreError> {
        Ok(RatingTracker::leaderboard(self, track, limit))
    }

    fn processed_through(&self) -> Result<Option<SessionTimestamp>, StoreError> {
        Ok(self.processed_through)
    }

    fn set_processed_through(&mut self, timestamp: SessionTimestamp) -> Result<(), StoreError> {
        self.processed_through = Some(timestamp);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.states.clear();
        self.processed_through = None;
        Ok(())
    }

    fn checkpoint(&self) -> Result<RatingTracker, StoreError> {
        Ok(self.clone())
    }

    fn rollback(&mut self, checkpoint: RatingTracker) -> Result<(), StoreError> {
        *self = checkpoint;
        Ok(())
    }
}
