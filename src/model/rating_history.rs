use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
    error::StoreError,
    model::{
        store::HistoryStore,
        structures::{
            performance::SessionTimestamp,
            rating_state::RatingHistoryEntry,
            track::{Track, TrackKey}
        }
    }
};

/// Per-track rating snapshots, kept in ascending timestamp order.
/// Only read for trend display; never fed back into a rating update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingHistory {
    entries: BTreeMap<TrackKey, Vec<RatingHistoryEntry>>
}

/// History of one account grouped by track, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeries {
    pub account_name: String,
    pub series: BTreeMap<Track, Vec<RatingHistoryEntry>>,
    pub professions: Vec<String>,
    pub first_session: Option<SessionTimestamp>,
    pub last_session: Option<SessionTimestamp>
}

impl RatingHistory {
    pub fn new() -> RatingHistory {
        RatingHistory::default()
    }

    pub fn from_entries(entries: Vec<RatingHistoryEntry>) -> RatingHistory {
        let mut history = RatingHistory::new();
        for entry in entries {
            history.record(entry);
        }

        history
    }

    /// Adds a snapshot. A snapshot for the same track and session replaces the old one.
    pub fn record(&mut self, entry: RatingHistoryEntry) {
        let track_entries = self.entries.entry(entry.key.clone()).or_default();

        match track_entries.binary_search_by(|e| e.timestamp.cmp(&entry.timestamp)) {
            Ok(i) => track_entries[i] = entry,
            Err(i) => track_entries.insert(i, entry)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RatingHistoryEntry> {
        self.entries.values().flatten()
    }

    pub fn into_entries(self) -> Vec<RatingHistoryEntry> {
        self.entries.into_values().flatten().collect()
    }

    pub fn absorb(&mut self, other: RatingHistory) {
        for entry in other.into_entries() {
            self.record(entry);
        }
    }

    pub fn latest(&self) -> Option<SessionTimestamp> {
        self.entries().map(|e| e.timestamp).max()
    }

    pub fn recent(&self, key: &TrackKey, n: usize) -> Vec<RatingHistoryEntry> {
        self.entries
            .get(key)
            .map(|entries| entries.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    /// Rating change between the two most recent snapshots, 0 with fewer than two.
    pub fn delta(&self, key: &TrackKey) -> f64 {
        match self.recent(key, 2).as_slice() {
            [latest, previous] => latest.rating - previous.rating,
            _ => 0.0
        }
    }

    /// [`RatingHistory::delta`] for every track, optionally restricted to one track type.
    pub fn deltas(&self, track: Option<Track>) -> BTreeMap<TrackKey, f64> {
        self.entries
            .keys()
            .filter(|k| track.is_none_or(|t| k.track == t))
            .map(|k| (k.clone(), self.delta(k)))
            .collect()
    }

    pub fn player_series(
        &self,
        account_name: &str,
        profession: Option<&str>,
        since: Option<SessionTimestamp>
    ) -> PlayerSeries {
        let mut series: BTreeMap<Track, Vec<RatingHistoryEntry>> = BTreeMap::new();

        let matching = self
            .entries
            .iter()
            .filter(|(k, _)| k.account_name == account_name)
            .filter(|(k, _)| profession.is_none_or(|p| k.profession == p))
            .flat_map(|(_, entries)| entries)
            .filter(|e| since.is_none_or(|s| e.timestamp >= s));

        for entry in matching {
            series.entry(entry.key.track).or_default().push(entry.clone());
        }

        for entries in series.values_mut() {
            entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.key.cmp(&b.key)));
        }

        let all = series.values().flatten();

        PlayerSeries {
            account_name: account_name.to_string(),
            professions: all.clone().map(|e| e.key.profession.clone()).sorted().dedup().collect(),
            first_session: all.clone().map(|e| e.timestamp).min(),
            last_session: all.map(|e| e.timestamp).max(),
            series
        }
    }
}

impl HistoryStore for RatingHistory {
    type Checkpoint = RatingHistory;

    fn append(&mut self, entry: RatingHistoryEntry) -> Result<(), StoreError> {
        self.record(entry);
        Ok(())
    }

    fn most_recent(&self, key: &TrackKey, n: usize) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        Ok(self.recent(key, n))
    }

    fn latest_timestamp(&self) -> Result<Option<SessionTimestamp>, StoreError> {
        Ok(self.latest())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }

    fn checkpoint(&self) -> Result<RatingHistory, StoreError> {
        Ok(self.clone())
    }

    fn rollback(&mut self, checkpoint: RatingHistory) -> Result<(), StoreError> {
        *self = checkpoint;
        Ok(())
    }
}
