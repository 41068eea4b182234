use crate::{
    error::StoreError,
    model::structures::{
        performance::SessionTimestamp,
        rating_state::{RatingHistoryEntry, RatingState},
        track::{Track, TrackKey}
    }
};

/// Keyed RatingState storage. Keys are unique per (account, profession, track).
pub trait RatingStore: Sync {
    /// Restore point taken before a commit and handed back to undo it.
    type Checkpoint;

    fn get(&self, key: &TrackKey) -> Result<Option<RatingState>, StoreError>;

    fn upsert(&mut self, state: RatingState) -> Result<(), StoreError>;

    /// States ordered by composite score descending, optionally restricted to one track.
    fn leaderboard(&self, track: Option<Track>, limit: Option<usize>) -> Result<Vec<RatingState>, StoreError>;

    /// Newest session already applied to the stored states. Independent of
    /// any history kept alongside.
    fn processed_through(&self) -> Result<Option<SessionTimestamp>, StoreError>;

    fn set_processed_through(&mut self, timestamp: SessionTimestamp) -> Result<(), StoreError>;

    /// Removes every state and resets the processed-through marker.
    fn clear(&mut self) -> Result<(), StoreError>;

    fn checkpoint(&self) -> Result<Self::Checkpoint, StoreError>;

    fn rollback(&mut self, checkpoint: Self::Checkpoint) -> Result<(), StoreError>;
}

/// Append-only store of per-session rating snapshots.
pub trait HistoryStore: Sync {
    type Checkpoint;

    fn append(&mut self, entry: RatingHistoryEntry) -> Result<(), StoreError>;

    /// Up to `n` entries for `key`, newest first.
    fn most_recent(&self, key: &TrackKey, n: usize) -> Result<Vec<RatingHistoryEntry>, StoreError>;

    fn latest_timestamp(&self) -> Result<Option<SessionTimestamp>, StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;

    fn checkpoint(&self) -> Result<Self::Checkpoint, StoreError>;

    fn rollback(&mut self, checkpoint: Self::Checkpoint) -> Result<(), StoreError>;
}
