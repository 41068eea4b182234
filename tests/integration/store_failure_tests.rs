use wvw_rating_processor::{
    error::{ProcessorError, StoreError},
    model::{
        rating_history::RatingHistory,
        rating_tracker::RatingTracker,
        recalculation::Recalculator,
        session_log::SessionLog,
        store::{HistoryStore, RatingStore},
        structures::{
            metric_category::MetricCategory,
            performance::SessionTimestamp,
            rating_state::{RatingHistoryEntry, RatingState},
            recalc_state::RecalcState,
            track::{Track, TrackKey}
        }
    },
    utils::test_utils::{generate_session, generate_session_log, session_time}
};

/// Reads succeed with nothing stored, every write is refused.
struct ReadOnlyStore;

impl RatingStore for ReadOnlyStore {
    type Checkpoint = ();

    fn get(&self, _key: &TrackKey) -> Result<Option<RatingState>, StoreError> {
        Ok(None)
    }

    fn upsert(&mut self, state: RatingState) -> Result<(), StoreError> {
        Err(StoreError::WriteConflict(state.key.to_string()))
    }

    fn leaderboard(&self, _track: Option<Track>, _limit: Option<usize>) -> Result<Vec<RatingState>, StoreError> {
        Ok(Vec::new())
    }

    fn processed_through(&self) -> Result<Option<SessionTimestamp>, StoreError> {
        Ok(None)
    }

    fn set_processed_through(&mut self, timestamp: SessionTimestamp) -> Result<(), StoreError> {
        Err(StoreError::WriteConflict(timestamp.to_string()))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn rollback(&mut self, _checkpoint: ()) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Every call fails.
struct OfflineStore;

fn offline<T>(what: &str) -> Result<T, StoreError> {
    Err(StoreError::Unavailable(format!("{} offline", what)))
}

impl RatingStore for OfflineStore {
    type Checkpoint = ();

    fn get(&self, _key: &TrackKey) -> Result<Option<RatingState>, StoreError> {
        offline("ratings")
    }

    fn upsert(&mut self, _state: RatingState) -> Result<(), StoreError> {
        offline("ratings")
    }

    fn leaderboard(&self, _track: Option<Track>, _limit: Option<usize>) -> Result<Vec<RatingState>, StoreError> {
        offline("ratings")
    }

    fn processed_through(&self) -> Result<Option<SessionTimestamp>, StoreError> {
        offline("ratings")
    }

    fn set_processed_through(&mut self, _timestamp: SessionTimestamp) -> Result<(), StoreError> {
        offline("ratings")
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        offline("ratings")
    }

    fn checkpoint(&self) -> Result<(), StoreError> {
        offline("ratings")
    }

    fn rollback(&mut self, _checkpoint: ()) -> Result<(), StoreError> {
        offline("ratings")
    }
}

impl HistoryStore for OfflineStore {
    type Checkpoint = ();

    fn append(&mut self, _entry: RatingHistoryEntry) -> Result<(), StoreError> {
        offline("history")
    }

    fn most_recent(&self, _key: &TrackKey, _n: usize) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        offline("history")
    }

    fn latest_timestamp(&self) -> Result<Option<SessionTimestamp>, StoreError> {
        offline("history")
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        offline("history")
    }

    fn checkpoint(&self) -> Result<(), StoreError> {
        offline("history")
    }

    fn rollback(&mut self, _checkpoint: ()) -> Result<(), StoreError> {
        offline("history")
    }
}

/// In-memory history that refuses appends once it holds `capacity` entries.
struct BoundedHistory {
    inner: RatingHistory,
    capacity: usize
}

impl HistoryStore for BoundedHistory {
    type Checkpoint = RatingHistory;

    fn append(&mut self, entry: RatingHistoryEntry) -> Result<(), StoreError> {
        if self.inner.len() >= self.capacity {
            return Err(StoreError::Unavailable("history full".to_string()));
        }

        self.inner.record(entry);
        Ok(())
    }

    fn most_recent(&self, key: &TrackKey, n: usize) -> Result<Vec<RatingHistoryEntry>, StoreError> {
        Ok(self.inner.recent(key, n))
    }

    fn latest_timestamp(&self) -> Result<Option<SessionTimestamp>, StoreError> {
        Ok(self.inner.latest())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.inner = RatingHistory::new();
        Ok(())
    }

    fn checkpoint(&self) -> Result<RatingHistory, StoreError> {
        Ok(self.inner.clone())
    }

    fn rollback(&mut self, checkpoint: RatingHistory) -> Result<(), StoreError> {
        self.inner = checkpoint;
        Ok(())
    }
}

fn dps_log() -> SessionLog {
    SessionLog::new(generate_session(session_time(1), MetricCategory::Dps, &[100.0, 200.0, 300.0]))
}

fn dps_only() -> Recalculator {
    Recalculator::new()
        .with_metrics(&[MetricCategory::Dps])
        .with_groups(Vec::new())
}

/// Store and history holding a committed rebuild of a small log.
fn committed_stores() -> (RatingTracker, RatingHistory) {
    let mut store = RatingTracker::new();
    let mut history = RatingHistory::new();
    dps_only()
        .full_rebuild(&SessionLog::new(generate_session_log(4, 3, 5)))
        .unwrap()
        .commit_replace(&mut store, &mut history)
        .unwrap();

    (store, history)
}

#[test]
fn test_commit_surfaces_write_failures() {
    let result = dps_only().full_rebuild(&dps_log()).unwrap();

    let mut store = ReadOnlyStore;
    let (_, before) = committed_stores();
    let mut history = before.clone();

    match result.commit_merge(&mut store, &mut history) {
        Err(StoreError::WriteConflict(key)) => assert!(key.contains("DPS")),
        other => panic!("Expected a write conflict, got {:?}", other)
    }
    assert_eq!(history, before);
}

#[test]
fn test_commit_replace_surfaces_clear_failures() {
    let result = dps_only().full_rebuild(&dps_log()).unwrap();

    let (mut store, _) = committed_stores();
    let before = store.clone().into_states();
    let marker = store.processed_through().unwrap();
    let mut history = OfflineStore;

    assert!(matches!(
        result.commit_replace(&mut store, &mut history),
        Err(StoreError::Unavailable(_))
    ));
    assert_eq!(store.clone().into_states(), before);
    assert_eq!(store.processed_through().unwrap(), marker);
}

#[test]
fn test_failed_replace_restores_both_stores() {
    let (mut store, committed) = committed_stores();
    let before_states = store.clone().into_states();
    let before_marker = store.processed_through().unwrap();
    let mut history = BoundedHistory {
        inner: committed.clone(),
        capacity: 2
    };

    // Three snapshots to write, room for two after the clear
    let result = dps_only().full_rebuild(&dps_log()).unwrap();
    assert_eq!(result.history.len(), 3);

    match result.commit_replace(&mut store, &mut history) {
        Err(StoreError::Unavailable(msg)) => assert_eq!(msg, "history full"),
        other => panic!("Expected the history store to fail, got {:?}", other)
    }

    assert_eq!(store.clone().into_states(), before_states);
    assert_eq!(store.processed_through().unwrap(), before_marker);
    assert_eq!(history.inner, committed);
}

#[test]
fn test_failed_merge_restores_both_stores() {
    let (mut store, committed) = committed_stores();
    let before_states = store.clone().into_states();
    let mut history = BoundedHistory {
        capacity: committed.len() + 1,
        inner: committed.clone()
    };

    let log = SessionLog::new(generate_session(session_time(9), MetricCategory::Dps, &[50.0, 150.0, 250.0]));
    let update = dps_only().incremental(&log, &store, &history).unwrap();

    assert!(update.commit_merge(&mut store, &mut history).is_err());
    assert_eq!(store.clone().into_states(), before_states);
    assert_eq!(store.processed_through().unwrap(), Some(session_time(2)));
    assert_eq!(history.inner, committed);
}

#[test]
fn test_incremental_propagates_history_failure() {
    let mut recalculator = dps_only();

    match recalculator.incremental(&dps_log(), &RatingTracker::new(), &OfflineStore) {
        Err(ProcessorError::Store(StoreError::Unavailable(msg))) => assert_eq!(msg, "history offline"),
        other => panic!("Expected store failure, got {:?}", other.map(|r| r.summary))
    }
    assert_eq!(recalculator.state(), RecalcState::Failed);
}

#[test]
fn test_incremental_propagates_rating_read_failure() {
    let mut recalculator = dps_only();

    let outcome = recalculator.incremental(&dps_log(), &OfflineStore, &RatingHistory::new());

    assert!(matches!(
        outcome,
        Err(ProcessorError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(recalculator.state(), RecalcState::Failed);
}
