use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use wvw_rating_processor::{
    error::ProcessorError,
    model::{
        constants::{DEFAULT_RD, MAX_RD},
        date_filter::{parse_date_filter, DateWindow},
        rating_history::RatingHistory,
        rating_tracker::RatingTracker,
        recalculation::{CancelFlag, Recalculator},
        session_log::SessionLog,
        structures::{
            metric_category::MetricCategory,
            recalc_state::RecalcState,
            track::{Track, TrackKey}
        }
    },
    utils::test_utils::{account, generate_record, generate_session, generate_session_log, session_time}
};

use crate::common::init_test_env;

const DPS: Track = Track::Metric(MetricCategory::Dps);

fn dps_only() -> Recalculator {
    Recalculator::new()
        .with_metrics(&[MetricCategory::Dps])
        .with_groups(Vec::new())
}

#[test]
fn test_full_rebuild_is_deterministic() {
    init_test_env();
    let log = SessionLog::new(generate_session_log(42, 15, 12));

    let first = Recalculator::new().full_rebuild(&log).unwrap();
    let second = Recalculator::new().full_rebuild(&log).unwrap();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first.history, second.history);
    assert_eq!(first.tracker.into_states(), second.tracker.into_states());
}

#[test]
fn test_unrated_entities_have_no_rows() {
    init_test_env();
    let t = session_time(1);
    let mut records = generate_session(t, MetricCategory::Dps, &[100.0, 200.0, 300.0]);
    // Only a healing value, so never eligible for DPS
    records.push(generate_record(t, "healer.2000", "Druid", MetricCategory::Healing, 800.0));
    let log = SessionLog::new(records);

    let result = dps_only().full_rebuild(&log).unwrap();

    assert_eq!(result.tracker.len(), 3);
    assert!(result
        .tracker
        .get_rating(&TrackKey::new("healer.2000", "Druid", DPS))
        .is_none());
    assert!(result.tracker.profile("healer.2000").is_none());
}

#[test]
fn test_lone_participant_keeps_default_rating() {
    init_test_env();
    let log = SessionLog::new(vec![generate_record(
        session_time(1),
        "solo.1000",
        "Weaver",
        MetricCategory::Dps,
        2500.0
    )]);

    let result = dps_only().full_rebuild(&log).unwrap();

    assert!(result.tracker.is_empty());
    assert_eq!(result.summary.skipped_pairs, 1);
    assert_eq!(result.summary.sessions_processed, 1);
}

#[test]
fn test_window_from_before_first_session_matches_rebuild() {
    init_test_env();
    let log = SessionLog::new(generate_session_log(5, 10, 8));

    let rebuilt = Recalculator::new().with_history(false).full_rebuild(&log).unwrap();
    let window = parse_date_filter("2024-12-01", session_time(0).date());
    assert_eq!(window.cutoff(), chrono::NaiveDate::from_ymd_opt(2024, 12, 1));

    let windowed = Recalculator::new().windowed(&log, window).unwrap();
    let everything = Recalculator::new().windowed(&log, DateWindow::All).unwrap();
    let rebuilt = rebuilt.tracker.into_states();

    assert_eq!(windowed.into_states(), rebuilt);
    assert_eq!(everything.into_states(), rebuilt);
}

#[test]
fn test_window_excludes_older_sessions() {
    init_test_env();
    let mut records = generate_session(session_time(0), MetricCategory::Dps, &[100.0, 900.0]);
    records.extend(generate_session(session_time(40), MetricCategory::Dps, &[900.0, 100.0]));
    let log = SessionLog::new(records);

    // 30 days before the last session only sees that session
    let window = parse_date_filter("30d", session_time(40).date());
    let leaderboard = dps_only().windowed_leaderboard(&log, window, Some(DPS), None).unwrap();

    assert_eq!(leaderboard.len(), 2);
    assert_eq!(leaderboard[0].key.account_name, account(1));
    assert!(leaderboard.iter().all(|s| s.games_played == 1));
}

#[test]
fn test_session_order_matters() {
    init_test_env();
    let rising = [100.0, 200.0, 300.0];
    let falling = [300.0, 200.0, 100.0];

    let mut forward = generate_session(session_time(1), MetricCategory::Dps, &rising);
    forward.extend(generate_session(session_time(2), MetricCategory::Dps, &falling));

    let mut reversed = generate_session(session_time(1), MetricCategory::Dps, &falling);
    reversed.extend(generate_session(session_time(2), MetricCategory::Dps, &rising));

    let forward = dps_only().full_rebuild(&SessionLog::new(forward)).unwrap();
    let reversed = dps_only().full_rebuild(&SessionLog::new(reversed)).unwrap();

    let key = TrackKey::new(account(1), "Weaver", DPS);
    let a = forward.tracker.get_rating(&key).unwrap();
    let b = reversed.tracker.get_rating(&key).unwrap();

    // Same sessions, same averages, different trajectory: the first session
    // moves a fresh rating the most
    assert_abs_diff_eq!(a.average_rank, b.average_rank, epsilon = 1e-9);
    assert!(a.rating < b.rating);
}

#[test]
fn test_cancelled_rebuild_leaves_canonical_store_untouched() {
    init_test_env();
    let log = SessionLog::new(generate_session_log(9, 8, 6));

    let mut store = RatingTracker::new();
    let mut history = RatingHistory::new();
    Recalculator::new()
        .full_rebuild(&SessionLog::new(generate_session_log(1, 3, 6)))
        .unwrap()
        .commit_replace(&mut store, &mut history)
        .unwrap();
    let before_states: Vec<_> = store.states().cloned().collect();
    let before_history = history.clone();

    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let mut recalculator = Recalculator::new().with_cancel_flag(cancel).with_progress(move |update| {
        if update.sessions_processed == 3 {
            trigger.cancel();
        }
    });

    let outcome = recalculator.full_rebuild(&log);
    assert!(matches!(
        outcome,
        Err(ProcessorError::Cancelled {
            sessions_processed: 3,
            sessions_total: 8
        })
    ));
    assert_eq!(recalculator.state(), RecalcState::Failed);

    assert_eq!(store.states().cloned().collect::<Vec<_>>(), before_states);
    assert_eq!(history, before_history);
}

#[test]
fn test_incremental_matches_full_rebuild() {
    init_test_env();
    let records = generate_session_log(21, 10, 8);
    let cutoff = session_time(6);
    let early: Vec<_> = records.iter().filter(|r| r.timestamp < cutoff).cloned().collect();
    let log = SessionLog::new(records);

    let mut store = RatingTracker::new();
    let mut history = RatingHistory::new();
    Recalculator::new()
        .full_rebuild(&SessionLog::new(early))
        .unwrap()
        .commit_replace(&mut store, &mut history)
        .unwrap();

    let update = Recalculator::new().incremental(&log, &store, &history).unwrap();
    assert_eq!(update.summary.sessions_total, 4);
    update.commit_merge(&mut store, &mut history).unwrap();
    store.sort();

    let rebuilt = Recalculator::new().full_rebuild(&log).unwrap();

    assert_eq!(store.len(), rebuilt.tracker.len());
    for state in rebuilt.tracker.states() {
        let merged = store.get_rating(&state.key).unwrap();
        assert_abs_diff_eq!(merged.rating, state.rating, epsilon = 1e-9);
        assert_abs_diff_eq!(merged.rd, state.rd, epsilon = 1e-9);
        assert_eq!(merged.games_played, state.games_played);
        assert_eq!(merged.leaderboard_rank, state.leaderboard_rank);
    }
    assert_eq!(history, rebuilt.history);
}

#[test]
fn test_incremental_after_rebuild_without_history() {
    init_test_env();
    let records = generate_session_log(13, 8, 6);
    let cutoff = session_time(6);
    let early: Vec<_> = records.iter().filter(|r| r.timestamp < cutoff).cloned().collect();
    let log = SessionLog::new(records);

    let mut store = RatingTracker::new();
    let mut history = RatingHistory::new();
    Recalculator::new()
        .with_history(false)
        .full_rebuild(&SessionLog::new(early))
        .unwrap()
        .commit_replace(&mut store, &mut history)
        .unwrap();
    assert!(history.is_empty());

    // Only the two sessions after the rebuild are applied
    let update = Recalculator::new().with_history(false).incremental(&log, &store, &history).unwrap();
    assert_eq!(update.summary.sessions_total, 2);
    update.commit_merge(&mut store, &mut history).unwrap();
    store.sort();

    let rebuilt = Recalculator::new().with_history(false).full_rebuild(&log).unwrap();
    for state in rebuilt.tracker.states() {
        let merged = store.get_rating(&state.key).unwrap();
        assert_abs_diff_eq!(merged.rating, state.rating, epsilon = 1e-9);
        assert_eq!(merged.games_played, state.games_played);
    }

    // A second run has nothing left to apply
    let before: Vec<_> = store.states().cloned().collect();
    let mut recalculator = Recalculator::new();
    let noop = recalculator.incremental(&log, &store, &history).unwrap();
    assert_eq!(noop.summary.sessions_total, 0);
    assert_eq!(recalculator.state(), RecalcState::Complete);

    noop.commit_merge(&mut store, &mut history).unwrap();
    assert_eq!(store.states().cloned().collect::<Vec<_>>(), before);
}

#[test]
fn test_incremental_refuses_states_without_resume_point() {
    init_test_env();
    let log = SessionLog::new(generate_session_log(17, 4, 6));
    let rebuilt = Recalculator::new().with_history(false).full_rebuild(&log).unwrap();

    // States loaded without their marker and without any history
    let store = RatingTracker::from_states(rebuilt.tracker.into_states());

    let mut recalculator = Recalculator::new();
    let outcome = recalculator.incremental(&log, &store, &RatingHistory::new());

    assert!(matches!(outcome, Err(ProcessorError::UnknownResumePoint)));
    assert_eq!(recalculator.state(), RecalcState::Failed);
}

#[test]
fn test_group_and_metric_tracks_are_separate() {
    init_test_env();
    let t = session_time(1);
    let log = SessionLog::new(vec![
        generate_record(t, "a.1", "Firebrand", MetricCategory::Stability, 1.0),
        generate_record(t, "b.1", "Firebrand", MetricCategory::Stability, 3.0),
        generate_record(t, "c.1", "Scourge", MetricCategory::Stability, 2.0),
    ]);

    let result = Recalculator::new()
        .with_metrics(&[MetricCategory::Stability])
        .full_rebuild(&log)
        .unwrap();

    // All three on the metric track, only the Firebrands on the group track
    assert_eq!(
        result
            .tracker
            .leaderboard(Some(Track::Metric(MetricCategory::Stability)), None)
            .len(),
        3
    );
    let group = result.tracker.leaderboard(Some(Track::Group), None);
    assert_eq!(group.len(), 2);
    assert!(group.iter().all(|s| s.key.profession == "Firebrand"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_replay_is_deterministic_and_bounded(seed in 0u64..1000, sessions in 1usize..6, players in 2usize..8) {
        let log = SessionLog::new(generate_session_log(seed, sessions, players));

        let parallel = Recalculator::new().full_rebuild(&log).unwrap();
        let sequential = Recalculator::new().with_parallelism(false).full_rebuild(&log).unwrap();

        prop_assert_eq!(&parallel.history, &sequential.history);

        for state in parallel.tracker.states() {
            prop_assert!(state.rating.is_finite());
            prop_assert!(state.rd > 0.0 && state.rd <= MAX_RD);
            prop_assert!(state.rd < DEFAULT_RD || state.games_played == 0);
            prop_assert!(state.average_rank > 0.0 && state.average_rank <= 100.0);
        }

        prop_assert_eq!(parallel.tracker.into_states(), sequential.tracker.into_states());
    }
}
