use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc
};

use rayon::prelude::*;
use strum::IntoEnumIterator;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ProcessorError, ProcessorResult, StoreError},
    model::{
        constants::DEFAULT_RATING,
        date_filter::DateWindow,
        glicko::SessionGlicko,
        group::normalize_group_session,
        normalizer::{normalize_session, Roster},
        rating_history::RatingHistory,
        rating_tracker::RatingTracker,
        session_log::SessionSource,
        store::{HistoryStore, RatingStore},
        structures::{
            group_config::{GroupCompositeConfig, DEFAULT_GROUP_CONFIGS},
            metric_category::MetricCategory,
            performance::SessionTimestamp,
            rating_state::{RatingHistoryEntry, RatingState},
            recalc_state::{ProgressUpdate, RecalcState, RecalcSummary},
            track::{Track, TrackKey}
        }
    }
};

/// Shared flag checked between sessions. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// One independently rated stream of a session.
#[derive(Debug, Clone, Copy)]
enum Channel<'a> {
    Metric(MetricCategory),
    Group(&'a GroupCompositeConfig)
}

/// Working copies produced by a replay. Nothing reaches a canonical store
/// until one of the commit methods is called.
#[derive(Debug, Clone, Default)]
pub struct ReplayResult {
    /// Every track touched by the replay
    pub tracker: RatingTracker,
    /// Snapshots appended by the replay
    pub history: RatingHistory,
    /// Newest session replayed, `None` when nothing was replayed
    pub processed_through: Option<SessionTimestamp>,
    pub summary: RecalcSummary
}

impl ReplayResult {
    /// Drop-and-replace: the stores end up holding exactly this result.
    pub fn commit_replace<S, H>(&self, store: &mut S, history: &mut H) -> Result<(), StoreError>
    where
        S: RatingStore + ?Sized,
        H: HistoryStore + ?Sized
    {
        self.commit(store, history, true)
    }

    /// Upserts the touched tracks and appends the new snapshots.
    pub fn commit_merge<S, H>(&self, store: &mut S, history: &mut H) -> Result<(), StoreError>
    where
        S: RatingStore + ?Sized,
        H: HistoryStore + ?Sized
    {
        self.commit(store, history, false)
    }

    /// All or nothing: on any failure both stores are rolled back to their
    /// checkpoints before the error is returned.
    fn commit<S, H>(&self, store: &mut S, history: &mut H, replace: bool) -> Result<(), StoreError>
    where
        S: RatingStore + ?Sized,
        H: HistoryStore + ?Sized
    {
        let store_checkpoint = store.checkpoint()?;
        let history_checkpoint = history.checkpoint()?;

        let applied = self.apply(store, history, replace);
        if let Err(e) = &applied {
            warn!(error = %e, "Commit failed, restoring previous store contents");

            if let Err(rollback) = store.rollback(store_checkpoint) {
                error!("Rating store rollback failed: {}", rollback);
            }
            if let Err(rollback) = history.rollback(history_checkpoint) {
                error!("History store rollback failed: {}", rollback);
            }
        }

        applied
    }

    fn apply<S, H>(&self, store: &mut S, history: &mut H, replace: bool) -> Result<(), StoreError>
    where
        S: RatingStore + ?Sized,
        H: HistoryStore + ?Sized
    {
        if replace {
            store.clear()?;
            history.clear()?;
        }

        for state in self.tracker.states() {
            store.upsert(state.clone())?;
        }

        for entry in self.history.entries() {
            history.append(entry.clone())?;
        }

        if let Some(timestamp) = self.processed_through {
            store.set_processed_through(timestamp)?;
        }

        Ok(())
    }
}

/// Rating change caused by the most recent session.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingDelta {
    pub key: TrackKey,
    pub before: f64,
    pub after: f64,
    pub delta: f64
}

/// # Recalculation
///
/// Replays sessions in ascending timestamp order. Each session is handled in
/// two phases: every channel (metric category or group config) is planned
/// against the state left by the previous session, then the planned states
/// are applied. Channels own disjoint track keys, so planning may run on the
/// rayon pool without affecting the result.
///
/// Every variant replays into private working copies; cancelling or failing
/// leaves the caller's stores untouched.
pub struct Recalculator {
    engine: SessionGlicko,
    metrics: Vec<MetricCategory>,
    groups: Vec<GroupCompositeConfig>,
    roster: Option<Roster>,
    record_history: bool,
    parallel: bool,
    cancel: CancelFlag,
    progress: Option<ProgressCallback>,
    state: RecalcState
}

impl Default for Recalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Recalculator {
    pub fn new() -> Recalculator {
        Recalculator {
            engine: SessionGlicko::default(),
            metrics: MetricCategory::iter().collect(),
            groups: DEFAULT_GROUP_CONFIGS.clone(),
            roster: None,
            record_history: true,
            parallel: true,
            cancel: CancelFlag::new(),
            progress: None,
            state: RecalcState::Idle
        }
    }

    pub fn with_engine(mut self, engine: SessionGlicko) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_metrics(mut self, metrics: &[MetricCategory]) -> Self {
        self.metrics = metrics.to_vec();
        self
    }

    /// Group configs rated alongside the metrics. Later configs for an
    /// already configured role are ignored.
    pub fn with_groups(mut self, groups: Vec<GroupCompositeConfig>) -> Self {
        let mut unique: Vec<GroupCompositeConfig> = Vec::with_capacity(groups.len());
        for config in groups {
            if unique.iter().any(|c| c.role.eq_ignore_ascii_case(&config.role)) {
                warn!(role = %config.role, "Duplicate group config ignored");
                continue;
            }
            unique.push(config);
        }

        self.groups = unique;
        self
    }

    pub fn with_roster(mut self, roster: Option<Roster>) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_history(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> RecalcState {
        self.state
    }

    pub fn groups(&self) -> &[GroupCompositeConfig] {
        &self.groups
    }

    /// Replays every session from default ratings. Commit the result with
    /// [`ReplayResult::commit_replace`].
    pub fn full_rebuild<Src: SessionSource + ?Sized>(&mut self, source: &Src) -> ProcessorResult<ReplayResult> {
        let sessions = source.session_timestamps();
        let record_history = self.record_history;
        let groups = self.groups.clone();
        let channels = channels_for(&self.metrics, &groups);
        info!(sessions = sessions.len(), channels = channels.len(), "Starting full rebuild");

        self.run(source, &sessions, &channels, None::<&RatingTracker>, record_history)
    }

    /// Replays only sessions newer than the store's processed-through
    /// marker, continuing from the ratings in `store`. Stores without a
    /// marker fall back to the newest snapshot in `history`. Commit the
    /// result with [`ReplayResult::commit_merge`].
    pub fn incremental<Src, S, H>(&mut self, source: &Src, store: &S, history: &H) -> ProcessorResult<ReplayResult>
    where
        Src: SessionSource + ?Sized,
        S: RatingStore,
        H: HistoryStore + ?Sized
    {
        self.state = RecalcState::Replaying;

        let latest = match resume_point(store, history) {
            Ok(latest) => latest,
            Err(e) => {
                self.state = RecalcState::Failed;
                return Err(e);
            }
        };

        let sessions: Vec<SessionTimestamp> = source
            .session_timestamps()
            .into_iter()
            .filter(|ts| latest.is_none_or(|l| *ts > l))
            .collect();

        if sessions.is_empty() {
            info!("No new sessions to process");
            self.state = RecalcState::Complete;
            return Ok(ReplayResult::default());
        }

        info!(sessions = sessions.len(), since = ?latest, "Starting incremental update");

        let record_history = self.record_history;
        let groups = self.groups.clone();
        let channels = channels_for(&self.metrics, &groups);

        self.run(source, &sessions, &channels, Some(store), record_history)
    }

    /// Self-contained replay of the sessions inside `window`, starting from
    /// default ratings. The returned tracker is private to the caller.
    pub fn windowed<Src: SessionSource + ?Sized>(
        &mut self,
        source: &Src,
        window: DateWindow
    ) -> ProcessorResult<RatingTracker> {
        let sessions: Vec<SessionTimestamp> = source
            .session_timestamps()
            .into_iter()
            .filter(|ts| window.contains(*ts))
            .collect();
        info!(sessions = sessions.len(), cutoff = ?window.cutoff(), "Starting windowed recalculation");

        let groups = self.groups.clone();
        let channels = channels_for(&self.metrics, &groups);

        self.run(source, &sessions, &channels, None::<&RatingTracker>, false)
            .map(|result| result.tracker)
    }

    /// Leaderboard of a windowed replay. The working copy is dropped once read.
    pub fn windowed_leaderboard<Src: SessionSource + ?Sized>(
        &mut self,
        source: &Src,
        window: DateWindow,
        track: Option<Track>,
        limit: Option<usize>
    ) -> ProcessorResult<Vec<RatingState>> {
        let working = self.windowed(source, window)?;

        Ok(working.leaderboard(track, limit))
    }

    /// Rates one role on its group track over the sessions inside `window`.
    pub fn group_weighted<Src: SessionSource + ?Sized>(
        &mut self,
        source: &Src,
        config: &GroupCompositeConfig,
        window: DateWindow
    ) -> ProcessorResult<ReplayResult> {
        let sessions: Vec<SessionTimestamp> = source
            .session_timestamps()
            .into_iter()
            .filter(|ts| window.contains(*ts))
            .collect();
        info!(role = %config.role, sessions = sessions.len(), "Starting group recalculation");

        let record_history = self.record_history;
        self.run(source, &sessions, &[Channel::Group(config)], None::<&RatingTracker>, record_history)
    }

    /// Rating change of every track caused by the most recent session:
    /// two private replays, without and with that session. Tracks created
    /// by the session count from the default rating.
    pub fn replay_deltas<Src: SessionSource + ?Sized>(
        &mut self,
        source: &Src,
        track: Option<Track>
    ) -> ProcessorResult<Vec<RatingDelta>> {
        let sessions = source.session_timestamps();
        let Some((_, earlier)) = sessions.split_last() else {
            return Ok(Vec::new());
        };

        let groups = self.groups.clone();
        let channels = channels_for(&self.metrics, &groups);

        let before = self.run(source, earlier, &channels, None::<&RatingTracker>, false)?.tracker;
        let after = self.run(source, &sessions, &channels, None::<&RatingTracker>, false)?.tracker;

        Ok(after
            .leaderboard(track, None)
            .into_iter()
            .map(|state| {
                let before = before.get_rating(&state.key).map_or(DEFAULT_RATING, |s| s.rating);

                RatingDelta {
                    delta: state.rating - before,
                    before,
                    after: state.rating,
                    key: state.key
                }
            })
            .collect())
    }

    fn run<Src, S>(
        &mut self,
        source: &Src,
        sessions: &[SessionTimestamp],
        channels: &[Channel],
        canonical: Option<&S>,
        record_history: bool
    ) -> ProcessorResult<ReplayResult>
    where
        Src: SessionSource + ?Sized,
        S: RatingStore
    {
        self.state = RecalcState::Replaying;

        let result = self.replay_sessions(source, sessions, channels, canonical, record_history);
        self.state = match &result {
            Ok(_) => RecalcState::Complete,
            Err(_) => RecalcState::Failed
        };

        result
    }

    fn replay_sessions<Src, S>(
        &self,
        source: &Src,
        sessions: &[SessionTimestamp],
        channels: &[Channel],
        canonical: Option<&S>,
        record_history: bool
    ) -> ProcessorResult<ReplayResult>
    where
        Src: SessionSource + ?Sized,
        S: RatingStore
    {
        let mut tracker = RatingTracker::new();
        let mut history = RatingHistory::new();
        let mut summary = RecalcSummary {
            sessions_total: sessions.len(),
            ..Default::default()
        };

        for (i, timestamp) in sessions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(processed = i, total = sessions.len(), "Recalculation cancelled");
                return Err(ProcessorError::Cancelled {
                    sessions_processed: i,
                    sessions_total: sessions.len()
                });
            }

            let plans = self.plan_session(source, *timestamp, channels, &tracker, canonical)?;

            for plan in plans {
                let Some(states) = plan else {
                    summary.skipped_pairs += 1;
                    continue;
                };

                for state in states {
                    if record_history {
                        history.record(RatingHistoryEntry::snapshot(&state, *timestamp));
                    }

                    tracker.insert_or_update(state);
                    summary.track_updates += 1;
                }
            }

            summary.sessions_processed = i + 1;
            if let Some(progress) = &self.progress {
                progress(ProgressUpdate {
                    sessions_processed: i + 1,
                    sessions_total: sessions.len(),
                    timestamp: *timestamp
                });
            }
        }

        tracker.sort();

        info!(
            sessions = summary.sessions_processed,
            track_updates = summary.track_updates,
            skipped = summary.skipped_pairs,
            tracks = tracker.len(),
            "Replay complete"
        );

        Ok(ReplayResult {
            tracker,
            history,
            processed_through: sessions.last().copied(),
            summary
        })
    }

    /// Updated states per channel, `None` where the channel had no signal.
    fn plan_session<Src, S>(
        &self,
        source: &Src,
        timestamp: SessionTimestamp,
        channels: &[Channel],
        working: &RatingTracker,
        canonical: Option<&S>
    ) -> Result<Vec<Option<Vec<RatingState>>>, StoreError>
    where
        Src: SessionSource + ?Sized,
        S: RatingStore
    {
        let plan = |channel: &Channel| self.plan_channel(source, timestamp, *channel, working, canonical);

        if self.parallel {
            channels.par_iter().map(plan).collect()
        } else {
            channels.iter().map(plan).collect()
        }
    }

    fn plan_channel<Src, S>(
        &self,
        source: &Src,
        timestamp: SessionTimestamp,
        channel: Channel,
        working: &RatingTracker,
        canonical: Option<&S>
    ) -> Result<Option<Vec<RatingState>>, StoreError>
    where
        Src: SessionSource + ?Sized,
        S: RatingStore
    {
        match channel {
            Channel::Metric(metric) => {
                let Some(session) = normalize_session(metric, &source.samples(timestamp, metric), self.roster.as_ref())
                else {
                    debug!(%timestamp, %metric, "Not enough participants, skipping");
                    return Ok(None);
                };

                session
                    .performances
                    .iter()
                    .map(|p| {
                        let key = TrackKey::new(&p.account_name, &p.profession, Track::Metric(metric));
                        self.rate(key, p.z_score, p.normalized_rank, p.metric_value, working, canonical)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some)
            }
            Channel::Group(config) => {
                let Some(performances) = normalize_group_session(config, source, timestamp, self.roster.as_ref())
                else {
                    debug!(%timestamp, role = %config.role, "Not enough role members, skipping");
                    return Ok(None);
                };

                performances
                    .iter()
                    .map(|p| {
                        let key = TrackKey::new(&p.account_name, &p.role, Track::Group);
                        self.rate(key, p.combined_z, p.normalized_rank, p.combined_z, working, canonical)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some)
            }
        }
    }

    fn rate<S: RatingStore>(
        &self,
        key: TrackKey,
        z_score: f64,
        normalized_rank: f64,
        stat_value: f64,
        working: &RatingTracker,
        canonical: Option<&S>
    ) -> Result<RatingState, StoreError> {
        let mut state = match working.get_rating(&key) {
            Some(state) => state.clone(),
            None => match canonical {
                Some(store) => store.get(&key)?.unwrap_or_else(|| RatingState::new(key)),
                None => RatingState::new(key)
            }
        };

        let updated = self.engine.update_from_z_scores(state.current(), &[z_score]);
        state.record_session(updated, normalized_rank, stat_value);

        Ok(state)
    }
}

/// Newest session already folded into `store`. States that exist without
/// either a marker or history cannot be resumed safely.
fn resume_point<S, H>(store: &S, history: &H) -> ProcessorResult<Option<SessionTimestamp>>
where
    S: RatingStore,
    H: HistoryStore + ?Sized
{
    if let Some(marker) = store.processed_through()? {
        return Ok(Some(marker));
    }

    let latest = history.latest_timestamp()?;
    if latest.is_none() && !store.leaderboard(None, Some(1))?.is_empty() {
        return Err(ProcessorError::UnknownResumePoint);
    }

    Ok(latest)
}

fn channels_for<'a>(metrics: &[MetricCategory], groups: &'a [GroupCompositeConfig]) -> Vec<Channel<'a>> {
    metrics
        .iter()
        .map(|m| Channel::Metric(*m))
        .chain(groups.iter().map(Channel::Group))
        .collect()
}
