use std::{process, str::FromStr};

use chrono::{Local, Months};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wvw_rating_processor::{
    args::{Args, Command},
    database::db::DbClient,
    error::{ProcessorError, ProcessorResult},
    model::{
        date_filter::{parse_date_filter, DateWindow},
        rating_history::RatingHistory,
        rating_tracker::RatingTracker,
        recalculation::{CancelFlag, Recalculator},
        session_log::SessionLog,
        structures::{
            group_config::{find_config, GroupCompositeConfig, DEFAULT_GROUP_CONFIGS},
            track::Track
        }
    },
    utils::{
        progress_utils::{progress_bar, replay_progress},
        reports
    }
};

const PROFILE_HISTORY_MONTHS: u32 = 6;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .with_writer(std::io::stderr)
        .init();

    let Some(connection_string) = args.connection_string.clone() else {
        error!("CONNECTION_STRING is not set");
        error!("Application cannot start without a valid database connection");
        process::exit(1);
    };

    let db = match DbClient::connect(&connection_string).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            error!("Application cannot start without a valid database connection");
            process::exit(1);
        }
    };

    if let Err(e) = run(&args, &db).await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(args: &Args, db: &DbClient) -> ProcessorResult<()> {
    db.ensure_schema().await?;

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current session");
            signal_flag.cancel();
        }
    });

    let recalculator = build_recalculator(args, db, cancel).await?;
    let log = SessionLog::new(db.get_performances().await?);
    info!(
        sessions = log.session_count(),
        records = log.record_count(),
        "Loaded session log"
    );

    match &args.command {
        Command::Rebuild { no_history } => {
            let mut recalculator = recalculator.with_history(!no_history);
            let (result, recalculator) = blocking(move || {
                let result = recalculator.full_rebuild(&log);
                (result, recalculator)
            })
            .await?;
            let result = result?;
            info!(state = ?recalculator.state(), "Rebuild finished");

            let mut tracker = RatingTracker::new();
            let mut history = RatingHistory::new();
            result.commit_replace(&mut tracker, &mut history)?;
            tracker.sort();

            println!("{}", reports::summary(&result.summary, tracker.len(), history.len()));

            let states = tracker.into_states();
            let entries = history.into_entries();
            db.save_results(&states, &entries, result.processed_through).await?;
        }
        Command::Incremental => {
            let tracker = RatingTracker::from_states(db.get_rating_states().await?)
                .with_processed_through(db.get_processed_through().await?);
            let history = RatingHistory::from_entries(db.get_history().await?);
            let mut recalculator = recalculator;

            let (result, mut tracker) = blocking(move || {
                let result = recalculator.incremental(&log, &tracker, &history);
                (result, tracker)
            })
            .await?;
            let result = result?;

            if result.summary.sessions_total == 0 {
                return Ok(());
            }

            let mut appended = RatingHistory::new();
            result.commit_merge(&mut tracker, &mut appended)?;
            tracker.sort();

            println!("{}", reports::summary(&result.summary, tracker.len(), appended.len()));

            let states: Vec<_> = tracker.states().cloned().collect();
            db.save_incremental(&states, &appended.into_entries(), result.processed_through)
                .await?;
        }
        Command::Window { token, metric, limit } => {
            let window = parse_date_filter(token, Local::now().date_naive());
            let track = parse_track_arg(metric.as_deref())?;
            let limit = *limit;

            let leaderboard = blocking(move || {
                let mut recalculator = recalculator;
                recalculator.windowed_leaderboard(&log, window, track, Some(limit))
            })
            .await??;

            println!("{}", reports::leaderboard(&leaderboard));
        }
        Command::Group {
            role,
            date_filter,
            limit
        } => {
            let window = date_filter
                .as_deref()
                .map_or(DateWindow::All, |token| parse_date_filter(token, Local::now().date_naive()));
            let config = find_config(recalculator.groups(), role)
                .cloned()
                .ok_or_else(|| ProcessorError::InvalidGroupConfig(format!("no group config for role '{}'", role)))?;
            let limit = *limit;

            let leaderboard = blocking(move || {
                let mut recalculator = recalculator.with_history(false);
                recalculator
                    .group_weighted(&log, &config, window)
                    .map(|result| result.tracker.leaderboard(Some(Track::Group), Some(limit)))
            })
            .await??;

            println!("{}", reports::leaderboard(&leaderboard));
        }
        Command::Leaderboard { metric, limit } => {
            let tracker = RatingTracker::from_states(db.get_rating_states().await?);
            let track = parse_track_arg(metric.as_deref())?;

            println!("{}", reports::leaderboard(&tracker.leaderboard(track, Some(*limit))));
        }
        Command::Profile { account } => {
            let tracker = RatingTracker::from_states(db.get_rating_states().await?);
            let history = RatingHistory::from_entries(db.get_history().await?);

            let Some(profile) = tracker.profile(account) else {
                warn!("No ratings found for account '{}'", account);
                return Ok(());
            };

            let since = Local::now()
                .naive_local()
                .checked_sub_months(Months::new(PROFILE_HISTORY_MONTHS));
            let series = history.player_series(account, None, since);

            println!("{}", reports::profile(&profile, &series));
            info!(
                professions = ?profile.summary.professions,
                tracks = profile.summary.tracks.len(),
                mean_rating = profile.summary.mean_rating,
                total_games = profile.summary.total_games,
                "Profile summary"
            );
        }
        Command::Deltas { metric } => {
            let track = parse_track_arg(metric.as_deref())?;

            let deltas = blocking(move || {
                let mut recalculator = recalculator;
                recalculator.replay_deltas(&log, track)
            })
            .await??;

            println!("{}", reports::deltas(&deltas));
        }
    }

    Ok(())
}

async fn build_recalculator(args: &Args, db: &DbClient, cancel: CancelFlag) -> ProcessorResult<Recalculator> {
    let groups = match &args.group_config {
        Some(path) => GroupCompositeConfig::load_all(path)?,
        None => DEFAULT_GROUP_CONFIGS.clone()
    };

    let roster = if args.roster_only {
        Some(db.get_roster().await?)
    } else {
        None
    };

    let mut recalculator = Recalculator::new()
        .with_groups(groups)
        .with_roster(roster)
        .with_parallelism(!args.sequential)
        .with_cancel_flag(cancel);

    if let Some(bar) = progress_bar(0, "Replaying sessions".to_string()) {
        recalculator = recalculator.with_progress(replay_progress(bar));
    }

    Ok(recalculator)
}

fn parse_track_arg(label: Option<&str>) -> ProcessorResult<Option<Track>> {
    label
        .map(|l| Track::from_str(l).map_err(|_| ProcessorError::InvalidRecord(format!("unknown metric '{}'", l))))
        .transpose()
}

/// Replays are CPU bound; running them off the runtime keeps the interrupt
/// handler responsive.
async fn blocking<F, T>(f: F) -> ProcessorResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static
{
    Ok(tokio::task::spawn_blocking(f).await?)
}
