use super::db_structs::{
    history_entry_from_row, performance_columns, performance_from_row, rating_state_from_row, RATING_HISTORY_COLUMNS,
    RATING_STATE_COLUMNS
};
use crate::{
    error::ProcessorResult,
    model::{
        normalizer::Roster,
        structures::{
            performance::{PerformanceRecord, SessionTimestamp},
            rating_state::{RatingHistoryEntry, RatingState}
        }
    },
    utils::progress_utils::progress_bar
};
use postgres_types::ToSql;
use std::sync::Arc;
use tokio_postgres::{Client, Error, NoTls};
use tracing::{error, info, warn};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

// Stays well below the 65535 bind parameter limit of PostgreSQL
const INSERT_CHUNK_SIZE: usize = 1000;

#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    /// Creates the processor tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> ProcessorResult<()> {
        self.client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn get_performances(&self) -> ProcessorResult<Vec<PerformanceRecord>> {
        info!("Fetching performances...");
        let query = format!(
            "SELECT {} FROM player_performances ORDER BY timestamp, account_name, profession",
            performance_columns()
        );
        let rows = self.client.query(query.as_str(), &[]).await?;

        let records = rows
            .iter()
            .map(performance_from_row)
            .collect::<ProcessorResult<Vec<_>>>()?;

        info!("Fetched {} performances", records.len());
        Ok(records)
    }

    pub async fn get_roster(&self) -> ProcessorResult<Roster> {
        let rows = self
            .client
            .query("SELECT account_name FROM roster_members", &[])
            .await?;

        let roster = Roster::new(
            rows.iter()
                .map(|row| row.try_get::<_, String>("account_name"))
                .collect::<Result<Vec<_>, _>>()?
        );

        if roster.is_empty() {
            warn!("Roster filter requested but roster_members is empty");
        }

        Ok(roster)
    }

    pub async fn get_rating_states(&self) -> ProcessorResult<Vec<RatingState>> {
        let query = format!("SELECT {} FROM session_ratings", RATING_STATE_COLUMNS);
        let rows = self.client.query(query.as_str(), &[]).await?;

        rows.iter().map(rating_state_from_row).collect()
    }

    pub async fn get_history(&self) -> ProcessorResult<Vec<RatingHistoryEntry>> {
        let query = format!(
            "SELECT {} FROM rating_history ORDER BY timestamp",
            RATING_HISTORY_COLUMNS
        );
        let rows = self.client.query(query.as_str(), &[]).await?;

        rows.iter().map(history_entry_from_row).collect()
    }

    /// Newest session already folded into `session_ratings`.
    pub async fn get_processed_through(&self) -> ProcessorResult<Option<SessionTimestamp>> {
        let row = self
            .client
            .query_opt("SELECT processed_through FROM replay_progress WHERE id", &[])
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<_, Option<SessionTimestamp>>("processed_through")?),
            None => Ok(None)
        }
    }

    /// Replaces all ratings, history and the processed-through marker in one transaction.
    pub async fn save_results(
        &self,
        states: &[RatingState],
        history: &[RatingHistoryEntry],
        processed_through: Option<SessionTimestamp>
    ) -> ProcessorResult<()> {
        self.client.batch_execute("BEGIN").await?;

        let result = async {
            self.truncate_table("rating_history").await?;
            self.truncate_table("session_ratings").await?;
            self.save_rating_states(states, false).await?;
            self.save_history(history).await?;
            self.save_processed_through(processed_through).await
        }
        .await;

        self.finish_transaction(result).await
    }

    /// Upserts the given states and snapshots in one transaction. The marker
    /// only moves when sessions were actually replayed.
    pub async fn save_incremental(
        &self,
        states: &[RatingState],
        history: &[RatingHistoryEntry],
        processed_through: Option<SessionTimestamp>
    ) -> ProcessorResult<()> {
        self.client.batch_execute("BEGIN").await?;

        let result = async {
            self.save_rating_states(states, true).await?;
            self.save_history(history).await?;
            match processed_through {
                Some(_) => self.save_processed_through(processed_through).await,
                None => Ok(())
            }
        }
        .await;

        self.finish_transaction(result).await
    }

    async fn save_processed_through(&self, processed_through: Option<SessionTimestamp>) -> ProcessorResult<()> {
        self.client
            .execute(
                "INSERT INTO replay_progress (id, processed_through) VALUES (TRUE, $1) \
                ON CONFLICT (id) DO UPDATE SET processed_through = EXCLUDED.processed_through",
                &[&processed_through]
            )
            .await?;

        info!(processed_through = ?processed_through, "Saved replay progress");
        Ok(())
    }

    async fn finish_transaction(&self, result: ProcessorResult<()>) -> ProcessorResult<()> {
        match result {
            Ok(()) => {
                self.client.batch_execute("COMMIT").await?;
                info!("Results committed");
                Ok(())
            }
            Err(e) => {
                error!("Saving results failed, rolling back: {}", e);
                if let Err(rollback) = self.client.batch_execute("ROLLBACK").await {
                    error!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    async fn save_rating_states(&self, states: &[RatingState], upsert: bool) -> ProcessorResult<()> {
        let p_bar = progress_bar(states.len() as u64, "Saving session ratings".to_string());
        let conflict = if upsert {
            " ON CONFLICT (account_name, profession, track) DO UPDATE SET rating = EXCLUDED.rating, \
            rd = EXCLUDED.rd, volatility = EXCLUDED.volatility, games_played = EXCLUDED.games_played, \
            total_rank_sum = EXCLUDED.total_rank_sum, average_rank = EXCLUDED.average_rank, \
            total_stat_value = EXCLUDED.total_stat_value, average_stat_value = EXCLUDED.average_stat_value, \
            composite_score = EXCLUDED.composite_score, leaderboard_rank = EXCLUDED.leaderboard_rank, \
            leaderboard_percentile = EXCLUDED.leaderboard_percentile"
        } else {
            ""
        };

        for chunk in states.chunks(INSERT_CHUNK_SIZE) {
            let tracks: Vec<String> = chunk.iter().map(|s| s.key.track.to_string()).collect();
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 14);

            for (state, track) in chunk.iter().zip(&tracks) {
                let row: [&(dyn ToSql + Sync); 14] = [
                    &state.key.account_name,
                    &state.key.profession,
                    track,
                    &state.rating,
                    &state.rd,
                    &state.volatility,
                    &state.games_played,
                    &state.total_rank_sum,
                    &state.average_rank,
                    &state.total_stat_value,
                    &state.average_stat_value,
                    &state.composite_score,
                    &state.leaderboard_rank,
                    &state.leaderboard_percentile
                ];
                params.extend_from_slice(&row);
            }

            let query = format!(
                "INSERT INTO session_ratings ({}) VALUES {}{}",
                RATING_STATE_COLUMNS,
                value_placeholders(chunk.len(), 14),
                conflict
            );
            self.client.execute(query.as_str(), &params).await?;

            if let Some(bar) = &p_bar {
                bar.inc(chunk.len() as u64);
            }
        }

        if let Some(bar) = p_bar {
            bar.finish();
        }

        info!("Saved {} session ratings", states.len());
        Ok(())
    }

    async fn save_history(&self, history: &[RatingHistoryEntry]) -> ProcessorResult<()> {
        let p_bar = progress_bar(history.len() as u64, "Saving rating history".to_string());

        for chunk in history.chunks(INSERT_CHUNK_SIZE) {
            let tracks: Vec<String> = chunk.iter().map(|e| e.key.track.to_string()).collect();
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 7);

            for (entry, track) in chunk.iter().zip(&tracks) {
                let row: [&(dyn ToSql + Sync); 7] = [
                    &entry.key.account_name,
                    &entry.key.profession,
                    track,
                    &entry.timestamp,
                    &entry.rating,
                    &entry.rd,
                    &entry.volatility
                ];
                params.extend_from_slice(&row);
            }

            let query = format!(
                "INSERT INTO rating_history ({}) VALUES {} ON CONFLICT (account_name, profession, track, timestamp) \
                DO UPDATE SET rating = EXCLUDED.rating, rd = EXCLUDED.rd, volatility = EXCLUDED.volatility",
                RATING_HISTORY_COLUMNS,
                value_placeholders(chunk.len(), 7)
            );
            self.client.execute(query.as_str(), &params).await?;

            if let Some(bar) = &p_bar {
                bar.inc(chunk.len() as u64);
            }
        }

        if let Some(bar) = p_bar {
            bar.finish();
        }

        info!("Saved {} rating history entries", history.len());
        Ok(())
    }

    async fn truncate_table(&self, table: &str) -> ProcessorResult<()> {
        self.client
            .execute(
                format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", table).as_str(),
                &[]
            )
            .await?;

        info!("Truncated the {} table!", table);
        Ok(())
    }

    // Access the underlying Client
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }
}

/// `($1, $2), ($3, $4)` for two rows of two columns.
fn value_placeholders(rows: usize, columns: usize) -> String {
    (0..rows)
        .map(|r| {
            let row: Vec<String> = (1..=columns).map(|c| format!("${}", r * columns + c)).collect();
            format!("({})", row.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
