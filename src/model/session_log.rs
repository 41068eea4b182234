use std::collections::BTreeMap;

use crate::model::structures::{
    metric_category::MetricCategory,
    performance::{MetricSample, PerformanceRecord, SessionTimestamp}
};

/// Read boundary towards the log parser. Implementations must return
/// timestamps in ascending order.
pub trait SessionSource: Sync {
    fn session_timestamps(&self) -> Vec<SessionTimestamp>;

    /// Every participant of the session whose value for `metric` is eligible
    /// (positive, or non-negative for lower-is-better metrics).
    fn samples(&self, timestamp: SessionTimestamp, metric: MetricCategory) -> Vec<MetricSample>;

    /// Accounts that played `profession` in the session.
    fn participants(&self, timestamp: SessionTimestamp, profession: &str) -> Vec<String>;
}

/// In-memory performance records grouped by session.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    sessions: BTreeMap<SessionTimestamp, Vec<PerformanceRecord>>
}

impl SessionLog {
    pub fn new(records: Vec<PerformanceRecord>) -> SessionLog {
        let mut log = SessionLog::default();
        for record in records {
            log.push(record);
        }

        log
    }

    /// Adds a record, replacing an existing one for the same (session, account, profession).
    pub fn push(&mut self, record: PerformanceRecord) {
        let session = self.sessions.entry(record.timestamp).or_default();

        match session
            .iter_mut()
            .find(|r| r.account_name == record.account_name && r.profession == record.profession)
        {
            Some(existing) => *existing = record,
            None => session.push(record)
        }
    }

    pub fn records(&self, timestamp: SessionTimestamp) -> &[PerformanceRecord] {
        self.sessions.get(&timestamp).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn latest_timestamp(&self) -> Option<SessionTimestamp> {
        self.sessions.keys().next_back().copied()
    }

    /// A copy without the most recent session.
    pub fn without_latest(&self) -> SessionLog {
        let mut sessions = self.sessions.clone();
        sessions.pop_last();

        SessionLog { sessions }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn record_count(&self) -> usize {
        self.sessions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionSource for SessionLog {
    fn session_timestamps(&self) -> Vec<SessionTimestamp> {
        self.sessions.keys().copied().collect()
    }

    fn samples(&self, timestamp: SessionTimestamp, metric: MetricCategory) -> Vec<MetricSample> {
        self.records(timestamp)
            .iter()
            .map(|r| MetricSample {
                account_name: r.account_name.clone(),
                profession: r.profession.clone(),
                value: r.metrics.value(metric)
            })
            .filter(|s| metric.accepts(s.value))
            .collect()
    }

    fn participants(&self, timestamp: SessionTimestamp, profession: &str) -> Vec<String> {
        let mut accounts: Vec<String> = self
            .records(timestamp)
            .iter()
            .filter(|r| r.profession == profession)
            .map(|r| r.account_name.clone())
            .collect();

        accounts.sort();
        accounts.dedup();
        accounts
    }
}
