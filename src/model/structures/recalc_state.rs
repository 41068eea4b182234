use crate::model::structures::performance::SessionTimestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcState {
    Idle,
    Replaying,
    Complete,
    Failed
}

/// Passed to the progress callback once per processed session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub sessions_processed: usize,
    pub sessions_total: usize,
    pub timestamp: SessionTimestamp
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecalcSummary {
    pub sessions_total: usize,
    pub sessions_processed: usize,
    /// (session, metric-or-role) pairs skipped for lack of signal
    pub skipped_pairs: usize,
    pub track_updates: usize
}
