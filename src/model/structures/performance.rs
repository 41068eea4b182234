use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{error::ProcessorError, model::structures::metric_category::MetricCategory};

/// Sessions are identified by the start time of the fight.
pub type SessionTimestamp = NaiveDateTime;

/// Format of the session token written by the log parser, e.g. `202507041830`.
pub const SESSION_TOKEN_FORMAT: &str = "%Y%m%d%H%M";

pub fn parse_session_token(token: &str) -> Result<SessionTimestamp, ProcessorError> {
    NaiveDateTime::parse_from_str(token, SESSION_TOKEN_FORMAT)
        .map_err(|e| ProcessorError::InvalidRecord(format!("session token '{}': {}", token, e)))
}

/// Per-second metric columns of one participant in one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub target_dps: f64,
    pub healing_per_sec: f64,
    pub barrier_per_sec: f64,
    pub condition_cleanses_per_sec: f64,
    pub boon_strips_per_sec: f64,
    pub stability_gen_per_sec: f64,
    pub resistance_gen_per_sec: f64,
    pub might_gen_per_sec: f64,
    pub protection_gen_per_sec: f64,
    pub down_contribution_per_sec: f64,
    pub burst_consistency_1s: f64,
    pub distance_from_tag_avg: f64
}

impl PerformanceMetrics {
    pub fn value(&self, metric: MetricCategory) -> f64 {
        match metric {
            MetricCategory::Dps => self.target_dps,
            MetricCategory::Healing => self.healing_per_sec,
            MetricCategory::Barrier => self.barrier_per_sec,
            MetricCategory::Cleanses => self.condition_cleanses_per_sec,
            MetricCategory::Strips => self.boon_strips_per_sec,
            MetricCategory::Stability => self.stability_gen_per_sec,
            MetricCategory::Resistance => self.resistance_gen_per_sec,
            MetricCategory::Might => self.might_gen_per_sec,
            MetricCategory::Protection => self.protection_gen_per_sec,
            MetricCategory::Downs => self.down_contribution_per_sec,
            MetricCategory::BurstConsistency => self.burst_consistency_1s,
            MetricCategory::DistanceToTag => self.distance_from_tag_avg
        }
    }

    pub fn set(&mut self, metric: MetricCategory, value: f64) {
        let slot = match metric {
            MetricCategory::Dps => &mut self.target_dps,
            MetricCategory::Healing => &mut self.healing_per_sec,
            MetricCategory::Barrier => &mut self.barrier_per_sec,
            MetricCategory::Cleanses => &mut self.condition_cleanses_per_sec,
            MetricCategory::Strips => &mut self.boon_strips_per_sec,
            MetricCategory::Stability => &mut self.stability_gen_per_sec,
            MetricCategory::Resistance => &mut self.resistance_gen_per_sec,
            MetricCategory::Might => &mut self.might_gen_per_sec,
            MetricCategory::Protection => &mut self.protection_gen_per_sec,
            MetricCategory::Downs => &mut self.down_contribution_per_sec,
            MetricCategory::BurstConsistency => &mut self.burst_consistency_1s,
            MetricCategory::DistanceToTag => &mut self.distance_from_tag_avg
        };

        *slot = value;
    }
}

/// One row per (account, profession, session) as produced by the log parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub timestamp: SessionTimestamp,
    pub account_name: String,
    pub profession: String,
    pub fight_time: f64,
    pub metrics: PerformanceMetrics
}

/// A single participant's value for one metric in one session.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub account_name: String,
    pub profession: String,
    pub value: f64
}
