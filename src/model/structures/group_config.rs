use std::{path::Path, str::FromStr};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ProcessorError, ProcessorResult},
    model::structures::metric_category::MetricCategory::{self, *}
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWeight {
    pub metric: MetricCategory,
    pub weight: f64
}

/// Metrics and weights that define how a role/archetype is judged.
/// Weights are normalized to sum to 1 on construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCompositeConfig {
    pub role: String,
    pub metrics: Vec<MetricWeight>
}

/// On-disk shape, validated through [`GroupCompositeConfig::new`].
#[derive(Debug, Deserialize)]
struct RawGroupConfig {
    role: String,
    metrics: Vec<String>,
    weights: Vec<f64>
}

impl GroupCompositeConfig {
    pub fn new(role: &str, metrics: &[MetricCategory], weights: &[f64]) -> ProcessorResult<GroupCompositeConfig> {
        if metrics.is_empty() {
            return Err(ProcessorError::InvalidGroupConfig(format!("{}: no metrics configured", role)));
        }

        if metrics.len() != weights.len() {
            return Err(ProcessorError::InvalidGroupConfig(format!(
                "{}: {} metrics but {} weights",
                role,
                metrics.len(),
                weights.len()
            )));
        }

        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ProcessorError::InvalidGroupConfig(format!(
                "{}: weights must be positive",
                role
            )));
        }

        let total: f64 = weights.iter().sum();

        Ok(GroupCompositeConfig {
            role: role.to_string(),
            metrics: metrics
                .iter()
                .zip(weights)
                .map(|(metric, weight)| MetricWeight {
                    metric: *metric,
                    weight: weight / total
                })
                .collect()
        })
    }

    /// Reads a JSON array of `{ "role": .., "metrics": [..], "weights": [..] }`.
    pub fn load_all(path: &Path) -> ProcessorResult<Vec<GroupCompositeConfig>> {
        let contents = std::fs::read_to_string(path)?;
        let raw: Vec<RawGroupConfig> = serde_json::from_str(&contents)?;

        raw.iter()
            .map(|r| {
                let metrics = r
                    .metrics
                    .iter()
                    .map(|label| {
                        MetricCategory::from_str(label).map_err(|_| {
                            ProcessorError::InvalidGroupConfig(format!("{}: unknown metric '{}'", r.role, label))
                        })
                    })
                    .collect::<ProcessorResult<Vec<_>>>()?;

                GroupCompositeConfig::new(&r.role, &metrics, &r.weights)
            })
            .collect()
    }
}

lazy_static! {
    pub static ref DEFAULT_GROUP_CONFIGS: Vec<GroupCompositeConfig> = vec![
        default_config("Firebrand", &[Stability, Resistance], &[0.6, 0.4]),
        default_config(
            "Chronomancer",
            &[Stability, Cleanses, Resistance, Healing, Barrier],
            &[0.35, 0.35, 0.15, 0.1, 0.05]
        ),
        default_config("Scourge", &[Strips, Dps], &[0.7, 0.3]),
        default_config("Druid", &[Healing, Cleanses], &[0.6, 0.4]),
        default_config("China DH", &[Stability, Dps], &[0.7, 0.3]),
        default_config("Condi Firebrand", &[Stability, Cleanses, Dps], &[0.5, 0.3, 0.2]),
        default_config("Support Spb", &[Might, Resistance, Stability, Cleanses], &[0.4, 0.3, 0.2, 0.1]),
        default_config("Boon Vindi", &[Protection, Dps], &[0.7, 0.3]),
    ];
}

fn default_config(role: &str, metrics: &[MetricCategory], weights: &[f64]) -> GroupCompositeConfig {
    GroupCompositeConfig::new(role, metrics, weights).unwrap_or_else(|e| panic!("Invalid built-in group config: {}", e))
}

pub fn find_config<'a>(configs: &'a [GroupCompositeConfig], role: &str) -> Option<&'a GroupCompositeConfig> {
    configs.iter().find(|c| c.role.eq_ignore_ascii_case(role))
}
