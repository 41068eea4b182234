use std::{cmp::Ordering, collections::BTreeMap};

use crate::model::{
    constants::MIN_PARTICIPANTS,
    normalizer::{normalize_session, Roster},
    session_log::SessionSource,
    structures::{
        group_config::GroupCompositeConfig, metric_category::MetricCategory, performance::SessionTimestamp
    }
};

/// Weighted average over the configured metrics of a role where each metric
/// may or may not have produced a z-score this session. Weights are
/// renormalized over the metrics that did.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedZ {
    entries: Vec<(MetricCategory, f64, Option<f64>)>
}

impl WeightedZ {
    pub fn new(config: &GroupCompositeConfig) -> WeightedZ {
        WeightedZ {
            entries: config.metrics.iter().map(|m| (m.metric, m.weight, None)).collect()
        }
    }

    pub fn record(&mut self, metric: MetricCategory, z_score: f64) {
        for (_, _, z) in self.entries.iter_mut().filter(|(m, _, _)| *m == metric) {
            *z = Some(z_score);
        }
    }

    pub fn present(&self) -> usize {
        self.entries.iter().filter(|(_, _, z)| z.is_some()).count()
    }

    pub fn combined(&self) -> Option<f64> {
        let (weighted_sum, total_weight) = self
            .entries
            .iter()
            .filter_map(|(_, w, z)| z.map(|z| (w * z, *w)))
            .fold((0.0, 0.0), |(sum, total), (wz, w)| (sum + wz, total + w));

        if total_weight > 0.0 {
            Some(weighted_sum / total_weight)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupPerformance {
    pub account_name: String,
    pub role: String,
    pub combined_z: f64,
    pub metrics_present: usize,
    pub rank: usize,
    pub population_size: usize,
    pub normalized_rank: f64
}

/// Scores one session for a role: every configured metric is normalized over
/// the whole session, then restricted to the role's members. Metrics with
/// fewer than two such members are left out of the weighted average.
///
/// Returns `None` when the session carries no signal for the role.
pub fn normalize_group_session<S: SessionSource + ?Sized>(
    config: &GroupCompositeConfig,
    source: &S,
    timestamp: SessionTimestamp,
    roster: Option<&Roster>
) -> Option<Vec<GroupPerformance>> {
    let members: Vec<String> = source
        .participants(timestamp, &config.role)
        .into_iter()
        .filter(|a| roster.is_none_or(|r| r.contains(a)))
        .collect();

    if members.len() < MIN_PARTICIPANTS {
        return None;
    }

    let mut combined: BTreeMap<&str, WeightedZ> = members.iter().map(|m| (m.as_str(), WeightedZ::new(config))).collect();

    for metric in config.metrics.iter().map(|m| m.metric) {
        let Some(session) = normalize_session(metric, &source.samples(timestamp, metric), roster) else {
            continue;
        };

        let role_performances: Vec<_> = session
            .performances
            .iter()
            .filter(|p| p.profession == config.role && combined.contains_key(p.account_name.as_str()))
            .collect();

        if role_performances.len() < MIN_PARTICIPANTS {
            continue;
        }

        for performance in role_performances {
            if let Some(weighted) = combined.get_mut(performance.account_name.as_str()) {
                weighted.record(metric, performance.z_score);
            }
        }
    }

    let mut scored: Vec<(&str, f64, usize)> = combined
        .iter()
        .filter_map(|(account, weighted)| weighted.combined().map(|z| (*account, z, weighted.present())))
        .collect();

    if scored.len() < MIN_PARTICIPANTS {
        return None;
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(b.0)));

    let population_size = scored.len();
    Some(
        scored
            .into_iter()
            .enumerate()
            .map(|(i, (account, z, present))| GroupPerformance {
                account_name: account.to_string(),
                role: config.role.clone(),
                combined_z: z,
                metrics_present: present,
                rank: i + 1,
                population_size,
                normalized_rank: (i + 1) as f64 / population_size as f64 * 100.0
            })
            .collect()
    )
}
