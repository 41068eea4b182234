use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// A logical performance channel. Each category is rated on its own track.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum MetricCategory {
    #[strum(to_string = "DPS")]
    Dps,
    #[strum(to_string = "Healing")]
    Healing,
    #[strum(to_string = "Barrier")]
    Barrier,
    #[strum(to_string = "Cleanses")]
    Cleanses,
    #[strum(to_string = "Strips")]
    Strips,
    #[strum(to_string = "Stability")]
    Stability,
    #[strum(to_string = "Resistance")]
    Resistance,
    #[strum(to_string = "Might")]
    Might,
    #[strum(to_string = "Protection")]
    Protection,
    #[strum(to_string = "Downs")]
    Downs,
    #[strum(to_string = "Burst Consistency")]
    BurstConsistency,
    #[strum(to_string = "Distance to Tag")]
    DistanceToTag
}

impl MetricCategory {
    /// The `player_performances` column backing this category.
    pub fn column(&self) -> &'static str {
        match self {
            MetricCategory::Dps => "target_dps",
            MetricCategory::Healing => "healing_per_sec",
            MetricCategory::Barrier => "barrier_per_sec",
            MetricCategory::Cleanses => "condition_cleanses_per_sec",
            MetricCategory::Strips => "boon_strips_per_sec",
            MetricCategory::Stability => "stability_gen_per_sec",
            MetricCategory::Resistance => "resistance_gen_per_sec",
            MetricCategory::Might => "might_gen_per_sec",
            MetricCategory::Protection => "protection_gen_per_sec",
            MetricCategory::Downs => "down_contribution_per_sec",
            MetricCategory::BurstConsistency => "burst_consistency_1s",
            MetricCategory::DistanceToTag => "distance_from_tag_avg"
        }
    }

    /// Support metrics get a dynamic floor so incidental contributors do not skew the session.
    pub fn is_support(&self) -> bool {
        matches!(
            self,
            MetricCategory::Healing
                | MetricCategory::Barrier
                | MetricCategory::Cleanses
                | MetricCategory::Strips
                | MetricCategory::Stability
                | MetricCategory::Resistance
                | MetricCategory::Might
                | MetricCategory::Protection
        )
    }

    /// Smaller values rank higher. Zero is a legitimate value (the commander sits on the tag).
    pub fn lower_is_better(&self) -> bool {
        matches!(self, MetricCategory::DistanceToTag)
    }

    /// Whether a raw value takes part in a session at all.
    pub fn accepts(&self, value: f64) -> bool {
        if self.lower_is_better() {
            value >= 0.0
        } else {
            value > 0.0
        }
    }
}
