use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::model::structures::metric_category::MetricCategory;

pub const GROUP_TRACK_LABEL: &str = "Group";

/// The rating lineage a state belongs to: one metric category, or the
/// weighted group composite of the profession/role in the key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Track {
    Metric(MetricCategory),
    Group
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Metric(metric) => write!(f, "{}", metric),
            Track::Group => f.write_str(GROUP_TRACK_LABEL)
        }
    }
}

impl FromStr for Track {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(GROUP_TRACK_LABEL) {
            return Ok(Track::Group);
        }

        MetricCategory::from_str(s).map(Track::Metric)
    }
}

/// Unique key of a rating track: (account, profession/role, track).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
    pub account_name: String,
    pub profession: String,
    pub track: Track
}

impl TrackKey {
    pub fn new(account_name: impl Into<String>, profession: impl Into<String>, track: Track) -> TrackKey {
        TrackKey {
            account_name: account_name.into(),
            profession: profession.into(),
            track
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.account_name, self.profession, self.track)
    }
}
