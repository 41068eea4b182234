use chrono::{Days, NaiveDate};
use tracing::warn;

use crate::model::{
    constants::{DAYS_PER_MONTH, DAYS_PER_YEAR},
    structures::performance::SessionTimestamp
};

pub const OVERALL_TOKEN: &str = "overall";

/// Sessions admitted by a date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    All,
    /// Sessions on or after the cutoff date
    Since(NaiveDate)
}

impl DateWindow {
    pub fn contains(&self, timestamp: SessionTimestamp) -> bool {
        match self {
            DateWindow::All => true,
            DateWindow::Since(cutoff) => timestamp.date() >= *cutoff
        }
    }

    pub fn cutoff(&self) -> Option<NaiveDate> {
        match self {
            DateWindow::All => None,
            DateWindow::Since(cutoff) => Some(*cutoff)
        }
    }
}

/// Resolves `<N>d`, `<N>w`, `<N>m` (30 days), `<N>y` (365 days) relative to
/// `today`, or an absolute `YYYY-MM-DD`. An empty token or `overall` means no filter.
///
/// Malformed tokens are not an error: a warning is logged and no filtering applies.
pub fn parse_date_filter(token: &str, today: NaiveDate) -> DateWindow {
    let token = token.trim();
    if token.is_empty() || token.eq_ignore_ascii_case(OVERALL_TOKEN) {
        return DateWindow::All;
    }

    match resolve_cutoff(token, today) {
        Some(cutoff) => DateWindow::Since(cutoff),
        None => {
            warn!(
                token,
                "Invalid date filter, expected e.g. 90d, 6m, 1w, 1y or YYYY-MM-DD; using all sessions"
            );
            DateWindow::All
        }
    }
}

fn resolve_cutoff(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let days_per_unit = match token.chars().last()? {
        'd' => 1,
        'w' => 7,
        'm' => DAYS_PER_MONTH,
        'y' => DAYS_PER_YEAR,
        _ => return NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
    };

    let count: u64 = token[..token.len() - 1].parse().ok()?;
    today.checked_sub_days(Days::new(count.checked_mul(days_per_unit)?))
}
