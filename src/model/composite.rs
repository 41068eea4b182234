use crate::model::constants::{MAX_CONFIDENCE_BOOST, MAX_RD, RANK_WEIGHT};

/// Leaderboard sort key blending rating with the average session percentile
/// (0 = best, 100 = worst) and a small boost for low deviation.
///
/// Tracks without rank history (`average_rank_percentile <= 0`) are sorted by
/// their raw rating.
pub fn composite_score(rating: f64, average_rank_percentile: f64, rd: f64) -> f64 {
    if average_rank_percentile <= 0.0 {
        return rating;
    }

    let bonus = rank_bonus(average_rank_percentile);
    let confidence_multiplier = 1.0 + ((MAX_RD - rd) / MAX_RD * MAX_CONFIDENCE_BOOST).max(0.0);

    ((1.0 - RANK_WEIGHT) * rating + RANK_WEIGHT * (rating + bonus)) * confidence_multiplier
}

/// Piecewise linear and continuous; non-increasing in the percentile.
fn rank_bonus(percentile: f64) -> f64 {
    match percentile {
        p if p <= 5.0 => 250.0 - p * 10.0,
        p if p <= 15.0 => 200.0 - (p - 5.0) * 10.0,
        p if p <= 35.0 => 100.0 - (p - 15.0) * 3.75,
        p if p <= 65.0 => 25.0 - (p - 35.0) * (50.0 / 30.0),
        p if p <= 85.0 => -25.0 - (p - 65.0) * 3.75,
        p => -100.0 - (p - 85.0) * 10.0
    }
}
