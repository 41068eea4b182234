use std::f64::consts::PI;

use crate::model::constants::{
    DEFAULT_RATING, GLICKO2_SCALE, MAX_RD, OPPONENT_RATING, OPPONENT_RD, OUTCOME_STEEPNESS
};

/// Rating, rating deviation and volatility on the public (1500/350) scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub rating: f64,
    pub rd: f64,
    pub volatility: f64
}

/// # Session-relative Glicko
///
/// A Glicko-2 variant where every session is a single game against a fixed
/// synthetic opponent. The game's score is derived from the participant's
/// session z-score, so rating moves with performance relative to peers
/// rather than with wins and losses.
///
/// The volatility step of Glicko-2 is not performed: volatility is carried
/// through unchanged. Changing that would alter every historical trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionGlicko {
    pub opponent_rating: f64,
    pub opponent_rd: f64,
    pub outcome_steepness: f64
}

impl Default for SessionGlicko {
    fn default() -> Self {
        SessionGlicko {
            opponent_rating: OPPONENT_RATING,
            opponent_rd: OPPONENT_RD,
            outcome_steepness: OUTCOME_STEEPNESS
        }
    }
}

impl SessionGlicko {
    /// Maps an unbounded z-score into a `0.0..=1.0` score against the synthetic opponent.
    /// z = 0 is a draw, z = 1 is roughly 0.82.
    pub fn outcome(&self, z_score: f64) -> f64 {
        1.0 / (1.0 + (-self.outcome_steepness * z_score).exp())
    }

    pub fn update_from_z_scores(&self, current: Rating, z_scores: &[f64]) -> Rating {
        let outcomes: Vec<f64> = z_scores.iter().map(|z| self.outcome(*z)).collect();

        self.update(current, &outcomes)
    }

    /// Rates one epoch. With no outcomes the deviation grows toward the cap
    /// (inactivity); otherwise each outcome is a game against the synthetic opponent.
    pub fn update(&self, current: Rating, outcomes: &[f64]) -> Rating {
        if outcomes.is_empty() {
            return Rating {
                rd: (current.rd.powi(2) + current.volatility.powi(2)).sqrt().min(MAX_RD),
                ..current
            };
        }

        let mu = to_mu(current.rating);
        let phi = to_phi(current.rd);
        let sigma = current.volatility;

        let opponent_mu = to_mu(self.opponent_rating);
        let opponent_phi = to_phi(self.opponent_rd);
        let g_opponent = g(opponent_phi);
        let expected = e(mu, opponent_mu, opponent_phi);

        // Estimated variance of the rating from game outcomes alone
        let v_inv: f64 = outcomes.iter().map(|_| g_opponent.powi(2) * expected * (1.0 - expected)).sum();
        if v_inv <= 0.0 {
            return current;
        }
        let v = 1.0 / v_inv;

        let delta = v * outcomes.iter().map(|s| g_opponent * (s - expected)).sum::<f64>();

        let phi_star = (phi.powi(2) + sigma.powi(2)).sqrt();
        let new_phi = 1.0 / (1.0 / phi_star.powi(2) + 1.0 / v).sqrt();
        let new_mu = mu + new_phi.powi(2) * (delta / v);

        Rating {
            rating: from_mu(new_mu),
            rd: from_phi(new_phi).min(MAX_RD),
            volatility: sigma
        }
    }
}

fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * phi.powi(2) / PI.powi(2)).sqrt()
}

fn e(mu: f64, mu_j: f64, phi_j: f64) -> f64 {
    1.0 / (1.0 + (-g(phi_j) * (mu - mu_j)).exp())
}

fn to_mu(rating: f64) -> f64 {
    (rating - DEFAULT_RATING) / GLICKO2_SCALE
}

fn to_phi(rd: f64) -> f64 {
    rd / GLICKO2_SCALE
}

fn from_mu(mu: f64) -> f64 {
    mu * GLICKO2_SCALE + DEFAULT_RATING
}

fn from_phi(phi: f64) -> f64 {
    phi * GLICKO2_SCALE
}
