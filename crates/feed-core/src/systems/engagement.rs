//! Engagement Kernel
//!
//! Scores how compelling a post looks to an agent at a given opinion. A
//! beta-shaped density centered on a skewed version of the opinion acts as
//! the bias kernel; its value is rescaled into a bounded bias factor that
//! multiplies the post's intrinsic interest.

use statrs::distribution::{Beta, Continuous};
use tracing::{debug, warn};

use feed_events::Post;

/// Calibration constants for the bias kernel
pub mod kernel_constants {
    /// Fixed spread of the bias kernel
    pub const BIAS_SD: f64 = 0.084;
    /// Keeps density inputs and parameters off the [0, 1] boundary
    pub const DENSITY_EPSILON: f64 = 1e-4;
    /// Scale of the cube-root skew applied to the opinion
    pub const SKEW_SCALE: f64 = 0.25;
    /// bias = min(1, (BIAS_SLOPE * d + BIAS_OFFSET) / BIAS_DIVISOR)
    pub const BIAS_SLOPE: f64 = 0.3;
    pub const BIAS_OFFSET: f64 = 0.3;
    pub const BIAS_DIVISOR: f64 = 2.0;
}

use kernel_constants::*;

fn clamp_open_unit(x: f64) -> f64 {
    x.clamp(DENSITY_EPSILON, 1.0 - DENSITY_EPSILON)
}

/// Pushes an opinion away from 0.5 so that agents prefer content on their
/// own side more decisively than their opinion alone suggests.
pub fn skew_mean(opinion: f64) -> f64 {
    clamp_open_unit((SKEW_SCALE * (opinion - 0.5)).cbrt() + 0.5)
}

/// Moment-matched beta parameters `(a, b)` for the given mean and `BIAS_SD`.
pub fn beta_parameters(mean: f64) -> (f64, f64) {
    let t = mean * (1.0 - mean) / (BIAS_SD * BIAS_SD);
    (mean * t, (1.0 - mean) * t)
}

/// Raw kernel density of `leaning` for an agent holding `opinion`.
///
/// Parameters the density cannot be built from fall back to zero, which
/// yields the minimum bias factor.
pub fn bias_density(opinion: f64, leaning: f64) -> f64 {
    let (a, b) = beta_parameters(skew_mean(opinion));
    let x = clamp_open_unit(leaning);
    match Beta::new(a, b) {
        Ok(beta) => {
            let density = beta.pdf(x);
            if density.is_finite() {
                density
            } else {
                debug!(opinion, leaning, a, b, "non-finite kernel density, using 0");
                0.0
            }
        }
        Err(err) => {
            warn!(opinion, a, b, %err, "degenerate kernel parameters, using 0");
            0.0
        }
    }
}

/// Saturating rescale of a raw density into a bias factor.
pub fn bias_factor(density: f64) -> f64 {
    ((BIAS_SLOPE * density + BIAS_OFFSET) / BIAS_DIVISOR).min(1.0)
}

/// How engaging `post` appears to an agent whose current opinion is `opinion`.
///
/// Values above 1 are reported and returned unclamped so rankings stay
/// comparable.
pub fn how_engaging(post: &Post, opinion: f64) -> f64 {
    let engagement = predict_engagement(post, opinion);
    if engagement > 1.0 {
        debug!(post = %post.id(), engagement, "engagement above 1");
    }
    engagement
}

/// Same formula as [`how_engaging`], used by the ranker to order candidates
/// without any diagnostics.
pub fn predict_engagement(post: &Post, opinion: f64) -> f64 {
    post.interest_value() * bias_factor(bias_density(opinion, post.leaning()))
}
