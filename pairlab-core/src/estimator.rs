//! Ordinary least squares for the hedge ratio.
//!
//! Fits `y = alpha + beta * x` over the rows where both series have a finite
//! value. Closed-form normal equations; no iterative solver.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Result of a two-variable OLS fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub alpha: f64,
    pub beta: f64,
    pub r_squared: f64,
    /// Number of paired observations used.
    pub n_obs: usize,
}

impl OlsFit {
    /// Residual `y - (alpha + beta * x)`.
    pub fn residual(&self, y: f64, x: f64) -> f64 {
        y - (self.alpha + self.beta * x)
    }
}

/// Fit `y = alpha + beta * x`, dropping rows where either side is missing.
pub fn fit_ols(y: &[Option<f64>], x: &[Option<f64>]) -> SimResult<OlsFit> {
    let pairs: Vec<(f64, f64)> = y
        .iter()
        .zip(x.iter())
        .filter_map(|(&yi, &xi)| match (yi, xi) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((a, b)),
            _ => None,
        })
        .collect();

    let n = pairs.len();
    if n < 2 {
        return Err(SimError::InsufficientData { needed: 2, found: n });
    }

    let nf = n as f64;
    let mean_y = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_x = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(yi, xi) in &pairs {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // Rounding in the mean can leave a constant regressor with a tiny positive sxx.
    let tolerance = 1e-12 * nf * mean_x.abs().max(1.0).powi(2);
    if sxx <= tolerance {
        return Err(SimError::DegenerateInput(
            "regressor x has zero variance".into(),
        ));
    }

    let beta = sxy / sxx;
    let alpha = mean_y - beta * mean_x;

    let ss_res: f64 = pairs
        .iter()
        .map(|&(yi, xi)| {
            let e = yi - (alpha + beta * xi);
            e * e
        })
        .sum();
    let r_squared = if syy > 0.0 { 1.0 - ss_res / syy } else { 0.0 };

    Ok(OlsFit {
        alpha,
        beta,
        r_squared,
        n_obs: n,
    })
}
