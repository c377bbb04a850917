//! OLS with heteroskedasticity-consistent (HC1) inference.
//!
//! Coefficients come from a Householder QR of X. The covariance is
//! White's sandwich (X'X)^-1 X' diag(e^2) X (X'X)^-1 scaled by n/(n-k);
//! p-values are two-sided against Student-t with n-k degrees of freedom.

use crate::{
    design::{DesignMatrix, Term},
    error::{StudyError, StudyResult},
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Relative tolerance on |R_jj| / max|R_ii| below which a column is
/// treated as linearly dependent.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Residual sum of squares at or below this share of ||y||^2 is an exact
/// fit: the residuals are rounding noise and robust inference is undefined.
pub const RESIDUAL_TOLERANCE: f64 = 1e-20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub term:      Term,
    pub estimate:  f64,
    pub std_error: f64,
    pub t_stat:    f64,
    pub p_value:   f64,
    pub ci_low:    f64,
    pub ci_high:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub n_obs:        usize,
    pub df_resid:     usize,
    pub r_squared:    f64,
    pub coefficients: Vec<Coefficient>,
}

impl FitResult {
    pub fn get(&self, term: &Term) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| &c.term == term)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    /// Two-sided level for the confidence bounds (0.05 gives 95% CIs).
    pub ci_alpha: f64,
}

impl Default for Estimator {
    fn default() -> Self {
        Self { ci_alpha: 0.05 }
    }
}

/// Fit with the default estimator settings.
pub fn fit(design: &DesignMatrix) -> StudyResult<FitResult> {
    Estimator::default().fit(design)
}

impl Estimator {
    pub fn fit(&self, design: &DesignMatrix) -> StudyResult<FitResult> {
        let x = &design.x;
        let y = &design.y;
        let (n, k) = x.shape();
        if k == 0 || n <= k {
            return Err(StudyError::InsufficientObservations { rows: n, columns: k });
        }

        let qr = x.clone().qr();
        let r = qr.r();
        let rank = numerical_rank(&r);
        if rank < k {
            return Err(StudyError::SingularDesign { rank, columns: k });
        }

        let qty = qr.q().transpose() * y;
        let beta = r
            .solve_upper_triangular(&qty)
            .ok_or_else(|| StudyError::numerical("triangular solve for coefficients failed"))?;
        let r_inv = r
            .solve_upper_triangular(&DMatrix::identity(k, k))
            .ok_or_else(|| StudyError::numerical("inverting R failed"))?;
        // (X'X)^-1 = R^-1 R^-T
        let bread = &r_inv * r_inv.transpose();

        let residuals = y - x * &beta;
        let ssr = residuals.norm_squared();
        if ssr <= RESIDUAL_TOLERANCE * y.norm_squared() {
            return Err(StudyError::numerical(format!(
                "exact fit (residual sum of squares {ssr:e})"
            )));
        }
        let scaled = DMatrix::from_fn(n, k, |i, j| x[(i, j)] * residuals[i]);
        let meat = scaled.transpose() * &scaled;
        let df_resid = n - k;
        let correction = n as f64 / df_resid as f64;
        let cov = &bread * meat * &bread * correction;

        let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64)
            .map_err(|e| StudyError::numerical(format!("t distribution: {e}")))?;
        let t_crit = t_dist.inverse_cdf(1.0 - self.ci_alpha / 2.0);

        let mut coefficients = Vec::with_capacity(k);
        for (j, term) in design.terms.iter().enumerate() {
            let variance = cov[(j, j)];
            if !(variance.is_finite() && variance > 0.0) {
                return Err(StudyError::numerical(format!(
                    "non-positive robust variance {variance} for {term}"
                )));
            }
            let std_error = variance.sqrt();
            let estimate = beta[j];
            let t_stat = estimate / std_error;
            let p_value = (2.0 * t_dist.sf(t_stat.abs())).clamp(0.0, 1.0);
            coefficients.push(Coefficient {
                term: term.clone(),
                estimate,
                std_error,
                t_stat,
                p_value,
                ci_low: estimate - t_crit * std_error,
                ci_high: estimate + t_crit * std_error,
            });
        }

        let mean_y = y.mean();
        let sst: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
        let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };

        Ok(FitResult {
            n_obs: n,
            df_resid,
            r_squared,
            coefficients,
        })
    }
}

fn numerical_rank(r: &DMatrix<f64>) -> usize {
    let diag = r.diagonal();
    let max_abs = diag.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if max_abs == 0.0 {
        return 0;
    }
    diag.iter().filter(|v| v.abs() > max_abs * RANK_TOLERANCE).count()
}
