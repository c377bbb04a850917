//! Plain-text renderings for logs and summary files.

use crate::{estimator::FitResult, power::PowerSummary};
use std::fmt::Write;

/// Human-readable power summary, one line per tracked term.
pub fn render_power_summary(summary: &PowerSummary) -> String {
    let mut out = String::new();
    out.push_str("Power simulation summary for Study 1\n");
    out.push_str("====================================\n");
    let _ = writeln!(out, "n_sims: {}", summary.n_sims);
    let _ = writeln!(out, "n_converged: {}", summary.n_converged);
    out.push('\n');
    let _ = writeln!(out, "alpha: {}", summary.alpha);
    let _ = writeln!(out, "n_teams: {}", summary.design.n_teams);
    let _ = writeln!(out, "n_meetings_per_team: {}", summary.design.n_meetings_per_team);
    let _ = writeln!(out, "n_items_per_meeting: {}", summary.design.n_items_per_meeting);
    out.push('\n');
    if summary.degenerate {
        out.push_str("WARNING: no replicate converged; power is undefined.\n");
    }
    for p in &summary.powers {
        let value = match p.power {
            Some(v) => format!("{v:.3}"),
            None => "undefined".to_string(),
        };
        let _ = writeln!(out, "Estimated power ({}): {value}", p.term.describe());
    }
    out
}

/// Coefficient table with robust standard errors.
pub fn render_fit_table(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str("=== OLS results with robust (HC1) SEs ===\n");
    let _ = writeln!(
        out,
        "n_obs: {}  df_resid: {}  R-squared: {:.3}",
        fit.n_obs, fit.df_resid, fit.r_squared
    );
    let _ = writeln!(
        out,
        "{:<28} {:>10} {:>10} {:>8} {:>8} {:>10} {:>10}",
        "term", "coef", "std_err", "t", "P>|t|", "[0.025", "0.975]"
    );
    for c in &fit.coefficients {
        let _ = writeln!(
            out,
            "{:<28} {:>10.4} {:>10.4} {:>8.3} {:>8.3} {:>10.4} {:>10.4}",
            c.term.to_string(),
            c.estimate,
            c.std_error,
            c.t_stat,
            c.p_value,
            c.ci_low,
            c.ci_high
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PowerConfig,
        design::Term,
        power::{PowerSummary, PowerTally},
    };

    #[test]
    fn undefined_power_is_spelled_out() {
        let tally = PowerTally::new(&Term::key_effects());
        let summary = PowerSummary::from_tally(&tally, &PowerConfig::default());
        let text = render_power_summary(&summary);
        assert!(text.contains("n_sims: 0"));
        assert!(text.contains("WARNING"));
        assert!(text.contains(
            "Estimated power (Human_first x accountability interaction): undefined"
        ));
    }
}
