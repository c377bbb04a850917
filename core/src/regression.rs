//! One-off regression on a pre-generated agenda dataset.

use crate::{
    agenda::{agenda_records, AgendaItem},
    design::{build_design, TeamUniverse},
    error::StudyResult,
    estimator::{fit, FitResult},
};

/// Fit talk share on sequencing, accountability, their interactions and
/// team fixed effects. The first team seen is the reference team.
pub fn fit_agenda_dataset(items: &[AgendaItem]) -> StudyResult<FitResult> {
    let records = agenda_records(items);
    let teams = TeamUniverse::from_records(&records);
    let design = build_design(&records, &teams)?;
    let result = fit(&design)?;
    log::info!(
        "regression: n_obs={} terms={} r2={:.3}",
        result.n_obs,
        result.coefficients.len(),
        result.r_squared
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agenda::{generate_agenda_dataset, AgendaDatasetConfig},
        design::Term,
    };

    #[test]
    fn full_dataset_fits_every_term() {
        let items = generate_agenda_dataset(&AgendaDatasetConfig::default()).unwrap();
        let result = fit_agenda_dataset(&items).unwrap();
        assert_eq!(result.coefficients.len(), 6 + 5);
        assert_eq!(result.df_resid, 120 - 11);
        let hf = result.get(&Term::HumanFirst).unwrap();
        assert!(hf.ci_low < hf.estimate && hf.estimate < hf.ci_high);
        assert!(result.get(&Term::Team("T6".into())).is_some());
        assert!(result.get(&Term::Team("T1".into())).is_none());
    }
}
