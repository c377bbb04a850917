//! Power engine behaviour: calibration, monotonicity and failure isolation.

use seqstudy_core::{
    config::{EffectSizes, PowerConfig, StudyDesign},
    design::{TeamUniverse, Term},
    error::StudyError,
    generator::{generate, AgendaRecord},
    power::{run_power_analysis, run_power_curve, DatasetSource, PowerSimulation},
    report::render_power_summary,
    types::SequenceCondition,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Synthetic data, except every replicate whose seed is a multiple of
/// `every` has its sequencing collapsed to STATUS_QUO (rank-deficient).
struct CollapsingSource {
    design:  StudyDesign,
    effects: EffectSizes,
    every:   u64,
}

impl DatasetSource for CollapsingSource {
    fn teams(&self) -> TeamUniverse {
        TeamUniverse::for_design(&self.design)
    }

    fn dataset(&self, seed: u64) -> Vec<AgendaRecord> {
        let mut records = generate(&self.design, &self.effects, seed);
        if seed % self.every == 0 {
            for r in &mut records {
                r.sequence_condition = SequenceCondition::StatusQuo;
            }
        }
        records
    }
}

#[test]
fn study_one_round_trip() {
    init_logger();
    let report = run_power_analysis(&PowerConfig::default()).expect("power run");
    let s = &report.summary;

    assert_eq!(s.n_sims, 300);
    assert_eq!(s.n_converged, 300);
    assert_eq!(report.replicates.len(), 300);
    assert!(!s.degenerate);

    let interaction = s.power(&Term::HumanFirstXAccountability).expect("defined power");
    assert!(
        (0.10..=0.60).contains(&interaction),
        "interaction power {interaction} outside sanity band"
    );
    let human_first = s.power(&Term::HumanFirst).expect("defined power");
    assert!(human_first > interaction, "main effect should be easier to detect");

    let seeds: Vec<u64> = report.replicates.iter().map(|r| r.seed).collect();
    assert_eq!(seeds, (1..=300).collect::<Vec<u64>>());
    assert!(report.replicates.iter().all(|r| r.n_teams == 6 && r.alpha == 0.05));
}

#[test]
fn null_effects_reject_near_alpha() {
    let config = PowerConfig {
        effects: EffectSizes::default().null(),
        n_replicates: 400,
        ..Default::default()
    };
    let report = run_power_analysis(&config).expect("power run");
    for p in &report.summary.powers {
        let power = p.power.expect("defined power");
        assert!(
            (power - 0.05).abs() <= 0.05,
            "{} rejected at {power} under the null",
            p.term
        );
    }
}

#[test]
fn larger_interaction_does_not_lower_power() {
    let run = |delta: f64| {
        let mut config = PowerConfig::default();
        config.effects.human_first_x_accountability = delta;
        run_power_analysis(&config)
            .expect("power run")
            .summary
            .power(&Term::HumanFirstXAccountability)
            .expect("defined power")
    };
    let small = run(0.05);
    let large = run(0.15);
    assert!(large >= small - 0.05, "power(0.15)={large} < power(0.05)={small} - 0.05");
}

#[test]
fn rank_deficient_replicates_are_isolated() {
    init_logger();
    let config = PowerConfig { n_replicates: 40, ..Default::default() };
    let source = CollapsingSource {
        design: config.design,
        effects: config.effects,
        every: 4,
    };
    let report = PowerSimulation::new(config)
        .expect("valid config")
        .with_source(Box::new(source))
        .run();

    assert_eq!(report.summary.n_sims, 40);
    assert_eq!(report.summary.n_converged, 30);
    for r in &report.replicates {
        if r.seed % 4 == 0 {
            assert!(!r.converged);
            assert!(r.flags.iter().all(|f| f.significant.is_none()));
            assert!(r.failure.as_deref().unwrap_or_default().contains("Singular"));
        } else {
            assert!(r.converged);
            assert!(r.flags.iter().all(|f| f.significant.is_some()));
        }
    }
    let tally = report
        .summary
        .powers
        .iter()
        .find(|p| p.term == Term::AiFirst)
        .expect("tracked term");
    assert_eq!(tally.n_defined, 30);
}

#[test]
fn parallel_reduction_matches_sequential_with_failures() {
    let run = |parallel: bool| {
        let config = PowerConfig { n_replicates: 40, parallel, ..Default::default() };
        let source = CollapsingSource {
            design: config.design,
            effects: config.effects,
            every: 3,
        };
        PowerSimulation::new(config)
            .expect("valid config")
            .with_source(Box::new(source))
            .run()
    };
    let sequential = run(false);
    let parallel = run(true);
    assert_eq!(parallel.summary.n_converged, 27);
    assert_eq!(parallel.summary, sequential.summary);
    assert_eq!(parallel.replicates, sequential.replicates);
}

#[test]
fn too_small_design_is_degenerate_not_a_crash() {
    // Three records cannot identify six fixed terms.
    let config = PowerConfig {
        design: StudyDesign { n_teams: 1, n_meetings_per_team: 1, n_items_per_meeting: 3 },
        n_replicates: 5,
        ..Default::default()
    };
    let report = run_power_analysis(&config).expect("valid config");
    assert_eq!(report.summary.n_sims, 5);
    assert_eq!(report.summary.n_converged, 0);
    assert!(report.summary.degenerate);
    assert!(report.summary.powers.iter().all(|p| p.power.is_none()));
    assert!(matches!(
        report.summary.require_converged(),
        Err(StudyError::DegenerateRun { n_sims: 5 })
    ));
    assert!(render_power_summary(&report.summary).contains("undefined"));
}

#[test]
fn noiseless_outcomes_do_not_converge() {
    for effects in [EffectSizes::default(), EffectSizes::default().null()] {
        let mut config = PowerConfig { n_replicates: 20, ..Default::default() };
        config.effects = EffectSizes { baseline_sd: 0.0, ..effects };
        let report = run_power_analysis(&config).expect("valid config");
        assert_eq!(report.summary.n_converged, 0);
        assert!(report.summary.degenerate);
        assert!(report
            .replicates
            .iter()
            .all(|r| r.failure.as_deref().unwrap_or_default().contains("exact fit")));
    }
}

#[test]
fn absent_term_is_undefined_without_failing_the_replicate() {
    let config = PowerConfig {
        n_replicates: 10,
        tracked: vec![Term::HumanFirst, Term::Team("T99".into())],
        ..Default::default()
    };
    let report = run_power_analysis(&config).expect("power run");
    assert_eq!(report.summary.n_converged, 10);
    assert!(report.summary.power(&Term::HumanFirst).is_some());
    assert_eq!(report.summary.power(&Term::Team("T99".into())), None);
    assert!(report
        .replicates
        .iter()
        .all(|r| r.flag(&Term::Team("T99".into())).is_none()));
}

#[test]
fn invalid_configuration_fails_fast() {
    let config = PowerConfig { alpha: 0.0, ..Default::default() };
    assert!(matches!(
        run_power_analysis(&config),
        Err(StudyError::InvalidConfiguration { .. })
    ));
    let config = PowerConfig { n_replicates: 0, ..Default::default() };
    assert!(matches!(
        PowerSimulation::new(config),
        Err(StudyError::InvalidConfiguration { .. })
    ));
}

#[test]
fn power_curve_echoes_each_design() {
    let base = PowerConfig { n_replicates: 20, ..Default::default() };
    let designs = [
        StudyDesign { n_teams: 4, ..Default::default() },
        StudyDesign { n_teams: 8, ..Default::default() },
    ];
    let reports = run_power_curve(&base, &designs).expect("curve");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].summary.design.n_teams, 4);
    assert_eq!(reports[1].summary.design.n_teams, 8);
    assert!(reports.iter().all(|r| r.summary.n_sims == 20));
}
