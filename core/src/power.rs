//! Monte-Carlo power analysis: trial runner and aggregator.
//!
//! RULES:
//!   - Replicate i (1-based) is seeded with `seed_offset + i` and nothing
//!     else; results never depend on execution order or thread count.
//!   - A replicate that fails to fit is recorded as non-converged with
//!     undefined flags. It never aborts the run.
//!   - Undefined flags are excluded from power, never counted as 0.

use crate::{
    config::{EffectSizes, PowerConfig, StudyDesign},
    design::{build_design, TeamUniverse, Term},
    error::{StudyError, StudyResult},
    estimator::Estimator,
    generator::{generate, AgendaRecord},
    types::round_to,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Where each replicate's dataset comes from.
pub trait DatasetSource: Send + Sync {
    /// Team universe every dataset is checked against.
    fn teams(&self) -> TeamUniverse;

    /// Produce the dataset for one replicate seed.
    fn dataset(&self, seed: u64) -> Vec<AgendaRecord>;
}

/// The generative model driven by the configured design and effects.
pub struct SyntheticSource {
    pub design:  StudyDesign,
    pub effects: EffectSizes,
}

impl DatasetSource for SyntheticSource {
    fn teams(&self) -> TeamUniverse {
        TeamUniverse::for_design(&self.design)
    }

    fn dataset(&self, seed: u64) -> Vec<AgendaRecord> {
        generate(&self.design, &self.effects, seed)
    }
}

/// Significance decision for one tracked term in one replicate.
/// `significant` is None when the replicate failed or the term was absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Significance {
    pub term:        Term,
    pub significant: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateRecord {
    pub replicate_id:        usize,
    pub seed:                u64,
    pub n_teams:             usize,
    pub n_meetings_per_team: usize,
    pub n_items_per_meeting: usize,
    pub alpha:               f64,
    pub flags:               Vec<Significance>,
    pub converged:           bool,
    pub failure:             Option<String>,
}

impl ReplicateRecord {
    pub fn flag(&self, term: &Term) -> Option<bool> {
        self.flags.iter().find(|s| &s.term == term).and_then(|s| s.significant)
    }
}

/// Running counts for one tracked term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermTally {
    pub term:          Term,
    pub n_defined:     usize,
    pub n_significant: usize,
}

/// Order-independent reduction over replicate records.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerTally {
    pub n_sims:      usize,
    pub n_converged: usize,
    pub terms:       Vec<TermTally>,
}

impl PowerTally {
    pub fn new(tracked: &[Term]) -> Self {
        Self {
            n_sims: 0,
            n_converged: 0,
            terms: tracked
                .iter()
                .map(|t| TermTally { term: t.clone(), n_defined: 0, n_significant: 0 })
                .collect(),
        }
    }

    pub fn add(&mut self, record: &ReplicateRecord) {
        self.n_sims += 1;
        if !record.converged {
            return;
        }
        self.n_converged += 1;
        for tally in &mut self.terms {
            if let Some(sig) = record.flag(&tally.term) {
                tally.n_defined += 1;
                if sig {
                    tally.n_significant += 1;
                }
            }
        }
    }

    /// Combine two partial tallies over the same tracked terms.
    pub fn merge(mut self, other: PowerTally) -> Self {
        self.n_sims += other.n_sims;
        self.n_converged += other.n_converged;
        for (mine, theirs) in self.terms.iter_mut().zip(other.terms) {
            debug_assert_eq!(mine.term, theirs.term);
            mine.n_defined += theirs.n_defined;
            mine.n_significant += theirs.n_significant;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermPower {
    pub term:          Term,
    /// Share significant among converged replicates with a defined flag,
    /// rounded to 3 decimals. None when no such replicate exists.
    pub power:         Option<f64>,
    pub n_defined:     usize,
    pub n_significant: usize,
}

/// The one-row Power Table for a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSummary {
    pub n_sims:      usize,
    pub n_converged: usize,
    pub degenerate:  bool,
    pub powers:      Vec<TermPower>,
    pub alpha:       f64,
    pub design:      StudyDesign,
    pub effects:     EffectSizes,
}

impl PowerSummary {
    pub fn from_tally(tally: &PowerTally, config: &PowerConfig) -> Self {
        let powers = tally
            .terms
            .iter()
            .map(|t| TermPower {
                term: t.term.clone(),
                power: (t.n_defined > 0)
                    .then(|| round_to(t.n_significant as f64 / t.n_defined as f64, 3)),
                n_defined: t.n_defined,
                n_significant: t.n_significant,
            })
            .collect();
        Self {
            n_sims: tally.n_sims,
            n_converged: tally.n_converged,
            degenerate: tally.n_converged == 0,
            powers,
            alpha: config.alpha,
            design: config.design,
            effects: config.effects,
        }
    }

    pub fn power(&self, term: &Term) -> Option<f64> {
        self.powers.iter().find(|p| &p.term == term).and_then(|p| p.power)
    }

    /// Surface a degenerate run as an error for callers that need power values.
    pub fn require_converged(&self) -> StudyResult<&Self> {
        if self.degenerate {
            return Err(StudyError::DegenerateRun { n_sims: self.n_sims });
        }
        Ok(self)
    }
}

/// Summary plus the per-replicate audit table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerReport {
    pub config:     PowerConfig,
    pub summary:    PowerSummary,
    pub replicates: Vec<ReplicateRecord>,
}

pub struct PowerSimulation {
    config:    PowerConfig,
    source:    Box<dyn DatasetSource>,
    estimator: Estimator,
}

impl PowerSimulation {
    /// Validate the configuration and wire the synthetic generator.
    pub fn new(config: PowerConfig) -> StudyResult<Self> {
        config.validate()?;
        let source = SyntheticSource { design: config.design, effects: config.effects };
        Ok(Self {
            config,
            source: Box::new(source),
            estimator: Estimator::default(),
        })
    }

    /// Replace the dataset source (used for fault injection and replays).
    pub fn with_source(mut self, source: Box<dyn DatasetSource>) -> Self {
        self.source = source;
        self
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    pub fn run(&self) -> PowerReport {
        let n = self.config.n_replicates;
        log::info!(
            "power: starting n_sims={n} teams={} meetings={} items={} alpha={} parallel={}",
            self.config.design.n_teams,
            self.config.design.n_meetings_per_team,
            self.config.design.n_items_per_meeting,
            self.config.alpha,
            self.config.parallel
        );

        let tracked = &self.config.tracked;
        let (replicates, tally) = if self.config.parallel {
            let replicates: Vec<ReplicateRecord> =
                (1..=n).into_par_iter().map(|i| self.run_replicate(i)).collect();
            let tally = replicates
                .par_iter()
                .fold(
                    || PowerTally::new(tracked),
                    |mut t, r| {
                        t.add(r);
                        t
                    },
                )
                .reduce(|| PowerTally::new(tracked), PowerTally::merge);
            (replicates, tally)
        } else {
            let replicates: Vec<ReplicateRecord> =
                (1..=n).map(|i| self.run_replicate(i)).collect();
            let tally = replicates.iter().fold(PowerTally::new(tracked), |mut t, r| {
                t.add(r);
                t
            });
            (replicates, tally)
        };
        let summary = PowerSummary::from_tally(&tally, &self.config);

        if summary.degenerate {
            log::warn!("power: degenerate run, 0 of {n} replicates converged");
        } else {
            log::info!(
                "power: finished n_converged={}/{}",
                summary.n_converged,
                summary.n_sims
            );
        }

        PowerReport {
            config: self.config.clone(),
            summary,
            replicates,
        }
    }

    /// One independent trial: generate, build, fit, decide.
    pub fn run_replicate(&self, replicate_id: usize) -> ReplicateRecord {
        let seed = self.config.replicate_seed(replicate_id);
        let records = self.source.dataset(seed);
        let teams = self.source.teams();
        let outcome = build_design(&records, &teams).and_then(|d| self.estimator.fit(&d));

        let (flags, converged, failure) = match outcome {
            Ok(fit) => {
                let flags = self
                    .config
                    .tracked
                    .iter()
                    .map(|term| Significance {
                        term: term.clone(),
                        significant: fit.get(term).map(|c| c.p_value < self.config.alpha),
                    })
                    .collect();
                (flags, true, None)
            }
            Err(e) => {
                log::warn!("power: replicate={replicate_id} seed={seed} did not converge: {e}");
                let flags = self
                    .config
                    .tracked
                    .iter()
                    .map(|term| Significance { term: term.clone(), significant: None })
                    .collect();
                (flags, false, Some(e.to_string()))
            }
        };

        let d = &self.config.design;
        ReplicateRecord {
            replicate_id,
            seed,
            n_teams: d.n_teams,
            n_meetings_per_team: d.n_meetings_per_team,
            n_items_per_meeting: d.n_items_per_meeting,
            alpha: self.config.alpha,
            flags,
            converged,
            failure,
        }
    }
}

/// Validate, simulate and aggregate one configuration.
pub fn run_power_analysis(config: &PowerConfig) -> StudyResult<PowerReport> {
    Ok(PowerSimulation::new(config.clone())?.run())
}

/// One power run per study design, everything else held fixed.
pub fn run_power_curve(base: &PowerConfig, designs: &[StudyDesign]) -> StudyResult<Vec<PowerReport>> {
    designs
        .iter()
        .map(|design| {
            let config = PowerConfig { design: *design, ..base.clone() };
            run_power_analysis(&config)
        })
        .collect()
}
