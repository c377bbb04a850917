//! Power-simulation configuration.
//!
//! `PowerConfig::default()` is the study-1 scenario. A JSON file may
//! override any subset of fields; everything else keeps its default.

use crate::{
    design::Term,
    error::{StudyError, StudyResult},
};
use serde::{Deserialize, Serialize};

/// Size of one simulated study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyDesign {
    pub n_teams: usize,
    pub n_meetings_per_team: usize,
    pub n_items_per_meeting: usize,
}

impl Default for StudyDesign {
    fn default() -> Self {
        Self {
            n_teams:             6,
            n_meetings_per_team: 4,
            n_items_per_meeting: 5,
        }
    }
}

impl StudyDesign {
    pub fn n_records(&self) -> usize {
        self.n_teams * self.n_meetings_per_team * self.n_items_per_meeting
    }
}

/// Closed interval the outcome is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeBounds {
    pub lo: f64,
    pub hi: f64,
}

impl OutcomeBounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lo, self.hi)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Assumed data-generating process for junior talk share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSizes {
    pub baseline_mean:  f64,
    pub baseline_sd:    f64,
    pub human_first:    f64,
    pub ai_first:       f64,
    pub accountability: f64,
    /// Applied only when HUMAN_FIRST and accountability co-occur.
    pub human_first_x_accountability: f64,
    pub outcome_bounds: OutcomeBounds,
}

impl Default for EffectSizes {
    fn default() -> Self {
        Self {
            baseline_mean:  0.22,
            baseline_sd:    0.05,
            human_first:    0.05,
            ai_first:       -0.02,
            accountability: 0.04,
            human_first_x_accountability: 0.05,
            outcome_bounds: OutcomeBounds { lo: 0.05, hi: 0.80 },
        }
    }
}

impl EffectSizes {
    /// Same baseline and bounds, every delta zeroed.
    pub fn null(&self) -> Self {
        Self {
            human_first: 0.0,
            ai_first: 0.0,
            accountability: 0.0,
            human_first_x_accountability: 0.0,
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    pub design:       StudyDesign,
    pub effects:      EffectSizes,
    pub alpha:        f64,
    pub n_replicates: usize,
    /// Replicate i (1-based) is seeded with `seed_offset + i`.
    pub seed_offset:  u64,
    pub tracked:      Vec<Term>,
    pub parallel:     bool,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            design:       StudyDesign::default(),
            effects:      EffectSizes::default(),
            alpha:        0.05,
            n_replicates: 300,
            seed_offset:  0,
            tracked:      Term::key_effects(),
            parallel:     false,
        }
    }
}

impl PowerConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: PowerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    pub fn replicate_seed(&self, replicate_id: usize) -> u64 {
        self.seed_offset.wrapping_add(replicate_id as u64)
    }

    /// Reject anything that would make the run meaningless before a
    /// single replicate is simulated.
    pub fn validate(&self) -> StudyResult<()> {
        let d = &self.design;
        if d.n_teams == 0 || d.n_meetings_per_team == 0 || d.n_items_per_meeting == 0 {
            return Err(StudyError::invalid(format!(
                "team/meeting/item counts must be >= 1 (got {}/{}/{})",
                d.n_teams, d.n_meetings_per_team, d.n_items_per_meeting
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(StudyError::invalid(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.n_replicates == 0 {
            return Err(StudyError::invalid("n_replicates must be >= 1"));
        }
        if self.tracked.is_empty() {
            return Err(StudyError::invalid("at least one tracked term is required"));
        }
        validate_effects(&self.effects)
    }
}

pub(crate) fn validate_effects(effects: &EffectSizes) -> StudyResult<()> {
    let sd = effects.baseline_sd;
    if !sd.is_finite() || sd < 0.0 {
        return Err(StudyError::invalid(format!(
            "baseline_sd must be finite and >= 0, got {sd}"
        )));
    }
    if !effects.baseline_mean.is_finite() {
        return Err(StudyError::invalid("baseline_mean must be finite"));
    }
    let b = effects.outcome_bounds;
    if !(b.lo.is_finite() && b.hi.is_finite() && b.lo < b.hi) {
        return Err(StudyError::invalid(format!(
            "outcome bounds must satisfy lo < hi, got [{}, {}]",
            b.lo, b.hi
        )));
    }
    Ok(())
}
