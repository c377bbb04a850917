//! Generative model for power replicates.
//!
//! One record per agenda item, team-major, then meeting, then item.
//! Condition and accountability are drawn independently and uniformly
//! per item; the outcome is baseline noise plus additive deltas,
//! clamped into the configured bounds.

use crate::{
    config::{EffectSizes, StudyDesign},
    rng::{StreamSlot, StudyRng},
    types::{agenda_item_label, meeting_label, team_labels, SequenceCondition, TeamId},
};
use serde::{Deserialize, Serialize};

/// One synthetic agenda item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaRecord {
    pub team_id:            TeamId,
    pub meeting_id:         String,
    pub agenda_item_id:     String,
    pub sequence_condition: SequenceCondition,
    pub accountability:     bool,
    pub junior_talk_share:  f64,
}

/// Generate one dataset. Same seed, same records, bit for bit.
pub fn generate(design: &StudyDesign, effects: &EffectSizes, seed: u64) -> Vec<AgendaRecord> {
    let mut rng = StudyRng::new(seed, StreamSlot::PowerReplicate);
    generate_with(design, effects, &mut rng)
}

/// Generate one dataset drawing from a caller-owned stream.
pub fn generate_with(
    design: &StudyDesign,
    effects: &EffectSizes,
    rng: &mut StudyRng,
) -> Vec<AgendaRecord> {
    let mut records = Vec::with_capacity(design.n_records());
    for team in team_labels(design.n_teams) {
        for m in 1..=design.n_meetings_per_team {
            let meeting_id = meeting_label(&team, m);
            for a in 1..=design.n_items_per_meeting {
                let condition = *rng.choose(&SequenceCondition::ALL);
                let accountability = rng.coin();
                let share = draw_outcome(effects, condition, accountability, rng);
                records.push(AgendaRecord {
                    team_id:            team.clone(),
                    meeting_id:         meeting_id.clone(),
                    agenda_item_id:     agenda_item_label(&meeting_id, a),
                    sequence_condition: condition,
                    accountability,
                    junior_talk_share:  share,
                });
            }
        }
    }
    log::debug!(
        "generator: stream={} records={} teams={}",
        rng.name,
        records.len(),
        design.n_teams
    );
    records
}

/// Baseline draw plus the deterministic deltas, clamped.
pub fn draw_outcome(
    effects: &EffectSizes,
    condition: SequenceCondition,
    accountability: bool,
    rng: &mut StudyRng,
) -> f64 {
    let base = rng.normal(effects.baseline_mean, effects.baseline_sd);
    effects.outcome_bounds.clamp(base + expected_delta(effects, condition, accountability))
}

pub fn expected_delta(
    effects: &EffectSizes,
    condition: SequenceCondition,
    accountability: bool,
) -> f64 {
    let mut delta = match condition {
        SequenceCondition::HumanFirst => effects.human_first,
        SequenceCondition::AiFirst    => effects.ai_first,
        SequenceCondition::StatusQuo  => 0.0,
    };
    if accountability {
        delta += effects.accountability;
        if condition == SequenceCondition::HumanFirst {
            delta += effects.human_first_x_accountability;
        }
    }
    delta
}
