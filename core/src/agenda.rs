//! Full agenda-item dataset for study 1.
//!
//! Same record shape as the power generator, plus the secondary outcomes
//! (critical turns, AI override, psychological safety) that the
//! descriptives and the one-off regression read.

use crate::{
    config::{validate_effects, EffectSizes, OutcomeBounds, StudyDesign},
    error::StudyResult,
    generator::{draw_outcome, AgendaRecord},
    rng::{StreamSlot, StudyRng},
    types::{agenda_item_label, meeting_label, round_to, team_labels, SequenceCondition},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaDatasetConfig {
    pub design:  StudyDesign,
    pub effects: EffectSizes,
    pub seed:    u64,
}

impl Default for AgendaDatasetConfig {
    fn default() -> Self {
        Self {
            design:  StudyDesign::default(),
            effects: EffectSizes {
                baseline_mean:  0.22,
                baseline_sd:    0.05,
                human_first:    0.04,
                ai_first:       -0.01,
                accountability: 0.03,
                human_first_x_accountability: 0.03,
                outcome_bounds: OutcomeBounds { lo: 0.05, hi: 0.75 },
            },
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub record:                AgendaRecord,
    pub week:                  usize,
    pub junior_critical_turns: u32,
    pub override_ai:           bool,
    pub psych_safety_score:    f64,
}

pub fn generate_agenda_dataset(config: &AgendaDatasetConfig) -> StudyResult<Vec<AgendaItem>> {
    validate_effects(&config.effects)?;
    let d = &config.design;
    let mut rng = StudyRng::new(config.seed, StreamSlot::AgendaDataset);
    let mut items = Vec::with_capacity(d.n_records());

    for team in team_labels(d.n_teams) {
        for m in 1..=d.n_meetings_per_team {
            let meeting_id = meeting_label(&team, m);
            for a in 1..=d.n_items_per_meeting {
                let condition = *rng.choose(&SequenceCondition::ALL);
                let accountability = rng.coin();
                let share = draw_outcome(&config.effects, condition, accountability, &mut rng);

                // Critical turns track talk share: 0..7-ish per item.
                let expected_crit = 10.0 * share;
                let junior_critical_turns = rng.normal(expected_crit, 1.0).round().max(0.0) as u32;

                let mut override_prob: f64 = 0.10;
                if condition == SequenceCondition::HumanFirst {
                    override_prob += 0.08;
                }
                if accountability {
                    override_prob += 0.07;
                }
                if share > 0.3 {
                    override_prob += 0.05;
                }
                let override_ai = rng.chance(override_prob.clamp(0.02, 0.6));

                let mut psych_safety = 3.4;
                if accountability {
                    psych_safety += 0.3;
                }
                if share > 0.3 {
                    psych_safety += 0.2;
                }
                psych_safety += rng.normal(0.0, 0.2);

                items.push(AgendaItem {
                    record: AgendaRecord {
                        team_id: team.clone(),
                        meeting_id: meeting_id.clone(),
                        agenda_item_id: agenda_item_label(&meeting_id, a),
                        sequence_condition: condition,
                        accountability,
                        junior_talk_share: round_to(share, 3),
                    },
                    week: m,
                    junior_critical_turns,
                    override_ai,
                    psych_safety_score: round_to(psych_safety.clamp(2.0, 5.0), 2),
                });
            }
        }
    }

    log::info!("agenda: generated {} items (seed={})", items.len(), config.seed);
    Ok(items)
}

/// The regression-ready view of a full dataset.
pub fn agenda_records(items: &[AgendaItem]) -> Vec<AgendaRecord> {
    items.iter().map(|i| i.record.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_outcomes_stay_in_range() {
        let items = generate_agenda_dataset(&AgendaDatasetConfig::default()).unwrap();
        assert_eq!(items.len(), 120);
        for item in &items {
            let share = item.record.junior_talk_share;
            assert!((0.05..=0.75).contains(&share), "share {share}");
            assert!((2.0..=5.0).contains(&item.psych_safety_score));
            assert!(item.week >= 1 && item.week <= 4);
            assert!(item.junior_critical_turns < 20);
        }
    }

    #[test]
    fn same_seed_same_dataset() {
        let cfg = AgendaDatasetConfig::default();
        let a = generate_agenda_dataset(&cfg).unwrap();
        let b = generate_agenda_dataset(&cfg).unwrap();
        assert_eq!(a, b);
        let c = generate_agenda_dataset(&AgendaDatasetConfig { seed: 43, ..cfg }).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn week_is_meeting_index() {
        let items = generate_agenda_dataset(&AgendaDatasetConfig::default()).unwrap();
        let first = &items[5];
        assert_eq!(first.record.meeting_id, "T1_M2");
        assert_eq!(first.week, 2);
    }
}
