//! Turn-level (utterance) dataset consumed by the critical-turn classifier.
//!
//! Unlike the agenda generators, condition and accountability are drawn
//! once per meeting and shared by every item and turn in it.

use crate::{
    error::{StudyError, StudyResult},
    rng::{StreamSlot, StudyRng},
    types::{agenda_item_label, meeting_label, team_labels, SequenceCondition, TeamId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    JuniorEng,
    JuniorPm,
    SeniorEng,
    Director,
}

impl SpeakerRole {
    pub const ALL: [SpeakerRole; 4] = [
        SpeakerRole::JuniorEng,
        SpeakerRole::JuniorPm,
        SpeakerRole::SeniorEng,
        SpeakerRole::Director,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::JuniorEng => "junior_eng",
            Self::JuniorPm  => "junior_pm",
            Self::SeniorEng => "senior_eng",
            Self::Director  => "director",
        }
    }

    pub fn is_junior(&self) -> bool {
        matches!(self, Self::JuniorEng | Self::JuniorPm)
    }
}

impl fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnDatasetConfig {
    pub n_teams:             usize,
    pub n_meetings_per_team: usize,
    pub n_items_per_meeting: usize,
    pub turns_per_item:      usize,
    pub seed:                u64,
}

impl Default for TurnDatasetConfig {
    fn default() -> Self {
        Self {
            n_teams:             6,
            n_meetings_per_team: 4,
            n_items_per_meeting: 3,
            turns_per_item:      6,
            seed:                123,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub team_id:               TeamId,
    pub meeting_id:            String,
    pub agenda_item_id:        String,
    pub turn_id:               u64,
    pub turn_position:         usize,
    pub speaker_role:          SpeakerRole,
    pub is_junior:             bool,
    pub text:                  String,
    pub is_critical:           bool,
    pub ai_suggestion_visible: bool,
    pub sequence_condition:    SequenceCondition,
    pub accountability:        bool,
}

pub fn generate_turns(config: &TurnDatasetConfig) -> StudyResult<Vec<TurnRecord>> {
    if config.n_teams == 0
        || config.n_meetings_per_team == 0
        || config.n_items_per_meeting == 0
        || config.turns_per_item == 0
    {
        return Err(StudyError::invalid("turn dataset counts must be >= 1"));
    }

    let mut rng = StudyRng::new(config.seed, StreamSlot::TurnDataset);
    let mut turns = Vec::new();
    let mut next_turn_id = 1u64;

    for team in team_labels(config.n_teams) {
        for m in 1..=config.n_meetings_per_team {
            let meeting_id = meeting_label(&team, m);
            let accountability = rng.coin();
            let condition = *rng.choose(&SequenceCondition::ALL);

            for a in 1..=config.n_items_per_meeting {
                let agenda_item_id = agenda_item_label(&meeting_id, a);
                for pos in 1..=config.turns_per_item {
                    let role = *rng.choose(&SpeakerRole::ALL);
                    let p = critical_probability(role.is_junior(), condition, accountability);
                    let is_critical = rng.chance(p);

                    turns.push(TurnRecord {
                        team_id: team.clone(),
                        meeting_id: meeting_id.clone(),
                        agenda_item_id: agenda_item_id.clone(),
                        turn_id: next_turn_id,
                        turn_position: pos,
                        speaker_role: role,
                        is_junior: role.is_junior(),
                        text: utterance_text(is_critical, condition, accountability),
                        is_critical,
                        ai_suggestion_visible: condition == SequenceCondition::AiFirst,
                        sequence_condition: condition,
                        accountability,
                    });
                    next_turn_id += 1;
                }
            }
        }
    }

    log::info!("turns: generated {} turns (seed={})", turns.len(), config.seed);
    Ok(turns)
}

pub fn critical_probability(
    is_junior: bool,
    condition: SequenceCondition,
    accountability: bool,
) -> f64 {
    let human_first = condition == SequenceCondition::HumanFirst;
    let mut p: f64 = 0.05;
    if is_junior {
        p += 0.05;
    }
    if human_first {
        p += 0.05;
    }
    if accountability {
        p += 0.05;
    }
    if is_junior && human_first && accountability {
        p += 0.10;
    }
    p.clamp(0.02, 0.6)
}

pub fn utterance_text(is_critical: bool, condition: SequenceCondition, accountability: bool) -> String {
    let mood = if is_critical {
        "raising a concern about trade-offs and risks"
    } else {
        "offering neutral progress updates"
    };
    let acc = if accountability { "accountability" } else { "no accountability" };
    format!("Synthetic utterance {mood} under {condition} with {acc}.")
}

/// Classifier input: junior speakers only.
pub fn junior_turns(turns: &[TurnRecord]) -> Vec<&TurnRecord> {
    turns.iter().filter(|t| t.is_junior).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dataset_shape() {
        let turns = generate_turns(&TurnDatasetConfig::default()).unwrap();
        assert_eq!(turns.len(), 6 * 4 * 3 * 6);
        let ids: Vec<u64> = turns.iter().map(|t| t.turn_id).collect();
        assert_eq!(ids, (1..=432).collect::<Vec<u64>>());
    }

    #[test]
    fn conditions_are_constant_within_a_meeting() {
        let turns = generate_turns(&TurnDatasetConfig::default()).unwrap();
        for meeting in turns.chunks(3 * 6) {
            let first = &meeting[0];
            assert!(meeting.iter().all(|t| t.meeting_id == first.meeting_id
                && t.sequence_condition == first.sequence_condition
                && t.accountability == first.accountability));
        }
    }

    #[test]
    fn critical_probability_peaks_for_accountable_human_first_juniors() {
        let peak = critical_probability(true, SequenceCondition::HumanFirst, true);
        assert!((peak - 0.35).abs() < 1e-12);
        let floor = critical_probability(false, SequenceCondition::StatusQuo, false);
        assert!((floor - 0.05).abs() < 1e-12);
    }

    #[test]
    fn text_and_visibility_follow_labels() {
        let turns = generate_turns(&TurnDatasetConfig::default()).unwrap();
        for t in &turns {
            assert_eq!(t.ai_suggestion_visible, t.sequence_condition == SequenceCondition::AiFirst);
            assert_eq!(t.is_junior, t.speaker_role.is_junior());
            assert!(t.text.contains(t.sequence_condition.label()));
            assert_eq!(t.text.contains("raising a concern"), t.is_critical);
        }
        assert!(junior_turns(&turns).iter().all(|t| t.is_junior));
    }

    #[test]
    fn rejects_zero_counts() {
        let cfg = TurnDatasetConfig { turns_per_item: 0, ..Default::default() };
        assert!(generate_turns(&cfg).is_err());
    }
}
