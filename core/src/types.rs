//! Shared primitive types used across the study generators and analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A team label, e.g. "T3".
pub type TeamId = String;

/// The canonical power-run identifier.
pub type RunId = String;

/// Which information source is presented first for an agenda item.
/// `StatusQuo` is the no-intervention baseline and the reference category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceCondition {
    AiFirst,
    HumanFirst,
    StatusQuo,
}

impl SequenceCondition {
    /// Draw order used by every generator. Never reorder: it changes every
    /// seeded dataset.
    pub const ALL: [SequenceCondition; 3] = [
        SequenceCondition::AiFirst,
        SequenceCondition::HumanFirst,
        SequenceCondition::StatusQuo,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::AiFirst    => "AI_FIRST",
            Self::HumanFirst => "HUMAN_FIRST",
            Self::StatusQuo  => "STATUS_QUO",
        }
    }
}

impl fmt::Display for SequenceCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Team labels T1..Tn in the order generators emit them.
pub fn team_labels(n_teams: usize) -> Vec<TeamId> {
    (1..=n_teams).map(|i| format!("T{i}")).collect()
}

pub fn meeting_label(team: &str, meeting: usize) -> String {
    format!("{team}_M{meeting}")
}

pub fn agenda_item_label(meeting_id: &str, item: usize) -> String {
    format!("{meeting_id}_A{item}")
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_compose_unique_identities() {
        let teams = team_labels(3);
        assert_eq!(teams, vec!["T1", "T2", "T3"]);
        let meeting = meeting_label(&teams[1], 4);
        assert_eq!(meeting, "T2_M4");
        assert_eq!(agenda_item_label(&meeting, 2), "T2_M4_A2");
    }

    #[test]
    fn condition_serializes_as_study_label() {
        let json = serde_json::to_string(&SequenceCondition::HumanFirst).unwrap();
        assert_eq!(json, "\"HUMAN_FIRST\"");
        assert_eq!(SequenceCondition::AiFirst.to_string(), "AI_FIRST");
    }

    #[test]
    fn rounding_keeps_requested_places() {
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(0.6666, 3), 0.667);
    }
}
