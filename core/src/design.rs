//! Design builder: condition labels to indicator, interaction and team
//! fixed-effect columns.
//!
//! Column order is fixed: intercept, AI_first, Human_first,
//! accountability, AI_first:accountability, Human_first:accountability,
//! then one column per non-reference team. STATUS_QUO and the reference
//! team are the omitted categories. Rank is not checked here; the
//! estimator owns singularity detection.

use crate::{
    config::StudyDesign,
    error::{StudyError, StudyResult},
    generator::AgendaRecord,
    types::{team_labels, SequenceCondition, TeamId},
};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A named model term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Intercept,
    AiFirst,
    HumanFirst,
    Accountability,
    AiFirstXAccountability,
    HumanFirstXAccountability,
    Team(TeamId),
}

impl Term {
    /// The coefficients a power run tracks unless told otherwise.
    pub fn key_effects() -> Vec<Term> {
        vec![Term::AiFirst, Term::HumanFirst, Term::HumanFirstXAccountability]
    }

    /// Compact label for column headers (`sig_<label>`, `power_<label>`).
    pub fn column_label(&self) -> String {
        match self {
            Term::Intercept                 => "Intercept".into(),
            Term::AiFirst                   => "AI_first".into(),
            Term::HumanFirst                => "Human_first".into(),
            Term::Accountability            => "accountability".into(),
            Term::AiFirstXAccountability    => "AIFirst_Acc".into(),
            Term::HumanFirstXAccountability => "HumanFirst_Acc".into(),
            Term::Team(t)                   => format!("team_{t}"),
        }
    }

    /// Plain-language description used in the text summary.
    pub fn describe(&self) -> String {
        match self {
            Term::Intercept                 => "intercept".into(),
            Term::AiFirst                   => "AI_first main effect".into(),
            Term::HumanFirst                => "Human_first main effect".into(),
            Term::Accountability            => "accountability main effect".into(),
            Term::AiFirstXAccountability    => "AI_first x accountability interaction".into(),
            Term::HumanFirstXAccountability => "Human_first x accountability interaction".into(),
            Term::Team(t)                   => format!("team {t} fixed effect"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Intercept                 => f.write_str("Intercept"),
            Term::AiFirst                   => f.write_str("AI_first"),
            Term::HumanFirst                => f.write_str("Human_first"),
            Term::Accountability            => f.write_str("accountability"),
            Term::AiFirstXAccountability    => f.write_str("AI_first:accountability"),
            Term::HumanFirstXAccountability => f.write_str("Human_first:accountability"),
            Term::Team(t)                   => write!(f, "C(team_id)[T.{t}]"),
        }
    }
}

/// The set of teams a dataset may reference. The first team is the
/// reference category and gets no column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamUniverse {
    teams: Vec<TeamId>,
}

impl TeamUniverse {
    pub fn new(teams: Vec<TeamId>) -> Self {
        Self { teams }
    }

    /// T1..Tn, as the generators emit them.
    pub fn for_design(design: &StudyDesign) -> Self {
        Self::new(team_labels(design.n_teams))
    }

    /// Teams in order of first appearance.
    pub fn from_records(records: &[AgendaRecord]) -> Self {
        let mut teams: Vec<TeamId> = Vec::new();
        for r in records {
            if !teams.contains(&r.team_id) {
                teams.push(r.team_id.clone());
            }
        }
        Self::new(teams)
    }

    pub fn reference(&self) -> Option<&TeamId> {
        self.teams.first()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// Design matrix, outcome vector and the term behind every column.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub terms: Vec<Term>,
    pub x:     DMatrix<f64>,
    pub y:     DVector<f64>,
}

impl DesignMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.x.ncols()
    }

    pub fn column_of(&self, term: &Term) -> Option<usize> {
        self.terms.iter().position(|t| t == term)
    }
}

const FIXED_TERMS: usize = 6;

/// Build the design for one dataset against its team universe.
pub fn build_design(records: &[AgendaRecord], teams: &TeamUniverse) -> StudyResult<DesignMatrix> {
    let mut terms = vec![
        Term::Intercept,
        Term::AiFirst,
        Term::HumanFirst,
        Term::Accountability,
        Term::AiFirstXAccountability,
        Term::HumanFirstXAccountability,
    ];
    let team_columns: HashMap<&str, Option<usize>> = teams
        .teams
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i.checked_sub(1).map(|c| FIXED_TERMS + c)))
        .collect();
    terms.extend(teams.teams.iter().skip(1).cloned().map(Term::Team));

    let k = terms.len();
    let mut data = Vec::with_capacity(records.len() * k);
    let mut y = Vec::with_capacity(records.len());
    for r in records {
        let team_col = *team_columns
            .get(r.team_id.as_str())
            .ok_or_else(|| StudyError::UnknownTeam { team: r.team_id.clone() })?;

        let ai = indicator(r.sequence_condition == SequenceCondition::AiFirst);
        let hf = indicator(r.sequence_condition == SequenceCondition::HumanFirst);
        let acc = indicator(r.accountability);

        let start = data.len();
        data.extend_from_slice(&[1.0, ai, hf, acc, ai * acc, hf * acc]);
        data.resize(start + k, 0.0);
        if let Some(c) = team_col {
            data[start + c] = 1.0;
        }
        y.push(r.junior_talk_share);
    }

    log::debug!("design: rows={} cols={k} teams={}", records.len(), teams.len());

    Ok(DesignMatrix {
        terms,
        x: DMatrix::from_row_slice(records.len(), k, &data),
        y: DVector::from_vec(y),
    })
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(team: &str, condition: SequenceCondition, acc: bool, share: f64) -> AgendaRecord {
        AgendaRecord {
            team_id: team.into(),
            meeting_id: format!("{team}_M1"),
            agenda_item_id: format!("{team}_M1_A1"),
            sequence_condition: condition,
            accountability: acc,
            junior_talk_share: share,
        }
    }

    #[test]
    fn encodes_indicators_interactions_and_team_effects() {
        let records = vec![
            record("T1", SequenceCondition::StatusQuo, false, 0.2),
            record("T2", SequenceCondition::HumanFirst, true, 0.3),
            record("T3", SequenceCondition::AiFirst, true, 0.1),
        ];
        let teams = TeamUniverse::new(vec!["T1".into(), "T2".into(), "T3".into()]);
        let d = build_design(&records, &teams).unwrap();

        assert_eq!(d.n_cols(), 8);
        assert_eq!(d.terms[6], Term::Team("T2".into()));
        let row = |i: usize| d.x.row(i).iter().copied().collect::<Vec<f64>>();
        assert_eq!(row(0), vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(row(1), vec![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
        assert_eq!(row(2), vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(d.y.as_slice(), &[0.2, 0.3, 0.1]);
    }

    #[test]
    fn rejects_team_outside_universe() {
        let records = vec![record("T9", SequenceCondition::StatusQuo, false, 0.2)];
        let teams = TeamUniverse::new(vec!["T1".into()]);
        let err = build_design(&records, &teams).unwrap_err();
        assert!(matches!(err, StudyError::UnknownTeam { team } if team == "T9"));
    }

    #[test]
    fn universe_from_records_keeps_first_appearance_order() {
        let records = vec![
            record("T2", SequenceCondition::StatusQuo, false, 0.2),
            record("T1", SequenceCondition::StatusQuo, false, 0.2),
            record("T2", SequenceCondition::AiFirst, false, 0.2),
        ];
        let teams = TeamUniverse::from_records(&records);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams.reference().map(String::as_str), Some("T2"));
    }

    #[test]
    fn term_names_follow_model_notation() {
        assert_eq!(Term::HumanFirstXAccountability.to_string(), "Human_first:accountability");
        assert_eq!(Term::Team("T4".into()).to_string(), "C(team_id)[T.T4]");
        assert_eq!(Term::HumanFirstXAccountability.column_label(), "HumanFirst_Acc");
    }
}
