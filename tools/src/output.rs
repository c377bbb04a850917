//! CSV writers for the runner's artifacts.
//!
//! Undefined significance flags and undefined power are written as empty
//! cells, never as 0.

use anyhow::{Context, Result};
use seqstudy_core::{
    agenda::AgendaItem,
    design::Term,
    estimator::FitResult,
    power::{PowerSummary, ReplicateRecord},
    turns::TurnRecord,
};
use std::fs;
use std::path::Path;

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn bit(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}

fn optional_bit(flag: Option<bool>) -> &'static str {
    flag.map(bit).unwrap_or("")
}

fn join(cells: &[String]) -> String {
    let mut line = cells.iter().map(|c| field(c)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

pub fn replicates_csv(replicates: &[ReplicateRecord], tracked: &[Term]) -> String {
    let mut header: Vec<String> = [
        "sim_id", "seed", "n_teams", "n_meetings_per_team", "n_items_per_meeting", "alpha",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(tracked.iter().map(|t| format!("sig_{}", t.column_label())));
    header.push("converged".into());

    let mut out = join(&header);
    for r in replicates {
        let mut row = vec![
            r.replicate_id.to_string(),
            r.seed.to_string(),
            r.n_teams.to_string(),
            r.n_meetings_per_team.to_string(),
            r.n_items_per_meeting.to_string(),
            r.alpha.to_string(),
        ];
        row.extend(tracked.iter().map(|t| optional_bit(r.flag(t)).to_string()));
        row.push(bit(r.converged).to_string());
        out.push_str(&join(&row));
    }
    out
}

/// One row per configuration. All summaries must track the same terms.
pub fn summary_csv(summaries: &[PowerSummary]) -> String {
    let Some(first) = summaries.first() else {
        return String::new();
    };
    let mut header = vec!["n_sims".to_string(), "n_converged".to_string()];
    header.extend(first.powers.iter().map(|p| format!("power_{}", p.term.column_label())));
    header.extend(
        ["alpha", "n_teams", "n_meetings_per_team", "n_items_per_meeting", "degenerate"]
            .iter()
            .map(|s| s.to_string()),
    );

    let mut out = join(&header);
    for s in summaries {
        let mut row = vec![s.n_sims.to_string(), s.n_converged.to_string()];
        row.extend(
            s.powers
                .iter()
                .map(|p| p.power.map(|v| format!("{v:.3}")).unwrap_or_default()),
        );
        row.extend([
            s.alpha.to_string(),
            s.design.n_teams.to_string(),
            s.design.n_meetings_per_team.to_string(),
            s.design.n_items_per_meeting.to_string(),
            bit(s.degenerate).to_string(),
        ]);
        out.push_str(&join(&row));
    }
    out
}

pub fn agenda_csv(items: &[AgendaItem]) -> String {
    let header: Vec<String> = [
        "team_id", "meeting_id", "week", "agenda_item_id", "sequence_condition",
        "accountability", "junior_talk_share", "junior_critical_turns", "override_ai",
        "psych_safety_score",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut out = join(&header);
    for i in items {
        let r = &i.record;
        out.push_str(&join(&[
            r.team_id.clone(),
            r.meeting_id.clone(),
            i.week.to_string(),
            r.agenda_item_id.clone(),
            r.sequence_condition.to_string(),
            bit(r.accountability).to_string(),
            r.junior_talk_share.to_string(),
            i.junior_critical_turns.to_string(),
            bit(i.override_ai).to_string(),
            i.psych_safety_score.to_string(),
        ]));
    }
    out
}

pub fn turns_csv(turns: &[TurnRecord]) -> String {
    let header: Vec<String> = [
        "team_id", "meeting_id", "agenda_item_id", "turn_id", "turn_position", "speaker_role",
        "is_junior", "text", "is_critical", "ai_suggestion_visible", "sequence_condition",
        "accountability",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut out = join(&header);
    for t in turns {
        out.push_str(&join(&[
            t.team_id.clone(),
            t.meeting_id.clone(),
            t.agenda_item_id.clone(),
            t.turn_id.to_string(),
            t.turn_position.to_string(),
            t.speaker_role.to_string(),
            bit(t.is_junior).to_string(),
            t.text.clone(),
            bit(t.is_critical).to_string(),
            bit(t.ai_suggestion_visible).to_string(),
            t.sequence_condition.to_string(),
            bit(t.accountability).to_string(),
        ]));
    }
    out
}

pub fn coefficients_csv(fit: &FitResult) -> String {
    let header: Vec<String> = ["term", "Coef.", "Std.Err.", "t", "P>|t|", "[0.025", "0.975]"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut out = join(&header);
    for c in &fit.coefficients {
        out.push_str(&join(&[
            c.term.to_string(),
            c.estimate.to_string(),
            c.std_error.to_string(),
            c.t_stat.to_string(),
            c.p_value.to_string(),
            c.ci_low.to_string(),
            c.ci_high.to_string(),
        ]));
    }
    out
}
