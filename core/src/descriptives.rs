//! Group means by sequencing condition and accountability.

use crate::{agenda::AgendaItem, types::SequenceCondition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSummary {
    pub sequence_condition:         SequenceCondition,
    pub accountability:             bool,
    pub n_items:                    usize,
    pub mean_junior_talk_share:     f64,
    pub mean_junior_critical_turns: f64,
    pub override_rate:              f64,
    pub mean_psych_safety:          f64,
}

#[derive(Default)]
struct Sums {
    n:         usize,
    share:     f64,
    crit:      f64,
    overrides: f64,
    safety:    f64,
}

/// One row per observed (condition, accountability) cell, ordered by label.
pub fn describe_by_condition(items: &[AgendaItem]) -> Vec<CellSummary> {
    let mut cells: BTreeMap<(&'static str, bool), (SequenceCondition, Sums)> = BTreeMap::new();
    for item in items {
        let r = &item.record;
        let (_, sums) = cells
            .entry((r.sequence_condition.label(), r.accountability))
            .or_insert_with(|| (r.sequence_condition, Sums::default()));
        sums.n += 1;
        sums.share += r.junior_talk_share;
        sums.crit += item.junior_critical_turns as f64;
        sums.overrides += if item.override_ai { 1.0 } else { 0.0 };
        sums.safety += item.psych_safety_score;
    }

    cells
        .into_iter()
        .map(|((_, accountability), (condition, s))| {
            let n = s.n as f64;
            CellSummary {
                sequence_condition: condition,
                accountability,
                n_items: s.n,
                mean_junior_talk_share: s.share / n,
                mean_junior_critical_turns: s.crit / n,
                override_rate: s.overrides / n,
                mean_psych_safety: s.safety / n,
            }
        })
        .collect()
}
