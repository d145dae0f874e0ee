use crate::data::Segment;
use crate::engine::MonthlyBacktestRow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

//best method for one (segment, window) or, after best_per_segment, one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCandidate {
    pub segment: Segment,
    pub window_days: usize,
    pub method: String,
    pub mean_wmape: f64,
    //number of pivot months with a defined score
    pub months: usize,
}

//picks the method with the lowest mean wmape for every (segment, window)
//
//absent scores are left out of the mean. candidates are sorted ascending with
//a stable sort, so on equal means the method seen first wins. a group where
//no method ever had a defined score yields nothing.
pub fn select_best(rows: &[MonthlyBacktestRow]) -> Vec<PolicyCandidate> {
    let mut groups: IndexMap<(Segment, usize), IndexMap<String, Vec<f64>>> = IndexMap::new();

    for row in rows {
        let methods = groups
            .entry((row.segment.clone(), row.window_days))
            .or_default();
        for (method, score) in &row.scores {
            let values = methods.entry(method.clone()).or_default();
            if let Some(score) = score {
                values.push(*score);
            }
        }
    }

    let mut selected = Vec::with_capacity(groups.len());
    for ((segment, window_days), methods) in groups {
        let mut candidates: Vec<PolicyCandidate> = methods
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(method, values)| PolicyCandidate {
                segment: segment.clone(),
                window_days,
                method,
                mean_wmape: values.as_slice().mean(),
                months: values.len(),
            })
            .collect();

        sort_ascending(&mut candidates);

        match candidates.into_iter().next() {
            Some(best) => selected.push(best),
            None => debug!(%segment, window = window_days, "no defined scores, no policy"),
        }
    }

    selected
}

//reduces per-window candidates to one per segment, with the same tie rule
pub fn best_per_segment(candidates: &[PolicyCandidate]) -> Vec<PolicyCandidate> {
    let mut by_segment: IndexMap<&Segment, Vec<PolicyCandidate>> = IndexMap::new();
    for candidate in candidates {
        by_segment
            .entry(&candidate.segment)
            .or_default()
            .push(candidate.clone());
    }

    by_segment
        .into_values()
        .filter_map(|mut group| {
            sort_ascending(&mut group);
            group.into_iter().next()
        })
        .collect()
}

//sort_by is stable
fn sort_ascending(candidates: &mut [PolicyCandidate]) {
    candidates.sort_by(|a, b| a.mean_wmape.total_cmp(&b.mean_wmape));
}
