use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use super::scoring::ProjectScore;
use crate::Project;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub project: Project,
    pub score: ProjectScore,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.project.id
    }

    pub fn total(&self) -> f64 {
        self.score.total
    }
}

/// Highest scores first; equal scores keep their input order.
pub fn select_top(mut candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
    // `sort_by` is stable, which is what keeps ties in input order.
    candidates.sort_by(|a, b| b.total().partial_cmp(&a.total()).unwrap_or(Ordering::Equal));
    candidates.truncate(limit);
    candidates
}

/// Applies an externally produced ordering to `items`.
///
/// Unknown and repeated ids are ignored; items the ordering does not mention
/// are appended in their current relative order. The output is always a
/// permutation of the input.
pub fn reconcile_order<T, F>(items: Vec<T>, ranked_ids: &[String], id_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let positions: HashMap<String, usize> = slots
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| item.as_ref().map(|item| (id_of(item).to_string(), idx)))
        .collect();

    let mut ordered = Vec::with_capacity(slots.len());
    let mut placed = HashSet::new();

    for id in ranked_ids {
        let Some(&idx) = positions.get(id.as_str()) else {
            continue;
        };
        if !placed.insert(idx) {
            continue;
        }
        if let Some(item) = slots[idx].take() {
            ordered.push(item);
        }
    }

    ordered.extend(slots.into_iter().flatten());
    ordered
}
