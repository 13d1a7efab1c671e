use std::{cmp::Ordering, collections::HashSet, hash::Hash};

use crate::{HistoryEntry, UserProfile};

const INTEREST_WEIGHT: f64 = 0.6;
const CATEGORY_WEIGHT: f64 = 0.4;

/// Jaccard similarity `|A∩B| / |A∪B|`, 0.0 when both sets are empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn tag_set(tags: &[String]) -> HashSet<&str> {
    tags.iter().map(String::as_str).collect()
}

/// Weighted similarity of two profiles' interests and preferred categories.
pub fn profile_similarity(a: &UserProfile, b: &UserProfile) -> f64 {
    let interests = jaccard(&tag_set(&a.interests), &tag_set(&b.interests));
    let categories = jaccard(
        &tag_set(&a.preferences.preferred_categories),
        &tag_set(&b.preferences.preferred_categories),
    );
    interests * INTEREST_WEIGHT + categories * CATEGORY_WEIGHT
}

/// Profiles most similar to `target_user_id`, best first.
///
/// The target itself is never returned. Returns an empty list when the
/// target is not among `profiles`.
pub fn similar_users<'a>(
    target_user_id: &str,
    profiles: &'a [UserProfile],
    limit: usize,
) -> Vec<&'a UserProfile> {
    let Some(target) = profiles.iter().find(|p| p.id == target_user_id) else {
        return Vec::new();
    };

    let mut scored: Vec<(&UserProfile, f64)> = profiles
        .iter()
        .filter(|p| p.id != target_user_id)
        .map(|p| (p, profile_similarity(target, p)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.into_iter().take(limit).map(|(p, _)| p).collect()
}

/// Project or event ids both users participated in, in `a`'s order.
pub fn common_projects(a: &[HistoryEntry], b: &[HistoryEntry]) -> Vec<String> {
    let theirs: HashSet<&str> = b
        .iter()
        .filter(|entry| entry.is_participation())
        .map(|entry| entry.id.as_str())
        .collect();

    let mut seen = HashSet::new();
    a.iter()
        .filter(|entry| entry.is_participation())
        .map(|entry| entry.id.as_str())
        .filter(|id| theirs.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
