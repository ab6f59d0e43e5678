//! Overlap resolution for candidate spans

use crate::anonymization::models::Entity;

/// Collapse overlapping candidates into a non-overlapping list
///
/// Candidates are ranked by score (descending), then span length
/// (descending), then begin offset and entity type so the result is fully
/// determined by the input. Each candidate is accepted only if it overlaps no
/// previously accepted span. The result is sorted by ascending begin offset.
pub fn resolve_overlaps(mut candidates: Vec<Entity>) -> Vec<Entity> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.begin.cmp(&b.begin))
            .then_with(|| a.entity_type.cmp(&b.entity_type))
    });

    let mut accepted: Vec<Entity> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        if accepted.iter().all(|kept| !kept.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|e| e.begin);
    accepted
}
