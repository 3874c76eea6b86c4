//! Scene selection policy.

use std::cmp::Ordering;

use crate::error::{AnalysisError, Result};
use crate::scene::SceneCandidate;

/// Preference order: lowest cloud cover, then most recent acquisition, then
/// identifier so the choice is deterministic.
pub fn compare_candidates(a: &SceneCandidate, b: &SceneCandidate) -> Ordering {
    a.cloud_cover
        .total_cmp(&b.cloud_cover)
        .then_with(|| b.acquired.cmp(&a.acquired))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort candidates best first.
pub fn rank_candidates(candidates: &mut [SceneCandidate]) {
    candidates.sort_by(compare_candidates);
}

/// The single best candidate.
pub fn select_best(candidates: &[SceneCandidate]) -> Result<SceneCandidate> {
    candidates
        .iter()
        .min_by(|a, b| compare_candidates(a, b))
        .cloned()
        .ok_or(AnalysisError::NoSuitableScene)
}
