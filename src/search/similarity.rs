use crate::models::DocumentId;

/// Rank `scored` descending, keep the first `top_k`, then drop anything at or
/// below `min_score`.
///
/// Truncation happens before filtering, so fewer than `top_k` results may
/// come back even when lower-ranked entries clear the threshold. Ties keep
/// input order, which callers supply in ascending id order.
pub fn rank_then_filter(
    scored: impl IntoIterator<Item = (DocumentId, f32)>,
    top_k: usize,
    min_score: f32,
) -> Vec<(DocumentId, f32)> {
    let mut scored: Vec<(DocumentId, f32)> = scored.into_iter().collect();

    // Stable sort: equal scores stay in input order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored.retain(|(_, score)| *score > min_score);
    scored
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
