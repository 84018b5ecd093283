//! Vector similarity utilities.

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the vectors differ in length, are empty, or either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Index and similarity of the candidate most similar to `query`.
///
/// Candidates without a vector are skipped. Ties keep the earliest index.
pub fn most_similar<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = Option<&'a [f32]>>,
) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let Some(vector) = candidate else { continue };
        let sim = cosine_similarity(query, vector);
        match best {
            Some((_, best_sim)) if sim <= best_sim => {}
            _ => best = Some((idx, sim)),
        }
    }
    best
}
