//! Top-K pooled cosine similarity between two vector sets.
//!
//! Neither side of a match is one vector: an article spans several chunk
//! embeddings and an anchor several component embeddings. Averaging either
//! side into a single centroid washes out partial alignment, so the score is
//! the mean of the K best pairwise cosines — "does any passage of this
//! article align with any facet of this anchor."

/// Reduce two vector sets to one scalar score.
///
/// Computes the full pairwise cosine-similarity matrix between `article`
/// and `anchor` vectors, takes the `k` largest values, and returns their
/// arithmetic mean. When fewer than `k` pairs exist, all pairs are averaged.
///
/// Returns `0.0` when either set is empty or `k` is zero.
#[must_use]
pub fn top_k_pooled_score(article: &[Vec<f32>], anchor: &[Vec<f32>], k: usize) -> f64 {
    if article.is_empty() || anchor.is_empty() || k == 0 {
        return 0.0;
    }

    let mut similarities = Vec::with_capacity(article.len() * anchor.len());
    for a in article {
        for b in anchor {
            similarities.push(cosine(a, b));
        }
    }

    similarities.sort_unstable_by(|x, y| y.total_cmp(x));
    let top = &similarities[..k.min(similarities.len())];

    #[allow(clippy::cast_precision_loss)]
    let denom = top.len() as f64;
    top.iter().sum::<f64>() / denom
}

/// Cosine similarity of two vectors, accumulated in f64.
///
/// Zero-norm or length-mismatched inputs score `0.0` rather than erroring;
/// they represent degenerate embeddings that should never win a match.
fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pair_degenerates_to_exact_cosine() {
        let article = vec![vec![3.0, 4.0]];
        let anchor = vec![vec![4.0, 3.0]];
        let expected = 24.0 / 25.0;
        let score = top_k_pooled_score(&article, &anchor, 5);
        assert!(
            (score - expected).abs() < 1e-12,
            "expected {expected}, got {score}"
        );
    }

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![vec![0.6, 0.8]];
        assert!((top_k_pooled_score(&v, &v, 1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_article_side_scores_zero() {
        let anchor = vec![vec![1.0, 0.0]];
        assert_eq!(top_k_pooled_score(&[], &anchor, 5), 0.0);
    }

    #[test]
    fn empty_anchor_side_scores_zero() {
        let article = vec![vec![1.0, 0.0]];
        assert_eq!(top_k_pooled_score(&article, &[], 5), 0.0);
    }

    #[test]
    fn k_one_takes_best_chunk() {
        // One anchor component, two article chunks: a perfect match and an
        // orthogonal one. K=1 keeps only the perfect pair.
        let anchor = vec![vec![1.0, 0.0]];
        let article = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let score = top_k_pooled_score(&article, &anchor, 1);
        assert!((score - 1.0).abs() < 1e-12, "got {score}");
    }

    #[test]
    fn k_two_averages_best_and_orthogonal() {
        let anchor = vec![vec![1.0, 0.0]];
        let article = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let score = top_k_pooled_score(&article, &anchor, 2);
        assert!((score - 0.5).abs() < 1e-12, "got {score}");
    }

    #[test]
    fn k_larger_than_pair_count_averages_all_pairs() {
        let anchor = vec![vec![1.0, 0.0]];
        let article = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let score = top_k_pooled_score(&article, &anchor, 10);
        assert!((score - 0.5).abs() < 1e-12, "got {score}");
    }

    #[test]
    fn pooling_rewards_best_partial_alignment() {
        // Two anchor facets, two article chunks; only one (chunk, facet)
        // pair aligns. With K=1 that one pair dominates.
        let anchor = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let article = vec![vec![0.0, 0.0, 1.0], vec![0.0, 1.0, 0.0]];
        let score = top_k_pooled_score(&article, &anchor, 1);
        assert!((score - 1.0).abs() < 1e-12, "got {score}");
    }

    #[test]
    fn opposite_vectors_score_negative() {
        let anchor = vec![vec![1.0, 0.0]];
        let article = vec![vec![-1.0, 0.0]];
        let score = top_k_pooled_score(&article, &anchor, 1);
        assert!((score + 1.0).abs() < 1e-12, "got {score}");
    }

    #[test]
    fn zero_norm_vector_contributes_zero() {
        let anchor = vec![vec![0.0, 0.0]];
        let article = vec![vec![1.0, 0.0]];
        assert_eq!(top_k_pooled_score(&article, &anchor, 1), 0.0);
    }

    #[test]
    fn mismatched_dimensions_contribute_zero() {
        let anchor = vec![vec![1.0, 0.0, 0.0]];
        let article = vec![vec![1.0, 0.0]];
        assert_eq!(top_k_pooled_score(&article, &anchor, 1), 0.0);
    }

    #[test]
    fn k_zero_scores_zero() {
        let v = vec![vec![1.0, 0.0]];
        assert_eq!(top_k_pooled_score(&v, &v, 0), 0.0);
    }
}
