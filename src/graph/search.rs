//! Cosine similarity ranking.
//!
//! Brute-force scan over every content node: O(N·D) per query, which is
//! plenty for a single project's source tree.

use std::cmp::Ordering;

use super::node::{Node, SearchResult};

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
/// Sums are accumulated in `f64` and the result is clamped to `[-1, 1]`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = (norm_a * norm_b).sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0.0;
    }

    #[allow(clippy::cast_possible_truncation)]
    let similarity = (dot_product / magnitude).clamp(-1.0, 1.0) as f32;
    similarity
}

/// Descending similarity, then ascending path.
fn by_rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.node.path.cmp(&b.node.path))
}

/// Score every content node against `query` and keep the best `top_k`.
///
/// Path nodes are skipped. The order is fully deterministic for a given
/// input set.
pub fn rank<'a>(
    query: &[f32],
    nodes: impl IntoIterator<Item = &'a Node>,
    top_k: usize,
) -> Vec<SearchResult> {
    let mut scored: Vec<SearchResult> = nodes
        .into_iter()
        .filter(|node| node.is_content())
        .map(|node| SearchResult {
            similarity: cosine_similarity(query, &node.embedding),
            node: node.clone(),
        })
        .collect();

    if scored.len() > top_k && top_k > 0 {
        scored.select_nth_unstable_by(top_k - 1, by_rank);
        scored.truncate(top_k);
    }
    scored.sort_by(by_rank);
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let v = vec![0.3, -1.7, 2.2, 0.0, 5.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_bounds_hold_for_extreme_values() {
        let big = [f32::MAX, f32::MAX];
        let small = [f32::MIN_POSITIVE, f32::MIN_POSITIVE];
        for (a, b) in [(&big, &big), (&big, &small), (&small, &small)] {
            let s = cosine_similarity(a, b);
            assert!((-1.0..=1.0).contains(&s), "{s} out of bounds");
        }
    }

    fn nodes() -> Vec<Node> {
        vec![
            Node::content_node("b.txt", "b", vec![0.0, 1.0]),
            Node::content_node("a.txt", "a", vec![1.0, 0.0]),
            Node::content_node("c.txt", "c", vec![1.0, 1.0]),
            Node::content_node("a2.txt", "a", vec![2.0, 0.0]),
            Node::path_node("dir"),
        ]
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let nodes = nodes();
        let results = rank(&[1.0, 0.0], &nodes, 3);
        let paths: Vec<&str> = results.iter().map(|r| r.node.path.as_str()).collect();
        // a.txt and a2.txt tie at 1.0; path order breaks the tie.
        assert_eq!(paths, ["a.txt", "a2.txt", "c.txt"]);
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_rank_skips_path_nodes() {
        let nodes = nodes();
        let results = rank(&[1.0, 0.0], &nodes, 10);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.node.is_content()));
    }

    #[test]
    fn test_rank_is_deterministic_regardless_of_input_order() {
        let forward = nodes();
        let mut backward = nodes();
        backward.reverse();
        for k in 1..=4 {
            assert_eq!(rank(&[0.5, 0.5], &forward, k), rank(&[0.5, 0.5], &backward, k));
        }
    }
}
