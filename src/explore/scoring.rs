//! Link scoring: rank a node's outgoing links against an intention.
//!
//! Everything here is a pure function of its inputs. The runner gathers
//! embeddings from the store and hands them in.
//!
//! ```text
//! score = semantic
//!       × (0.5 + 0.5 · polarity[direction])
//!       × (0.5 + 0.5 · permanence)
//!       × (0.5 + 0.5 · self_novelty)
//!       × (0.5 + 0.5 · sibling_divergence)
//! ```
//!
//! `semantic` is the clipped cosine between the intention and the link's
//! embedding (the target node's when the link has none). Missing
//! embeddings score 0 and the link is never selected.

use serde::{Deserialize, Serialize};

use crate::model::{cosine_similarity, max_cosine_against_set, Embedding, Link, NodeId};

/// Both thresholds must be exceeded for ABSORBING to crystallize.
pub const CRYSTALLIZE_ALIGNMENT: f32 = 0.7;
pub const CRYSTALLIZE_NOVELTY: f32 = 0.7;

/// An outgoing link plus the target embedding to fall back on.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub link: Link,
    pub target_embedding: Option<Embedding>,
}

impl Candidate {
    pub fn new(link: Link, target_embedding: Option<Embedding>) -> Self {
        Self { link, target_embedding }
    }

    /// The embedding the candidate is judged by.
    pub fn embedding(&self) -> Option<&[f32]> {
        self.link
            .embedding
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(self.target_embedding.as_deref())
    }
}

/// What the walker brings to the scoring of one position.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub intention: &'a [f32],
    pub path: &'a [Embedding],
    pub siblings: &'a [Embedding],
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub semantic: f32,
    pub polarity: f32,
    pub permanence_factor: f32,
    pub self_novelty: f32,
    pub sibling_divergence: f32,
}

#[derive(Debug, Clone)]
pub struct ScoredLink {
    pub link: Link,
    pub target: NodeId,
    pub score: f32,
    pub components: ScoreComponents,
}

/// 1 − max similarity to anything already on the path. 1.0 for an empty path.
pub fn self_novelty(candidate: &[f32], path: &[Embedding]) -> f32 {
    1.0 - max_cosine_against_set(candidate, path.iter().map(|e| e.as_slice())).clamp(0.0, 1.0)
}

/// 1 − max similarity to any active sibling's crystallization embedding.
pub fn sibling_divergence(candidate: &[f32], siblings: &[Embedding]) -> f32 {
    1.0 - max_cosine_against_set(candidate, siblings.iter().map(|e| e.as_slice())).clamp(0.0, 1.0)
}

fn unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Score one candidate walked from `from`. `None` if the link does not touch `from`.
pub fn score_link(candidate: &Candidate, from: &NodeId, inputs: &ScoringInputs<'_>) -> Option<ScoredLink> {
    let target = candidate.link.other_node(from)?.clone();

    let (semantic, novelty, divergence) = match candidate.embedding() {
        Some(emb) => (
            cosine_similarity(inputs.intention, emb).max(0.0),
            self_novelty(emb, inputs.path),
            sibling_divergence(emb, inputs.siblings),
        ),
        None => (0.0, 1.0, 1.0),
    };
    let polarity = unit(candidate.link.polarity_from(from));
    let permanence = unit(candidate.link.permanence);

    let components = ScoreComponents {
        semantic,
        polarity: 0.5 + 0.5 * polarity,
        permanence_factor: 0.5 + 0.5 * permanence,
        self_novelty: novelty,
        sibling_divergence: divergence,
    };
    let score = components.semantic
        * components.polarity
        * components.permanence_factor
        * (0.5 + 0.5 * components.self_novelty)
        * (0.5 + 0.5 * components.sibling_divergence);

    Some(ScoredLink {
        link: candidate.link.clone(),
        target,
        score: unit(score),
        components,
    })
}

/// Score every candidate, drop those at or below `min_score`, and sort
/// descending. The sort is stable, so ties keep the store's creation order.
pub fn score_outgoing_links(
    candidates: &[Candidate],
    from: &NodeId,
    inputs: &ScoringInputs<'_>,
    min_score: f32,
) -> Vec<ScoredLink> {
    let mut scored: Vec<ScoredLink> = candidates
        .iter()
        .filter_map(|c| score_link(c, from, inputs))
        .filter(|s| s.score > min_score)
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Count rule: fork iff at least `min_branch_links` links qualified.
pub fn should_branch(scored: &[ScoredLink], min_branch_links: usize) -> bool {
    scored.len() >= min_branch_links
}

/// Up to `max_children` top links, one per distinct target.
pub fn select_branch_candidates(scored: &[ScoredLink], max_children: usize) -> Vec<ScoredLink> {
    let mut picked: Vec<ScoredLink> = Vec::with_capacity(max_children);
    for s in scored {
        if picked.len() >= max_children {
            break;
        }
        if picked.iter().any(|p| p.target == s.target) {
            continue;
        }
        picked.push(s.clone());
    }
    picked
}

/// ABSORBING gate: strictly above both thresholds.
pub fn crystallization_gate(alignment: f32, novelty: f32) -> bool {
    alignment > CRYSTALLIZE_ALIGNMENT && novelty > CRYSTALLIZE_NOVELTY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, to: &str, emb: Vec<f32>) -> Candidate {
        Candidate::new(Link::new(id, "m", to).with_embedding(emb), None)
    }

    fn inputs<'a>(intention: &'a [f32], path: &'a [Embedding], siblings: &'a [Embedding]) -> ScoringInputs<'a> {
        ScoringInputs { intention, path, siblings }
    }

    #[test]
    fn aligned_link_outscores_orthogonal() {
        let cs = vec![cand("off", "x", vec![0.0, 1.0]), cand("on", "y", vec![1.0, 0.0])];
        let scored = score_outgoing_links(&cs, &"m".into(), &inputs(&[1.0, 0.0], &[], &[]), 0.1);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].link.id.as_str(), "on");
    }

    #[test]
    fn missing_embedding_scores_zero() {
        let c = Candidate::new(Link::new("l", "m", "x"), None);
        let s = score_link(&c, &"m".into(), &inputs(&[1.0, 0.0], &[], &[])).unwrap();
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn target_embedding_is_fallback() {
        let c = Candidate::new(Link::new("l", "m", "x"), Some(vec![1.0, 0.0]));
        let s = score_link(&c, &"m".into(), &inputs(&[1.0, 0.0], &[], &[])).unwrap();
        assert!(s.score > 0.5);
        assert_eq!(s.components.semantic, 1.0);
    }

    #[test]
    fn revisiting_the_path_costs_novelty() {
        let c = cand("l", "x", vec![1.0, 0.0]);
        let fresh = score_link(&c, &"m".into(), &inputs(&[1.0, 0.0], &[], &[])).unwrap();
        let path = vec![vec![1.0, 0.0]];
        let stale = score_link(&c, &"m".into(), &inputs(&[1.0, 0.0], &path, &[])).unwrap();
        assert_eq!(stale.components.self_novelty, 0.0);
        assert!(stale.score < fresh.score);
    }

    #[test]
    fn sibling_overlap_costs_divergence() {
        let c = cand("l", "x", vec![1.0, 0.0]);
        let sibs = vec![vec![1.0, 0.0]];
        let s = score_link(&c, &"m".into(), &inputs(&[1.0, 0.0], &[], &sibs)).unwrap();
        assert_eq!(s.components.sibling_divergence, 0.0);
    }

    #[test]
    fn ties_keep_creation_order() {
        let cs = vec![
            cand("first", "x", vec![1.0, 0.0]),
            cand("second", "y", vec![1.0, 0.0]),
            cand("third", "z", vec![1.0, 0.0]),
        ];
        let scored = score_outgoing_links(&cs, &"m".into(), &inputs(&[1.0, 0.0], &[], &[]), 0.1);
        let ids: Vec<&str> = scored.iter().map(|s| s.link.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn single_qualifying_link_never_branches() {
        let cs = vec![cand("on", "y", vec![1.0, 0.0]), cand("off", "x", vec![0.0, 1.0])];
        let scored = score_outgoing_links(&cs, &"m".into(), &inputs(&[1.0, 0.0], &[], &[]), 0.1);
        assert!(!should_branch(&scored, 2));
    }

    #[test]
    fn branch_candidates_have_distinct_targets() {
        let cs = vec![
            cand("a1", "x", vec![1.0, 0.0]),
            cand("a2", "x", vec![1.0, 0.1]),
            cand("b", "y", vec![0.9, 0.1]),
            cand("c", "z", vec![0.8, 0.2]),
        ];
        let scored = score_outgoing_links(&cs, &"m".into(), &inputs(&[1.0, 0.0], &[], &[]), 0.1);
        let picked = select_branch_candidates(&scored, 3);
        let targets: Vec<&str> = picked.iter().map(|p| p.target.as_str()).collect();
        assert_eq!(targets, vec!["x", "y", "z"]);
        assert_eq!(select_branch_candidates(&scored, 2).len(), 2);
    }

    #[test]
    fn gate_requires_both_thresholds() {
        assert!(crystallization_gate(0.9, 0.9));
        assert!(!crystallization_gate(0.9, 0.5));
        assert!(!crystallization_gate(0.5, 0.9));
        assert!(!crystallization_gate(0.7, 0.7));
    }
}
