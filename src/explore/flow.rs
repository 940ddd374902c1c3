//! Flow: what a walker leaves behind in the graph, and how it summarizes
//! what it has seen.
//!
//! - links are *colored* as they are traversed (pluggable, see `LinkColorer`)
//! - nodes receive *energy* on every visit and *weight* on resonance
//! - the walker's crystallization embedding is a weighted blend of its
//!   intention, position, findings and path

use crate::model::{blend, mean, weighted_blend, Embedding, Link, Node};
use super::intention::IntentionType;
use super::state::SubEntityState;

/// Fraction of the intention blended into a traversed link.
pub const FORWARD_FLOW: f32 = 0.1;

/// Weight added on resonance per unit of criticality × multiplier.
pub const WEIGHT_GAIN_RATE: f32 = 0.1;

/// How far a walker's emotions drift toward each link it takes.
pub const EMOTION_DRIFT: f32 = 0.2;

// ============================================================================
// Link coloring
// ============================================================================

/// Updates a link's coloring state when a walker traverses it.
///
/// This is the seam for a nature-vocabulary service: an implementation may
/// re-derive hierarchy/permanence/emotions from `link.nature` as well as
/// blending the embedding. The runner takes one at construction.
pub trait LinkColorer: Send + Sync + 'static {
    fn forward_color(&self, link: &mut Link, intention: Option<&[f32]>, flow: f32);
}

/// Default colorer: blend the link's embedding toward the intention and
/// add the flow to its energy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendColorer;

impl LinkColorer for BlendColorer {
    fn forward_color(&self, link: &mut Link, intention: Option<&[f32]>, flow: f32) {
        if let Some(intention) = intention.filter(|i| !i.is_empty()) {
            let current = link.embedding.as_deref().unwrap_or(&[]);
            link.embedding = Some(blend(current, intention, flow));
        }
        link.energy += flow;
    }
}

// ============================================================================
// Node physics
// ============================================================================

/// `energy += criticality × multiplier(state) × weight`. Returns the amount injected.
pub fn inject_node_energy(node: &mut Node, criticality: f32, state: SubEntityState) -> f32 {
    let injected = (criticality * state.multiplier() * node.weight).max(0.0);
    node.energy += injected;
    injected
}

/// Durability gain on resonance: `weight += criticality × multiplier(RESONATING) × rate`.
pub fn add_node_weight(node: &mut Node, criticality: f32) -> f32 {
    let gain = (criticality * SubEntityState::Resonating.multiplier() * WEIGHT_GAIN_RATE).max(0.0);
    node.weight += gain;
    gain
}

// ============================================================================
// Crystallization embedding
// ============================================================================

/// Running summary of what a walker is about, used for sibling divergence
/// and as the embedding of any narrative it crystallizes.
pub fn crystallization_embedding(
    intention_type: IntentionType,
    intention: Option<&[f32]>,
    position: Option<&[f32]>,
    found: &[Embedding],
    path: &[Embedding],
) -> Option<Embedding> {
    let w = intention_type.blend_weights();
    let found_mean = mean(found.iter().map(|e| e.as_slice()));
    let path_mean = mean(path.iter().map(|e| e.as_slice()));
    weighted_blend(&[
        (intention, w.intention),
        (position, w.position),
        (found_mean.as_deref(), w.found),
        (path_mean.as_deref(), w.path),
    ])
}

/// Post-crystallization summary: intention, focus node and the new narrative.
pub fn settle_embedding(
    intention: Option<&[f32]>,
    focus: Option<&[f32]>,
    narrative: Option<&[f32]>,
) -> Option<Embedding> {
    weighted_blend(&[(intention, 0.4), (focus, 0.3), (narrative, 0.3)])
}
