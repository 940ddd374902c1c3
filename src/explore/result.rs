//! Immutable snapshot of a finished walker tree.

use serde::Serialize;

use crate::model::{LinkId, NodeId};
use super::context::ExplorationContext;
use super::state::SubEntityState;
use super::subentity::{FoundNarratives, SubEntityId};

/// What one walker ended with, plus its children's results.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationResult {
    pub subentity_id: SubEntityId,
    pub actor_id: NodeId,
    pub origin_moment: Option<NodeId>,
    pub state: SubEntityState,
    pub position: NodeId,
    pub found_narratives: FoundNarratives,
    pub crystallized: Option<NodeId>,
    pub satisfaction: f32,
    pub depth: usize,
    pub path: Vec<(LinkId, NodeId)>,
    /// Wall-clock seconds from creation to completion.
    pub duration_s: f64,
    pub children: Vec<ExplorationResult>,
}

impl ExplorationResult {
    /// Snapshot `id` and, recursively, its children in creation order.
    pub fn collect(ctx: &ExplorationContext, id: SubEntityId) -> Option<Self> {
        let handle = ctx.get(id)?;
        let (mut result, child_ids) = {
            let se = handle.lock();
            let end = se.completed_at.unwrap_or_else(chrono::Utc::now);
            let duration_s = (end - se.created_at).num_microseconds().unwrap_or(0) as f64 / 1e6;
            let result = ExplorationResult {
                subentity_id: se.id,
                actor_id: se.actor_id.clone(),
                origin_moment: se.origin_moment.clone(),
                state: se.state(),
                position: se.position.clone(),
                found_narratives: se.found_narratives().clone(),
                crystallized: se.crystallized().cloned(),
                satisfaction: se.satisfaction(),
                depth: se.depth(),
                path: se.path().to_vec(),
                duration_s: duration_s.max(0.0),
                children: Vec::new(),
            };
            (result, se.children_ids.clone())
        };
        result.children = child_ids.iter().filter_map(|c| Self::collect(ctx, *c)).collect();
        Some(result)
    }

    /// Found narratives, best alignment first; ties by id.
    pub fn ranked_narratives(&self) -> Vec<(NodeId, f32)> {
        let mut ranked: Vec<(NodeId, f32)> =
            self.found_narratives.iter().map(|(id, a)| (id.clone(), *a)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// This walker plus every descendant.
    pub fn subentity_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.subentity_count()).sum::<usize>()
    }

    /// Deepest depth reached anywhere in the tree.
    pub fn max_depth(&self) -> usize {
        self.children.iter().map(|c| c.max_depth()).fold(self.depth, usize::max)
    }

    /// Every narrative crystallized in the tree, parent before children.
    pub fn crystallized_narratives(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.crystallized.iter().cloned().collect();
        for child in &self.children {
            out.extend(child.crystallized_narratives());
        }
        out
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
