//! SubEntity: one actor's-eye-view walker.
//!
//! Fields that carry invariants (state, path/depth, findings, the
//! crystallized id) are private and only change through methods that
//! uphold them:
//!
//! - `found_narratives` values never decrease and stay in [0, 1]
//! - `depth == path.len()`; each `advance` adds exactly one hop
//! - `crystallized` is set at most once
//! - state only moves along edges of the transition table

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{Embedding, EmotionVector, LinkId, NodeId};
use crate::{Error, Result};
use super::intention::IntentionType;
use super::state::{can_transition, SubEntityState};

/// Narrative id → best alignment seen for it.
pub type FoundNarratives = HashMap<NodeId, f32>;

/// Run-scoped walker identifier, issued by `ExplorationContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubEntityId(pub u64);

impl std::fmt::Display for SubEntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "se_{}", self.0)
    }
}

/// Per-key maximum merge. Keys missing from `into` are inserted.
///
/// Commutative and associative, so the merged map does not depend on the
/// order in which children finish.
pub fn merge_max(into: &mut FoundNarratives, from: &FoundNarratives) {
    for (id, alignment) in from {
        let a = clamp_unit(*alignment);
        into.entry(id.clone())
            .and_modify(|v| *v = v.max(a))
            .or_insert(a);
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone)]
pub struct SubEntity {
    pub id: SubEntityId,
    pub actor_id: NodeId,
    pub origin_moment: Option<NodeId>,
    state: SubEntityState,
    pub position: NodeId,
    /// Where this walker started or branched from; crystallized narratives hang off it.
    pub spawn_node: NodeId,
    path: Vec<(LinkId, NodeId)>,
    pub query: String,
    pub query_embedding: Option<Embedding>,
    pub intention: String,
    pub intention_embedding: Option<Embedding>,
    pub intention_type: IntentionType,
    pub crystallization_embedding: Option<Embedding>,
    found_narratives: FoundNarratives,
    crystallized: Option<NodeId>,
    satisfaction: f32,
    pub criticality: f32,
    pub emotions: EmotionVector,
    pub parent_id: Option<SubEntityId>,
    pub sibling_ids: SmallVec<[SubEntityId; 4]>,
    pub children_ids: SmallVec<[SubEntityId; 4]>,
    /// Last position a fork was attempted from; never forks there again.
    pub(crate) branched_at: Option<NodeId>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubEntity {
    /// A root walker standing on `start`.
    pub fn new(id: SubEntityId, actor_id: impl Into<NodeId>, start: impl Into<NodeId>) -> Self {
        let start = start.into();
        Self {
            id,
            actor_id: actor_id.into(),
            origin_moment: None,
            state: SubEntityState::Seeking,
            position: start.clone(),
            spawn_node: start,
            path: Vec::new(),
            query: String::new(),
            query_embedding: None,
            intention: String::new(),
            intention_embedding: None,
            intention_type: IntentionType::Explore,
            crystallization_embedding: None,
            found_narratives: FoundNarratives::new(),
            crystallized: None,
            satisfaction: 0.0,
            criticality: 1.0,
            emotions: EmotionVector::NEUTRAL,
            parent_id: None,
            sibling_ids: SmallVec::new(),
            children_ids: SmallVec::new(),
            branched_at: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_origin(mut self, moment: Option<NodeId>) -> Self {
        self.origin_moment = moment;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>, embedding: Option<Embedding>) -> Self {
        self.query = query.into();
        self.query_embedding = embedding;
        self
    }

    /// Sets the intention; empty text / missing embedding fall back to the query.
    pub fn with_intention(
        mut self,
        intention: impl Into<String>,
        embedding: Option<Embedding>,
        intention_type: IntentionType,
    ) -> Self {
        let intention = intention.into();
        self.intention = if intention.trim().is_empty() { self.query.clone() } else { intention };
        self.intention_embedding = embedding.or_else(|| self.query_embedding.clone());
        self.intention_type = intention_type;
        self.criticality = intention_type.criticality();
        self.crystallization_embedding = self.intention_embedding.clone();
        self
    }

    /// A child standing where this walker stands, sharing its intent.
    ///
    /// Path and depth are inherited; the runner moves the child onto its
    /// branch target right after creation.
    pub fn spawn_child(&self, id: SubEntityId) -> SubEntity {
        SubEntity {
            id,
            actor_id: self.actor_id.clone(),
            origin_moment: self.origin_moment.clone(),
            state: SubEntityState::Seeking,
            position: self.position.clone(),
            spawn_node: self.position.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            query_embedding: self.query_embedding.clone(),
            intention: self.intention.clone(),
            intention_embedding: self.intention_embedding.clone(),
            intention_type: self.intention_type,
            crystallization_embedding: self.crystallization_embedding.clone(),
            found_narratives: FoundNarratives::new(),
            crystallized: None,
            satisfaction: 0.0,
            criticality: self.criticality,
            emotions: self.emotions,
            parent_id: Some(self.id),
            sibling_ids: SmallVec::new(),
            children_ids: SmallVec::new(),
            branched_at: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn state(&self) -> SubEntityState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Move along a declared edge of the transition table.
    pub fn transition_to(&mut self, next: SubEntityState) -> Result<()> {
        if !can_transition(self.state, next) {
            return Err(Error::InvalidTransition { from: self.state, to: next });
        }
        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Force the terminal state regardless of the table (timeout / failure).
    pub fn mark_terminal(&mut self) {
        self.state = SubEntityState::Merging;
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    // ========================================================================
    // Path
    // ========================================================================

    pub fn path(&self) -> &[(LinkId, NodeId)] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// One hop along `link` onto `target`.
    pub(crate) fn advance(&mut self, link: LinkId, target: NodeId) {
        self.path.push((link, target.clone()));
        self.position = target;
    }

    // ========================================================================
    // Findings
    // ========================================================================

    pub fn found_narratives(&self) -> &FoundNarratives {
        &self.found_narratives
    }

    pub fn crystallized(&self) -> Option<&NodeId> {
        self.crystallized.as_ref()
    }

    pub fn satisfaction(&self) -> f32 {
        self.satisfaction
    }

    /// Keep the best alignment seen for `narrative`.
    pub fn record_narrative(&mut self, narrative: NodeId, alignment: f32) {
        let a = clamp_unit(alignment);
        self.found_narratives
            .entry(narrative)
            .and_modify(|v| *v = v.max(a))
            .or_insert(a);
    }

    /// Sum of all recorded alignments.
    pub fn total_alignment(&self) -> f32 {
        self.found_narratives.values().sum()
    }

    /// Set the crystallized narrative. Returns false (and changes nothing)
    /// if one was already recorded.
    pub fn record_crystallization(&mut self, narrative: NodeId) -> bool {
        if self.crystallized.is_some() {
            return false;
        }
        self.found_narratives.insert(narrative.clone(), 1.0);
        self.crystallized = Some(narrative);
        true
    }

    /// Fold one finished child into this walker: per-key max, with the
    /// child's crystallized narrative forced to 1.0.
    pub fn absorb_child(&mut self, child_found: &FoundNarratives, child_crystallized: Option<&NodeId>) {
        merge_max(&mut self.found_narratives, child_found);
        if let Some(n) = child_crystallized {
            self.found_narratives.insert(n.clone(), 1.0);
        }
    }

    pub fn set_satisfaction(&mut self, satisfaction: f32) {
        self.satisfaction = clamp_unit(satisfaction);
    }

    /// Diminishing-returns boost: `alignment / (Σ found + 1)`, capped at 1.0.
    ///
    /// Call before recording the narrative the boost is for.
    pub fn boost_satisfaction(&mut self, alignment: f32) {
        let boost = alignment / (self.total_alignment() + 1.0);
        self.set_satisfaction(self.satisfaction + boost);
    }
}
