//! ExplorationRunner: drives a tree of SubEntities over a `GraphInterface`.
//!
//! One call to `explore()` creates a fresh `ExplorationContext`, registers a
//! root walker at the origin moment (or the actor), and runs its state
//! machine under a single timeout:
//!
//! ```text
//!   SEEKING ──▶ BRANCHING ──(children, joined)──▶ REFLECTING
//!      │  ╲          ▲                               │    ╲
//!      │   ╲──▶ ABSORBING ──▶ CRYSTALLIZING ◀────────╯     ╲
//!      │                          │                        ▼
//!      ╰──────▶ RESONATING ───────┴──────────────────▶ MERGING
//! ```
//!
//! Walker state lives behind `Arc<Mutex<_>>` handles. Every lock is taken
//! for a short synchronous section and released before the next `.await`.
//! Children run as tasks in a `JoinSet`; when the timeout drops the root
//! future, every nested `JoinSet` is dropped with it and in-flight children
//! are aborted.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::model::{cosine_similarity, Embedding, Link, LinkId, NodeId};
use crate::storage::GraphInterface;
use crate::{Error, Result};
use super::config::ExplorationConfig;
use super::context::{ExplorationContext, SubEntityHandle};
use super::crystallize::{CrystallizationSeed, Crystallizer};
use super::flow::{self, BlendColorer, LinkColorer, EMOTION_DRIFT, FORWARD_FLOW};
use super::intention::IntentionType;
use super::result::ExplorationResult;
use super::scoring::{self, Candidate, ScoredLink, ScoringInputs};
use super::state::SubEntityState;
use super::subentity::{SubEntity, SubEntityId};

type StepFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

// ============================================================================
// Request
// ============================================================================

/// Inputs of one `explore()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreRequest {
    pub actor_id: NodeId,
    pub query: String,
    pub query_embedding: Option<Embedding>,
    /// Empty means "same as the query".
    pub intention: String,
    /// Missing means "same as the query embedding".
    pub intention_embedding: Option<Embedding>,
    pub intention_type: IntentionType,
    /// Where the walk starts; the actor node when absent.
    pub origin_moment: Option<NodeId>,
}

impl ExploreRequest {
    pub fn new(actor_id: impl Into<NodeId>, query: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            query: query.into(),
            query_embedding: None,
            intention: String::new(),
            intention_embedding: None,
            intention_type: IntentionType::Explore,
            origin_moment: None,
        }
    }

    pub fn with_query_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.query_embedding = Some(embedding.into());
        self
    }

    pub fn with_intention(mut self, intention: impl Into<String>) -> Self {
        self.intention = intention.into();
        self
    }

    pub fn with_intention_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.intention_embedding = Some(embedding.into());
        self
    }

    pub fn with_intention_type(mut self, intention_type: IntentionType) -> Self {
        self.intention_type = intention_type;
        self
    }

    /// Lenient: unknown names explore.
    pub fn with_intention_type_str(self, intention_type: &str) -> Self {
        self.with_intention_type(IntentionType::parse(intention_type))
    }

    pub fn with_origin_moment(mut self, moment: impl Into<NodeId>) -> Self {
        self.origin_moment = Some(moment.into());
        self
    }
}

// ============================================================================
// Runner
// ============================================================================

pub struct ExplorationRunner<G: GraphInterface> {
    graph: Arc<G>,
    config: Arc<ExplorationConfig>,
    colorer: Arc<dyn LinkColorer>,
}

impl<G: GraphInterface> ExplorationRunner<G> {
    pub fn new(graph: G) -> Self {
        Self::from_arc(Arc::new(graph))
    }

    pub fn from_arc(graph: Arc<G>) -> Self {
        Self {
            graph,
            config: Arc::new(ExplorationConfig::default()),
            colorer: Arc::new(BlendColorer),
        }
    }

    pub fn with_config(mut self, config: ExplorationConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Replace the link-coloring collaborator.
    pub fn with_colorer(mut self, colorer: impl LinkColorer) -> Self {
        self.colorer = Arc::new(colorer);
        self
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<G> {
        &self.graph
    }

    /// Run one exploration to completion.
    ///
    /// Fails with `Error::ExplorationTimeout` when the whole walk does not
    /// finish within `timeout_s`; narratives crystallized before that stay
    /// in the graph but no result is returned. Store errors propagate as-is.
    pub async fn explore(&self, request: ExploreRequest) -> Result<ExplorationResult> {
        self.config.validate()?;
        self.check_dimensions(&request)?;

        let ExploreRequest {
            actor_id,
            query,
            query_embedding,
            intention,
            intention_embedding,
            intention_type,
            origin_moment,
        } = request;
        let start = origin_moment.clone().unwrap_or_else(|| actor_id.clone());

        let ctx = Arc::new(ExplorationContext::new());
        let root = SubEntity::new(ctx.next_id(), actor_id.clone(), start.clone())
            .with_origin(origin_moment)
            .with_query(query, query_embedding)
            .with_intention(intention, intention_embedding, intention_type);
        let root_id = root.id;
        info!(
            actor = %actor_id,
            subentity = %root_id,
            start = %start,
            intention = %root.intention,
            intention_type = %intention_type,
            "Exploration started"
        );
        let handle = ctx.register(root);

        let walker = Walker {
            graph: Arc::clone(&self.graph),
            ctx: Arc::clone(&ctx),
            config: Arc::clone(&self.config),
            colorer: Arc::clone(&self.colorer),
        };
        let budget = self.config.timeout()?;

        match tokio::time::timeout(budget, walker.drive(Arc::clone(&handle))).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                handle.lock().mark_terminal();
                warn!(subentity = %root_id, error = %err, "Exploration failed");
                return Err(err);
            }
            Err(_) => {
                let (depth, position, found) = {
                    let mut se = handle.lock();
                    se.mark_terminal();
                    (se.depth(), se.position.clone(), se.found_narratives().len())
                };
                warn!(
                    subentity = %root_id,
                    timeout_s = self.config.timeout_s,
                    depth,
                    position = %position,
                    found,
                    subentities = ctx.len(),
                    "Exploration timed out"
                );
                return Err(Error::ExplorationTimeout {
                    timeout_s: self.config.timeout_s,
                    subentity: root_id,
                    depth,
                    position,
                    found,
                });
            }
        }

        let result = ExplorationResult::collect(&ctx, root_id)
            .ok_or_else(|| Error::NotFound(format!("Subentity {root_id}")))?;
        info!(
            actor = %result.actor_id,
            subentity = %root_id,
            found = result.found_narratives.len(),
            crystallized = result.crystallized_narratives().len(),
            subentities = result.subentity_count(),
            satisfaction = result.satisfaction,
            duration_s = result.duration_s,
            "Exploration finished"
        );
        Ok(result)
    }

    fn check_dimensions(&self, request: &ExploreRequest) -> Result<()> {
        let Some(expected) = self.graph.embedding_dimension() else {
            return Ok(());
        };
        for e in [&request.query_embedding, &request.intention_embedding].into_iter().flatten() {
            if e.len() != expected {
                return Err(Error::DimensionMismatch { expected, got: e.len() });
            }
        }
        Ok(())
    }
}

/// One-shot exploration where the intention doubles as the query.
pub async fn run_exploration<G: GraphInterface>(
    graph: Arc<G>,
    actor_id: impl Into<NodeId>,
    intention: impl Into<String>,
    intention_embedding: Option<Embedding>,
    origin_moment: Option<NodeId>,
    config: Option<ExplorationConfig>,
) -> Result<ExplorationResult> {
    let runner = ExplorationRunner::from_arc(graph).with_config(config.unwrap_or_default());
    let mut request = ExploreRequest::new(actor_id, intention);
    request.query_embedding = intention_embedding;
    request.origin_moment = origin_moment;
    runner.explore(request).await
}

// ============================================================================
// Walker: the per-run driver shared by every SubEntity task
// ============================================================================

struct Walker<G: GraphInterface> {
    graph: Arc<G>,
    ctx: Arc<ExplorationContext>,
    config: Arc<ExplorationConfig>,
    colorer: Arc<dyn LinkColorer>,
}

impl<G: GraphInterface> Clone for Walker<G> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            ctx: Arc::clone(&self.ctx),
            config: Arc::clone(&self.config),
            colorer: Arc::clone(&self.colorer),
        }
    }
}

/// Outgoing links of a position, scored.
struct PositionScores {
    position: NodeId,
    outgoing: usize,
    ranked: Vec<ScoredLink>,
}

fn path_link_ids(se: &SubEntity) -> Vec<LinkId> {
    se.path().iter().map(|(link, _)| link.clone()).collect()
}

impl<G: GraphInterface> Walker<G> {
    /// Run a walker until it reaches MERGING.
    ///
    /// Boxed so that BRANCHING can spawn `drive` for its children.
    fn drive(self, handle: SubEntityHandle) -> StepFuture {
        Box::pin(async move {
            let mut steps = 0usize;
            loop {
                let (id, state, depth) = {
                    let se = handle.lock();
                    (se.id, se.state(), se.depth())
                };
                if state.is_terminal() {
                    return Ok(());
                }

                steps += 1;
                if steps > self.config.max_steps {
                    warn!(subentity = %id, state = %state, max_steps = self.config.max_steps, "Step ceiling reached");
                    handle.lock().mark_terminal();
                    return Ok(());
                }

                if matches!(state, SubEntityState::Seeking | SubEntityState::Branching)
                    && depth >= self.config.max_depth
                {
                    self.transition(&handle, SubEntityState::Reflecting, "max depth")?;
                    continue;
                }

                match state {
                    SubEntityState::Seeking => self.step_seeking(&handle).await?,
                    SubEntityState::Branching => self.step_branching(&handle).await?,
                    SubEntityState::Absorbing => self.step_absorbing(&handle).await?,
                    SubEntityState::Resonating => self.step_resonating(&handle).await?,
                    SubEntityState::Reflecting => self.step_reflecting(&handle)?,
                    SubEntityState::Crystallizing => self.step_crystallizing(&handle).await?,
                    SubEntityState::Merging => return Ok(()),
                }
            }
        })
    }

    fn transition(&self, handle: &SubEntityHandle, next: SubEntityState, reason: &'static str) -> Result<()> {
        let (id, from) = {
            let mut se = handle.lock();
            let from = se.state();
            se.transition_to(next)?;
            (se.id, from)
        };
        debug!(subentity = %id, from = %from, to = %next, reason, "State transition");
        Ok(())
    }

    // ========================================================================
    // Graph reads
    // ========================================================================

    async fn path_embeddings(&self, path: &[LinkId]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(path.len());
        for link_id in path {
            if let Some(e) = self.graph.get_link_embedding(link_id).await? {
                if !e.is_empty() {
                    out.push(e);
                }
            }
        }
        Ok(out)
    }

    /// Attach target embeddings to links that carry none of their own.
    async fn candidates(&self, links: Vec<Link>, from: &NodeId) -> Result<Vec<Candidate>> {
        let mut out = Vec::with_capacity(links.len());
        for link in links {
            let has_own = link.embedding.as_ref().is_some_and(|e| !e.is_empty());
            let target_embedding = match link.other_node(from) {
                Some(target) if !has_own => self.graph.get_node_embedding(target).await?,
                _ => None,
            };
            out.push(Candidate::new(link, target_embedding));
        }
        Ok(out)
    }

    async fn score_position(&self, handle: &SubEntityHandle) -> Result<PositionScores> {
        let (id, position, intention, path) = {
            let se = handle.lock();
            (se.id, se.position.clone(), se.intention_embedding.clone().unwrap_or_default(), path_link_ids(&se))
        };

        let links = self.graph.get_outgoing_links(&position).await?;
        let outgoing = links.len();
        if links.is_empty() {
            return Ok(PositionScores { position, outgoing, ranked: Vec::new() });
        }

        let candidates = self.candidates(links, &position).await?;
        let path_embs = self.path_embeddings(&path).await?;
        let siblings = self.ctx.active_sibling_embeddings(id);
        let inputs = ScoringInputs { intention: &intention, path: &path_embs, siblings: &siblings };
        let ranked = scoring::score_outgoing_links(&candidates, &position, &inputs, self.config.min_link_score);
        Ok(PositionScores { position, outgoing, ranked })
    }

    /// Re-derive the crystallization embedding from intention, position,
    /// findings and path.
    async fn refresh_embedding(&self, handle: &SubEntityHandle) -> Result<()> {
        let (intention_type, intention, position, found, path) = {
            let se = handle.lock();
            (
                se.intention_type,
                se.intention_embedding.clone(),
                se.position.clone(),
                se.found_narratives().keys().cloned().collect::<Vec<_>>(),
                path_link_ids(&se),
            )
        };

        let position_emb = self.graph.get_node_embedding(&position).await?;
        let mut found_embs = Vec::with_capacity(found.len());
        for narrative in &found {
            if let Some(e) = self.graph.get_node_embedding(narrative).await? {
                found_embs.push(e);
            }
        }
        let path_embs = self.path_embeddings(&path).await?;

        let blended = flow::crystallization_embedding(
            intention_type,
            intention.as_deref(),
            position_emb.as_deref(),
            &found_embs,
            &path_embs,
        );
        if blended.is_some() {
            handle.lock().crystallization_embedding = blended;
        }
        Ok(())
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Take `step`: color and persist the link, move, drift emotions,
    /// inject energy into the target.
    async fn traverse(&self, handle: &SubEntityHandle, step: &ScoredLink) -> Result<()> {
        let (id, intention, criticality) = {
            let se = handle.lock();
            (se.id, se.intention_embedding.clone(), se.criticality)
        };

        let mut link = self
            .graph
            .get_link(&step.link.id)
            .await?
            .unwrap_or_else(|| step.link.clone());
        self.colorer.forward_color(&mut link, intention.as_deref(), FORWARD_FLOW);
        self.graph.update_link(&step.link.id, link.clone()).await?;

        let state = {
            let mut se = handle.lock();
            se.advance(link.id.clone(), step.target.clone());
            se.emotions.drift_toward(&link.emotions, EMOTION_DRIFT);
            se.state()
        };

        let injected = match self.graph.get_node(&step.target).await? {
            Some(mut node) => {
                let injected = flow::inject_node_energy(&mut node, criticality, state);
                self.graph.update_node(&step.target, node).await?;
                injected
            }
            None => 0.0,
        };

        debug!(
            subentity = %id,
            link = %link.id,
            target = %step.target,
            score = step.score,
            semantic = step.components.semantic,
            novelty = step.components.self_novelty,
            divergence = step.components.sibling_divergence,
            injected,
            "Traversed link"
        );
        self.refresh_embedding(handle).await
    }

    /// Decide what to do where the walker just landed.
    async fn classify_position(&self, handle: &SubEntityHandle) -> Result<()> {
        let (position, branched_here) = {
            let se = handle.lock();
            (se.position.clone(), se.branched_at.as_ref() == Some(&se.position))
        };
        let Some(node) = self.graph.get_node(&position).await? else {
            return Ok(());
        };

        if node.is_narrative() {
            return self.transition(handle, SubEntityState::Resonating, "landed on narrative");
        }
        if node.is_moment() && !branched_here {
            let fanout = self.graph.get_outgoing_links(&position).await?.len();
            if fanout >= self.config.min_branch_links {
                return self.transition(handle, SubEntityState::Branching, "landed on branch point");
            }
        }
        if node.embedding.as_ref().is_some_and(|e| !e.is_empty()) {
            return self.transition(handle, SubEntityState::Absorbing, "landed on content");
        }
        Ok(())
    }

    // ========================================================================
    // States
    // ========================================================================

    async fn step_seeking(&self, handle: &SubEntityHandle) -> Result<()> {
        let scores = self.score_position(handle).await?;
        if scores.outgoing == 0 {
            return self.transition(handle, SubEntityState::Reflecting, "no outgoing links");
        }
        let Some(top) = scores.ranked.first() else {
            return self.transition(handle, SubEntityState::Reflecting, "no link above threshold");
        };

        let branched_here = handle.lock().branched_at.as_ref() == Some(&scores.position);
        if !branched_here
            && scoring::should_branch(&scores.ranked, self.config.min_branch_links)
            && self.graph.is_moment(&scores.position).await?
        {
            return self.transition(handle, SubEntityState::Branching, "branch point");
        }

        self.traverse(handle, top).await?;
        self.classify_position(handle).await
    }

    async fn step_branching(&self, handle: &SubEntityHandle) -> Result<()> {
        let scores = self.score_position(handle).await?;
        let picked = scoring::select_branch_candidates(&scores.ranked, self.config.max_children);
        let parent_id = {
            let mut se = handle.lock();
            se.branched_at = Some(scores.position.clone());
            se.id
        };
        if !scoring::should_branch(&scores.ranked, self.config.min_branch_links) {
            return self.transition(handle, SubEntityState::Seeking, "too few qualifying links");
        }
        if picked.len() < 2 {
            return self.transition(handle, SubEntityState::Seeking, "too few branch candidates");
        }

        let spawned: Vec<SubEntity> = {
            let parent = handle.lock();
            picked.iter().map(|_| parent.spawn_child(self.ctx.next_id())).collect()
        };
        let ids: Vec<SubEntityId> = spawned.iter().map(|c| c.id).collect();
        let children: Vec<SubEntityHandle> = spawned.into_iter().map(|c| self.ctx.register(c)).collect();
        handle.lock().children_ids.extend(ids.iter().copied());
        self.ctx.link_siblings(&ids);
        debug!(
            subentity = %parent_id,
            position = %scores.position,
            children = ids.len(),
            "Branching"
        );

        let mut tasks = JoinSet::new();
        for (child, step) in children.iter().cloned().zip(picked) {
            let walker = self.clone();
            tasks.spawn(async move {
                let outcome = walker.run_child(&child, &step).await;
                if outcome.is_err() {
                    child.lock().mark_terminal();
                }
                outcome
            });
        }

        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| Error::Task(e.to_string())).and_then(|r| r);
            match outcome {
                Err(e) if first_err.is_none() => first_err = Some(e),
                _ => {}
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        let merged: Vec<_> = children
            .iter()
            .map(|c| {
                let c = c.lock();
                (c.found_narratives().clone(), c.crystallized().cloned(), c.satisfaction())
            })
            .collect();
        let (found, satisfaction) = {
            let mut parent = handle.lock();
            for (child_found, crystallized, _) in &merged {
                parent.absorb_child(child_found, crystallized.as_ref());
            }
            if !merged.is_empty() {
                let mean = merged.iter().map(|m| m.2).sum::<f32>() / merged.len() as f32;
                parent.set_satisfaction(mean);
            }
            (parent.found_narratives().len(), parent.satisfaction())
        };
        debug!(subentity = %parent_id, found, satisfaction, "Children merged");

        self.refresh_embedding(handle).await?;
        self.transition(handle, SubEntityState::Reflecting, "children merged")
    }

    /// A child's first hop onto its branch target, then its own walk.
    async fn run_child(&self, child: &SubEntityHandle, step: &ScoredLink) -> Result<()> {
        self.traverse(child, step).await?;
        self.classify_position(child).await?;
        self.clone().drive(Arc::clone(child)).await
    }

    async fn step_absorbing(&self, handle: &SubEntityHandle) -> Result<()> {
        let (id, position, intention, path, criticality, crystallized) = {
            let se = handle.lock();
            (
                se.id,
                se.position.clone(),
                se.intention_embedding.clone(),
                path_link_ids(&se),
                se.criticality,
                se.crystallized().is_some(),
            )
        };

        let node = self.graph.get_node(&position).await?;
        let embedding = node.as_ref().and_then(|n| n.embedding.clone()).filter(|e| !e.is_empty());
        let (alignment, novelty) = match (&embedding, &intention) {
            (Some(e), Some(i)) => {
                let path_embs = self.path_embeddings(&path).await?;
                (cosine_similarity(i, e), scoring::self_novelty(e, &path_embs))
            }
            _ => (0.0, 1.0),
        };

        if let Some(mut node) = node {
            flow::inject_node_energy(&mut node, criticality, SubEntityState::Absorbing);
            self.graph.update_node(&position, node).await?;
        }
        debug!(subentity = %id, position = %position, alignment, novelty, "Absorbing");

        if !crystallized && scoring::crystallization_gate(alignment, novelty) {
            self.transition(handle, SubEntityState::Crystallizing, "aligned and novel")
        } else {
            self.transition(handle, SubEntityState::Seeking, "absorbed")
        }
    }

    async fn step_resonating(&self, handle: &SubEntityHandle) -> Result<()> {
        let (id, position, intention, criticality) = {
            let se = handle.lock();
            (se.id, se.position.clone(), se.intention_embedding.clone(), se.criticality)
        };

        let node = self.graph.get_node(&position).await?;
        let alignment = match (node.as_ref().and_then(|n| n.embedding.as_deref()), intention.as_deref()) {
            (Some(e), Some(i)) => cosine_similarity(i, e),
            _ => 0.0,
        };

        if alignment > 0.0 {
            {
                let mut se = handle.lock();
                se.boost_satisfaction(alignment);
                se.record_narrative(position.clone(), alignment);
            }
            if let Some(mut node) = node {
                flow::add_node_weight(&mut node, criticality);
                self.graph.update_node(&position, node).await?;
            }
            self.refresh_embedding(handle).await?;
        }

        let satisfaction = handle.lock().satisfaction();
        debug!(subentity = %id, narrative = %position, alignment, satisfaction, "Resonating");
        if satisfaction >= self.config.satisfaction_threshold {
            self.transition(handle, SubEntityState::Merging, "satisfied")
        } else {
            self.transition(handle, SubEntityState::Seeking, "keep looking")
        }
    }

    fn step_reflecting(&self, handle: &SubEntityHandle) -> Result<()> {
        let (satisfaction, crystallized) = {
            let se = handle.lock();
            (se.satisfaction(), se.crystallized().is_some())
        };
        if satisfaction > 0.5 {
            self.transition(handle, SubEntityState::Merging, "satisfied on reflection")
        } else if crystallized {
            self.transition(handle, SubEntityState::Merging, "already crystallized")
        } else {
            self.transition(handle, SubEntityState::Crystallizing, "unsatisfied")
        }
    }

    async fn step_crystallizing(&self, handle: &SubEntityHandle) -> Result<()> {
        let (id, seed, depth) = {
            let se = handle.lock();
            (se.id, CrystallizationSeed::from_subentity(&se), se.depth())
        };

        let crystallizer = Crystallizer::new(Arc::clone(&self.graph));
        let Some(out) = crystallizer.crystallize(&seed).await? else {
            return self.transition(handle, SubEntityState::Merging, "spawn or focus node missing");
        };

        {
            let mut se = handle.lock();
            se.record_crystallization(out.narrative.clone());
            if out.embedding.is_some() {
                se.crystallization_embedding = out.embedding.clone();
            }
        }
        debug!(
            subentity = %id,
            narrative = %out.narrative,
            spawn = %seed.spawn_node,
            focus = %seed.focus_node,
            "Crystallized narrative"
        );

        if depth > 0 {
            self.transition(handle, SubEntityState::Seeking, "resume after crystallizing")
        } else {
            self.transition(handle, SubEntityState::Merging, "crystallized without moving")
        }
    }
}
