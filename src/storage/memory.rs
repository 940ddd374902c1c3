//! In-memory graph store.
//!
//! This is the reference implementation of `GraphInterface`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No transactions**: every mutation is applied immediately.
//! - **Per-collection locks**: multi-step mutations are NOT atomic.
//!   Concurrent walkers coloring the same link are last-writer-wins.
//! - **No vector index**: `get_all_narratives()` is a full scan.
//!
//! Use this store for:
//! - Testing the exploration engine end to end
//! - Embedding the engine in tools that build a graph on the fly

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use async_trait::async_trait;

use crate::model::*;
use crate::{Error, Result};
use super::{GraphInterface, LinkSpec, NarrativeSpec};

// ============================================================================
// MemoryGraph
// ============================================================================

/// In-memory knowledge graph. Cloning shares the same underlying graph.
#[derive(Clone)]
pub struct MemoryGraph {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    links: RwLock<HashMap<LinkId, Link>>,
    /// node_id → outgoing link IDs, in creation order
    outgoing: RwLock<HashMap<NodeId, Vec<LinkId>>>,
    /// node_id → incoming link IDs, in creation order
    incoming: RwLock<HashMap<NodeId, Vec<LinkId>>>,
    next_narrative_id: AtomicU64,
    next_link_id: AtomicU64,
    dimension: Option<usize>,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A store that rejects embeddings of any other length.
    pub fn with_dimension(dimension: usize) -> Self {
        Self::build(Some(dimension))
    }

    fn build(dimension: Option<usize>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                nodes: RwLock::new(HashMap::new()),
                links: RwLock::new(HashMap::new()),
                outgoing: RwLock::new(HashMap::new()),
                incoming: RwLock::new(HashMap::new()),
                next_narrative_id: AtomicU64::new(1),
                next_link_id: AtomicU64::new(1),
                dimension,
            }),
        }
    }

    fn check_dimension(&self, embedding: Option<&Embedding>) -> Result<()> {
        match (self.inner.dimension, embedding) {
            (Some(expected), Some(e)) if e.len() != expected => {
                Err(Error::DimensionMismatch { expected, got: e.len() })
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Synchronous builders (graph setup outside of an exploration)
    // ========================================================================

    /// Insert or replace a node.
    pub fn add_node(&self, node: Node) -> Result<NodeId> {
        self.check_dimension(node.embedding.as_ref())?;
        let id = node.id.clone();
        self.inner.nodes.write().insert(id.clone(), node);
        Ok(id)
    }

    /// Insert a link. Both endpoints must already exist and the ID must be new.
    pub fn add_link(&self, link: Link) -> Result<LinkId> {
        self.check_dimension(link.embedding.as_ref())?;
        {
            let nodes = self.inner.nodes.read();
            if !nodes.contains_key(&link.node_a) {
                return Err(Error::NotFound(format!("Source node {}", link.node_a)));
            }
            if !nodes.contains_key(&link.node_b) {
                return Err(Error::NotFound(format!("Target node {}", link.node_b)));
            }
        }

        let id = link.id.clone();
        let (a, b) = (link.node_a.clone(), link.node_b.clone());
        {
            let mut links = self.inner.links.write();
            if links.contains_key(&id) {
                return Err(Error::Graph(format!("Link {id} already exists")));
            }
            links.insert(id.clone(), link);
        }
        self.inner.outgoing.write().entry(a).or_default().push(id.clone());
        self.inner.incoming.write().entry(b).or_default().push(id.clone());
        Ok(id)
    }

    /// Snapshot of a node (no async, for assertions).
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.inner.nodes.read().get(id).cloned()
    }

    /// Snapshot of a link (no async, for assertions).
    pub fn link(&self, id: &LinkId) -> Option<Link> {
        self.inner.links.read().get(id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn link_count(&self) -> usize {
        self.inner.links.read().len()
    }

    fn collect_links(&self, index: &RwLock<HashMap<NodeId, Vec<LinkId>>>, id: &NodeId) -> Vec<Link> {
        let ids = index.read().get(id).cloned().unwrap_or_default();
        let links = self.inner.links.read();
        ids.iter().filter_map(|lid| links.get(lid).cloned()).collect()
    }

    fn fresh_id(counter: &AtomicU64, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let candidate = format!("{prefix}_{}", counter.fetch_add(1, Ordering::Relaxed));
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}

// ============================================================================
// GraphInterface impl
// ============================================================================

#[async_trait]
impl GraphInterface for MemoryGraph {
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        Ok(self.inner.nodes.read().get(id).cloned())
    }

    async fn get_outgoing_links(&self, id: &NodeId) -> Result<Vec<Link>> {
        Ok(self.collect_links(&self.inner.outgoing, id))
    }

    async fn get_incoming_links(&self, id: &NodeId) -> Result<Vec<Link>> {
        Ok(self.collect_links(&self.inner.incoming, id))
    }

    async fn get_link(&self, id: &LinkId) -> Result<Option<Link>> {
        Ok(self.inner.links.read().get(id).cloned())
    }

    async fn get_all_narratives(&self) -> Result<Vec<(NodeId, Option<Embedding>)>> {
        let nodes = self.inner.nodes.read();
        let mut out: Vec<_> = nodes
            .values()
            .filter(|n| n.is_narrative())
            .map(|n| (n.id.clone(), n.embedding.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    async fn update_link(&self, id: &LinkId, link: Link) -> Result<()> {
        self.check_dimension(link.embedding.as_ref())?;
        let mut links = self.inner.links.write();
        let slot = links.get_mut(id).ok_or_else(|| Error::NotFound(format!("Link {id}")))?;
        if slot.node_a != link.node_a || slot.node_b != link.node_b {
            return Err(Error::Graph(format!("Link {id}: endpoints cannot change on update")));
        }
        *slot = link;
        Ok(())
    }

    async fn update_node(&self, id: &NodeId, node: Node) -> Result<()> {
        self.check_dimension(node.embedding.as_ref())?;
        let mut nodes = self.inner.nodes.write();
        let slot = nodes.get_mut(id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        *slot = node;
        Ok(())
    }

    async fn create_narrative(&self, spec: NarrativeSpec) -> Result<NodeId> {
        self.check_dimension(spec.embedding.as_ref())?;
        let mut nodes = self.inner.nodes.write();
        let raw = Self::fresh_id(&self.inner.next_narrative_id, "narrative", |c| {
            nodes.contains_key(&NodeId::from(c))
        });
        let id = NodeId(raw);
        let mut node = Node::new(id.clone(), NodeType::Narrative)
            .with_name(spec.name)
            .with_weight(spec.weight)
            .with_property("content", spec.content)
            .with_property("created_at", chrono::Utc::now());
        node.energy = spec.energy;
        node.embedding = spec.embedding;
        nodes.insert(id.clone(), node);
        Ok(id)
    }

    async fn create_link(&self, spec: LinkSpec) -> Result<LinkId> {
        let raw = {
            let links = self.inner.links.read();
            Self::fresh_id(&self.inner.next_link_id, "link", |c| links.contains_key(&LinkId::from(c)))
        };
        let mut link = Link::new(raw, spec.node_a, spec.node_b)
            .with_polarity(spec.polarity[0], spec.polarity[1])
            .with_hierarchy(spec.hierarchy)
            .with_permanence(spec.permanence)
            .with_emotions(spec.emotions);
        link.weight = 1.0;
        self.add_link(link)
    }

    fn embedding_dimension(&self) -> Option<usize> {
        self.inner.dimension
    }
}

// ============================================================================
// Tests
// ============================================================================
