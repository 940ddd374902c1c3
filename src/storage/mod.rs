//! # Graph Interface
//!
//! This is THE contract between the exploration engine and whatever store
//! holds the knowledge graph. The engine never touches persisted state any
//! other way.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryGraph` | `memory` | In-memory for testing/embedding |
//!
//! All operations may fail. Failures propagate to the caller of
//! `explore()` unchanged; the engine never retries them.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::model::*;
use crate::Result;

pub use memory::MemoryGraph;

// ============================================================================
// Creation payloads
// ============================================================================

/// Properties of a narrative node to be created by crystallization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSpec {
    pub name: String,
    pub content: String,
    pub weight: f32,
    pub energy: f32,
    pub embedding: Option<Embedding>,
}

/// Properties of a link to be created by crystallization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub polarity: [f32; 2],
    pub hierarchy: f32,
    pub permanence: f32,
    pub emotions: EmotionVector,
}

// ============================================================================
// GraphInterface Trait
// ============================================================================

/// The store boundary consumed by the exploration engine.
///
/// Outgoing links MUST be returned in link creation order; the scorer
/// relies on it to break ties deterministically.
#[async_trait]
pub trait GraphInterface: Send + Sync + 'static {
    // ========================================================================
    // Node queries
    // ========================================================================

    /// Get a node by ID. Returns None if not found.
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>>;

    /// Embedding of a node, if it has one.
    ///
    /// Default: read it off `get_node`.
    async fn get_node_embedding(&self, id: &NodeId) -> Result<Option<Embedding>> {
        Ok(self.get_node(id).await?.and_then(|n| n.embedding))
    }

    // ========================================================================
    // Link queries
    // ========================================================================

    /// Links whose `node_a` is `id`, in creation order.
    async fn get_outgoing_links(&self, id: &NodeId) -> Result<Vec<Link>>;

    /// Links whose `node_b` is `id`, in creation order.
    async fn get_incoming_links(&self, id: &NodeId) -> Result<Vec<Link>>;

    /// Get a link by ID. Returns None if not found.
    async fn get_link(&self, id: &LinkId) -> Result<Option<Link>>;

    /// Embedding of a link, if it has one.
    ///
    /// Default: read it off `get_link`.
    async fn get_link_embedding(&self, id: &LinkId) -> Result<Option<Embedding>> {
        Ok(self.get_link(id).await?.and_then(|l| l.embedding))
    }

    // ========================================================================
    // Narrative queries
    // ========================================================================

    /// Every narrative node with its embedding (if any).
    async fn get_all_narratives(&self) -> Result<Vec<(NodeId, Option<Embedding>)>>;

    /// Default: type check via `get_node`. Unknown ids are not narratives.
    async fn is_narrative(&self, id: &NodeId) -> Result<bool> {
        Ok(self.get_node(id).await?.is_some_and(|n| n.is_narrative()))
    }

    /// Default: type check via `get_node`. Unknown ids are not moments.
    async fn is_moment(&self, id: &NodeId) -> Result<bool> {
        Ok(self.get_node(id).await?.is_some_and(|n| n.is_moment()))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Replace a stored link (coloring, energy). Last writer wins.
    async fn update_link(&self, id: &LinkId, link: Link) -> Result<()>;

    /// Replace a stored node (energy injection, weight gain). Last writer wins.
    async fn update_node(&self, id: &NodeId, node: Node) -> Result<()>;

    /// Create a narrative node and return its ID.
    async fn create_narrative(&self, spec: NarrativeSpec) -> Result<NodeId>;

    /// Create a link and return its ID. Both endpoints must exist.
    async fn create_link(&self, spec: LinkSpec) -> Result<LinkId>;

    // ========================================================================
    // Capability negotiation
    // ========================================================================

    /// Fixed embedding dimensionality of this store, when it enforces one.
    fn embedding_dimension(&self) -> Option<usize> {
        None
    }
}
