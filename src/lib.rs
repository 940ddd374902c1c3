//! # mind-explore: Exploration Engine for Emotional Knowledge Graphs
//!
//! An actor poses a query against a knowledge graph of actors, spaces,
//! things, moments and narratives. The engine walks the graph from the
//! actor's position as a tree of *SubEntities*: each one scores outgoing
//! links against the actor's intention, forks into parallel children at
//! ambiguous moments, resonates with narratives it lands on, and crystallizes
//! a brand-new narrative when it meets content that is both aligned and novel.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphInterface` is the only contract with the store
//! 2. **Arena, not pointers**: walkers reference parents/children/siblings by
//!    id through a per-run `ExplorationContext`
//! 3. **Explicit state machine**: a closed enum plus a transition table that
//!    tests can inspect without running anything
//! 4. **Crash loudly**: timeouts and store failures surface to the caller;
//!    nothing is reported as partial success
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mind_explore::{ExplorationRunner, ExploreRequest, MemoryGraph, Node, NodeType, Link};
//!
//! # async fn example() -> mind_explore::Result<()> {
//! let graph = MemoryGraph::new();
//! graph.add_node(Node::new("ada", NodeType::Actor))?;
//! graph.add_node(Node::new("origin", NodeType::Narrative).with_embedding(vec![1.0, 0.0]))?;
//! graph.add_link(Link::new("ada-origin", "ada", "origin"))?;
//!
//! let runner = ExplorationRunner::new(graph);
//! let result = runner
//!     .explore(ExploreRequest::new("ada", "where did it start").with_query_embedding(vec![1.0, 0.0]))
//!     .await?;
//!
//! for (narrative, alignment) in result.ranked_narratives() {
//!     println!("{narrative}: {alignment:.2}");
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod explore;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeId, NodeType, Link, LinkId, Value, PropertyMap, Embedding, EmotionVector,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{GraphInterface, MemoryGraph, NarrativeSpec, LinkSpec};

// ============================================================================
// Re-exports: Exploration
// ============================================================================

pub use explore::{
    BlendColorer, ExplorationConfig, ExplorationContext, ExplorationResult, ExplorationRunner,
    ExploreRequest, IntentionType, LinkColorer, SubEntity, SubEntityId, SubEntityState,
    run_exploration,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Exploration timed out after {timeout_s}s: subentity {subentity} at depth {depth}, \
         position {position}, {found} narratives found before timeout"
    )]
    ExplorationTimeout {
        timeout_s: f64,
        subentity: SubEntityId,
        depth: usize,
        position: NodeId,
        found: usize,
    },

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: SubEntityState, to: SubEntityState },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Exploration task failed: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ExplorationTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
