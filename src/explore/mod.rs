//! # Exploration Engine
//!
//! ```text
//! ExploreRequest ──▶ ExplorationRunner ──▶ ExplorationResult
//!                         │
//!                         ├── ExplorationContext   (arena: id → SubEntity)
//!                         ├── SubEntity            (one walker, state machine)
//!                         ├── scoring              (pure link ranking)
//!                         ├── flow                 (coloring, energy, embeddings)
//!                         └── Crystallizer         (new narratives)
//! ```
//!
//! The runner is the only component that talks to the `GraphInterface`
//! during a walk; scoring and flow are pure.

pub mod config;
pub mod context;
pub mod crystallize;
pub mod flow;
pub mod intention;
pub mod result;
pub mod runner;
pub mod scoring;
pub mod state;
pub mod subentity;

pub use config::ExplorationConfig;
pub use context::{ExplorationContext, SubEntityHandle};
pub use crystallize::{CrystallizationSeed, Crystallized, Crystallizer};
pub use flow::{BlendColorer, LinkColorer, FORWARD_FLOW};
pub use intention::{BlendWeights, IntentionType};
pub use result::ExplorationResult;
pub use runner::{run_exploration, ExplorationRunner, ExploreRequest};
pub use scoring::{Candidate, ScoreComponents, ScoredLink, ScoringInputs};
pub use state::{can_transition, SubEntityState, STATE_MULTIPLIER, TRANSITIONS};
pub use subentity::{merge_max, FoundNarratives, SubEntity, SubEntityId};
