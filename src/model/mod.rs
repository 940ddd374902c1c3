//! # Knowledge Graph Model
//!
//! Clean DTOs for the emotional knowledge graph. These types cross every
//! boundary: store ↔ scorer ↔ runner ↔ caller.
//!
//! Design rule: this module is pure data plus pure math. No I/O, no
//! state, no async.

pub mod node;
pub mod link;
pub mod value;
pub mod property_map;
pub mod embedding;
pub mod emotion;

pub use node::{Node, NodeId, NodeType};
pub use link::{Link, LinkId};
pub use value::Value;
pub use property_map::{PropertyMap, props};
pub use embedding::{
    Embedding, cosine_similarity, max_cosine_against_set, blend, mean, weighted_blend, normalize,
};
pub use emotion::EmotionVector;
