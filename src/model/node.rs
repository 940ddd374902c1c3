//! Node in the knowledge graph.

use serde::{Deserialize, Serialize};
use super::{Embedding, PropertyMap, Value};

/// Opaque node identifier, assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self { NodeId(s.to_owned()) }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self { NodeId(s) }
}

/// The five node families of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Actor,
    Space,
    Thing,
    Narrative,
    Moment,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Actor => write!(f, "actor"),
            NodeType::Space => write!(f, "space"),
            NodeType::Thing => write!(f, "thing"),
            NodeType::Narrative => write!(f, "narrative"),
            NodeType::Moment => write!(f, "moment"),
        }
    }
}

/// A node: typed, optionally embedded, with physics scalars.
///
/// `weight` is durability (grows when a walker resonates here), `energy`
/// is transient activation (injected on every visit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub name: String,
    pub embedding: Option<Embedding>,
    pub weight: f32,
    pub energy: f32,
    pub properties: PropertyMap,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: NodeType) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            node_type,
            embedding: None,
            weight: 1.0,
            energy: 0.0,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.embedding = Some(embedding.into());
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_narrative(&self) -> bool {
        self.node_type == NodeType::Narrative
    }

    pub fn is_moment(&self) -> bool {
        self.node_type == NodeType::Moment
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
