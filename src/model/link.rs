//! Link (directed, emotionally-valenced edge) in the knowledge graph.

use serde::{Deserialize, Serialize};
use super::{Embedding, EmotionVector, NodeId, PropertyMap, Value};

/// Opaque link identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub String);

impl LinkId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LinkId {
    fn from(s: &str) -> Self { LinkId(s.to_owned()) }
}

impl From<String> for LinkId {
    fn from(s: String) -> Self { LinkId(s) }
}

/// A link from `node_a` to `node_b`.
///
/// Physics floats:
/// - `hierarchy` in [-1, 1]: negative = a contains b, positive = a elaborates b
/// - `polarity`: permeability a→b and b→a, each in [0, 1]
/// - `permanence` in [0, 1]: how settled the relationship is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub embedding: Option<Embedding>,
    pub hierarchy: f32,
    pub polarity: [f32; 2],
    pub permanence: f32,
    pub energy: f32,
    pub weight: f32,
    pub emotions: EmotionVector,
    /// Vocabulary phrase the floats were derived from ("suddenly proves").
    pub nature: Option<String>,
    pub properties: PropertyMap,
}

impl Link {
    pub fn new(id: impl Into<LinkId>, node_a: impl Into<NodeId>, node_b: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            node_a: node_a.into(),
            node_b: node_b.into(),
            embedding: None,
            hierarchy: 0.0,
            polarity: [0.5, 0.5],
            permanence: 0.5,
            energy: 0.0,
            weight: 1.0,
            emotions: EmotionVector::NEUTRAL,
            nature: None,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_embedding(mut self, embedding: impl Into<Embedding>) -> Self {
        self.embedding = Some(embedding.into());
        self
    }

    pub fn with_polarity(mut self, forward: f32, backward: f32) -> Self {
        self.polarity = [forward, backward];
        self
    }

    pub fn with_permanence(mut self, permanence: f32) -> Self {
        self.permanence = permanence;
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: f32) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_emotions(mut self, emotions: EmotionVector) -> Self {
        self.emotions = emotions;
        self
    }

    pub fn with_nature(mut self, nature: impl Into<String>) -> Self {
        self.nature = Some(nature.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The far end of the link when walking from `from`.
    pub fn other_node(&self, from: &NodeId) -> Option<&NodeId> {
        if *from == self.node_a { Some(&self.node_b) }
        else if *from == self.node_b { Some(&self.node_a) }
        else { None }
    }

    /// Permeability in the direction of travel from `from`.
    pub fn polarity_from(&self, from: &NodeId) -> f32 {
        if *from == self.node_b && *from != self.node_a {
            self.polarity[1]
        } else {
            self.polarity[0]
        }
    }
}
