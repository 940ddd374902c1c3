//! Intention types: *why* an actor is searching.
//!
//! The query says what to find; the intention type decides how the walker
//! weighs what it has seen when it re-derives its crystallization
//! embedding, and how hard it pushes energy into the graph.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionType {
    Summarize,
    Verify,
    FindNext,
    #[default]
    Explore,
    Retrieve,
}

/// Component weights for the crystallization-embedding blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub intention: f32,
    pub position: f32,
    pub found: f32,
    pub path: f32,
}

impl IntentionType {
    /// Lenient parse: unknown names fall back to `Explore`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" => IntentionType::Summarize,
            "verify" => IntentionType::Verify,
            "find_next" | "find-next" | "findnext" => IntentionType::FindNext,
            "retrieve" => IntentionType::Retrieve,
            _ => IntentionType::Explore,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentionType::Summarize => "summarize",
            IntentionType::Verify => "verify",
            IntentionType::FindNext => "find_next",
            IntentionType::Explore => "explore",
            IntentionType::Retrieve => "retrieve",
        }
    }

    pub fn blend_weights(self) -> BlendWeights {
        let (intention, position, found, path) = match self {
            // gather everything found so far
            IntentionType::Summarize => (0.3, 0.2, 0.4, 0.1),
            // stay close to the claim being checked
            IntentionType::Verify => (0.6, 0.2, 0.15, 0.05),
            // follow the road
            IntentionType::FindNext => (0.3, 0.4, 0.1, 0.2),
            IntentionType::Explore => (0.4, 0.3, 0.2, 0.1),
            IntentionType::Retrieve => (0.5, 0.3, 0.15, 0.05),
        };
        BlendWeights { intention, position, found, path }
    }

    /// Scale applied to the root walker's criticality.
    pub fn criticality(self) -> f32 {
        match self {
            IntentionType::Summarize => 0.8,
            IntentionType::Verify => 0.7,
            IntentionType::FindNext => 1.0,
            IntentionType::Explore => 1.0,
            IntentionType::Retrieve => 0.9,
        }
    }
}

impl std::fmt::Display for IntentionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
