//! Crystallization: materialize a new narrative from what a walker has seen.
//!
//! ```text
//!   spawn ──(0.8/0.2)──▶ narrative ──(0.8/0.2)──▶ focus
//! ```
//!
//! The narrative is named `"{intention}: {spawn name}"`, weighted by
//! `criticality × multiplier(CRYSTALLIZING)`, and its content is the chain
//! of node names walked from the spawn node to the focus node. Both links
//! carry the walker's emotions and the mean hierarchy/permanence of the
//! path links.

use std::sync::Arc;

use crate::model::{Embedding, EmotionVector, LinkId, NodeId};
use crate::storage::{GraphInterface, LinkSpec, NarrativeSpec};
use crate::Result;
use super::flow::settle_embedding;
use super::state::SubEntityState;
use super::subentity::SubEntity;

/// Permeability of freshly crystallized links: mostly forward.
pub const CRYSTAL_POLARITY: [f32; 2] = [0.8, 0.2];

const DEFAULT_HIERARCHY: f32 = 0.0;
const DEFAULT_PERMANENCE: f32 = 0.5;

/// Everything crystallization needs from a walker, detached from its lock.
#[derive(Debug, Clone)]
pub struct CrystallizationSeed {
    pub intention: String,
    pub intention_embedding: Option<Embedding>,
    pub crystallization_embedding: Option<Embedding>,
    pub spawn_node: NodeId,
    pub focus_node: NodeId,
    pub path: Vec<(LinkId, NodeId)>,
    pub criticality: f32,
    pub emotions: EmotionVector,
}

impl CrystallizationSeed {
    pub fn from_subentity(se: &SubEntity) -> Self {
        Self {
            intention: se.intention.clone(),
            intention_embedding: se.intention_embedding.clone(),
            crystallization_embedding: se.crystallization_embedding.clone(),
            spawn_node: se.spawn_node.clone(),
            focus_node: se.position.clone(),
            path: se.path().to_vec(),
            criticality: se.criticality,
            emotions: se.emotions,
        }
    }

    /// Path hops taken after leaving the spawn node.
    fn hops_since_spawn(&self) -> &[(LinkId, NodeId)] {
        match self.path.iter().rposition(|(_, n)| *n == self.spawn_node) {
            Some(i) => &self.path[i + 1..],
            None => &self.path,
        }
    }
}

/// What a successful crystallization created.
#[derive(Debug, Clone, PartialEq)]
pub struct Crystallized {
    pub narrative: NodeId,
    pub spawn_link: LinkId,
    pub focus_link: LinkId,
    /// The walker's new crystallization embedding.
    pub embedding: Option<Embedding>,
}

pub struct Crystallizer<G: GraphInterface> {
    graph: Arc<G>,
}

impl<G: GraphInterface> Crystallizer<G> {
    pub fn new(graph: Arc<G>) -> Self {
        Self { graph }
    }

    /// Create the narrative and its two links.
    ///
    /// Returns `Ok(None)` without touching the graph when the spawn or the
    /// focus node no longer exists.
    pub async fn crystallize(&self, seed: &CrystallizationSeed) -> Result<Option<Crystallized>> {
        let Some(spawn) = self.graph.get_node(&seed.spawn_node).await? else {
            return Ok(None);
        };
        let Some(focus) = self.graph.get_node(&seed.focus_node).await? else {
            return Ok(None);
        };

        let (hierarchy, permanence) = self.path_physics(&seed.path).await?;
        let content = self.render_path(&spawn.name, seed.hops_since_spawn()).await?;
        let mass = seed.criticality * SubEntityState::Crystallizing.multiplier();

        let narrative = self
            .graph
            .create_narrative(NarrativeSpec {
                name: format!("{}: {}", seed.intention, spawn.name),
                content,
                weight: mass,
                energy: mass,
                embedding: seed.crystallization_embedding.clone(),
            })
            .await?;

        let link = |a: NodeId, b: NodeId| LinkSpec {
            node_a: a,
            node_b: b,
            polarity: CRYSTAL_POLARITY,
            hierarchy,
            permanence,
            emotions: seed.emotions,
        };
        let spawn_link = self.graph.create_link(link(spawn.id.clone(), narrative.clone())).await?;
        let focus_link = self.graph.create_link(link(narrative.clone(), focus.id.clone())).await?;

        let embedding = settle_embedding(
            seed.intention_embedding.as_deref(),
            focus.embedding.as_deref(),
            seed.crystallization_embedding.as_deref(),
        );

        Ok(Some(Crystallized { narrative, spawn_link, focus_link, embedding }))
    }

    /// Mean hierarchy and permanence over the path links that still exist.
    async fn path_physics(&self, path: &[(LinkId, NodeId)]) -> Result<(f32, f32)> {
        let mut hierarchy = 0.0f32;
        let mut permanence = 0.0f32;
        let mut n = 0usize;
        for (link_id, _) in path {
            if let Some(link) = self.graph.get_link(link_id).await? {
                hierarchy += link.hierarchy;
                permanence += link.permanence;
                n += 1;
            }
        }
        if n == 0 {
            return Ok((DEFAULT_HIERARCHY, DEFAULT_PERMANENCE));
        }
        Ok((hierarchy / n as f32, permanence / n as f32))
    }

    async fn render_path(&self, spawn_name: &str, hops: &[(LinkId, NodeId)]) -> Result<String> {
        let mut names = vec![spawn_name.to_string()];
        for (_, node_id) in hops {
            let name = match self.graph.get_node(node_id).await? {
                Some(node) => node.name,
                None => node_id.to_string(),
            };
            names.push(name);
        }
        Ok(names.join(" → "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Link, Node, NodeType};
    use crate::storage::MemoryGraph;

    fn graph() -> MemoryGraph {
        let g = MemoryGraph::new();
        g.add_node(Node::new("ada", NodeType::Actor).with_name("Ada")).unwrap();
        g.add_node(Node::new("forge", NodeType::Space).with_name("Forge")).unwrap();
        g.add_node(Node::new("anvil", NodeType::Thing).with_name("Anvil").with_embedding(vec![0.0, 1.0]))
            .unwrap();
        g.add_link(Link::new("l1", "ada", "forge").with_hierarchy(0.2).with_permanence(0.4)).unwrap();
        g.add_link(Link::new("l2", "forge", "anvil").with_hierarchy(0.6).with_permanence(0.8)).unwrap();
        g
    }

    fn seed() -> CrystallizationSeed {
        CrystallizationSeed {
            intention: "tools".into(),
            intention_embedding: Some(vec![1.0, 0.0]),
            crystallization_embedding: Some(vec![1.0, 0.0]),
            spawn_node: "ada".into(),
            focus_node: "anvil".into(),
            path: vec![("l1".into(), "forge".into()), ("l2".into(), "anvil".into())],
            criticality: 1.0,
            emotions: EmotionVector::new(0.5, 0.0, 0.0, 0.0),
        }
    }

    #[tokio::test]
    async fn creates_narrative_and_two_links() {
        let g = graph();
        let crystallizer = Crystallizer::new(Arc::new(g.clone()));
        let out = crystallizer.crystallize(&seed()).await.unwrap().unwrap();

        let narrative = g.node(&out.narrative).unwrap();
        assert!(narrative.is_narrative());
        assert_eq!(narrative.name, "tools: Ada");
        assert_eq!(narrative.weight, 2.0);
        assert_eq!(narrative.energy, 2.0);
        assert_eq!(narrative.get("content").and_then(|v| v.as_str()), Some("Ada → Forge → Anvil"));

        let spawn_link = g.link(&out.spawn_link).unwrap();
        assert_eq!(spawn_link.node_a, NodeId::from("ada"));
        assert_eq!(spawn_link.node_b, out.narrative);
        assert_eq!(spawn_link.polarity, CRYSTAL_POLARITY);
        assert!((spawn_link.hierarchy - 0.4).abs() < 1e-6);
        assert!((spawn_link.permanence - 0.6).abs() < 1e-6);
        assert_eq!(spawn_link.emotions.joy_sadness, 0.5);

        let focus_link = g.link(&out.focus_link).unwrap();
        assert_eq!(focus_link.node_a, out.narrative);
        assert_eq!(focus_link.node_b, NodeId::from("anvil"));
    }

    #[tokio::test]
    async fn empty_path_uses_default_physics() {
        let g = graph();
        let crystallizer = Crystallizer::new(Arc::new(g.clone()));
        let mut s = seed();
        s.path.clear();
        s.focus_node = "ada".into();
        let out = crystallizer.crystallize(&s).await.unwrap().unwrap();
        let l = g.link(&out.spawn_link).unwrap();
        assert_eq!(l.hierarchy, 0.0);
        assert_eq!(l.permanence, 0.5);
    }

    #[tokio::test]
    async fn missing_focus_creates_nothing() {
        let g = graph();
        let before = (g.node_count(), g.link_count());
        let crystallizer = Crystallizer::new(Arc::new(g.clone()));
        let mut s = seed();
        s.focus_node = "gone".into();
        assert!(crystallizer.crystallize(&s).await.unwrap().is_none());
        assert_eq!((g.node_count(), g.link_count()), before);
    }

    #[test]
    fn content_starts_at_the_spawn_node() {
        let mut s = seed();
        s.spawn_node = "forge".into();
        let hops: Vec<&str> = s.hops_since_spawn().iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(hops, vec!["anvil"]);
    }
}
