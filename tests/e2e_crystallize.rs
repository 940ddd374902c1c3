//! End-to-end tests for the ABSORBING crystallization gate.
//!
//! Coloring pulls every walked link toward the intention, which would make
//! any later content look familiar. These tests plug in a colorer that
//! leaves links untouched so the gate sees the embeddings as written.

use mind_explore::{
    ExplorationRunner, ExploreRequest, GraphInterface, Link, LinkColorer, MemoryGraph, Node,
    NodeId, NodeType,
};
use pretty_assertions::assert_eq;

struct Inert;

impl LinkColorer for Inert {
    fn forward_color(&self, _link: &mut Link, _intention: Option<&[f32]>, _flow: f32) {}
}

fn runner(g: &MemoryGraph) -> ExplorationRunner<MemoryGraph> {
    ExplorationRunner::new(g.clone()).with_colorer(Inert)
}

fn request() -> ExploreRequest {
    ExploreRequest::new("A", "remember").with_query_embedding(vec![1.0, 0.0])
}

/// `A → n` where the link barely points at the intention but `n` matches
/// it exactly: alignment 1.0, novelty 0.8 against the walked link.
fn aligned_and_novel() -> MemoryGraph {
    let g = MemoryGraph::new();
    g.add_node(Node::new("A", NodeType::Actor)).unwrap();
    g.add_node(Node::new("n", NodeType::Thing).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_link(
        Link::new("A-n", "A", "n")
            .with_embedding(vec![0.2, -0.98])
            .with_polarity(1.0, 0.0)
            .with_permanence(1.0),
    )
    .unwrap();
    g
}

#[tokio::test]
async fn test_aligned_and_novel_content_crystallizes() {
    let g = aligned_and_novel();
    let result = runner(&g).explore(request()).await.unwrap();

    let narrative = result.crystallized.clone().unwrap();
    assert_eq!(result.found_narratives[&narrative], 1.0);
    assert_eq!(result.position, NodeId::from("n"));

    let node = g.node(&narrative).unwrap();
    assert!(node.is_narrative());
    assert_eq!(node.name, "remember: A");
    assert!(node.weight > 0.0);
}

#[tokio::test]
async fn test_crystallized_narrative_is_wired_between_spawn_and_focus() {
    let g = aligned_and_novel();
    let narrative = runner(&g).explore(request()).await.unwrap().crystallized.unwrap();

    let incoming = g.get_incoming_links(&narrative).await.unwrap();
    let outgoing = g.get_outgoing_links(&narrative).await.unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(outgoing.len(), 1);
    assert_eq!(incoming[0].node_a, NodeId::from("A"));
    assert_eq!(outgoing[0].node_b, NodeId::from("n"));

    for link in incoming.iter().chain(&outgoing) {
        assert_eq!(link.polarity, [0.8, 0.2]);
        // Mean of the single walked link.
        assert_eq!(link.permanence, 1.0);
        assert_eq!(link.hierarchy, 0.0);
    }
}

#[tokio::test]
async fn test_aligned_but_familiar_content_does_not_crystallize() {
    // alignment 0.9, novelty 0.5: the gate stays shut and the walker moves
    // on to a narrative that satisfies it.
    let g = MemoryGraph::new();
    g.add_node(Node::new("A", NodeType::Actor)).unwrap();
    g.add_node(Node::new("n", NodeType::Thing).with_embedding(vec![0.9, 0.435_889_9])).unwrap();
    g.add_node(Node::new("N", NodeType::Narrative).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_link(
        Link::new("A-n", "A", "n")
            .with_embedding(vec![0.827_52, -0.561_49])
            .with_polarity(1.0, 0.0)
            .with_permanence(1.0),
    )
    .unwrap();
    g.add_link(Link::new("n-N", "n", "N")).unwrap();

    let result = runner(&g).explore(request()).await.unwrap();

    assert!(result.crystallized.is_none());
    assert_eq!(result.position, NodeId::from("N"));
    assert_eq!(result.found_narratives.len(), 1);
    assert!((result.found_narratives[&NodeId::from("N")] - 1.0).abs() < 1e-5);
    assert_eq!(g.get_all_narratives().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_second_novel_stop_does_not_crystallize_again() {
    let g = aligned_and_novel();
    g.add_node(Node::new("m", NodeType::Thing).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_link(
        Link::new("n-m", "n", "m")
            .with_embedding(vec![0.2, 0.98])
            .with_polarity(1.0, 0.0)
            .with_permanence(1.0),
    )
    .unwrap();

    let result = runner(&g).explore(request()).await.unwrap();

    assert_eq!(result.position, NodeId::from("m"));
    assert_eq!(result.path.len(), 2);
    assert!(result.crystallized.is_some());
    assert_eq!(g.get_all_narratives().await.unwrap().len(), 1);
}
