//! End-to-end tests for fan-out at moments and fan-in of child findings.

use mind_explore::{
    ExplorationConfig, ExplorationRunner, ExploreRequest, GraphInterface, Link, MemoryGraph, Node,
    NodeId, NodeType, SubEntityState,
};
use pretty_assertions::assert_eq;

/// Actor `ada` at moment `m`, which opens onto three narratives of
/// decreasing alignment with the intention `[1, 0]`.
fn fork() -> MemoryGraph {
    let g = MemoryGraph::new();
    g.add_node(Node::new("ada", NodeType::Actor)).unwrap();
    g.add_node(Node::new("m", NodeType::Moment)).unwrap();
    g.add_node(Node::new("x", NodeType::Narrative).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_node(Node::new("y", NodeType::Narrative).with_embedding(vec![0.8, 0.6])).unwrap();
    g.add_node(Node::new("z", NodeType::Narrative).with_embedding(vec![0.6, 0.8])).unwrap();
    g.add_link(Link::new("m-x", "m", "x")).unwrap();
    g.add_link(Link::new("m-y", "m", "y")).unwrap();
    g.add_link(Link::new("m-z", "m", "z")).unwrap();
    g
}

fn request() -> ExploreRequest {
    ExploreRequest::new("ada", "what happened")
        .with_query_embedding(vec![1.0, 0.0])
        .with_origin_moment("m")
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[tokio::test]
async fn test_moment_with_three_links_spawns_three_children() {
    let g = fork();
    let result = ExplorationRunner::new(g.clone()).explore(request()).await.unwrap();

    assert_eq!(result.children.len(), 3);
    assert_eq!(result.subentity_count(), 4);
    assert_eq!(result.state, SubEntityState::Merging);

    let targets: Vec<&str> = result.children.iter().map(|c| c.position.as_str()).collect();
    assert_eq!(targets, vec!["x", "y", "z"]);
    for child in &result.children {
        assert_eq!(child.depth, 1);
        assert_eq!(child.state, SubEntityState::Merging);
    }

    // Per-key max over the children, nothing crystallized.
    assert_eq!(result.found_narratives.len(), 3);
    assert!(close(result.found_narratives[&NodeId::from("x")], 1.0));
    assert!(close(result.found_narratives[&NodeId::from("y")], 0.8));
    assert!(close(result.found_narratives[&NodeId::from("z")], 0.6));
    assert!(result.crystallized_narratives().is_empty());
    assert_eq!(g.get_all_narratives().await.unwrap().len(), 3);

    // Parent satisfaction is the children's mean.
    let mean = result.children.iter().map(|c| c.satisfaction).sum::<f32>() / 3.0;
    assert!(close(result.satisfaction, mean));
}

#[tokio::test]
async fn test_max_children_caps_the_fan_out() {
    let cfg = ExplorationConfig::default().with_max_children(2);
    let result = ExplorationRunner::new(fork()).with_config(cfg).explore(request()).await.unwrap();

    assert_eq!(result.children.len(), 2);
    let mut found: Vec<&str> = result.found_narratives.keys().map(|k| k.as_str()).collect();
    found.sort();
    assert_eq!(found, vec!["x", "y"]);
}

#[tokio::test]
async fn test_single_qualifying_link_does_not_branch() {
    let g = MemoryGraph::new();
    g.add_node(Node::new("ada", NodeType::Actor)).unwrap();
    g.add_node(Node::new("m", NodeType::Moment)).unwrap();
    g.add_node(Node::new("x", NodeType::Narrative).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_node(Node::new("w", NodeType::Thing).with_embedding(vec![0.0, 1.0])).unwrap();
    g.add_link(Link::new("m-x", "m", "x")).unwrap();
    g.add_link(Link::new("m-w", "m", "w")).unwrap();

    let result = ExplorationRunner::new(g).explore(request()).await.unwrap();

    assert!(result.children.is_empty());
    assert_eq!(result.position, NodeId::from("x"));
    assert!(close(result.found_narratives[&NodeId::from("x")], 1.0));
}

#[tokio::test]
async fn test_landing_on_moment_needs_enough_qualifying_links() {
    // Three raw links out of m, but only two score above threshold.
    let g = MemoryGraph::new();
    g.add_node(Node::new("ada", NodeType::Actor)).unwrap();
    g.add_node(Node::new("m", NodeType::Moment)).unwrap();
    g.add_node(Node::new("x", NodeType::Narrative).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_node(Node::new("y", NodeType::Narrative).with_embedding(vec![0.8, 0.6])).unwrap();
    g.add_node(Node::new("w", NodeType::Thing).with_embedding(vec![0.0, 1.0])).unwrap();
    g.add_link(Link::new("ada-m", "ada", "m").with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_link(Link::new("m-x", "m", "x")).unwrap();
    g.add_link(Link::new("m-y", "m", "y")).unwrap();
    g.add_link(Link::new("m-w", "m", "w")).unwrap();

    let mut cfg = ExplorationConfig::default();
    cfg.min_branch_links = 3;
    let result = ExplorationRunner::new(g)
        .with_config(cfg)
        .explore(ExploreRequest::new("ada", "what happened").with_query_embedding(vec![1.0, 0.0]))
        .await
        .unwrap();

    assert!(result.children.is_empty());
    assert_eq!(result.subentity_count(), 1);
    let hops: Vec<&str> = result.path.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(hops, vec!["ada-m", "m-x"]);
    assert_eq!(result.position, NodeId::from("x"));
}

#[tokio::test]
async fn test_branch_needs_distinct_targets() {
    let g = MemoryGraph::new();
    g.add_node(Node::new("ada", NodeType::Actor)).unwrap();
    g.add_node(Node::new("m", NodeType::Moment)).unwrap();
    g.add_node(Node::new("x", NodeType::Narrative).with_embedding(vec![1.0, 0.0])).unwrap();
    g.add_link(Link::new("m-x-1", "m", "x")).unwrap();
    g.add_link(Link::new("m-x-2", "m", "x")).unwrap();

    let result = ExplorationRunner::new(g).explore(request()).await.unwrap();

    // Two qualifying links but one target: the fork is abandoned and the
    // walker takes the first link itself.
    assert!(result.children.is_empty());
    assert_eq!(result.path.len(), 1);
    assert_eq!(result.path[0].0.as_str(), "m-x-1");
}

#[tokio::test]
async fn test_non_moment_never_branches() {
    let g = fork();
    g.add_node(Node::new("s", NodeType::Space)).unwrap();
    for t in ["x", "y", "z"] {
        g.add_link(Link::new(format!("s-{t}"), "s", t)).unwrap();
    }
    let result = ExplorationRunner::new(g)
        .explore(
            ExploreRequest::new("ada", "what happened")
                .with_query_embedding(vec![1.0, 0.0])
                .with_origin_moment("s"),
        )
        .await
        .unwrap();
    assert!(result.children.is_empty());
    assert_eq!(result.position, NodeId::from("x"));
}

#[tokio::test]
async fn test_children_crystallize_and_parent_scores_them_at_one() {
    // Dead-end things instead of narratives: every child crystallizes.
    let g = MemoryGraph::new();
    g.add_node(Node::new("ada", NodeType::Actor)).unwrap();
    g.add_node(Node::new("m", NodeType::Moment)).unwrap();
    for (t, e) in [("p", [1.0f32, 0.0]), ("q", [0.8, 0.6])] {
        g.add_node(Node::new(t, NodeType::Thing)).unwrap();
        g.add_link(Link::new(format!("m-{t}"), "m", t).with_embedding(e.to_vec())).unwrap();
    }

    let result = ExplorationRunner::new(g.clone()).explore(request()).await.unwrap();

    assert_eq!(result.children.len(), 2);
    let from_children: Vec<NodeId> = result
        .children
        .iter()
        .map(|c| c.crystallized.clone().unwrap())
        .collect();
    for n in &from_children {
        assert_eq!(result.found_narratives[n], 1.0);
        assert!(g.node(n).unwrap().is_narrative());
    }
    // Nothing satisfied the parent either, so it crystallizes at the moment too.
    assert_eq!(result.crystallized_narratives().len(), 3);
    assert_eq!(result.max_depth(), 1);
}
