//! ExplorationContext: the per-run arena that owns every walker.
//!
//! Walkers hold each other only as `SubEntityId`s. Parent, children and
//! siblings are resolved by lookup here, so the tree can be dropped in one
//! go without any cycle-breaking.
//!
//! Handles are `Arc<Mutex<SubEntity>>`. A handle is only locked for short
//! synchronous sections and never across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::model::Embedding;
use super::subentity::{SubEntity, SubEntityId};

pub type SubEntityHandle = Arc<Mutex<SubEntity>>;

#[derive(Default)]
pub struct ExplorationContext {
    entities: RwLock<HashMap<SubEntityId, SubEntityHandle>>,
    next_id: AtomicU64,
}

impl ExplorationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next walker id. Sequential per run: `se_1`, `se_2`, …
    pub fn next_id(&self) -> SubEntityId {
        SubEntityId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Take ownership of a walker and hand back its shared handle.
    pub fn register(&self, se: SubEntity) -> SubEntityHandle {
        let id = se.id;
        let handle = Arc::new(Mutex::new(se));
        self.entities.write().insert(id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, id: SubEntityId) -> Option<SubEntityHandle> {
        self.entities.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub fn parent_of(&self, id: SubEntityId) -> Option<SubEntityHandle> {
        let parent_id = self.get(id)?.lock().parent_id?;
        self.get(parent_id)
    }

    pub fn children_of(&self, id: SubEntityId) -> Vec<SubEntityHandle> {
        let Some(handle) = self.get(id) else { return Vec::new() };
        let ids = handle.lock().children_ids.clone();
        ids.iter().filter_map(|c| self.get(*c)).collect()
    }

    pub fn siblings_of(&self, id: SubEntityId) -> Vec<SubEntityHandle> {
        let Some(handle) = self.get(id) else { return Vec::new() };
        let ids = handle.lock().sibling_ids.clone();
        ids.iter().filter_map(|s| self.get(*s)).collect()
    }

    /// Crystallization embeddings of the still-running siblings of `id`.
    pub fn active_sibling_embeddings(&self, id: SubEntityId) -> Vec<Embedding> {
        self.siblings_of(id)
            .iter()
            .filter_map(|s| {
                let s = s.lock();
                if s.is_active() { s.crystallization_embedding.clone() } else { None }
            })
            .collect()
    }

    /// Make every id in `ids` a sibling of every other one.
    pub fn link_siblings(&self, ids: &[SubEntityId]) {
        for id in ids {
            if let Some(handle) = self.get(*id) {
                let mut se = handle.lock();
                se.sibling_ids = ids.iter().copied().filter(|other| other != id).collect();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential() {
        let ctx = ExplorationContext::new();
        assert_eq!(ctx.next_id(), SubEntityId(1));
        assert_eq!(ctx.next_id(), SubEntityId(2));
        assert_eq!(SubEntityId(2).to_string(), "se_2");
    }

    #[test]
    fn parent_children_and_siblings_resolve_by_id() {
        let ctx = ExplorationContext::new();
        let root_id = ctx.next_id();
        let root = ctx.register(SubEntity::new(root_id, "ada", "ada"));

        let mut kids = Vec::new();
        for _ in 0..3 {
            let child = root.lock().spawn_child(ctx.next_id());
            kids.push(child.id);
            ctx.register(child);
        }
        root.lock().children_ids = kids.iter().copied().collect();
        ctx.link_siblings(&kids);

        assert_eq!(ctx.len(), 4);
        assert_eq!(ctx.children_of(root_id).len(), 3);
        assert_eq!(ctx.siblings_of(kids[0]).len(), 2);
        let parent = ctx.parent_of(kids[2]).unwrap();
        assert_eq!(parent.lock().id, root_id);
        assert!(ctx.parent_of(root_id).is_none());
    }

    #[test]
    fn finished_siblings_are_not_active() {
        let ctx = ExplorationContext::new();
        let a = ctx.next_id();
        let b = ctx.next_id();
        let mut se_a = SubEntity::new(a, "ada", "x");
        se_a.crystallization_embedding = Some(vec![1.0]);
        let mut se_b = SubEntity::new(b, "ada", "y");
        se_b.crystallization_embedding = Some(vec![0.5]);
        se_b.mark_terminal();
        ctx.register(se_a);
        ctx.register(se_b);
        ctx.link_siblings(&[a, b]);

        assert_eq!(ctx.active_sibling_embeddings(b), vec![vec![1.0]]);
        assert!(ctx.active_sibling_embeddings(a).is_empty());
    }
}
