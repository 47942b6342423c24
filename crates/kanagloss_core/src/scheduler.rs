//! Subtree roots collected from mutation notifications until the next scan.

use indexmap::IndexSet;

use crate::dom::{MutationRecord, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    roots: IndexSet<NodeId>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, root: NodeId) {
        self.roots.insert(root);
    }

    pub fn absorb(&mut self, records: &[MutationRecord]) {
        for record in records {
            match *record {
                MutationRecord::ChildAdded(node) | MutationRecord::TextChanged(node) => {
                    self.add(node)
                }
            }
        }
    }

    /// Empty the set, returning its roots in arrival order.
    pub fn take(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.roots).into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
