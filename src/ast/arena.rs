//! Ownership of allocated nodes.
//!
//! All nodes live in one [`AstArena`]; handles are generational indices, so a
//! freed slot can be recycled without an old handle ever resolving to the new
//! occupant. Snapshots capture the live set and variable map without owning
//! any storage, which is what makes [`AstArena::restore`] leak-free.

use std::collections::{HashMap, HashSet};

use crate::log_debug;

use super::{AstNode, NodeKind};
use crate::error::{AstError, Result};

const TAG: &str = "arena";

/// Generational handle to a node owned by an [`AstArena`].
///
/// A handle is a borrow, not a reference count: it stays valid until the node
/// is freed, and resolves to `None` afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    index: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<AstNode>,
}

/// Arena and garbage collector for AST nodes.
#[derive(Debug, Default)]
pub struct AstArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    variables: HashMap<String, NodeRef>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a freshly built node and hands back its handle.
    pub fn record(&mut self, node: AstNode) -> NodeRef {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeRef {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeRef {
                index,
                generation: 0,
            }
        }
    }

    /// Registers `node` under a unique variable name.
    pub fn record_variable(&mut self, name: &str, node: NodeRef) -> Result<()> {
        if self.variables.contains_key(name) {
            return Err(AstError::Duplicate(name.to_owned()));
        }
        self.variables.insert(name.to_owned(), node);
        Ok(())
    }

    pub fn get(&self, node: NodeRef) -> Option<&AstNode> {
        self.slots
            .get(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.get(node).is_some()
    }

    pub fn get_variable(&self, name: &str) -> Option<NodeRef> {
        self.variables.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, NodeRef)> {
        self.variables.iter().map(|(name, node)| (name.as_str(), *node))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroys every tracked node and clears the variable map.
    pub fn free_all(&mut self) {
        log_debug!(target: TAG, "Freeing all {} nodes", self.len());
        self.slots.clear();
        self.free.clear();
        self.variables.clear();
    }

    /// Destroys exactly the given nodes, dropping variable entries whose
    /// target is among them. Stale handles in the set are ignored.
    pub fn free_subset(&mut self, nodes: &HashSet<NodeRef>) {
        for &node in nodes {
            self.free_one(node);
        }
    }

    fn free_one(&mut self, node: NodeRef) {
        let Some(slot) = self
            .slots
            .get_mut(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
        else {
            return;
        };
        let Some(freed) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(node.index);
        if freed.kind() == NodeKind::Variable {
            if let Some(var) = freed.variable() {
                self.variables.remove(&var.name);
            }
        }
    }

    /// Every node reachable from `root` through `children()`.
    ///
    /// `REFERENCE` targets live in other expressions and are deliberately not
    /// chased; a stale root yields the empty set.
    pub fn extract_unique(&self, root: NodeRef) -> HashSet<NodeRef> {
        let mut unique = HashSet::new();
        if !self.contains(root) {
            return unique;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !unique.insert(node) {
                continue;
            }
            if let Some(data) = self.get(node) {
                stack.extend(data.children().iter().copied());
            }
        }
        unique
    }

    /// Captures the current live set and variable map.
    pub fn snapshot(&self) -> ArenaSnapshot {
        let live = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| NodeRef {
                index: index as u32,
                generation: slot.generation,
            })
            .collect();
        ArenaSnapshot {
            live,
            variables: self.variables.clone(),
        }
    }

    /// Frees every node allocated since `snapshot` was taken and reinstates
    /// the snapshot's variable map.
    pub fn restore(&mut self, snapshot: &ArenaSnapshot) {
        let excess: Vec<NodeRef> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| NodeRef {
                index: index as u32,
                generation: slot.generation,
            })
            .filter(|node| !snapshot.live.contains(node))
            .collect();
        log_debug!(target: TAG, "Restoring snapshot, freeing {} nodes", excess.len());
        for node in excess {
            self.free_one(node);
        }
        self.variables = snapshot
            .variables
            .iter()
            .filter(|(_, node)| self.contains(**node))
            .map(|(name, node)| (name.clone(), *node))
            .collect();
    }
}

/// Non-owning capture of an arena's state, produced by [`AstArena::snapshot`].
///
/// Dropping a snapshot frees nothing; only [`AstArena::restore`] consumes it
/// meaningfully.
#[derive(Debug, Clone)]
pub struct ArenaSnapshot {
    live: HashSet<NodeRef>,
    variables: HashMap<String, NodeRef>,
}

impl ArenaSnapshot {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
