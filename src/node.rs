//! Node implementation for the persistent trie.
//!
//! This module contains the `TrieNode` structure that forms the backbone
//! of the trie. `TrieNode` instances are always wrapped in an `Arc` so that a
//! single node can be reachable from the roots of many snapshots at once.
//!
//! Nodes are never mutated once they are reachable from a published `Trie`.
//! The trie only ever mutates a node it has just cloned or created, before
//! handing it out.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Type-erased value stored at a terminal node.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Diagnostic identifier of a node.
///
/// Every allocated node, including clones made during copy-on-write, gets a
/// fresh id from a process-wide counter. Two handles reporting the same id are
/// the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the trie.
///
/// A node holds its children keyed by the next byte of the key and, when it is
/// terminal, the value stored for the key spelled by the path leading to it.
/// The public surface is read-only and meant for diagnostics such as tree
/// printers.
pub struct TrieNode {
    id: NodeId,

    /// Child nodes indexed by the next byte of the key
    pub(crate) children: BTreeMap<u8, Arc<TrieNode>>,

    /// The value stored at this node, if it is terminal
    pub(crate) value: Option<Payload>,
}

impl TrieNode {
    /// Creates a new node with no children and no value
    pub(crate) fn new() -> Self {
        TrieNode {
            id: NodeId::next(),
            children: BTreeMap::new(),
            value: None,
        }
    }

    /// Creates a new leaf node holding the given value
    pub(crate) fn with_value(value: Payload) -> Self {
        TrieNode {
            id: NodeId::next(),
            children: BTreeMap::new(),
            value: Some(value),
        }
    }

    /// Creates a copy of this node with the same children but a new value
    pub(crate) fn with_value_option(&self, value: Option<Payload>) -> Self {
        TrieNode {
            id: NodeId::next(),
            children: self.children.clone(),
            value,
        }
    }

    /// Returns the diagnostic id assigned when this node was allocated.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns `true` if a key ends at this node.
    pub fn is_terminal(&self) -> bool {
        self.value.is_some()
    }

    /// Returns `true` if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the child reached by `byte`, if any.
    pub fn child(&self, byte: u8) -> Option<&Arc<TrieNode>> {
        self.children.get(&byte)
    }

    /// Iterates over the children in ascending byte order.
    pub fn children(&self) -> impl Iterator<Item = (u8, &Arc<TrieNode>)> + '_ {
        self.children.iter().map(|(byte, child)| (*byte, child))
    }

    /// Returns the stored value if it has type `T`.
    pub(crate) fn value_as<T: Any>(&self) -> Option<&T> {
        // Downcast the payload itself, not the `Arc` around it.
        self.value.as_ref().and_then(|v| (**v).downcast_ref::<T>())
    }

    /// Returns the number of values stored in this subtree
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            if node.value.is_some() {
                count += 1;
            }
            stack.extend(node.children.values().map(|child| child.as_ref()));
        }

        count
    }
}

impl Default for TrieNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for TrieNode {
    /// Shallow copy: the children map is copied entry by entry and the value
    /// is shared. The copy gets a fresh id.
    fn clone(&self) -> Self {
        self.with_value_option(self.value.clone())
    }
}

impl Drop for TrieNode {
    /// Unlinks the subtree with an explicit stack, so dropping a long chain
    /// of single-child nodes does not recurse once per key byte.
    fn drop(&mut self) {
        let mut stack: Vec<Arc<TrieNode>> = mem::take(&mut self.children).into_values().collect();

        while let Some(node) = stack.pop() {
            // Nodes still shared with another snapshot only lose a reference
            if let Ok(mut node) = Arc::try_unwrap(node) {
                stack.extend(mem::take(&mut node.children).into_values());
            }
        }
    }
}

impl fmt::Debug for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieNode")
            .field("id", &self.id)
            .field("terminal", &self.is_terminal())
            .field("children", &self.children.keys().map(|b| *b as char).collect::<Vec<_>>())
            .finish()
    }
}
