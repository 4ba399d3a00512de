//! The persistent trie.
//!
//! This module contains the `Trie` type, which provides the copy-on-write
//! get/put/remove operations.

use std::any::Any;
use std::sync::Arc;

use crate::node::{Payload, TrieNode};

/// An immutable trie mapping byte-string keys to values of any type.
///
/// Every key may hold a value of a different type. All operations that would
/// modify the trie return a new trie instead; the new trie shares every node
/// that is not on the modified key's path with the original via `Arc`.
///
/// Cloning a `Trie` is cheap: it only bumps the reference count of the root.
///
/// # Examples
///
/// ```
/// use cow_trie::Trie;
///
/// let trie1 = Trie::new().put("hello", 42u32);
/// let trie2 = trie1.put("world", "text".to_string());
///
/// assert_eq!(trie2.get::<u32>("hello"), Some(&42));
/// assert_eq!(trie2.get::<String>("world").map(String::as_str), Some("text"));
///
/// // The original is untouched
/// assert_eq!(trie1.get::<String>("world"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trie {
    /// The root node of the trie, `None` when the trie is empty
    root: Option<Arc<TrieNode>>,

    /// The number of values stored in the trie
    size: usize,
}

impl Trie {
    /// Creates a new, empty trie.
    ///
    /// # Examples
    ///
    /// ```
    /// use cow_trie::Trie;
    ///
    /// let trie = Trie::new();
    /// assert!(trie.is_empty());
    /// assert!(trie.root().is_none());
    /// ```
    pub fn new() -> Self {
        Trie {
            root: None,
            size: 0,
        }
    }

    /// Returns the number of values stored in the trie.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the trie contains no values.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the root node, or `None` for the empty trie.
    ///
    /// This is the read-only entry point for diagnostics that want to walk the
    /// node structure.
    pub fn root(&self) -> Option<&Arc<TrieNode>> {
        self.root.as_ref()
    }

    /// Returns `true` if both tries share the same root node.
    ///
    /// A [`remove`](Trie::remove) of a missing key returns a trie for which
    /// this holds.
    pub fn ptr_eq(&self, other: &Trie) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    // Walks the key's path and returns the node it ends at
    fn find_node(&self, key: &[u8]) -> Option<&Arc<TrieNode>> {
        let mut current = self.root.as_ref()?;

        for byte in key {
            current = current.children.get(byte)?;
        }

        Some(current)
    }

    /// Retrieves a reference to the value stored for `key`, if any.
    ///
    /// Returns `None` if the key is absent or if the stored value is not of
    /// type `T`. The empty key addresses the root node.
    ///
    /// # Examples
    ///
    /// ```
    /// use cow_trie::Trie;
    ///
    /// let trie = Trie::new().put("answer", 42u32);
    ///
    /// assert_eq!(trie.get::<u32>("answer"), Some(&42));
    /// assert_eq!(trie.get::<u64>("answer"), None);
    /// assert_eq!(trie.get::<u32>("question"), None);
    /// ```
    pub fn get<T: Any>(&self, key: impl AsRef<[u8]>) -> Option<&T> {
        self.find_node(key.as_ref())?.value_as::<T>()
    }

    // Like `get`, but hands out shared ownership of the value
    pub(crate) fn get_shared<T>(&self, key: &[u8]) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.find_node(key)?.value.clone()?;
        value.downcast::<T>().ok()
    }

    /// Returns `true` if a value of any type is stored for `key`.
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.find_node(key.as_ref())
            .map_or(false, |node| node.is_terminal())
    }

    /// Stores `value` under `key`, returning a new trie.
    ///
    /// If the key already holds a value, of any type, it is replaced. Nodes
    /// already below the key are kept, so putting a prefix of existing keys
    /// leaves those keys in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use cow_trie::Trie;
    ///
    /// let trie1 = Trie::new().put("ab", 1u8);
    /// let trie2 = trie1.put("a", 2u8);
    ///
    /// assert_eq!(trie2.get::<u8>("a"), Some(&2));
    /// assert_eq!(trie2.get::<u8>("ab"), Some(&1));
    /// assert_eq!(trie1.get::<u8>("a"), None);
    /// ```
    pub fn put<T>(&self, key: impl AsRef<[u8]>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let key = key.as_ref();

        // existing[i] is the node at depth i of the key's path, if present
        let mut existing: Vec<Option<&Arc<TrieNode>>> = Vec::with_capacity(key.len() + 1);
        let mut current = self.root.as_ref();
        existing.push(current);
        for byte in key {
            current = current.and_then(|node| node.children.get(byte));
            existing.push(current);
        }

        // Keep the children at the target, swap the value
        let value: Payload = Arc::new(value);
        let target = existing.pop().flatten();
        let value_replaced = target.map_or(false, |node| node.is_terminal());
        let mut new_child = Arc::new(match target {
            Some(node) => node.with_value_option(Some(value)),
            None => TrieNode::with_value(value),
        });

        // Copy the path bottom-up; off the existing path every node is fresh
        for (node, &byte) in existing.into_iter().zip(key).rev() {
            let mut new_node = match node {
                Some(node) => TrieNode::clone(node),
                None => TrieNode::new(),
            };
            new_node.children.insert(byte, new_child);
            new_child = Arc::new(new_node);
        }

        let new_size = if value_replaced { self.size } else { self.size + 1 };

        Trie {
            root: Some(new_child),
            size: new_size,
        }
    }

    /// Removes the value stored for `key`, returning a new trie.
    ///
    /// Nodes left without a value or children are pruned back to the last
    /// ancestor that either branches or stores a value of its own. If the
    /// key is not stored the returned trie shares the original root, see
    /// [`ptr_eq`](Trie::ptr_eq).
    ///
    /// # Examples
    ///
    /// ```
    /// use cow_trie::Trie;
    ///
    /// let trie1 = Trie::new().put("hello", 42u32);
    /// let trie2 = trie1.remove("hello");
    ///
    /// assert!(trie2.is_empty());
    /// assert_eq!(trie1.get::<u32>("hello"), Some(&42));
    ///
    /// let trie3 = trie1.remove("absent");
    /// assert!(trie3.ptr_eq(&trie1));
    /// ```
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        let mut current = match &self.root {
            Some(root) => root,
            None => return self.clone(),
        };

        let mut path: Vec<&Arc<TrieNode>> = Vec::with_capacity(key.len());
        for byte in key {
            path.push(current);
            current = match current.children.get(byte) {
                Some(child) => child,
                None => return self.clone(),
            };
        }
        if !current.is_terminal() {
            return self.clone();
        }

        // `None` means the subtree below is pruned. Other keys running
        // through the target keep it alive with its children.
        let mut new_child = if current.is_leaf() {
            None
        } else {
            Some(Arc::new(current.with_value_option(None)))
        };

        for (node, byte) in path.into_iter().zip(key).rev() {
            new_child = match new_child {
                Some(child) => {
                    let mut new_node = TrieNode::clone(node);
                    new_node.children.insert(*byte, child);
                    Some(Arc::new(new_node))
                }
                // An unbranched chain without values collapses into its parent
                None if !node.is_terminal() && node.child_count() == 1 => None,
                None => {
                    let mut new_node = TrieNode::clone(node);
                    new_node.children.remove(byte);
                    Some(Arc::new(new_node))
                }
            };
        }

        match new_child {
            Some(new_root) => Trie {
                root: Some(new_root),
                size: self.size - 1,
            },
            None => Trie::new(),
        }
    }
}
