//! # Copy-on-write Trie
//!
//! A persistent trie with structural sharing and a versioned snapshot store.
//!
//! This crate provides an immutable trie whose keys are byte strings and whose
//! values may each have a different type. Modifying operations return a new
//! trie that shares, via `Arc`, every node not on the modified key's path.
//!
//! ## Features
//!
//! - **Immutable API**: `put` and `remove` return a new trie; the receiver is untouched
//! - **Structural Sharing**: Only the O(key length) nodes on a key's path are copied
//! - **Typed Lookups**: `get::<T>` returns `None` when the stored value is not a `T`
//! - **Versioned Store**: `TrieStore` keeps every snapshot, serializes writers and
//!   lets readers work on any version without taking the writer lock
//!
//! ## Example
//!
//! ```rust
//! use cow_trie::{Trie, TrieStore};
//!
//! let trie = Trie::new()
//!     .put("hello", 1u32)
//!     .put("world", "two".to_string());
//!
//! assert_eq!(trie.get::<u32>("hello"), Some(&1));
//! assert_eq!(trie.get::<u32>("world"), None);
//!
//! let store = TrieStore::new();
//! let version = store.put("hello", 1u32);
//! assert_eq!(*store.get::<u32>("hello").unwrap(), 1);
//! assert_eq!(store.latest_version(), version);
//! ```

mod error;
pub mod node;
mod store;
mod trie;

// Re-export public types
pub use crate::error::{Error, Result};
pub use crate::node::{NodeId, TrieNode};
pub use crate::store::{TrieStore, ValueGuard, Version};
pub use crate::trie::Trie;
