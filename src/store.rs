//! Thread-safe versioned store of trie snapshots.
//!
//! `TrieStore` keeps every snapshot it has ever produced. Version `0` is the
//! snapshot the store was created with, and each successful write appends
//! exactly one new version.
//!
//! Writers are serialized by a single mutex that covers the whole
//! read-latest / compute / append step, so each write builds on the snapshot
//! that was latest when it acquired the lock. Readers never take that mutex:
//! they clone a snapshot handle out of the version list and work on it
//! without further synchronization, since published nodes are never mutated.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::trie::Trie;

/// Version number of a snapshot in a [`TrieStore`].
pub type Version = usize;

/// A value read from a [`TrieStore`].
///
/// The guard keeps the snapshot the value was read from alive for as long as
/// it is held, so the value stays valid even if the store itself is dropped.
pub struct ValueGuard<T> {
    snapshot: Trie,
    value: Arc<T>,
}

impl<T> ValueGuard<T> {
    /// Returns the snapshot this value was read from.
    pub fn snapshot(&self) -> &Trie {
        &self.snapshot
    }
}

impl<T: Any + Send + Sync> ValueGuard<T> {
    fn read(snapshot: Trie, key: &[u8]) -> Option<Self> {
        let value = snapshot.get_shared::<T>(key)?;
        Some(ValueGuard { snapshot, value })
    }
}

impl<T> Deref for ValueGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueGuard").field(&*self.value).finish()
    }
}

/// A thread-safe, append-only sequence of [`Trie`] snapshots.
///
/// # Examples
///
/// ```
/// use cow_trie::TrieStore;
///
/// let store = TrieStore::new();
/// assert_eq!(store.latest_version(), 0);
///
/// let v1 = store.put("key", 1u32);
/// let v2 = store.put("key", 2u32);
///
/// assert_eq!(*store.get::<u32>("key").unwrap(), 2);
/// assert_eq!(*store.get_at::<u32>("key", v1).unwrap().unwrap(), 1);
///
/// // Removing a missing key does not create a version
/// assert_eq!(store.remove("missing"), v2);
/// ```
pub struct TrieStore {
    /// Serializes writers
    write_lock: Mutex<()>,

    /// Every snapshot produced so far, indexed by version
    snapshots: RwLock<Vec<Trie>>,
}

impl TrieStore {
    /// Creates a store whose version `0` is the empty trie.
    pub fn new() -> Self {
        Self::from_snapshot(Trie::new())
    }

    /// Creates a store whose version `0` is `trie`.
    pub fn from_snapshot(trie: Trie) -> Self {
        TrieStore {
            write_lock: Mutex::new(()),
            snapshots: RwLock::new(vec![trie]),
        }
    }

    /// Returns the number of the most recent version.
    pub fn latest_version(&self) -> Version {
        self.snapshots.read().len().saturating_sub(1)
    }

    /// Returns the most recent snapshot.
    pub fn latest_snapshot(&self) -> Trie {
        self.snapshots.read().last().cloned().unwrap_or_default()
    }

    /// Returns the snapshot for `version`.
    pub fn snapshot(&self, version: Version) -> Result<Trie> {
        let snapshots = self.snapshots.read();
        match snapshots.get(version) {
            Some(trie) => Ok(trie.clone()),
            None => {
                let latest = snapshots.len().saturating_sub(1);
                trace!("lookup of unknown version {} (latest {})", version, latest);
                Err(Error::UnknownVersion {
                    requested: version,
                    latest,
                })
            }
        }
    }

    /// Reads `key` from the latest snapshot.
    ///
    /// Returns `None` if the key is absent or holds a value of another type.
    pub fn get<T>(&self, key: impl AsRef<[u8]>) -> Option<ValueGuard<T>>
    where
        T: Any + Send + Sync,
    {
        ValueGuard::read(self.latest_snapshot(), key.as_ref())
    }

    /// Reads `key` from the snapshot for `version`.
    pub fn get_at<T>(&self, key: impl AsRef<[u8]>, version: Version) -> Result<Option<ValueGuard<T>>>
    where
        T: Any + Send + Sync,
    {
        let snapshot = self.snapshot(version)?;
        Ok(ValueGuard::read(snapshot, key.as_ref()))
    }

    /// Stores `value` under `key` and returns the new version.
    pub fn put<T>(&self, key: impl AsRef<[u8]>, value: T) -> Version
    where
        T: Any + Send + Sync,
    {
        let key = key.as_ref();
        let _writer = self.write_lock.lock();

        let next = self.latest_snapshot().put(key, value);
        let version = self.publish(next);
        debug!("put {:?} -> version {}", String::from_utf8_lossy(key), version);
        version
    }

    /// Removes `key` and returns the resulting version.
    ///
    /// If the key is not stored no version is appended and the current
    /// latest version is returned.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Version {
        let key = key.as_ref();
        let _writer = self.write_lock.lock();

        let latest = self.latest_snapshot();
        let next = latest.remove(key);
        if next.ptr_eq(&latest) {
            let version = self.latest_version();
            trace!("remove {:?}: key absent, staying at version {}", String::from_utf8_lossy(key), version);
            return version;
        }

        let version = self.publish(next);
        debug!("remove {:?} -> version {}", String::from_utf8_lossy(key), version);
        version
    }

    // Appends a finished snapshot. Callers must hold the write lock.
    fn publish(&self, trie: Trie) -> Version {
        let mut snapshots = self.snapshots.write();
        snapshots.push(trie);
        snapshots.len() - 1
    }
}

impl Default for TrieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieStore")
            .field("latest_version", &self.latest_version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store() {
        let store = TrieStore::new();

        assert_eq!(store.latest_version(), 0);
        assert!(store.latest_snapshot().is_empty());
        assert!(store.get::<u32>("anything").is_none());
    }

    #[test]
    fn test_put_increments_version() {
        let store = TrieStore::new();

        assert_eq!(store.put("a", 1u32), 1);
        assert_eq!(store.put("b", 2u32), 2);
        assert_eq!(store.put("a", 3u32), 3);
        assert_eq!(store.latest_version(), 3);
    }

    #[test]
    fn test_latest_snapshot_follows_writes() {
        let store = TrieStore::new();
        store.put("a", 1u32);
        let v2 = store.put("b", 2u32);

        let latest = store.latest_snapshot();
        assert!(latest.ptr_eq(&store.snapshot(v2).unwrap()));
        assert_eq!(latest.len(), 2);

        store.remove("missing");
        assert!(store.latest_snapshot().ptr_eq(&latest));
    }

    #[test]
    fn test_get_at_old_versions() {
        let store = TrieStore::new();
        let v1 = store.put("k", 1u32);
        let v2 = store.put("k", 2u32);

        assert!(store.get_at::<u32>("k", 0).unwrap().is_none());
        assert_eq!(*store.get_at::<u32>("k", v1).unwrap().unwrap(), 1);
        assert_eq!(*store.get_at::<u32>("k", v2).unwrap().unwrap(), 2);
        assert_eq!(*store.get::<u32>("k").unwrap(), 2);
    }

    #[test]
    fn test_unknown_version() {
        let store = TrieStore::new();
        store.put("k", 1u32);

        assert_eq!(
            store.snapshot(5).unwrap_err(),
            Error::UnknownVersion {
                requested: 5,
                latest: 1
            }
        );
        assert!(store.get_at::<u32>("k", 2).is_err());
    }

    #[test]
    fn test_type_mismatch_is_absent() {
        let store = TrieStore::new();
        store.put("k", "v".to_string());

        assert!(store.get::<u32>("k").is_none());
        assert_eq!(store.get::<String>("k").unwrap().as_str(), "v");
    }

    #[test]
    fn test_noop_remove_keeps_version() {
        let store = TrieStore::new();
        assert_eq!(store.remove("k"), 0);

        store.put("abc", 1u32);
        assert_eq!(store.remove("k"), 1);
        assert_eq!(store.remove("ab"), 1);
        assert_eq!(store.remove("abcd"), 1);
        assert_eq!(store.latest_version(), 1);

        assert_eq!(store.remove("abc"), 2);
        assert_eq!(store.remove("abc"), 2);
        assert_eq!(store.latest_version(), 2);
    }

    #[test]
    fn test_emptying_remove_appends_new_version() {
        let store = TrieStore::new();
        store.put("k", 1u32);

        assert_eq!(store.remove("k"), 2);
        assert!(store.snapshot(2).unwrap().is_empty());
        assert!(store.snapshot(1).unwrap().contains_key("k"));
    }

    #[test]
    fn test_from_snapshot() {
        let seed = Trie::new().put("seed", 7u8);
        let store = TrieStore::from_snapshot(seed.clone());

        assert_eq!(store.latest_version(), 0);
        assert!(store.snapshot(0).unwrap().ptr_eq(&seed));
        assert_eq!(*store.get::<u8>("seed").unwrap(), 7);
    }

    #[test]
    fn test_guard_outlives_store() {
        let store = TrieStore::new();
        store.put("k", vec![1u8, 2, 3]);

        let guard = store.get::<Vec<u8>>("k").unwrap();
        drop(store);

        assert_eq!(*guard, vec![1, 2, 3]);
        assert!(guard.snapshot().contains_key("k"));
    }

    #[test]
    fn test_guard_pins_its_snapshot() {
        let store = TrieStore::new();
        store.put("k", 1u32);

        let guard = store.get::<u32>("k").unwrap();
        store.put("k", 2u32);
        store.remove("k");

        assert_eq!(*guard, 1);
        assert!(store.get::<u32>("k").is_none());
    }
}
