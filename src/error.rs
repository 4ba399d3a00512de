//! Error types for cow_trie

use thiserror::Error;

use crate::store::Version;

/// Result type alias for cow_trie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in store operations
///
/// Absent keys and type mismatches are not errors; lookups report them as
/// `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown version {requested}, latest is {latest}")]
    UnknownVersion { requested: Version, latest: Version },
}
