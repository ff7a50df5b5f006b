//! Error types for the object layer.

use ctrlbox_ll_store::{NvError, StreamError};
use thiserror::Error;

use crate::object::ContainerId;

/// Errors raised by objects, containers and the persistence layer.
///
/// Unresolved indirection targets are deliberately absent: they degrade to
/// neutral defaults instead of failing.
#[derive(Debug, Error)]
pub enum Error {
    /// The storage driver rejected an access.
    #[error("storage error: {0}")]
    Storage(#[from] NvError),

    /// An output stream refused a byte.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// A slot index outside `0..=126`.
    #[error("invalid container slot: {0}")]
    InvalidSlot(ContainerId),

    /// The container has no free slot left.
    #[error("container is full")]
    ContainerFull,

    /// An id chain that is malformed or deeper than allowed.
    #[error("invalid id chain: {message}")]
    InvalidChain { message: String },

    /// Not enough non-volatile space for a new region.
    #[error("storage exhausted: {requested} bytes requested, {available} available")]
    StorageExhausted { requested: usize, available: usize },

    /// A region longer than its length byte can describe.
    #[error("region of {0} bytes does not fit a length byte")]
    RegionTooLarge(usize),
}

/// Result type alias for object operations.
pub type Result<T> = std::result::Result<T, Error>;
