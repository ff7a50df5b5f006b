//! Error types for the LL layer.
//!
//! Errors at this level are storage- and stream-focused. No semantic errors like
//! "unresolved target" or "not writable" - those belong in higher layers.

/// Errors raised by a non-volatile store driver.
#[derive(Debug)]
pub enum NvError {
    /// An access touched bytes outside the physical store.
    ///
    /// This is the storage-bounds fault. The object layers never check
    /// bounds themselves; they surface this error from the driver.
    OutOfRange {
        /// First byte of the rejected access.
        offset: u16,
        /// Number of bytes requested.
        len: usize,
        /// Physical size of the store.
        capacity: u16,
    },

    /// The store does not accept writes.
    ReadOnly,

    /// Generic I/O failure while loading or saving an image.
    Io(std::io::Error),
}

impl std::fmt::Display for NvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NvError::OutOfRange {
                offset,
                len,
                capacity,
            } => write!(
                f,
                "access of {} bytes at offset {} exceeds store capacity {}",
                len, offset, capacity
            ),
            NvError::ReadOnly => write!(f, "store is read-only"),
            NvError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for NvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NvError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NvError {
    fn from(e: std::io::Error) -> Self {
        NvError::Io(e)
    }
}

/// Errors raised while writing to an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The stream has no room for more bytes.
    Full {
        /// How many bytes the stream holds.
        capacity: usize,
    },

    /// The stream was closed before the write.
    Closed,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Full { capacity } => {
                write!(f, "output stream full ({} bytes)", capacity)
            }
            StreamError::Closed => write!(f, "output stream closed"),
        }
    }
}

impl std::error::Error for StreamError {}
