//! Low-level ctrlbox traits: byte streams and non-volatile storage.
//!
//! This is the narrow waist under the object model. Everything at this level
//! is pure bytes - no object types, no id chains, no masking semantics.
//!
//! Use this layer for:
//! - Plugging in a storage driver (`NvAccess`)
//! - Plugging in a transport (`DataIn` / `DataOut`)
//! - Streaming a region of storage without interpreting it
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ctrlbox_ll_store::{ArrayNvStore, DataIn, NvAccess, NvDataIn, SharedNv};
//!
//! let nv: SharedNv = Rc::new(RefCell::new(ArrayNvStore::new(64)));
//! nv.borrow_mut().write_block(10, &[1, 2, 3]).unwrap();
//!
//! let mut region = NvDataIn::new(nv.clone(), 10, 3);
//! assert_eq!(region.next(), 1);
//! ```

pub use bytes::Bytes;

mod error;
mod nv;
mod stream;
mod traits;

pub use error::{NvError, StreamError};
pub use nv::{ArrayNvStore, NvDataIn, NvDataOut};
pub use stream::{BlackholeDataOut, BufferDataIn, BufferDataOut, DefaultMask, EmptyDataIn, RegionDataIn};
pub use traits::{DataIn, DataOut, NvAccess, NvAddress, SharedNv};

/// Wrap a store so it can be shared by every object persisting into it.
pub fn share<S: NvAccess + 'static>(store: S) -> SharedNv {
    std::rc::Rc::new(std::cell::RefCell::new(store))
}
