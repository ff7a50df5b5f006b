//! The ctrlbox object model: addressable objects, values and containers.
//!
//! This layer gives meaning to the raw bytes of the ll layer:
//! - `Object`: the capability every tree node has, with accessors for the rest
//! - `Value` / `WritableValue`: streamable state with masked partial updates
//! - `Container` / `OpenContainer`: indexed collections addressed by id chains
//! - Persisted values bound to length-prefixed regions of non-volatile storage
//! - Adapters that alias other objects or expose external memory
//!
//! # Example
//!
//! ```rust
//! use ctrlbox_core_store::{lookup, object_ref, DynamicContainer, OpenContainer, TransientValue};
//!
//! let mut root = DynamicContainer::new();
//! root.add(2, object_ref(TransientValue::new(21u8))).unwrap();
//! let root = object_ref(root);
//!
//! let item = lookup(&root, &[2]).unwrap();
//! assert_eq!(item.borrow().as_value().unwrap().read_stream_size(), 1);
//! ```

pub use bytes::Bytes;

mod chain;
mod container;
mod definition;
mod eeprom;
mod error;
mod external;
mod indirect;
mod masked;
mod object;
mod persist_change;
mod transient;
mod tree;

pub use chain::{IdChain, CHAIN_CONTINUES};
pub use container::{DynamicContainer, FixedContainer};
pub use definition::{create_object, null_factory, ObjectDefinition, ObjectFactory};
pub use eeprom::{read_i16_from, EepromBlock, EepromValue, NvRegion, RegionAllocator};
pub use error::{Error, Result};
pub use external::{
    ExternalItem, ExternalReadOnlyValue, ExternalValue, ExternalValueContainer, SharedMemory,
    COUNT_INDEX,
};
pub use indirect::IndirectValue;
pub use masked::{apply_masked, masked_byte, next_masked_byte, PlatformBytes};
pub use object::{
    object_ref, object_type_of, same_object, Container, ContainerId, Object, ObjectRef,
    ObjectType, OpenContainer, PrepareMillis, Value, WritableValue, MAX_CONTAINER_DEPTH,
    MAX_CONTAINER_ID, MAX_CONTAINER_SLOTS,
};
pub use persist_change::PersistChangeValue;
pub use transient::TransientValue;
pub use tree::{lookup, lookup_stream, walk_object, walk_root, Item, RootSlot, Visitor};

// Re-export ll types for convenience
pub use ctrlbox_ll_store::{
    DataIn, DataOut, NvAccess, NvAddress, NvError, SharedNv, StreamError,
};
