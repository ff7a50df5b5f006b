//! ctrlbox: a persistent, remotely addressable object model driven by a
//! cooperative control loop.
//!
//! Objects live in a tree of containers and are addressed by short id chains.
//! Values stream their state as bytes and accept masked partial writes, so a
//! host can change single bits without reading first. Values may keep their
//! bytes in non-volatile storage, in process memory, or in another object.
//!
//! The crate is layered:
//!
//! - [`ll`]: byte streams and the non-volatile storage interface
//! - [`model`]: the object model, id chains, containers and persisted values
//! - [`sys`]: ticks and the virtual clock
//! - [`runtime`]: the prepare/wait/update control loop
//!
//! Most programs only need the [`prelude`].

pub use ctrlbox_core_store as model;
pub use ctrlbox_ll_store as ll;
pub use ctrlbox_runtime as runtime;
pub use ctrlbox_sys as sys;

pub use ctrlbox_core_store::id_chain;

/// The types needed to build a tree and run it.
pub mod prelude {
    pub use ctrlbox_core_store::{
        lookup, object_ref, Container, ContainerId, DynamicContainer, EepromValue, IdChain,
        Object, ObjectRef, ObjectType, OpenContainer, RootSlot, TransientValue, Value,
        WritableValue,
    };
    pub use ctrlbox_ll_store::{share, ArrayNvStore, DataIn, DataOut, NvAccess, SharedNv};
    pub use ctrlbox_runtime::{CommandChannel, ControlLoop, CycleOutcome, LoopConfig};
    pub use ctrlbox_sys::{SystemTicks, VirtualClock};
}
