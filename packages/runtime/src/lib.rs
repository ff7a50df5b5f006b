//! # ctrlbox runtime
//!
//! The control loop that drives a ctrlbox object tree.
//!
//! ## Core Concepts
//!
//! ### The Cycle
//!
//! Every iteration runs in two phases around a wait:
//!
//! - **prepare**: each object says how long it needs before it can be
//!   updated, for example to let a sensor conversion finish
//! - **wait**: the loop polls the command channel until the longest of those
//!   delays has passed in virtual time
//! - **update**: each object advances its state by one tick
//!
//! The wait is the only time commands run, so the tree never changes in the
//! middle of a phase.
//!
//! ### The Root
//!
//! The tree is reached through a shared [`RootSlot`]. Commands may install a
//! new root at any time; the loop notices and skips updating a tree it did not
//! prepare.
//!
//! ### Virtual Time
//!
//! Delays are measured on a [`VirtualClock`], which hosts can shift and
//! scale. Simulations run on [`ManualTicks`](ctrlbox_sys::ManualTicks) and
//! advance time from their command channel.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use ctrlbox_core_store::{object_ref, DynamicContainer, RootSlot};
//! use ctrlbox_runtime::{ControlLoop, CycleOutcome, NullChannel};
//! use ctrlbox_sys::{ManualTicks, VirtualClock};
//!
//! let clock = VirtualClock::new(Rc::new(ManualTicks::new(0)));
//! let root = RootSlot::with_root(object_ref(DynamicContainer::new()));
//! let mut control = ControlLoop::new(clock, root, NullChannel::new());
//!
//! assert_eq!(control.run_once().unwrap(), CycleOutcome::Updated);
//! ```
//!
//! [`RootSlot`]: ctrlbox_core_store::RootSlot
//! [`VirtualClock`]: ctrlbox_sys::VirtualClock

pub mod channel;
pub mod config;
pub mod control;
pub mod error;
pub mod value_log;

pub use channel::{CommandChannel, LogRequest, NullChannel};
pub use config::{LoopConfig, PreparePolicy};
pub use control::{ControlLoop, CycleOutcome, LoopState, StateWatch};
pub use error::{Result, RuntimeError};
pub use value_log::{log_values, log_values_at, LogVisitor, VALUE_RECORD};
