//! # ctrlbox-sys
//!
//! Platform services for the ctrlbox object model.
//!
//! Currently this is time: millisecond counters, the virtual clock the
//! control loop runs on, and values that expose time in the object tree.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use ctrlbox_sys::time::{ManualTicks, VirtualClock};
//!
//! let base = Rc::new(ManualTicks::new(0));
//! let clock = VirtualClock::new(base.clone());
//! base.advance(1500);
//! assert_eq!(clock.seconds(), 1);
//! ```

pub mod time;

pub use time::{
    time_since, CurrentCycleTicksValue, CurrentTicksValue, ManualTicks, ScaledTicksValue,
    SharedTicks, SystemTicks, Ticks, TicksMillis, TicksSeconds, VirtualClock,
};
