//! The command channel the control loop polls between phases.
//!
//! Decoding commands is the channel's business. The loop only needs to give
//! it a chance to run and to borrow its output stream for unsolicited
//! messages.

use std::cell::Cell;
use std::rc::Rc;

use ctrlbox_core_store::DataOut;
use ctrlbox_ll_store::BlackholeDataOut;

/// A source of external commands.
///
/// Commands may do anything to the tree, including replacing the root. They
/// run only inside `receive`.
pub trait CommandChannel {
    /// Handle whatever commands are pending. Must not block.
    fn receive(&mut self);

    /// Stream for messages the loop sends on its own.
    fn data_out(&mut self) -> &mut dyn DataOut;
}

impl<C: CommandChannel + ?Sized> CommandChannel for &mut C {
    fn receive(&mut self) {
        (**self).receive()
    }

    fn data_out(&mut self) -> &mut dyn DataOut {
        (**self).data_out()
    }
}

impl<C: CommandChannel + ?Sized> CommandChannel for Box<C> {
    fn receive(&mut self) {
        self.as_mut().receive()
    }

    fn data_out(&mut self) -> &mut dyn DataOut {
        self.as_mut().data_out()
    }
}

/// A channel with no commands and nowhere to send output.
#[derive(Debug, Default)]
pub struct NullChannel {
    out: BlackholeDataOut,
}

impl NullChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandChannel for NullChannel {
    fn receive(&mut self) {}

    fn data_out(&mut self) -> &mut dyn DataOut {
        &mut self.out
    }
}

/// A deferred request to log every value, raised by commands and served by
/// the loop after the next update pass.
#[derive(Debug, Clone, Default)]
pub struct LogRequest {
    raised: Rc<Cell<bool>>,
}

impl LogRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.set(true);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.get()
    }

    /// Clear the request, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.raised.replace(false)
    }
}
