//! Core traits for the LL layer.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{NvError, StreamError};

/// Address of a byte in non-volatile storage.
pub type NvAddress = u16;

/// A non-volatile store shared by every object that persists into it.
///
/// Execution is single-threaded, so the store is reference counted and
/// borrowed for the duration of one access.
pub type SharedNv = Rc<RefCell<dyn NvAccess>>;

/// A source of bytes.
///
/// Reading past the end is not an error: `next` yields 0 once the stream is
/// exhausted. Callers that care check `has_next` first.
pub trait DataIn {
    /// Whether another byte can be read.
    fn has_next(&self) -> bool;

    /// Consume and return the next byte, or 0 when exhausted.
    fn next(&mut self) -> u8;

    /// Return the next byte without consuming it, or 0 when exhausted.
    fn peek(&self) -> u8;

    /// Number of bytes that can be read without blocking.
    fn available(&self) -> usize;

    /// Fill `target` from the stream, stopping early if it runs dry.
    ///
    /// Returns the number of bytes read.
    fn read_into(&mut self, target: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in target.iter_mut() {
            if !self.has_next() {
                break;
            }
            *slot = self.next();
            count += 1;
        }
        count
    }

    /// Copy up to `len` bytes from this stream to `out`.
    fn push(&mut self, out: &mut dyn DataOut, len: usize) -> Result<(), StreamError> {
        let mut remaining = len;
        while remaining > 0 && self.has_next() {
            out.write(self.next())?;
            remaining -= 1;
        }
        Ok(())
    }
}

/// A sink for bytes.
pub trait DataOut {
    /// Write one byte.
    fn write(&mut self, byte: u8) -> Result<(), StreamError>;

    /// Write a run of bytes.
    fn write_buffer(&mut self, data: &[u8]) -> Result<(), StreamError> {
        for byte in data {
            self.write(*byte)?;
        }
        Ok(())
    }

    /// Flush buffered bytes to the underlying transport.
    fn flush(&mut self) {}

    /// Mark the end of a message.
    fn close(&mut self) {}
}

/// Byte-addressable non-volatile storage.
///
/// This is the narrow interface to the storage driver. Implementations report
/// accesses outside the physical store as [`NvError::OutOfRange`]; nothing
/// above this trait checks bounds.
pub trait NvAccess {
    /// Read one byte.
    fn read_byte(&self, offset: NvAddress) -> Result<u8, NvError>;

    /// Write one byte.
    fn write_byte(&mut self, offset: NvAddress, value: u8) -> Result<(), NvError>;

    /// Fill `target` from consecutive bytes starting at `offset`.
    fn read_block(&self, target: &mut [u8], offset: NvAddress) -> Result<(), NvError>;

    /// Write `source` to consecutive bytes starting at `offset`.
    fn write_block(&mut self, offset: NvAddress, source: &[u8]) -> Result<(), NvError>;

    /// Physical size of the store in bytes.
    fn len(&self) -> NvAddress;

    /// Whether the store has no bytes at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Blanket implementations for references and boxes

impl<T: DataIn + ?Sized> DataIn for &mut T {
    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn next(&mut self) -> u8 {
        (**self).next()
    }

    fn peek(&self) -> u8 {
        (**self).peek()
    }

    fn available(&self) -> usize {
        (**self).available()
    }
}

impl<T: DataOut + ?Sized> DataOut for &mut T {
    fn write(&mut self, byte: u8) -> Result<(), StreamError> {
        (**self).write(byte)
    }

    fn write_buffer(&mut self, data: &[u8]) -> Result<(), StreamError> {
        (**self).write_buffer(data)
    }

    fn flush(&mut self) {
        (**self).flush()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<T: DataOut + ?Sized> DataOut for Box<T> {
    fn write(&mut self, byte: u8) -> Result<(), StreamError> {
        self.as_mut().write(byte)
    }

    fn write_buffer(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.as_mut().write_buffer(data)
    }

    fn flush(&mut self) {
        self.as_mut().flush()
    }

    fn close(&mut self) {
        self.as_mut().close()
    }
}

impl<T: NvAccess + ?Sized> NvAccess for Box<T> {
    fn read_byte(&self, offset: NvAddress) -> Result<u8, NvError> {
        self.as_ref().read_byte(offset)
    }

    fn write_byte(&mut self, offset: NvAddress, value: u8) -> Result<(), NvError> {
        self.as_mut().write_byte(offset, value)
    }

    fn read_block(&self, target: &mut [u8], offset: NvAddress) -> Result<(), NvError> {
        self.as_ref().read_block(target, offset)
    }

    fn write_block(&mut self, offset: NvAddress, source: &[u8]) -> Result<(), NvError> {
        self.as_mut().write_block(offset, source)
    }

    fn len(&self) -> NvAddress {
        self.as_ref().len()
    }
}
