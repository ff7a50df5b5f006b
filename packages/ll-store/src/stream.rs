//! In-memory stream implementations.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{DataIn, DataOut, StreamError};

/// Reads bytes from an in-memory buffer.
#[derive(Debug, Clone)]
pub struct BufferDataIn {
    data: Bytes,
    pos: usize,
}

impl BufferDataIn {
    /// Create a stream over the given bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Create a stream over a copy of the given slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl DataIn for BufferDataIn {
    fn has_next(&self) -> bool {
        self.pos < self.data.len()
    }

    fn next(&mut self) -> u8 {
        match self.data.get(self.pos) {
            Some(byte) => {
                self.pos += 1;
                *byte
            }
            None => 0,
        }
    }

    fn peek(&self) -> u8 {
        self.data.get(self.pos).copied().unwrap_or(0)
    }

    fn available(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// Limits another stream to at most `len` bytes.
pub struct RegionDataIn<'a> {
    inner: &'a mut dyn DataIn,
    len: usize,
}

impl<'a> RegionDataIn<'a> {
    /// View at most `len` bytes of `inner`.
    pub fn new(inner: &'a mut dyn DataIn, len: usize) -> Self {
        Self { inner, len }
    }
}

impl DataIn for RegionDataIn<'_> {
    fn has_next(&self) -> bool {
        self.len > 0 && self.inner.has_next()
    }

    fn next(&mut self) -> u8 {
        if !self.has_next() {
            return 0;
        }
        self.len -= 1;
        self.inner.next()
    }

    fn peek(&self) -> u8 {
        self.inner.peek()
    }

    fn available(&self) -> usize {
        self.len.min(self.inner.available())
    }
}

/// An endless stream of `0xFF`, the mask that selects every bit.
///
/// It never runs dry, so it reports `usize::MAX` bytes available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMask;

impl DataIn for DefaultMask {
    fn has_next(&self) -> bool {
        true
    }

    fn next(&mut self) -> u8 {
        0xFF
    }

    fn peek(&self) -> u8 {
        0xFF
    }

    fn available(&self) -> usize {
        usize::MAX
    }
}

/// A stream with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDataIn;

impl DataIn for EmptyDataIn {
    fn has_next(&self) -> bool {
        false
    }

    fn next(&mut self) -> u8 {
        0
    }

    fn peek(&self) -> u8 {
        0
    }

    fn available(&self) -> usize {
        0
    }
}

/// Collects written bytes in memory, optionally up to a fixed capacity.
#[derive(Debug, Default)]
pub struct BufferDataOut {
    buffer: BytesMut,
    capacity: Option<usize>,
    closed: usize,
}

impl BufferDataOut {
    /// Create an unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that rejects writes beyond `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity: Some(capacity),
            closed: 0,
        }
    }

    /// The bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    /// How many times `close` has been called.
    pub fn messages_closed(&self) -> usize {
        self.closed
    }

    /// Discard everything written so far.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.closed = 0;
    }

    /// Take the written bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}

impl DataOut for BufferDataOut {
    fn write(&mut self, byte: u8) -> Result<(), StreamError> {
        if let Some(capacity) = self.capacity {
            if self.buffer.len() >= capacity {
                return Err(StreamError::Full { capacity });
            }
        }
        self.buffer.put_u8(byte);
        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}

/// Accepts and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackholeDataOut;

impl DataOut for BlackholeDataOut {
    fn write(&mut self, _byte: u8) -> Result<(), StreamError> {
        Ok(())
    }
}
