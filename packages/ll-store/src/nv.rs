//! In-memory non-volatile store and streams over store regions.

use std::io::{Read, Write};

use crate::{DataIn, DataOut, NvAccess, NvAddress, NvError, SharedNv, StreamError};

/// A non-volatile store held entirely in memory.
///
/// Freshly created stores read as `0xFF`, the erased state of real EEPROM.
/// The whole image can be loaded from and saved to any byte stream, which is
/// how a simulator persists state between runs.
#[derive(Debug, Clone)]
pub struct ArrayNvStore {
    data: Vec<u8>,
    changed: bool,
}

impl ArrayNvStore {
    /// Create an erased store of `capacity` bytes.
    pub fn new(capacity: NvAddress) -> Self {
        Self {
            data: vec![0xFF; capacity as usize],
            changed: false,
        }
    }

    /// Replace the image with bytes read from `input`.
    pub fn load(&mut self, input: &mut impl Read) -> Result<(), NvError> {
        input.read_exact(&mut self.data)?;
        self.changed = false;
        Ok(())
    }

    /// Write the full image to `output`.
    pub fn save(&mut self, output: &mut impl Write) -> Result<(), NvError> {
        output.write_all(&self.data)?;
        self.changed = false;
        Ok(())
    }

    /// The raw image.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether anything was written since the last call, clearing the flag.
    pub fn has_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn check_range(&self, offset: NvAddress, len: usize) -> Result<usize, NvError> {
        let start = offset as usize;
        if start + len > self.data.len() {
            return Err(NvError::OutOfRange {
                offset,
                len,
                capacity: self.len(),
            });
        }
        Ok(start)
    }
}

impl NvAccess for ArrayNvStore {
    fn read_byte(&self, offset: NvAddress) -> Result<u8, NvError> {
        let start = self.check_range(offset, 1)?;
        Ok(self.data[start])
    }

    fn write_byte(&mut self, offset: NvAddress, value: u8) -> Result<(), NvError> {
        let start = self.check_range(offset, 1)?;
        self.data[start] = value;
        self.changed = true;
        Ok(())
    }

    fn read_block(&self, target: &mut [u8], offset: NvAddress) -> Result<(), NvError> {
        let start = self.check_range(offset, target.len())?;
        target.copy_from_slice(&self.data[start..start + target.len()]);
        Ok(())
    }

    fn write_block(&mut self, offset: NvAddress, source: &[u8]) -> Result<(), NvError> {
        let start = self.check_range(offset, source.len())?;
        self.data[start..start + source.len()].copy_from_slice(source);
        self.changed = true;
        Ok(())
    }

    fn len(&self) -> NvAddress {
        self.data.len() as NvAddress
    }
}

/// Streams bytes out of a region of a shared store.
///
/// The stream runs dry at the end of the region. A read the driver rejects
/// also ends the stream; the fault is kept and can be taken with
/// [`NvDataIn::take_error`].
pub struct NvDataIn {
    nv: SharedNv,
    offset: NvAddress,
    remaining: usize,
    error: Option<NvError>,
}

impl NvDataIn {
    /// Read `len` bytes starting at `offset`.
    pub fn new(nv: SharedNv, offset: NvAddress, len: usize) -> Self {
        Self {
            nv,
            offset,
            remaining: len,
            error: None,
        }
    }

    /// The first driver fault seen by this stream, if any.
    pub fn take_error(&mut self) -> Option<NvError> {
        self.error.take()
    }

    fn current(&self) -> Result<u8, NvError> {
        self.nv.borrow().read_byte(self.offset)
    }
}

impl DataIn for NvDataIn {
    fn has_next(&self) -> bool {
        self.remaining > 0 && self.error.is_none()
    }

    fn next(&mut self) -> u8 {
        if !self.has_next() {
            return 0;
        }
        match self.current() {
            Ok(byte) => {
                self.offset = self.offset.wrapping_add(1);
                self.remaining -= 1;
                byte
            }
            Err(e) => {
                self.error = Some(e);
                0
            }
        }
    }

    fn peek(&self) -> u8 {
        if !self.has_next() {
            return 0;
        }
        self.current().unwrap_or(0)
    }

    fn available(&self) -> usize {
        if self.error.is_some() {
            0
        } else {
            self.remaining
        }
    }

    fn push(&mut self, out: &mut dyn DataOut, len: usize) -> Result<(), StreamError> {
        for _ in 0..len {
            if !self.has_next() {
                break;
            }
            let byte = self.next();
            // a faulted read yields no byte
            if self.error.is_some() {
                break;
            }
            out.write(byte)?;
        }
        Ok(())
    }
}

/// Streams bytes into a region of a shared store.
///
/// Writes beyond the region are rejected with [`StreamError::Full`]; a write
/// the driver rejects closes the stream and keeps the fault.
pub struct NvDataOut {
    nv: SharedNv,
    offset: NvAddress,
    remaining: usize,
    capacity: usize,
    error: Option<NvError>,
}

impl NvDataOut {
    /// Write at most `len` bytes starting at `offset`.
    pub fn new(nv: SharedNv, offset: NvAddress, len: usize) -> Self {
        Self {
            nv,
            offset,
            remaining: len,
            capacity: len,
            error: None,
        }
    }

    /// The first driver fault seen by this stream, if any.
    pub fn take_error(&mut self) -> Option<NvError> {
        self.error.take()
    }
}

impl DataOut for NvDataOut {
    fn write(&mut self, byte: u8) -> Result<(), StreamError> {
        if self.error.is_some() {
            return Err(StreamError::Closed);
        }
        if self.remaining == 0 {
            return Err(StreamError::Full {
                capacity: self.capacity,
            });
        }
        let written = self.nv.borrow_mut().write_byte(self.offset, byte);
        match written {
            Ok(()) => {
                self.offset = self.offset.wrapping_add(1);
                self.remaining -= 1;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e);
                Err(StreamError::Closed)
            }
        }
    }
}
