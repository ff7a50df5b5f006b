//! Values backed by regions of non-volatile storage.
//!
//! A persisted value owns a fixed region. By convention the byte just before
//! the region holds its length:
//!
//! ```text
//! address - 1: len
//! address    : payload[0..len]
//! ```
//!
//! Regions are never resized. Bounds are checked only by the storage driver,
//! which reports out-of-range access as [`NvError::OutOfRange`].
//!
//! [`NvError::OutOfRange`]: ctrlbox_ll_store::NvError::OutOfRange

use ctrlbox_ll_store::{DataIn, DataOut, NvAddress, NvDataOut, SharedNv};

use crate::definition::ObjectDefinition;
use crate::masked::next_masked_byte;
use crate::object::{object_ref, Object, ObjectRef, ObjectType, Value, WritableValue};
use crate::{Error, Result};

/// Streaming primitives over one store, each scoped to an (offset, length).
#[derive(Clone)]
pub struct NvRegion {
    nv: SharedNv,
}

impl NvRegion {
    pub fn new(nv: SharedNv) -> Self {
        Self { nv }
    }

    pub fn store(&self) -> &SharedNv {
        &self.nv
    }

    /// Stream `len` bytes starting at `offset` to `out`.
    ///
    /// A driver fault stops the read; only bytes actually read reach `out`.
    pub fn read_to(&self, out: &mut dyn DataOut, offset: NvAddress, len: u8) -> Result<()> {
        let mut address = offset;
        for _ in 0..len {
            let byte = self.nv.borrow().read_byte(address)?;
            out.write(byte)?;
            address = address.wrapping_add(1);
        }
        Ok(())
    }

    /// Copy up to `len` bytes from `input` into the region.
    pub fn write_from(&self, input: &mut dyn DataIn, offset: NvAddress, len: u8) -> Result<()> {
        let mut out = NvDataOut::new(self.nv.clone(), offset, len as usize);
        let pushed = input.push(&mut out, len as usize);
        if let Some(e) = out.take_error() {
            return Err(e.into());
        }
        pushed.map_err(Error::from)
    }

    /// Masked-write `len` bytes at `offset`, one byte at a time.
    ///
    /// Each byte is read, combined and written back before the next pair is
    /// consumed. A driver fault stops the write; the bytes before it stay
    /// updated.
    pub fn write_masked_from(
        &self,
        data: &mut dyn DataIn,
        mask: &mut dyn DataIn,
        offset: NvAddress,
        len: u8,
    ) -> Result<()> {
        let mut address = offset;
        for _ in 0..len {
            let current = self.nv.borrow().read_byte(address)?;
            let update = next_masked_byte(current, data, mask);
            self.nv.borrow_mut().write_byte(address, update)?;
            address = address.wrapping_add(1);
        }
        Ok(())
    }

    /// The length byte of the region at `address`.
    pub fn length_of(&self, address: NvAddress) -> Result<u8> {
        let Some(len_address) = address.checked_sub(1) else {
            return Err(ctrlbox_ll_store::NvError::OutOfRange {
                offset: address,
                len: 1,
                capacity: self.nv.borrow().len(),
            }
            .into());
        };
        Ok(self.nv.borrow().read_byte(len_address)?)
    }
}

/// A writable value whose bytes live in a length-prefixed region.
///
/// The value is unbound until [`Object::rehydrated`] gives it its address.
/// An unbound value, or one whose length byte is 0, reads and writes nothing.
pub struct EepromValue {
    region: NvRegion,
    address: Option<NvAddress>,
    app_type: u8,
}

impl EepromValue {
    pub fn new(nv: SharedNv) -> Self {
        Self {
            region: NvRegion::new(nv),
            address: None,
            app_type: 0,
        }
    }

    /// A value already bound to the region at `address`.
    pub fn at(nv: SharedNv, address: NvAddress) -> Self {
        Self {
            address: Some(address),
            ..Self::new(nv)
        }
    }

    pub fn with_app_type(mut self, app_type: u8) -> Self {
        self.app_type = app_type;
        self
    }

    /// Start of the payload, once bound.
    pub fn address(&self) -> Option<NvAddress> {
        self.address
    }

    pub fn region(&self) -> &NvRegion {
        &self.region
    }

    /// Construct from a definition. The value binds to its region when
    /// rehydrated.
    pub fn create(definition: &mut ObjectDefinition<'_>) -> Option<ObjectRef> {
        Some(object_ref(
            EepromValue::new(definition.nv.clone()).with_app_type(definition.app_type),
        ))
    }
}

impl Object for EepromValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::VALUE | ObjectType::WRITABLE
    }

    fn rehydrated(&mut self, address: NvAddress) {
        log::debug!("persisted value bound to {:#06x}", address);
        self.address = Some(address);
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableValue> {
        Some(self)
    }
}

impl Value for EepromValue {
    fn read_stream_size(&self) -> u8 {
        let Some(address) = self.address else {
            return 0;
        };
        match self.region.length_of(address) {
            Ok(len) => len,
            Err(e) => {
                log::warn!("length of region at {:#06x} unreadable: {}", address, e);
                0
            }
        }
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        match self.address {
            Some(address) => self.region.read_to(out, address, self.read_stream_size()),
            None => Ok(()),
        }
    }

    fn app_type(&self) -> u8 {
        self.app_type
    }
}

impl WritableValue for EepromValue {
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        match self.address {
            Some(address) => {
                let len = self.write_stream_size();
                self.region.write_masked_from(data, mask, address, len)
            }
            None => Ok(()),
        }
    }
}

/// A writable value over an explicit (offset, size) region.
///
/// Unlike [`EepromValue`] the size is fixed at construction and no length
/// byte is consulted.
pub struct EepromBlock {
    region: NvRegion,
    offset: NvAddress,
    size: u8,
}

impl EepromBlock {
    pub fn new(nv: SharedNv, offset: NvAddress, size: u8) -> Self {
        Self {
            region: NvRegion::new(nv),
            offset,
            size,
        }
    }

    pub fn offset(&self) -> NvAddress {
        self.offset
    }
}

impl Object for EepromBlock {
    fn object_type(&self) -> ObjectType {
        ObjectType::VALUE | ObjectType::WRITABLE
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableValue> {
        Some(self)
    }
}

impl Value for EepromBlock {
    fn read_stream_size(&self) -> u8 {
        self.size
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        self.region.read_to(out, self.offset, self.size)
    }
}

impl WritableValue for EepromBlock {
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        self.region
            .write_masked_from(data, mask, self.offset, self.size)
    }
}

/// Hands out length-prefixed regions from a range of the store, front to back.
///
/// Regions are never freed.
pub struct RegionAllocator {
    nv: SharedNv,
    next: NvAddress,
    end: NvAddress,
}

impl RegionAllocator {
    /// Allocate from `start..end`.
    pub fn new(nv: SharedNv, start: NvAddress, end: NvAddress) -> Self {
        Self {
            nv,
            next: start,
            end,
        }
    }

    /// Allocate from the whole store.
    pub fn whole(nv: SharedNv) -> Self {
        let end = nv.borrow().len();
        Self::new(nv, 0, end)
    }

    /// Bytes still available, length bytes included.
    pub fn available(&self) -> usize {
        self.end.saturating_sub(self.next) as usize
    }

    /// Reserve a region of `len` bytes and write its length byte.
    ///
    /// Returns the payload address, ready for `rehydrated`.
    pub fn allocate(&mut self, len: u8) -> Result<NvAddress> {
        let requested = len as usize + 1;
        let available = self.available();
        if requested > available {
            return Err(Error::StorageExhausted {
                requested,
                available,
            });
        }
        self.nv.borrow_mut().write_byte(self.next, len)?;
        let address = self.next + 1;
        self.next += requested as NvAddress;
        log::debug!("allocated {} bytes at {:#06x}", len, address);
        Ok(address)
    }

    /// Reserve a region holding `payload`.
    pub fn allocate_with(&mut self, payload: &[u8]) -> Result<NvAddress> {
        let len = u8::try_from(payload.len()).map_err(|_| Error::RegionTooLarge(payload.len()))?;
        let address = self.allocate(len)?;
        self.nv.borrow_mut().write_block(address, payload)?;
        Ok(address)
    }
}

/// The first two bytes of a value as a big-endian `i16`.
///
/// Values shorter than two bytes are zero-padded.
pub fn read_i16_from(value: &dyn Value) -> Result<i16> {
    let mut out = ctrlbox_ll_store::BufferDataOut::with_capacity(2);
    match value.read_to(&mut out) {
        Ok(()) | Err(Error::Stream(_)) => {}
        Err(e) => return Err(e),
    }
    let mut bytes = [0u8; 2];
    for (slot, byte) in bytes.iter_mut().zip(out.data()) {
        *slot = *byte;
    }
    Ok(i16::from_be_bytes(bytes))
}
