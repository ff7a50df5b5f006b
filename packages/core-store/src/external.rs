//! Values and containers whose data lives outside the object tree.

use std::cell::RefCell;
use std::rc::Rc;

use ctrlbox_ll_store::{DataIn, DataOut};

use crate::masked::next_masked_byte;
use crate::object::{Container, ContainerId, Object, ObjectRef, ObjectType, Value, WritableValue};
use crate::Result;

/// Process memory shared between the application and the values exposing it.
pub type SharedMemory = Rc<RefCell<Vec<u8>>>;

/// Exposes `size` bytes of shared memory starting at `offset`, read only.
///
/// Bytes outside the memory read as 0.
pub struct ExternalReadOnlyValue {
    memory: SharedMemory,
    offset: usize,
    size: u8,
}

impl ExternalReadOnlyValue {
    pub fn new(memory: SharedMemory, offset: usize, size: u8) -> Self {
        Self {
            memory,
            offset,
            size,
        }
    }

    fn write_bytes(&self, out: &mut dyn DataOut) -> Result<()> {
        let memory = self.memory.borrow();
        for i in 0..self.size as usize {
            let byte = memory.get(self.offset + i).copied().unwrap_or(0);
            out.write(byte)?;
        }
        Ok(())
    }
}

impl Object for ExternalReadOnlyValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::VALUE
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }
}

impl Value for ExternalReadOnlyValue {
    fn read_stream_size(&self) -> u8 {
        self.size
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        self.write_bytes(out)
    }
}

/// Exposes `size` bytes of shared memory starting at `offset`, writable in
/// place with the masked rule.
///
/// Bytes outside the memory read as 0 and ignore writes; their data and mask
/// bytes are still consumed.
pub struct ExternalValue {
    inner: ExternalReadOnlyValue,
}

impl ExternalValue {
    pub fn new(memory: SharedMemory, offset: usize, size: u8) -> Self {
        Self {
            inner: ExternalReadOnlyValue::new(memory, offset, size),
        }
    }
}

impl Object for ExternalValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::WRITABLE_VALUE
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableValue> {
        Some(self)
    }
}

impl Value for ExternalValue {
    fn read_stream_size(&self) -> u8 {
        self.inner.size
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        self.inner.write_bytes(out)
    }
}

impl WritableValue for ExternalValue {
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        let mut memory = self.inner.memory.borrow_mut();
        for i in 0..self.inner.size as usize {
            match memory.get_mut(self.inner.offset + i) {
                Some(byte) => *byte = next_masked_byte(*byte, data, mask),
                None => {
                    data.next();
                    mask.next();
                }
            }
        }
        Ok(())
    }
}

/// The slot index that asks an external source for its slot count.
pub const COUNT_INDEX: ContainerId = -1;

/// What an external source answers for one index.
#[derive(Clone)]
pub enum ExternalItem {
    /// The object in the slot.
    Object(ObjectRef),
    /// Number of slots, the answer to [`COUNT_INDEX`].
    Count(ContainerId),
    /// Nothing in this slot.
    Empty,
}

/// A container whose items are produced on demand by one function.
///
/// The function is asked for `id >= 0` to produce the item and for
/// [`COUNT_INDEX`] to report the slot count. Items are made per request and
/// freed once released.
pub struct ExternalValueContainer {
    source: Box<dyn Fn(ContainerId) -> ExternalItem>,
}

impl ExternalValueContainer {
    pub fn new(source: impl Fn(ContainerId) -> ExternalItem + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl Object for ExternalValueContainer {
    fn object_type(&self) -> ObjectType {
        ObjectType::CONTAINER
    }

    fn as_container(&self) -> Option<&dyn Container> {
        Some(self)
    }
}

impl Container for ExternalValueContainer {
    fn item(&self, id: ContainerId) -> Option<ObjectRef> {
        if id < 0 {
            return None;
        }
        match (self.source)(id) {
            ExternalItem::Object(object) => Some(object),
            ExternalItem::Count(_) | ExternalItem::Empty => None,
        }
    }

    fn size(&self) -> ContainerId {
        match (self.source)(COUNT_INDEX) {
            ExternalItem::Count(count) => count,
            _ => {
                log::warn!("external container source did not report a count");
                0
            }
        }
    }
}
