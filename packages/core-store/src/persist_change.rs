use ctrlbox_ll_store::{DataIn, DataOut, NvAddress, SharedNv};

use crate::definition::ObjectDefinition;
use crate::masked::masked_byte;
use crate::object::{object_ref, Object, ObjectRef, ObjectType, Value, WritableValue};
use crate::Result;

/// A 2-byte signed value that persists itself only on significant change.
///
/// Region layout, native byte order:
///
/// ```text
/// address    : saved value (i16)
/// address + 2: threshold (i16)
/// ```
///
/// The live value streams big-endian. After a write the saved copy is
/// rewritten only when the live value is more than the threshold away from it.
pub struct PersistChangeValue {
    nv: SharedNv,
    address: Option<NvAddress>,
    current: i16,
}

impl PersistChangeValue {
    pub fn new(nv: SharedNv) -> Self {
        Self {
            nv,
            address: None,
            current: 0,
        }
    }

    pub fn create(definition: &mut ObjectDefinition<'_>) -> Option<ObjectRef> {
        Some(object_ref(PersistChangeValue::new(definition.nv.clone())))
    }

    /// The live value.
    pub fn value(&self) -> i16 {
        self.current
    }

    /// The persisted copy.
    pub fn saved_value(&self) -> Result<i16> {
        match self.address {
            Some(address) => self.read_i16(address),
            None => Ok(0),
        }
    }

    /// How far the live value may drift before it is persisted.
    pub fn threshold(&self) -> Result<i16> {
        match self.address {
            Some(address) => self.read_i16(address.wrapping_add(2)),
            None => Ok(0),
        }
    }

    fn read_i16(&self, offset: NvAddress) -> Result<i16> {
        let mut bytes = [0u8; 2];
        self.nv.borrow().read_block(&mut bytes, offset)?;
        Ok(i16::from_ne_bytes(bytes))
    }
}

impl Object for PersistChangeValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::VALUE | ObjectType::WRITABLE
    }

    fn rehydrated(&mut self, address: NvAddress) {
        self.address = Some(address);
        self.current = match self.read_i16(address) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("saved value at {:#06x} unreadable: {}", address, e);
                0
            }
        };
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableValue> {
        Some(self)
    }
}

impl Value for PersistChangeValue {
    fn read_stream_size(&self) -> u8 {
        2
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        Ok(out.write_buffer(&self.current.to_be_bytes())?)
    }
}

impl WritableValue for PersistChangeValue {
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        let mut bytes = self.current.to_be_bytes();
        for byte in bytes.iter_mut() {
            *byte = masked_byte(*byte, data.next(), mask.next());
        }
        self.current = i16::from_be_bytes(bytes);

        let Some(address) = self.address else {
            return Ok(());
        };
        let saved = self.saved_value()?;
        let threshold = self.threshold()?;
        let drift = (self.current as i32 - saved as i32).abs();
        if drift > threshold as i32 {
            log::debug!("persisting {} at {:#06x}", self.current, address);
            self.nv
                .borrow_mut()
                .write_block(address, &self.current.to_ne_bytes())?;
        }
        Ok(())
    }
}
