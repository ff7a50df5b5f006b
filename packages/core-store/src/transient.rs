use ctrlbox_ll_store::{DataIn, DataOut};

use crate::masked::PlatformBytes;
use crate::object::{Object, ObjectType, Value, WritableValue};
use crate::Result;

/// An in-memory typed value, streamed in native byte order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientValue<T: PlatformBytes> {
    value: T,
}

impl<T: PlatformBytes> TransientValue<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get_value(&self) -> T {
        self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: PlatformBytes> Object for TransientValue<T> {
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

impl<T: PlatformBytes> Value for TransientValue<T> {
    fn read_stream_size(&self) -> u8 {
        T::SIZE as u8
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        Ok(self.value.write_platform(out)?)
    }
}

impl<T: PlatformBytes> WritableValue for TransientValue<T> {
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        self.value.read_platform_masked(data, mask);
        Ok(())
    }
}
