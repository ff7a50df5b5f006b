use ctrlbox_core_store::{DataOut, Object, ObjectType, PlatformBytes, Result, Value};

use super::{TicksMillis, VirtualClock};

/// Virtual time at the moment of reading, as 4 native-order bytes.
pub struct CurrentTicksValue {
    clock: VirtualClock,
}

impl CurrentTicksValue {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }
}

impl Object for CurrentTicksValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::VALUE
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }
}

impl Value for CurrentTicksValue {
    fn read_stream_size(&self) -> u8 {
        TicksMillis::SIZE as u8
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        Ok(self.clock.millis().write_platform(out)?)
    }
}

/// Virtual time at the start of the current update pass.
///
/// Every value read during one cycle sees the same timestamp.
pub struct CurrentCycleTicksValue {
    clock: VirtualClock,
    cycle_ticks: TicksMillis,
}

impl CurrentCycleTicksValue {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            cycle_ticks: 0,
        }
    }

    pub fn cycle_ticks(&self) -> TicksMillis {
        self.cycle_ticks
    }
}

impl Object for CurrentCycleTicksValue {
    fn object_type(&self) -> ObjectType {
        ObjectType::VALUE
    }

    fn update(&mut self) {
        self.cycle_ticks = self.clock.millis();
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }
}

impl Value for CurrentCycleTicksValue {
    fn read_stream_size(&self) -> u8 {
        TicksMillis::SIZE as u8
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        Ok(self.cycle_ticks.write_platform(out)?)
    }
}
