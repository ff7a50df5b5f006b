use std::cell::RefCell;
use std::rc::Rc;

use ctrlbox_core_store::{
    DataIn, DataOut, Object, ObjectRef, ObjectType, PlatformBytes, Result, Value, WritableValue,
};

use super::{time_since, SharedTicks, Ticks, TicksMillis, TicksSeconds};

/// Bytes on the wire: virtual millis (u32) then scale (u16), native order.
pub const SCALED_TICKS_STREAM_SIZE: u8 = 6;

/// Virtual time: `logical_start + (base_now - timer_start) * scale`.
///
/// Writing re-bases the clock at the current virtual time and then applies
/// the masked bytes to the logical start and the scale. Nothing is persisted.
pub struct ScaledTicksValue {
    logical_start: TicksMillis,
    timer_start: TicksMillis,
    scale: u16,
    base: SharedTicks,
}

impl ScaledTicksValue {
    /// Real time, unscaled.
    pub fn new(base: SharedTicks) -> Self {
        Self {
            logical_start: 0,
            timer_start: 0,
            scale: 1,
            base,
        }
    }

    /// Virtual time now.
    pub fn millis(&self) -> TicksMillis {
        self.millis_at(self.base.millis())
    }

    /// Virtual time at base time `now`.
    pub fn millis_at(&self, now: TicksMillis) -> TicksMillis {
        let offset = now.wrapping_sub(self.timer_start);
        self.logical_start
            .wrapping_add(offset.wrapping_mul(self.scale as TicksMillis))
    }

    pub fn seconds(&self) -> TicksSeconds {
        self.millis() / 1000
    }

    /// Seconds from `previous` to now.
    pub fn time_since(&self, previous: TicksSeconds) -> TicksSeconds {
        time_since(self.seconds(), previous)
    }

    pub fn scale(&self) -> u16 {
        self.scale
    }

    /// Base time right now.
    pub fn base_millis(&self) -> TicksMillis {
        self.base.millis()
    }
}

impl Ticks for ScaledTicksValue {
    fn millis(&self) -> TicksMillis {
        ScaledTicksValue::millis(self)
    }
}

impl Object for ScaledTicksValue {
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

impl Value for ScaledTicksValue {
    fn read_stream_size(&self) -> u8 {
        SCALED_TICKS_STREAM_SIZE
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        self.millis().write_platform(out)?;
        self.scale.write_platform(out)?;
        Ok(())
    }
}

impl WritableValue for ScaledTicksValue {
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        let now = self.base.millis();
        self.logical_start = self.millis_at(now);
        self.timer_start = now;
        self.logical_start.read_platform_masked(data, mask);
        self.scale.read_platform_masked(data, mask);
        log::debug!(
            "virtual clock set to {} ms, scale {}",
            self.logical_start,
            self.scale
        );
        Ok(())
    }
}

/// Shared handle to the virtual clock.
///
/// The same clock is read by the control loop and exposed in the tree as a
/// writable value, so hosts can shift and scale time.
#[derive(Clone)]
pub struct VirtualClock {
    inner: Rc<RefCell<ScaledTicksValue>>,
    base: SharedTicks,
}

impl VirtualClock {
    pub fn new(base: SharedTicks) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ScaledTicksValue::new(base.clone()))),
            base,
        }
    }

    /// Virtual time now.
    ///
    /// While the clock is being written, real time is reported.
    pub fn millis(&self) -> TicksMillis {
        match self.inner.try_borrow() {
            Ok(clock) => clock.millis(),
            Err(_) => {
                log::warn!("virtual clock busy, reading base time");
                self.base.millis()
            }
        }
    }

    pub fn seconds(&self) -> TicksSeconds {
        self.millis() / 1000
    }

    /// Seconds from `previous` to now.
    pub fn time_since(&self, previous: TicksSeconds) -> TicksSeconds {
        time_since(self.seconds(), previous)
    }

    /// Real time from the base counter, ignoring offset and scale.
    pub fn base_millis(&self) -> TicksMillis {
        self.base.millis()
    }

    /// The clock as a tree node.
    pub fn as_object(&self) -> ObjectRef {
        self.inner.clone()
    }

    /// Direct access to the clock value.
    pub fn value(&self) -> &Rc<RefCell<ScaledTicksValue>> {
        &self.inner
    }
}

impl Ticks for VirtualClock {
    fn millis(&self) -> TicksMillis {
        VirtualClock::millis(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTicks;
    use ctrlbox_ll_store::{BufferDataIn, BufferDataOut, DefaultMask};

    fn clock_at(start: TicksMillis) -> (Rc<ManualTicks>, ScaledTicksValue) {
        let base = Rc::new(ManualTicks::new(start));
        let value = ScaledTicksValue::new(base.clone());
        (base, value)
    }

    fn write_time(value: &mut ScaledTicksValue, millis: u32, scale: u16) {
        let mut bytes = millis.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&scale.to_ne_bytes());
        let mut data = BufferDataIn::from_slice(&bytes);
        value.write_masked_from(&mut data, &mut DefaultMask).unwrap();
    }

    #[test]
    fn unscaled_follows_base() {
        let (base, value) = clock_at(500);
        assert_eq!(value.millis(), 500);
        base.advance(1500);
        assert_eq!(value.millis(), 2000);
        assert_eq!(value.seconds(), 2);
    }

    #[test]
    fn scale_two_is_linear() {
        let (base, mut value) = clock_at(1000);
        write_time(&mut value, 10_000, 2);
        assert_eq!(value.millis(), 10_000);
        base.advance(100);
        assert_eq!(value.millis(), 10_200);
        base.advance(400);
        assert_eq!(value.millis(), 11_000);
    }

    #[test]
    fn empty_mask_rebases_without_changing_time() {
        let (base, mut value) = clock_at(0);
        write_time(&mut value, 0, 3);
        base.advance(10);
        assert_eq!(value.millis(), 30);

        let mut data = BufferDataIn::from_slice(&[0xFF; 6]);
        let mut mask = BufferDataIn::from_slice(&[0x00; 6]);
        value.write_masked_from(&mut data, &mut mask).unwrap();
        assert_eq!(value.millis(), 30);
        base.advance(10);
        assert_eq!(value.millis(), 60);
    }

    #[test]
    fn masked_write_changes_scale_only() {
        let (base, mut value) = clock_at(0);
        base.advance(50);
        let mut bytes = [0u8; 6];
        bytes[4..].copy_from_slice(&4u16.to_ne_bytes());
        let mut data = BufferDataIn::from_slice(&bytes);
        let mut mask = BufferDataIn::from_slice(&[0, 0, 0, 0, 0xFF, 0xFF]);
        value.write_masked_from(&mut data, &mut mask).unwrap();
        assert_eq!(value.scale(), 4);
        assert_eq!(value.millis(), 50);
        base.advance(5);
        assert_eq!(value.millis(), 70);
    }

    #[test]
    fn reads_six_bytes() {
        let (_, mut value) = clock_at(0);
        write_time(&mut value, 0x0102_0304, 7);
        let mut out = BufferDataOut::new();
        value.read_to(&mut out).unwrap();
        assert_eq!(value.read_stream_size(), 6);
        assert_eq!(&out.data()[..4], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(&out.data()[4..], &7u16.to_ne_bytes());
    }

    #[test]
    fn time_since_in_seconds() {
        let (base, value) = clock_at(0);
        base.set(61_000);
        assert_eq!(value.time_since(1), 60);
    }

    #[test]
    fn virtual_clock_is_shared_with_the_tree() {
        let base = Rc::new(ManualTicks::new(0));
        let clock = VirtualClock::new(base.clone());
        let node = clock.as_object();
        {
            let mut o = node.borrow_mut();
            let bytes = [0xE8, 0x03, 0, 0, 1, 0];
            let mut data = BufferDataIn::from_slice(&bytes);
            let mut mask = BufferDataIn::from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0]);
            o.as_writable()
                .unwrap()
                .write_masked_from(&mut data, &mut mask)
                .unwrap();
        }
        assert_eq!(clock.millis(), u32::from_ne_bytes([0xE8, 0x03, 0, 0]));

        let _busy = node.borrow_mut();
        base.set(77);
        assert_eq!(clock.millis(), 77);
        assert_eq!(clock.base_millis(), 77);
    }
}
