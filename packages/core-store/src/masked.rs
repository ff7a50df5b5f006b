//! The masked-byte contract and native-order encoding of plain values.
//!
//! Every writable entity, persisted or not, applies updates with
//! [`masked_byte`]: bits set in the mask come from the new data, bits clear
//! in the mask keep their stored value.

use ctrlbox_ll_store::{DataIn, DataOut, StreamError};

/// Combine a stored byte with new data under a mask.
pub const fn masked_byte(current: u8, data: u8, mask: u8) -> u8 {
    (data & mask) | (current & !mask)
}

/// Consume one byte from each stream and apply it to `current`.
pub fn next_masked_byte(current: u8, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> u8 {
    let next = data.next();
    let mask = mask.next();
    masked_byte(current, next, mask)
}

/// Apply masked bytes to every byte of `target` in place.
pub fn apply_masked(target: &mut [u8], data: &mut dyn DataIn, mask: &mut dyn DataIn) {
    for byte in target.iter_mut() {
        *byte = next_masked_byte(*byte, data, mask);
    }
}

/// Plain values that stream in the platform's native byte order.
pub trait PlatformBytes: Copy + Default + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn write_platform(&self, out: &mut dyn DataOut) -> Result<(), StreamError>;

    /// Replace bytes of `self` under mask.
    fn read_platform_masked(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn);
}

macro_rules! impl_platform_bytes {
    ($($t:ty),*) => {
        $(
            impl PlatformBytes for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn write_platform(&self, out: &mut dyn DataOut) -> Result<(), StreamError> {
                    out.write_buffer(&self.to_ne_bytes())
                }

                fn read_platform_masked(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) {
                    let mut bytes = self.to_ne_bytes();
                    apply_masked(&mut bytes, data, mask);
                    *self = <$t>::from_ne_bytes(bytes);
                }
            }
        )*
    };
}

impl_platform_bytes!(u8, i8, u16, i16, u32, i32, u64, i64, f32);

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlbox_ll_store::{BufferDataIn, BufferDataOut, DefaultMask};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn masked_byte_takes_masked_bits(current: u8, data: u8, mask: u8) {
            let result = masked_byte(current, data, mask);
            prop_assert_eq!(result & mask, data & mask);
            prop_assert_eq!(result & !mask, current & !mask);
        }

        #[test]
        fn full_mask_yields_data(current: u8, data: u8) {
            prop_assert_eq!(masked_byte(current, data, 0xFF), data);
        }

        #[test]
        fn empty_mask_keeps_current(current: u8, data: u8) {
            prop_assert_eq!(masked_byte(current, data, 0x00), current);
        }
    }

    #[test]
    fn apply_consumes_streams_in_lockstep() {
        let mut target = [0xF0u8, 0x0F];
        let mut data = BufferDataIn::from_slice(&[0xAA, 0xAA]);
        let mut mask = BufferDataIn::from_slice(&[0x0F, 0xF0]);
        apply_masked(&mut target, &mut data, &mut mask);
        assert_eq!(target, [0xFA, 0xAF]);
        assert!(!data.has_next());
        assert!(!mask.has_next());
    }

    #[test]
    fn platform_bytes_use_native_order() {
        let mut out = BufferDataOut::new();
        0x1234u16.write_platform(&mut out).unwrap();
        assert_eq!(out.data(), &0x1234u16.to_ne_bytes());
    }

    #[test]
    fn platform_masked_read_replaces_selected_bytes() {
        let mut value: u32 = 0x1111_1111;
        let new = 0x2222_2222u32.to_ne_bytes();
        let mut data = BufferDataIn::from_slice(&new);
        value.read_platform_masked(&mut data, &mut DefaultMask);
        assert_eq!(value, 0x2222_2222);

        let mut data = BufferDataIn::from_slice(&0xFFFF_FFFFu32.to_ne_bytes());
        let mut mask = BufferDataIn::from_slice(&0x0000_00FFu32.to_ne_bytes());
        value.read_platform_masked(&mut data, &mut mask);
        assert_eq!(value, 0x2222_22FF);
    }
}
