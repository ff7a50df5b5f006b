//! Object creation from a definition stream.

use ctrlbox_ll_store::{DataIn, RegionDataIn, SharedNv};

use crate::object::ObjectRef;
use crate::tree::RootSlot;

/// Everything a constructor needs to build one object.
///
/// The definition block is read from `input`, which is limited to `len`
/// bytes. Constructors need not consume all of it; the caller spools the rest.
pub struct ObjectDefinition<'a> {
    /// Store that persisted objects bind to.
    pub nv: SharedNv,

    /// The tree being built, for objects that resolve other objects.
    pub root: RootSlot,

    /// The definition block.
    pub input: &'a mut dyn DataIn,

    /// Length of the definition block in bytes.
    pub len: u8,

    /// Application-defined type of the new object.
    pub app_type: u8,
}

impl ObjectDefinition<'_> {
    /// Consume whatever is left of the definition block.
    ///
    /// A no-op once the block has been read in full.
    pub fn spool(&mut self) {
        while self.input.has_next() {
            self.input.next();
        }
    }
}

/// Builds an object from its definition, or `None` if the definition is
/// rejected.
pub type ObjectFactory = fn(&mut ObjectDefinition<'_>) -> Option<ObjectRef>;

/// Read `type, len, block` from `input` and hand the block to `factory`.
///
/// The block is always consumed in full, whether or not an object was made,
/// so `input` is left positioned after the definition.
pub fn create_object(
    input: &mut dyn DataIn,
    nv: SharedNv,
    root: RootSlot,
    factory: ObjectFactory,
) -> Option<ObjectRef> {
    let app_type = input.next();
    let len = input.next();
    let mut block = RegionDataIn::new(input, len as usize);
    let mut definition = ObjectDefinition {
        nv,
        root,
        input: &mut block,
        len,
        app_type,
    };
    let object = factory(&mut definition);
    definition.spool();
    if object.is_none() {
        log::debug!("definition of type {} rejected", app_type);
    }
    object
}

/// A factory that accepts nothing. Useful as the fallback for unknown types.
pub fn null_factory(definition: &mut ObjectDefinition<'_>) -> Option<ObjectRef> {
    definition.spool();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{object_ref, Object};
    use ctrlbox_ll_store::{share, ArrayNvStore, BufferDataIn};

    struct Tagged;

    impl Object for Tagged {}

    fn first_byte_factory(def: &mut ObjectDefinition<'_>) -> Option<ObjectRef> {
        // reads one byte of the block and leaves the rest
        let flag = def.input.next();
        (flag == 1).then(|| object_ref(Tagged))
    }

    #[test]
    fn block_is_spooled_after_create() {
        let mut input = BufferDataIn::from_slice(&[7, 3, 1, 0xAA, 0xBB, 0x42]);
        let made = create_object(
            &mut input,
            share(ArrayNvStore::new(8)),
            RootSlot::new(),
            first_byte_factory,
        );
        assert!(made.is_some());
        assert_eq!(input.next(), 0x42);
    }

    #[test]
    fn rejected_definition_is_still_consumed() {
        let mut input = BufferDataIn::from_slice(&[7, 2, 0, 0xAA, 0x42]);
        let made = create_object(
            &mut input,
            share(ArrayNvStore::new(8)),
            RootSlot::new(),
            first_byte_factory,
        );
        assert!(made.is_none());
        assert_eq!(input.next(), 0x42);
    }

    #[test]
    fn null_factory_consumes_block() {
        let mut input = BufferDataIn::from_slice(&[1, 2, 9, 9, 0x42]);
        let made = create_object(
            &mut input,
            share(ArrayNvStore::new(8)),
            RootSlot::new(),
            null_factory,
        );
        assert!(made.is_none());
        assert_eq!(input.next(), 0x42);
    }
}
