//! Values that alias another object in the tree.

use std::cell::Cell;

use ctrlbox_ll_store::{DataIn, DataOut, NvAddress, NvDataIn, SharedNv};

use crate::definition::ObjectDefinition;
use crate::eeprom::EepromValue;
use crate::object::{
    object_ref, Object, ObjectRef, ObjectType, PrepareMillis, Value, WritableValue,
};
use crate::tree::{lookup_stream, Item, RootSlot};
use crate::Result;

/// Stands in for the object at a persisted id chain.
///
/// The chain is stored in the value's own region and resolved from the
/// current root on every access, so the alias follows replacements and
/// removals. While no object answers to the chain (or the target is busy)
/// every query returns a neutral default: base object type, zero delay,
/// zero sizes, and reads and writes that do nothing.
pub struct IndirectValue {
    chain: EepromValue,
    root: RootSlot,
    resolving: Cell<bool>,
}

impl IndirectValue {
    pub fn new(nv: SharedNv, root: RootSlot) -> Self {
        Self {
            chain: EepromValue::new(nv),
            root,
            resolving: Cell::new(false),
        }
    }

    /// An alias whose chain is already stored at `address`.
    pub fn at(nv: SharedNv, root: RootSlot, address: NvAddress) -> Self {
        Self {
            chain: EepromValue::at(nv, address),
            root,
            resolving: Cell::new(false),
        }
    }

    pub fn create(definition: &mut ObjectDefinition<'_>) -> Option<ObjectRef> {
        let mut value = IndirectValue::new(definition.nv.clone(), definition.root.clone());
        value.chain = value.chain.with_app_type(definition.app_type);
        Some(object_ref(value))
    }

    /// Resolve the stored chain against the current root.
    pub fn target(&self) -> Option<Item> {
        let address = self.chain.address()?;
        let root = self.root.get()?;
        let len = self.chain.read_stream_size() as usize;
        let mut data = NvDataIn::new(self.chain.region().store().clone(), address, len);
        let target = lookup_stream(&root, &mut data);
        if let Some(e) = data.take_error() {
            log::warn!("indirect chain at {:#06x} unreadable: {}", address, e);
            return None;
        }
        target
    }

    /// Run `f` on the target, or return `default`.
    ///
    /// A chain that leads back to this value resolves to nothing.
    fn with_target<R>(&self, default: R, f: impl FnOnce(&dyn Object) -> R) -> R {
        if self.resolving.replace(true) {
            return default;
        }
        let result = match self.target() {
            Some(item) => {
                let borrowed = item.try_borrow();
                match borrowed {
                    Ok(target) => f(&*target),
                    Err(_) => default,
                }
            }
            None => default,
        };
        self.resolving.set(false);
        result
    }

    fn with_target_mut<R>(&self, default: R, f: impl FnOnce(&mut dyn Object) -> R) -> R {
        if self.resolving.replace(true) {
            return default;
        }
        let result = match self.target() {
            Some(item) => {
                let borrowed = item.try_borrow_mut();
                match borrowed {
                    Ok(mut target) => f(&mut *target),
                    Err(_) => default,
                }
            }
            None => default,
        };
        self.resolving.set(false);
        result
    }
}

impl Object for IndirectValue {
    fn object_type(&self) -> ObjectType {
        self.with_target(ObjectType::OBJECT, |target| target.object_type())
    }

    fn rehydrated(&mut self, address: NvAddress) {
        self.chain.rehydrated(address);
    }

    fn prepare(&mut self) -> PrepareMillis {
        self.with_target_mut(0, |target| target.prepare())
    }

    fn as_value(&self) -> Option<&dyn Value> {
        Some(self)
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableValue> {
        Some(self)
    }
}

impl Value for IndirectValue {
    fn read_stream_size(&self) -> u8 {
        self.with_target(0, |target| {
            target.as_value().map(|v| v.read_stream_size()).unwrap_or(0)
        })
    }

    fn read_to(&self, out: &mut dyn DataOut) -> Result<()> {
        self.with_target(Ok(()), |target| match target.as_value() {
            Some(value) => value.read_to(out),
            None => Ok(()),
        })
    }

    fn app_type(&self) -> u8 {
        self.chain.app_type()
    }
}

impl WritableValue for IndirectValue {
    fn write_stream_size(&self) -> u8 {
        self.with_target_mut(0, |target| {
            target
                .as_writable()
                .map(|w| w.write_stream_size())
                .unwrap_or(0)
        })
    }

    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()> {
        self.with_target_mut(Ok(()), |target| match target.as_writable() {
            Some(writable) => writable.write_masked_from(data, mask),
            None => Ok(()),
        })
    }
}
