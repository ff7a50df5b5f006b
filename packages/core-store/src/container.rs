//! Containers that own their items.

use crate::object::{
    Container, ContainerId, Object, ObjectRef, ObjectType, OpenContainer, MAX_CONTAINER_ID,
    MAX_CONTAINER_SLOTS,
};
use crate::{Error, Result};

/// A container with a fixed set of slots, assembled at construction.
#[derive(Default)]
pub struct FixedContainer {
    items: Vec<Option<ObjectRef>>,
}

impl FixedContainer {
    /// A container with `size` empty slots.
    pub fn new(size: usize) -> Self {
        Self {
            items: vec![None; size.min(MAX_CONTAINER_SLOTS)],
        }
    }

    /// A container holding `items` in order. Slots past the last id are dropped.
    pub fn with_items(mut items: Vec<Option<ObjectRef>>) -> Self {
        items.truncate(MAX_CONTAINER_SLOTS);
        Self { items }
    }

    /// Fill slot `id`. The slot must already exist.
    pub fn set(&mut self, id: ContainerId, item: ObjectRef) -> Result<()> {
        let slot = usize::try_from(id)
            .ok()
            .and_then(|i| self.items.get_mut(i))
            .ok_or(Error::InvalidSlot(id))?;
        *slot = Some(item);
        Ok(())
    }
}

impl Object for FixedContainer {
    fn object_type(&self) -> ObjectType {
        ObjectType::CONTAINER
    }

    fn as_container(&self) -> Option<&dyn Container> {
        Some(self)
    }
}

impl Container for FixedContainer {
    fn item(&self, id: ContainerId) -> Option<ObjectRef> {
        let index = usize::try_from(id).ok()?;
        self.items.get(index)?.clone()
    }

    fn size(&self) -> ContainerId {
        slot_count(self.items.len())
    }
}

/// Number of slots as a `ContainerId`. Slot vectors never exceed
/// `MAX_CONTAINER_SLOTS`, which fits.
fn slot_count(len: usize) -> ContainerId {
    ContainerId::try_from(len.min(MAX_CONTAINER_SLOTS)).unwrap_or(MAX_CONTAINER_ID)
}

/// An open container that grows as objects are added.
///
/// Slots are created on demand up to `MAX_CONTAINER_SLOTS` in total. Adding
/// to an occupied slot replaces the previous object.
#[derive(Default)]
pub struct DynamicContainer {
    items: Vec<Option<ObjectRef>>,
}

impl DynamicContainer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_index(id: ContainerId) -> Result<usize> {
        match usize::try_from(id) {
            Ok(index) if index < MAX_CONTAINER_SLOTS => Ok(index),
            _ => Err(Error::InvalidSlot(id)),
        }
    }
}

impl Object for DynamicContainer {
    fn object_type(&self) -> ObjectType {
        ObjectType::OPEN_CONTAINER
    }

    fn as_container(&self) -> Option<&dyn Container> {
        Some(self)
    }

    fn as_open_container(&mut self) -> Option<&mut dyn OpenContainer> {
        Some(self)
    }
}

impl Container for DynamicContainer {
    fn item(&self, id: ContainerId) -> Option<ObjectRef> {
        let index = usize::try_from(id).ok()?;
        self.items.get(index)?.clone()
    }

    fn size(&self) -> ContainerId {
        slot_count(self.items.len())
    }
}

impl OpenContainer for DynamicContainer {
    fn add(&mut self, id: ContainerId, item: ObjectRef) -> Result<()> {
        let index = Self::slot_index(id)?;
        if index >= self.items.len() {
            self.items.resize(index + 1, None);
        }
        if self.items[index].replace(item).is_some() {
            log::debug!("slot {} replaced", id);
        }
        Ok(())
    }

    fn next_free(&self) -> Option<ContainerId> {
        if let Some(index) = self.items.iter().position(Option::is_none) {
            return Some(index as ContainerId);
        }
        let size = self.items.len();
        (size < MAX_CONTAINER_SLOTS).then(|| slot_count(size))
    }

    fn remove(&mut self, id: ContainerId) -> Option<ObjectRef> {
        let index = usize::try_from(id).ok()?;
        self.items.get_mut(index)?.take()
    }
}
