//! The capability model: Object, Value, WritableValue, Container.

use std::cell::RefCell;
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;

use ctrlbox_ll_store::{DataIn, DataOut, NvAddress};

use crate::Result;

/// Index of a slot in a container. Only `0..=126` address objects.
pub type ContainerId = i8;

/// Milliseconds an object needs before it can be updated. 0 means ready now.
pub type PrepareMillis = u16;

/// Deepest nesting an id chain can address.
pub const MAX_CONTAINER_DEPTH: usize = 8;

/// Highest slot index a container can have.
///
/// A container holds at most `MAX_CONTAINER_ID + 1` slots, so its size always
/// fits a `ContainerId`.
pub const MAX_CONTAINER_ID: ContainerId = 126;

/// Most slots a container can have.
pub const MAX_CONTAINER_SLOTS: usize = MAX_CONTAINER_ID as usize + 1;

/// A node in the object tree.
///
/// The tree is driven by a single thread, so nodes are shared with `Rc` and
/// borrowed for the length of one operation.
pub type ObjectRef = Rc<RefCell<dyn Object>>;

/// Wrap a concrete object as a tree node.
pub fn object_ref<O: Object + 'static>(object: O) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

/// Type flags describing which capabilities an object has.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ObjectType(pub u8);

impl ObjectType {
    /// A plain object with no further capability.
    pub const OBJECT: ObjectType = ObjectType(0);

    /// The object is a value and can be read as a stream.
    pub const VALUE: ObjectType = ObjectType(4);

    /// Writable flag. Combined with `VALUE`, the value accepts masked writes.
    pub const WRITABLE: ObjectType = ObjectType(1);

    /// The value exposes typed state as well as a stream.
    pub const STATE: ObjectType = ObjectType(2);

    /// A stream-readable, stream-writable value.
    pub const WRITABLE_VALUE: ObjectType = ObjectType(5);

    /// The object is a container.
    pub const CONTAINER: ObjectType = ObjectType(8);

    /// A container that accepts new objects.
    pub const OPEN_CONTAINER: ObjectType = ObjectType(9);

    /// The value is skipped when all values are logged.
    pub const NOT_LOGGED: ObjectType = ObjectType(16);

    /// The object is not owned by the tree.
    pub const STATICALLY_ALLOCATED: ObjectType = ObjectType(32);

    /// The raw flag byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every flag in `flags` is set.
    pub const fn contains(self, flags: ObjectType) -> bool {
        self.0 & flags.0 == flags.0
    }

    pub const fn is_value(self) -> bool {
        self.contains(Self::VALUE)
    }

    pub const fn is_writable_value(self) -> bool {
        self.contains(Self::WRITABLE_VALUE)
    }

    pub const fn is_container(self) -> bool {
        self.contains(Self::CONTAINER)
    }

    pub const fn is_open_container(self) -> bool {
        self.contains(Self::OPEN_CONTAINER)
    }

    /// A value that takes part in "log all values".
    pub const fn is_logged_value(self) -> bool {
        self.0 & (Self::VALUE.0 | Self::NOT_LOGGED.0) == Self::VALUE.0
    }

    pub const fn is_dynamically_allocated(self) -> bool {
        !self.contains(Self::STATICALLY_ALLOCATED)
    }
}

impl BitOr for ObjectType {
    type Output = ObjectType;

    fn bitor(self, rhs: ObjectType) -> ObjectType {
        ObjectType(self.0 | rhs.0)
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectType({:#04x})", self.0)
    }
}

/// The universal base capability.
///
/// Every addressable entity is an `Object`. The capability accessors
/// (`as_value`, `as_writable`, ...) return `Some` only for implementations that
/// actually have that capability, which replaces casting on the type flags.
pub trait Object {
    /// The capability flags. Has no side effects on plain objects.
    fn object_type(&self) -> ObjectType {
        ObjectType::OBJECT
    }

    /// The object's definition lives at `address` in non-volatile storage.
    fn rehydrated(&mut self, _address: NvAddress) {}

    /// Start of a control cycle. Returns how long the object needs before
    /// `update` can run.
    fn prepare(&mut self) -> PrepareMillis {
        0
    }

    /// Advance internal state by one control cycle.
    fn update(&mut self) {}

    fn as_value(&self) -> Option<&dyn Value> {
        None
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableValue> {
        None
    }

    fn as_container(&self) -> Option<&dyn Container> {
        None
    }

    fn as_open_container(&mut self) -> Option<&mut dyn OpenContainer> {
        None
    }
}

/// An object whose current value can be streamed out.
pub trait Value: Object {
    /// Number of bytes `read_to` produces.
    fn read_stream_size(&self) -> u8;

    /// Serialize exactly `read_stream_size()` bytes.
    fn read_to(&self, out: &mut dyn DataOut) -> Result<()>;

    /// Application-defined type. 0 for system objects.
    fn app_type(&self) -> u8 {
        0
    }
}

/// A value that accepts masked partial updates.
pub trait WritableValue: Value {
    /// Number of masked bytes `write_masked_from` consumes.
    fn write_stream_size(&self) -> u8 {
        self.read_stream_size()
    }

    /// Apply `write_stream_size()` bytes of data under mask.
    ///
    /// For every bit set in the mask the data bit is taken; for every bit
    /// clear the stored bit is kept. The streams must hold at least
    /// `write_stream_size()` bytes each; this is not checked.
    fn write_masked_from(&mut self, data: &mut dyn DataIn, mask: &mut dyn DataIn) -> Result<()>;
}

/// An indexed collection of objects.
///
/// Every item obtained with `item` must be handed back with `release`. Use
/// [`Item`](crate::Item) to have that done on drop.
pub trait Container: Object {
    /// The object in slot `id`, if any. Negative ids never name a slot.
    fn item(&self, id: ContainerId) -> Option<ObjectRef>;

    /// Hand back an item previously obtained from `item`.
    fn release(&self, _id: ContainerId, _item: &ObjectRef) {}

    /// Upper bound (exclusive) of slot indexes worth asking for.
    fn size(&self) -> ContainerId;
}

/// A container that accepts new objects.
pub trait OpenContainer: Container {
    /// Place `item` in slot `id`, replacing any previous occupant.
    fn add(&mut self, id: ContainerId, item: ObjectRef) -> Result<()>;

    /// The lowest free slot, or `None` when the container is full.
    fn next_free(&self) -> Option<ContainerId>;

    /// Remove and return the object in slot `id`. Missing slots are ignored.
    fn remove(&mut self, id: ContainerId) -> Option<ObjectRef>;
}

/// Flags of a tree node, or `OBJECT` if the node is busy.
pub fn object_type_of(object: &ObjectRef) -> ObjectType {
    match object.try_borrow() {
        Ok(o) => o.object_type(),
        Err(_) => {
            log::warn!("object busy while querying its type");
            ObjectType::OBJECT
        }
    }
}

/// Whether two tree nodes are the same object.
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::eq(
        Rc::as_ptr(a) as *const u8,
        Rc::as_ptr(b) as *const u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl Object for Plain {}

    #[test]
    fn flag_queries() {
        assert!(ObjectType::WRITABLE_VALUE.is_value());
        assert!(ObjectType::WRITABLE_VALUE.is_writable_value());
        assert!(!ObjectType::VALUE.is_writable_value());
        assert!(ObjectType::OPEN_CONTAINER.is_container());
        assert!(!ObjectType::CONTAINER.is_open_container());
        assert!(!ObjectType::OBJECT.is_value());
    }

    #[test]
    fn not_logged_values_are_excluded() {
        assert!(ObjectType::VALUE.is_logged_value());
        assert!(ObjectType::WRITABLE_VALUE.is_logged_value());
        assert!(!(ObjectType::VALUE | ObjectType::NOT_LOGGED).is_logged_value());
        assert!(!ObjectType::CONTAINER.is_logged_value());
    }

    #[test]
    fn static_flag() {
        assert!(ObjectType::VALUE.is_dynamically_allocated());
        assert!(!(ObjectType::VALUE | ObjectType::STATICALLY_ALLOCATED).is_dynamically_allocated());
    }

    #[test]
    fn plain_object_defaults() {
        let node = object_ref(Plain);
        assert_eq!(object_type_of(&node), ObjectType::OBJECT);
        let mut o = node.borrow_mut();
        assert_eq!(o.prepare(), 0);
        assert!(o.as_value().is_none());
        assert!(o.as_writable().is_none());
        assert!(o.as_container().is_none());
    }

    #[test]
    fn identity_is_by_allocation() {
        let a = object_ref(Plain);
        let b = object_ref(Plain);
        assert!(same_object(&a, &a.clone()));
        assert!(!same_object(&a, &b));
    }

    #[test]
    fn busy_object_reports_base_type() {
        let node = object_ref(Plain);
        let _guard = node.borrow_mut();
        assert_eq!(object_type_of(&node), ObjectType::OBJECT);
    }
}
