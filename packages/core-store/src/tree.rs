//! Navigating the object tree: scoped items, root slot, lookup and walking.

use std::cell::RefCell;
use std::ops::{ControlFlow, Deref};
use std::rc::Rc;

use ctrlbox_ll_store::DataIn;

use crate::chain::{IdChain, CHAIN_CONTINUES};
use crate::object::{same_object, ContainerId, ObjectRef};

/// An object borrowed from a container, released back to it on drop.
///
/// Containers that create items on demand free them on release; containers
/// that own their items treat release as a no-op. Either way the caller can't
/// forget to hand the item back.
pub struct Item {
    container: Option<ObjectRef>,
    id: ContainerId,
    object: ObjectRef,
}

impl Item {
    /// Take the object in slot `id` of `container`.
    ///
    /// Returns `None` for negative ids, empty slots, non-containers, and
    /// containers that are busy.
    pub fn acquire(container: &ObjectRef, id: ContainerId) -> Option<Item> {
        if id < 0 {
            return None;
        }
        let object = {
            let node = container.try_borrow().ok()?;
            node.as_container()?.item(id)?
        };
        Some(Item {
            container: Some(container.clone()),
            id,
            object,
        })
    }

    /// Wrap an object that was not obtained from a container.
    pub fn detached(object: ObjectRef) -> Item {
        Item {
            container: None,
            id: 0,
            object,
        }
    }

    /// The slot this item came from.
    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Step one level down.
    ///
    /// On a container this acquires slot `id`. On any other object, id 0 is a
    /// self-reference so chains can be padded with zeros.
    pub fn child(&self, id: ContainerId) -> Option<Item> {
        let id = id & !(CHAIN_CONTINUES as ContainerId);
        let size = {
            let node = self.object.try_borrow().ok()?;
            node.as_container().map(|c| c.size())
        };
        match size {
            Some(size) if id < size => Item::acquire(&self.object, id),
            Some(_) => None,
            None if id == 0 => Some(Item {
                container: None,
                id,
                object: self.object.clone(),
            }),
            None => None,
        }
    }
}

impl Deref for Item {
    type Target = ObjectRef;

    fn deref(&self) -> &ObjectRef {
        &self.object
    }
}

impl Drop for Item {
    fn drop(&mut self) {
        let Some(container) = &self.container else {
            return;
        };
        match container.try_borrow() {
            Ok(node) => {
                if let Some(c) = node.as_container() {
                    c.release(self.id, &self.object);
                }
            }
            Err(_) => log::warn!("container busy while releasing slot {}", self.id),
        }
    }
}

/// Shared handle to the current root container.
///
/// Commands may replace the root at any time between control-loop phases;
/// holders compare identities with [`RootSlot::is_current`] to detect that.
#[derive(Clone, Default)]
pub struct RootSlot {
    inner: Rc<RefCell<Option<ObjectRef>>>,
}

impl RootSlot {
    /// A slot with no root.
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot holding `root`.
    pub fn with_root(root: ObjectRef) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Some(root))),
        }
    }

    /// The current root, if any.
    pub fn get(&self) -> Option<ObjectRef> {
        self.inner.borrow().clone()
    }

    /// Install a new root, returning the previous one.
    pub fn replace(&self, root: Option<ObjectRef>) -> Option<ObjectRef> {
        log::debug!("root replaced");
        self.inner.replace(root)
    }

    /// Whether `root` is still the installed root.
    pub fn is_current(&self, root: &ObjectRef) -> bool {
        match &*self.inner.borrow() {
            Some(current) => same_object(current, root),
            None => false,
        }
    }
}

/// Resolve `chain` starting at `root`.
pub fn lookup(root: &ObjectRef, chain: &[ContainerId]) -> Option<Item> {
    let mut current = Item::detached(root.clone());
    for id in chain {
        current = current.child(*id)?;
    }
    Some(current)
}

/// Read an encoded chain from `data` and resolve it starting at `root`.
///
/// Stops after the first id without the continuation bit. An empty stream
/// resolves to the root itself.
pub fn lookup_stream(root: &ObjectRef, data: &mut dyn DataIn) -> Option<Item> {
    let mut current = Item::detached(root.clone());
    while data.has_next() {
        let byte = data.next();
        current = current.child(byte as ContainerId)?;
        if byte & CHAIN_CONTINUES == 0 {
            break;
        }
    }
    Some(current)
}

/// Receives enter/exit announcements while a tree is walked.
///
/// Each object is announced once on entry, before its children, and once on
/// exit, after them. The chain is the object's address; its length is the
/// depth. Returning `Break` stops the walk.
pub trait Visitor {
    fn enter(&mut self, object: &ObjectRef, chain: &IdChain) -> ControlFlow<()>;

    fn exit(&mut self, _object: &ObjectRef, _chain: &IdChain) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Walk the root and everything below it, depth first.
///
/// The root is announced with the empty chain.
pub fn walk_root(root: &ObjectRef, visitor: &mut dyn Visitor) -> ControlFlow<()> {
    let mut chain = IdChain::new();
    walk_object(root, visitor, &mut chain)
}

/// Walk `object` and, if it is a container, its contents.
pub fn walk_object(
    object: &ObjectRef,
    visitor: &mut dyn Visitor,
    chain: &mut IdChain,
) -> ControlFlow<()> {
    visitor.enter(object, chain)?;
    let size = object
        .try_borrow()
        .ok()
        .and_then(|o| o.as_container().map(|c| c.size()));
    if let Some(size) = size {
        walk_container(object, size, visitor, chain)?;
    }
    visitor.exit(object, chain)
}

fn walk_container(
    container: &ObjectRef,
    size: ContainerId,
    visitor: &mut dyn Visitor,
    chain: &mut IdChain,
) -> ControlFlow<()> {
    if chain.is_full() {
        log::warn!("container at {} is nested too deep to walk", chain);
        return ControlFlow::Continue(());
    }
    for id in 0..size.max(0) {
        let Some(item) = Item::acquire(container, id) else {
            continue;
        };
        if chain.push(id).is_err() {
            continue;
        }
        log::trace!("visiting {}", chain);
        let flow = walk_object(item.object(), visitor, chain);
        chain.pop();
        flow?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::FixedContainer;
    use crate::object::{object_ref, Container, Object};
    use ctrlbox_ll_store::BufferDataIn;
    use std::cell::Cell;

    struct Leaf;

    impl Object for Leaf {}

    fn is_leaf(item: &Item) -> bool {
        item.borrow().as_container().is_none()
    }

    /// root -> [leaf, container -> [leaf, leaf], empty, leaf]
    fn sample_tree() -> ObjectRef {
        let inner = FixedContainer::with_items(vec![
            Some(object_ref(Leaf)),
            Some(object_ref(Leaf)),
        ]);
        object_ref(FixedContainer::with_items(vec![
            Some(object_ref(Leaf)),
            Some(object_ref(inner)),
            None,
            Some(object_ref(Leaf)),
        ]))
    }

    struct Recorder {
        events: Vec<(bool, String)>,
        stop_at: Option<String>,
    }

    impl Visitor for Recorder {
        fn enter(&mut self, _object: &ObjectRef, chain: &IdChain) -> ControlFlow<()> {
            let at = chain.to_string();
            self.events.push((true, at.clone()));
            if self.stop_at.as_deref() == Some(at.as_str()) {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        }

        fn exit(&mut self, _object: &ObjectRef, chain: &IdChain) -> ControlFlow<()> {
            self.events.push((false, chain.to_string()));
            ControlFlow::Continue(())
        }
    }

    #[test]
    fn walk_announces_enter_and_exit_depth_first() {
        let root = sample_tree();
        let mut recorder = Recorder {
            events: Vec::new(),
            stop_at: None,
        };
        assert_eq!(walk_root(&root, &mut recorder), ControlFlow::Continue(()));

        let expected: Vec<(bool, String)> = vec![
            (true, ""),
            (true, "0"),
            (false, "0"),
            (true, "1"),
            (true, "1/0"),
            (false, "1/0"),
            (true, "1/1"),
            (false, "1/1"),
            (false, "1"),
            (true, "3"),
            (false, "3"),
            (false, ""),
        ]
        .into_iter()
        .map(|(e, s)| (e, s.to_string()))
        .collect();
        assert_eq!(recorder.events, expected);
    }

    #[test]
    fn walk_stops_on_break() {
        let root = sample_tree();
        let mut recorder = Recorder {
            events: Vec::new(),
            stop_at: Some("1/0".to_string()),
        };
        assert_eq!(walk_root(&root, &mut recorder), ControlFlow::Break(()));
        assert_eq!(recorder.events.last(), Some(&(true, "1/0".to_string())));
    }

    #[test]
    fn lookup_follows_chain() {
        let root = sample_tree();
        let item = lookup(&root, &[1, 1]).unwrap();
        assert_eq!(item.id(), 1);
        assert!(is_leaf(&item));

        assert!(lookup(&root, &[2]).is_none());
        assert!(lookup(&root, &[9]).is_none());
        assert!(lookup(&root, &[1, 5]).is_none());
    }

    #[test]
    fn zero_pads_non_containers() {
        let root = sample_tree();
        let direct = lookup(&root, &[0]).unwrap();
        let padded = lookup(&root, &[0, 0, 0]).unwrap();
        assert!(same_object(direct.object(), padded.object()));
        assert!(lookup(&root, &[0, 1]).is_none());
    }

    #[test]
    fn lookup_stream_reads_encoded_chain() {
        let root = sample_tree();
        let mut data = BufferDataIn::from_slice(&[0x81, 0x00, 0x42]);
        let item = lookup_stream(&root, &mut data).unwrap();
        let expected = lookup(&root, &[1, 0]).unwrap();
        assert!(same_object(item.object(), expected.object()));
        // the trailing byte is not part of the chain
        assert_eq!(data.next(), 0x42);
    }

    #[test]
    fn empty_chain_is_root() {
        let root = sample_tree();
        let item = lookup(&root, &[]).unwrap();
        assert!(same_object(item.object(), &root));
    }

    struct CountingContainer {
        released: Rc<Cell<usize>>,
    }

    impl Object for CountingContainer {
        fn as_container(&self) -> Option<&dyn Container> {
            Some(self)
        }
    }

    impl Container for CountingContainer {
        fn item(&self, _id: ContainerId) -> Option<ObjectRef> {
            Some(object_ref(Leaf))
        }

        fn release(&self, _id: ContainerId, _item: &ObjectRef) {
            self.released.set(self.released.get() + 1);
        }

        fn size(&self) -> ContainerId {
            3
        }
    }

    #[test]
    fn every_acquired_item_is_released() {
        let released = Rc::new(Cell::new(0));
        let root = object_ref(CountingContainer {
            released: released.clone(),
        });

        {
            let _item = Item::acquire(&root, 1).unwrap();
            assert_eq!(released.get(), 0);
        }
        assert_eq!(released.get(), 1);

        let mut recorder = Recorder {
            events: Vec::new(),
            stop_at: None,
        };
        let _ = walk_root(&root, &mut recorder);
        assert_eq!(released.get(), 4);
    }

    #[test]
    fn negative_ids_are_never_slots() {
        let root = sample_tree();
        assert!(Item::acquire(&root, -1).is_none());
    }

    #[test]
    fn root_slot_tracks_identity() {
        let r1 = sample_tree();
        let r2 = sample_tree();
        let slot = RootSlot::with_root(r1.clone());
        assert!(slot.is_current(&r1));

        let previous = slot.replace(Some(r2.clone())).unwrap();
        assert!(same_object(&previous, &r1));
        assert!(!slot.is_current(&r1));
        assert!(slot.is_current(&r2));

        slot.replace(None);
        assert!(slot.get().is_none());
        assert!(!slot.is_current(&r2));
    }
}
