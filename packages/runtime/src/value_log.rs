//! Logging every value in the tree as one framed message.
//!
//! Frame layout:
//!
//! ```text
//! tag
//! for each logged value, depth first:
//!     0x01  chain  app_type  size  payload[size]
//! ```
//!
//! A logged value is any value without the `NOT_LOGGED` flag.

use std::ops::ControlFlow;

use ctrlbox_core_store::{
    lookup, walk_object, walk_root, DataOut, IdChain, ObjectRef, Visitor,
};

use crate::error::{Result, RuntimeError};

/// Marks one value record within a log frame.
pub const VALUE_RECORD: u8 = 0x01;

/// Writes a record for every logged value it enters.
///
/// Stops at the first output failure and keeps the error.
pub struct LogVisitor<'a> {
    out: &'a mut dyn DataOut,
    logged: usize,
    error: Option<RuntimeError>,
}

impl<'a> LogVisitor<'a> {
    pub fn new(out: &'a mut dyn DataOut) -> Self {
        Self {
            out,
            logged: 0,
            error: None,
        }
    }

    /// Number of records written.
    pub fn logged(&self) -> usize {
        self.logged
    }

    /// The failure that stopped the walk, if any.
    pub fn finish(self) -> Result<usize> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.logged),
        }
    }

    fn write_record(&mut self, object: &ObjectRef, chain: &IdChain) -> Result<bool> {
        let Ok(node) = object.try_borrow() else {
            log::warn!("value at {} busy, not logged", chain);
            return Ok(false);
        };
        if !node.object_type().is_logged_value() {
            return Ok(false);
        }
        let Some(value) = node.as_value() else {
            return Ok(false);
        };
        self.out.write(VALUE_RECORD)?;
        chain.encode(self.out)?;
        self.out.write(value.app_type())?;
        self.out.write(value.read_stream_size())?;
        value.read_to(self.out)?;
        Ok(true)
    }
}

impl Visitor for LogVisitor<'_> {
    fn enter(&mut self, object: &ObjectRef, chain: &IdChain) -> ControlFlow<()> {
        match self.write_record(object, chain) {
            Ok(true) => {
                self.logged += 1;
                ControlFlow::Continue(())
            }
            Ok(false) => ControlFlow::Continue(()),
            Err(e) => {
                self.error = Some(e);
                ControlFlow::Break(())
            }
        }
    }
}

/// Write one log frame covering the whole tree and close the message.
///
/// Returns the number of values logged.
pub fn log_values(root: &ObjectRef, tag: u8, out: &mut dyn DataOut) -> Result<usize> {
    out.write(tag)?;
    let mut visitor = LogVisitor::new(out);
    let _ = walk_root(root, &mut visitor);
    let logged = visitor.finish();
    out.close();
    if let Ok(count) = &logged {
        log::debug!("logged {} values", count);
    }
    logged
}

/// Write one log frame covering the object at `chain` and everything below.
///
/// A chain that names nothing produces a frame with no records.
pub fn log_values_at(
    root: &ObjectRef,
    chain: &IdChain,
    tag: u8,
    out: &mut dyn DataOut,
) -> Result<usize> {
    out.write(tag)?;
    let mut visitor = LogVisitor::new(out);
    if let Some(item) = lookup(root, chain.as_slice()) {
        let mut at = *chain;
        let _ = walk_object(item.object(), &mut visitor, &mut at);
    }
    let logged = visitor.finish();
    out.close();
    logged
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlbox_core_store::{
        id_chain, object_ref, DynamicContainer, Object, ObjectType, OpenContainer,
        TransientValue, Value,
    };
    use ctrlbox_ll_store::BufferDataOut;

    struct Hidden;

    impl Object for Hidden {
        fn object_type(&self) -> ObjectType {
            ObjectType::VALUE | ObjectType::NOT_LOGGED
        }

        fn as_value(&self) -> Option<&dyn Value> {
            Some(self)
        }
    }

    impl Value for Hidden {
        fn read_stream_size(&self) -> u8 {
            1
        }

        fn read_to(&self, out: &mut dyn DataOut) -> ctrlbox_core_store::Result<()> {
            Ok(out.write(0xEE)?)
        }
    }

    /// root: [u8 = 7, hidden, [u8 = 9]]
    fn tree() -> ObjectRef {
        let mut inner = DynamicContainer::new();
        inner.add(0, object_ref(TransientValue::new(9u8))).unwrap();
        let mut root = DynamicContainer::new();
        root.add(0, object_ref(TransientValue::new(7u8))).unwrap();
        root.add(1, object_ref(Hidden)).unwrap();
        root.add(2, object_ref(inner)).unwrap();
        object_ref(root)
    }

    #[test]
    fn frame_holds_every_logged_value() {
        let root = tree();
        let mut out = BufferDataOut::new();
        let count = log_values(&root, 0x8A, &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            out.data(),
            &[
                0x8A, //
                0x01, 0x00, 0x00, 0x01, 7, //
                0x01, 0x82, 0x00, 0x00, 0x01, 9,
            ]
        );
        assert_eq!(out.messages_closed(), 1);
    }

    #[test]
    fn subtree_frame() {
        let root = tree();
        let mut out = BufferDataOut::new();
        let count = log_values_at(&root, &id_chain![2], 0x8A, &mut out).unwrap();
        assert_eq!(count, 1);
        assert_eq!(out.data(), &[0x8A, 0x01, 0x82, 0x00, 0x00, 0x01, 9]);

        let mut out = BufferDataOut::new();
        assert_eq!(log_values_at(&root, &id_chain![5], 0x8A, &mut out).unwrap(), 0);
        assert_eq!(out.data(), &[0x8A]);
    }

    #[test]
    fn full_output_stops_the_walk() {
        let root = tree();
        let mut out = BufferDataOut::with_capacity(4);
        let err = log_values(&root, 0x8A, &mut out).unwrap_err();
        assert!(matches!(err, RuntimeError::Object(_) | RuntimeError::Stream(_)));
        assert_eq!(out.messages_closed(), 1);
    }
}
