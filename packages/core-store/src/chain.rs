//! Id chains: the address of an object in the tree.

use std::fmt;

use ctrlbox_ll_store::{DataIn, DataOut, StreamError};

use crate::object::{ContainerId, MAX_CONTAINER_DEPTH, MAX_CONTAINER_ID};
use crate::{Error, Result};

/// High bit on an encoded id: more ids follow.
pub const CHAIN_CONTINUES: u8 = 0x80;

/// A sequence of slot indexes leading from the root to a nested object.
///
/// The empty chain addresses the root itself. Chains are fixed-capacity and
/// `Copy`, so walking the tree never allocates.
///
/// # Wire format
///
/// One byte per id. Every id except the last has [`CHAIN_CONTINUES`] set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IdChain {
    ids: [ContainerId; MAX_CONTAINER_DEPTH],
    len: u8,
}

impl IdChain {
    /// The empty chain (the root).
    pub const fn new() -> Self {
        Self {
            ids: [0; MAX_CONTAINER_DEPTH],
            len: 0,
        }
    }

    /// Build a chain from slot indexes, validating each.
    pub fn from_ids(ids: &[ContainerId]) -> Result<Self> {
        let mut chain = Self::new();
        for id in ids {
            chain.push(*id)?;
        }
        Ok(chain)
    }

    /// Parse a chain written as `2/0/5`.
    ///
    /// Empty components are ignored, so `""` and `"/"` are the root.
    ///
    /// ```rust
    /// use ctrlbox_core_store::IdChain;
    ///
    /// let chain = IdChain::parse("2/0").unwrap();
    /// assert_eq!(chain.as_slice(), &[2, 0]);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let mut chain = Self::new();
        for component in s.split('/').filter(|c| !c.is_empty()) {
            let id: ContainerId = component.parse().map_err(|_| Error::InvalidChain {
                message: format!("'{}' is not a slot index", component),
            })?;
            chain.push(id)?;
        }
        Ok(chain)
    }

    /// Append a slot index.
    pub fn push(&mut self, id: ContainerId) -> Result<()> {
        if !(0..=MAX_CONTAINER_ID).contains(&id) {
            return Err(Error::InvalidSlot(id));
        }
        if self.len as usize >= MAX_CONTAINER_DEPTH {
            return Err(Error::InvalidChain {
                message: format!("deeper than {} levels", MAX_CONTAINER_DEPTH),
            });
        }
        self.ids[self.len as usize] = id;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the last slot index.
    pub fn pop(&mut self) -> Option<ContainerId> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // unused slots stay zeroed so derived equality only sees live ids
        Some(std::mem::take(&mut self.ids[self.len as usize]))
    }

    pub fn as_slice(&self) -> &[ContainerId] {
        &self.ids[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether another level can be appended.
    pub fn is_full(&self) -> bool {
        self.len as usize == MAX_CONTAINER_DEPTH
    }

    pub fn last(&self) -> Option<ContainerId> {
        self.as_slice().last().copied()
    }

    /// Write the chain in wire format.
    pub fn encode(&self, out: &mut dyn DataOut) -> std::result::Result<(), StreamError> {
        let ids = self.as_slice();
        for (i, id) in ids.iter().enumerate() {
            let mut byte = *id as u8;
            if i + 1 < ids.len() {
                byte |= CHAIN_CONTINUES;
            }
            out.write(byte)?;
        }
        Ok(())
    }

    /// The chain in wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let ids = self.as_slice();
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                if i + 1 < ids.len() {
                    *id as u8 | CHAIN_CONTINUES
                } else {
                    *id as u8
                }
            })
            .collect()
    }

    /// Read a chain in wire format, stopping after the first id without the
    /// continuation bit or when the stream runs dry.
    pub fn decode(input: &mut dyn DataIn) -> Result<Self> {
        let mut chain = Self::new();
        while input.has_next() {
            let byte = input.next();
            chain.push((byte & !CHAIN_CONTINUES) as ContainerId)?;
            if byte & CHAIN_CONTINUES == 0 {
                break;
            }
        }
        Ok(chain)
    }
}

impl fmt::Display for IdChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in self.as_slice() {
            if !first {
                f.write_str("/")?;
            }
            write!(f, "{}", id)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for IdChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdChain[{}]", self)
    }
}

impl std::ops::Index<usize> for IdChain {
    type Output = ContainerId;

    fn index(&self, i: usize) -> &Self::Output {
        &self.as_slice()[i]
    }
}

/// Macro for creating id chains from literal slot indexes.
///
/// # Example
///
/// ```rust
/// use ctrlbox_core_store::id_chain;
///
/// let chain = id_chain![2, 0];
/// assert_eq!(chain.len(), 2);
/// ```
#[macro_export]
macro_rules! id_chain {
    ($($id:expr),* $(,)?) => {
        $crate::IdChain::from_ids(&[$($id),*]).expect("invalid id chain literal")
    };
}
