//! Handle table
//!
//! Every object handed to the caller (keys, sessions, outputs, managers) is
//! named by an opaque [`Handle`]. The upper 8 bits carry the [`HandleType`],
//! the lower 24 bits an index drawn from a [`HandleAllocator`] shared by all
//! tables of one context.
//!
//! ```text
//!  31        24 23                               0
//! ┌────────────┬──────────────────────────────────┐
//! │ HandleType │ index (monotonic, never reused)  │
//! └────────────┴──────────────────────────────────┘
//! ```
//!
//! Because indices only grow, an index below the allocator's high-water
//! mark that is missing from its table was closed, while anything else is
//! an invalid handle.
//!
//! Operations that change state and then hand out a handle take a
//! [`Reservation`] first: once the index is held, publishing the resource
//! cannot fail, so a call never commits a change it cannot report.

use crate::error::{CryptoError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

pub type Handle = u32;

const TYPE_SHIFT: u32 = 24;
const INDEX_MASK: u32 = (1 << TYPE_SHIFT) - 1;

/// Resource kind encoded in a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleType {
    Options = 1,
    ArrayOutput = 2,
    Keypair = 3,
    PublicKey = 4,
    SecretKey = 5,
    Signature = 6,
    SignatureState = 7,
    VerificationState = 8,
    SymmetricKey = 9,
    SymmetricState = 10,
    SymmetricTag = 11,
    SecretsManager = 12,
}

/// Source of handle indices for one context.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU32,
    limit: u32,
}

impl HandleAllocator {
    /// `limit` is the highest index that may be issued; it is clamped to the
    /// 24 bits available in a handle.
    pub fn new(limit: u32) -> Self {
        Self {
            next: AtomicU32::new(1),
            limit: limit.min(INDEX_MASK),
        }
    }

    fn next_index(&self) -> Result<u32> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > self.limit {
                    None
                } else {
                    Some(n + 1)
                }
            })
            .map_err(|_| CryptoError::TooManyHandles)
    }

    fn was_issued(&self, index: u32) -> bool {
        index != 0 && index < self.next.load(Ordering::SeqCst)
    }

    /// Number of indices issued so far.
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::SeqCst) - 1
    }
}

/// Registry of live resources of a single [`HandleType`].
///
/// Resources are expected to be cheap to clone (`Arc`-backed): [`get`]
/// clones the entry out and releases the table lock immediately, so a
/// long operation on one resource never blocks lookups of another.
///
/// [`get`]: HandleTable::get
pub struct HandleTable<T> {
    kind: HandleType,
    allocator: Arc<HandleAllocator>,
    entries: RwLock<HashMap<u32, T>>,
}

impl<T: Clone> HandleTable<T> {
    pub fn new(kind: HandleType, allocator: Arc<HandleAllocator>) -> Self {
        Self {
            kind,
            allocator,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> HandleType {
        self.kind
    }

    /// Stores `resource` and returns its new handle.
    pub fn register(&self, resource: T) -> Result<Handle> {
        Ok(self.reserve()?.fill(resource))
    }

    /// Takes an index for a resource that does not exist yet. Dropping the
    /// reservation unused burns the index; it never becomes a live handle.
    pub fn reserve(&self) -> Result<Reservation<'_, T>> {
        let index = self.allocator.next_index()?;
        Ok(Reservation { table: self, index })
    }

    /// Resolves a handle to its resource.
    pub fn get(&self, handle: Handle) -> Result<T> {
        let index = self.decode(handle)?;
        self.entries
            .read()?
            .get(&index)
            .cloned()
            .ok_or(CryptoError::Closed)
    }

    /// Removes a handle; the resource itself lives on while other clones
    /// of it exist.
    pub fn close(&self, handle: Handle) -> Result<T> {
        let index = self.decode(handle)?;
        let removed = self
            .entries
            .write()?
            .remove(&index)
            .ok_or(CryptoError::Closed)?;
        trace!(target: "hostcrypto::handles", kind = ?self.kind, handle, "handle closed");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn decode(&self, handle: Handle) -> Result<u32> {
        if handle >> TYPE_SHIFT != self.kind as u32 {
            return Err(CryptoError::InvalidHandle);
        }
        let index = handle & INDEX_MASK;
        if !self.allocator.was_issued(index) {
            return Err(CryptoError::InvalidHandle);
        }
        Ok(index)
    }
}

/// Handle index held by a pending operation; see [`HandleTable::reserve`].
#[must_use]
pub struct Reservation<'a, T> {
    table: &'a HandleTable<T>,
    index: u32,
}

impl<T> Reservation<'_, T> {
    /// Publishes `resource` under the reserved index.
    pub fn fill(self, resource: T) -> Handle {
        let table = self.table;
        // После паники в другом потоке сама таблица остаётся целостной
        table
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.index, resource);
        let handle = ((table.kind as u32) << TYPE_SHIFT) | self.index;
        trace!(target: "hostcrypto::handles", kind = ?table.kind, handle, "handle registered");
        handle
    }
}
