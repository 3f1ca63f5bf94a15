//! Callback registry shared between application threads and driver threads.
//!
//! The native driver can only carry an opaque pointer-sized token back into
//! the streaming callback. The registry maps that token, a [`Slot`], to the
//! [`StreamContext`] holding the application's handler. Slots are indices
//! into a table of optional contexts: removing a registration leaves a hole
//! that the next registration fills, so every other slot keeps its
//! identity.
//!
//! Lookups take a shared lock just long enough to clone the context's `Arc`;
//! handlers never run while the registry lock is held.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::dispatch::BufferView;
use crate::Direction;

/// Boxed error returned by a streaming handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a streaming handler. `Err` stops the stream.
pub type HandlerResult = std::result::Result<(), BoxError>;

/// A streaming handler, invoked once per transfer on the driver thread.
pub type Handler = Box<dyn FnMut(BufferView<'_>) -> HandlerResult + Send>;

/// Opaque token identifying an active registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(usize);

impl Slot {
    /// Rebuild a slot from the value carried through the driver.
    pub fn from_raw(raw: usize) -> Self {
        Slot(raw)
    }

    /// Value handed to the driver as the callback context.
    pub fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Identifier of the device owning a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub(crate) u64);

impl DeviceId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DeviceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Transfer counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Buffers handed to the handler
    pub transfers: u64,
    /// Bytes handed to the handler
    pub bytes: u64,
}

/// Everything a dispatch needs to reach the application's handler.
pub struct StreamContext {
    direction: Direction,
    device: DeviceId,
    handler: Mutex<Handler>,
    halted: AtomicBool,
    transfers: AtomicU64,
    bytes: AtomicU64,
}

impl StreamContext {
    pub fn new(direction: Direction, device: DeviceId, handler: Handler) -> Self {
        Self {
            direction,
            device,
            handler: Mutex::new(handler),
            halted: AtomicBool::new(false),
            transfers: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Whether the handler has requested the stream to stop.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    pub(crate) fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            transfers: self.transfers.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    /// Run the handler on one buffer.
    pub(crate) fn invoke(&self, view: BufferView<'_>) -> HandlerResult {
        let len = view.len() as u64;
        let mut handler = self.handler.lock();
        let result = (&mut *handler)(view);
        self.transfers.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len, Ordering::Relaxed);
        result
    }
}

impl fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamContext")
            .field("direction", &self.direction)
            .field("device", &self.device)
            .field("halted", &self.is_halted())
            .finish_non_exhaustive()
    }
}

/// Table of active streaming contexts, keyed by [`Slot`].
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    slots: RwLock<Vec<Option<Arc<StreamContext>>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by the native callback trampolines.
    ///
    /// Created on first use and never torn down: the driver may still hold a
    /// slot from it until the last stream has been stopped.
    pub fn global() -> &'static Arc<CallbackRegistry> {
        static GLOBAL: OnceLock<Arc<CallbackRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(CallbackRegistry::new()))
    }

    /// Store a context, reusing the lowest free slot.
    pub fn register(&self, context: StreamContext) -> Slot {
        let context = Arc::new(context);
        let mut slots = self.slots.write();
        let slot = match slots.iter().position(Option::is_none) {
            Some(index) => {
                slots[index] = Some(context);
                index
            }
            None => {
                slots.push(Some(context));
                slots.len() - 1
            }
        };
        tracing::debug!("registered stream context in slot {}", slot);
        Slot(slot)
    }

    /// Resolve a slot to its context, if still registered.
    pub fn lookup(&self, slot: Slot) -> Option<Arc<StreamContext>> {
        self.slots.read().get(slot.0).and_then(|entry| entry.clone())
    }

    /// Remove a registration, leaving a hole for reuse.
    pub fn unregister(&self, slot: Slot) -> Option<Arc<StreamContext>> {
        let removed = self.slots.write().get_mut(slot.0).and_then(|entry| entry.take());
        if removed.is_some() {
            tracing::debug!("unregistered stream context from slot {}", slot.0);
        }
        removed
    }

    /// Number of live registrations.
    pub fn active(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }

    /// Table length, holes included.
    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no registration is live; holes don't count.
    pub fn is_empty(&self) -> bool {
        self.active() == 0
    }
}
