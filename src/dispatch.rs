//! Buffer views and the dispatch entry point called by the driver.
//!
//! The driver owns the sample memory. For the duration of one callback it
//! lends a region to the application through a [`BufferView`], whose lifetime
//! is tied to that call: the handler can read (RX) or fill (TX) the samples,
//! but keeping them requires an owned copy.

use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};

use num_complex::Complex;

use crate::registry::{CallbackRegistry, Slot};
use crate::Direction;

/// Returned to the driver to keep streaming.
pub const STREAM_CONTINUE: i32 = 0;

/// Returned to the driver to stop streaming.
pub const STREAM_STOP: i32 = -1;

/// Window onto one driver-owned transfer buffer.
///
/// Covers exactly the valid bytes reported by the driver, never the full
/// allocation behind it. Samples are interleaved signed 8-bit I/Q.
#[derive(Debug)]
pub struct BufferView<'a> {
    data: &'a mut [u8],
    direction: Direction,
}

impl<'a> BufferView<'a> {
    pub fn new(data: &'a mut [u8], direction: Direction) -> Self {
        Self { data, direction }
    }

    /// Build a view over driver memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes for `'a`, and
    /// nothing else may access that memory while the view exists.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize, direction: Direction) -> Self {
        let data: &'a mut [u8] = if len == 0 {
            Default::default()
        } else {
            std::slice::from_raw_parts_mut(ptr, len)
        };
        Self { data, direction }
    }

    /// Stream direction this buffer belongs to.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Convert the interleaved Cs8 samples to complex floats in [-1, 1).
    pub fn to_complex(&self) -> Vec<Complex<f32>> {
        cs8_to_complex(self.data)
    }
}

impl Deref for BufferView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl DerefMut for BufferView<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data
    }
}

/// Convert interleaved signed 8-bit I/Q bytes to complex samples.
///
/// A trailing odd byte is ignored.
pub fn cs8_to_complex(buffer: &[u8]) -> Vec<Complex<f32>> {
    buffer
        .chunks_exact(2)
        .map(|c| Complex::new((c[0] as i8) as f32 / 128.0, (c[1] as i8) as f32 / 128.0))
        .collect()
}

/// Route one driver transfer to the handler registered under `slot`.
///
/// Returns [`STREAM_CONTINUE`] when the handler succeeded and [`STREAM_STOP`]
/// otherwise: unknown slot, direction mismatch, a stream already halted by
/// its handler, a handler error, or a handler panic. Panics never unwind
/// past this function.
///
/// # Safety
///
/// `buffer` must point to at least `valid_length` bytes that stay valid and
/// unaliased until this function returns. A null `buffer` is accepted only
/// with a zero length.
pub unsafe fn dispatch(
    registry: &CallbackRegistry,
    direction: Direction,
    buffer: *mut u8,
    valid_length: usize,
    slot: Slot,
) -> i32 {
    let Some(context) = registry.lookup(slot) else {
        tracing::debug!("{} transfer for unregistered {}, stopping", direction, slot);
        return STREAM_STOP;
    };

    if context.direction() != direction {
        tracing::warn!(
            "{} transfer delivered to {} registered for {}, stopping",
            direction,
            slot,
            context.direction()
        );
        return STREAM_STOP;
    }

    if context.is_halted() {
        return STREAM_STOP;
    }

    if buffer.is_null() && valid_length != 0 {
        tracing::warn!("{} transfer with null buffer of {} bytes", direction, valid_length);
        context.halt();
        return STREAM_STOP;
    }

    let view = BufferView::from_raw(buffer, valid_length, direction);
    // The handler's error is reported and dropped inside the guard: its
    // Display or Drop may panic too.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match context.invoke(view) {
        Ok(()) => true,
        Err(e) => {
            context.halt();
            tracing::warn!("{} handler for {} failed: {}", direction, slot, e);
            false
        }
    }));
    match outcome {
        Ok(true) => STREAM_CONTINUE,
        Ok(false) => STREAM_STOP,
        Err(payload) => {
            context.halt();
            // A panicking payload destructor must not unwind past here either
            let _ = panic::catch_unwind(AssertUnwindSafe(move || drop(payload)));
            tracing::warn!("{} handler for {} panicked", direction, slot);
            STREAM_STOP
        }
    }
}
