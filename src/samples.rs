//! Asynchronous sample stream
//!
//! [`SampleStream`] bridges the driver thread to async code: every received
//! buffer is copied out of the driver's memory, converted to complex samples
//! and sent over a bounded tokio channel. The driver thread never waits on
//! the consumer. When the channel is full the buffer is dropped and counted
//! instead.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use rs_hackrf::Device;
//!
//! # async fn example(device: &mut Device) -> Result<(), rs_hackrf::Error> {
//! let mut samples = device.rx_stream(32)?;
//! while let Some(chunk) = samples.next().await {
//!     println!("Got {} samples", chunk.len());
//! }
//! device.stop_rx()?;
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use num_complex::Complex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::dispatch::BufferView;
use crate::registry::HandlerResult;

/// Stream of received sample chunks, one per driver transfer.
///
/// Dropping the stream makes the next transfer fail, which halts RX; the
/// device still has to be stopped to release the stream.
pub struct SampleStream {
    rx: mpsc::Receiver<Vec<Complex<f32>>>,
    dropped: Arc<AtomicU64>,
}

impl SampleStream {
    /// Create a stream and the handler feeding it.
    pub(crate) fn channel(
        capacity: usize,
    ) -> (
        impl FnMut(BufferView<'_>) -> HandlerResult + Send + 'static,
        SampleStream,
    ) {
        let (tx, rx) = mpsc::channel::<Vec<Complex<f32>>>(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let counter = dropped.clone();

        let handler = move |buf: BufferView<'_>| -> HandlerResult {
            match tx.try_send(buf.to_complex()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(TrySendError::Closed(_)) => Err("sample stream receiver dropped".into()),
            }
        };
        (handler, SampleStream { rx, dropped })
    }

    /// Buffers discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Stream for SampleStream {
    type Item = Vec<Complex<f32>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
