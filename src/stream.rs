//! Per-device streaming state machine.
//!
//! Each direction moves `Idle -> Streaming -> Idle` independently. Starting
//! registers a context before the driver is told to stream, so the first
//! transfer always finds its slot; stopping unregisters only after the
//! driver has quiesced, so no transfer can observe a reused slot.

use std::fmt;
use std::sync::Arc;

use crate::error::{check, Result, Usage};
use crate::registry::{CallbackRegistry, DeviceId, Handler, Slot, StreamContext, StreamStats};
use crate::transport::Transport;
use crate::Direction;

/// Observable state of one stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Not streaming.
    Idle,
    /// Streaming, handler healthy.
    Streaming,
    /// Handler failed and the driver is winding the stream down. The slot
    /// stays reserved until the direction is stopped.
    Halted,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamStatus::Idle => write!(f, "idle"),
            StreamStatus::Streaming => write!(f, "streaming"),
            StreamStatus::Halted => write!(f, "halted"),
        }
    }
}

pub(crate) struct StreamController {
    registry: Arc<CallbackRegistry>,
    device: DeviceId,
    slots: [Option<Slot>; 2],
}

impl StreamController {
    pub(crate) fn new(registry: Arc<CallbackRegistry>, device: DeviceId) -> Self {
        Self {
            registry,
            device,
            slots: [None; 2],
        }
    }

    pub(crate) fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub(crate) fn slot(&self, direction: Direction) -> Option<Slot> {
        self.slots[direction.index()]
    }

    pub(crate) fn start(
        &mut self,
        transport: &mut dyn Transport,
        direction: Direction,
        handler: Handler,
    ) -> Result<Slot> {
        if self.slots[direction.index()].is_some() {
            return Err(Usage::AlreadyStreaming(direction).into());
        }

        let slot = self
            .registry
            .register(StreamContext::new(direction, self.device, handler));
        if let Err(e) = check(transport.start_streaming(direction, self.registry.clone(), slot)) {
            self.registry.unregister(slot);
            tracing::debug!("{} start failed on {}: {}", direction, slot, e);
            return Err(e);
        }

        self.slots[direction.index()] = Some(slot);
        tracing::debug!("{} streaming on {}", direction, slot);
        Ok(slot)
    }

    pub(crate) fn stop(&mut self, transport: &mut dyn Transport, direction: Direction) -> Result<()> {
        let Some(slot) = self.slots[direction.index()] else {
            return Err(Usage::NotStreaming(direction).into());
        };

        check(transport.stop_streaming(direction))?;
        self.registry.unregister(slot);
        self.slots[direction.index()] = None;
        tracing::debug!("{} stopped, released {}", direction, slot);
        Ok(())
    }

    /// Stop every active direction, returning the first failure.
    pub(crate) fn stop_all(&mut self, transport: &mut dyn Transport) -> Result<()> {
        let mut result = Ok(());
        for direction in Direction::ALL {
            if self.slots[direction.index()].is_none() {
                continue;
            }
            tracing::warn!("forcing {} stream to stop", direction);
            if let Err(e) = self.stop(transport, direction) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    pub(crate) fn status(&self, direction: Direction) -> StreamStatus {
        match self.context(direction) {
            None => StreamStatus::Idle,
            Some(ctx) if ctx.is_halted() => StreamStatus::Halted,
            Some(_) => StreamStatus::Streaming,
        }
    }

    pub(crate) fn stats(&self, direction: Direction) -> Option<StreamStats> {
        self.context(direction).map(|ctx| ctx.stats())
    }

    fn context(&self, direction: Direction) -> Option<Arc<StreamContext>> {
        self.slots[direction.index()].and_then(|slot| self.registry.lookup(slot))
    }
}
