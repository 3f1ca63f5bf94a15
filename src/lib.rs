#![doc = include_str!("../readme.md")]

use std::fmt;

pub mod board;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod registry;
pub mod samples;
pub mod stream;
pub mod transport;

pub use board::{BoardId, DeviceInfo};
pub use config::{DeviceConfig, DeviceSelector};
pub use device::Device;
pub use dispatch::BufferView;
pub use error::{Error, ErrorKind, Result, Usage};
pub use registry::{BoxError, CallbackRegistry, DeviceId, HandlerResult, Slot, StreamStats};
pub use samples::SampleStream;
pub use stream::StreamStatus;

/// USB vendor ID shared by all HackRF boards (OpenMoko).
pub const HACKRF_USB_VID: u16 = 0x1d50;

/**
 * Stream direction
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Receive: the driver fills buffers for the handler to read
    Rx,
    /// Transmit: the handler fills buffers for the driver to send
    Tx,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Rx, Direction::Tx];

    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Rx => 0,
            Direction::Tx => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}
