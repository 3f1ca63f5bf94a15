//! Simulated HackRF.
//!
//! [`SimulatedTransport`] behaves like an opened radio without touching USB:
//! settings are validated with libhackrf's rules and recorded, and streaming
//! transfers are produced on demand through the paired [`SimController`],
//! from whichever thread calls it. Each direction has a lane lock held for
//! the whole of a dispatch, so [`Transport::stop_streaming`] waits for an
//! in-flight transfer exactly like the native driver does.
//!
//! # Example
//!
//! ```
//! use rs_hackrf::transport::sim::{Delivery, SimulatedTransport};
//! use rs_hackrf::{CallbackRegistry, Device};
//! use std::sync::Arc;
//!
//! let (transport, radio) = SimulatedTransport::new();
//! let mut device = Device::with_transport(Box::new(transport), Arc::new(CallbackRegistry::new()));
//!
//! device.start_rx(|buf| {
//!     assert_eq!(buf.len(), 4);
//!     Ok(())
//! })?;
//! assert_eq!(radio.push_rx(&[1, 2, 3, 4]), Delivery::Continue);
//! device.stop_rx()?;
//! # Ok::<(), rs_hackrf::Error>(())
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    Transport, FREQ_MAX_HZ, LNA_GAIN_MAX, TRANSFER_BUFFER_SIZE, TXVGA_GAIN_MAX, VGA_GAIN_MAX,
};
use crate::dispatch::{dispatch, STREAM_CONTINUE};
use crate::error::{ErrorKind, HACKRF_SUCCESS};
use crate::filter::MAX2837_BANDWIDTHS;
use crate::registry::{CallbackRegistry, Slot};
use crate::Direction;

/// Byte written past the valid length of every simulated transfer.
pub const FILL_BYTE: u8 = 0xA5;

/// Version string reported by a fresh simulated radio.
pub const DEFAULT_VERSION: &str = "2024.02.1 (simulated)";

/// Result of driving one simulated transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The handler asked for more data.
    Continue,
    /// The handler stopped the stream; the lane is now idle.
    Stop,
    /// No stream is active in that direction.
    Idle,
}

/// Settings applied to the simulated radio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimSettings {
    pub freq_hz: Option<u64>,
    pub sample_rate_hz: Option<f64>,
    /// Divider of the last manual sample rate
    pub sample_rate_divider: Option<u32>,
    pub baseband_filter_hz: Option<u32>,
    pub amp_enabled: bool,
    pub lna_gain: u32,
    pub vga_gain: u32,
    pub txvga_gain: u32,
    pub antenna_enabled: bool,
}

struct Lane {
    registry: Arc<CallbackRegistry>,
    slot: Slot,
    buffer: Vec<u8>,
}

struct SimState {
    open: bool,
    version: String,
    settings: SimSettings,
    fail_start: [Option<i32>; 2],
    fail_stop: [Option<i32>; 2],
    fail_close: Option<i32>,
}

// Lock order: state, lane, active. `active` mirrors the lane's slot so
// queries never wait on a lane held across a dispatch.
struct Shared {
    state: Mutex<SimState>,
    lanes: [Mutex<Option<Lane>>; 2],
    active: [Mutex<Option<Slot>>; 2],
}

/// Driver half of a simulated radio, owned by a [`Device`](crate::Device).
pub struct SimulatedTransport {
    shared: Arc<Shared>,
}

/// Test half of a simulated radio: produces transfers and inspects state.
#[derive(Clone)]
pub struct SimController {
    shared: Arc<Shared>,
}

impl SimulatedTransport {
    /// Create a simulated radio and its controller.
    pub fn new() -> (SimulatedTransport, SimController) {
        let shared = Arc::new(Shared {
            state: Mutex::new(SimState {
                open: true,
                version: DEFAULT_VERSION.to_string(),
                settings: SimSettings::default(),
                fail_start: [None; 2],
                fail_stop: [None; 2],
                fail_close: None,
            }),
            lanes: [Mutex::new(None), Mutex::new(None)],
            active: [Mutex::new(None), Mutex::new(None)],
        });
        (
            SimulatedTransport {
                shared: shared.clone(),
            },
            SimController { shared },
        )
    }

    /// Validate and record one setting.
    fn apply(&mut self, valid: bool, update: impl FnOnce(&mut SimSettings)) -> i32 {
        let mut state = self.shared.state.lock();
        if !state.open || !valid {
            return ErrorKind::InvalidParam.code();
        }
        update(&mut state.settings);
        HACKRF_SUCCESS
    }
}

impl Transport for SimulatedTransport {
    fn close(&mut self) -> i32 {
        let mut state = self.shared.state.lock();
        if let Some(code) = state.fail_close.take() {
            return code;
        }
        if !state.open {
            return ErrorKind::InvalidParam.code();
        }
        for direction in Direction::ALL {
            let mut lane = self.shared.lanes[direction.index()].lock();
            *lane = None;
            *self.shared.active[direction.index()].lock() = None;
        }
        state.open = false;
        HACKRF_SUCCESS
    }

    fn version_string(&mut self) -> Result<String, i32> {
        let state = self.shared.state.lock();
        if !state.open {
            return Err(ErrorKind::InvalidParam.code());
        }
        let mut version = state.version.clone();
        // The native buffer keeps room for the terminating NUL
        let mut end = version.len().min(super::VERSION_STRING_LEN - 1);
        while !version.is_char_boundary(end) {
            end -= 1;
        }
        version.truncate(end);
        Ok(version)
    }

    fn set_freq(&mut self, freq_hz: u64) -> i32 {
        self.apply(freq_hz <= FREQ_MAX_HZ, |s| s.freq_hz = Some(freq_hz))
    }

    fn set_sample_rate(&mut self, freq_hz: f64) -> i32 {
        self.apply(freq_hz.is_finite() && freq_hz > 0.0, |s| {
            s.sample_rate_hz = Some(freq_hz);
            s.sample_rate_divider = None;
        })
    }

    fn set_sample_rate_manual(&mut self, freq_hz: u32, divider: u32) -> i32 {
        self.apply(freq_hz > 0 && divider > 0, |s| {
            s.sample_rate_hz = Some(freq_hz as f64 / divider as f64);
            s.sample_rate_divider = Some(divider);
        })
    }

    fn set_baseband_filter_bandwidth(&mut self, bandwidth_hz: u32) -> i32 {
        let valid = (MAX2837_BANDWIDTHS[0]..=MAX2837_BANDWIDTHS[MAX2837_BANDWIDTHS.len() - 1])
            .contains(&bandwidth_hz);
        self.apply(valid, |s| s.baseband_filter_hz = Some(bandwidth_hz))
    }

    fn set_amp_enable(&mut self, enable: bool) -> i32 {
        self.apply(true, |s| s.amp_enabled = enable)
    }

    fn set_lna_gain(&mut self, gain_db: u32) -> i32 {
        // The LNA has 8 dB steps; the firmware drops the remainder
        self.apply(gain_db <= LNA_GAIN_MAX, |s| s.lna_gain = gain_db & !0x07)
    }

    fn set_vga_gain(&mut self, gain_db: u32) -> i32 {
        self.apply(gain_db <= VGA_GAIN_MAX, |s| s.vga_gain = gain_db & !0x01)
    }

    fn set_txvga_gain(&mut self, gain_db: u32) -> i32 {
        self.apply(gain_db <= TXVGA_GAIN_MAX, |s| s.txvga_gain = gain_db)
    }

    fn set_antenna_enable(&mut self, enable: bool) -> i32 {
        self.apply(true, |s| s.antenna_enabled = enable)
    }

    fn start_streaming(
        &mut self,
        direction: Direction,
        registry: Arc<CallbackRegistry>,
        slot: Slot,
    ) -> i32 {
        let mut state = self.shared.state.lock();
        if !state.open {
            return ErrorKind::InvalidParam.code();
        }
        if let Some(code) = state.fail_start[direction.index()].take() {
            return code;
        }
        let mut lane = self.shared.lanes[direction.index()].lock();
        if lane.is_some() {
            return ErrorKind::Busy.code();
        }
        *lane = Some(Lane {
            registry,
            slot,
            buffer: vec![FILL_BYTE; TRANSFER_BUFFER_SIZE],
        });
        *self.shared.active[direction.index()].lock() = Some(slot);
        tracing::debug!("simulated {} streaming started on {}", direction, slot);
        HACKRF_SUCCESS
    }

    fn stop_streaming(&mut self, direction: Direction) -> i32 {
        if let Some(code) = self.shared.state.lock().fail_stop[direction.index()].take() {
            return code;
        }
        // Blocks until any in-flight transfer for this direction returns
        let mut lane = self.shared.lanes[direction.index()].lock();
        let stopped = lane.take();
        *self.shared.active[direction.index()].lock() = None;
        drop(lane);
        if let Some(lane) = stopped {
            tracing::debug!("simulated {} streaming stopped on {}", direction, lane.slot);
        }
        HACKRF_SUCCESS
    }
}

impl SimController {
    /// Deliver received bytes to the RX handler.
    ///
    /// Data longer than one transfer buffer is split into several transfers;
    /// delivery ends early if the handler stops the stream.
    pub fn push_rx(&self, data: &[u8]) -> Delivery {
        let mut guard = self.shared.lanes[Direction::Rx.index()].lock();
        let Some(lane) = guard.as_mut() else {
            return Delivery::Idle;
        };

        let mut delivery = Delivery::Continue;
        let chunks: Vec<&[u8]> = if data.is_empty() {
            vec![data]
        } else {
            data.chunks(TRANSFER_BUFFER_SIZE).collect()
        };
        for chunk in chunks {
            lane.buffer[..chunk.len()].copy_from_slice(chunk);
            lane.buffer[chunk.len()..].fill(FILL_BYTE);
            if Self::transfer(lane, Direction::Rx, chunk.len()) != STREAM_CONTINUE {
                delivery = Delivery::Stop;
                break;
            }
        }

        if delivery == Delivery::Stop {
            tracing::debug!("simulated RX stream unwound by handler");
            *guard = None;
            *self.shared.active[Direction::Rx.index()].lock() = None;
        }
        delivery
    }

    /// Ask the TX handler to fill `len` bytes (at most one transfer buffer).
    ///
    /// Returns the delivery outcome and the bytes the handler produced.
    pub fn pull_tx(&self, len: usize) -> (Delivery, Vec<u8>) {
        let mut guard = self.shared.lanes[Direction::Tx.index()].lock();
        let Some(lane) = guard.as_mut() else {
            return (Delivery::Idle, Vec::new());
        };

        let len = len.min(TRANSFER_BUFFER_SIZE);
        lane.buffer.fill(0);
        let status = Self::transfer(lane, Direction::Tx, len);
        let produced = lane.buffer[..len].to_vec();
        if status != STREAM_CONTINUE {
            tracing::debug!("simulated TX stream unwound by handler");
            *guard = None;
            *self.shared.active[Direction::Tx.index()].lock() = None;
            return (Delivery::Stop, produced);
        }
        (Delivery::Continue, produced)
    }

    fn transfer(lane: &mut Lane, direction: Direction, valid_length: usize) -> i32 {
        // SAFETY: the buffer is owned by the lane, which stays locked for the
        // whole dispatch, and valid_length never exceeds its length.
        unsafe {
            dispatch(
                &lane.registry,
                direction,
                lane.buffer.as_mut_ptr(),
                valid_length,
                lane.slot,
            )
        }
    }

    /// Settings applied so far.
    pub fn settings(&self) -> SimSettings {
        self.shared.state.lock().settings.clone()
    }

    /// Whether the handle has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.shared.state.lock().open
    }

    /// Whether the driver side is streaming in `direction`.
    ///
    /// Safe to call from a handler, including for its own direction.
    pub fn is_streaming(&self, direction: Direction) -> bool {
        self.active_slot(direction).is_some()
    }

    /// Slot the driver was handed for `direction`, if streaming.
    pub fn active_slot(&self, direction: Direction) -> Option<Slot> {
        *self.shared.active[direction.index()].lock()
    }

    /// Make the next start in `direction` fail with a native status code.
    pub fn fail_next_start(&self, direction: Direction, code: i32) {
        self.shared.state.lock().fail_start[direction.index()] = Some(code);
    }

    /// Make the next stop in `direction` fail with a native status code.
    pub fn fail_next_stop(&self, direction: Direction, code: i32) {
        self.shared.state.lock().fail_stop[direction.index()] = Some(code);
    }

    /// Make the next close fail with a native status code.
    pub fn fail_next_close(&self, code: i32) {
        self.shared.state.lock().fail_close = Some(code);
    }

    pub fn set_version<S: Into<String>>(&self, version: S) {
        self.shared.state.lock().version = version.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_validation() {
        let (mut transport, radio) = SimulatedTransport::new();
        assert_eq!(transport.set_lna_gain(41), ErrorKind::InvalidParam.code());
        assert_eq!(transport.set_lna_gain(30), HACKRF_SUCCESS);
        assert_eq!(transport.set_vga_gain(63), ErrorKind::InvalidParam.code());
        assert_eq!(transport.set_vga_gain(21), HACKRF_SUCCESS);
        assert_eq!(transport.set_txvga_gain(48), ErrorKind::InvalidParam.code());
        assert_eq!(transport.set_txvga_gain(47), HACKRF_SUCCESS);

        let settings = radio.settings();
        assert_eq!(settings.lna_gain, 24);
        assert_eq!(settings.vga_gain, 20);
        assert_eq!(settings.txvga_gain, 47);
    }

    #[test]
    fn test_frequency_and_rate_validation() {
        let (mut transport, radio) = SimulatedTransport::new();
        assert_eq!(transport.set_freq(FREQ_MAX_HZ + 1), ErrorKind::InvalidParam.code());
        assert_eq!(transport.set_freq(433_920_000), HACKRF_SUCCESS);
        assert_eq!(transport.set_sample_rate(0.0), ErrorKind::InvalidParam.code());
        assert_eq!(transport.set_sample_rate_manual(20_000_000, 2), HACKRF_SUCCESS);
        assert_eq!(transport.set_baseband_filter_bandwidth(1_000), ErrorKind::InvalidParam.code());

        let settings = radio.settings();
        assert_eq!(settings.freq_hz, Some(433_920_000));
        assert_eq!(settings.sample_rate_hz, Some(10_000_000.0));
        assert_eq!(settings.sample_rate_divider, Some(2));
        assert_eq!(settings.baseband_filter_hz, None);
    }

    #[test]
    fn test_closed_handle_rejects_calls() {
        let (mut transport, radio) = SimulatedTransport::new();
        assert_eq!(transport.close(), HACKRF_SUCCESS);
        assert!(!radio.is_open());
        assert_eq!(transport.close(), ErrorKind::InvalidParam.code());
        assert_eq!(transport.set_amp_enable(true), ErrorKind::InvalidParam.code());
        assert!(transport.version_string().is_err());
    }

    #[test]
    fn test_start_busy_when_lane_active() {
        let (mut transport, radio) = SimulatedTransport::new();
        let registry = Arc::new(CallbackRegistry::new());
        let slot = Slot::from_raw(0);
        assert_eq!(
            transport.start_streaming(Direction::Rx, registry.clone(), slot),
            HACKRF_SUCCESS
        );
        assert_eq!(
            transport.start_streaming(Direction::Rx, registry, slot),
            ErrorKind::Busy.code()
        );
        assert_eq!(radio.active_slot(Direction::Rx), Some(slot));
        assert_eq!(transport.stop_streaming(Direction::Rx), HACKRF_SUCCESS);
        assert!(!radio.is_streaming(Direction::Rx));
    }

    #[test]
    fn test_push_without_stream_is_idle() {
        let (_transport, radio) = SimulatedTransport::new();
        assert_eq!(radio.push_rx(&[0; 8]), Delivery::Idle);
        assert_eq!(radio.pull_tx(8), (Delivery::Idle, Vec::new()));
    }

    #[test]
    fn test_unregistered_slot_unwinds_lane() {
        let (mut transport, radio) = SimulatedTransport::new();
        let registry = Arc::new(CallbackRegistry::new());
        transport.start_streaming(Direction::Rx, registry, Slot::from_raw(9));
        assert_eq!(radio.push_rx(&[0; 8]), Delivery::Stop);
        assert!(!radio.is_streaming(Direction::Rx));
    }

    #[test]
    fn test_handler_can_query_own_lane() {
        use crate::registry::{DeviceId, StreamContext};

        let (mut transport, radio) = SimulatedTransport::new();
        let registry = Arc::new(CallbackRegistry::new());
        let seen = Arc::new(Mutex::new(None));

        let (probe, sink) = (radio.clone(), seen.clone());
        let slot = registry.register(StreamContext::new(
            Direction::Rx,
            DeviceId(0),
            Box::new(move |_| {
                assert!(probe.is_streaming(Direction::Rx));
                *sink.lock() = probe.active_slot(Direction::Rx);
                Ok(())
            }),
        ));
        transport.start_streaming(Direction::Rx, registry, slot);

        assert_eq!(radio.push_rx(&[0; 8]), Delivery::Continue);
        assert_eq!(*seen.lock(), Some(slot));
        assert_eq!(transport.stop_streaming(Direction::Rx), HACKRF_SUCCESS);
        assert_eq!(radio.active_slot(Direction::Rx), None);
    }

    #[test]
    fn test_version_string() {
        let (mut transport, radio) = SimulatedTransport::new();
        assert_eq!(transport.version_string().unwrap(), DEFAULT_VERSION);
        radio.set_version("x".repeat(200));
        assert_eq!(transport.version_string().unwrap().len(), 127);
    }
}
