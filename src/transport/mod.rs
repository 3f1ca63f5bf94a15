//! Native device handle abstraction.
//!
//! A [`Transport`] is the driver side of one opened radio. Every method
//! returns the driver's raw status code ([`HACKRF_SUCCESS`] on success);
//! [`Device`](crate::Device) translates failures with
//! [`check`](crate::error::check).
//!
//! Two implementations ship with the crate:
//! - [`sim::SimulatedTransport`], an in-process radio for tests and dry runs,
//! - `native::NativeTransport`, backed by libhackrf (requires the `native`
//!   feature).
//!
//! [`HACKRF_SUCCESS`]: crate::error::HACKRF_SUCCESS

use std::sync::Arc;

use crate::registry::{CallbackRegistry, Slot};
use crate::Direction;

#[cfg(feature = "native")]
pub mod native;
pub mod sim;

/// Size of one driver transfer buffer in bytes (libhackrf default).
pub const TRANSFER_BUFFER_SIZE: usize = 262_144;

/// Length of the buffer used to read the firmware version string.
pub const VERSION_STRING_LEN: usize = 128;

/// Highest tunable frequency in Hz.
pub const FREQ_MAX_HZ: u64 = 7_250_000_000;

/// Upper bounds of the gain stages, in dB.
pub const LNA_GAIN_MAX: u32 = 40;
pub const VGA_GAIN_MAX: u32 = 62;
pub const TXVGA_GAIN_MAX: u32 = 47;

/// Driver-side operations on one opened radio.
pub trait Transport: Send {
    /// Release the handle. No other method is called after a successful close.
    fn close(&mut self) -> i32;

    /// Read the firmware version string.
    fn version_string(&mut self) -> Result<String, i32>;

    fn set_freq(&mut self, freq_hz: u64) -> i32;

    fn set_sample_rate(&mut self, freq_hz: f64) -> i32;

    fn set_sample_rate_manual(&mut self, freq_hz: u32, divider: u32) -> i32;

    fn set_baseband_filter_bandwidth(&mut self, bandwidth_hz: u32) -> i32;

    fn set_amp_enable(&mut self, enable: bool) -> i32;

    fn set_lna_gain(&mut self, gain_db: u32) -> i32;

    fn set_vga_gain(&mut self, gain_db: u32) -> i32;

    fn set_txvga_gain(&mut self, gain_db: u32) -> i32;

    fn set_antenna_enable(&mut self, enable: bool) -> i32;

    /// Begin streaming in `direction`.
    ///
    /// Every transfer must be routed through
    /// [`dispatch`](crate::dispatch::dispatch) with `registry` and `slot`,
    /// and streaming must end once dispatch returns
    /// [`STREAM_STOP`](crate::dispatch::STREAM_STOP).
    fn start_streaming(
        &mut self,
        direction: Direction,
        registry: Arc<CallbackRegistry>,
        slot: Slot,
    ) -> i32;

    /// Stop streaming in `direction`.
    ///
    /// Must not return before the last dispatch for that direction has
    /// completed.
    fn stop_streaming(&mut self, direction: Direction) -> i32;
}
