//! HackRF device façade.
//!
//! A [`Device`] owns one native handle. Configuration calls are thin
//! pass-throughs to the driver; streaming goes through the per-device
//! state machine in [`stream`](crate::stream).

use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::dispatch::BufferView;
use crate::error::{check, translate, Error, Result, Usage};
use crate::filter::default_baseband_filter_bw;
use crate::registry::{CallbackRegistry, DeviceId, HandlerResult, Slot, StreamStats};
use crate::samples::SampleStream;
use crate::stream::{StreamController, StreamStatus};
use crate::transport::Transport;
use crate::Direction;

/// An opened HackRF.
///
/// Dropping an open device stops its streams and closes it; use
/// [`Device::close`] to observe failures.
pub struct Device {
    transport: Option<Box<dyn Transport>>,
    streams: StreamController,
    id: DeviceId,
}

impl Device {
    /// Wrap an opened native handle.
    ///
    /// `registry` must be the registry the transport dispatches into; native
    /// devices always use [`CallbackRegistry::global`].
    pub fn with_transport(transport: Box<dyn Transport>, registry: Arc<CallbackRegistry>) -> Self {
        let id = DeviceId::next();
        tracing::debug!("device {:?} opened", id);
        Self {
            transport: Some(transport),
            streams: StreamController::new(registry, id),
            id,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Whether [`close`](Self::close) has not succeeded yet.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Registry this device's streams are registered in.
    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        self.streams.registry()
    }

    fn handle(&mut self) -> Result<&mut (dyn Transport + 'static)> {
        match self.transport.as_deref_mut() {
            Some(transport) => Ok(transport),
            None => Err(Usage::DeviceClosed.into()),
        }
    }

    /// Get the firmware version string.
    pub fn version(&mut self) -> Result<String> {
        self.handle()?
            .version_string()
            .map_err(|code| Error::Native(translate(code)))
    }

    /// Tune to a center frequency in Hz.
    pub fn set_freq(&mut self, freq_hz: u64) -> Result<()> {
        check(self.handle()?.set_freq(freq_hz))
    }

    /// Set the sample rate in Hz.
    ///
    /// Preferred rates are 8, 10, 12.5, 16 and 20 MHz, which have less jitter.
    pub fn set_sample_rate(&mut self, freq_hz: f64) -> Result<()> {
        check(self.handle()?.set_sample_rate(freq_hz))
    }

    /// Set the sample rate as `freq_hz / divider`.
    pub fn set_sample_rate_manual(&mut self, freq_hz: u32, divider: u32) -> Result<()> {
        check(self.handle()?.set_sample_rate_manual(freq_hz, divider))
    }

    /// Set the baseband filter bandwidth in Hz.
    ///
    /// See [`filter`](crate::filter) for the supported values.
    pub fn set_baseband_filter_bandwidth(&mut self, bandwidth_hz: u32) -> Result<()> {
        check(self.handle()?.set_baseband_filter_bandwidth(bandwidth_hz))
    }

    /// Enable or disable the external RX/TX RF amplifier.
    pub fn set_amp_enable(&mut self, enable: bool) -> Result<()> {
        check(self.handle()?.set_amp_enable(enable))
    }

    /// Set the RX low-noise amplifier gain (0-40 dB, 8 dB steps).
    pub fn set_lna_gain(&mut self, gain_db: u32) -> Result<()> {
        check(self.handle()?.set_lna_gain(gain_db))
    }

    /// Set the RX baseband amplifier gain (0-62 dB, 2 dB steps).
    pub fn set_vga_gain(&mut self, gain_db: u32) -> Result<()> {
        check(self.handle()?.set_vga_gain(gain_db))
    }

    /// Set the TX amplifier gain (0-47 dB, 1 dB steps).
    pub fn set_txvga_gain(&mut self, gain_db: u32) -> Result<()> {
        check(self.handle()?.set_txvga_gain(gain_db))
    }

    /// Enable or disable DC power on the antenna port.
    pub fn set_antenna_enable(&mut self, enable: bool) -> Result<()> {
        check(self.handle()?.set_antenna_enable(enable))
    }

    /// Apply a whole configuration.
    ///
    /// The configuration is validated first; settings are then applied in
    /// order (sample rate, filter, frequency, amplifiers, antenna power) and
    /// the first driver failure aborts the sequence.
    pub fn configure(&mut self, config: &DeviceConfig) -> Result<()> {
        config.validate()?;
        let filter = config
            .baseband_filter
            .unwrap_or_else(|| default_baseband_filter_bw(config.sample_rate));

        self.set_sample_rate(config.sample_rate)?;
        self.set_baseband_filter_bandwidth(filter)?;
        self.set_freq(config.center_freq)?;
        self.set_amp_enable(config.amp_enable)?;
        self.set_lna_gain(config.lna_gain)?;
        self.set_vga_gain(config.vga_gain)?;
        self.set_txvga_gain(config.txvga_gain)?;
        self.set_antenna_enable(config.antenna_enable)?;
        tracing::debug!(
            "configured {} Hz at {} sps, filter {} Hz",
            config.center_freq,
            config.sample_rate,
            filter
        );
        Ok(())
    }

    fn start<F>(&mut self, direction: Direction, handler: F) -> Result<Slot>
    where
        F: FnMut(BufferView<'_>) -> HandlerResult + Send + 'static,
    {
        let transport = self.transport.as_deref_mut().ok_or(Usage::DeviceClosed)?;
        self.streams.start(transport, direction, Box::new(handler))
    }

    fn stop(&mut self, direction: Direction) -> Result<()> {
        let transport = self.transport.as_deref_mut().ok_or(Usage::DeviceClosed)?;
        self.streams.stop(transport, direction)
    }

    /// Start receiving; `handler` gets every filled buffer.
    ///
    /// The handler runs on the driver's thread and delays the next transfer
    /// until it returns, so it must not block. Returning `Err` (or
    /// panicking) stops the stream: the status becomes
    /// [`StreamStatus::Halted`] until [`stop_rx`](Self::stop_rx) is called.
    pub fn start_rx<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(BufferView<'_>) -> HandlerResult + Send + 'static,
    {
        self.start(Direction::Rx, handler).map(|_| ())
    }

    pub fn stop_rx(&mut self) -> Result<()> {
        self.stop(Direction::Rx)
    }

    /// Start transmitting; `handler` fills every buffer to send.
    ///
    /// Same rules as [`start_rx`](Self::start_rx).
    pub fn start_tx<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(BufferView<'_>) -> HandlerResult + Send + 'static,
    {
        self.start(Direction::Tx, handler).map(|_| ())
    }

    pub fn stop_tx(&mut self) -> Result<()> {
        self.stop(Direction::Tx)
    }

    /// Start receiving into an async stream of complex samples.
    ///
    /// See [`SampleStream`]. Stop it with [`stop_rx`](Self::stop_rx).
    pub fn rx_stream(&mut self, capacity: usize) -> Result<SampleStream> {
        let (handler, stream) = SampleStream::channel(capacity);
        self.start(Direction::Rx, handler)?;
        Ok(stream)
    }

    pub fn stream_status(&self, direction: Direction) -> StreamStatus {
        self.streams.status(direction)
    }

    /// Whether `direction` is streaming with a healthy handler.
    pub fn is_streaming(&self, direction: Direction) -> bool {
        self.stream_status(direction) == StreamStatus::Streaming
    }

    /// Transfer counters of the current stream in `direction`.
    pub fn stream_stats(&self, direction: Direction) -> Option<StreamStats> {
        self.streams.stats(direction)
    }

    /// Slot held by the current stream in `direction`.
    pub fn stream_slot(&self, direction: Direction) -> Option<Slot> {
        self.streams.slot(direction)
    }

    /// Stop any active stream and close the handle.
    ///
    /// If a stream cannot be stopped or the driver refuses to close, the
    /// handle is kept and the error returned.
    pub fn close(&mut self) -> Result<()> {
        let transport = self.transport.as_deref_mut().ok_or(Usage::DeviceClosed)?;
        self.streams.stop_all(transport)?;
        check(transport.close())?;
        self.transport = None;
        tracing::debug!("device {:?} closed", self.id);
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.transport.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("failed to close device {:?}: {}", self.id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::sim::{SimController, SimulatedTransport};

    fn open() -> (Device, SimController) {
        let (transport, radio) = SimulatedTransport::new();
        let device = Device::with_transport(Box::new(transport), Arc::new(CallbackRegistry::new()));
        (device, radio)
    }

    #[test]
    fn test_setters_pass_through() {
        let (mut device, radio) = open();
        device.set_freq(915_000_000).unwrap();
        device.set_sample_rate(8e6).unwrap();
        device.set_baseband_filter_bandwidth(6_000_000).unwrap();
        device.set_amp_enable(true).unwrap();
        device.set_antenna_enable(true).unwrap();
        device.set_lna_gain(32).unwrap();
        device.set_vga_gain(30).unwrap();
        device.set_txvga_gain(10).unwrap();

        let settings = radio.settings();
        assert_eq!(settings.freq_hz, Some(915_000_000));
        assert_eq!(settings.sample_rate_hz, Some(8e6));
        assert_eq!(settings.baseband_filter_hz, Some(6_000_000));
        assert!(settings.amp_enabled);
        assert!(settings.antenna_enabled);
        assert_eq!((settings.lna_gain, settings.vga_gain, settings.txvga_gain), (32, 30, 10));
    }

    #[test]
    fn test_native_failure_is_translated() {
        let (mut device, _radio) = open();
        let err = device.set_lna_gain(56).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidParam));
    }

    #[test]
    fn test_configure_picks_default_filter() {
        let (mut device, radio) = open();
        let config = DeviceConfig::new(2_440_000_000, 20e6).with_amp(true);
        device.configure(&config).unwrap();

        let settings = radio.settings();
        assert_eq!(settings.freq_hz, Some(2_440_000_000));
        assert_eq!(settings.baseband_filter_hz, Some(15_000_000));
        assert_eq!(settings.lna_gain, 16);
        assert!(settings.amp_enabled);
    }

    #[test]
    fn test_configure_rejects_invalid_before_applying() {
        let (mut device, radio) = open();
        let config = DeviceConfig::new(100_000_000, 10e6).with_gains(8, 70);
        assert!(matches!(device.configure(&config), Err(Error::Config(_))));
        assert_eq!(radio.settings().sample_rate_hz, None);
    }

    #[test]
    fn test_version() {
        let (mut device, radio) = open();
        radio.set_version("git-1234");
        assert_eq!(device.version().unwrap(), "git-1234");
    }

    #[test]
    fn test_closed_device_fails_cleanly() {
        let (mut device, radio) = open();
        device.close().unwrap();
        assert!(!device.is_open());
        assert!(!radio.is_open());

        for err in [
            device.set_freq(100_000_000).unwrap_err(),
            device.version().unwrap_err(),
            device.start_rx(|_| Ok(())).unwrap_err(),
            device.stop_tx().unwrap_err(),
            device.close().unwrap_err(),
        ] {
            assert!(matches!(err, Error::Precondition(Usage::DeviceClosed)));
        }
    }

    #[test]
    fn test_failed_close_keeps_handle() {
        let (mut device, radio) = open();
        radio.fail_next_close(ErrorKind::Libusb.code());
        assert_eq!(device.close().unwrap_err().kind(), Some(ErrorKind::Libusb));
        assert!(device.is_open());
        device.close().unwrap();
    }

    #[test]
    fn test_drop_closes_and_releases_slots() {
        let (mut device, radio) = open();
        let registry = device.registry().clone();
        device.start_rx(|_| Ok(())).unwrap();
        drop(device);
        assert!(!radio.is_open());
        assert!(registry.is_empty());
    }
}
