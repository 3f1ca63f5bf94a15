//! Radio configuration.

use crate::error::{Error, Result};
use crate::transport::{FREQ_MAX_HZ, LNA_GAIN_MAX, TXVGA_GAIN_MAX, VGA_GAIN_MAX};

/// Device selector for HackRF devices
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// First device found
    #[default]
    First,
    /// Select device by enumeration index
    Index(usize),
    /// Select device by serial number (a unique suffix is enough)
    Serial(String),
}

/// HackRF configuration
///
/// Gains default to the values used by `hackrf_transfer`. When
/// `baseband_filter` is `None`, [`Device::configure`](crate::Device::configure)
/// picks the widest filter below 75% of the sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Device selector (first, index or serial)
    pub device: DeviceSelector,
    /// Center frequency in Hz (up to 7.25 GHz)
    pub center_freq: u64,
    /// Sample rate in Hz (2 to 20 Msps)
    pub sample_rate: f64,
    /// Baseband filter bandwidth in Hz, None for automatic
    pub baseband_filter: Option<u32>,
    /// Enable the RF amplifier (about 11 dB)
    pub amp_enable: bool,
    /// RX LNA gain (0-40 dB, 8 dB steps)
    pub lna_gain: u32,
    /// RX VGA gain (0-62 dB, 2 dB steps)
    pub vga_gain: u32,
    /// TX VGA gain (0-47 dB, 1 dB steps)
    pub txvga_gain: u32,
    /// Enable DC power on the antenna port
    pub antenna_enable: bool,
}

impl DeviceConfig {
    /// Create a new configuration for the first device
    ///
    /// # Arguments
    ///
    /// * `center_freq` - Center frequency in Hz
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(center_freq: u64, sample_rate: f64) -> Self {
        Self {
            device: DeviceSelector::First,
            center_freq,
            sample_rate,
            baseband_filter: None,
            amp_enable: false,
            lna_gain: 16,
            vga_gain: 20,
            txvga_gain: 0,
            antenna_enable: false,
        }
    }

    /// Create a new configuration selecting a device by serial number
    pub fn new_with_serial<S: Into<String>>(serial: S, center_freq: u64, sample_rate: f64) -> Self {
        Self {
            device: DeviceSelector::Serial(serial.into()),
            ..Self::new(center_freq, sample_rate)
        }
    }

    pub fn with_gains(mut self, lna_gain: u32, vga_gain: u32) -> Self {
        self.lna_gain = lna_gain;
        self.vga_gain = vga_gain;
        self
    }

    pub fn with_txvga_gain(mut self, txvga_gain: u32) -> Self {
        self.txvga_gain = txvga_gain;
        self
    }

    pub fn with_baseband_filter(mut self, bandwidth_hz: u32) -> Self {
        self.baseband_filter = Some(bandwidth_hz);
        self
    }

    pub fn with_amp(mut self, enable: bool) -> Self {
        self.amp_enable = enable;
        self
    }

    pub fn with_antenna_power(mut self, enable: bool) -> Self {
        self.antenna_enable = enable;
        self
    }

    /// Check ranges before anything is sent to the radio.
    pub fn validate(&self) -> Result<()> {
        if self.center_freq > FREQ_MAX_HZ {
            return Err(Error::config(format!(
                "center frequency {} Hz above {} Hz",
                self.center_freq, FREQ_MAX_HZ
            )));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(Error::config(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        for (name, value, max) in [
            ("LNA", self.lna_gain, LNA_GAIN_MAX),
            ("VGA", self.vga_gain, VGA_GAIN_MAX),
            ("TX VGA", self.txvga_gain, TXVGA_GAIN_MAX),
        ] {
            if value > max {
                return Err(Error::config(format!(
                    "{} gain {} dB above {} dB",
                    name, value, max
                )));
            }
        }
        Ok(())
    }
}
