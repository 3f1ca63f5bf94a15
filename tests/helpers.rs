//! Test helper utilities: simulated devices and synthetic Cs8 buffers

#![allow(dead_code)]

use std::f32::consts::PI;
use std::sync::Arc;

use rs_hackrf::transport::sim::{SimController, SimulatedTransport};
use rs_hackrf::{CallbackRegistry, Device};

/// Install a tracing subscriber writing to the test output.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Open a simulated device with its own registry
pub fn open_simulated() -> (Device, SimController) {
    init_tracing();
    let (transport, radio) = SimulatedTransport::new();
    let device = Device::with_transport(Box::new(transport), Arc::new(CallbackRegistry::new()));
    (device, radio)
}

/// Open two simulated devices sharing one registry
pub fn open_pair(registry: Arc<CallbackRegistry>) -> [(Device, SimController); 2] {
    init_tracing();
    [(); 2].map(|_| {
        let (transport, radio) = SimulatedTransport::new();
        (Device::with_transport(Box::new(transport), registry.clone()), radio)
    })
}

/// Generate a complex sine wave at a specific frequency
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `num_samples` - Number of samples to generate
///
/// # Returns
/// Interleaved I/Q bytes in HackRF's Cs8 format
pub fn generate_sine_wave_cs8(frequency: f32, sample_rate: u32, num_samples: usize) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(num_samples * 2);
    let angular_freq = 2.0 * PI * frequency / sample_rate as f32;

    for n in 0..num_samples {
        let phase = angular_freq * n as f32;
        buffer.push((phase.cos() * 127.0) as i8 as u8);
        buffer.push((phase.sin() * 127.0) as i8 as u8);
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sine_wave_cs8_length() {
        let samples = generate_sine_wave_cs8(1000.0, 96000, 100);
        assert_eq!(samples.len(), 200); // 100 samples * 2 bytes per sample
    }

    #[test]
    fn test_generate_sine_wave_cs8_dc() {
        // cos(0) = 1, sin(0) = 0
        let samples = generate_sine_wave_cs8(0.0, 96000, 4);
        for pair in samples.chunks_exact(2) {
            assert_eq!(pair, [127, 0]);
        }
    }
}
