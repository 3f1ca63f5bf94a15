//! Baseband filter bandwidth helpers.
//!
//! The MAX2837 transceiver only offers a fixed set of baseband filter
//! bandwidths. These helpers pick an entry from that table for an arbitrary
//! request, rounding down like libhackrf. Requests above the widest filter
//! are clamped to 28 MHz, where libhackrf returns 0.

/// Bandwidths supported by the MAX2837 baseband filter, in Hz.
pub const MAX2837_BANDWIDTHS: [u32; 16] = [
    1_750_000, 2_500_000, 3_500_000, 5_000_000, 5_500_000, 6_000_000, 7_000_000, 8_000_000,
    9_000_000, 10_000_000, 12_000_000, 14_000_000, 15_000_000, 20_000_000, 24_000_000,
    28_000_000,
];

/// Position of the first entry greater than or equal to `bandwidth_hz`.
fn first_not_below(bandwidth_hz: u32) -> Option<usize> {
    MAX2837_BANDWIDTHS.iter().position(|&bw| bw >= bandwidth_hz)
}

/// Largest filter bandwidth strictly below `bandwidth_hz`.
///
/// Requests at or below the narrowest filter get the narrowest filter.
pub fn compute_baseband_filter_bw_round_down_lt(bandwidth_hz: u32) -> u32 {
    match first_not_below(bandwidth_hz) {
        Some(0) => MAX2837_BANDWIDTHS[0],
        Some(index) => MAX2837_BANDWIDTHS[index - 1],
        None => MAX2837_BANDWIDTHS[MAX2837_BANDWIDTHS.len() - 1],
    }
}

/// Largest filter bandwidth less than or equal to `bandwidth_hz`.
///
/// Requests below the narrowest filter get the narrowest filter, requests
/// above the widest get the widest.
pub fn compute_baseband_filter_bw(bandwidth_hz: u32) -> u32 {
    match first_not_below(bandwidth_hz) {
        Some(0) => MAX2837_BANDWIDTHS[0],
        Some(index) if MAX2837_BANDWIDTHS[index] > bandwidth_hz => MAX2837_BANDWIDTHS[index - 1],
        Some(index) => MAX2837_BANDWIDTHS[index],
        None => MAX2837_BANDWIDTHS[MAX2837_BANDWIDTHS.len() - 1],
    }
}

/// Default filter for a sample rate: 75% of the rate, rounded down.
pub fn default_baseband_filter_bw(sample_rate_hz: f64) -> u32 {
    compute_baseband_filter_bw((sample_rate_hz * 0.75) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_down_exact_match() {
        assert_eq!(compute_baseband_filter_bw(5_000_000), 5_000_000);
        assert_eq!(compute_baseband_filter_bw(28_000_000), 28_000_000);
    }

    #[test]
    fn test_round_down_between_entries() {
        assert_eq!(compute_baseband_filter_bw(5_200_000), 5_000_000);
        assert_eq!(compute_baseband_filter_bw(13_000_000), 12_000_000);
    }

    #[test]
    fn test_round_down_out_of_table() {
        assert_eq!(compute_baseband_filter_bw(100), 1_750_000);
        assert_eq!(compute_baseband_filter_bw(40_000_000), 28_000_000);
    }

    #[test]
    fn test_round_down_lt_is_strict() {
        assert_eq!(compute_baseband_filter_bw_round_down_lt(5_000_000), 3_500_000);
        assert_eq!(compute_baseband_filter_bw_round_down_lt(5_200_000), 5_000_000);
        assert_eq!(compute_baseband_filter_bw_round_down_lt(1_750_000), 1_750_000);
        assert_eq!(compute_baseband_filter_bw_round_down_lt(30_000_000), 28_000_000);
    }

    #[test]
    fn test_default_for_sample_rate() {
        // 10 Msps -> 7.5 MHz -> 7 MHz filter
        assert_eq!(default_baseband_filter_bw(10e6), 7_000_000);
        assert_eq!(default_baseband_filter_bw(20e6), 15_000_000);
    }
}
