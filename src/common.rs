/// Carrier frequency, 5.89 GHz (ITS-G5 control channel)
pub static CARRIER_FREQUENCY_HZ: f64 = 5.89e9;

/// Speed of light
pub static SPEED_OF_LIGHT: f64 = 3e8;

/// Transmitter antenna height
pub static TX_ANTENNA_HEIGHT: f64 = 1.5;

/// Receiver antenna height
pub static RX_ANTENNA_HEIGHT: f64 = 1.5;

/// Effective environment height
pub static ENVIRONMENT_HEIGHT: f64 = 0.5;

/// Distances below this are clamped before evaluating the pathloss
pub static MIN_DISTANCE: f64 = 3.0;

/// Shadowing standard deviation, both propagation regimes
pub static SHADOWING_STD_DB: f64 = 3.0;

/// 10MHz channel
pub static BANDWIDTH_HZ: f64 = 10e6;

/// Sensing (and decoding) threshold
pub static SENSING_THRESHOLD_DBM: f64 = -85.0;

/// Noise floor
pub static NOISE_DBM: f64 = -95.0;

/// Slot time
pub static SLOT_TIME: f64 = 13e-6;

/// MAC header size, in bytes
pub static HEADER_BYTES: u32 = 30;

/// PHY preamble + SIGNAL field duration
pub static PHY_OVERHEAD: f64 = 40e-6;

/// Resolution of the SINR and Eb/No grids
pub static STEP_DB: f64 = 0.1;

/// Spacing of the reporting distances
pub static REPORT_STEP: f64 = 25.0;

/// Largest reporting distance
pub static REPORT_MAX_DISTANCE: f64 = 500.0;

/// Half width of the sensing profile grid (1m resolution)
pub static SENSING_RANGE: i64 = 1500;

/// Upper bound on modeled interferers at each side of the receiver
pub static MAX_INTERFERERS_PER_SIDE: usize = 1000;

/// Quadratic calibration mapping channel utilization to CBR: `a·u² + b·u + c`
pub static CBR_COEFFICIENTS: (f64, f64, f64) = (-0.2481, 0.913, 0.003844);

/// Lower bound on the occupancy correction denominator `1 - CBR·R_PSR`
pub static MIN_IDLE_FRACTION: f64 = 1e-3;

/// Tolerance used by the probability range checks
pub static PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Reporting distance grid: 0, 25, ..., 500 m.
pub fn reporting_distances() -> Vec<f64> {
    let count = (REPORT_MAX_DISTANCE / REPORT_STEP).round() as usize;
    (0..=count).map(|i| i as f64 * REPORT_STEP).collect()
}

/// Checks that `p` is a probability and clamps rounding noise away.
///
/// Anything outside `[0, 1]` by more than [`PROBABILITY_TOLERANCE`] is a modeling
/// bug, never bad input, so it panics.
pub fn checked_probability(stage: &str, p: f64) -> f64 {
    assert!(
        p.is_finite() && (-PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE).contains(&p),
        "{stage}: internal consistency fault, probability {p} out of range"
    );
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_reporting_distances() {
        let distances = reporting_distances();

        assert_eq!(distances.len(), 21);
        assert_eq!(distances[0], 0.0);
        assert_eq!(distances[1], 25.0);
        assert_eq!(*distances.last().unwrap(), 500.0);
    }

    #[test_log::test]
    fn test_checked_probability_clamps_rounding() {
        assert_eq!(checked_probability("test", 1.0 + 1e-12), 1.0);
        assert_eq!(checked_probability("test", -1e-12), 0.0);
        assert_eq!(checked_probability("test", 0.25), 0.25);
    }

    #[test_log::test]
    #[should_panic(expected = "internal consistency fault")]
    fn test_checked_probability_rejects_nan() {
        checked_probability("test", f64::NAN);
    }

    #[test_log::test]
    #[should_panic(expected = "internal consistency fault")]
    fn test_checked_probability_rejects_out_of_range() {
        checked_probability("test", 1.5);
    }
}
