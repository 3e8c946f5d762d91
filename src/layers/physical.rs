use crate::common::*;

use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// Pathloss and shadowing at one transmitter-receiver distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropagationSample {
    /// Distance the sample was evaluated at, after folding and clamping
    pub distance: f64,
    /// Median pathloss
    pub path_loss_db: f64,
    /// Log-normal shadowing standard deviation
    pub shadowing_std_db: f64,
}

impl PropagationSample {
    /// Mean received power for a given transmit power.
    pub fn received_power_dbm(&self, tx_power_dbm: f64) -> f64 {
        tx_power_dbm - self.path_loss_db
    }
}

/// Distance at which the dual-slope model switches regime.
pub fn breakpoint_distance() -> f64 {
    4.0 * (TX_ANTENNA_HEIGHT - ENVIRONMENT_HEIGHT) * (RX_ANTENNA_HEIGHT - ENVIRONMENT_HEIGHT) * CARRIER_FREQUENCY_HZ
        / SPEED_OF_LIGHT
}

fn effective_distance(distance: f64) -> f64 {
    distance.abs().max(MIN_DISTANCE)
}

/// Free-space pathloss, the lower bound of [`propagation`].
pub fn free_space_pathloss(distance: f64) -> f64 {
    let d = effective_distance(distance);
    20.0 * d.log10() + 46.4 + 20.0 * (CARRIER_FREQUENCY_HZ / 1e9 / 5.0).log10()
}

/// Dual-slope pathloss with a free-space floor.
///
/// Negative distances are folded, and anything below [`MIN_DISTANCE`] is clamped.
pub fn propagation(distance: f64) -> PropagationSample {
    let d = effective_distance(distance);
    let fc_ghz = CARRIER_FREQUENCY_HZ / 1e9;

    let dual_slope = if d < breakpoint_distance() {
        22.7 * d.log10() + 27.0 + 20.0 * fc_ghz.log10()
    } else {
        40.0 * d.log10() + 7.56
            - 17.3 * (TX_ANTENNA_HEIGHT - ENVIRONMENT_HEIGHT).log10()
            - 17.3 * (RX_ANTENNA_HEIGHT - ENVIRONMENT_HEIGHT).log10()
            + 2.7 * fc_ghz.log10()
    };

    PropagationSample {
        distance: d,
        path_loss_db: dual_slope.max(free_space_pathloss(d)),
        shadowing_std_db: SHADOWING_STD_DB,
    }
}

/// Vectorized [`propagation`], one sample per input distance.
pub fn pathloss(distances: &[f64]) -> Vec<PropagationSample> {
    distances.iter().copied().map(propagation).collect()
}

/// Probability that the received power exceeds `threshold_dbm` under Gaussian shadowing.
pub fn detection_probability(tx_power_dbm: f64, sample: &PropagationSample, threshold_dbm: f64) -> f64 {
    let margin = sample.received_power_dbm(tx_power_dbm) - threshold_dbm;
    checked_probability(
        "detection probability",
        0.5 * (1.0 + erf(margin / (sample.shadowing_std_db * SQRT_2))),
    )
}

/// Packet Sensing Ratio: probability the packet is sensed above [`SENSING_THRESHOLD_DBM`].
pub fn packet_sensing_ratio(tx_power_dbm: f64, sample: &PropagationSample) -> f64 {
    detection_probability(tx_power_dbm, sample, SENSING_THRESHOLD_DBM)
}

/// Probability the packet arrives below the sensing threshold.
pub fn sensing_error(tx_power_dbm: f64, sample: &PropagationSample) -> f64 {
    let margin = sample.received_power_dbm(tx_power_dbm) - SENSING_THRESHOLD_DBM;
    checked_probability(
        "sensing error",
        0.5 * (1.0 - erf(margin / (sample.shadowing_std_db * SQRT_2))),
    )
}
