//! Channel occupancy: sensing profile, CBR and the spatial correlation of sensing.
//!
//! Everything here is computed once per run, before any per-distance work.

use crate::{
    common::*,
    layers::physical::{packet_sensing_ratio, pathloss},
    parameters::LinkParameters,
};

use rayon::prelude::*;
use tracing::{debug, instrument};

/// Packet Sensing Ratio at every meter of `[-SENSING_RANGE, SENSING_RANGE]`.
pub fn sensing_profile(tx_power_dbm: f64) -> Vec<f64> {
    let offsets: Vec<f64> = (-SENSING_RANGE..=SENSING_RANGE).map(|x| x as f64).collect();

    pathloss(&offsets)
        .iter()
        .map(|sample| packet_sensing_ratio(tx_power_dbm, sample))
        .collect()
}

/// Expected number of transmissions a vehicle senses at any time.
pub fn channel_utilization(params: &LinkParameters, profile: &[f64]) -> f64 {
    params.vehicle_density() * params.packet_rate() * params.transmission_duration() * profile.iter().sum::<f64>()
}

/// Maps channel utilization to CBR through the empirical quadratic calibration.
///
/// The quadratic is held at its peak past the vertex so CBR never decreases with load.
pub fn channel_busy_ratio(utilization: f64) -> f64 {
    let (a, b, c) = CBR_COEFFICIENTS;
    let u = utilization.clamp(0.0, -b / (2.0 * a));

    checked_probability("CBR", (a * u * u + b * u + c).clamp(0.0, 1.0))
}

/// Autocorrelation of `profile` normalized by its peak, non-negative lags only.
pub fn normalized_autocorrelation(profile: &[f64]) -> Vec<f64> {
    let n = profile.len();

    let raw: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|lag| profile[lag..].iter().zip(profile).map(|(a, b)| a * b).sum::<f64>())
        .collect();

    let peak = raw.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return vec![0.0; n];
    }

    raw.into_iter().map(|r| r / peak).collect()
}

/// Immutable per-run state shared by every reporting distance.
#[derive(Clone, Debug)]
pub struct RunContext {
    params: LinkParameters,
    transmission_duration: f64,
    utilization: f64,
    cbr: f64,
    autocorrelation: Vec<f64>,
}

impl RunContext {
    /// Characterizes sensing and computes CBR and the sensing autocorrelation.
    #[instrument(skip(params), fields(density = params.vehicle_density(), rate = params.packet_rate()))]
    pub fn new(params: &LinkParameters) -> Self {
        let profile = sensing_profile(params.tx_power_dbm());
        let utilization = channel_utilization(params, &profile);
        let cbr = channel_busy_ratio(utilization);
        let autocorrelation = normalized_autocorrelation(&profile);
        let transmission_duration = params.transmission_duration();

        debug!(utilization, cbr, transmission_duration, "Run context ready");

        Self {
            params: *params,
            transmission_duration,
            utilization,
            cbr,
            autocorrelation,
        }
    }

    /// Parameters of the run.
    pub fn params(&self) -> &LinkParameters {
        &self.params
    }

    /// Air time of one packet.
    pub fn transmission_duration(&self) -> f64 {
        self.transmission_duration
    }

    /// Channel utilization before calibration.
    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// Channel Busy Ratio.
    pub fn cbr(&self) -> f64 {
        self.cbr
    }

    /// `R_PSR(|offset|)`; zero past the sensing profile.
    pub fn sensing_correlation(&self, offset: f64) -> f64 {
        let lag = offset.abs().round() as usize;
        self.autocorrelation.get(lag).copied().unwrap_or(0.0)
    }

    /// `1 - CBR·R_PSR(|offset|)`, floored at [`MIN_IDLE_FRACTION`].
    pub fn idle_fraction(&self, offset: f64) -> f64 {
        (1.0 - self.cbr * self.sensing_correlation(offset)).max(MIN_IDLE_FRACTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(density: f64, rate: f64) -> LinkParameters {
        LinkParameters::new(density, rate, 23.0, 190, 6e6).unwrap()
    }

    #[test_log::test]
    fn test_sensing_profile_shape() {
        let profile = sensing_profile(23.0);
        let center = SENSING_RANGE as usize;

        assert_eq!(profile.len(), 2 * SENSING_RANGE as usize + 1);
        assert!(profile[center] > 0.999);
        assert!(profile[0] < 1e-3);
        // Symmetric around the transmitter
        for k in 0..center {
            assert_eq!(profile[center - k], profile[center + k]);
        }
    }

    #[test_log::test]
    fn test_cbr_calibration() {
        assert!((channel_busy_ratio(0.0) - 0.003844).abs() < 1e-12);
        assert!((channel_busy_ratio(0.5) - (-0.2481 * 0.25 + 0.913 * 0.5 + 0.003844)).abs() < 1e-12);

        // Saturates instead of bending back down
        assert!(channel_busy_ratio(5.0) >= channel_busy_ratio(1.8));
        assert_eq!(channel_busy_ratio(5.0), channel_busy_ratio(50.0));
        assert!(channel_busy_ratio(50.0) <= 1.0);
    }

    #[test_log::test]
    fn test_cbr_monotone_in_load() {
        let mut previous = 0.0;
        for density in [0.01, 0.02, 0.06, 0.1, 0.2, 0.5] {
            let cbr = RunContext::new(&params(density, 10.0)).cbr();
            assert!(cbr >= previous, "density {density}");
            assert!((0.0..=1.0).contains(&cbr));
            previous = cbr;
        }

        let mut previous = 0.0;
        for rate in [1.0, 5.0, 10.0, 20.0, 50.0] {
            let cbr = RunContext::new(&params(0.06, rate)).cbr();
            assert!(cbr >= previous, "rate {rate}");
            previous = cbr;
        }
    }

    #[test_log::test]
    fn test_autocorrelation() {
        let profile = [0.0, 1.0, 2.0, 1.0, 0.0];
        let r = normalized_autocorrelation(&profile);

        // Lags 0..=2: 6, 4, 1
        assert_eq!(r.len(), 5);
        assert!((r[0] - 1.0).abs() < 1e-12);
        assert!((r[1] - 4.0 / 6.0).abs() < 1e-12);
        assert!((r[2] - 1.0 / 6.0).abs() < 1e-12);
        assert_eq!(r[3], 0.0);
        assert_eq!(normalized_autocorrelation(&[0.0; 3]), vec![0.0; 3]);
    }

    #[test_log::test]
    fn test_context_lookups() {
        let ctx = RunContext::new(&params(0.06, 10.0));

        assert!(ctx.utilization() > 0.0);
        assert!((ctx.transmission_duration() - params(0.06, 10.0).transmission_duration()).abs() < 1e-15);
        assert!((ctx.sensing_correlation(0.0) - 1.0).abs() < 1e-12);
        assert_eq!(ctx.sensing_correlation(-120.0), ctx.sensing_correlation(120.0));
        assert!(ctx.sensing_correlation(300.0) < ctx.sensing_correlation(100.0));
        assert_eq!(ctx.sensing_correlation(1e6), 0.0);

        assert!((ctx.idle_fraction(0.0) - (1.0 - ctx.cbr())).abs() < 1e-12);
        assert_eq!(ctx.idle_fraction(1e6), 1.0);
    }
}
