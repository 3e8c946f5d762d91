//! SINR distribution under log-normal shadowing.
//!
//! Signal and interferer powers are Gaussian in dB. The signal is conditioned on
//! being above the sensitivity threshold; noise adds to the interferer in linear
//! units. The result is a density on a dB grid of fixed resolution.

use crate::layers::link::ebno_offset_db;

use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Shadowing is discretized over this many standard deviations on each side.
static SHADOWING_SPAN: f64 = 5.0;

/// Interferers whose strongest plausible power is this far below noise are ignored.
static NEGLIGIBLE_INTERFERENCE_DB: f64 = 30.0;

/// Mean power and shadowing of one link, as seen by the receiver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkPower {
    /// Mean received power
    pub mean_dbm: f64,
    /// Log-normal shadowing standard deviation
    pub shadowing_std_db: f64,
}

impl LinkPower {
    /// Creates a new link power description.
    pub fn new(mean_dbm: f64, shadowing_std_db: f64) -> Self {
        Self {
            mean_dbm,
            shadowing_std_db,
        }
    }
}

/// Discretized density of the SINR (or Eb/No after [`SinrDistribution::to_ebno`]).
///
/// `density[k]` is the density at `grid[k]`; `Σ density·step` is one.
#[derive(Clone, Debug, PartialEq)]
pub struct SinrDistribution {
    grid: Vec<f64>,
    density: Vec<f64>,
    step_db: f64,
}

/// Gaussian upper tail.
fn q(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Probability of a standard normal falling in `[lo, hi]`, accurate in both tails.
fn interval_mass(lo: f64, hi: f64) -> f64 {
    if lo >= 0.0 {
        q(lo) - q(hi)
    } else if hi <= 0.0 {
        q(-hi) - q(-lo)
    } else {
        1.0 - q(hi) - q(-lo)
    }
}

/// Discretizes `N(mean, std²)` on `start + k·step`, truncated below at `floor`.
///
/// Masses are normalized. When the distribution sits entirely out of reach, all
/// the mass lands on the first point.
fn discretize(mean: f64, std: f64, floor: f64, start: f64, end: f64, step: f64) -> Vec<f64> {
    let count = ((end - start) / step).round().max(0.0) as usize + 1;

    if std <= 0.0 {
        let k = ((mean.max(floor) - start) / step).round().clamp(0.0, (count - 1) as f64) as usize;
        let mut masses = vec![0.0; count];
        masses[k] = 1.0;
        return masses;
    }

    let mut masses: Vec<f64> = (0..count)
        .map(|k| {
            let center = start + k as f64 * step;
            let lo = (center - step / 2.0).max(floor);
            let hi = center + step / 2.0;
            if hi <= lo {
                0.0
            } else {
                interval_mass((lo - mean) / std, (hi - mean) / std)
            }
        })
        .collect();

    let total: f64 = masses.iter().sum();
    if total > 0.0 && total.is_finite() {
        masses.iter_mut().for_each(|m| *m /= total);
    } else {
        masses.iter_mut().for_each(|m| *m = 0.0);
        masses[0] = 1.0;
    }

    masses
}

fn power_sum_dbm(a_dbm: f64, b_dbm: f64) -> f64 {
    10.0 * (10f64.powf(a_dbm / 10.0) + 10f64.powf(b_dbm / 10.0)).log10()
}

impl SinrDistribution {
    /// Builds the SINR density of a `signal` received over `noise_dbm` and, optionally,
    /// one `interferer`.
    ///
    /// Only signal realizations at or above `sensitivity_dbm` are kept, so the density
    /// is conditional on the packet being detectable. Without an interferer this is
    /// the SNR density.
    pub fn new(
        signal: LinkPower,
        interferer: Option<LinkPower>,
        noise_dbm: f64,
        sensitivity_dbm: f64,
        step_db: f64,
    ) -> Self {
        let interferer = interferer.filter(|i| {
            i.mean_dbm.is_finite()
                && i.mean_dbm + SHADOWING_SPAN * i.shadowing_std_db
                    > noise_dbm - NEGLIGIBLE_INTERFERENCE_DB
        });

        // Signal grid, anchored at the sensitivity threshold
        let signal_span = SHADOWING_SPAN * signal.shadowing_std_db.max(0.0);
        let lowest = (signal.mean_dbm - signal_span).max(sensitivity_dbm);
        let highest = signal.mean_dbm.max(sensitivity_dbm) + signal_span;
        let signal_start = sensitivity_dbm + ((lowest - sensitivity_dbm) / step_db).floor() * step_db;
        let signal_masses = discretize(
            signal.mean_dbm,
            signal.shadowing_std_db,
            sensitivity_dbm,
            signal_start,
            highest,
            step_db,
        );

        // Impairment (interference plus noise) levels and their masses
        let impairments: Vec<(f64, f64)> = match interferer {
            None => vec![(noise_dbm, 1.0)],
            Some(i) => {
                let span = SHADOWING_SPAN * i.shadowing_std_db.max(0.0);
                let start = i.mean_dbm - (span / step_db).round() * step_db;
                let masses = discretize(
                    i.mean_dbm,
                    i.shadowing_std_db,
                    f64::NEG_INFINITY,
                    start,
                    i.mean_dbm + span,
                    step_db,
                );
                masses
                    .into_iter()
                    .enumerate()
                    .filter(|(_, m)| *m > 0.0)
                    .map(|(m, mass)| (power_sum_dbm(start + m as f64 * step_db, noise_dbm), mass))
                    .collect()
            }
        };

        // SINR = S - J. Each impairment level shifts the whole signal pmf by a whole
        // number of bins.
        let (j_min, j_max) = impairments
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(j, _)| (lo.min(j), hi.max(j)));
        let signal_end = signal_start + (signal_masses.len() - 1) as f64 * step_db;
        let grid_start = signal_start - j_max;
        let len = ((signal_end - j_min - grid_start) / step_db).round() as usize + 1;

        let mut masses = vec![0.0; len];
        for &(j, j_mass) in &impairments {
            let shift = (((signal_start - j) - grid_start) / step_db).round() as usize;
            for (k, &s_mass) in signal_masses.iter().enumerate() {
                if let Some(slot) = masses.get_mut(shift + k) {
                    *slot += s_mass * j_mass;
                }
            }
        }

        let grid = (0..len).map(|k| grid_start + k as f64 * step_db).collect();
        let density = masses.into_iter().map(|m| m / step_db).collect();

        Self {
            grid,
            density,
            step_db,
        }
    }

    /// Converts SINR to Eb/No for the 10MHz channel at `data_rate_bps`.
    pub fn to_ebno(mut self, data_rate_bps: f64) -> Self {
        let offset = ebno_offset_db(data_rate_bps);
        self.grid.iter_mut().for_each(|x| *x += offset);
        self
    }

    /// Grid points, in dB, ascending.
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Density at each grid point.
    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Grid resolution in dB.
    pub fn step_db(&self) -> f64 {
        self.step_db
    }

    /// Riemann sum of the density, one up to rounding.
    pub fn total_probability(&self) -> f64 {
        self.density.iter().sum::<f64>() * self.step_db
    }

    /// Expected value, in dB.
    pub fn mean_db(&self) -> f64 {
        self.grid
            .iter()
            .zip(&self.density)
            .map(|(x, p)| x * p)
            .sum::<f64>()
            * self.step_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::*;

    fn snr(mean_dbm: f64) -> SinrDistribution {
        SinrDistribution::new(
            LinkPower::new(mean_dbm, SHADOWING_STD_DB),
            None,
            NOISE_DBM,
            SENSING_THRESHOLD_DBM,
            STEP_DB,
        )
    }

    #[test_log::test]
    fn test_snr_integrates_to_one() {
        for mean in [-40.0, -70.0, -85.0, -95.0, -130.0] {
            let dist = snr(mean);

            assert!((dist.total_probability() - 1.0).abs() < 1e-9, "mean {mean}");
            assert_eq!(dist.grid().len(), dist.density().len());
        }
    }

    #[test_log::test]
    fn test_snr_centered_on_mean() {
        // Far above sensitivity, the truncation is irrelevant
        let dist = snr(-50.0);

        assert!((dist.mean_db() - (-50.0 - NOISE_DBM)).abs() < 0.05);
    }

    #[test_log::test]
    fn test_snr_conditioned_on_sensitivity() {
        let dist = snr(-100.0);
        let floor = SENSING_THRESHOLD_DBM - NOISE_DBM - STEP_DB;

        for (x, p) in dist.grid().iter().zip(dist.density()) {
            if *p > 0.0 {
                assert!(*x >= floor, "mass at {x}");
            }
        }
        assert!(dist.mean_db() > floor);
    }

    #[test_log::test]
    fn test_grid_is_uniform() {
        let dist = SinrDistribution::new(
            LinkPower::new(-60.0, 3.0),
            Some(LinkPower::new(-80.0, 3.0)),
            NOISE_DBM,
            SENSING_THRESHOLD_DBM,
            STEP_DB,
        );

        for pair in dist.grid().windows(2) {
            assert!((pair[1] - pair[0] - STEP_DB).abs() < 1e-9);
        }
    }

    #[test_log::test]
    fn test_interference_lowers_sinr() {
        let signal = LinkPower::new(-60.0, SHADOWING_STD_DB);
        let clean = snr(-60.0);
        let interfered = SinrDistribution::new(
            signal,
            Some(LinkPower::new(-75.0, SHADOWING_STD_DB)),
            NOISE_DBM,
            SENSING_THRESHOLD_DBM,
            STEP_DB,
        );

        assert!((interfered.total_probability() - 1.0).abs() < 1e-9);
        // Roughly 15dB SIR instead of 35dB SNR
        assert!(interfered.mean_db() < clean.mean_db() - 15.0);
        assert!((interfered.mean_db() - 15.0).abs() < 1.5);
    }

    #[test_log::test]
    fn test_negligible_interferer_is_ignored() {
        let signal = LinkPower::new(-60.0, SHADOWING_STD_DB);

        let absent = SinrDistribution::new(signal, None, NOISE_DBM, SENSING_THRESHOLD_DBM, STEP_DB);
        let far = SinrDistribution::new(
            signal,
            Some(LinkPower::new(-160.0, SHADOWING_STD_DB)),
            NOISE_DBM,
            SENSING_THRESHOLD_DBM,
            STEP_DB,
        );
        let silent = SinrDistribution::new(
            signal,
            Some(LinkPower::new(f64::NEG_INFINITY, SHADOWING_STD_DB)),
            NOISE_DBM,
            SENSING_THRESHOLD_DBM,
            STEP_DB,
        );

        assert_eq!(absent, far);
        assert_eq!(absent, silent);
    }

    #[test_log::test]
    fn test_to_ebno_shifts_grid() {
        let dist = snr(-60.0);
        let shifted = dist.clone().to_ebno(6e6);
        let offset = ebno_offset_db(6e6);

        assert_eq!(dist.density(), shifted.density());
        assert!((shifted.grid()[0] - dist.grid()[0] - offset).abs() < 1e-12);
        assert!((shifted.mean_db() - dist.mean_db() - offset).abs() < 1e-9);
    }

    #[test_log::test]
    fn test_interval_mass_tails() {
        assert!((interval_mass(-1.0, 1.0) - 0.682_689_49).abs() < 1e-8);
        assert!(interval_mass(9.0, 9.1) > 0.0);
        assert!(interval_mass(-9.1, -9.0) > 0.0);
        assert!((interval_mass(9.0, 9.1) - interval_mass(-9.1, -9.0)).abs() < 1e-30);
    }
}
