use crate::common::*;

use tracing::trace;

/// Eb/No anchors of the FER curve (dB). The first and last entries are sentinels
/// widened at evaluation time to cover the whole input range.
static FER_CURVE_EBNO_DB: [f64; 12] = [
    -1.0, 0.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, 35.0, 36.0,
];

/// Frame error rate at each anchor, for 802.11p at 6 Mbps.
static FER_CURVE_FER: [f64; 12] = [
    1.0, 1.0, 0.99, 0.97, 0.85, 0.55, 0.22, 0.06, 0.012, 1e-4, 0.0, 0.0,
];

/// Air time of one 802.11p frame: preamble and SIGNAL plus header and payload bits.
pub fn transmission_duration(packet_size_bytes: u32, data_rate_bps: f64) -> f64 {
    let frame_bits = (packet_size_bytes as u64 + HEADER_BYTES as u64) * 8;
    PHY_OVERHEAD + frame_bits as f64 / data_rate_bps
}

/// Offset converting SINR (dB) to Eb/No (dB) for a given data rate.
pub fn ebno_offset_db(data_rate_bps: f64) -> f64 {
    10.0 * (BANDWIDTH_HZ / data_rate_bps).log10()
}

/// Linear interpolation clamped to the end values outside `xs`.
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let upper = xs.partition_point(|&anchor| anchor < x);

    if upper == 0 {
        return ys[0];
    }
    if upper == xs.len() {
        return ys[ys.len() - 1];
    }

    let (x0, x1) = (xs[upper - 1], xs[upper]);
    let (y0, y1) = (ys[upper - 1], ys[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Expected frame error rate over an Eb/No density.
///
/// `ebno_db` must be ascending and `density` sampled on it with spacing `step_db`,
/// so that the Riemann sum `Σ density·step` is one.
pub fn average_fer(ebno_db: &[f64], density: &[f64], step_db: f64) -> f64 {
    debug_assert_eq!(ebno_db.len(), density.len());

    let (Some(&first), Some(&last)) = (ebno_db.first(), ebno_db.last()) else {
        return 0.0;
    };

    let mut anchors = FER_CURVE_EBNO_DB;
    anchors[0] = (-1.0f64).min(first);
    anchors[anchors.len() - 1] = 36.0f64.max(last);

    let expected: f64 = ebno_db
        .iter()
        .zip(density)
        .map(|(&ebno, &p)| p * interpolate(ebno, &anchors, &FER_CURVE_FER))
        .sum::<f64>()
        * step_db;

    trace!(first, last, expected, "Average FER");
    checked_probability("average FER", expected)
}
