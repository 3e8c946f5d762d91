//! PDR and loss decomposition versus distance.

use crate::{
    channel::{LinkPower, SinrDistribution},
    common::*,
    layers::{
        link::average_fer,
        physical::{PropagationSample, detection_probability, propagation, sensing_error},
    },
    occupancy::RunContext,
    parameters::LinkParameters,
};

use rayon::prelude::*;
use tracing::{debug, instrument, trace};

/// Where an interferer sits relative to the two ends of the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Proximity {
    /// Strictly closer to the receiver than to the transmitter
    NearerReceiver,
    /// At least as close to the transmitter as to the receiver
    NearerTransmitter,
}

impl Proximity {
    /// Classifies an interferer from its distances to both ends.
    pub fn classify(to_receiver: f64, to_transmitter: f64) -> Self {
        if to_receiver < to_transmitter {
            Self::NearerReceiver
        } else {
            Self::NearerTransmitter
        }
    }
}

/// Contribution of one interferer to the receiver-busy and collision errors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterfererRecord {
    /// Signed position relative to the receiver
    pub offset: f64,
    /// Geometry class
    pub proximity: Proximity,
    /// `p_RXB_CT + p_RXB_HT`
    pub receiver_busy: f64,
    /// `p_COL_CT + p_COL_HT`
    pub collision: f64,
}

/// The four loss causes, in causal order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorProbabilities {
    /// Received below the sensing threshold
    pub sensing: f64,
    /// Receiver already busy with another packet
    pub receiver_busy: f64,
    /// Undecodable without interference
    pub propagation: f64,
    /// Undecodable because of an overlapping transmission
    pub collision: f64,
}

impl ErrorProbabilities {
    /// Gates every cause by survival of all the causes before it.
    pub fn chained(&self) -> Self {
        let survive_sensing = 1.0 - self.sensing;
        let survive_busy = survive_sensing * (1.0 - self.receiver_busy);
        let survive_propagation = survive_busy * (1.0 - self.propagation);

        Self {
            sensing: self.sensing,
            receiver_busy: checked_probability("receiver busy", self.receiver_busy * survive_sensing),
            propagation: checked_probability("propagation", self.propagation * survive_busy),
            collision: checked_probability("collision", self.collision * survive_propagation),
        }
    }

    /// Sum of the four causes.
    pub fn total(&self) -> f64 {
        self.sensing + self.receiver_busy + self.propagation + self.collision
    }
}

/// Metrics at one transmitter-receiver distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceMetrics {
    /// Distance as requested
    pub distance: f64,
    /// Packet Delivery Ratio
    pub pdr: f64,
    /// Chained loss decomposition
    pub errors: ErrorProbabilities,
}

/// Output of one run: per-distance metrics and the run's CBR.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    cbr: f64,
    metrics: Vec<DistanceMetrics>,
}

impl RunReport {
    /// Channel Busy Ratio.
    pub fn cbr(&self) -> f64 {
        self.cbr
    }

    /// Per-distance metrics, in request order.
    pub fn metrics(&self) -> &[DistanceMetrics] {
        &self.metrics
    }

    /// Evaluated distances.
    pub fn distances(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.distance).collect()
    }

    /// PDR per distance.
    pub fn pdr(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.pdr).collect()
    }

    /// Sensing error per distance.
    pub fn delta_sen(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.errors.sensing).collect()
    }

    /// Receiver-busy error per distance.
    pub fn delta_rxb(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.errors.receiver_busy).collect()
    }

    /// Propagation error per distance.
    pub fn delta_pro(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.errors.propagation).collect()
    }

    /// Collision error per distance.
    pub fn delta_col(&self) -> Vec<f64> {
        self.metrics.iter().map(|m| m.errors.collision).collect()
    }
}

/// Interferer offsets from the receiver.
///
/// Vehicles sit every `1 / vehicle_density` meters, the receiver's own slot excluded,
/// up to [`SENSING_RANGE`] and never more than [`MAX_INTERFERERS_PER_SIDE`] per side.
pub fn interferer_ensemble(vehicle_density: f64) -> Vec<f64> {
    let spacing = 1.0 / vehicle_density;
    let per_side = ((SENSING_RANGE as f64 * vehicle_density + 1e-9).floor() as usize).min(MAX_INTERFERERS_PER_SIDE);

    (1..=per_side)
        .rev()
        .map(|k| -(k as f64) * spacing)
        .chain((1..=per_side).map(|k| k as f64 * spacing))
        .collect()
}

/// Expected FER of the desired link, optionally with one interferer.
fn expected_fer(signal: LinkPower, interferer: Option<LinkPower>, data_rate_bps: f64) -> f64 {
    let ebno = SinrDistribution::new(signal, interferer, NOISE_DBM, SENSING_THRESHOLD_DBM, STEP_DB)
        .to_ebno(data_rate_bps);

    average_fer(ebno.grid(), ebno.density(), ebno.step_db())
}

/// Receiver-busy and collision probabilities caused by the vehicle at `offset`.
///
/// `link` is the transmitter-receiver propagation, `distance` the link length and
/// `baseline_fer` the interference-free propagation error.
pub fn interferer_record(
    ctx: &RunContext,
    link: &PropagationSample,
    distance: f64,
    offset: f64,
    baseline_fer: f64,
) -> InterfererRecord {
    let params = ctx.params();
    let tx_power = params.tx_power_dbm();
    let rate = params.packet_rate();

    let to_receiver = propagation(offset);
    let to_transmitter = propagation(distance + offset);
    let proximity = Proximity::classify(offset.abs(), (distance + offset).abs());

    // Marginal error added by this interferer on top of propagation losses
    let interference = if baseline_fer >= 1.0 {
        0.0
    } else {
        let signal = LinkPower::new(link.received_power_dbm(tx_power), link.shadowing_std_db);
        let interferer = LinkPower::new(
            to_receiver.received_power_dbm(tx_power),
            to_receiver.shadowing_std_db,
        );
        let with_interferer = expected_fer(signal, Some(interferer), params.data_rate_bps());
        ((with_interferer - baseline_fer) / (1.0 - baseline_fer)).clamp(0.0, 1.0)
    };

    let detected_by_rx = detection_probability(tx_power, &to_receiver, SENSING_THRESHOLD_DBM);
    let detected_by_tx = detection_probability(tx_power, &to_transmitter, SENSING_THRESHOLD_DBM);

    // Overlap probabilities, inflated by the channel time the interferer spends deferring
    let idle = ctx.idle_fraction(offset);
    let sim_ct = (SLOT_TIME * rate * detected_by_tx / idle).min(1.0);
    let sim_ht = (2.0 * ctx.transmission_duration() * rate * (1.0 - detected_by_tx) / idle).min(1.0);

    // Same-slot starts: the stronger arrival wins the receiver
    let (rxb_ct, col_ct) = match proximity {
        Proximity::NearerReceiver => (
            sim_ct * detected_by_rx,
            sim_ct * (1.0 - detected_by_rx) * interference,
        ),
        Proximity::NearerTransmitter => (0.0, sim_ct * interference),
    };

    // Hidden terminal: half the window the interferer starts first, half it starts second
    let rxb_ht = sim_ht * 0.5 * detected_by_rx;
    let col_ht = sim_ht * (0.5 * (1.0 - detected_by_rx) + 0.5) * interference;

    InterfererRecord {
        offset,
        proximity,
        receiver_busy: checked_probability("interferer receiver busy", (rxb_ct + rxb_ht).min(1.0)),
        collision: checked_probability("interferer collision", (col_ct + col_ht).min(1.0)),
    }
}

/// Probability that at least one independent event happens.
fn any_of(probabilities: impl Iterator<Item = f64>) -> f64 {
    1.0 - probabilities.fold(1.0, |survive, p| survive * (1.0 - p))
}

/// Evaluates every loss cause and the PDR at one distance.
#[instrument(skip(ctx))]
pub fn evaluate_distance(ctx: &RunContext, distance: f64) -> DistanceMetrics {
    let params = ctx.params();
    let tx_power = params.tx_power_dbm();
    let length = distance.abs();

    let link = propagation(length);
    let sensing = sensing_error(tx_power, &link);
    let signal = LinkPower::new(link.received_power_dbm(tx_power), link.shadowing_std_db);
    let propagation_error = expected_fer(signal, None, params.data_rate_bps());

    let records: Vec<InterfererRecord> = interferer_ensemble(params.vehicle_density())
        .into_par_iter()
        .map(|offset| interferer_record(ctx, &link, length, offset, propagation_error))
        .collect();

    let pre_chain = ErrorProbabilities {
        sensing,
        receiver_busy: checked_probability("receiver busy", any_of(records.iter().map(|r| r.receiver_busy))),
        propagation: propagation_error,
        collision: checked_probability("collision", any_of(records.iter().map(|r| r.collision))),
    };
    trace!(
        sensing = pre_chain.sensing,
        receiver_busy = pre_chain.receiver_busy,
        propagation = pre_chain.propagation,
        collision = pre_chain.collision,
        interferers = records.len(),
        "Unchained errors"
    );

    let errors = pre_chain.chained();
    let pdr = checked_probability("PDR", 1.0 - errors.total());

    DistanceMetrics {
        distance,
        pdr,
        errors,
    }
}

/// Runs the model on arbitrary distances.
///
/// The run context (CBR and sensing correlation) is complete before any distance
/// is evaluated.
pub fn evaluate_distances(params: &LinkParameters, distances: &[f64]) -> RunReport {
    let ctx = RunContext::new(params);

    let metrics: Vec<DistanceMetrics> = distances
        .par_iter()
        .map(|&distance| evaluate_distance(&ctx, distance))
        .collect();

    debug!(cbr = ctx.cbr(), distances = metrics.len(), "Run finished");

    RunReport {
        cbr: ctx.cbr(),
        metrics,
    }
}

/// Runs the model on the reporting grid, 0 to 500 m every 25 m.
pub fn run(params: &LinkParameters) -> RunReport {
    evaluate_distances(params, &reporting_distances())
}
