use clap::Parser;
use dotenvy::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use v2x_pdr::{LinkParameters, ParameterError, RunReport, run};

/// Analytical PDR, loss decomposition and CBR of 802.11p broadcast.
///
/// Every option takes a comma-separated list; all combinations are evaluated.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Vehicle density, veh/m
    #[arg(long, env = "V2X_DENSITY", value_delimiter = ',', default_value = "0.06")]
    density: Vec<f64>,

    /// Packets per second per vehicle
    #[arg(long, env = "V2X_PACKET_RATE", value_delimiter = ',', default_value = "10")]
    packet_rate: Vec<f64>,

    /// Transmit power, dBm
    #[arg(long, env = "V2X_TX_POWER", value_delimiter = ',', default_value = "23", allow_negative_numbers = true)]
    tx_power: Vec<f64>,

    /// Payload size, bytes
    #[arg(long, env = "V2X_PACKET_SIZE", value_delimiter = ',', default_value = "190")]
    packet_size: Vec<u32>,

    /// PHY data rate, bps
    #[arg(long, env = "V2X_DATA_RATE", value_delimiter = ',', default_value = "6e6")]
    data_rate: Vec<f64>,
}

impl Args {
    /// Cartesian product of all parameter lists, in argument order.
    fn parameter_sets(&self) -> Result<Vec<LinkParameters>, ParameterError> {
        let mut sets = Vec::new();

        for &density in &self.density {
            for &rate in &self.packet_rate {
                for &power in &self.tx_power {
                    for &size in &self.packet_size {
                        for &data_rate in &self.data_rate {
                            sets.push(LinkParameters::new(density, rate, power, size, data_rate)?);
                        }
                    }
                }
            }
        }

        Ok(sets)
    }
}

fn print_report(params: &LinkParameters, report: &RunReport) {
    for m in report.metrics() {
        println!(
            "{},{},{},{},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            params.vehicle_density(),
            params.packet_rate(),
            params.tx_power_dbm(),
            params.packet_size_bytes(),
            params.data_rate_bps(),
            m.distance,
            m.pdr,
            m.errors.sensing,
            m.errors.receiver_busy,
            m.errors.propagation,
            m.errors.collision,
            report.cbr(),
        );
    }
}

fn main() -> Result<(), ParameterError> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=error", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let sets = args.parameter_sets()?;
    info!(runs = sets.len(), "Starting parameter sweep");

    let progress = ProgressBar::new(sets.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} runs [{elapsed_precise}]") {
        progress.set_style(style);
    }

    let reports: Vec<RunReport> = sets
        .par_iter()
        .map(|params| {
            let report = run(params);
            progress.inc(1);
            report
        })
        .collect();
    progress.finish_and_clear();

    println!(
        "density,packet_rate,tx_power,packet_size,data_rate,distance,pdr,delta_sen,delta_rxb,delta_pro,delta_col,cbr"
    );
    for (params, report) in sets.iter().zip(&reports) {
        print_report(params, report);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_default_arguments() {
        let args = Args::parse_from(["v2x-pdr"]);
        let sets = args.parameter_sets().unwrap();

        assert_eq!(sets, vec![LinkParameters::new(0.06, 10.0, 23.0, 190, 6e6).unwrap()]);
    }

    #[test_log::test]
    fn test_cartesian_product() {
        let args = Args::parse_from([
            "v2x-pdr",
            "--density",
            "0.02,0.06",
            "--packet-rate",
            "5,10,20",
            "--tx-power=-3,23",
        ]);
        let sets = args.parameter_sets().unwrap();

        assert_eq!(sets.len(), 12);
        assert_eq!(sets[0].vehicle_density(), 0.02);
        assert_eq!(sets[0].tx_power_dbm(), -3.0);
        assert_eq!(sets[11].vehicle_density(), 0.06);
        assert_eq!(sets[11].packet_rate(), 20.0);
    }

    #[test_log::test]
    fn test_invalid_arguments() {
        let args = Args::parse_from(["v2x-pdr", "--density", "0"]);

        assert_eq!(args.parameter_sets(), Err(ParameterError::VehicleDensity(0.0)));
    }
}
