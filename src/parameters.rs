use crate::{error::ParameterError, layers::link::transmission_duration};

/// Parameters of one analytical run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkParameters {
    vehicle_density: f64,
    packet_rate: f64,
    tx_power_dbm: f64,
    packet_size_bytes: u32,
    data_rate_bps: f64,
}

impl LinkParameters {
    /// Validates and creates a parameter set.
    ///
    /// * `vehicle_density` - vehicles per meter of road
    /// * `packet_rate` - packets per second per vehicle
    /// * `tx_power_dbm` - transmit power
    /// * `packet_size_bytes` - payload size, without the MAC header
    /// * `data_rate_bps` - PHY data rate
    pub fn new(
        vehicle_density: f64,
        packet_rate: f64,
        tx_power_dbm: f64,
        packet_size_bytes: u32,
        data_rate_bps: f64,
    ) -> Result<Self, ParameterError> {
        if !(vehicle_density.is_finite() && vehicle_density > 0.0) {
            return Err(ParameterError::VehicleDensity(vehicle_density));
        }
        if !(packet_rate.is_finite() && packet_rate > 0.0) {
            return Err(ParameterError::PacketRate(packet_rate));
        }
        if !tx_power_dbm.is_finite() {
            return Err(ParameterError::TxPower(tx_power_dbm));
        }
        if packet_size_bytes == 0 {
            return Err(ParameterError::PacketSize);
        }
        if !(data_rate_bps.is_finite() && data_rate_bps > 0.0) {
            return Err(ParameterError::DataRate(data_rate_bps));
        }

        Ok(Self {
            vehicle_density,
            packet_rate,
            tx_power_dbm,
            packet_size_bytes,
            data_rate_bps,
        })
    }

    /// Vehicles per meter.
    pub fn vehicle_density(&self) -> f64 {
        self.vehicle_density
    }

    /// Packets per second per vehicle.
    pub fn packet_rate(&self) -> f64 {
        self.packet_rate
    }

    /// Transmit power in dBm.
    pub fn tx_power_dbm(&self) -> f64 {
        self.tx_power_dbm
    }

    /// Payload size in bytes.
    pub fn packet_size_bytes(&self) -> u32 {
        self.packet_size_bytes
    }

    /// PHY data rate in bits per second.
    pub fn data_rate_bps(&self) -> f64 {
        self.data_rate_bps
    }

    /// Air time of one packet, in seconds.
    pub fn transmission_duration(&self) -> f64 {
        transmission_duration(self.packet_size_bytes, self.data_rate_bps)
    }
}
