use thiserror::Error;

/// Rejected link parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    /// Vehicle density must be finite and positive.
    #[error("vehicle density must be positive, got {0} veh/m")]
    VehicleDensity(f64),

    /// Packet rate must be finite and positive.
    #[error("packet rate must be positive, got {0} Hz")]
    PacketRate(f64),

    /// Transmit power must be finite.
    #[error("transmit power must be finite, got {0} dBm")]
    TxPower(f64),

    /// Packet size must be at least one byte.
    #[error("packet size must be positive")]
    PacketSize,

    /// Data rate must be finite and positive.
    #[error("data rate must be positive, got {0} bps")]
    DataRate(f64),
}
