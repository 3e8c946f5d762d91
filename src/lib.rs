//! Analytical PDR model of IEEE 802.11p vehicle-to-vehicle broadcast

#![forbid(unsafe_code, unused_must_use)]
#![warn(clippy::all, missing_docs)]

/// Physical and protocol constants.
pub mod common;

/// Parameter validation errors.
pub mod error;

/// Link parameters of a run.
pub mod parameters;

/// Physical and link layer models.
pub mod layers;

/// SINR distribution.
pub mod channel;

/// Channel occupancy and CBR.
pub mod occupancy;

/// Distance sweep and loss composition.
pub mod simulation;

pub use error::ParameterError;
pub use parameters::LinkParameters;
pub use simulation::{RunReport, run};
