/// Propagation and sensing
pub mod physical;

/// Frame timing and frame error rate
pub mod link;
