// Candlestick data model
pub mod candlestick;

// Dataset construction (windowing, normalization, targets)
pub mod dataset;

// Domain-specific error types
pub mod errors;

// Pure indicator computations
pub mod indicators;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;
