//! Identity provider implementations.

pub mod azure;
