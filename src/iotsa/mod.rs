//! iotsa REST client module.

mod client;
#[cfg(test)]
pub(crate) mod stub;

pub use client::{IotsaConfig, IotsaDevice, IotsaError, Protocol, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
