//! Synthetic data generators and the Monte-Carlo power engine for the
//! agenda-sequencing x accountability study.
//!
//! Data flows one way: config -> synthetic dataset -> design matrix ->
//! robust fit -> per-replicate significance flags -> power table.

pub mod agenda;
pub mod config;
pub mod descriptives;
pub mod design;
pub mod error;
pub mod estimator;
pub mod generator;
pub mod power;
pub mod regression;
pub mod report;
pub mod rng;
pub mod store;
pub mod turns;
pub mod types;
