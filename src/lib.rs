//! Post-processing utilities for step-wise g4simple simulation output.

#![warn(clippy::all, rust_2018_idioms)]

pub mod aggregate;
pub mod error;
pub mod histogram;
pub mod hit_data;
pub mod process;
pub mod spectra;
pub mod step_source;
