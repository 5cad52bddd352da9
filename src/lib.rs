pub mod burn_model;
pub mod chain;
pub mod core;
pub mod data;
pub mod error;
pub mod io;
pub mod kernels;
pub mod mala;
pub mod metropolis_hastings;
pub mod model;
pub mod stats;

pub use error::{Error, Result};
