//! Domain models for the MSE records system.

mod patient;
mod record;

pub use patient::*;
pub use record::*;
