//! Domain models for the clinic records system.

mod incident;
mod patient;
mod principal;
pub mod timestamp;

pub use incident::*;
pub use patient::*;
pub use principal::*;
