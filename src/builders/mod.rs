//! Builders turning profiles and calibration plans into runnable commands.

pub mod calibrate;
pub mod serve;

pub use calibrate::*;
pub use serve::*;
