//! Shared utilities.

pub mod clock;
pub mod paths;
pub mod telemetry;
pub mod text;

pub use clock::*;
pub use paths::*;
pub use telemetry::*;
pub use text::*;
