//! Warden Core - shared error handling and logging for the Warden workspace

pub mod error;
pub mod logging;

pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
