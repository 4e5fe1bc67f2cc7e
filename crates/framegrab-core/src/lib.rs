pub mod buffer;
pub mod config;
pub mod convert;
pub mod errors;
pub mod ppm;
pub mod types;

pub use buffer::OutputBuffer;
pub use config::GrabConfig;
pub use errors::{CaptureError, ConfigError, GrabError};
pub use types::*;
