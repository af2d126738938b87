pub mod buffer2;
pub mod file_format;
pub mod log_setup;
pub mod parallel;

pub use buffer2::Buffer2;
pub use file_format::{deserialize, FileExtensionError, SerdeFormat, SerdeFormatError};
pub use log_setup::{setup_logging, LogSetupError};

pub const EPSILON: f64 = 1e-6;
