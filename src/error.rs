//! # Error Types
//!
//! Custom error types for Handycon using `thiserror`.

use thiserror::Error;

/// Main error type for Handycon
#[derive(Debug, Error)]
pub enum HandyconError {
    /// Host hardware has no known chord table
    #[error("Unsupported device: {product_name} (CPU vendor: {cpu_vendor})")]
    UnsupportedDevice {
        product_name: String,
        cpu_vendor: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be written back
    #[error("Configuration write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Input device errors (open, grab, hide)
    #[error("Device error: {0}")]
    Device(String),

    /// Virtual controller could not be built or written
    #[error("Virtual device error: {0}")]
    VirtualDevice(String),

    /// Performance-mode helper channel errors
    #[error("IPC error: {0}")]
    Ipc(String),

    /// External command failures
    #[error("Command error: {0}")]
    Command(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Handycon
pub type Result<T> = std::result::Result<T, HandyconError>;
