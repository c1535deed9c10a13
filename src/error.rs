//! Error types for failures that propagate inside the core.
//!
//! Tool-level failures (device offline, bad arguments, blocked commands,
//! failed `adb` invocations) are *values*: they travel back to the agent as
//! a failure [`Envelope`](crate::envelope::Envelope). [`AdbError`] only covers
//! the few paths that return `Result` before an envelope is built.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdbError {
    /// No explicit device was given and no default device is set.
    #[error("No device specified")]
    NoDevice,

    /// `adb devices -l` itself failed, so the device list is unknown.
    #[error("Failed to get devices: {0}")]
    Enumeration(String),

    /// Unreadable or invalid configuration.
    #[error("{0}")]
    Config(String),
}
