//! Error types for inventory loading, device sessions and console input.
//!
//! Inventory failures are recoverable: the loaders log them and hand back an
//! empty result. Session failures are caught per router by the runner.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Errors raised while reading the reference files.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON, or does not have the expected shape.
    #[error("error decoding JSON from {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A router entry exists but cannot be used.
    #[error("router {router} in {} is malformed: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        router: String,
        reason: String,
    },

    /// The router identifier is not a key of the file.
    #[error("router {router} not found in {}", .path.display())]
    RouterNotFound { router: String, path: PathBuf },
}

/// Errors that can occur while talking to a device.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The target mode cannot be reached from the current mode.
    #[error("unreachable state {0}")]
    UnreachableState(String),

    /// The SSH channel was disconnected while waiting for a prompt.
    ///
    /// This typically happens when the device closes the connection during
    /// login or in the middle of a command.
    #[error("channel disconnect on wait prompt")]
    ChannelDisconnectError,

    /// The session has already been closed.
    #[error("connect closed")]
    ConnectClosedError,

    /// No prompt was seen after login within the connect timeout.
    #[error("init timeout: {0}")]
    InitTimeout(String),

    /// Command execution timed out.
    ///
    /// The error carries the partial output received before the timeout.
    #[error("exec command timeout: {0}")]
    ExecTimeout(String),

    /// The device answered a command with an error message.
    #[error("command '{command}' rejected: {output}")]
    CommandRejected { command: String, output: String },

    /// The device landed in a different mode than the transition expected.
    #[error("expected mode {expected}, device is in {actual}")]
    ModeMismatch { expected: String, actual: String },

    /// No built-in template exists for the requested device type.
    #[error("unsupported device type {0}")]
    TemplateNotFound(String),

    /// A device handler was built from an invalid pattern set.
    #[error("invalid device handler config: {0}")]
    InvalidDeviceHandlerConfig(String),

    /// An error occurred in the async-ssh2-tokio library.
    #[error("async ssh2 error: {0}")]
    Ssh2Error(#[from] async_ssh2_tokio::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Failed to hand data to the shell I/O task.
    #[error("Failed to send data: {0}")]
    SendDataError(#[from] SendError<String>),
}

/// Errors from interactive console input.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("failed to read {field}: {source}")]
    Io {
        field: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {field}: {reason}")]
    Interactive { field: &'static str, reason: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}
