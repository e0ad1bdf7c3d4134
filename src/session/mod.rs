//! Remote sessions to network devices.
//!
//! The runner only sees the [`Connector`] and [`DeviceSession`] traits: open
//! a session, enter privileged mode, push a batch of configuration lines,
//! run a single command, close. [`SshConnector`] implements them over an
//! interactive SSH shell driven by the prompt state machine in
//! [`crate::device`].
//!
//! # Main Components
//!
//! - [`Connector`] / [`DeviceSession`] - capability seen by the runner
//! - [`SshConnector`] - opens [`SshSession`]s with a security profile
//! - [`SshSession`] - one SSH shell with prompt tracking
//! - [`Output`] - result of one command

use std::time::Duration;

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::Config;
use async_trait::async_trait;
use log::{debug, trace};
use russh::ChannelMsg;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::config::{self, SecurityProfile};
use crate::device::{DeviceHandler, ENABLE_PASSWORD, IGNORE_START_LINE};
use crate::error::ConnectError;
use crate::inventory::{CommandSet, ConnectionParams};
use crate::templates::{self, CONFIG_MODE, ENABLE_MODE};

/// An open administrative session on one device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Enters privileged (enable) mode.
    async fn enable(&mut self) -> Result<(), ConnectError>;

    /// Enters configuration mode, sends every line in order and returns to
    /// privileged mode. Returns the combined device output.
    async fn send_config_set(&mut self, commands: &CommandSet) -> Result<String, ConnectError>;

    /// Runs one command in privileged mode and returns its output.
    async fn send_command(&mut self, command: &str) -> Result<String, ConnectError>;

    /// Releases the session. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), ConnectError>;
}

/// Opens sessions from connection parameters.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, params: &ConnectionParams)
    -> Result<Box<dyn DeviceSession>, ConnectError>;
}

/// The output result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct Output {
    /// `false` if the device printed an error message.
    pub success: bool,
    /// Output without the echoed command and the trailing prompt.
    pub content: String,
    /// Everything received, prompt included.
    pub all: String,
}

/// Opens [`SshSession`]s.
#[derive(Debug, Clone)]
pub struct SshConnector {
    profile: SecurityProfile,
    connect_timeout: Duration,
}

impl SshConnector {
    pub fn new(profile: SecurityProfile) -> Self {
        Self {
            profile,
            connect_timeout: config::DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(SecurityProfile::default())
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn open(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn DeviceSession>, ConnectError> {
        let session = SshSession::connect(params, self.profile, self.connect_timeout).await?;
        Ok(Box::new(session))
    }
}

/// One interactive SSH shell on a device.
pub struct SshSession {
    client: Client,
    sender: Sender<String>,
    recv: Receiver<String>,
    handler: DeviceHandler,
    prompt: String,
    device_addr: String,
    timeout: Duration,
    paging_command: Option<&'static str>,
    closed: bool,
}

mod client;
