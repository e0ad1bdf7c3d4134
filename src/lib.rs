//! # netpush - per-router configuration over SSH
//!
//! `netpush` reads two JSON reference files, one with the connection
//! parameters of each router and one with the configuration lines each
//! router should receive, and pushes those lines to every router of a list
//! over SSH, one router at a time.
//!
//! ## Features
//!
//! - **Typed reference files**: routers, connection parameters and command
//!   sets are parsed into typed records; lookup failures are logged and the
//!   router is skipped
//! - **Runtime credentials**: username, password and enable secret typed at
//!   start-up always replace the values stored in the file
//! - **Prompt state machine**: login/enable/config modes are detected from the
//!   device prompt, the enable secret is answered automatically
//! - **Fault isolation**: a router that cannot be reached or rejects a line is
//!   reported and the run continues with the next one
//! - **Pluggable sessions**: the runner talks to a [`session::Connector`], so it
//!   can be driven by fakes in tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netpush::config::RunConfig;
//! use netpush::inventory::{Credentials, RouterId};
//! use netpush::runner::SessionRunner;
//! use netpush::session::SshConnector;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RunConfig::default();
//!     let connector = SshConnector::new(config.security);
//!     let credentials = Credentials::new("admin", "password", "enable-secret");
//!     let runner = SessionRunner::new(connector, config, credentials);
//!
//!     let routers: Vec<RouterId> = ["R1", "R2"].iter().filter_map(RouterId::new).collect();
//!     let report = runner.run(&routers).await;
//!     println!("{} routers configured", report.configured());
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`inventory`] - reference file loaders
//! - [`runner::SessionRunner`] - the per-router loop
//! - [`session::SshConnector`] - SSH implementation of the session capability
//! - [`device::DeviceHandler`] / [`templates`] - prompt and mode tracking
//! - [`error`] - error types

pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod inventory;
pub mod runner;
pub mod session;
pub mod templates;
