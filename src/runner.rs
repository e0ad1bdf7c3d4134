//! Sequential configuration run over a list of routers.
//!
//! Each router goes through
//! `Idle → ParamsLoaded → CommandsLoaded → Connected → Elevated → Configured
//! (→ Verified) → Closed`. A router whose parameters or commands cannot be
//! loaded is skipped; a router whose session fails is reported as failed.
//! Neither stops the run.

use std::fmt;

use log::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::console;
use crate::error::ConnectError;
use crate::inventory::{self, CommandSet, ConnectionParams, Credentials, RouterId};
use crate::session::{Connector, DeviceSession};

/// Where a router is in its configuration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ParamsLoaded,
    CommandsLoaded,
    Connected,
    Elevated,
    Configured,
    Verified,
    Closed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ParamsLoaded => "params loaded",
            Stage::CommandsLoaded => "commands loaded",
            Stage::Connected => "connect",
            Stage::Elevated => "enable",
            Stage::Configured => "configure",
            Stage::Verified => "verify",
            Stage::Closed => "close",
        };
        f.write_str(name)
    }
}

/// Why a router was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Missing or unusable entry in the values file.
    NoConnectionParams,
    /// Missing or empty entry in the config file.
    NoCommands,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoConnectionParams => f.write_str("no connection parameters"),
            SkipReason::NoCommands => f.write_str("no configuration commands"),
        }
    }
}

/// Result for one router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterOutcome {
    Configured {
        output: String,
        /// Output of the verification command, or why it failed. The
        /// configuration stays applied either way.
        verification: Option<Result<String, String>>,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        /// The stage that was being entered when the error happened.
        during: Stage,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterReport {
    pub router: RouterId,
    pub outcome: RouterOutcome,
}

/// Outcomes of a run, in the order the routers were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub routers: Vec<RouterReport>,
}

impl RunReport {
    pub fn configured(&self) -> usize {
        self.count(|o| matches!(o, RouterOutcome::Configured { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RouterOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RouterOutcome::Failed { .. }))
    }

    pub fn outcome(&self, router: &str) -> Option<&RouterOutcome> {
        self.routers
            .iter()
            .find(|r| r.router.as_str() == router)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&RouterOutcome) -> bool) -> usize {
        self.routers.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Pushes configuration to routers one at a time.
pub struct SessionRunner<C> {
    connector: C,
    config: RunConfig,
    credentials: Credentials,
}

impl<C: Connector> SessionRunner<C> {
    pub fn new(connector: C, config: RunConfig, credentials: Credentials) -> Self {
        Self {
            connector,
            config,
            credentials,
        }
    }

    /// Configures every router in `routers`, in order.
    pub async fn run(&self, routers: &[RouterId]) -> RunReport {
        let mut report = RunReport::default();
        for router in routers {
            let outcome = self.configure_router(router).await;
            report.routers.push(RouterReport {
                router: router.clone(),
                outcome,
            });
        }
        info!(
            "Run finished: {} configured, {} skipped, {} failed",
            report.configured(),
            report.skipped(),
            report.failed()
        );
        report
    }

    /// Loads the router's reference data and, if both parts are present,
    /// applies its command set over one session.
    pub async fn configure_router(&self, router: &RouterId) -> RouterOutcome {
        debug!("{router}: {}", Stage::Idle);
        let params = inventory::router_params(router, &self.config.values_path, &self.credentials);
        let commands = inventory::router_commands(router, &self.config.configs_path);

        let Some(params) = params else {
            warn!("Skipping {router}: {}", SkipReason::NoConnectionParams);
            return RouterOutcome::Skipped {
                reason: SkipReason::NoConnectionParams,
            };
        };
        debug!("{router}: {}", Stage::ParamsLoaded);
        if commands.is_empty() {
            warn!("Skipping {router}: {}", SkipReason::NoCommands);
            return RouterOutcome::Skipped {
                reason: SkipReason::NoCommands,
            };
        }
        debug!("{router}: {} ({} lines)", Stage::CommandsLoaded, commands.len());

        console::print_router_banner(router);
        self.run_session(router, &params, &commands).await
    }

    async fn run_session(
        &self,
        router: &RouterId,
        params: &ConnectionParams,
        commands: &CommandSet,
    ) -> RouterOutcome {
        info!("Connecting to {router} ({})", params.device_addr());
        let mut session = match self.connector.open(params).await {
            Ok(session) => session,
            Err(e) => return failed(router, Stage::Connected, e),
        };
        debug!("{router}: {}", Stage::Connected);

        let outcome = match self.apply(router, session.as_mut(), commands).await {
            Ok((output, verification)) => {
                info!("{router} configured");
                RouterOutcome::Configured {
                    output,
                    verification,
                }
            }
            Err((stage, e)) => failed(router, stage, e),
        };

        if let Err(e) = session.close().await {
            warn!("Error closing session to {router}: {e}");
        }
        debug!("{router}: {}", Stage::Closed);
        outcome
    }

    async fn apply(
        &self,
        router: &RouterId,
        session: &mut dyn DeviceSession,
        commands: &CommandSet,
    ) -> Result<(String, Option<Result<String, String>>), (Stage, ConnectError)> {
        session.enable().await.map_err(|e| (Stage::Elevated, e))?;
        debug!("{router}: {}", Stage::Elevated);

        let output = session
            .send_config_set(commands)
            .await
            .map_err(|e| (Stage::Configured, e))?;
        debug!("{router}: {}", Stage::Configured);
        console::print_section("CONFIGURATION OUTPUT", &output);

        let Some(command) = &self.config.verify_command else {
            return Ok((output, None));
        };
        let verification = match session.send_command(command).await {
            Ok(out) => {
                debug!("{router}: {}", Stage::Verified);
                console::print_section("VERIFICATION OUTPUT", &out);
                Ok(out)
            }
            Err(e) => {
                error!("Failed to {} {router}: {e}", Stage::Verified);
                Err(e.to_string())
            }
        };
        Ok((output, Some(verification)))
    }
}

fn failed(router: &RouterId, during: Stage, e: ConnectError) -> RouterOutcome {
    error!("Failed to {during} {router}: {e}");
    RouterOutcome::Failed {
        during,
        error: e.to_string(),
    }
}
