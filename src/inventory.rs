//! Router reference files.
//!
//! Two JSON documents describe the lab: one maps each router identifier to
//! its connection parameters, the other maps it to the configuration lines
//! that should be pushed. Both are plain read-only data and are reread on
//! every lookup.
//!
//! ```json
//! { "R1": { "device_type": "cisco_ios", "host": "192.168.122.11",
//!           "username": "", "password": "", "secret": "" } }
//! ```
//!
//! ```json
//! { "R1": ["interface Loopback0", "ip address 192.168.255.1 255.255.255.255"] }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, error, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DEFAULT_SSH_PORT;
use crate::error::InventoryError;

/// Short symbolic router name, the join key between both files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RouterId(String);

impl RouterId {
    /// Builds an identifier from user input. Surrounding whitespace is
    /// dropped; an empty name yields `None`.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        (!name.is_empty()).then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RouterId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| "router name must not be empty".to_string())
    }
}

/// Credentials typed in at the start of a run.
///
/// They replace whatever the values file stores for every router.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Enable secret.
    pub secret: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything needed to open a session to one router.
#[derive(Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ConnectionParams {
    /// Device dialect, e.g. `cisco_ios`.
    pub device_type: String,
    /// Management address or host name.
    #[serde(alias = "ip")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Stored credentials are placeholders; whatever the file holds for
    /// them is ignored and [`ConnectionParams::with_credentials`] fills them.
    #[serde(default, skip_deserializing)]
    pub username: String,
    #[serde(default, skip_deserializing)]
    pub password: String,
    #[serde(default, skip_deserializing)]
    pub secret: String,
    /// Per-command timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl ConnectionParams {
    /// Replaces the stored credentials with the runtime ones.
    pub fn with_credentials(mut self, credentials: &Credentials) -> Self {
        self.username = credentials.username.clone();
        self.password = credentials.password.clone();
        self.secret = credentials.secret.clone();
        self
    }

    /// `user@host:port`, used in log lines.
    pub fn device_addr(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("device_type", &self.device_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Ordered configuration lines for one router, sent verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CommandSet(Vec<String>);

impl CommandSet {
    pub fn new(lines: Vec<String>) -> Self {
        Self(lines)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CommandSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Reads a reference file as a JSON object keyed by router name.
fn read_object(path: &Path) -> Result<Map<String, Value>, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| InventoryError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Parsed router → command list file.
#[derive(Debug, Clone)]
pub struct CommandBook {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl CommandBook {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let entries = read_object(path)?;
        debug!("Loaded {} command entries from {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Returns the command set of `router`.
    ///
    /// A router mapped to an empty list counts as not found.
    pub fn commands(&self, router: &RouterId) -> Result<CommandSet, InventoryError> {
        let entry = self
            .entries
            .get(router.as_str())
            .ok_or_else(|| self.not_found(router))?;
        let commands: CommandSet =
            serde_json::from_value(entry.clone()).map_err(|e| InventoryError::Malformed {
                path: self.path.clone(),
                router: router.to_string(),
                reason: e.to_string(),
            })?;
        if commands.is_empty() {
            return Err(self.not_found(router));
        }
        Ok(commands)
    }

    fn not_found(&self, router: &RouterId) -> InventoryError {
        InventoryError::RouterNotFound {
            router: router.to_string(),
            path: self.path.clone(),
        }
    }
}

/// Parsed router → connection parameters file.
#[derive(Debug, Clone)]
pub struct ParamsBook {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl ParamsBook {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let entries = read_object(path)?;
        debug!("Loaded {} router entries from {}", entries.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Returns the parameters of `router` with the runtime credentials in
    /// place of the stored ones.
    pub fn params(
        &self,
        router: &RouterId,
        credentials: &Credentials,
    ) -> Result<ConnectionParams, InventoryError> {
        let entry = self
            .entries
            .get(router.as_str())
            .ok_or_else(|| InventoryError::RouterNotFound {
                router: router.to_string(),
                path: self.path.clone(),
            })?;
        let params: ConnectionParams =
            serde_json::from_value(entry.clone()).map_err(|e| InventoryError::Malformed {
                path: self.path.clone(),
                router: router.to_string(),
                reason: e.to_string(),
            })?;
        Ok(params.with_credentials(credentials))
    }
}

/// Emits the single diagnostic for a failed lookup.
fn report(kind: &str, err: &InventoryError) {
    match err {
        InventoryError::RouterNotFound { .. } => warn!("{kind}: {err}"),
        _ => error!("{kind}: {err}"),
    }
}

/// Looks up the command set of `router` in the file at `path`.
///
/// Any failure is logged once and yields an empty set.
pub fn router_commands(router: &RouterId, path: impl AsRef<Path>) -> CommandSet {
    match CommandBook::load(path).and_then(|book| book.commands(router)) {
        Ok(commands) => commands,
        Err(err) => {
            report("config file", &err);
            CommandSet::default()
        }
    }
}

/// Looks up the connection parameters of `router` in the file at `path`
/// and applies `credentials`.
///
/// Any failure is logged once and yields `None`.
pub fn router_params(
    router: &RouterId,
    path: impl AsRef<Path>,
    credentials: &Credentials,
) -> Option<ConnectionParams> {
    match ParamsBook::load(path).and_then(|book| book.params(router, credentials)) {
        Ok(params) => Some(params),
        Err(err) => {
            report("values file", &err);
            None
        }
    }
}
