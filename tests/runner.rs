use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use netpush::config::RunConfig;
use netpush::error::ConnectError;
use netpush::inventory::{CommandSet, ConnectionParams, Credentials, RouterId};
use netpush::runner::{RouterOutcome, SessionRunner, SkipReason, Stage};
use netpush::session::{Connector, DeviceSession};
use tempfile::TempDir;

const VALUES: &str = r#"{
    "R1": { "device_type": "cisco_ios", "host": "192.168.122.11",
            "username": "placeholder", "password": "placeholder", "secret": "placeholder" },
    "R3": { "device_type": "cisco_ios", "host": "192.168.122.13" },
    "R4": { "device_type": "cisco_ios", "host": "192.168.122.14" }
}"#;

const CONFIGS: &str = r#"{
    "R1": ["interface Loopback0", "ip address 192.168.255.1 255.255.255.255",
           "router ospf 1", "network 0.0.0.0 255.255.255.255 area 0"],
    "R2": ["interface Loopback0", "ip address 192.168.255.2 255.255.255.255"],
    "R3": ["interface Loopback0", "ip address 192.168.255.3 255.255.255.255"]
}"#;

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().expect("journal lock").push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

#[derive(Default)]
struct FakeConnector {
    journal: Journal,
    opened: Arc<Mutex<Vec<ConnectionParams>>>,
    unreachable: HashSet<String>,
    enable_fails: HashSet<String>,
    rejected_line: Option<String>,
    verify_fails: bool,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn DeviceSession>, ConnectError> {
        self.journal.push(format!("open {}", params.host));
        if self.unreachable.contains(&params.host) {
            return Err(ConnectError::InitTimeout(format!(
                "connecting to {}",
                params.device_addr()
            )));
        }
        self.opened.lock().expect("opened lock").push(params.clone());
        Ok(Box::new(FakeSession {
            host: params.host.clone(),
            journal: self.journal.clone(),
            enable_fails: self.enable_fails.contains(&params.host),
            rejected_line: self.rejected_line.clone(),
            verify_fails: self.verify_fails,
        }))
    }
}

struct FakeSession {
    host: String,
    journal: Journal,
    enable_fails: bool,
    rejected_line: Option<String>,
    verify_fails: bool,
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn enable(&mut self) -> Result<(), ConnectError> {
        self.journal.push(format!("enable {}", self.host));
        if self.enable_fails {
            return Err(ConnectError::CommandRejected {
                command: "enable".to_string(),
                output: "% Bad secrets".to_string(),
            });
        }
        Ok(())
    }

    async fn send_config_set(&mut self, commands: &CommandSet) -> Result<String, ConnectError> {
        self.journal
            .push(format!("config {} {}", self.host, commands.len()));
        let mut output = String::from("configure terminal\n");
        for line in commands.iter() {
            if self.rejected_line.as_deref() == Some(line) {
                return Err(ConnectError::CommandRejected {
                    command: line.to_string(),
                    output: "% Invalid input detected at '^' marker.".to_string(),
                });
            }
            output.push_str(line);
            output.push('\n');
        }
        output.push_str("end\n");
        Ok(output)
    }

    async fn send_command(&mut self, command: &str) -> Result<String, ConnectError> {
        self.journal.push(format!("command {} {}", self.host, command));
        if self.verify_fails {
            return Err(ConnectError::ExecTimeout(String::new()));
        }
        Ok(format!("output of {command}"))
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        self.journal.push(format!("close {}", self.host));
        Ok(())
    }
}

struct Lab {
    _dir: TempDir,
    config: RunConfig,
}

fn lab(values: &str, configs: &str) -> Lab {
    let dir = tempfile::tempdir().expect("temp dir");
    let write = |name: &str, content: &str| -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create reference file");
        file.write_all(content.as_bytes())
            .expect("write reference file");
        path
    };
    let values_path = write("routers_values.txt", values);
    let configs_path = write("routers_configs.txt", configs);
    Lab {
        config: RunConfig {
            values_path,
            configs_path,
            ..RunConfig::default()
        },
        _dir: dir,
    }
}

fn routers(names: &[&str]) -> Vec<RouterId> {
    names.iter().filter_map(RouterId::new).collect()
}

fn credentials() -> Credentials {
    Credentials::new("netadmin", "s3cret", "en4ble")
}

#[tokio::test]
async fn configures_valid_router_and_skips_router_without_values() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector::default();
    let journal = connector.journal.clone();
    let runner = SessionRunner::new(connector, lab.config.clone(), credentials());

    let report = runner.run(&routers(&["R1", "R2"])).await;

    assert_eq!(report.routers.len(), 2);
    assert!(matches!(
        report.outcome("R1"),
        Some(RouterOutcome::Configured { output, verification: None })
            if output.contains("router ospf 1")
    ));
    assert_eq!(
        report.outcome("R2"),
        Some(&RouterOutcome::Skipped {
            reason: SkipReason::NoConnectionParams
        })
    );
    assert_eq!(
        journal.entries(),
        vec![
            "open 192.168.122.11",
            "enable 192.168.122.11",
            "config 192.168.122.11 4",
            "close 192.168.122.11",
        ]
    );
}

#[tokio::test]
async fn sessions_receive_runtime_credentials() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector::default();
    let opened = connector.opened.clone();
    let runner = SessionRunner::new(connector, lab.config.clone(), credentials());

    runner.run(&routers(&["R1", "R3"])).await;

    let opened = opened.lock().expect("opened lock");
    assert_eq!(opened.len(), 2);
    for params in opened.iter() {
        assert_eq!(params.username, "netadmin");
        assert_eq!(params.password, "s3cret");
        assert_eq!(params.secret, "en4ble");
    }
}

#[tokio::test]
async fn connect_failure_does_not_stop_the_run() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector {
        unreachable: HashSet::from(["192.168.122.11".to_string()]),
        ..FakeConnector::default()
    };
    let journal = connector.journal.clone();
    let runner = SessionRunner::new(connector, lab.config.clone(), credentials());

    let report = runner.run(&routers(&["R1", "R3"])).await;

    assert!(matches!(
        report.outcome("R1"),
        Some(RouterOutcome::Failed { during: Stage::Connected, error })
            if error.contains("192.168.122.11")
    ));
    assert!(matches!(
        report.outcome("R3"),
        Some(RouterOutcome::Configured { .. })
    ));
    assert_eq!(journal.count("open 192.168.122.13"), 1);
    assert_eq!(journal.count("close 192.168.122.11"), 0);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.configured(), 1);
}

#[tokio::test]
async fn session_is_closed_after_enable_failure() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector {
        enable_fails: HashSet::from(["192.168.122.11".to_string()]),
        ..FakeConnector::default()
    };
    let journal = connector.journal.clone();
    let runner = SessionRunner::new(connector, lab.config.clone(), credentials());

    let report = runner.run(&routers(&["R1", "R3"])).await;

    assert!(matches!(
        report.outcome("R1"),
        Some(RouterOutcome::Failed { during: Stage::Elevated, .. })
    ));
    assert_eq!(journal.count("config 192.168.122.11 4"), 0);
    assert_eq!(journal.count("close 192.168.122.11"), 1);
    assert!(matches!(
        report.outcome("R3"),
        Some(RouterOutcome::Configured { .. })
    ));
}

#[tokio::test]
async fn rejected_line_fails_router_and_closes_session() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector {
        rejected_line: Some("router ospf 1".to_string()),
        ..FakeConnector::default()
    };
    let journal = connector.journal.clone();
    let runner = SessionRunner::new(connector, lab.config.clone(), credentials());

    let report = runner.run(&routers(&["R1"])).await;

    assert!(matches!(
        report.outcome("R1"),
        Some(RouterOutcome::Failed { during: Stage::Configured, error })
            if error.contains("router ospf 1")
    ));
    assert_eq!(journal.count("close 192.168.122.11"), 1);
}

#[tokio::test]
async fn verification_command_runs_after_configuration() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector::default();
    let journal = connector.journal.clone();
    let config = lab.config.clone().with_verify_command("show ip ospf neighbor");
    let runner = SessionRunner::new(connector, config, credentials());

    let report = runner.run(&routers(&["R1"])).await;

    assert!(matches!(
        report.outcome("R1"),
        Some(RouterOutcome::Configured { verification: Some(Ok(v)), .. })
            if v == "output of show ip ospf neighbor"
    ));
    assert_eq!(
        journal.entries(),
        vec![
            "open 192.168.122.11",
            "enable 192.168.122.11",
            "config 192.168.122.11 4",
            "command 192.168.122.11 show ip ospf neighbor",
            "close 192.168.122.11",
        ]
    );
}

#[tokio::test]
async fn failed_verification_keeps_router_configured() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector {
        verify_fails: true,
        ..FakeConnector::default()
    };
    let journal = connector.journal.clone();
    let config = lab.config.clone().with_verify_command("show ip ospf neighbor");
    let runner = SessionRunner::new(connector, config, credentials());

    let report = runner.run(&routers(&["R1"])).await;

    assert!(matches!(
        report.outcome("R1"),
        Some(RouterOutcome::Configured { output, verification: Some(Err(e)) })
            if output.contains("router ospf 1") && e.contains("timeout")
    ));
    assert_eq!(report.configured(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(journal.count("close 192.168.122.11"), 1);
}

#[tokio::test]
async fn router_without_commands_is_skipped() {
    let lab = lab(VALUES, CONFIGS);
    let connector = FakeConnector::default();
    let journal = connector.journal.clone();
    let runner = SessionRunner::new(connector, lab.config.clone(), credentials());

    let report = runner.run(&routers(&["R4"])).await;

    assert_eq!(
        report.outcome("R4"),
        Some(&RouterOutcome::Skipped {
            reason: SkipReason::NoCommands
        })
    );
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn unreadable_reference_files_skip_every_router() {
    let lab = lab("not json at all", CONFIGS);
    let connector = FakeConnector::default();
    let journal = connector.journal.clone();
    let mut config = lab.config.clone();
    config.configs_path = config.configs_path.with_file_name("missing.txt");
    let runner = SessionRunner::new(connector, config, credentials());

    let report = runner.run(&routers(&["R1", "R3"])).await;

    assert_eq!(report.skipped(), 2);
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn report_keeps_input_order() {
    let lab = lab(VALUES, CONFIGS);
    let runner = SessionRunner::new(FakeConnector::default(), lab.config.clone(), credentials());

    let report = runner.run(&routers(&["R3", "R2", "R1"])).await;

    let order: Vec<&str> = report.routers.iter().map(|r| r.router.as_str()).collect();
    assert_eq!(order, vec!["R3", "R2", "R1"]);
}
