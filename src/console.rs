//! Interactive prompts and the console report.

use std::path::PathBuf;

use dialoguer::Input;

use crate::config::{DEFAULT_CONFIGS_FILE, DEFAULT_VALUES_FILE, RunConfig};
use crate::error::PromptError;
use crate::inventory::{Credentials, RouterId};
use crate::runner::{RouterOutcome, RunReport};

const BANNER_WIDTH: usize = 100;

/// Map a dialoguer failure into a PromptError.
fn prompt_err(field: &'static str) -> impl Fn(dialoguer::Error) -> PromptError {
    move |e| PromptError::Interactive {
        field,
        reason: e.to_string(),
    }
}

fn read_text(prompt: &str, field: &'static str) -> Result<String, PromptError> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err(field))
}

fn read_text_or(prompt: &str, default: &str, field: &'static str) -> Result<String, PromptError> {
    Input::<String>::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()
        .map_err(prompt_err(field))
}

fn read_masked(prompt: &str, field: &'static str) -> Result<String, PromptError> {
    rpassword::prompt_password(prompt).map_err(|source| PromptError::Io { field, source })
}

/// Asks for the SSH username, password and enable secret.
pub fn prompt_credentials() -> Result<Credentials, PromptError> {
    let username = read_text("Enter your SSH username", "username")?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(PromptError::Empty("username"));
    }
    let password = read_masked("Enter your SSH password: ", "password")?;
    let secret = read_masked("Enter your enable password: ", "enable password")?;
    Ok(Credentials::new(username, password, secret))
}

/// Asks for the routers to configure.
pub fn prompt_routers() -> Result<Vec<RouterId>, PromptError> {
    let line = read_text("Enter the router names (e.g. R1, R2)", "router names")?;
    let routers = parse_router_list(&line);
    if routers.is_empty() {
        return Err(PromptError::Empty("router list"));
    }
    Ok(routers)
}

/// Asks for the reference file paths and the optional verification command.
pub fn prompt_run_config() -> Result<RunConfig, PromptError> {
    let values = read_text_or(
        "Router values file",
        DEFAULT_VALUES_FILE,
        "router values file",
    )?;
    let configs = read_text_or(
        "Router configs file",
        DEFAULT_CONFIGS_FILE,
        "router configs file",
    )?;
    let verify = read_text(
        "Verification command (blank to skip)",
        "verification command",
    )?;

    let config = RunConfig {
        values_path: PathBuf::from(values.trim()),
        configs_path: PathBuf::from(configs.trim()),
        ..RunConfig::default()
    };
    Ok(config.with_verify_command(verify))
}

/// Splits user input on commas and whitespace, dropping duplicates while
/// keeping the first occurrence order.
pub fn parse_router_list(line: &str) -> Vec<RouterId> {
    let mut routers: Vec<RouterId> = Vec::new();
    for router in line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(RouterId::new)
    {
        if !routers.contains(&router) {
            routers.push(router);
        }
    }
    routers
}

/// The three-line banner printed before connecting to a router.
pub fn router_banner(router: &RouterId) -> String {
    let rule = "#".repeat(BANNER_WIDTH);
    format!("{rule}\nConnecting to Router {router}\n{rule}\n")
}

pub fn print_router_banner(router: &RouterId) {
    println!("{}", router_banner(router));
}

pub fn print_section(title: &str, body: &str) {
    println!("=== {title} ===");
    println!("{body}");
}

/// One line per router followed by the totals.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for entry in &report.routers {
        let status = match &entry.outcome {
            RouterOutcome::Configured {
                verification: Some(Err(error)),
                ..
            } => format!("configured, failed to verify: {error}"),
            RouterOutcome::Configured { .. } => "configured".to_string(),
            RouterOutcome::Skipped { reason } => format!("skipped ({reason})"),
            RouterOutcome::Failed { during, error } => format!("failed to {during}: {error}"),
        };
        out.push_str(&format!("{:<8} {status}\n", entry.router.as_str()));
    }
    out.push_str(&format!(
        "{} configured, {} skipped, {} failed\n",
        report.configured(),
        report.skipped(),
        report.failed()
    ));
    out
}

pub fn print_summary(report: &RunReport) {
    print_section("SUMMARY", render_summary(report).trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RouterReport, SkipReason, Stage};

    fn id(name: &str) -> RouterId {
        RouterId::new(name).expect("valid router id")
    }

    #[test]
    fn router_list_splits_on_commas_and_spaces() {
        let routers = parse_router_list(" R1, R2  R3,,R1 ");
        assert_eq!(routers, vec![id("R1"), id("R2"), id("R3")]);
    }

    #[test]
    fn blank_router_list_is_empty() {
        assert!(parse_router_list("  , ,").is_empty());
    }

    #[test]
    fn banner_frames_router_name() {
        let banner = router_banner(&id("R1"));
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#".repeat(100));
        assert_eq!(lines[1], "Connecting to Router R1");
        assert_eq!(lines[2], lines[0]);
    }

    #[test]
    fn summary_lists_every_router_and_totals() {
        let report = RunReport {
            routers: vec![
                RouterReport {
                    router: id("R1"),
                    outcome: RouterOutcome::Configured {
                        output: String::new(),
                        verification: None,
                    },
                },
                RouterReport {
                    router: id("R2"),
                    outcome: RouterOutcome::Skipped {
                        reason: SkipReason::NoConnectionParams,
                    },
                },
                RouterReport {
                    router: id("R3"),
                    outcome: RouterOutcome::Failed {
                        during: Stage::Connected,
                        error: "connection refused".to_string(),
                    },
                },
                RouterReport {
                    router: id("R4"),
                    outcome: RouterOutcome::Configured {
                        output: String::new(),
                        verification: Some(Err("exec command timeout: ".to_string())),
                    },
                },
            ],
        };

        let summary = render_summary(&report);
        assert!(summary.contains("R1       configured"));
        assert!(summary.contains("R2       skipped (no connection parameters)"));
        assert!(summary.contains("R3       failed to connect: connection refused"));
        assert!(summary.contains("R4       configured, failed to verify: exec command timeout"));
        assert!(summary.ends_with("2 configured, 1 skipped, 1 failed\n"));
    }
}
