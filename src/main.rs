use std::io::Write;

use anyhow::Context;
use env_logger::{Builder, Env, Target};
use log::info;

use netpush::console;
use netpush::runner::SessionRunner;
use netpush::session::SshConnector;

fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let credentials = console::prompt_credentials().context("reading credentials")?;
    let routers = console::prompt_routers().context("reading router names")?;
    let config = console::prompt_run_config().context("reading run settings")?;

    info!(
        "Configuring {} router(s) from {} and {}",
        routers.len(),
        config.values_path.display(),
        config.configs_path.display()
    );

    let connector = SshConnector::new(config.security);
    let runner = SessionRunner::new(connector, config, credentials);
    let report = runner.run(&routers).await;

    console::print_summary(&report);
    Ok(())
}
