use clap::Parser;
use modsync::commands::sync::{self, RunOutput};
use modsync::config::Cli;
use modsync::{CancelToken, Config};
use tracing::debug;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(err) = modsync::logging::init(cli.verbose) {
        eprintln!("warning: logging disabled: {err}");
    }

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;
    debug!(?config, version = modsync::VERSION, "configuration loaded");

    let cancel = CancelToken::new();
    sync::cancel_on_ctrl_c(cancel.clone());

    let output = match sync::run(config, cancel) {
        Ok(output) => output,
        Err(err) if err.is_run_fatal() => {
            return Err(anyhow::Error::new(err).context("cannot start sync"));
        }
        Err(err) => return Err(err.into()),
    };
    if !output.is_success() {
        let failed = match &output {
            RunOutput::Planned(plan) => plan.stats.fail_count,
            RunOutput::Synced(report) => report.stats.failed,
        };
        eprintln!("{failed} mod(s) failed");
        std::process::exit(1);
    }

    Ok(())
}
