mod app_server;
mod cli;
#[path = "../common.rs"]
mod common;
mod config;
mod interrupts;
mod logging;

use std::process::ExitCode;

use anyhow::Context as _;
use devappserver::StagingDir;
use tracing::info;

use crate::{config::Config, interrupts::Interrupts};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();
    let Config {
        server,
        sources,
        placement,
    } = Config::obtain()?;

    // registered before the staging directory exists
    let mut interrupts = Interrupts::register()?;

    let mut staging = tokio::task::spawn_blocking(move || {
        StagingDir::builder()
            .placement(placement)
            .acquire(&sources)
    });

    let staged = tokio::select! {
        staged = &mut staging => Ok(staged),
        signal = interrupts.recv() => Err(signal),
    };

    let status = {
        let staging_dir = match staged {
            Ok(staged) => staged
                .context("staging task failed")?
                .context("failed to assemble deployment directory")?,
            Err(signal) => {
                info!("{signal:?} received while staging; removing deployment directory");
                drop(staging.await);
                return Ok(ExitCode::from(interrupts::exit_code(signal)));
            }
        };

        server.run(staging_dir.path(), &mut interrupts).await?
    };

    Ok(ExitCode::from(app_server::exit_code(status)))
}
