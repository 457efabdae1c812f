use std::{
    ffi::OsString,
    os::unix::process::ExitStatusExt as _,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use anyhow::Context as _;
use devappserver::Error;
use nix::{sys::signal::Signal, unistd::Pid};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{
    common::{SERVER_VAR_NAME, StateForTesting},
    interrupts::Interrupts,
};

const CANDIDATES: [&str; 2] = ["dev_appserver.py", "dev_appserver"];

#[derive(Debug, Clone)]
pub struct AppServer {
    path: PathBuf,
    args: Vec<OsString>,
}

impl AppServer {
    /// Resolves the server executable, failing fast when it is not available.
    pub fn locate(explicit: Option<&Path>, args: Vec<OsString>) -> Result<Self, Error> {
        let path = match explicit {
            // taken as given, never searched for on PATH
            Some(explicit) if explicit.is_file() => {
                std::path::absolute(explicit).map_err(|err| Error::DependencyMissing {
                    name: explicit.display().to_string(),
                    hint: format!("cannot resolve path ({err})"),
                })?
            }
            Some(explicit) => {
                return Err(Error::DependencyMissing {
                    name: explicit.display().to_string(),
                    hint: "no such file".to_string(),
                });
            }
            None => CANDIDATES
                .iter()
                .find_map(|candidate| which::which(candidate).ok())
                .ok_or_else(|| Error::DependencyMissing {
                    name: "app server".to_string(),
                    hint: format!(
                        "none of {} is on PATH; install the App Engine SDK or set {SERVER_VAR_NAME}",
                        CANDIDATES.join(", ")
                    ),
                })?,
        };

        debug!("app server located: {path:?}");
        Ok(Self { path, args })
    }

    /// Runs the server on `deployment_dir`, forwarding interrupts until it exits.
    pub async fn run(
        &self,
        deployment_dir: &Path,
        interrupts: &mut Interrupts,
    ) -> anyhow::Result<ExitStatus> {
        let mut command = Command::new(&self.path);
        command.arg(deployment_dir).args(&self.args).kill_on_drop(true);

        info!("Running dev server on {deployment_dir:?}.");

        let mut process = command
            .spawn()
            .with_context(|| format!("failed to spawn app server {command:?}"))?;

        let pid = process
            .id()
            .context("app server exited before its pid was obtained")?;

        if std::env::var_os(StateForTesting::ENV_VAR).is_some() {
            StateForTesting::print(deployment_dir.to_path_buf(), pid)?;
        }

        let status = loop {
            let received = tokio::select! {
                status = process.wait() => Ok(status),
                signal = interrupts.recv() => Err(signal),
            };

            match received {
                Ok(status) => break status.context("failed to obtain app server exit status")?,
                Err(signal) => {
                    info!("{signal:?} received; forwarding to app server");
                    forward(pid, signal)?;
                }
            }
        };

        if status.success() {
            info!("app server exited");
        } else {
            warn!("app server {command:?} exited with {status}");
        }

        Ok(status)
    }
}

fn forward(pid: u32, signal: Signal) -> anyhow::Result<()> {
    let pid = Pid::from_raw(pid.try_into()?);

    match nix::sys::signal::kill(pid, signal) {
        // already gone; the next wait reports how
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        result => result.with_context(|| format!("failed to send {signal:?} to app server")),
    }
}

/// The launcher's exit code for a server that ended with `status`.
pub fn exit_code(status: ExitStatus) -> u8 {
    let code = status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1);

    u8::try_from(code).unwrap_or(1)
}
