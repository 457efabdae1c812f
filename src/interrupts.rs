use anyhow::Context as _;
use nix::sys::signal::Signal;
use tokio::signal::unix::{SignalKind, signal};

/// Termination signals handled by the launcher instead of the default
/// disposition, which would exit without removing the staging directory.
pub struct Interrupts {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sigquit: tokio::signal::unix::Signal,
}

impl Interrupts {
    pub fn register() -> anyhow::Result<Self> {
        Ok(Self {
            sigint: signal(SignalKind::interrupt()).context("failed to handle SIGINT")?,
            sigterm: signal(SignalKind::terminate()).context("failed to handle SIGTERM")?,
            sigquit: signal(SignalKind::quit()).context("failed to handle SIGQUIT")?,
        })
    }

    pub async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.sigint.recv() => Signal::SIGINT,
            _ = self.sigterm.recv() => Signal::SIGTERM,
            _ = self.sigquit.recv() => Signal::SIGQUIT,
        }
    }
}

/// Shell convention for a process ended by `signal`.
pub fn exit_code(signal: Signal) -> u8 {
    u8::try_from(128 + signal as i32).unwrap_or(1)
}
