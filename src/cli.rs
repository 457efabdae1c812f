use std::{ffi::OsString, path::PathBuf};

use clap::Parser as _;
use tracing::debug;

use crate::common::SERVER_VAR_NAME;

/// Runs a local app server on a temporary deployment directory
#[derive(Debug, Clone, clap::Parser)]
pub struct Args {
    /// Files and directories to stage; later paths win on collisions
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// The app server executable, looked up on PATH when omitted
    #[arg(long, env = SERVER_VAR_NAME)]
    pub server: Option<PathBuf>,

    /// Copy files into the deployment directory instead of hard linking them
    #[arg(long)]
    pub copy: bool,

    /// Passed to the app server after the deployment directory
    #[arg(last = true)]
    pub server_args: Vec<OsString>,
}

pub fn parse() -> Args {
    let args = Args::parse();
    debug!("arguments parsed: {args:?}");
    args
}
