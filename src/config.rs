use std::path::PathBuf;

use devappserver::Placement;

use crate::app_server::AppServer;

#[derive(Debug)]
pub struct Config {
    pub server: AppServer,
    pub sources: Vec<PathBuf>,
    pub placement: Placement,
}

impl Config {
    pub fn obtain() -> anyhow::Result<Self> {
        let args = crate::cli::parse();
        let server = AppServer::locate(args.server.as_deref(), args.server_args)?;

        let placement = if args.copy {
            Placement::Copy
        } else {
            Placement::Link
        };

        Ok(Self {
            server,
            sources: args.paths,
            placement,
        })
    }
}
