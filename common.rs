use std::path::PathBuf;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const LOG_FILTER_VAR_NAME: &str = "DEVAPPSERVER_LOG";
pub const SERVER_VAR_NAME: &str = "DEVAPPSERVER_SERVER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateForTesting {
    pub staging_path: PathBuf,
    pub server_pid: u32,
}

impl StateForTesting {
    pub const ENV_VAR: &str = "_PRINT_STATE_FOR_TESTING";

    #[cfg_attr(test, allow(dead_code))]
    pub(crate) fn print(staging_path: PathBuf, server_pid: u32) -> anyhow::Result<()> {
        let state_for_testing = Self {
            staging_path,
            server_pid,
        };

        debug!("{state_for_testing:?}");

        let state_for_testing = serde_json::to_string(&state_for_testing)
            .context("failed to serialize state for testing")?;

        println!("{state_for_testing}");
        Ok(())
    }
}
