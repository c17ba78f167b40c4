//! Voice plugin inspection.

use std::path::PathBuf;

use clap::Args;
use flitevox_driver::DriverHandle;

use super::output;
use crate::Cli;

/// Open a voice plugin and print its metadata.
#[derive(Args)]
pub struct InfoCommand {
    /// Path to the voice plugin
    library: PathBuf,
}

impl InfoCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut driver = DriverHandle::open(&self.library)?;
        let result = serde_json::json!({
            "library": self.library,
            "info": driver.info(),
        });
        driver.release();
        output(cli).write(&result)
    }
}
