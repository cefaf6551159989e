//! Reload by running an external command

use anyhow::{Context, Result};
use async_trait::async_trait;
use reload_watcher::Reload;
use tokio::process::Command;
use tracing::debug;

/// Runs a program with fixed arguments on every reload
///
/// A spawn failure or a non-zero exit status counts as a failed reload.
#[derive(Debug, Clone)]
pub struct CommandReload {
    program: String,
    args: Vec<String>,
}

impl CommandReload {
    /// Build from a `program arg...` list
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("Reload command must not be empty")?;

        if program.trim().is_empty() {
            anyhow::bail!("Reload command must not be empty");
        }

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Command line as typed, for display
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Reload for CommandReload {
    async fn reload(&self) -> Result<()> {
        debug!("Running reload command: {}", self.display());

        let status = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("Failed to run `{}`", self.display()))?;

        if !status.success() {
            anyhow::bail!("`{}` exited with {}", self.display(), status);
        }

        Ok(())
    }
}
