//! Enrolled identity management.

use std::process::ExitCode;

use clap::Args;
use voxgate_cli::{print_info, print_success};

use super::{output, Runtime};
use crate::Cli;

/// Remove an enrolled identity from both engines and the store.
#[derive(Args)]
pub struct RemoveCommand {
    /// Identity name
    identity: String,
}

impl RemoveCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let rt = Runtime::open(cli)?;
        if !rt.auth.remove(&self.identity)? {
            anyhow::bail!("identity '{}' not found", self.identity);
        }
        print_success(&format!("Identity \"{}\" removed", self.identity));
        Ok(ExitCode::SUCCESS)
    }
}

/// List enrolled identities.
#[derive(Args)]
pub struct ListCommand {}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let rt = Runtime::open(cli)?;
        let identities = rt.auth.identities();
        if identities.is_empty() {
            print_info("No identities enrolled");
        }
        output(cli).write(&identities)?;
        Ok(ExitCode::SUCCESS)
    }
}
