//! Shared state and helpers for commands.

use anyhow::Context as _;
use tracing::debug;
use voxgate_cli::{load_config, CliConfig, Output};
use voxgate_voiceauth::{ModelStore, VoiceAuth};

use crate::Cli;

/// Everything a command needs, built once per invocation.
pub struct Runtime {
    pub config: CliConfig,
    pub auth: VoiceAuth,
}

impl Runtime {
    /// Loads the configuration and opens the model store.
    pub fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = get_config(cli)?;
        let store_path = config.store_path()?;
        debug!(store = %store_path.display(), "opening model store");
        let store = ModelStore::open(&store_path)
            .with_context(|| format!("open model store {}", store_path.display()))?;
        let auth = VoiceAuth::with_store(config.auth.clone(), store)?;
        Ok(Self { config, auth })
    }
}

/// Gets the configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<CliConfig> {
    load_config(cli.config.as_deref())
}

/// Stdout output in the format selected by `--json`.
pub fn output(cli: &Cli) -> Output {
    Output::stdout(cli.json)
}
