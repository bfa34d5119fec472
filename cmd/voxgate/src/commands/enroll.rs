//! Enrollment command.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, ValueEnum};
use voxgate_audio::is_audio_file;
use voxgate_cli::{print_success, print_warning};
use voxgate_voiceauth::Engines;

use super::{output, Runtime};
use crate::Cli;

/// Engine selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    Gmm,
    Dtw,
    Both,
}

impl From<EngineArg> for Engines {
    fn from(e: EngineArg) -> Self {
        match e {
            EngineArg::Gmm => Engines::Gmm,
            EngineArg::Dtw => Engines::Dtw,
            EngineArg::Both => Engines::Both,
        }
    }
}

/// Enroll an identity from audio files.
///
/// Re-enrolling an identity replaces its model and templates. Use
/// `--background` to build the background model from non-target speakers;
/// it is only ever enrolled into the GMM engine.
#[derive(Args)]
pub struct EnrollCommand {
    /// Identity name (omit with --background)
    #[arg(required_unless_present = "background")]
    identity: Option<String>,

    /// Audio files to enroll
    #[arg(long = "file", short = 'i')]
    files: Vec<PathBuf>,

    /// Also enroll every audio file directly inside this directory
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Enroll into the background model instead of a named identity
    #[arg(long, conflicts_with = "identity")]
    background: bool,

    /// Engines to enroll into
    #[arg(long, value_enum, default_value_t = EngineArg::Both)]
    engine: EngineArg,
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let rt = Runtime::open(cli)?;
        let (identity, engines) = if self.background {
            (rt.config.auth.background.clone(), Engines::Gmm)
        } else {
            let identity = self
                .identity
                .clone()
                .ok_or_else(|| anyhow::anyhow!("identity is required"))?;
            (identity, self.engine.into())
        };

        let paths = self.paths()?;
        if paths.is_empty() {
            anyhow::bail!("no audio files given, use --file or --dir");
        }

        let outcomes = rt.auth.enroll_files(&identity, &paths, engines)?;
        output(cli).write(&outcomes)?;

        if outcomes.iter().any(|o| o.is_enrolled()) {
            print_success(&format!("Enrolled \"{}\" from {} file(s)", identity, paths.len()));
            Ok(ExitCode::SUCCESS)
        } else {
            print_warning(&format!("No usable audio for \"{}\"; nothing stored", identity));
            Ok(ExitCode::FAILURE)
        }
    }

    fn paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = self.files.clone();
        if let Some(dir) = &self.dir {
            let mut found = Vec::new();
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_file() && is_audio_file(&path) {
                    found.push(path);
                }
            }
            found.sort();
            paths.extend(found);
        }
        Ok(paths)
    }
}
