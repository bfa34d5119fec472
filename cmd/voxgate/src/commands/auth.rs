//! Identification, verification and authentication commands.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use serde::Serialize;
use voxgate_voiceauth::{Engines, Polarity};

use super::enroll::EngineArg;
use super::{output, Runtime};
use crate::Cli;

/// Name the speaker of a recording.
///
/// Prints the best-scoring identity and its margin over the background
/// model. Exits non-zero when no identity clears the margin threshold.
#[derive(Args)]
pub struct IdentifyCommand {
    /// Audio file
    file: PathBuf,
}

impl IdentifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let rt = Runtime::open(cli)?;
        let id = rt.auth.identify_file(&self.file)?;
        output(cli).write(&id)?;
        Ok(if id.accepted {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// Score a recording against a claimed identity with one engine.
#[derive(Args)]
pub struct VerifyCommand {
    /// Claimed identity
    identity: String,

    /// Audio file
    file: PathBuf,

    /// Engine to score with
    #[arg(long, value_enum, default_value_t = EngineArg::Dtw)]
    engine: EngineArg,
}

#[derive(Serialize)]
struct Verification<'a> {
    identity: &'a str,
    engine: &'static str,
    score: f64,
    polarity: Polarity,
    threshold: f64,
    passed: bool,
}

impl VerifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        if self.engine == EngineArg::Both {
            anyhow::bail!("verify scores one engine at a time, use --engine gmm or --engine dtw");
        }
        let rt = Runtime::open(cli)?;
        let engine: Engines = self.engine.into();
        let score = rt.auth.verify_file(&self.identity, &self.file, engine)?;

        let decision = &rt.config.auth.decision;
        let (name, threshold) = match engine {
            Engines::Gmm => ("gmm", decision.margin_threshold),
            Engines::Dtw | Engines::Both => ("dtw", decision.distance_threshold),
        };
        let passed = score.passes(threshold);
        output(cli).write(&Verification {
            identity: &self.identity,
            engine: name,
            score: score.value,
            polarity: score.polarity,
            threshold,
            passed,
        })?;
        Ok(if passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

/// Run full two-factor authentication on a recording.
///
/// Exits with status 0 on accept and 1 on reject; the printed result
/// carries the reason and any failure.
#[derive(Args)]
pub struct AuthenticateCommand {
    /// Audio file
    file: PathBuf,
}

impl AuthenticateCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let rt = Runtime::open(cli)?;
        let result = rt.auth.authenticate_file(&self.file);
        output(cli).write(&result)?;
        Ok(if result.is_accepted() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
