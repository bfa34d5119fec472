//! CLI commands module.

mod auth;
mod config;
mod dataset;
mod enroll;
mod models;
mod util;

pub use auth::{AuthenticateCommand, IdentifyCommand, VerifyCommand};
pub use config::ConfigCommand;
pub use dataset::{ExtractCommand, RankCommand};
pub use enroll::EnrollCommand;
pub use models::{ListCommand, RemoveCommand};

pub(crate) use util::*;
