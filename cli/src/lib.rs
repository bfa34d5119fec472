//! CLI utilities for voxgate.
//!
//! Configuration loading and result printing shared by the `voxgate`
//! binary.

pub mod config;
pub mod output;

pub use config::{load_config, save_config, CliConfig};
pub use output::{print_info, print_success, print_warning, Output, OutputFormat};
