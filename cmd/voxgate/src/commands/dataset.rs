//! Dataset-level feature export and ranking.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use voxgate_audio::{collect_audio_files, decode_file};
use voxgate_cli::{print_success, print_warning};
use voxgate_features::summary::{self, SummaryRow};
use voxgate_features::{run_pool, Extractor};

use super::{get_config, output};
use crate::Cli;

/// Export per-file feature statistics to CSV.
///
/// Every audio file under the directory is summarized on a worker pool. The
/// speaker column is the file's parent directory name. Files that fail to
/// decode are logged and skipped; the command fails when nothing could be
/// summarized.
#[derive(Args)]
pub struct ExtractCommand {
    /// Dataset directory, searched recursively
    dir: PathBuf,

    /// Output CSV path
    #[arg(short = 'o', long, default_value = "features.csv")]
    output: PathBuf,

    /// Worker threads (default: one per CPU)
    #[arg(short = 'w', long)]
    workers: Option<usize>,
}

impl ExtractCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let cfg = get_config(cli)?;
        let workers = self.workers.unwrap_or(cfg.auth.workers);
        let extractor = Extractor::new(cfg.auth.features.clone())?;

        let (columns, rows) = summarize_dir(&extractor, &self.dir, workers)?;
        if rows.is_empty() {
            print_warning("No features extracted; nothing written");
            return Ok(ExitCode::FAILURE);
        }

        let file = File::create(&self.output)?;
        summary::write_csv(BufWriter::new(file), &columns, &rows)?;
        print_success(&format!(
            "Wrote {} row(s) x {} feature(s) to {}",
            rows.len(),
            columns.len(),
            self.output.display()
        ));
        Ok(ExitCode::SUCCESS)
    }
}

/// Rank feature statistics by speaker discriminability.
///
/// Scores each statistic by the variance of speaker means over the mean
/// within-speaker variance. Speakers are taken from parent directory names.
#[derive(Args)]
pub struct RankCommand {
    /// Dataset directory, searched recursively
    dir: PathBuf,

    /// Show only the best N statistics
    #[arg(long, default_value_t = 20)]
    top: usize,

    /// Worker threads (default: one per CPU)
    #[arg(short = 'w', long)]
    workers: Option<usize>,
}

impl RankCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let cfg = get_config(cli)?;
        let workers = self.workers.unwrap_or(cfg.auth.workers);
        let extractor = Extractor::new(cfg.auth.features.clone())?;

        let (columns, rows) = summarize_dir(&extractor, &self.dir, workers)?;
        if rows.is_empty() {
            print_warning("No features extracted; nothing to rank");
            return Ok(ExitCode::FAILURE);
        }

        let mut ranking = summary::rank(&columns, &rows);
        ranking.truncate(self.top);
        output(cli).write(&ranking)?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Summarizes every audio file under `dir`, skipping failures.
fn summarize_dir(
    extractor: &Extractor,
    dir: &Path,
    workers: usize,
) -> anyhow::Result<(Vec<String>, Vec<SummaryRow>)> {
    let files = collect_audio_files(dir)?;
    let columns = summary::column_names(extractor.config().num_coefficients);
    if files.is_empty() {
        return Ok((columns, Vec::new()));
    }

    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("  {msg} [{bar:30}] {pos}/{len} ETA {eta}") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message("extracting");

    let rows = run_pool(
        &files,
        workers,
        |path: &PathBuf| summarize_file(extractor, path),
        || pb.inc(1),
    );
    pb.finish_and_clear();

    let rows: Vec<SummaryRow> = rows
        .into_iter()
        .zip(&files)
        .filter_map(|(r, path)| match r {
            Ok(row) => row,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                None
            }
        })
        .collect();
    if rows.len() < files.len() {
        print_warning(&format!(
            "{} of {} file(s) could not be summarized",
            files.len() - rows.len(),
            files.len()
        ));
    }
    Ok((columns, rows))
}

fn summarize_file(extractor: &Extractor, path: &Path) -> Option<SummaryRow> {
    let values = match decode_file(path)
        .map_err(Into::into)
        .and_then(|wave| summary::summarize(extractor, wave))
    {
        Ok(values) => values,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping file");
            return None;
        }
    };
    Some(SummaryRow {
        speaker: speaker_label(path),
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        values,
    })
}

fn speaker_label(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_label_is_parent_dir() {
        assert_eq!(speaker_label(Path::new("/data/alice/01.wav")), "alice");
        assert_eq!(speaker_label(Path::new("01.wav")), "unknown");
    }
}
