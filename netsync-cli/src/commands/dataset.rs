//! `netsync dataset` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use netsync_reconciler::DiscoverySource;

use crate::cli::{DatasetAction, DatasetArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `dataset` command.
pub async fn execute(
    args: DatasetArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        DatasetAction::Check { path } => execute_check(path, config_path, writer).await,
    }
}

/// Parse the dataset and report its size; no inventory calls are made.
///
/// # Errors
///
/// Returns `CliError::Dataset` after rendering the report if the file is invalid.
async fn execute_check(
    path: Option<PathBuf>,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let path = match path {
        Some(path) => path,
        None => PathBuf::from(super::load_config(config_path).await?.discovery.dataset_path),
    };
    info!(path = %path.display(), "checking discovery dataset");

    match DiscoverySource::load(&path).await {
        Ok(source) => {
            writer.render(&DatasetCheckReport::from_source(&path, &source))?;
            Ok(())
        }
        Err(e) => {
            writer.render(&DatasetCheckReport::invalid(&path, e.to_string()))?;
            Err(e.into())
        }
    }
}

/// Dataset check report.
#[derive(Debug, Serialize)]
pub struct DatasetCheckReport {
    pub source: String,
    pub valid: bool,
    pub entries: usize,
    pub interfaces: usize,
    pub addresses: usize,
    pub errors: Vec<String>,
}

impl DatasetCheckReport {
    fn from_source(path: &Path, source: &DiscoverySource) -> Self {
        let (interfaces, addresses) = source
            .records()
            .fold((0, 0), |(interfaces, addresses), (_, record)| {
                (
                    interfaces + record.interfaces.len(),
                    addresses + record.address_count(),
                )
            });

        Self {
            source: path.display().to_string(),
            valid: true,
            entries: source.len(),
            interfaces,
            addresses,
            errors: Vec::new(),
        }
    }

    fn invalid(path: &Path, error: String) -> Self {
        Self {
            source: path.display().to_string(),
            valid: false,
            entries: 0,
            interfaces: 0,
            addresses: 0,
            errors: vec![error],
        }
    }
}

impl Render for DatasetCheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Dataset Check: {}", self.source.bold())?;
        if self.valid {
            writeln!(w, "  Result:     {}", "VALID".green().bold())?;
            writeln!(w, "  Entries:    {}", self.entries)?;
            writeln!(w, "  Interfaces: {}", self.interfaces)?;
            writeln!(w, "  Addresses:  {}", self.addresses)?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}
