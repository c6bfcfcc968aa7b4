//! `netsync discover` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use netsync_core::types::ScanReport;
use netsync_reconciler::{
    DiscoverySource, InventoryBackend, ReconcilerConfigBuilder, ReconciliationEngine, ScanRequest,
};

use crate::cli::DiscoverArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `discover` command.
///
/// # Errors
///
/// - `CliError::Input` if the request is rejected before any target is processed
/// - `CliError::Dataset` if the dataset cannot be loaded
/// - `CliError::Reconcile` after rendering, if any target ended in `errors`
pub async fn execute(
    args: DiscoverArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = super::load_config(config_path).await?;

    let mut builder = ReconcilerConfigBuilder::from_core(&config);
    if let Some(ref dataset) = args.dataset {
        builder = builder.dataset_path(dataset.display().to_string());
    }
    if let Some(concurrency) = args.concurrency {
        builder = builder.max_concurrency(concurrency);
    }
    let reconciler = builder.build()?;

    let discovery = DiscoverySource::load(&reconciler.dataset_path).await?;
    let inventory = InventoryBackend::from_config(&reconciler.inventory)?;
    let engine = ReconciliationEngine::new(
        Arc::new(inventory),
        Arc::new(discovery),
        reconciler.max_concurrency,
    );

    let request = scan_request(args);
    info!(
        mode = engine.mode().as_str(),
        cidr = ?request.cidr,
        ips = request.ips.as_ref().map_or(0, Vec::len),
        "starting reconciliation"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, aborting in-flight targets");
            interrupt.cancel();
        }
    });

    let result = engine.run(&request, reconciler.max_targets, cancel).await;
    ctrl_c.abort();
    let report = DiscoverReport(result?);

    writer.render(&report)?;

    let failed = report.0.errors.len();
    if failed > 0 {
        return Err(CliError::Reconcile(format!(
            "{} of {} targets failed",
            failed,
            report.0.scanned.len()
        )));
    }

    Ok(())
}

/// Build the scan request from command-line arguments.
fn scan_request(args: DiscoverArgs) -> ScanRequest {
    ScanRequest {
        cidr: args.cidr,
        ips: if args.ips.is_empty() {
            None
        } else {
            Some(args.ips)
        },
        name_prefix: args.name_prefix,
    }
}

/// Scan report as rendered by the CLI.
///
/// JSON output is the daemon's response body, unchanged.
#[derive(serde::Serialize)]
#[serde(transparent)]
pub struct DiscoverReport(pub ScanReport);

impl Render for DiscoverReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = &self.0;
        let partial = if report.partial {
            format!(" {}", "(partial)".yellow())
        } else {
            String::new()
        };
        writeln!(
            w,
            "Reconciliation: {} targets, mode {}{}",
            report.scanned.len(),
            report.mode.to_string().bold(),
            partial
        )?;
        writeln!(
            w,
            "  created: {}  updated: {}  skipped: {}  errors: {}",
            report.created.len(),
            report.updated.len(),
            report.skipped.len(),
            report.errors.len()
        )?;

        if report.scanned.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        writeln!(w, "{:<40} {:<10} Detail", "Address", "Result")?;
        writeln!(w, "{}", "-".repeat(80))?;

        for entry in &report.created {
            writeln!(w, "{:<40} {:<10} {}", entry.ip, "created".green(), entry.device)?;
            for issue in &entry.issues {
                writeln!(w, "  {}", issue.yellow())?;
            }
        }
        for entry in &report.updated {
            writeln!(w, "{:<40} {:<10} {}", entry.ip, "updated".cyan(), entry.device)?;
        }
        for entry in &report.skipped {
            writeln!(w, "{:<40} {:<10} {}", entry.ip, "skipped".dimmed(), entry.reason)?;
        }
        for entry in &report.errors {
            writeln!(w, "{:<40} {:<10} {}", entry.ip, "error".red().bold(), entry.reason)?;
        }

        Ok(())
    }
}
