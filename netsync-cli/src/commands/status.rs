//! `netsync status` command handler

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use netsync_core::config::ServerConfig;

use crate::cli::StatusArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Health probe timeout.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let base_url = match args.url {
        Some(url) => url,
        None => daemon_url(&super::load_config(config_path).await?.server),
    };

    let report = fetch_status(&base_url).await?;
    writer.render(&report)?;

    Ok(())
}

/// Base URL of the daemon described by `[server]`.
///
/// Wildcard listen addresses are probed on loopback.
fn daemon_url(server: &ServerConfig) -> String {
    let host = match server.listen_addr.as_str() {
        "0.0.0.0" | "" => "127.0.0.1",
        "::" => "[::1]",
        other => other,
    };
    format!("http://{}:{}", host, server.port)
}

/// Query `GET {base_url}/health`.
///
/// # Errors
///
/// Returns `CliError::DaemonUnavailable` if the daemon cannot be reached or
/// answers with a non-success status or an unexpected body.
pub async fn fetch_status(base_url: &str) -> Result<StatusReport, CliError> {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    debug!(url = %url, "querying daemon health");

    let client = reqwest::Client::builder()
        .timeout(STATUS_TIMEOUT)
        .build()
        .map_err(|e| CliError::Command(format!("failed to build HTTP client: {}", e)))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| CliError::DaemonUnavailable(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CliError::DaemonUnavailable(format!(
            "{} returned HTTP {}",
            url,
            status.as_u16()
        )));
    }

    let health: DaemonHealth = response
        .json()
        .await
        .map_err(|e| CliError::DaemonUnavailable(format!("unexpected health body: {}", e)))?;

    Ok(StatusReport {
        url: base_url.to_owned(),
        status: health.status,
        mode: health.mode,
        dataset_entries: health.dataset_entries,
        uptime_secs: health.uptime_secs,
    })
}

/// Body of the daemon's `/health` response.
#[derive(Debug, Deserialize)]
struct DaemonHealth {
    status: String,
    mode: String,
    dataset_entries: usize,
    #[serde(default)]
    uptime_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub url: String,
    pub status: String,
    pub mode: String,
    pub dataset_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let status_colored = match self.status.as_str() {
            "ok" => self.status.green().bold(),
            "degraded" => self.status.yellow().bold(),
            _ => self.status.normal(),
        };

        writeln!(
            w,
            "Daemon: {} (uptime: {})",
            status_colored,
            self.uptime_secs
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "unknown".to_owned())
        )?;
        writeln!(w, "  URL:             {}", self.url)?;
        writeln!(w, "  Inventory mode:  {}", self.mode)?;
        writeln!(w, "  Dataset entries: {}", self.dataset_entries)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_url_wildcard_uses_loopback() {
        let server = ServerConfig {
            listen_addr: "0.0.0.0".to_owned(),
            port: 8080,
        };
        assert_eq!(daemon_url(&server), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_daemon_url_explicit_host() {
        let server = ServerConfig {
            listen_addr: "10.1.2.3".to_owned(),
            port: 9000,
        };
        assert_eq!(daemon_url(&server), "http://10.1.2.3:9000");
    }

    #[tokio::test]
    async fn test_fetch_status_parses_health_body() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "mode": "live",
                "dataset_entries": 4,
                "uptime_secs": 42
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = fetch_status(&format!("{}/", server.uri()))
            .await
            .expect("health probe should succeed");
        assert_eq!(report.status, "ok");
        assert_eq!(report.mode, "live");
        assert_eq!(report.dataset_entries, 4);
        assert_eq!(report.uptime_secs, Some(42));
    }

    #[tokio::test]
    async fn test_fetch_status_server_error_is_unavailable() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetch_status(&server.uri())
            .await
            .expect_err("503 should fail");
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_status_render_unknown_uptime() {
        colored::control::set_override(false);
        let report = StatusReport {
            url: "http://127.0.0.1:8080".to_owned(),
            status: "degraded".to_owned(),
            mode: "degraded".to_owned(),
            dataset_entries: 0,
            uptime_secs: None,
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("utf-8");

        assert!(output.contains("Daemon: degraded (uptime: unknown)"));
        assert!(output.contains("Dataset entries: 0"));
    }
}
