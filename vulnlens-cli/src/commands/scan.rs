//! `vulnlens scan` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vulnlens_core::config::VulnlensConfig;
use vulnlens_core::event::{Notification, NotificationEvent};
use vulnlens_core::types::{Diagnostic, DiagnosticSeverity, Ecosystem};
use vulnlens_engine::{AnalyzerBuilder, CycleReport, EngineConfig, HttpAdvisoryClient};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config: &VulnlensConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let engine_config = engine_config(config, &args);
    let manifest = tokio::fs::canonicalize(&args.manifest).await?;
    let text = tokio::fs::read_to_string(&manifest).await?;
    let uri = file_uri(&manifest);

    info!(uri = %uri, server = %engine_config.server_url, "starting manifest scan");

    let client = HttpAdvisoryClient::new(&engine_config)?;
    let (analyzer, notifications) = AnalyzerBuilder::new()
        .config(engine_config)
        .client(client)
        .build()?;
    let drain = notifications.map(|rx| tokio::spawn(log_notifications(rx)));

    let result = analyzer.analyze(&uri, &text).await;
    drop(analyzer);
    if let Some(handle) = drain {
        let _ = handle.await;
    }
    let cycle = result?;

    if cycle.failed_batches > 0 {
        warn!(
            failed_batches = cycle.failed_batches,
            "some requests failed, results are incomplete"
        );
    }

    let report = ScanReport::from_cycle(args.manifest.display().to_string(), cycle);
    writer.render(&report)?;

    if args.fail_on_findings && !report.findings.is_empty() {
        return Err(CliError::Findings(report.findings.len()));
    }

    Ok(())
}

/// Build the engine configuration from the loaded file and CLI overrides.
fn engine_config(config: &VulnlensConfig, args: &ScanArgs) -> EngineConfig {
    let mut engine_config = EngineConfig::from_core(config);
    if let Some(url) = &args.server_url {
        engine_config.server_url = url.clone();
    }
    if let Some(size) = args.batch_size {
        engine_config.batch_size = size;
    }
    engine_config
}

/// Absolute path to a `file://` URI.
fn file_uri(path: &Path) -> String {
    let display = path.display().to_string().replace('\\', "/");
    if display.starts_with('/') {
        format!("file://{display}")
    } else {
        format!("file:///{display}")
    }
}

/// Editor notifications have no consumer in one-shot mode; they are logged instead.
async fn log_notifications(mut rx: mpsc::Receiver<NotificationEvent>) {
    while let Some(event) = rx.recv().await {
        match event.notification {
            Notification::Progress { data, done, .. } => {
                debug!(done, message = %data, "progress");
            }
            Notification::Error { data, .. } => {
                warn!(message = %data, "analysis error");
            }
            Notification::PublishDiagnostics { diagnostics, .. } => {
                debug!(count = diagnostics.len(), "diagnostics published");
            }
        }
    }
}

/// One-shot scan result.
#[derive(Serialize)]
pub struct ScanReport {
    pub manifest: String,
    pub ecosystem: Ecosystem,
    pub dependencies: usize,
    pub vulnerabilities: u32,
    pub advisories: u32,
    pub exploitable: u32,
    pub failed_batches: usize,
    pub summary: Option<String>,
    pub findings: Vec<FindingEntry>,
}

/// A flagged dependency declaration.
#[derive(Serialize)]
pub struct FindingEntry {
    /// 1-based line number
    pub line: u32,
    /// 1-based column
    pub column: u32,
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
}

impl ScanReport {
    pub fn from_cycle(manifest: String, cycle: CycleReport) -> Self {
        let mut findings: Vec<FindingEntry> =
            cycle.diagnostics.iter().map(FindingEntry::from).collect();
        findings.sort_by_key(|f| (f.line, f.column));

        Self {
            manifest,
            ecosystem: cycle.ecosystem,
            dependencies: cycle.dependency_count,
            vulnerabilities: cycle.counts.vulnerability_count,
            advisories: cycle.counts.advisory_count,
            exploitable: cycle.counts.exploit_count,
            failed_batches: cycle.failed_batches,
            summary: cycle.summary,
            findings,
        }
    }
}

impl From<&Diagnostic> for FindingEntry {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            line: diagnostic.range.start.line + 1,
            column: diagnostic.range.start.character + 1,
            severity: diagnostic.severity,
            code: diagnostic.code.clone(),
            message: diagnostic.message.clone(),
        }
    }
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan: {}", self.manifest.bold())?;
        writeln!(w, "Ecosystem: {}", self.ecosystem)?;
        writeln!(w, "Dependencies analyzed: {}", self.dependencies)?;
        if self.failed_batches > 0 {
            writeln!(
                w,
                "{}",
                format!("Failed requests: {} (results incomplete)", self.failed_batches).yellow()
            )?;
        }
        writeln!(w)?;

        if self.findings.is_empty() {
            writeln!(w, "{}", "No vulnerable dependencies found.".green())?;
        } else {
            for finding in &self.findings {
                let severity = match finding.severity {
                    DiagnosticSeverity::Error => "error".red().bold(),
                    DiagnosticSeverity::Warning => "warning".yellow().bold(),
                    DiagnosticSeverity::Information | DiagnosticSeverity::Hint => {
                        "info".cyan().bold()
                    }
                };
                let code = finding
                    .code
                    .as_deref()
                    .map(|c| format!(" [{c}]"))
                    .unwrap_or_default();

                let mut lines = finding.message.lines();
                let headline = lines.next().unwrap_or_default();
                writeln!(
                    w,
                    "{}:{}: {}{} {}",
                    finding.line, finding.column, severity, code, headline
                )?;
                for detail in lines {
                    writeln!(w, "    {}", detail)?;
                }
            }
        }

        if let Some(summary) = &self.summary {
            writeln!(w)?;
            writeln!(w, "{}", summary)?;
        }

        Ok(())
    }
}
