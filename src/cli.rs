use crate::engine::{AnalysisBackend, HttpBackend};
use crate::model::{DashboardConfig, RunState};
use crate::orchestrator::{self, DashboardController};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "wind-aep-dashboard",
    version,
    about = "Wind plant AEP analysis dashboard with backend health polling"
)]
pub struct Cli {
    /// Base URL of the analysis backend [default: http://localhost:8000]
    #[arg(long, env = "WIND_AEP_API_URL")]
    pub base_url: Option<String>,

    /// Plant to analyze [default: La Haute Borne]
    #[arg(long)]
    pub plant_name: Option<String>,

    /// Interval between backend health probes [default: 30s]
    #[arg(long)]
    pub poll_interval: Option<humantime::Duration>,

    /// Timeout for each backend request [default: 30s]
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// JSON config file; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Run one analysis, print the JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Run one analysis, print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Start an analysis as soon as the dashboard opens
    #[arg(long)]
    pub run_on_launch: bool,

    /// Export the analysis result as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn load_config_file(path: &Path) -> Result<DashboardConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
}

/// Build a `DashboardConfig`: defaults, then the config file, then flags.
pub fn build_config(args: &Cli) -> Result<DashboardConfig> {
    let mut cfg = match args.config.as_deref() {
        Some(path) => load_config_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(url) = args.base_url.as_ref() {
        cfg.base_url = url.clone();
    }
    if let Some(plant) = args.plant_name.as_ref() {
        cfg.plant_name = plant.clone();
    }
    if let Some(interval) = args.poll_interval {
        cfg.poll_interval = Duration::from(interval);
    }
    if let Some(timeout) = args.request_timeout {
        cfg.request_timeout = Duration::from(timeout);
    }

    crate::engine::parse_base_url(&cfg.base_url)?;
    if cfg.poll_interval.is_zero() {
        anyhow::bail!("poll interval must be greater than zero");
    }
    if cfg.request_timeout.is_zero() {
        anyhow::bail!("request timeout must be greater than zero");
    }
    if cfg.plant_name.trim().is_empty() {
        anyhow::bail!("plant name must not be empty");
    }
    Ok(cfg)
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!("--json and --text are mutually exclusive"));
    }
    let cfg = build_config(&args)?;
    tracing::debug!(?cfg, "configuration loaded");

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, cfg, false).await;
        }
    }

    run_headless(args.clone(), cfg, args.json).await
}

/// One-shot mode: probe health once, run one analysis, print and exit.
async fn run_headless(args: Cli, cfg: DashboardConfig, as_json: bool) -> Result<()> {
    let backend = HttpBackend::new(&cfg)?;
    tracing::debug!(url = %backend.base_url(), "one-shot run");
    let mut out = std::io::stdout().lock();
    run_once(&args, &cfg, backend, as_json, &mut out).await
}

async fn run_once<B: AnalysisBackend>(
    args: &Cli,
    cfg: &DashboardConfig,
    backend: B,
    as_json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let controller = DashboardController::new(backend, cfg);

    let health = controller.probe_once().await;
    eprintln!("Backend {}: {}", cfg.base_url, health.label());

    eprintln!("Running analysis for {}…", cfg.plant_name);
    let snapshot = controller.run_to_completion().await;
    let result = match snapshot.state {
        RunState::Succeeded(result) => result,
        RunState::Failed(e) => return Err(anyhow::Error::new(e).context("analysis failed")),
        RunState::Idle | RunState::Running => {
            return Err(anyhow::anyhow!("analysis did not complete"))
        }
    };

    let processed = orchestrator::process_run_completion(args, &result);
    for msg in &processed.export_messages {
        eprintln!("{msg}");
    }

    if as_json {
        let body = serde_json::to_string_pretty(&*result)?;
        writeln!(out, "{body}")?;
    } else {
        let summary = crate::text_summary::build_text_summary(&result, health);
        for line in summary.lines {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["wind-aep-dashboard"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = build_config(&parse(&[
            "--base-url",
            "http://engine:10000",
            "--poll-interval",
            "5s",
            "--plant-name",
            "Kelmarsh",
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "http://engine:10000");
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.plant_name, "Kelmarsh");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(
            &path,
            r#"{"base_url":"http://file:9000","request_timeout":"10s","plant_name":"File Plant"}"#,
        )
        .unwrap();
        let cfg = build_config(&parse(&[
            "--config",
            path.to_str().unwrap(),
            "--plant-name",
            "Flag Plant",
        ]))
        .unwrap();
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.plant_name, "Flag Plant");
    }

    #[test]
    fn rejects_zero_interval_and_bad_url() {
        assert!(build_config(&parse(&["--poll-interval", "0s"])).is_err());
        assert!(build_config(&parse(&["--base-url", "localhost"])).is_err());
    }

    #[tokio::test]
    async fn one_shot_failure_is_an_error() {
        use crate::engine::testing::{healthy, ScriptedBackend};
        use crate::engine::ApiError;

        let backend = ScriptedBackend::default()
            .with_health([Ok(healthy(true))])
            .with_analyze([Err(ApiError::Server {
                status: 500,
                reason: "Internal Server Error".into(),
            })]);
        let mut out = Vec::new();
        let err = run_once(&parse(&[]), &DashboardConfig::default(), backend, true, &mut out)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Server returned 500: Internal Server Error"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn one_shot_success_prints_json() {
        use crate::engine::testing::{healthy, ScriptedBackend};
        use crate::model::tests::sample_response;

        let backend = ScriptedBackend::default()
            .with_health([Ok(healthy(true))])
            .with_analyze([Ok(sample_response())]);
        let mut out = Vec::new();
        run_once(&parse(&[]), &DashboardConfig::default(), backend, true, &mut out)
            .await
            .unwrap();
        let printed: crate::model::AnalysisResponse = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed, sample_response());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = build_config(&parse(&["--config", "/nonexistent/dashboard.json"])).unwrap_err();
        assert!(format!("{err:#}").contains("read config"));
    }
}
