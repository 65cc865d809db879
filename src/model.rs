use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PLANT_NAME: &str = "La Haute Borne";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the controller needs to talk to the analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub base_url: String,
    pub plant_name: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            plant_name: DEFAULT_PLANT_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("wind-aep-dashboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Connectivity as seen by the periodic health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl HealthStatus {
    /// Interpret one probe outcome. Anything but a healthy body with the
    /// analysis library installed counts as disconnected.
    pub fn from_probe(outcome: &Result<HealthResponse, ApiError>) -> Self {
        match outcome {
            Ok(health) if health.library_installed => HealthStatus::Connected,
            _ => HealthStatus::Disconnected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthStatus::Connecting => "Connecting…",
            HealthStatus::Connected => "Engine Connected",
            HealthStatus::Disconnected => "Disconnected",
        }
    }

    pub fn is_connected(self) -> bool {
        self == HealthStatus::Connected
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
    pub library_installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engie_loader: Option<bool>,
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub plant_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    #[serde(rename = "REAL_DATA")]
    RealData,
    #[serde(rename = "SIMULATION_FALLBACK")]
    SimulationFallback,
}

impl AnalysisMode {
    pub fn description(self) -> &'static str {
        match self {
            AnalysisMode::RealData => "OpenOA real data mode",
            AnalysisMode::SimulationFallback => "Simulation fallback mode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurvePoint {
    pub wind_speed: f64,
    pub actual_power: f64,
    pub ideal_power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProduction {
    pub month: String,
    pub expected_gwh: f64,
    pub actual_gwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AepDistributionBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub bin_label: String,
    pub count: u64,
}

impl AepDistributionBin {
    pub fn midpoint(&self) -> f64 {
        (self.bin_start + self.bin_end) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineComparison {
    pub turbine_id: String,
    #[serde(default)]
    pub capacity_factor: f64,
    #[serde(default)]
    pub availability: f64,
    #[serde(default)]
    pub annual_energy_mwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSummary {
    pub total_turbines: u32,
    pub rated_power_mw: f64,
    pub avg_capacity_factor: f64,
    pub avg_availability: f64,
    pub plant_name: String,
    pub num_simulations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub power_curve: Vec<PowerCurvePoint>,
    #[serde(default)]
    pub monthly_production: Vec<MonthlyProduction>,
    #[serde(default)]
    pub aep_distribution: Vec<AepDistributionBin>,
    #[serde(default)]
    pub turbine_comparison: Vec<TurbineComparison>,
    pub summary: PlantSummary,
}

/// Outcome of one completed analysis run, exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub mode: AnalysisMode,
    pub aep_gwh: f64,
    pub uncertainty: String,
    pub plot_image: String,
    pub chart_data: ChartData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_note: Option<String>,
}

/// Lifecycle of the analysis run. Exactly one variant holds at any instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Succeeded(Arc<AnalysisResponse>),
    Failed(ApiError),
}

/// What consumers observe: the current run state plus the last good result.
///
/// `last_result` is only written by a successful run and survives failures,
/// so a failed re-run keeps showing the previous charts behind the error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSnapshot {
    pub state: RunState,
    pub last_result: Option<Arc<AnalysisResponse>>,
}

impl RunSnapshot {
    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.state {
            RunState::Failed(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

/// Events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    Health(HealthStatus),
    Run(RunSnapshot),
    Info(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}
