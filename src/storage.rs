//! On-disk state: the theme preference and saved analysis results.

use crate::model::{AnalysisResponse, Theme};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "wind-aep-dashboard";

fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no config directory on this platform")?;
    Ok(base.join(APP_DIR))
}

fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("no data directory on this platform")?;
    Ok(base.join(APP_DIR))
}

/// Directory for the TUI's log file.
pub fn log_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("no cache directory on this platform")?;
    Ok(base.join(APP_DIR))
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    theme: Option<Theme>,
}

/// Theme flag persisted under the `theme` key of a small JSON file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(config_dir()?.join("preferences.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Preferences {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Preferences::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, path = %self.path.display(), "ignoring unreadable preferences");
            Preferences::default()
        })
    }

    /// Saved theme, or dark when nothing usable is stored.
    pub fn load_theme(&self) -> Theme {
        self.read().theme.unwrap_or_default()
    }

    pub fn save_theme(&self, theme: Theme) -> Result<()> {
        let mut prefs = self.read();
        prefs.theme = Some(theme);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&prefs)?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

fn result_file_name(now: time::OffsetDateTime, plant: &str) -> String {
    let stamp = now
        .format(time::macros::format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "now".into());
    let plant: String = plant
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("analysis-{}-{}.json", plant.trim_matches('-'), stamp)
}

/// Save a result under the user's data directory and return the file path.
pub fn save_result(result: &AnalysisResponse) -> Result<PathBuf> {
    save_result_in(&data_dir()?.join("results"), result)
}

pub fn save_result_in(dir: &Path, result: &AnalysisResponse) -> Result<PathBuf> {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let path = dir.join(result_file_name(now, &result.chart_data.summary.plant_name));
    export_json(&path, result)?;
    Ok(path)
}

/// Write a result as pretty JSON, creating parent directories as needed.
pub fn export_json(path: &Path, result: &AnalysisResponse) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let body = serde_json::to_string_pretty(result)?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
