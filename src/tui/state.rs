use crate::model::{AnalysisResponse, DashboardEvent, HealthStatus, RunSnapshot, RunState, Theme};
use ratatui::{
    style::Style,
    text::{Line, Span},
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    PowerCurve,
    Production,
    Turbines,
    Help,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::PowerCurve,
        Tab::Production,
        Tab::Turbines,
        Tab::Help,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::PowerCurve => "Power Curve",
            Tab::Production => "Production",
            Tab::Turbines => "Turbines",
            Tab::Help => "Help",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

/// What the main area shows. Exactly one applies at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum MainView {
    /// No run attempted yet.
    Empty,
    Loading,
    /// The last run failed; `stale` is the previous good result, if any.
    Error {
        message: String,
        stale: Option<Arc<AnalysisResponse>>,
    },
    Populated(Arc<AnalysisResponse>),
}

pub struct UiState {
    pub tab: Tab,
    pub theme: Theme,
    pub info: String,
    pub base_url: String,
    pub plant_name: String,
    pub health: HealthStatus,
    pub run: RunSnapshot,
    pub run_started: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: Tab::Overview,
            theme: Theme::Dark,
            info: String::new(),
            base_url: String::new(),
            plant_name: String::new(),
            health: HealthStatus::Connecting,
            run: RunSnapshot::default(),
            run_started: None,
        }
    }
}

impl UiState {
    pub fn main_view(&self) -> MainView {
        match &self.run.state {
            RunState::Running => MainView::Loading,
            RunState::Failed(_) => MainView::Error {
                message: self.run.error_message().unwrap_or_default(),
                stale: self.run.last_result.clone(),
            },
            RunState::Succeeded(r) => MainView::Populated(r.clone()),
            RunState::Idle => match &self.run.last_result {
                Some(r) => MainView::Populated(r.clone()),
                None => MainView::Empty,
            },
        }
    }

    /// Result to feed the charts and cards, including a stale one behind an error.
    pub fn displayed_result(&self) -> Option<Arc<AnalysisResponse>> {
        match self.main_view() {
            MainView::Populated(r) => Some(r),
            MainView::Error { stale, .. } => stale,
            MainView::Empty | MainView::Loading => None,
        }
    }

    pub fn apply_event(&mut self, ev: DashboardEvent) {
        match ev {
            DashboardEvent::Health(status) => self.health = status,
            DashboardEvent::Info(msg) => self.info = msg,
            DashboardEvent::Run(snap) => {
                match &snap.state {
                    RunState::Running => {
                        if !self.run.is_running() {
                            self.run_started = Some(Instant::now());
                        }
                        self.info = format!("Running analysis for {}…", self.plant_name);
                    }
                    RunState::Succeeded(r) => {
                        let elapsed = self
                            .run_started
                            .take()
                            .map(|t| format!(" in {:.1}s", t.elapsed().as_secs_f64()))
                            .unwrap_or_default();
                        self.info = format!("Analysis complete{elapsed}: {} GWh", r.aep_gwh);
                    }
                    RunState::Failed(_) => {
                        self.run_started = None;
                        self.info = "Analysis failed".into();
                    }
                    RunState::Idle => {}
                }
                self.run = snap;
            }
        }
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    label_style: Style,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), label_style),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ApiError;
    use crate::model::tests::sample_response;

    #[test]
    fn views_are_mutually_exclusive() {
        let mut state = UiState::default();
        assert_eq!(state.main_view(), MainView::Empty);

        state.apply_event(DashboardEvent::Run(RunSnapshot {
            state: RunState::Running,
            last_result: None,
        }));
        assert_eq!(state.main_view(), MainView::Loading);
        assert!(state.run_started.is_some());

        let r = Arc::new(sample_response());
        state.apply_event(DashboardEvent::Run(RunSnapshot {
            state: RunState::Succeeded(r.clone()),
            last_result: Some(r.clone()),
        }));
        assert_eq!(state.main_view(), MainView::Populated(r.clone()));
        assert!(state.info.starts_with("Analysis complete"));

        state.apply_event(DashboardEvent::Run(RunSnapshot {
            state: RunState::Failed(ApiError::Transport("refused".into())),
            last_result: Some(r.clone()),
        }));
        match state.main_view() {
            MainView::Error { message, stale } => {
                assert!(message.starts_with("Failed to connect"));
                assert_eq!(stale, Some(r.clone()));
            }
            other => panic!("unexpected view {other:?}"),
        }
        assert_eq!(state.displayed_result(), Some(r));
    }

    #[test]
    fn loading_hides_previous_result() {
        let r = Arc::new(sample_response());
        let mut state = UiState::default();
        state.apply_event(DashboardEvent::Run(RunSnapshot {
            state: RunState::Running,
            last_result: Some(r),
        }));
        assert_eq!(state.main_view(), MainView::Loading);
        assert!(state.displayed_result().is_none());
    }

    #[test]
    fn health_and_info_events_update_state() {
        let mut state = UiState::default();
        state.apply_event(DashboardEvent::Health(HealthStatus::Disconnected));
        state.apply_event(DashboardEvent::Info("hello".into()));
        assert_eq!(state.health, HealthStatus::Disconnected);
        assert_eq!(state.info, "hello");
    }

    #[test]
    fn tabs_cycle_both_ways() {
        assert_eq!(Tab::Overview.next(), Tab::PowerCurve);
        assert_eq!(Tab::Help.next(), Tab::Overview);
        assert_eq!(Tab::Overview.prev(), Tab::Help);
    }

    #[test]
    fn wrapped_kv_splits_long_values() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "URL", &"x".repeat(30), Style::default(), 20);
        assert!(out.len() > 1);
        push_wrapped_status_kv(&mut out, "Empty", "   ", Style::default(), 20);
        let before = out.len();
        push_wrapped_status_kv(&mut out, "Empty", "", Style::default(), 20);
        assert_eq!(out.len(), before);
    }
}
