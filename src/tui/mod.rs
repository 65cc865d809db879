mod charts;
mod export;
mod help;
mod state;
mod theme;

use crate::cli::Cli;
use crate::engine::HttpBackend;
use crate::metrics;
use crate::model::{
    AnalysisResponse, DashboardConfig, DashboardEvent, HealthStatus, RunState, Theme,
};
use crate::orchestrator::{self, DashboardController, UiCommand};
use crate::storage::PreferenceStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use state::{MainView, Tab, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use theme::Palette;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: DashboardConfig) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashboardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let backend = HttpBackend::new(&cfg)?;
    tracing::info!(url = %backend.base_url(), plant = %cfg.plant_name, "starting dashboard");
    let controller = DashboardController::new(backend, &cfg);
    let prefs = PreferenceStore::open_default().unwrap_or_else(|e| {
        tracing::warn!(error = ?e, "no config dir; theme will not persist across runs");
        PreferenceStore::at(std::env::temp_dir().join("wind-aep-dashboard-preferences.json"))
    });
    tracing::debug!(path = %prefs.path().display(), "theme preferences");

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_cfg = cfg.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_args, ui_cfg, prefs, event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, args.run_on_launch, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Outcome of a key press for the event loop.
#[derive(Debug, PartialEq)]
enum KeyOutcome {
    Continue,
    Command(UiCommand),
    Quit,
}

fn handle_key(
    state: &mut UiState,
    prefs: &PreferenceStore,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> KeyOutcome {
    match (modifiers, code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => KeyOutcome::Quit,
        (_, KeyCode::Char('r')) | (_, KeyCode::Enter) => {
            // The controller ignores re-entrant triggers too; this just keeps the UI quiet.
            if state.run.is_running() {
                state.info = "Analysis already running…".into();
                KeyOutcome::Continue
            } else {
                state.info = "Run requested…".into();
                KeyOutcome::Command(UiCommand::RunAnalysis)
            }
        }
        (_, KeyCode::Char('t')) => {
            state.theme = state.theme.toggled();
            match prefs.save_theme(state.theme) {
                Ok(()) => {
                    state.info = match state.theme {
                        Theme::Dark => "Dark theme".into(),
                        Theme::Light => "Light theme".into(),
                    }
                }
                Err(e) => state.info = format!("Theme not saved: {e:#}"),
            }
            KeyOutcome::Continue
        }
        (_, KeyCode::Char('s')) => {
            export::save_and_show_path(state);
            KeyOutcome::Continue
        }
        (_, KeyCode::Tab) => {
            state.tab = state.tab.next();
            KeyOutcome::Continue
        }
        (_, KeyCode::BackTab) => {
            state.tab = state.tab.prev();
            KeyOutcome::Continue
        }
        (_, KeyCode::Char(c @ '1'..='5')) => {
            let idx = (c as usize) - ('1' as usize);
            state.tab = Tab::ALL[idx];
            KeyOutcome::Continue
        }
        (_, KeyCode::Char('?')) => {
            state.tab = Tab::Help;
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    cfg: DashboardConfig,
    prefs: PreferenceStore,
    mut event_rx: UnboundedReceiver<DashboardEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        theme: prefs.load_theme(),
        base_url: cfg.base_url.clone(),
        plant_name: cfg.plant_name.clone(),
        info: "Press r to run an analysis, ? for help".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut last_exported: Option<Arc<AnalysisResponse>> = None;

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
            export_on_success(&args, &mut state, &mut last_exported);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, &prefs, k.modifiers, k.code) {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Command(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyOutcome::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Write `--export-json` once per successful run.
fn export_on_success(
    args: &Cli,
    state: &mut UiState,
    last_exported: &mut Option<Arc<AnalysisResponse>>,
) {
    let RunState::Succeeded(r) = &state.run.state else {
        return;
    };
    if last_exported.as_ref().is_some_and(|prev| Arc::ptr_eq(prev, r)) {
        return;
    }
    let r = r.clone();
    let processed = orchestrator::process_run_completion(args, &r);
    if let Some(msg) = processed.export_messages.last() {
        state.info = msg.clone();
    }
    *last_exported = Some(r);
}

fn draw(area: Rect, f: &mut Frame, state: &UiState) {
    let p = Palette::for_theme(state.theme);
    f.render_widget(Block::default().style(p.base()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // tabs + status badge
                Constraint::Length(5), // summary cards
                Constraint::Min(0),    // tab body
                Constraint::Length(3), // status line
            ]
            .as_ref(),
        )
        .split(area);

    draw_header(chunks[0], f, state, &p);
    draw_cards(chunks[1], f, state, &p);
    match state.tab {
        Tab::Help => help::draw_help(chunks[2], f, &p),
        tab => draw_body(chunks[2], f, state, tab, &p),
    }
    draw_status(chunks[3], f, state, &p);
}

fn draw_header(area: Rect, f: &mut Frame, state: &UiState, p: &Palette) {
    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(24)].as_ref())
        .split(area);

    let tabs = Tabs::new(
        Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
            .collect::<Vec<_>>(),
    )
    .select(state.tab.index())
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("wind-aep-dashboard"),
    )
    .highlight_style(Style::default().fg(p.warn).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, row[0]);

    let badge = Paragraph::new(Line::from(vec![
        Span::styled("● ", p.health(state.health)),
        Span::raw(state.health.label()),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Engine"));
    f.render_widget(badge, row[1]);
}

/// One summary card: description title, big value, footer line.
fn card<'a>(title: &'a str, value: String, footer: String, value_style: Style, p: &Palette) -> Paragraph<'a> {
    Paragraph::new(vec![
        Line::from(Span::styled(value, value_style.add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(footer, p.muted())),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title(title))
}

fn draw_cards(area: Rect, f: &mut Frame, state: &UiState, p: &Palette) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(area);

    let data = state.displayed_result();
    let summary = data.as_ref().map(|d| &d.chart_data.summary);
    let value_style = Style::default().fg(p.fg);

    let aep = card(
        "Annual Energy Production",
        data.as_ref()
            .map(|d| format!("{} GWh", d.aep_gwh))
            .unwrap_or_else(|| "--.- GWh".into()),
        summary
            .map(|s| format!("{} · {} iterations", s.plant_name, s.num_simulations))
            .unwrap_or_else(|| format!("Awaiting analysis · {}", state.plant_name)),
        value_style,
        p,
    );
    f.render_widget(aep, cols[0]);

    let uncertainty = card(
        "Uncertainty",
        data.as_ref()
            .map(|d| d.uncertainty.clone())
            .unwrap_or_else(|| "--.--%".into()),
        if data.is_some() {
            "Simulation spread across iterations".into()
        } else {
            "Awaiting analysis".into()
        },
        value_style,
        p,
    );
    f.render_widget(uncertainty, cols[1]);

    let cf = card(
        "Avg. Capacity Factor",
        summary
            .map(|s| metrics::percent(s.avg_capacity_factor))
            .unwrap_or_else(|| "--.-%".into()),
        summary
            .map(|s| format!("{} turbines · rated {} MW", s.total_turbines, s.rated_power_mw))
            .unwrap_or_else(|| "Plant-wide metric".into()),
        value_style,
        p,
    );
    f.render_widget(cf, cols[2]);

    let online = state.health.is_connected();
    let engine = card(
        "Engine Status",
        if online { "Online".into() } else { "Offline".into() },
        data.as_ref()
            .map(|d| d.mode.description().to_string())
            .unwrap_or_else(|| {
                if online {
                    "Backend active".into()
                } else {
                    "Cannot reach backend".into()
                }
            }),
        p.health(if online {
            HealthStatus::Connected
        } else {
            HealthStatus::Disconnected
        }),
        p,
    );
    f.render_widget(engine, cols[3]);
}

fn draw_body(area: Rect, f: &mut Frame, state: &UiState, tab: Tab, p: &Palette) {
    let (area, result) = match state.main_view() {
        MainView::Empty => {
            let msg = Paragraph::new(vec![
                Line::from(Span::styled("No Analysis Results Yet", p.title())),
                Line::from(""),
                Line::from(format!(
                    "Press r to run a Monte Carlo AEP simulation for {}.",
                    state.plant_name
                )),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(msg, area);
            return;
        }
        MainView::Loading => {
            let elapsed = state
                .run_started
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0);
            let spinner = ['|', '/', '-', '\\'][(elapsed as usize) % 4];
            let msg = Paragraph::new(vec![
                Line::from(Span::styled(
                    format!("{spinner} Running Monte Carlo Simulations"),
                    p.title(),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    format!("{elapsed}s elapsed; this may take a moment…"),
                    p.muted(),
                )),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(msg, area);
            return;
        }
        MainView::Error { message, stale } => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(4), Constraint::Min(0)].as_ref())
                .split(area);
            let banner = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Backend Unavailable",
                    Style::default().fg(p.err).add_modifier(Modifier::BOLD),
                )),
                Line::from(message),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(p.err)),
            );
            f.render_widget(banner, rows[0]);
            match stale {
                Some(r) => (rows[1], r),
                None => return,
            }
        }
        MainView::Populated(r) => (area, r),
    };

    match tab {
        Tab::Overview => draw_overview(area, f, &result, p),
        Tab::PowerCurve => charts::draw_power_curve(f, area, &result.chart_data.power_curve, p),
        Tab::Production => {
            charts::draw_monthly_production(f, area, &result.chart_data.monthly_production, p)
        }
        Tab::Turbines => charts::draw_turbines(f, area, &result.chart_data.turbine_comparison, p),
        Tab::Help => help::draw_help(area, f, p),
    }
}

fn plot_image_descriptor(plot_image: &str) -> String {
    if plot_image.is_empty() {
        "none".into()
    } else if let Some(rest) = plot_image.strip_prefix("data:") {
        let mime = rest.split([';', ',']).next().unwrap_or("unknown");
        format!("inline {mime} ({} bytes encoded)", plot_image.len())
    } else {
        plot_image.to_string()
    }
}

fn draw_overview(area: Rect, f: &mut Frame, r: &AnalysisResponse, p: &Palette) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(area);

    charts::draw_aep_distribution(f, cols[0], &r.chart_data.aep_distribution, r.aep_gwh, p);

    let mut lines = Vec::new();
    let width = cols[1].width;
    let label = p.muted();
    state::push_wrapped_status_kv(&mut lines, "Status", &r.status, label, width);
    state::push_wrapped_status_kv(&mut lines, "Mode", r.mode.description(), label, width);
    state::push_wrapped_status_kv(&mut lines, "Plant", &r.chart_data.summary.plant_name, label, width);
    state::push_wrapped_status_kv(
        &mut lines,
        "Availability",
        &metrics::percent(r.chart_data.summary.avg_availability),
        label,
        width,
    );
    state::push_wrapped_status_kv(
        &mut lines,
        "Plot",
        &plot_image_descriptor(&r.plot_image),
        label,
        width,
    );
    if let Some(note) = r.debug_note.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Note:",
            Style::default().fg(p.warn).add_modifier(Modifier::BOLD),
        )));
        state::push_wrapped_status_kv(&mut lines, " ", note, label, width);
    }
    let details = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Backend Output"),
    );
    f.render_widget(details, cols[1]);
}

fn draw_status(area: Rect, f: &mut Frame, state: &UiState, p: &Palette) {
    let run_hint = if state.run.is_running() {
        Span::styled("running…", Style::default().fg(p.warn))
    } else {
        Span::styled("r", p.key())
    };
    let line = Line::from(vec![
        run_hint,
        Span::raw(" run  "),
        Span::styled("t", p.key()),
        Span::raw(" theme  "),
        Span::styled("s", p.key()),
        Span::raw(" save  "),
        Span::styled("q", p.key()),
        Span::raw(" quit  │ "),
        Span::raw(state.info.clone()),
    ]);
    let status = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Backend {}", state.base_url)),
    );
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_response;
    use crate::model::RunSnapshot;
    use clap::Parser;
    use ratatui::backend::TestBackend;

    fn prefs() -> (tempfile::TempDir, PreferenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::at(dir.path().join("prefs.json"));
        (dir, store)
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn run_key_is_ignored_while_running() {
        let (_dir, prefs) = prefs();
        let mut state = UiState::default();
        assert_eq!(
            handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Char('r')),
            KeyOutcome::Command(UiCommand::RunAnalysis)
        );
        state.run.state = RunState::Running;
        assert_eq!(
            handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Enter),
            KeyOutcome::Continue
        );
    }

    #[test]
    fn theme_toggle_persists_every_time() {
        let (_dir, prefs) = prefs();
        let mut state = UiState::default();
        handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Char('t'));
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(prefs.load_theme(), Theme::Light);
        handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Char('t'));
        assert_eq!(prefs.load_theme(), Theme::Dark);
    }

    #[test]
    fn quit_and_tab_keys() {
        let (_dir, prefs) = prefs();
        let mut state = UiState::default();
        assert_eq!(
            handle_key(&mut state, &prefs, KeyModifiers::CONTROL, KeyCode::Char('c')),
            KeyOutcome::Quit
        );
        handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Char('4'));
        assert_eq!(state.tab, Tab::Turbines);
        handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Tab);
        assert_eq!(state.tab, Tab::Help);
        handle_key(&mut state, &prefs, KeyModifiers::SHIFT, KeyCode::BackTab);
        assert_eq!(state.tab, Tab::Turbines);
    }

    #[test]
    fn save_without_result_reports_it() {
        let (_dir, prefs) = prefs();
        let mut state = UiState::default();
        handle_key(&mut state, &prefs, KeyModifiers::NONE, KeyCode::Char('s'));
        assert_eq!(state.info, "No completed analysis to save yet.");
    }

    #[test]
    fn export_runs_once_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let args = Cli::parse_from([
            "wind-aep-dashboard",
            "--export-json",
            path.to_str().unwrap(),
        ]);
        let r = Arc::new(sample_response());
        let mut state = UiState::default();
        state.run = RunSnapshot {
            state: RunState::Succeeded(r.clone()),
            last_result: Some(r),
        };
        let mut last = None;
        export_on_success(&args, &mut state, &mut last);
        assert!(path.exists());
        assert!(state.info.starts_with("Exported JSON"));

        std::fs::remove_file(&path).unwrap();
        export_on_success(&args, &mut state, &mut last);
        assert!(!path.exists());
    }

    #[test]
    fn plot_descriptor_summarizes_data_uris() {
        assert_eq!(plot_image_descriptor(""), "none");
        assert!(plot_image_descriptor("data:image/png;base64,AAAA").starts_with("inline image/png"));
        assert_eq!(
            plot_image_descriptor("https://example.com/p.png"),
            "https://example.com/p.png"
        );
    }

    #[test]
    fn renders_empty_and_populated_dashboards() {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut state = UiState {
            plant_name: "La Haute Borne".into(),
            ..Default::default()
        };
        terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("No Analysis Results Yet"));
        assert!(text.contains("--.- GWh"));

        let r = Arc::new(sample_response());
        state.health = HealthStatus::Connected;
        state.apply_event(DashboardEvent::Run(RunSnapshot {
            state: RunState::Succeeded(r.clone()),
            last_result: Some(r),
        }));
        for tab in Tab::ALL {
            state.tab = tab;
            terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        }
        state.tab = Tab::Overview;
        terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("12.3 GWh"));
        assert!(text.contains("Online"));
        assert!(text.contains("Engine Connected"));
    }

    #[test]
    fn renders_error_banner_over_stale_result() {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let r = Arc::new(sample_response());
        let mut state = UiState::default();
        state.apply_event(DashboardEvent::Run(RunSnapshot {
            state: RunState::Failed(crate::engine::ApiError::Server {
                status: 500,
                reason: "Internal Server Error".into(),
            }),
            last_result: Some(r),
        }));
        state.theme = Theme::Light;
        terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Backend Unavailable"));
        assert!(text.contains("Server returned 500: Internal Server Error"));
        assert!(text.contains("12.3 GWh"));
    }
}
