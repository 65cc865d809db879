use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType,
        Paragraph, Row, Table,
    },
    Frame,
};

use super::theme::Palette;
use crate::metrics;
use crate::model::{AepDistributionBin, MonthlyProduction, PowerCurvePoint, TurbineComparison};

fn inner(area: Rect) -> Rect {
    if area.width > 2 && area.height > 2 {
        Rect {
            x: area.x + 1,
            y: area.y + 1,
            width: area.width.saturating_sub(2),
            height: area.height.saturating_sub(2),
        }
    } else {
        area
    }
}

fn empty_panel(f: &mut Frame, area: Rect, title: &str, msg: &str, p: &Palette) {
    let empty = Paragraph::new(msg)
        .style(p.muted())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(empty, area);
}

/// Render a metrics line (avg, med, p25, p75) in the palette's accent color.
fn render_metrics_text<'a>(m: (f64, f64, f64, f64), unit: &str, p: &Palette) -> Line<'a> {
    let (mean, median, p25, p75) = m;
    let val = Style::default().fg(p.accent);
    Line::from(vec![
        Span::styled("avg", p.muted()),
        Span::styled(format!(" {:.2}", mean), val),
        Span::raw(" "),
        Span::styled("med", p.muted()),
        Span::styled(format!(" {:.2}", median), val),
        Span::raw(" "),
        Span::styled("p25", p.muted()),
        Span::styled(format!(" {:.2}", p25), val),
        Span::raw(" "),
        Span::styled("p75", p.muted()),
        Span::styled(format!(" {:.2}", p75), val),
        Span::styled(format!(" {unit}"), p.muted()),
    ])
}

/// Monte Carlo AEP histogram with the distribution metrics inside the same box.
pub fn draw_aep_distribution(
    f: &mut Frame,
    area: Rect,
    bins: &[AepDistributionBin],
    mean_aep: f64,
    p: &Palette,
) {
    if bins.is_empty() {
        empty_panel(f, area, "AEP Distribution", "No distribution data in this result.", p);
        return;
    }

    let chart_metrics = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)].as_ref())
        .split(inner(area));

    let bar_area = chart_metrics[0];
    let n = bins.len() as u16;
    let bar_width = (bar_area.width.saturating_sub(n) / n.max(1)).clamp(1, 12);
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(1).max(1);

    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            // Highlight the bin containing the headline estimate.
            let color = if mean_aep >= b.bin_start && mean_aep < b.bin_end {
                p.actual
            } else {
                p.accent
            };
            Bar::default()
                .value(b.count)
                .label(Line::from(b.bin_label.clone()))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(p.bg).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(max_count);
    f.render_widget(chart, bar_area);

    if let Some(m) = metrics::compute_distribution_metrics(bins) {
        f.render_widget(
            Paragraph::new(render_metrics_text(m, "GWh", p)).alignment(Alignment::Center),
            chart_metrics[1],
        );
    }

    let title = Line::from(vec![
        Span::raw("AEP Distribution (mean "),
        Span::styled(format!("{mean_aep} GWh"), Style::default().fg(p.actual)),
        Span::raw(")"),
    ]);
    f.render_widget(Block::default().borders(Borders::ALL).title(title), area);
}

/// Actual vs ideal power curve.
pub fn draw_power_curve(f: &mut Frame, area: Rect, points: &[PowerCurvePoint], p: &Palette) {
    if points.is_empty() {
        empty_panel(f, area, "Power Curve", "No power curve data in this result.", p);
        return;
    }

    let actual: Vec<(f64, f64)> = points.iter().map(|pt| (pt.wind_speed, pt.actual_power)).collect();
    let ideal: Vec<(f64, f64)> = points.iter().map(|pt| (pt.wind_speed, pt.ideal_power)).collect();

    let x_min = points.iter().map(|pt| pt.wind_speed).fold(f64::INFINITY, f64::min);
    let x_max = points
        .iter()
        .map(|pt| pt.wind_speed)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(x_min + 1.0);
    let y_max = points
        .iter()
        .map(|pt| pt.actual_power.max(pt.ideal_power))
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.10;

    let datasets = vec![
        Dataset::default()
            .name("Ideal")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(p.ideal))
            .data(&ideal),
        Dataset::default()
            .name("Actual")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(p.actual))
            .data(&actual),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Power Curve (actual vs ideal)"),
        )
        .x_axis(
            Axis::default()
                .title("Wind speed (m/s)")
                .style(p.muted())
                .bounds([x_min, x_max])
                .labels(vec![
                    format!("{x_min:.0}"),
                    format!("{:.0}", (x_min + x_max) / 2.0),
                    format!("{x_max:.0}"),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("kW")
                .style(p.muted())
                .bounds([0.0, y_max])
                .labels(vec![
                    "0".to_string(),
                    format!("{:.0}", y_max / 2.0),
                    format!("{y_max:.0}"),
                ]),
        );
    f.render_widget(chart, area);
}

/// Expected vs actual energy, one bar pair per month.
pub fn draw_monthly_production(
    f: &mut Frame,
    area: Rect,
    months: &[MonthlyProduction],
    p: &Palette,
) {
    if months.is_empty() {
        empty_panel(f, area, "Monthly Production", "No monthly data in this result.", p);
        return;
    }

    // Bars carry MWh so sub-GWh months still get height; labels show GWh.
    let to_bar = |gwh: f64| (gwh.max(0.0) * 1000.0).round() as u64;
    let max = months
        .iter()
        .map(|m| to_bar(m.expected_gwh).max(to_bar(m.actual_gwh)))
        .max()
        .unwrap_or(1)
        .max(1);

    let inner_width = area.width.saturating_sub(2);
    let per_group = (inner_width / (months.len() as u16).max(1)).max(3);
    let bar_width = (per_group.saturating_sub(1) / 2).max(1);

    let mut chart = BarChart::default()
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(1)
        .max(max);
    for m in months {
        let bars = [
            Bar::default()
                .value(to_bar(m.expected_gwh))
                .text_value(format!("{:.2}", m.expected_gwh))
                .style(Style::default().fg(p.ideal)),
            Bar::default()
                .value(to_bar(m.actual_gwh))
                .text_value(format!("{:.2}", m.actual_gwh))
                .style(Style::default().fg(p.actual)),
        ];
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(m.month.clone()))
                .bars(&bars),
        );
    }

    let title = match metrics::performance_ratio(months) {
        Some(ratio) => Line::from(vec![
            Span::raw("Monthly Production (GWh) "),
            Span::styled("expected", Style::default().fg(p.ideal)),
            Span::raw(" / "),
            Span::styled("actual", Style::default().fg(p.actual)),
            Span::raw(format!(" · actual/expected {}", metrics::percent(ratio))),
        ]),
        None => Line::from("Monthly Production (GWh)"),
    };
    f.render_widget(chart.block(Block::default().borders(Borders::ALL).title(title)), area);
}

/// Capacity factor per turbine (top) and the turbine detail table (bottom).
pub fn draw_turbines(f: &mut Frame, area: Rect, turbines: &[TurbineComparison], p: &Palette) {
    if turbines.is_empty() {
        empty_panel(f, area, "Turbines", "No turbine data in this result.", p);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(area);

    let bars: Vec<Bar> = turbines
        .iter()
        .map(|t| {
            Bar::default()
                .value((t.capacity_factor.max(0.0) * 1000.0).round() as u64)
                .text_value(metrics::percent(t.capacity_factor))
                .label(Line::from(t.turbine_id.clone()))
                .style(Style::default().fg(p.accent))
        })
        .collect();
    let n = turbines.len() as u16;
    let bar_width = (rows[0].width.saturating_sub(2 + n) / n.max(1)).clamp(3, 16);
    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Capacity Factor by Turbine"),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(1000);
    f.render_widget(chart, rows[0]);

    let header = Row::new(vec![
        Cell::from("Turbine"),
        Cell::from("Capacity Factor"),
        Cell::from("Availability"),
        Cell::from("Annual Energy (MWh)"),
    ])
    .style(p.muted().add_modifier(Modifier::BOLD));
    let body: Vec<Row> = turbines
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.turbine_id.clone()),
                Cell::from(metrics::percent(t.capacity_factor)),
                Cell::from(metrics::percent(t.availability)),
                Cell::from(format!("{:.1}", t.annual_energy_mwh)),
            ])
        })
        .collect();
    let table = Table::new(
        body,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Turbine Details"),
    );
    f.render_widget(table, rows[1]);
}
