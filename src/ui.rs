use crate::app::{App, View};
use crate::config::MAX_DISPLAYED_PATHS;
use crate::report::{AssetReport, PercentileBands};
use crate::summary::Histogram;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    render_header(f, app, layout[0]);

    match app.view {
        View::Portfolio => render_portfolio(f, app, layout[1]),
        View::Asset(i) => render_asset(f, app, i, layout[1]),
    }

    render_footer(f, layout[2]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let view_name = match app.view {
        View::Portfolio => "Portfolio".to_string(),
        View::Asset(i) => app
            .report
            .assets
            .get(i)
            .map(|a| a.symbol.clone())
            .unwrap_or_default(),
    };

    let mut spans = vec![
        Span::styled(" Monte Carlo Portfolio ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(view_name, Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::raw(format!(
            "{} trials x {} days, invested {:.2}",
            app.report.horizon.trials, app.report.horizon.days, app.report.initial_investment
        )),
    ];
    if let Some(seed) = app.report.seed {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(format!("seed {}", seed), Style::default().fg(Color::Gray)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled("Tab/→ next | Shift-Tab/← previous | p: portfolio | q/Esc: quit", Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn min_max(series: &[&[f64]]) -> (f64, f64) {
    series
        .iter()
        .flat_map(|s| s.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn indexed(values: &[f64]) -> Vec<(f64, f64)> {
    values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect()
}

fn band_datasets<'a>(
    p10: &'a [(f64, f64)],
    p50: &'a [(f64, f64)],
    p90: &'a [(f64, f64)],
) -> Vec<Dataset<'a>> {
    vec![
        Dataset::default()
            .name("P90")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(p90),
        Dataset::default()
            .name("P50")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(p50),
        Dataset::default()
            .name("P10")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(p10),
    ]
}

fn line_chart<'a>(datasets: Vec<Dataset<'a>>, title: String, y_title: &'a str, days: usize, lo: f64, hi: f64) -> Chart<'a> {
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 1.0, hi + 1.0) };
    let pad = (hi - lo) * 0.05;
    Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Days")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, days.saturating_sub(1).max(1) as f64])
                .labels(vec![
                    Span::styled("0", Style::default().fg(Color::Gray)),
                    Span::styled(format!("{}", days.saturating_sub(1)), Style::default().fg(Color::Gray)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(y_title)
                .style(Style::default().fg(Color::Gray))
                .bounds([lo - pad, hi + pad])
                .labels(vec![
                    Span::styled(format!("{:.1}", lo), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.1}", hi), Style::default().fg(Color::Gray)),
                ]),
        )
}

fn render_history(f: &mut Frame, asset: &AssetReport, area: Rect) {
    let points: Vec<(f64, f64)> = asset
        .history
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.price))
        .collect();
    let prices: Vec<f64> = asset.history.iter().map(|p| p.price).collect();
    let (lo, hi) = min_max(&[prices.as_slice()]);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 1.0, hi + 1.0) };
    let pad = (hi - lo) * 0.05;

    // Index-based x axis; skipped CSV rows leave no gaps.
    let date_labels: Vec<Span> = match (asset.history.first(), asset.history.last()) {
        (Some(first), Some(last)) => {
            let mid = &asset.history[asset.history.len() / 2];
            [first, mid, last]
                .iter()
                .map(|p| Span::styled(p.date.format("%Y-%m-%d").to_string(), Style::default().fg(Color::Gray)))
                .collect()
        }
        _ => Vec::new(),
    };

    let datasets = vec![
        Dataset::default()
            .name("Price")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(
                    format!("{} - Historical Prices ({} observations)", asset.symbol, asset.history.len()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, asset.history.len().saturating_sub(1).max(1) as f64])
                .labels(date_labels),
        )
        .y_axis(
            Axis::default()
                .title("Price")
                .style(Style::default().fg(Color::Gray))
                .bounds([lo - pad, hi + pad])
                .labels(vec![
                    Span::styled(format!("{:.2}", lo), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.2}", hi), Style::default().fg(Color::Gray)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_histogram(f: &mut Frame, histogram: &Histogram, reference: f64, title: &str, area: Rect) {
    let bins = histogram.counts.len().max(1) as u16;
    let bar_width = (area.width.saturating_sub(2) / bins).max(1);

    let bars: Vec<Bar> = histogram
        .counts
        .iter()
        .zip(histogram.bin_centers())
        .map(|(&count, center)| {
            let color = if center < reference { Color::Red } else { Color::Green };
            Bar::default()
                .value(count as u64)
                .text_value(String::new())
                .style(Style::default().fg(color))
        })
        .collect();

    let lo = histogram.edges.first().copied().unwrap_or(0.0);
    let hi = histogram.edges.last().copied().unwrap_or(0.0);

    let chart = BarChart::default()
        .block(
            Block::default()
                .title(Span::styled(
                    format!("{}  [{:.2} .. {:.2}], reference {:.2}", title, lo, hi, reference),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .bar_width(bar_width)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

fn signed_color(value: f64) -> Color {
    if value >= 0.0 { Color::Green } else { Color::Red }
}

fn render_portfolio(f: &mut Frame, app: &App, area: Rect) {
    let report = app.report;

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[0]);

    render_bands(f, &report.value_bands, "Portfolio Value (P10 / P50 / P90)".to_string(), "Value", Some(report.initial_investment), rows[0]);
    render_histogram(
        f,
        &report.terminal_histogram,
        report.initial_investment,
        "Final Portfolio Values",
        rows[1],
    );

    let t = &report.terminal_values;
    let change = (t.mean / report.initial_investment - 1.0) * 100.0;
    let mut info = vec![
        Line::from(Span::styled("Final Value", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(format!("Mean:   {:.2} ({:+.2}%)", t.mean, change), Style::default().fg(signed_color(change)))),
        Line::from(format!("Median: {:.2}", t.p50)),
        Line::from(format!("P5:     {:.2}", t.p5)),
        Line::from(format!("P95:    {:.2}", t.p95)),
        Line::from(format!("StdDev: {:.2}", t.std_dev)),
        Line::from(""),
        Line::from(Span::styled("Risk", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
        Line::from(format!("P(loss):  {:.1}%", report.risk.probability_of_loss * 100.0)),
        Line::from(Span::styled(format!("VaR 95%:  {:.2}%", report.risk.var_95), Style::default().fg(Color::Red))),
        Line::from(Span::styled(format!("CVaR 95%: {:.2}%", report.risk.cvar_95), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled("Composition / Avg Return", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
    ];
    for asset in &report.assets {
        info.push(Line::from(vec![
            Span::raw(format!("{:<8} {:>5.1}%  ", asset.symbol, asset.weight * 100.0)),
            Span::styled(
                format!("{:+.2}%", asset.average_return_pct),
                Style::default().fg(signed_color(asset.average_return_pct)),
            ),
        ]));
    }

    let panel = Paragraph::new(info)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .style(Style::default().fg(Color::White));
    f.render_widget(panel, columns[1]);
}

fn render_bands(f: &mut Frame, bands: &PercentileBands, title: String, y_title: &str, reference: Option<f64>, area: Rect) {
    let p10 = indexed(&bands.p10);
    let p50 = indexed(&bands.p50);
    let p90 = indexed(&bands.p90);
    let days = bands.p50.len();
    let reference_line: Vec<(f64, f64)> = reference
        .map(|r| vec![(0.0, r), (days.saturating_sub(1) as f64, r)])
        .unwrap_or_default();

    let mut datasets = band_datasets(&p10, &p50, &p90);
    if !reference_line.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Initial")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::White))
                .data(&reference_line),
        );
    }

    let (lo, hi) = min_max(&[bands.p10.as_slice(), bands.p90.as_slice()]);
    let (lo, hi) = match reference {
        Some(r) => (lo.min(r), hi.max(r)),
        None => (lo, hi),
    };
    f.render_widget(line_chart(datasets, title, y_title, days, lo, hi), area);
}

fn render_paths(f: &mut Frame, app: &App, index: usize, asset: &AssetReport, area: Rect) {
    let Some(ensemble) = app.simulation.assets.get(index).and_then(|a| a.paths.as_ref()) else {
        let text = Paragraph::new("Price paths were not retained for this run (--no-paths).")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Simulated Paths"));
        f.render_widget(text, area);
        return;
    };

    let shown = ensemble.trials().min(MAX_DISPLAYED_PATHS);
    let paths: Vec<Vec<(f64, f64)>> = ensemble.paths().take(shown).map(indexed).collect();
    let mut datasets: Vec<Dataset> = paths
        .iter()
        .map(|p| {
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::DarkGray))
                .data(p)
        })
        .collect();

    let (lo, hi, bands) = match &asset.price_bands {
        Some(b) => {
            let (lo, hi) = min_max(&[b.p10.as_slice(), b.p90.as_slice()]);
            (lo, hi, Some((indexed(&b.p10), indexed(&b.p50), indexed(&b.p90))))
        }
        None => {
            let slices: Vec<&[f64]> = ensemble.paths().take(shown).collect();
            let (lo, hi) = min_max(&slices);
            (lo, hi, None)
        }
    };
    let shown_lo = paths.iter().flatten().map(|(_, v)| *v).fold(lo, f64::min);
    let shown_hi = paths.iter().flatten().map(|(_, v)| *v).fold(hi, f64::max);

    if let Some((p10, p50, p90)) = &bands {
        datasets.extend(band_datasets(p10, p50, p90));
    }

    let title = format!("{} - {} of {} Simulated Paths", asset.symbol, shown, ensemble.trials());
    f.render_widget(line_chart(datasets, title, "Price", ensemble.days(), shown_lo, shown_hi), area);
}

fn render_asset(f: &mut Frame, app: &App, index: usize, area: Rect) {
    let Some(asset) = app.report.assets.get(index) else {
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(columns[0]);

    render_history(f, asset, rows[0]);
    render_paths(f, app, index, asset, rows[1]);
    render_histogram(
        f,
        &asset.position_histogram,
        asset.allocation,
        &format!("Final {} Position Values", asset.symbol),
        rows[2],
    );

    let s = &asset.statistics;
    let tp = &asset.terminal_prices;
    let info = vec![
        Line::from(Span::styled("Historical Returns", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
        Line::from(format!("Samples:  {}", s.samples)),
        Line::from(format!("Mean:     {:.6}", s.mean)),
        Line::from(format!("Stdev:    {:.6}", s.stdev)),
        Line::from(format!("Drift:    {:.6}", s.drift)),
        Line::from(format!("Ann.Vol:  {:.2}%", s.annualized_volatility() * 100.0)),
        Line::from(""),
        Line::from(Span::styled("Position", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
        Line::from(format!("Weight:   {:.1}%", asset.weight * 100.0)),
        Line::from(format!("Invested: {:.2}", asset.allocation)),
        Line::from(format!("Price:    {:.2}", asset.current_price)),
        Line::from(""),
        Line::from(Span::styled("Final Price", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(format!("P95: {:.2}", tp.p95), Style::default().fg(Color::Green))),
        Line::from(Span::styled(format!("P50: {:.2}", tp.p50), Style::default().fg(Color::Yellow))),
        Line::from(Span::styled(format!("P5:  {:.2}", tp.p5), Style::default().fg(Color::Red))),
        Line::from(Span::styled(
            format!("Avg Return: {:+.2}%", asset.average_return_pct),
            Style::default().fg(signed_color(asset.average_return_pct)),
        )),
    ];

    let panel = Paragraph::new(info)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .style(Style::default().fg(Color::White));
    f.render_widget(panel, columns[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::data::PriceSeries;
    use crate::engine::{run_simulation, PortfolioSimulation};
    use crate::random::{NormalMethod, SeededShocks};
    use crate::report::SimulationReport;
    use ratatui::{backend::TestBackend, Terminal};

    fn simulation(retain_paths: bool) -> PortfolioSimulation {
        let a = PriceSeries::from_prices("AAA", &[10.0, 10.5, 10.2, 10.8, 11.0]).unwrap();
        let b = PriceSeries::from_prices("BBB", &[50.0, 49.0, 51.0, 52.0, 51.5]).unwrap();
        let config = SimulationConfig { days: 20, trials: 30, retain_paths, ..SimulationConfig::default() };
        let shocks = SeededShocks::new(4, NormalMethod::InverseCdf);
        run_simulation(&[a, b], &[0.3, 0.7], &config, &shocks, Some(4)).unwrap()
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_render_every_view() {
        let sim = simulation(true);
        let report = SimulationReport::from_simulation(&sim).unwrap();
        let mut app = App::new(&sim, &report);
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();

        terminal.draw(|f| render(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Portfolio"));
        assert!(text.contains("Composition"));

        app.next_view();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("AAA"));
        assert!(text.contains("Simulated Paths"));

        app.next_view();
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(buffer_text(&terminal).contains("BBB"));
    }

    #[test]
    fn test_render_without_paths() {
        let sim = simulation(false);
        let report = SimulationReport::from_simulation(&sim).unwrap();
        let mut app = App::new(&sim, &report);
        app.next_view();
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        assert!(buffer_text(&terminal).contains("not retained"));
    }

    #[test]
    fn test_asset_view_shows_historical_prices() {
        let sim = simulation(true);
        let report = SimulationReport::from_simulation(&sim).unwrap();
        let mut app = App::new(&sim, &report);
        app.next_view();
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Historical Prices"));
        assert!(text.contains("2000-01-01"));
        assert!(text.contains("2000-01-05"));
    }

    #[test]
    fn test_render_tiny_terminal() {
        let sim = simulation(true);
        let report = SimulationReport::from_simulation(&sim).unwrap();
        let app = App::new(&sim, &report);
        let mut terminal = Terminal::new(TestBackend::new(20, 8)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
    }
}
