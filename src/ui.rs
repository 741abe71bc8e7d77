use covid_map::data::Category;
use covid_map::plot::{Axis as PlotAxis, Plot, PlotKind, PlotMenu, Scale};
use covid_map::stats::{date_label, datetime_label};
use covid_map::{DerivedSeries, SortKey};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Widget},
    Frame,
};

use crate::app::{App, Mode};
use crate::braille::BrailleCanvas;
use crate::map::{MapLayers, Shade};

/// Side panel width in columns; the panel is dropped on narrow terminals.
const PANEL_WIDTH: u16 = 48;
const MIN_MAP_WIDTH: u16 = 40;

const TREND_COLORS: [Color; 6] = [
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Blue,
    Color::LightRed,
];

fn split(area: Rect) -> (Rect, Option<Rect>, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    if rows[0].width < PANEL_WIDTH + MIN_MAP_WIDTH {
        return (rows[0], None, rows[1]);
    }
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(MIN_MAP_WIDTH), Constraint::Length(PANEL_WIDTH)])
        .split(rows[0]);
    (cols[0], Some(cols[1]), rows[1])
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " COVID-19 cases ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Inner map rectangle for a terminal of size `area`.
pub fn map_inner(area: Rect) -> Rect {
    let (map, _, _) = split(area);
    map_block().inner(map)
}

pub fn render(frame: &mut Frame, app: &App) {
    let (map, panel, status) = split(frame.area());
    render_map(frame, app, map);
    if let Some(panel) = panel {
        render_panel(frame, app, panel);
    }
    render_status_bar(frame, app, status);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let highlighted = app.highlighted();
    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        app.listed(),
        &highlighted,
    );
    frame.render_widget(MapWidget { layers }, inner);
}

struct MapWidget {
    layers: MapLayers,
}

fn shade_color(shade: Shade) -> Color {
    match shade {
        Shade::Faint => Color::Rgb(130, 100, 40),
        Shade::Medium => Color::Rgb(200, 150, 40),
        Shade::Strong => Color::Rgb(255, 200, 0),
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Confirmed => Color::Yellow,
        Category::Recovered => Color::Green,
        Category::Deaths => Color::Red,
    }
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        if canvas.is_blank() {
            return;
        }
        let rows = canvas.height().min(area.height as usize);
        let cols = canvas.width().min(area.width as usize);
        for cy in 0..rows {
            for cx in 0..cols {
                if let Some(ch) = canvas.cell(cx, cy) {
                    buf[(area.x + cx as u16, area.y + cy as u16)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layers = &self.layers;
        Self::render_layer(&layers.basemap, Color::DarkGray, area, buf);
        for shade in Shade::ALL {
            Self::render_layer(layers.confirmed(shade), shade_color(shade), area, buf);
        }
        Self::render_layer(&layers.recovered, category_color(Category::Recovered), area, buf);
        Self::render_layer(&layers.deaths, category_color(Category::Deaths), area, buf);
        Self::render_layer(&layers.highlight, Color::Cyan, area, buf);

        let style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &layers.labels {
            if *lx >= area.width || *ly >= area.height {
                continue;
            }
            let room = (area.width - lx) as usize;
            let text: String = text.chars().take(room.min(32)).collect();
            buf.set_string(area.x + lx, area.y + ly, text, style);
        }
    }
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(10), Constraint::Length(12)])
        .split(area);

    match &app.selection {
        Some(selection) => {
            let title = selection.title();
            match &selection.stats {
                Some(stats) => render_figures(frame, &title, stats, chunks[0]),
                None => frame.render_widget(Paragraph::new("No data").block(panel_block(title)), chunks[0]),
            }
            render_chart(frame, app, &selection.menu, chunks[1]);
        }
        None => {
            let title = app
                .config
                .country_to_display
                .clone()
                .unwrap_or_else(|| "Global".to_string());
            render_figures(frame, &title, &app.aggregates.global_stats, chunks[0]);
            render_chart(frame, app, &app.global_menu, chunks[1]);
        }
    }
    render_regions(frame, app, chunks[2]);
}

fn panel_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(format!(" {title} "), Style::default().fg(Color::Cyan)))
}

/// `1234567` as `1,234,567`.
fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}%"))
}

fn figure_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<12}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn render_figures(frame: &mut Frame, title: &str, stats: &DerivedSeries, area: Rect) {
    let (c, r, d) = stats.latest();
    let mut lines = vec![
        figure_line("Confirmed", thousands(c as i64), category_color(Category::Confirmed)),
        figure_line("Recovered", thousands(r as i64), category_color(Category::Recovered)),
        figure_line("Deaths", thousands(d as i64), category_color(Category::Deaths)),
        figure_line("Active", thousands(stats.active()), Color::White),
        figure_line(&format!("CFR T={}", stats.lag), percent(stats.last_cfr_t()), Color::White),
    ];
    if stats.cfr_ddr.is_some() {
        lines.push(figure_line("CFR d/(d+r)", percent(stats.last_cfr_ddr()), Color::White));
    }
    if let Some(time) = stats.last_updated {
        lines.push(figure_line("Updated", datetime_label(time), Color::DarkGray));
    }
    frame.render_widget(Paragraph::new(lines).block(panel_block(title.to_string())), area);
}

fn menu_title(menu: &PlotMenu) -> Line<'static> {
    let active = menu.active().map(|(kind, _)| kind);
    let mut spans = vec![Span::raw(" ")];
    for &(kind, plot_type) in menu.items() {
        let style = if Some(kind) == active {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let label = if kind.plot_types() > 1 && Some(kind) == active {
            format!("{}:{}", kind.title(), plot_type)
        } else {
            kind.title().to_string()
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

/// Bounds widened so the chart never gets an empty range.
fn padded(bounds: Option<[f64; 2]>) -> [f64; 2] {
    match bounds {
        Some([lo, hi]) if hi > lo => [lo, hi],
        Some([v, _]) => [v - 1.0, v + 1.0],
        None => [0.0, 1.0],
    }
}

fn x_label(axis: PlotAxis, x: f64) -> String {
    match axis {
        PlotAxis::Date => date_label((x * 86_400.0) as i64),
        PlotAxis::SinceFirstCase => format!("day {x:.0}"),
    }
}

fn y_label(plot: &Plot, y: f64) -> String {
    let value = match plot.scale {
        Scale::Linear => y,
        Scale::Log => 10f64.powf(y),
    };
    if plot.kind == PlotKind::Cfr {
        format!("{value:.1}%")
    } else {
        thousands(value.round() as i64)
    }
}

fn render_chart(frame: &mut Frame, app: &App, menu: &PlotMenu, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(menu_title(menu));

    let Some(plot) = app.active_plot().filter(|plot| plot.trends.iter().any(|t| !t.points.is_empty())) else {
        frame.render_widget(Paragraph::new("No data").block(block), area);
        return;
    };

    let datasets: Vec<Dataset> = plot
        .trends
        .iter()
        .enumerate()
        .map(|(i, trend)| {
            let color = trend
                .category
                .filter(|_| !matches!(plot.kind, PlotKind::Confirmed | PlotKind::Recovered | PlotKind::Deaths))
                .map_or(TREND_COLORS[i % TREND_COLORS.len()], category_color);
            Dataset::default()
                .name(trend.name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(&trend.points)
        })
        .collect();

    let [x0, x1] = padded(plot.x_bounds());
    let [y0, y1] = padded(plot.y_bounds());
    let label_style = Style::default().fg(Color::DarkGray);
    let x_axis = Axis::default()
        .style(label_style)
        .bounds([x0, x1])
        .labels([x_label(plot.axis, x0), x_label(plot.axis, x1)]);
    let y_axis = Axis::default()
        .style(label_style)
        .bounds([y0, y1])
        .labels([y_label(&plot, y0), y_label(&plot, y1)]);

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(x_axis)
        .y_axis(y_axis)
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));
    frame.render_widget(chart, area);
}

fn sort_value(key: SortKey, summary: &covid_map::RegionSummary) -> String {
    match key {
        SortKey::Confirmed => thousands(summary.confirmed as i64),
        SortKey::Recovered => thousands(summary.recovered as i64),
        SortKey::Deaths => thousands(summary.deaths as i64),
        SortKey::Active => thousands(summary.active),
        SortKey::CfrDdr => percent(summary.cfr_ddr),
    }
}

fn render_regions(frame: &mut Frame, app: &App, area: Rect) {
    let arrow = if app.descending { "▼" } else { "▲" };
    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Region"),
        Cell::from(format!("{} {arrow}", app.sort_key.title())),
    ])
    .style(Style::default().fg(Color::Cyan));

    let rows = app.summaries.iter().enumerate().map(|(i, summary)| {
        Row::new(vec![
            Cell::from((i + 1).to_string()),
            Cell::from(summary.name.clone()),
            Cell::from(sort_value(app.sort_key, summary)),
        ])
    });

    let table = Table::new(
        rows,
        [Constraint::Length(4), Constraint::Min(16), Constraint::Length(16)],
    )
    .header(header)
    .block(panel_block(format!("{} regions", app.summaries.len())));
    frame.render_widget(table, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let line = match app.mode {
        Mode::Query => Line::from(vec![
            Span::styled(" Query: ", Style::default().fg(Color::Cyan)),
            Span::raw(app.input.clone()),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
            Span::styled("  Enter:search Esc:cancel", dim),
        ]),
        Mode::Normal => {
            let mut spans = vec![
                Span::styled(" Zoom: ", dim),
                Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
                Span::styled(" | ", dim),
                Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
            ];
            if let Some(updated) = app.last_updated() {
                spans.push(Span::styled(format!(" | updated {updated}"), dim));
            }
            match &app.status {
                Some(status) => spans.push(Span::styled(format!(" | {status}"), Style::default().fg(Color::Red))),
                None => spans.push(Span::styled(
                    " | /:query Tab:plot t:type o:sort O:order b:basemap c:compact Esc:clear q:quit",
                    dim,
                )),
            }
            Line::from(spans)
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}
