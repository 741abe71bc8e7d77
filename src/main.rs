mod app;
mod braille;
mod map;
mod ui;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use app::{App, Mode};
use clap::Parser;
use covid_map::stats::datetime_label;
use covid_map::{build_aggregates, resolve, AggregationResult, Dataset, DerivedSeries, StatsConfig};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use map::{load_basemap, MapRenderer};
use ratatui::DefaultTerminal;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Terminal map of COVID-19 cases with derived statistics.
#[derive(Debug, Parser)]
#[command(name = "covid-map", version, about)]
struct Cli {
    /// GeoJSON case feed.
    #[arg(long, default_value = "data/cases.json")]
    data: PathBuf,
    /// JSON statistics config; every field is optional.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Restrict the view to one country.
    #[arg(long)]
    country: Option<String>,
    /// Coastline GeoJSON drawn under the case symbols.
    #[arg(long, default_value = "data/coastline.json")]
    basemap: PathBuf,
    /// Log file used while the terminal UI is running.
    #[arg(long, default_value = "covid-map.log")]
    log_file: PathBuf,
    /// Print totals and the query result instead of starting the UI.
    #[arg(long)]
    summary: bool,
    /// Location name or 1-based row number to select at start-up.
    query: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli)?;

    let dataset = Dataset::from_path(&cli.data).with_context(|| format!("loading {}", cli.data.display()))?;
    let config = load_config(&cli, &dataset)?;
    let aggregates = build_aggregates(&dataset.locations, &config);

    if cli.summary {
        print_summary(&dataset, &aggregates, &config, cli.query.as_deref());
        return Ok(());
    }

    let basemap = if cli.basemap.exists() {
        load_basemap(&cli.basemap).unwrap_or_else(|e| {
            warn!(error = %e, "basemap not loaded");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    let renderer = MapRenderer::new(basemap);
    if !renderer.has_basemap() {
        info!("no basemap loaded; drawing case symbols only");
    }

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, dataset, aggregates, config, renderer, cli.query);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Logs go to stderr in summary mode and to `--log-file` while the UI owns
/// the terminal.
fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.summary {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("initialising logging: {e}"))?;
        return Ok(None);
    }

    let dir = cli
        .log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = cli
        .log_file
        .file_name()
        .ok_or_else(|| anyhow!("--log-file must name a file"))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))?;
    Ok(Some(guard))
}

fn load_config(cli: &Cli, dataset: &Dataset) -> Result<StatsConfig> {
    let mut config = match &cli.config {
        Some(path) => StatsConfig::from_path(path)?,
        None => StatsConfig::default(),
    };
    if let Some(country) = &cli.country {
        config.country_to_display = Some(country.clone());
    }
    config.validate()?;
    if config.infer_duplicate_countries {
        config.infer_duplicates(&dataset.locations);
    }
    info!(
        duplicates = config.duplicate_countries.len(),
        country = config.country_to_display.as_deref().unwrap_or("all"),
        "configuration ready"
    );
    Ok(config)
}

fn print_figures(title: &str, stats: &DerivedSeries) {
    let (c, r, d) = stats.latest();
    println!("{title}");
    println!("  confirmed  {c}");
    println!("  recovered  {r}");
    println!("  deaths     {d}");
    println!("  active     {}", stats.active());
    if let Some(cfr) = stats.last_cfr_t() {
        println!("  CFR T={:<4} {cfr:.1}%", stats.lag);
    }
    if let Some(cfr) = stats.last_cfr_ddr() {
        println!("  CFR d/(d+r) {cfr:.1}%");
    }
    if let Some(time) = stats.last_updated {
        println!("  updated    {}", datetime_label(time));
    }
}

fn print_summary(dataset: &Dataset, aggregates: &AggregationResult, config: &StatsConfig, query: Option<&str>) {
    let title = config.country_to_display.as_deref().unwrap_or("Global");
    print_figures(title, &aggregates.global_stats);
    println!("  locations  {}", aggregates.listed.len());

    let Some(query) = query else {
        return;
    };
    let matches = resolve(query, &dataset.locations, aggregates, config);
    println!();
    match matches.derived(config) {
        Some(stats) => {
            let title = format!("{} ({} locations)", matches.scope.display_name(), matches.ids.len());
            print_figures(&title, &stats);
        }
        None => println!("No match for \"{}\"", query.trim()),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_query_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_query(),
        KeyCode::Esc => app.cancel_query(),
        KeyCode::Backspace => app.input_backspace(),
        KeyCode::Char(ch) => app.input_char(ch),
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.clear_selection(),

        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        KeyCode::Char('/') => app.begin_query(),
        KeyCode::Tab => app.next_plot_kind(),
        KeyCode::Char('t') => app.next_plot_type(),
        KeyCode::Char('o') => app.cycle_sort(),
        KeyCode::Char('O') => app.toggle_order(),

        KeyCode::Char('b') => app.map_renderer.toggle_basemap(),
        KeyCode::Char('c') => app.map_renderer.toggle_compact(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    dataset: Dataset,
    aggregates: AggregationResult,
    config: StatsConfig,
    renderer: MapRenderer,
    query: Option<String>,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(dataset, aggregates, config, renderer, size.width, size.height);
    if let Some(query) = query {
        app.run_query(&query, true);
    }

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match app.mode {
                    Mode::Query => handle_query_key(&mut app, key),
                    Mode::Normal => handle_key(&mut app, key),
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
