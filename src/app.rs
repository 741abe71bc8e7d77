use covid_map::plot::{Plot, PlotContext, PlotKind, PlotMenu};
use covid_map::stats::datetime_label;
use covid_map::{
    resolve, sort_summaries, AggregationResult, Dataset, DerivedSeries, Location, MatchSet, RegionSummary,
    SortKey, StatsConfig,
};
use ratatui::layout::Rect;
use tracing::info;

use crate::map::{LocationGrid, MapRenderer, Viewport};
use crate::ui;

/// Grid cell size for click picking, in degrees.
const PICK_CELL: f64 = 2.0;
/// How far from a symbol centre a click still selects it, in braille pixels.
const PICK_PIXELS: f64 = 6.0;

/// What the popup shows: the resolved query and its statistics.
pub struct Selection {
    pub query: String,
    pub matches: MatchSet,
    pub stats: Option<DerivedSeries>,
    pub menu: PlotMenu,
}

impl Selection {
    pub fn title(&self) -> String {
        let name = self.matches.scope.display_name();
        match self.matches.ids.len() {
            0 | 1 => name,
            n => format!("{name} ({n} locations)"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Typing into the query prompt.
    Query,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub dataset: Dataset,
    pub aggregates: AggregationResult,
    pub config: StatsConfig,
    grid: LocationGrid,
    /// Inner map area in terminal cells.
    pub map_area: Rect,
    pub selection: Option<Selection>,
    pub mode: Mode,
    pub input: String,
    pub global_menu: PlotMenu,
    pub sort_key: SortKey,
    pub descending: bool,
    /// Region list in display order.
    pub summaries: Vec<RegionSummary>,
    pub status: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    dragged: bool,
}

impl App {
    pub fn new(
        dataset: Dataset,
        aggregates: AggregationResult,
        config: StatsConfig,
        map_renderer: MapRenderer,
        width: u16,
        height: u16,
    ) -> Self {
        let map_area = ui::map_inner(Rect::new(0, 0, width, height));
        let viewport = Viewport::world(map_area.width as usize * 2, map_area.height as usize * 4);
        let grid = LocationGrid::build(
            aggregates.listed.iter().filter_map(|&id| dataset.get(id)),
            PICK_CELL,
        );

        let mut app = Self {
            viewport,
            map_renderer,
            dataset,
            summaries: aggregates.summaries.clone(),
            aggregates,
            config,
            grid,
            map_area,
            selection: None,
            mode: Mode::Normal,
            input: String::new(),
            global_menu: PlotMenu::new(&PlotKind::GLOBAL),
            sort_key: SortKey::default(),
            descending: true,
            status: None,
            should_quit: false,
            last_mouse: None,
            dragged: false,
        };
        app.resort();
        app.reset_view();
        app
    }

    /// World zoom centred on the location with the most active cases.
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::world(self.viewport.width, self.viewport.height);
        if let Some(location) = self.aggregates.max_active.and_then(|id| self.dataset.get(id)) {
            self.viewport.center_on(location.lon, location.lat);
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = ui::map_inner(Rect::new(0, 0, width, height));
        self.viewport.width = self.map_area.width as usize * 2;
        self.viewport.height = self.map_area.height as usize * 4;
    }

    /// Terminal cell to braille pixel inside the map, `None` outside it.
    fn to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        let inside = col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height;
        inside.then(|| (((col - area.x) as i32) * 2, ((row - area.y) as i32) * 4))
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = last_col as i32 - col as i32;
            let dy = last_row as i32 - row as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((col, row));
    }

    /// A release without a drag in between is a click.
    pub fn mouse_up(&mut self, col: u16, row: u16) {
        if !self.dragged {
            self.select_at(col, row);
        }
        self.last_mouse = None;
        self.dragged = false;
    }

    /// Select the listed location nearest to a click on the map.
    pub fn select_at(&mut self, col: u16, row: u16) {
        let Some((px, py)) = self.to_pixel(col, row) else {
            return;
        };
        let (lon, lat) = self.viewport.unproject(px, py);
        let degrees_per_pixel = 360.0 / (self.viewport.zoom * self.viewport.width.max(1) as f64);
        match self.grid.nearest(lon, lat, PICK_PIXELS * degrees_per_pixel) {
            Some(id) => self.run_query(&(id + 1).to_string(), false),
            None => self.clear_selection(),
        }
    }

    /// Resolve `raw` and show the result; `fit` moves the map to the matches.
    pub fn run_query(&mut self, raw: &str, fit: bool) {
        let matches = resolve(raw, &self.dataset.locations, &self.aggregates, &self.config);
        if matches.is_empty() {
            self.selection = None;
            self.status = (!raw.trim().is_empty()).then(|| format!("No match for \"{}\"", raw.trim()));
            return;
        }

        if fit {
            self.fit_to(&matches);
        }
        let stats = matches.derived(&self.config);
        info!(query = raw, locations = matches.ids.len(), "selected");
        self.status = None;
        self.selection = Some(Selection {
            query: raw.trim().to_string(),
            matches,
            stats,
            menu: PlotMenu::new(&PlotKind::POPUP),
        });
    }

    fn fit_to(&mut self, matches: &MatchSet) {
        let mut points = matches
            .ids
            .iter()
            .filter_map(|&id| self.dataset.get(id))
            .map(|location| (location.lon, location.lat));
        let Some(first) = points.next() else {
            return;
        };
        let (min, max) = points.fold((first, first), |(min, max), (lon, lat)| {
            ((min.0.min(lon), min.1.min(lat)), (max.0.max(lon), max.1.max(lat)))
        });
        self.viewport.fit_bounds(min, max);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.status = None;
    }

    pub fn begin_query(&mut self) {
        self.mode = Mode::Query;
        self.input = self
            .selection
            .as_ref()
            .map(|selection| selection.query.clone())
            .unwrap_or_default();
    }

    pub fn input_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn input_backspace(&mut self) {
        self.input.pop();
    }

    pub fn submit_query(&mut self) {
        self.mode = Mode::Normal;
        let raw = std::mem::take(&mut self.input);
        self.run_query(&raw, true);
    }

    pub fn cancel_query(&mut self) {
        self.mode = Mode::Normal;
        self.input.clear();
    }

    /// Sort the region list by the next column.
    pub fn cycle_sort(&mut self) {
        self.sort_key = self.sort_key.next();
        self.resort();
    }

    pub fn toggle_order(&mut self) {
        self.descending = !self.descending;
        self.resort();
    }

    fn resort(&mut self) {
        sort_summaries(&mut self.summaries, self.sort_key, self.descending);
    }

    /// The menu the plot keys act on: the popup's if something is selected.
    fn menu_mut(&mut self) -> &mut PlotMenu {
        match &mut self.selection {
            Some(selection) => &mut selection.menu,
            None => &mut self.global_menu,
        }
    }

    pub fn next_plot_kind(&mut self) {
        self.menu_mut().next_kind();
    }

    pub fn next_plot_type(&mut self) {
        self.menu_mut().next_type();
    }

    /// Chart for the selection, or the global panel without one.
    pub fn active_plot(&self) -> Option<Plot> {
        match &self.selection {
            Some(selection) => {
                let stats = selection.stats.as_ref()?;
                let no_regions = Default::default();
                selection.menu.build(&PlotContext {
                    stats,
                    regions: &no_regions,
                })
            }
            None => self.global_menu.build(&PlotContext {
                stats: &self.aggregates.global_stats,
                regions: &self.aggregates.regions,
            }),
        }
    }

    /// Listed locations, drawn on the map.
    pub fn listed(&self) -> impl Iterator<Item = &Location> {
        self.aggregates.listed.iter().filter_map(|&id| self.dataset.get(id))
    }

    pub fn highlighted(&self) -> Vec<&Location> {
        self.selection
            .iter()
            .flat_map(|selection| selection.matches.ids.iter())
            .filter_map(|&id| self.dataset.get(id))
            .collect()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn last_updated(&self) -> Option<String> {
        self.aggregates.global.last_updated.map(datetime_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covid_map::{build_aggregates, Labels, Series};

    fn location(id: usize, labels: Labels, lon: f64, lat: f64, confirmed: u64) -> Location {
        let mut series = Series::default();
        series.push(0, confirmed / 2, 0, 0);
        series.push(86_400, confirmed, confirmed / 4, confirmed / 20);
        Location {
            id,
            feature_id: Some(id as i64),
            labels,
            lon,
            lat,
            series,
        }
    }

    fn app() -> App {
        let dataset = Dataset {
            locations: vec![
                location(0, Labels::new("Italy", None, None), 12.5, 41.9, 2000),
                location(1, Labels::new("France", None, None), 2.35, 48.85, 1000),
                location(2, Labels::new("Spain", None, None), -3.7, 40.4, 0),
            ],
        };
        let config = StatsConfig::default();
        let aggregates = build_aggregates(&dataset.locations, &config);
        App::new(dataset, aggregates, config, MapRenderer::new(Vec::new()), 120, 40)
    }

    #[test]
    fn test_starts_centred_on_most_active() {
        let mut app = app();
        assert_eq!(app.viewport.center_lon, 12.5);
        assert_eq!(app.summaries[0].name, "Italy");

        app.zoom_in();
        app.pan(30, 0);
        app.reset_view();
        assert_eq!(app.viewport.zoom, 1.0);
        assert_eq!(app.viewport.center_lon, 12.5);
    }

    #[test]
    fn test_query_selects_and_fits() {
        let mut app = app();
        app.begin_query();
        for ch in "France".chars() {
            app.input_char(ch);
        }
        app.submit_query();
        let selection = app.selection.as_ref().unwrap();
        assert_eq!(selection.matches.ids, vec![1]);
        assert_eq!(selection.title(), "France");
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.viewport.center_lon, 2.35);
        assert_eq!(app.highlighted().len(), 1);
    }

    #[test]
    fn test_unmatched_query_reports_status() {
        let mut app = app();
        app.run_query("Spain", true);
        assert!(app.selection.is_none());
        assert_eq!(app.status.as_deref(), Some("No match for \"Spain\""));
    }

    #[test]
    fn test_click_selects_nearest_location() {
        let mut app = app();
        let (px, py) = app.viewport.project(12.5, 41.9);
        let col = app.map_area.x + (px / 2) as u16;
        let row = app.map_area.y + (py / 4) as u16;
        app.mouse_down(col, row);
        app.mouse_up(col, row);
        let selection = app.selection.as_ref().unwrap();
        assert_eq!(selection.matches.ids, vec![0]);
    }

    #[test]
    fn test_plot_keys_follow_selection() {
        let mut app = app();
        app.next_plot_kind();
        assert_eq!(app.global_menu.active(), Some((PlotKind::Increase, 1)));
        app.run_query("Italy", false);
        app.next_plot_type();
        let selection = app.selection.as_ref().unwrap();
        assert_eq!(selection.menu.active(), Some((PlotKind::Cumulative, 2)));
        assert_eq!(app.active_plot().unwrap().kind, PlotKind::Cumulative);
    }

    #[test]
    fn test_sort_cycle() {
        let mut app = app();
        app.toggle_order();
        assert_eq!(app.summaries[0].name, "France");
        app.cycle_sort();
        assert_eq!(app.sort_key, SortKey::Recovered);
    }
}
