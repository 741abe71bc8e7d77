use covid_map::symbology::{Symbol, MAX_OPACITY, MIN_OPACITY};
use covid_map::Location;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_disc, draw_line, draw_ring};
use crate::map::projection::Viewport;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Opacity bucket of a confirmed circle. Terminals have no alpha, so each
/// bucket gets its own colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shade {
    Faint,
    Medium,
    Strong,
}

impl Shade {
    pub const ALL: [Shade; 3] = [Shade::Faint, Shade::Medium, Shade::Strong];

    pub fn from_opacity(opacity: f64) -> Self {
        let t = (opacity - MIN_OPACITY) / (MAX_OPACITY - MIN_OPACITY);
        if t < 1.0 / 3.0 {
            Shade::Faint
        } else if t < 2.0 / 3.0 {
            Shade::Medium
        } else {
            Shade::Strong
        }
    }

    fn index(self) -> usize {
        match self {
            Shade::Faint => 0,
            Shade::Medium => 1,
            Shade::Strong => 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_basemap: bool,
    /// Half-size symbols.
    pub compact: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            compact: false,
            show_labels: true,
        }
    }
}

/// Rendered layers, back to front.
pub struct MapLayers {
    pub basemap: BrailleCanvas,
    /// Confirmed circles, one canvas per [`Shade`].
    pub confirmed: [BrailleCanvas; 3],
    pub recovered: BrailleCanvas,
    pub deaths: BrailleCanvas,
    pub highlight: BrailleCanvas,
    /// `(column, row, text)` in character cells.
    pub labels: Vec<(u16, u16, String)>,
}

impl MapLayers {
    fn new(width: usize, height: usize) -> Self {
        let canvas = || BrailleCanvas::new(width, height);
        Self {
            basemap: canvas(),
            confirmed: [canvas(), canvas(), canvas()],
            recovered: canvas(),
            deaths: canvas(),
            highlight: canvas(),
            labels: Vec::new(),
        }
    }

    pub fn confirmed(&self, shade: Shade) -> &BrailleCanvas {
        &self.confirmed[shade.index()]
    }
}

/// Labels are only drawn for small highlight sets.
const MAX_LABELS: usize = 12;

/// Draws the case symbols of every listed location over an optional
/// coastline basemap.
pub struct MapRenderer {
    basemap: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new(basemap: Vec<LineString>) -> Self {
        Self {
            basemap,
            settings: DisplaySettings::default(),
        }
    }

    pub fn has_basemap(&self) -> bool {
        !self.basemap.is_empty()
    }

    pub fn toggle_basemap(&mut self) {
        self.settings.show_basemap = !self.settings.show_basemap;
    }

    pub fn toggle_compact(&mut self) {
        self.settings.compact = !self.settings.compact;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Render `locations` into a `width` x `height` character grid;
    /// `highlighted` get an outline at their confirmed radius.
    pub fn render<'a>(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        locations: impl IntoIterator<Item = &'a Location>,
        highlighted: &[&Location],
    ) -> MapLayers {
        let mut layers = MapLayers::new(width, height);

        if self.settings.show_basemap {
            for line in &self.basemap {
                draw_linestring(&mut layers.basemap, line, viewport);
            }
        }

        for location in locations {
            let Some((center, symbol)) = self.place(location, viewport) else {
                continue;
            };
            let shade = Shade::from_opacity(symbol.opacity);
            draw_ring(&mut layers.confirmed[shade.index()], center, pixel_radius(symbol.confirmed_radius));
            if symbol.recovered_radius >= 1.0 {
                draw_ring(&mut layers.recovered, center, pixel_radius(symbol.recovered_radius));
            }
            if symbol.deaths_radius >= 1.0 {
                draw_disc(&mut layers.deaths, center, pixel_radius(symbol.deaths_radius));
            }
        }

        let label = self.settings.show_labels && highlighted.len() <= MAX_LABELS;
        for location in highlighted {
            let Some((center, symbol)) = self.place(location, viewport) else {
                continue;
            };
            let radius = pixel_radius(symbol.confirmed_radius);
            draw_ring(&mut layers.highlight, center, radius + 1);

            let (px, py) = (center.0 + radius + 2, center.1);
            if label && px >= 0 && py >= 0 {
                layers
                    .labels
                    .push(((px / 2) as u16, (py / 4) as u16, location.labels.display_name()));
            }
        }

        layers
    }

    /// Projected centre and symbol, `None` off screen or without cases.
    fn place(&self, location: &Location, viewport: &Viewport) -> Option<((i32, i32), Symbol)> {
        let (c, r, d) = location.latest();
        let symbol = Symbol::for_counts(c, r, d, viewport.zoom, self.settings.compact)?;
        let center = viewport.project(location.lon, location.lat);
        let margin = pixel_radius(symbol.confirmed_radius) + 1;
        viewport.is_visible(center, margin).then_some((center, symbol))
    }
}

fn pixel_radius(radius: f64) -> i32 {
    (radius.round() as i32).max(1)
}

/// Draw `line` skipping segments that wrap the antimeridian or lie off
/// screen.
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    let mut prev: Option<(i32, i32)> = None;
    for &(lon, lat) in line {
        let point = viewport.project(lon, lat);
        if let Some(prev) = prev {
            let jump = ((point.0 - prev.0).abs() + (point.1 - prev.1).abs()) as usize;
            if jump < viewport.width && viewport.segment_might_be_visible(prev, point) {
                draw_line(canvas, prev, point);
            }
        }
        prev = Some(point);
    }
}
