use std::f64::consts::PI;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 100.0;
/// Closest zoom `fit_bounds` will pick, so a single point keeps some context.
const FIT_MAX_ZOOM: f64 = 12.0;
const ZOOM_STEP: f64 = 1.5;
const MAX_LAT: f64 = 85.0;

/// Web Mercator x in `[0, 1]`.
#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Web Mercator y, 0 at the north edge.
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Visible map area in braille pixels. `zoom` 1 fits the whole world into
/// the canvas width.
#[derive(Clone, Debug)]
pub struct Viewport {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        let step = 360.0 / self.scale();
        self.center_lon += dx as f64 * step;
        self.center_lat -= dy as f64 * step * 0.5;
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = self.center_lat.clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    /// Zoom by `factor` keeping the point under `(px, py)` in place.
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let scale = self.scale();
        let x = mercator_x(lon) - (px as f64 - self.width as f64 / 2.0) / scale;
        let y = mercator_y(lat) - (py as f64 - self.height as f64 / 2.0) / scale;
        self.center_lon = x * 360.0 - 180.0;
        self.center_lat = inverse_mercator_y(y).clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn center_on(&mut self, lon: f64, lat: f64) {
        self.center_lon = lon;
        self.center_lat = lat.clamp(-MAX_LAT, MAX_LAT);
    }

    /// Centre on the box and pick the largest zoom that keeps it visible.
    pub fn fit_bounds(&mut self, min: (f64, f64), max: (f64, f64)) {
        let (x0, x1) = (mercator_x(min.0), mercator_x(max.0));
        let (y0, y1) = (mercator_y(max.1), mercator_y(min.1));
        self.center_lon = (min.0 + max.0) / 2.0;
        self.center_lat = inverse_mercator_y((y0 + y1) / 2.0);

        let width = self.width.max(1) as f64;
        let height = self.height.max(1) as f64;
        let fit_x = if x1 > x0 { 1.0 / (x1 - x0) } else { f64::INFINITY };
        let fit_y = if y1 > y0 {
            height / (width * (y1 - y0))
        } else {
            f64::INFINITY
        };
        // Leave a margin around the box.
        self.zoom = (fit_x.min(fit_y) * 0.8).clamp(MIN_ZOOM, FIT_MAX_ZOOM);
    }

    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.scale();
        let x = (px as f64 - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py as f64 - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);
        (x * 360.0 - 180.0, inverse_mercator_y(y))
    }

    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.scale();
        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;
        (px.round() as i32, py.round() as i32)
    }

    /// Inside the canvas, with `margin` pixels of slack on every side.
    pub fn is_visible(&self, (px, py): (i32, i32), margin: i32) -> bool {
        px >= -margin
            && px < self.width as i32 + margin
            && py >= -margin
            && py < self.height as i32 + margin
    }

    /// Rough bounding-box test for a segment.
    pub fn segment_might_be_visible(&self, a: (i32, i32), b: (i32, i32)) -> bool {
        a.0.max(b.0) >= 0
            && a.0.min(b.0) < self.width as i32
            && a.1.max(b.1) >= 0
            && a.1.min(b.1) < self.height as i32
    }
}
