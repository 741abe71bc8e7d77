use std::collections::HashMap;

use covid_map::{Location, LocationId};

/// Hash grid of location points in lon/lat degrees, used to pick the
/// location under the mouse.
pub struct LocationGrid {
    cells: HashMap<(i32, i32), Vec<(LocationId, f64, f64)>>,
    cell_size: f64,
}

impl LocationGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    pub fn build<'a>(locations: impl IntoIterator<Item = &'a Location>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for location in locations {
            grid.insert(location.id, location.lon, location.lat);
        }
        grid
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        (
            (lon / self.cell_size).floor() as i32,
            (lat / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: LocationId, lon: f64, lat: f64) {
        let cell = self.to_cell(lon, lat);
        self.cells.entry(cell).or_default().push((id, lon, lat));
    }

    /// Points in the cells overlapping a square of half-side `radius`.
    pub fn query_radius(&self, lon: f64, lat: f64, radius: f64) -> impl Iterator<Item = &(LocationId, f64, f64)> {
        let (cx, cy) = self.to_cell(lon, lat);
        let reach = (radius / self.cell_size).ceil() as i32;
        (-reach..=reach)
            .flat_map(move |dy| (-reach..=reach).map(move |dx| (cx + dx, cy + dy)))
            .filter_map(move |cell| self.cells.get(&cell))
            .flatten()
    }

    /// Closest point within `radius` degrees; ties go to the lower id.
    pub fn nearest(&self, lon: f64, lat: f64, radius: f64) -> Option<LocationId> {
        self.query_radius(lon, lat, radius)
            .map(|&(id, plon, plat)| {
                let d2 = (plon - lon).powi(2) + (plat - lat).powi(2);
                (id, d2)
            })
            .filter(|&(_, d2)| d2 <= radius * radius)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }
}
