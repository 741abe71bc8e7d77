mod basemap;
mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use basemap::load_basemap;
pub use projection::Viewport;
pub use renderer::{MapLayers, MapRenderer, Shade};
pub use spatial::LocationGrid;
