pub mod geometry;
pub mod projection;
pub mod renderer;
pub mod spatial;

pub use projection::{Bounds, Viewport};
pub use renderer::{cluster_color, DisplaySettings, MapLayers, MapRenderer, Region, NO_DATA_COLOR, PALETTE};
