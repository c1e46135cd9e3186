use crate::braille::BrailleCanvas;
use crate::join::{EnrichedBoundaries, FeatureRisk};
use crate::map::geometry::{contains_point, draw_line, fill_polygon, FillPattern};
use crate::map::projection::{Bounds, Viewport};
use crate::map::spatial::FeatureGrid;
use crate::region::{normalize, present, DisplayName, NormalizedKey};
use geojson::{Feature, JsonObject, Value};
use glam::DVec2;
use ratatui::style::Color;

/// Cluster fill colors, lowest risk first; higher clusters reuse the last
pub const PALETTE: [Color; 5] = [
    Color::Rgb(0x2e, 0xcc, 0x71),
    Color::Rgb(0xa3, 0xe6, 0x35),
    Color::Rgb(0xfa, 0xcc, 0x15),
    Color::Rgb(0xfb, 0x92, 0x3c),
    Color::Rgb(0xef, 0x44, 0x44),
];

/// Fill for regions without a risk record
pub const NO_DATA_COLOR: Color = Color::Rgb(0xcc, 0xcc, 0xcc);

/// Grid cell size for hit-testing, in degrees
const GRID_CELL_DEG: f64 = 0.1;

/// Palette slot for a cluster value
pub fn palette_index(cluster: u8) -> usize {
    (cluster as usize).min(PALETTE.len() - 1)
}

pub fn cluster_color(cluster: Option<u8>) -> Color {
    match cluster {
        Some(c) => PALETTE[palette_index(c)],
        None => NO_DATA_COLOR,
    }
}

/// One polygon as lon/lat rings (exterior first, then holes)
type Rings = Vec<Vec<DVec2>>;

/// A boundary feature prepared for drawing and hit-testing
#[derive(Clone)]
pub struct Region {
    pub key: NormalizedKey,
    pub display: DisplayName,
    pub risk: FeatureRisk,
    pub properties: JsonObject,
    polygons: Vec<Rings>,
    bounds: Bounds,
}

impl Region {
    fn from_feature(feature: &Feature) -> Option<Self> {
        let geometry = feature.geometry.as_ref()?;
        let to_ring = |ring: &Vec<Vec<f64>>| -> Vec<DVec2> {
            ring.iter()
                .filter(|c| c.len() >= 2)
                .map(|c| DVec2::new(c[0], c[1]))
                .collect()
        };

        let polygons: Vec<Rings> = match &geometry.value {
            Value::Polygon(rings) => vec![rings.iter().map(to_ring).collect()],
            Value::MultiPolygon(polys) => polys
                .iter()
                .map(|rings| rings.iter().map(to_ring).collect())
                .collect(),
            _ => return None,
        };

        let (min, max) = polygons.iter().flatten().flatten().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        if !min.x.is_finite() {
            return None;
        }

        let properties = feature.properties.clone().unwrap_or_default();
        let risk = FeatureRisk::from_properties(Some(&properties));
        Some(Self {
            key: normalize(&risk.display_name),
            display: present(&risk.display_name),
            risk,
            properties,
            polygons,
            bounds: (min.x, min.y, max.x, max.y),
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let (min_lon, min_lat, max_lon, max_lat) = self.bounds;
        if lon < min_lon || lon > max_lon || lat < min_lat || lat > max_lat {
            return false;
        }
        let point = DVec2::new(lon, lat);
        self.polygons.iter().any(|rings| contains_point(rings, point))
    }

    /// Center of the bounding box, used for labels
    pub fn label_anchor(&self) -> (f64, f64) {
        let (min_lon, min_lat, max_lon, max_lat) = self.bounds;
        ((min_lon + max_lon) / 2.0, (min_lat + max_lat) / 2.0)
    }

    fn projected(&self, viewport: &Viewport) -> Vec<Rings> {
        self.polygons
            .iter()
            .map(|rings| {
                rings
                    .iter()
                    .map(|ring| {
                        ring.iter()
                            .map(|p| {
                                let (x, y) = viewport.project_f(p.x, p.y);
                                DVec2::new(x, y)
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_fill: bool,
    pub show_borders: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_fill: true,
            show_borders: true,
            show_labels: false,
        }
    }
}

/// Rendered canvases, one per color, drawn back to front by the UI
pub struct MapLayers {
    /// Fill per palette slot
    pub clusters: Vec<BrailleCanvas>,
    pub no_data: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub hovered: BrailleCanvas,
    pub selected: BrailleCanvas,
    /// (column, row, text)
    pub labels: Vec<(u16, u16, String)>,
}

/// Choropleth of the enriched boundaries
pub struct MapRenderer {
    regions: Vec<Region>,
    grid: FeatureGrid,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new(enriched: &EnrichedBoundaries) -> Self {
        let regions: Vec<Region> = enriched
            .collection
            .features
            .iter()
            .filter_map(Region::from_feature)
            .collect();
        let grid = FeatureGrid::build(regions.iter().map(Region::bounds), GRID_CELL_DEG);
        Self {
            regions,
            grid,
            settings: DisplaySettings::default(),
        }
    }

    /// Replace the regions (after a re-join), keeping display settings
    pub fn rebuild(&mut self, enriched: &EnrichedBoundaries) {
        let settings = self.settings.clone();
        *self = Self::new(enriched);
        self.settings = settings;
    }

    pub fn toggle_fill(&mut self) {
        self.settings.show_fill = !self.settings.show_fill;
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn has_data(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Extent of all regions
    pub fn bounds(&self) -> Option<Bounds> {
        self.regions.iter().map(Region::bounds).reduce(|a, b| {
            (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
        })
    }

    /// First region containing the point
    pub fn hit_test(&self, lon: f64, lat: f64) -> Option<usize> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .copied()
            .find(|&idx| self.regions[idx].contains(lon, lat))
    }

    /// Rasterize all layers for a `width` x `height` character area
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        selected: Option<&NormalizedKey>,
        hovered: Option<usize>,
    ) -> MapLayers {
        let mut layers = MapLayers {
            clusters: vec![BrailleCanvas::new(width, height); PALETTE.len()],
            no_data: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            hovered: BrailleCanvas::new(width, height),
            selected: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        };

        let Some(extent) = self.bounds() else {
            return layers;
        };
        let (w, s, e, n) = viewport.visible_bounds();
        let visible = (w.max(extent.0), s.max(extent.1), e.min(extent.2), n.min(extent.3));
        if visible.0 > visible.2 || visible.1 > visible.3 {
            return layers;
        }

        for idx in self.grid.query_bounds(visible) {
            let region = &self.regions[idx];
            let projected = region.projected(viewport);

            if self.settings.show_fill {
                let (canvas, pattern) = match region.risk.cluster {
                    Some(c) => (&mut layers.clusters[palette_index(c)], FillPattern::Dense),
                    None => (&mut layers.no_data, FillPattern::Sparse),
                };
                for rings in &projected {
                    fill_polygon(canvas, rings, pattern);
                }
            }

            let outline = if selected == Some(&region.key) {
                Some(&mut layers.selected)
            } else if hovered == Some(idx) {
                Some(&mut layers.hovered)
            } else if self.settings.show_borders {
                Some(&mut layers.borders)
            } else {
                None
            };
            if let Some(canvas) = outline {
                for rings in &projected {
                    for ring in rings {
                        draw_ring(canvas, ring, viewport);
                    }
                }
            }

            if self.settings.show_labels {
                let (lon, lat) = region.label_anchor();
                let (px, py) = viewport.project(lon, lat);
                if px >= 0 && py >= 0 {
                    let name = region.risk.display_name.clone();
                    let col = ((px / 2) as u16).saturating_sub((name.chars().count() / 2) as u16);
                    layers.labels.push((col, (py / 4) as u16, name));
                }
            }
        }

        layers
    }
}

/// Outline a projected ring with viewport culling
fn draw_ring(canvas: &mut BrailleCanvas, ring: &[DVec2], viewport: &Viewport) {
    if ring.len() < 2 {
        return;
    }
    for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
        let p1 = (a.x as i32, a.y as i32);
        let p2 = (b.x as i32, b.y as i32);
        if viewport.line_might_be_visible(p1, p2) {
            draw_line(canvas, p1.0, p1.1, p2.0, p2.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::enrich;
    use crate::join::tests::{boundaries, risk};

    fn renderer() -> MapRenderer {
        let records = vec![risk("Kab. Bandung", 2, "Medium", 120.0), risk("Garut", 9, "Extreme", 80.0)];
        MapRenderer::new(&enrich(&boundaries(), &records))
    }

    #[test]
    fn test_regions_carry_keys_and_risk() {
        let r = renderer();
        assert_eq!(r.regions().len(), 3);
        assert_eq!(r.regions()[0].key.as_str(), "BANDUNG");
        assert_eq!(r.regions()[1].key.as_str(), "CITY BANDUNG");
        assert_eq!(r.regions()[1].display.as_str(), "CITY BANDUNG");
        assert_eq!(r.regions()[2].display.as_str(), "REGENCY GARUT");
        assert_eq!(r.regions()[1].risk.cluster, None);
    }

    #[test]
    fn test_hit_test() {
        let r = renderer();
        assert_eq!(r.hit_test(107.2, -6.5), Some(0));
        assert_eq!(r.hit_test(108.5, -7.2), Some(2));
        assert_eq!(r.hit_test(100.0, 0.0), None);
    }

    #[test]
    fn test_palette_clamps_high_clusters() {
        assert_eq!(cluster_color(Some(9)), PALETTE[4]);
        assert_eq!(cluster_color(Some(0)), PALETTE[0]);
        assert_eq!(cluster_color(None), NO_DATA_COLOR);
    }

    #[test]
    fn test_render_layers() {
        let r = renderer();
        let bounds = r.bounds().unwrap();
        let viewport = Viewport::fit(bounds, 80, 40);
        let selected = normalize("Garut");
        let layers = r.render(40, 10, &viewport, Some(&selected), None);

        assert!(layers.clusters[2].glyphs().count() > 0);
        assert!(layers.clusters[4].glyphs().count() > 0);
        assert!(layers.no_data.glyphs().count() > 0);
        assert!(layers.selected.glyphs().count() > 0);
        assert_eq!(layers.clusters[0].glyphs().count(), 0);
    }
}
