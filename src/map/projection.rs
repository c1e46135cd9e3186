use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 5000.0;
const ZOOM_STEP: f64 = 1.5;
const MAX_LAT: f64 = 85.0;

/// Normalized Web Mercator x in [0, 1]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized Web Mercator y in [0, 1], north at 0
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Geographic extent as (min_lon, min_lat, max_lon, max_lat)
pub type Bounds = (f64, f64, f64, f64);

/// Viewport for the map, in braille pixel space
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude
    pub center_lon: f64,
    /// Center latitude
    pub center_lat: f64,
    /// Zoom level (1.0 = whole world across the width)
    pub zoom: f64,
    /// Pixel width
    pub width: usize,
    /// Pixel height
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

    /// Center on `bounds` with the largest zoom that keeps them in view
    /// (with a small margin).
    pub fn fit(bounds: Bounds, width: usize, height: usize) -> Self {
        let (min_lon, min_lat, max_lon, max_lat) = bounds;
        let x0 = mercator_x(min_lon);
        let x1 = mercator_x(max_lon);
        let y0 = mercator_y(max_lat);
        let y1 = mercator_y(min_lat);

        let w = width.max(1) as f64;
        let h = height.max(1) as f64;
        let zoom_x = 0.9 / (x1 - x0).max(1e-9);
        let zoom_y = 0.9 * h / ((y1 - y0).max(1e-9) * w);

        Self::new(
            (min_lon + max_lon) / 2.0,
            inverse_mercator_y((y0 + y1) / 2.0),
            zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        )
    }

    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    /// Pan by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        if scale <= 0.0 {
            return;
        }
        let x = mercator_x(self.center_lon) + dx as f64 / scale;
        let y = mercator_y(self.center_lat) + dy as f64 / scale;

        self.center_lon = x * 360.0 - 180.0;
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = inverse_mercator_y(y).clamp(-MAX_LAT, MAX_LAT);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zoom in keeping the point under (px, py) fixed
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    /// Zoom out keeping the point under (px, py) fixed
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Pan so the same point lands back under the cursor
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Pixel coordinates back to (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        self.unproject_f(px as f64, py as f64)
    }

    /// Sub-pixel variant of [`Viewport::unproject`]
    pub fn unproject_f(&self, px: f64, py: f64) -> (f64, f64) {
        let scale = self.scale();
        let x = (px - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);
        (x * 360.0 - 180.0, inverse_mercator_y(y))
    }

    /// Project (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = self.project_f(lon, lat);
        (x as i32, y as i32)
    }

    /// Sub-pixel projection, used for polygon fills
    pub fn project_f(&self, lon: f64, lat: f64) -> (f64, f64) {
        let scale = self.scale();
        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;
        (px, py)
    }

    /// Rough bounding-box visibility test for a segment
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }

    /// Geographic extent currently on screen
    pub fn visible_bounds(&self) -> Bounds {
        let (west, north) = self.unproject_f(0.0, 0.0);
        let (east, south) = self.unproject_f(self.width as f64, self.height as f64);
        (west, south, east, north)
    }
}
