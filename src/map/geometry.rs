use crate::braille::BrailleCanvas;
use glam::DVec2;

/// Dot density used when filling a polygon
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillPattern {
    /// Every pixel
    Solid,
    /// Checkerboard, lets outlines stay readable
    Dense,
    /// One dot in eight, for regions without data
    Sparse,
}

impl FillPattern {
    #[inline(always)]
    fn covers(self, x: usize, y: usize) -> bool {
        match self {
            FillPattern::Solid => true,
            FillPattern::Dense => (x + y) % 2 == 0,
            FillPattern::Sparse => x % 2 == 0 && y % 4 == 0,
        }
    }
}

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Scanline-fill a polygon given in pixel space (exterior ring plus holes,
/// even-odd rule). Only rows and columns inside the canvas are touched.
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[Vec<DVec2>], pattern: FillPattern) {
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if !min_y.is_finite() {
        return;
    }

    let height = canvas.pixel_height() as f64;
    let width = canvas.pixel_width() as f64;
    let row_start = min_y.max(0.0).floor() as usize;
    let row_end = max_y.min(height - 1.0).ceil().max(0.0) as usize;

    let mut crossings: Vec<f64> = Vec::new();
    for y in row_start..=row_end {
        // Sample through the pixel center
        let sy = y as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
                if (a.y <= sy) != (b.y <= sy) {
                    let t = (sy - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().max(0.0);
            let end = (span[1] - 0.5).floor().min(width - 1.0);
            if end < start {
                continue;
            }
            for x in start as usize..=end as usize {
                if pattern.covers(x, y) {
                    canvas.set_pixel(x, y);
                }
            }
        }
    }
}

/// Even-odd point-in-polygon test over an exterior ring and its holes
pub fn contains_point(rings: &[Vec<DVec2>], point: DVec2) -> bool {
    let mut inside = false;
    for ring in rings {
        for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
            if (a.y > point.y) != (b.y > point.y) {
                let x = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if point.x < x {
                    inside = !inside;
                }
            }
        }
    }
    inside
}
