/// Braille Unicode canvas for terminal graphics.
/// Each character cell holds a 2x4 dot grid; cells map to U+2800..U+28FF.
#[derive(Clone)]
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<u8>,
}

/// Dot bit for a (x % 2, y % 4) position inside a cell
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

impl BrailleCanvas {
    /// Create a canvas of `width` x `height` characters
    /// (pixel resolution `width*2` x `height*4`).
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn pixel_width(&self) -> usize {
        self.width * 2
    }

    pub fn pixel_height(&self) -> usize {
        self.height * 4
    }

    /// Set a dot; out-of-range coordinates are ignored
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= DOT_BITS[x % 2][y % 4];
    }

    /// Set a dot using signed coordinates (negative values ignored)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        let (cx, cy) = (x / 2, y / 4);
        cx < self.width && cy < self.height && self.cells[cy * self.width + cx] & DOT_BITS[x % 2][y % 4] != 0
    }

    /// Non-empty cells as (column, row, glyph)
    pub fn glyphs(&self) -> impl Iterator<Item = (u16, u16, char)> + '_ {
        self.cells.iter().enumerate().filter(|(_, &b)| b != 0).map(move |(i, &b)| {
            let col = (i % self.width) as u16;
            let row = (i / self.width) as u16;
            (col, row, char::from_u32(0x2800 + b as u32).unwrap_or(' '))
        })
    }

    /// Whole canvas as text, one line per row
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| {
                row.iter()
                    .map(|&b| char::from_u32(0x2800 + b as u32).unwrap_or(' '))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠁");
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿");
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(4, 0);
        canvas.set_pixel_signed(-1, 2);
        assert_eq!(canvas.glyphs().count(), 0);
    }

    #[test]
    fn test_glyphs_skip_empty_cells() {
        let mut canvas = BrailleCanvas::new(3, 2);
        canvas.set_pixel(2, 5);
        assert!(canvas.is_set(2, 5));
        let glyphs: Vec<_> = canvas.glyphs().collect();
        assert_eq!(glyphs, vec![(1, 1, '⠂')]);
    }
}
