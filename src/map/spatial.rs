use super::projection::Bounds;
use std::collections::HashMap;

/// Bounding-box grid index over region features.
/// Each feature's bbox is inserted into every cell it overlaps, so a
/// query never misses a feature; false positives are removed by the
/// caller's exact polygon test.
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from feature bounding boxes, indexed by iteration order
    pub fn build(bboxes: impl Iterator<Item = Bounds>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Candidate features whose bbox cell contains the point, ascending
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate features overlapping `bounds`, sorted and deduplicated
    pub fn query_bounds(&self, bounds: Bounds) -> Vec<usize> {
        let (min_lon, min_lat, max_lon, max_lat) = bounds;
        let min_cell = self.to_cell(min_lon, min_lat);
        let max_cell = self.to_cell(max_lon, max_lat);

        let mut results = Vec::new();
        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results.sort_unstable();
        results.dedup();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_query_finds_overlapping_boxes() {
        let grid = FeatureGrid::build(
            [(107.0, -7.0, 107.4, -6.6), (107.3, -7.2, 108.0, -6.9)].into_iter(),
            0.25,
        );
        assert_eq!(grid.query_point(107.35, -6.95), &[0, 1]);
        assert_eq!(grid.query_point(107.9, -7.1), &[1]);
        assert!(grid.query_point(110.0, 0.0).is_empty());
    }

    #[test]
    fn test_bounds_query_dedups() {
        let grid = FeatureGrid::build([(0.0, 0.0, 2.0, 2.0), (5.0, 5.0, 6.0, 6.0)].into_iter(), 0.5);
        assert_eq!(grid.query_bounds((0.0, 0.0, 3.0, 3.0)), vec![0]);
        assert_eq!(grid.query_bounds((-1.0, -1.0, 7.0, 7.0)), vec![0, 1]);
    }
}
