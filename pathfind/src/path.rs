use crate::grid::{Grid, Point};
use crate::search::VisitMap;

/// An ordered start-to-end sequence of cells plus the sum of their weights
/// (both endpoints included). An empty sequence means no path was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    pub cells: Vec<Point>,
    pub total_weight: u32,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Walk the predecessor chain backward from `end` to the start
    /// sentinel, accumulating each cell's weight, then reverse so the
    /// result reads start-to-end. Returns an empty path if the end cell
    /// was never reached; the lookup is guarded before the walk begins.
    pub fn reconstruct(visit: &VisitMap, grid: &Grid, end: Point) -> Self {
        let Some(end_idx) = grid.checked_index(end) else {
            return Self::default();
        };
        if !visit.is_seen(end_idx) {
            return Self::default();
        }

        let mut cells = Vec::new();
        let mut total_weight = 0u32;
        let mut current = end_idx;
        loop {
            cells.push(grid.point(current));
            total_weight += grid.cell(current).weight;
            match visit.parent(current) {
                Some(parent) => current = parent,
                None => break, // the start sentinel
            }
        }
        cells.reverse();

        Self {
            cells,
            total_weight,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::GridConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_3x3() -> Grid {
        let mut rng = StdRng::seed_from_u64(1);
        let config = GridConfig {
            width: 3,
            height: 3,
            cell_size: 1,
        };
        let mut grid = Grid::build(&config, &mut rng).unwrap();
        grid.set_start(Point { col: 0, row: 0 });
        grid.set_end(Point { col: 2, row: 2 });
        grid
    }

    #[test]
    fn unreached_end_reconstructs_to_empty_path() {
        let grid = grid_3x3();
        let visit = grid.create_visit_map();

        let path = Path::reconstruct(&visit, &grid, grid.end());
        assert!(path.is_empty());
        assert_eq!(path.total_weight, 0);
    }

    #[test]
    fn out_of_bounds_end_reconstructs_to_empty_path() {
        let grid = grid_3x3();
        let visit = grid.create_visit_map();

        let path = Path::reconstruct(&visit, &grid, Point { col: 10, row: 10 });
        assert!(path.is_empty());
    }
}
