use std::fmt::Display;

use anyhow::ensure;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::search::VisitMap;

/// A cell position on the grid, identified by (column, row).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub col: usize,
    pub row: usize,
}

impl Point {
    /// Manhattan distance `|dx| + |dy|` to another point.
    pub fn manhattan(self, other: Point) -> u32 {
        (self.col.abs_diff(other.col) + self.row.abs_diff(other.row)) as u32
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Wall,
    Start,
    End,
}

/// A single grid cell. The position never changes after grid construction;
/// `weight` is the cost of entering this cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub pos: Point,
    pub kind: CellKind,
    pub weight: u32,
}

/// Pixel dimensions and cell size from which the grid shape is derived.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub cell_size: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            cell_size: 25,
        }
    }
}

/// A rectangular grid of cells with precomputed four-directional adjacency
/// and exactly one start and one end cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    neighbors: Vec<Vec<usize>>,
    start: usize,
    end: usize,
}

impl Grid {
    /// Build a grid from pixel dimensions. Rows and columns are derived by
    /// floor division, so a boundary strip narrower than `cell_size` is
    /// silently unused. Start and end cells are drawn uniformly at random
    /// and may coincide.
    pub fn build(config: &GridConfig, rng: &mut impl Rng) -> anyhow::Result<Self> {
        ensure!(config.cell_size > 0, "cell size must be positive");

        let rows = (config.height / config.cell_size) as usize;
        let cols = (config.width / config.cell_size) as usize;
        ensure!(
            rows > 0 && cols > 0,
            "{}x{} pixels at cell size {} leaves no cells",
            config.width,
            config.height,
            config.cell_size
        );

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    pos: Point { col, row },
                    kind: CellKind::Empty,
                    weight: 1,
                });
            }
        }

        let mut grid = Self {
            rows,
            cols,
            cells,
            neighbors: Vec::new(),
            start: 0,
            end: 0,
        };
        grid.compute_adjacency();
        grid.pick_random_start_end(rng);

        log::debug!("built {}x{} grid", cols, rows);
        Ok(grid)
    }

    /// Precompute the adjacency list of every cell: in-bounds orthogonal
    /// neighbors in east, south, north, west order. Searches only read this.
    fn compute_adjacency(&mut self) {
        let mut neighbors = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            let Point { col, row } = cell.pos;
            let idx = row * self.cols + col;

            let mut adjacent = Vec::with_capacity(4);
            if col + 1 < self.cols {
                adjacent.push(idx + 1);
            }
            if row + 1 < self.rows {
                adjacent.push(idx + self.cols);
            }
            if row > 0 {
                adjacent.push(idx - self.cols);
            }
            if col > 0 {
                adjacent.push(idx - 1);
            }
            neighbors.push(adjacent);
        }
        self.neighbors = neighbors;
    }

    /// Draw new start and end positions, two independent uniform samples.
    /// The draws may coincide; the shared cell then keeps the `Start` kind.
    pub fn pick_random_start_end(&mut self, rng: &mut impl Rng) {
        self.cells[self.start].kind = CellKind::Empty;
        self.cells[self.end].kind = CellKind::Empty;

        self.start = self.index(Point {
            col: rng.gen_range(0..self.cols),
            row: rng.gen_range(0..self.rows),
        });
        self.end = self.index(Point {
            col: rng.gen_range(0..self.cols),
            row: rng.gen_range(0..self.rows),
        });

        self.cells[self.start].kind = CellKind::Start;
        if self.end != self.start {
            self.cells[self.end].kind = CellKind::End;
        }
    }

    /// Move the start marker to `pos`, replacing whatever was there.
    pub fn set_start(&mut self, pos: Point) {
        self.cells[self.start].kind = CellKind::Empty;
        self.start = self.index(pos);
        self.cells[self.start].kind = CellKind::Start;
    }

    /// Move the end marker to `pos`. If `pos` is the start cell the start
    /// marker takes precedence, matching the paint order of the two.
    pub fn set_end(&mut self, pos: Point) {
        if self.cells[self.end].kind == CellKind::End {
            self.cells[self.end].kind = CellKind::Empty;
        }
        self.end = self.index(pos);
        if self.end != self.start {
            self.cells[self.end].kind = CellKind::End;
        }
    }

    /// Place or erase a wall. A no-op on the start and end cells and on
    /// out-of-bounds positions.
    pub fn set_wall(&mut self, pos: Point, wall: bool) {
        let Some(idx) = self.checked_index(pos) else {
            return;
        };
        match self.cells[idx].kind {
            CellKind::Start | CellKind::End => {}
            _ => {
                self.cells[idx].kind = if wall { CellKind::Wall } else { CellKind::Empty };
            }
        }
    }

    /// Flip a cell between empty and wall. A no-op on start/end.
    pub fn toggle_wall(&mut self, pos: Point) {
        let Some(idx) = self.checked_index(pos) else {
            return;
        };
        match self.cells[idx].kind {
            CellKind::Empty => self.cells[idx].kind = CellKind::Wall,
            CellKind::Wall => self.cells[idx].kind = CellKind::Empty,
            CellKind::Start | CellKind::End => {}
        }
    }

    /// Set every cell's weight: 1 when `randomize` is false, otherwise a
    /// fresh uniform draw from 1..=20.
    pub fn reweight(&mut self, randomize: bool, rng: &mut impl Rng) {
        for cell in &mut self.cells {
            cell.weight = if randomize { rng.gen_range(1..=20) } else { 1 };
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Point) -> bool {
        pos.col < self.cols && pos.row < self.rows
    }

    /// Flat row-major index of an in-bounds position.
    pub fn index(&self, pos: Point) -> usize {
        debug_assert!(self.contains(pos));
        pos.row * self.cols + pos.col
    }

    pub fn checked_index(&self, pos: Point) -> Option<usize> {
        self.contains(pos).then(|| self.index(pos))
    }

    pub fn point(&self, idx: usize) -> Point {
        self.cells[idx].pos
    }

    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    pub fn cell_at(&self, pos: Point) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn start(&self) -> Point {
        self.cells[self.start].pos
    }

    pub fn end(&self) -> Point {
        self.cells[self.end].pos
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn end_index(&self) -> usize {
        self.end
    }

    pub fn neighbors_of(&self, idx: usize) -> &[usize] {
        &self.neighbors[idx]
    }

    /// Create transient per-search state sized for this grid.
    pub fn create_visit_map(&self) -> VisitMap {
        VisitMap::new(self.cells.len())
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = &self.cells[row * self.cols + col];
                let c = match cell.kind {
                    CellKind::Wall => '#',
                    CellKind::Start => 'S',
                    CellKind::End => 'E',
                    CellKind::Empty if cell.weight > 1 => '$',
                    CellKind::Empty => ' ',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
