use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::grid::{CellKind, Grid, Point};
use crate::path::Path;

/// Sentinel tentative distance for cells no search has reached yet.
pub const UNREACHABLE: u32 = u32::MAX;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Algorithm {
    Bfs,
    Dfs,
    Dijkstra,
    AStar,
}

impl Algorithm {
    pub fn all() -> [Algorithm; 4] {
        [
            Algorithm::Bfs,
            Algorithm::Dfs,
            Algorithm::Dijkstra,
            Algorithm::AStar,
        ]
    }

    /// Short lowercase identifier, usable in file names.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Dfs => "dfs",
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::AStar => "astar",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Algorithm::Bfs => "BFS",
            Algorithm::Dfs => "DFS",
            Algorithm::Dijkstra => "Dijkstra",
            Algorithm::AStar => "A*",
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum VisitState {
    #[default]
    Unvisited,
    Frontier,
    Visited,
}

/// Per-search transient state, keyed by flat cell index: tentative
/// distances, visit states for rendering, and the predecessor map.
/// Reusable across searches via [`VisitMap::reset`].
#[derive(Debug, Clone)]
pub struct VisitMap {
    distance: Vec<u32>,
    state: Vec<VisitState>,
    parent: Vec<Option<usize>>,
}

impl VisitMap {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            distance: vec![UNREACHABLE; len],
            state: vec![VisitState::Unvisited; len],
            parent: vec![None; len],
        }
    }

    /// Return every cell to unvisited with an infinite tentative distance.
    /// Idempotent.
    pub fn reset(&mut self) {
        self.distance.fill(UNREACHABLE);
        self.state.fill(VisitState::Unvisited);
        self.parent.fill(None);
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn distance(&self, idx: usize) -> u32 {
        self.distance[idx]
    }

    pub fn state(&self, idx: usize) -> VisitState {
        self.state[idx]
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parent[idx]
    }

    /// Whether a search has discovered this cell at all.
    pub fn is_seen(&self, idx: usize) -> bool {
        self.state[idx] != VisitState::Unvisited
    }

    pub fn visited_count(&self) -> usize {
        self.state
            .iter()
            .filter(|&&s| s == VisitState::Visited)
            .count()
    }

    fn record(&mut self, idx: usize, distance: u32, parent: Option<usize>) {
        self.distance[idx] = distance;
        self.parent[idx] = parent;
        self.state[idx] = VisitState::Frontier;
    }

    fn settle(&mut self, idx: usize) {
        self.state[idx] = VisitState::Visited;
    }

    /// Render the tentative distances as a grid of numbers.
    pub fn display<'a>(&'a self, grid: &'a Grid) -> VisitMapDisplay<'a> {
        VisitMapDisplay { map: self, grid }
    }
}

pub struct VisitMapDisplay<'a> {
    map: &'a VisitMap,
    grid: &'a Grid,
}

impl Display for VisitMapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.grid.rows() {
            for col in 0..self.grid.cols() {
                let idx = self.grid.index(Point { col, row });
                match self.map.distance(idx) {
                    UNREACHABLE => write!(f, "  . ")?,
                    d => write!(f, "{:03} ", d)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Shared flag for aborting a search from outside. Checked at every step
/// boundary, so cancellation never leaves a step half-applied.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Relaxed)
    }
}

/// Entry in the priority frontier. Ordered by priority, then by insertion
/// sequence so that ties pop in FIFO order regardless of heap internals.
#[derive(Debug)]
struct HeapEntry {
    priority: u32,
    seq: u64,
    index: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.seq.cmp(&other.seq))
            .reverse() // reverse for BinaryHeap to be a min-heap
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

#[derive(Debug)]
enum Frontier {
    Fifo(VecDeque<usize>),
    Lifo(Vec<usize>),
    Priority { heap: BinaryHeap<HeapEntry>, seq: u64 },
}

impl Frontier {
    fn for_algorithm(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Bfs => Frontier::Fifo(VecDeque::new()),
            Algorithm::Dfs => Frontier::Lifo(Vec::new()),
            Algorithm::Dijkstra | Algorithm::AStar => Frontier::Priority {
                heap: BinaryHeap::new(),
                seq: 0,
            },
        }
    }

    fn push(&mut self, index: usize, priority: u32) {
        match self {
            Frontier::Fifo(queue) => queue.push_back(index),
            Frontier::Lifo(stack) => stack.push(index),
            Frontier::Priority { heap, seq } => {
                heap.push(HeapEntry {
                    priority,
                    seq: *seq,
                    index,
                });
                *seq += 1;
            }
        }
    }

    fn pop(&mut self) -> Option<usize> {
        match self {
            Frontier::Fifo(queue) => queue.pop_front(),
            Frontier::Lifo(stack) => stack.pop(),
            Frontier::Priority { heap, .. } => heap.pop().map(|e| e.index),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SearchStatus {
    Running,
    Found,
    Exhausted,
    Cancelled,
}

/// What changed during one step: the cell that was expanded (if any) and
/// every (cell, new visit state) transition, in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct StepEvent {
    pub expanded: Option<Point>,
    pub changed: Vec<(Point, VisitState)>,
}

/// One incremental search over a grid. Each [`Search::step`] expands a
/// single cell and relaxes all of its edges, so a rendering loop can draw
/// a frame between steps without owning any algorithm logic.
#[derive(Debug)]
pub struct Search {
    algorithm: Algorithm,
    start: usize,
    end: usize,
    frontier: Frontier,
    visit: VisitMap,
    settled: Vec<bool>,
    status: SearchStatus,
    found: bool,
    cancel: CancelToken,
    last_step: StepEvent,
}

impl Search {
    pub fn new(algorithm: Algorithm, grid: &Grid, mut visit: VisitMap, cancel: CancelToken) -> Self {
        assert_eq!(visit.len(), grid.len(), "visit map sized for another grid");
        visit.reset();

        let start = grid.start_index();
        visit.record(start, 0, None);

        let mut frontier = Frontier::for_algorithm(algorithm);
        frontier.push(start, 0);

        Self {
            algorithm,
            start,
            end: grid.end_index(),
            frontier,
            visit,
            settled: vec![false; grid.len()],
            status: SearchStatus::Running,
            found: false,
            cancel,
            last_step: StepEvent::default(),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn visit_map(&self) -> &VisitMap {
        &self.visit
    }

    /// Snapshot of the most recent step.
    pub fn last_step(&self) -> &StepEvent {
        &self.last_step
    }

    /// Expand one cell: pop it from the frontier, mark it visited, and
    /// relax every non-wall neighbor. The search latches `Found` as soon
    /// as a relaxation touches the end cell; the frontier is never drained
    /// to completion after that.
    pub fn step(&mut self, grid: &Grid) -> SearchStatus {
        self.last_step = StepEvent::default();

        if self.status != SearchStatus::Running {
            return self.status;
        }
        if self.cancel.is_cancelled() {
            self.status = SearchStatus::Cancelled;
            debug!("{} search cancelled", self.algorithm);
            return self.status;
        }

        let Some(current) = self.frontier.pop() else {
            self.status = SearchStatus::Exhausted;
            debug!("{} search exhausted the frontier", self.algorithm);
            return self.status;
        };

        // A cell can sit in the priority frontier several times under
        // different tentative distances. Once settled, stale entries are
        // dropped, never reprocessed.
        if self.settled[current] {
            return self.status;
        }
        self.settled[current] = true;
        self.visit.settle(current);
        self.last_step.expanded = Some(grid.point(current));
        self.last_step
            .changed
            .push((grid.point(current), VisitState::Visited));

        // Popping the goal itself only happens when start == end; the
        // normal exit is discovery during relaxation below.
        if current == self.end {
            self.found = true;
            self.status = SearchStatus::Found;
            return self.status;
        }

        let current_dist = self.visit.distance(current);

        for &next in grid.neighbors_of(current) {
            if grid.cell(next).kind == CellKind::Wall {
                continue;
            }
            if next == self.end {
                self.found = true;
            }

            match self.algorithm {
                // Seen-at-enqueue: a cell is claimed the moment it joins
                // the frontier, so it is never enqueued twice.
                Algorithm::Bfs | Algorithm::Dfs => {
                    if !self.visit.is_seen(next) {
                        self.visit.record(next, current_dist + 1, Some(current));
                        self.frontier.push(next, 0);
                        self.last_step
                            .changed
                            .push((grid.point(next), VisitState::Frontier));
                    }
                }
                Algorithm::Dijkstra => {
                    let tentative = current_dist.saturating_add(grid.cell(next).weight);
                    if tentative < self.visit.distance(next) {
                        self.visit.record(next, tentative, Some(current));
                        self.frontier.push(next, tentative);
                        self.last_step
                            .changed
                            .push((grid.point(next), VisitState::Frontier));
                    }
                }
                // The stored distance deliberately keeps the heuristic
                // term and is reused as-is in later comparisons. Inherited
                // behavior: tentative distances are not pure path costs.
                Algorithm::AStar => {
                    let h = grid.point(next).manhattan(grid.end());
                    let tentative = current_dist
                        .saturating_add(grid.cell(next).weight)
                        .saturating_add(h);
                    if tentative < self.visit.distance(next) {
                        self.visit.record(next, tentative, Some(current));
                        self.frontier.push(next, tentative);
                        self.last_step
                            .changed
                            .push((grid.point(next), VisitState::Frontier));
                    }
                }
            }
        }

        if self.found {
            self.status = SearchStatus::Found;
            debug!("{} search reached the end cell", self.algorithm);
        }
        self.status
    }

    /// Run to termination and hand back the path and the visit map.
    pub fn finish(mut self, grid: &Grid) -> (Path, VisitMap) {
        while self.step(grid) == SearchStatus::Running {}
        self.into_result(grid)
    }

    /// Convert a terminal search into its result. A search that is still
    /// running, was cancelled, or exhausted the frontier yields an empty
    /// path.
    pub fn into_result(self, grid: &Grid) -> (Path, VisitMap) {
        let path = if self.status == SearchStatus::Found {
            Path::reconstruct(&self.visit, grid, grid.end())
        } else {
            Path::default()
        };
        (path, self.visit)
    }

    /// Lazy step-event sequence: one [`SearchEvent::Step`] per expansion,
    /// then a terminal [`SearchEvent::Done`] carrying the path. Finite and
    /// non-restartable.
    pub fn events(self, grid: &Grid) -> Steps<'_> {
        Steps {
            grid,
            search: Some(self),
            pending: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchEvent {
    Step(StepEvent),
    Done(Path),
}

pub struct Steps<'g> {
    grid: &'g Grid,
    search: Option<Search>,
    pending: Option<Path>,
}

impl Iterator for Steps<'_> {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(path) = self.pending.take() {
            return Some(SearchEvent::Done(path));
        }

        let mut search = self.search.take()?;
        let status = search.step(self.grid);
        let event = search.last_step.clone();

        if status == SearchStatus::Running {
            self.search = Some(search);
            return Some(SearchEvent::Step(event));
        }

        let (path, _) = search.into_result(self.grid);
        if event.changed.is_empty() {
            // terminated without expanding anything this step
            Some(SearchEvent::Done(path))
        } else {
            self.pending = Some(path);
            Some(SearchEvent::Step(event))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::GridConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// 3x3 grid, start at (0,0), end at (2,2), uniform weight 1.
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

    fn run(algorithm: Algorithm, grid: &Grid) -> (Path, VisitMap) {
        Search::new(algorithm, grid, grid.create_visit_map(), CancelToken::new()).finish(grid)
    }

    #[test]
    fn bfs_finds_shortest_path_on_open_3x3() {
        let grid = grid_3x3();
        let (path, _) = run(Algorithm::Bfs, &grid);

        assert_eq!(path.cells.len(), 5); // 4 edges
        assert_eq!(path.total_weight, 5);
        assert_eq!(path.cells.first(), Some(&grid.start()));
        assert_eq!(path.cells.last(), Some(&grid.end()));
    }

    #[test]
    fn dfs_finds_some_path_on_open_3x3() {
        let grid = grid_3x3();
        let (path, _) = run(Algorithm::Dfs, &grid);

        assert!(!path.is_empty());
        assert!(path.cells.len() <= 8);
        assert_eq!(path.cells.first(), Some(&grid.start()));
        assert_eq!(path.cells.last(), Some(&grid.end()));
        // consecutive path cells must be orthogonal neighbors
        for pair in path.cells.windows(2) {
            assert_eq!(pair[0].manhattan(pair[1]), 1);
        }
    }

    #[test]
    fn dijkstra_matches_bfs_on_uniform_weights() {
        let grid = grid_3x3();
        let (bfs_path, _) = run(Algorithm::Bfs, &grid);
        let (dijkstra_path, _) = run(Algorithm::Dijkstra, &grid);

        assert_eq!(dijkstra_path.total_weight, 5);
        // with all weights 1, total weight equals the BFS cell count
        assert_eq!(dijkstra_path.total_weight, bfs_path.cells.len() as u32);
    }

    #[test]
    fn astar_matches_dijkstra_cost_and_visits_no_more_cells() {
        let grid = grid_3x3();
        let (dijkstra_path, dijkstra_visit) = run(Algorithm::Dijkstra, &grid);
        let (astar_path, astar_visit) = run(Algorithm::AStar, &grid);

        assert_eq!(astar_path.total_weight, dijkstra_path.total_weight);
        assert!(astar_visit.visited_count() <= dijkstra_visit.visited_count());
    }

    #[test]
    fn dijkstra_routes_around_walls() {
        let mut grid = grid_3x3();
        grid.set_start(Point { col: 0, row: 0 });
        grid.set_end(Point { col: 2, row: 0 });
        grid.toggle_wall(Point { col: 1, row: 0 }); // block the direct row

        let (path, _) = run(Algorithm::Dijkstra, &grid);

        assert_eq!(
            path.cells,
            vec![
                Point { col: 0, row: 0 },
                Point { col: 0, row: 1 },
                Point { col: 1, row: 1 },
                Point { col: 2, row: 1 },
                Point { col: 2, row: 0 },
            ]
        );
        assert_eq!(path.total_weight, 5);
    }

    #[test]
    fn walled_in_start_yields_empty_path_for_every_algorithm() {
        for algorithm in Algorithm::all() {
            let mut grid = grid_3x3();
            grid.set_wall(Point { col: 1, row: 0 }, true);
            grid.set_wall(Point { col: 0, row: 1 }, true);

            let (path, _) = run(algorithm, &grid);
            assert!(path.is_empty(), "{} should find no path", algorithm);
        }
    }

    #[test]
    fn start_equals_end_yields_single_cell_path() {
        for algorithm in Algorithm::all() {
            let mut grid = grid_3x3();
            grid.set_start(Point { col: 1, row: 1 });
            grid.set_end(Point { col: 1, row: 1 });
            let mut rng = StdRng::seed_from_u64(9);
            grid.reweight(true, &mut rng);

            let mut search =
                Search::new(algorithm, &grid, grid.create_visit_map(), CancelToken::new());
            // the trivial case terminates on the very first step
            assert_eq!(search.step(&grid), SearchStatus::Found);

            let (path, _) = search.into_result(&grid);
            assert_eq!(path.cells, vec![Point { col: 1, row: 1 }]);
            assert_eq!(
                path.total_weight,
                grid.cell_at(Point { col: 1, row: 1 }).weight
            );
        }
    }

    #[test]
    fn dijkstra_total_weight_is_consistent_with_distances() {
        // random walls and weights; recorded distances and the
        // reconstructed weight sum must agree: the path weight is the
        // end distance plus the start cell's own weight
        let mut rng = StdRng::seed_from_u64(42);
        let config = GridConfig {
            width: 300,
            height: 200,
            cell_size: 10,
        };
        let mut grid = Grid::build(&config, &mut rng).unwrap();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                if rng.gen_bool(0.2) {
                    grid.set_wall(Point { col, row }, true);
                }
            }
        }
        grid.reweight(true, &mut rng);

        let (path, visit) = run(Algorithm::Dijkstra, &grid);
        if !path.is_empty() {
            let end_dist = visit.distance(grid.end_index());
            let start_weight = grid.cell_at(grid.start()).weight;
            assert_eq!(path.total_weight, end_dist + start_weight);
        }
    }

    #[test]
    fn searches_are_deterministic_for_a_fixed_grid() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = GridConfig {
            width: 400,
            height: 300,
            cell_size: 20,
        };
        let mut grid = Grid::build(&config, &mut rng).unwrap();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                if rng.gen_bool(0.3) {
                    grid.set_wall(Point { col, row }, true);
                }
            }
        }
        grid.reweight(true, &mut rng);

        for algorithm in Algorithm::all() {
            let expansions = |grid: &Grid| -> Vec<Point> {
                Search::new(algorithm, grid, grid.create_visit_map(), CancelToken::new())
                    .events(grid)
                    .filter_map(|event| match event {
                        SearchEvent::Step(step) => step.expanded,
                        SearchEvent::Done(_) => None,
                    })
                    .collect()
            };
            assert_eq!(expansions(&grid), expansions(&grid), "{}", algorithm);
        }
    }

    #[test]
    fn visit_map_reset_is_idempotent_and_reusable() {
        let grid = grid_3x3();
        let (_, mut visit) = run(Algorithm::Bfs, &grid);

        visit.reset();
        visit.reset();
        assert!((0..grid.len()).all(|i| !visit.is_seen(i)));
        assert!((0..grid.len()).all(|i| visit.distance(i) == UNREACHABLE));

        // a reused map reproduces the run exactly
        let (first, visit) = run(Algorithm::Dijkstra, &grid);
        let (second, _) =
            Search::new(Algorithm::Dijkstra, &grid, visit, CancelToken::new()).finish(&grid);
        assert_eq!(first, second);
    }

    #[test]
    fn cancellation_stops_at_a_step_boundary() {
        let grid = grid_3x3();
        let cancel = CancelToken::new();
        let mut search =
            Search::new(Algorithm::Bfs, &grid, grid.create_visit_map(), cancel.clone());

        assert_eq!(search.step(&grid), SearchStatus::Running);
        cancel.cancel();
        assert_eq!(search.step(&grid), SearchStatus::Cancelled);
        // terminal states are sticky
        assert_eq!(search.step(&grid), SearchStatus::Cancelled);

        let (path, _) = search.into_result(&grid);
        assert!(path.is_empty());
    }

    #[test]
    fn priority_ties_pop_in_insertion_order() {
        let mut frontier = Frontier::for_algorithm(Algorithm::Dijkstra);
        frontier.push(5, 3);
        frontier.push(9, 3);
        frontier.push(1, 1);
        frontier.push(7, 3);

        assert_eq!(frontier.pop(), Some(1));
        assert_eq!(frontier.pop(), Some(5));
        assert_eq!(frontier.pop(), Some(9));
        assert_eq!(frontier.pop(), Some(7));
        assert_eq!(frontier.pop(), None);
    }

    #[test]
    fn stale_heap_entries_are_discarded() {
        let grid = grid_3x3();
        let mut search = Search::new(
            Algorithm::Dijkstra,
            &grid,
            grid.create_visit_map(),
            CancelToken::new(),
        );
        // plant a duplicate frontier entry for the start cell; it ties at
        // priority 0 and pops immediately after the real one
        search.frontier.push(grid.start_index(), 0);

        assert_eq!(search.step(&grid), SearchStatus::Running);
        assert_eq!(search.last_step().expanded, Some(grid.start()));

        // the stale duplicate pops next and must be dropped, not reprocessed
        assert_eq!(search.step(&grid), SearchStatus::Running);
        assert!(search.last_step().expanded.is_none());
        assert!(search.last_step().changed.is_empty());
    }

    #[test]
    fn events_emit_steps_then_a_terminal_path() {
        let grid = grid_3x3();
        let search = Search::new(
            Algorithm::Bfs,
            &grid,
            grid.create_visit_map(),
            CancelToken::new(),
        );
        let events: Vec<_> = search.events(&grid).collect();

        assert!(events.len() >= 2);
        for event in &events[..events.len() - 1] {
            assert!(matches!(event, SearchEvent::Step(_)));
        }
        match events.last() {
            Some(SearchEvent::Done(path)) => {
                assert_eq!(path.cells.len(), 5);
                assert_eq!(path.total_weight, 5);
            }
            other => panic!("expected terminal path, got {:?}", other),
        }
    }
}
