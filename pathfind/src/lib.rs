//! Grid pathfinding for an interactive visualizer.
//!
//! A [`Grid`] of weighted cells is explored step by step by a [`Search`]
//! running one of four algorithms (BFS, DFS, Dijkstra, A*). Each step
//! expands exactly one cell, so a rendering loop can pull step events and
//! draw a frame between expansions without owning any algorithm state.
//! When the end cell is discovered, [`Path::reconstruct`] walks the
//! predecessor map back to the start.

pub mod grid;
pub mod path;
pub mod search;

pub use grid::{Cell, CellKind, Grid, GridConfig, Point};
pub use path::Path;
pub use search::{
    Algorithm, CancelToken, Search, SearchEvent, SearchStatus, StepEvent, VisitMap, VisitState,
    UNREACHABLE,
};
