use pathfind::{Algorithm, CancelToken, Grid, GridConfig, Point, Search};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), anyhow::Error> {
    let mut rng = StdRng::seed_from_u64(7);

    let config = GridConfig {
        width: 640,
        height: 360,
        cell_size: 20,
    };
    let mut grid = Grid::build(&config, &mut rng)?;

    // scatter some walls; start and end cells refuse the paint
    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            if rng.gen_bool(0.25) {
                grid.set_wall(Point { col, row }, true);
            }
        }
    }

    println!("{}", grid);

    for algorithm in Algorithm::all() {
        let search = Search::new(algorithm, &grid, grid.create_visit_map(), CancelToken::new());
        let (path, visit) = search.finish(&grid);

        if path.is_empty() {
            println!(
                "{:8} no path found ({} cells visited)",
                algorithm,
                visit.visited_count()
            );
        } else {
            println!(
                "{:8} path of {} cells, total weight {}, {} cells visited",
                algorithm,
                path.cells.len(),
                path.total_weight,
                visit.visited_count()
            );
        }

        if algorithm == Algorithm::Dijkstra {
            println!("\ndijkstra distances:\n{}", visit.display(&grid));
        }
    }

    Ok(())
}
