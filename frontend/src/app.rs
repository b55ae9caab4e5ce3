use std::time::Duration;

use log::debug;
use pathfind::{
    Algorithm, CancelToken, CellKind, Grid, GridConfig, Path, Point, Search, SearchStatus,
    VisitMap, VisitState,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct State {
    grid: Grid,
    config: GridConfig,
    algorithm: Algorithm,
    auto_step: bool,
    steps_per_frame: usize,
    draw_grid_lines: bool,
    random_weights: bool,
}

impl Default for State {
    fn default() -> Self {
        let config = GridConfig::default();
        let mut rng = StdRng::from_entropy();
        Self {
            grid: Grid::build(&config, &mut rng).expect("default grid config is valid"),
            config,
            algorithm: Algorithm::Bfs,
            auto_step: true,
            steps_per_frame: 5,
            draw_grid_lines: true,
            random_weights: false,
        }
    }
}

pub struct App {
    state: State,
    rng: StdRng,

    // at most one search runs against the grid at a time
    search: Option<Search>,
    cancel: CancelToken,
    finished: Option<(Path, VisitMap)>,
    status: String,
}

impl App {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let state: State = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        Self {
            state,
            rng: StdRng::from_entropy(),
            search: None,
            cancel: CancelToken::new(),
            finished: None,
            status: String::new(),
        }
    }

    fn run_search(&mut self) {
        if self.search.is_some() {
            // ignore run requests while a search is in flight
            debug!("search already running, ignoring run request");
            return;
        }

        let visit = match self.finished.take() {
            Some((_, visit)) => visit, // reused; Search::new resets it
            None => self.state.grid.create_visit_map(),
        };
        self.cancel = CancelToken::new();
        self.search = Some(Search::new(
            self.state.algorithm,
            &self.state.grid,
            visit,
            self.cancel.clone(),
        ));
        self.status = format!("{} running...", self.state.algorithm);
    }

    fn run_algorithm(&mut self, algorithm: Algorithm) {
        if self.search.is_none() {
            self.state.algorithm = algorithm;
        }
        self.run_search();
    }

    /// Advance the running search by at most `steps` expansions.
    fn step_search(&mut self, steps: usize) {
        for _ in 0..steps {
            let Some(search) = self.search.as_mut() else {
                return;
            };
            match search.step(&self.state.grid) {
                SearchStatus::Running => {}
                terminal => {
                    let search = self.search.take().expect("search was just stepped");
                    let algorithm = search.algorithm();
                    let (path, visit) = search.into_result(&self.state.grid);

                    self.status = match terminal {
                        SearchStatus::Found => format!(
                            "{}: path of {} cells, total weight {}",
                            algorithm,
                            path.cells.len(),
                            path.total_weight
                        ),
                        SearchStatus::Exhausted => format!("{}: no path found", algorithm),
                        SearchStatus::Cancelled => format!("{}: cancelled", algorithm),
                        SearchStatus::Running => unreachable!(),
                    };
                    self.finished = Some((path, visit));
                    break;
                }
            }
        }
    }

    /// Discard all visualization state, keeping walls and weights.
    fn refresh(&mut self) {
        self.cancel.cancel();
        self.search = None;
        if let Some((path, visit)) = &mut self.finished {
            *path = Path::default();
            visit.reset();
        }
        self.status.clear();
    }

    /// Rebuild the grid from scratch: fresh cells, adjacency, start/end.
    fn clear(&mut self) {
        match Grid::build(&self.state.config, &mut self.rng) {
            Ok(grid) => {
                self.state.grid = grid;
                self.search = None;
                self.finished = None;
                self.status.clear();
            }
            Err(e) => self.status = format!("failed to rebuild grid: {e}"),
        }
    }

    fn reweight(&mut self) {
        self.state
            .grid
            .reweight(self.state.random_weights, &mut self.rng);
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let keys = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Num1),
                i.key_pressed(egui::Key::Num2),
                i.key_pressed(egui::Key::Num3),
                i.key_pressed(egui::Key::Num4),
                i.key_pressed(egui::Key::C),
                i.key_pressed(egui::Key::R),
                i.key_pressed(egui::Key::W),
            )
        });
        let (num1, num2, num3, num4, c, r, w) = keys;

        if num1 {
            self.run_algorithm(Algorithm::Bfs);
        }
        if num2 {
            self.run_algorithm(Algorithm::Dfs);
        }
        if num3 {
            self.run_algorithm(Algorithm::Dijkstra);
        }
        if num4 {
            self.run_algorithm(Algorithm::AStar);
        }
        if c {
            self.clear();
        }
        if r {
            self.refresh();
        }
        if w {
            self.reweight();
        }
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Path Visualizer");
        ui.separator();

        egui::ComboBox::from_label("Algorithm")
            .selected_text(self.state.algorithm.to_string())
            .show_ui(ui, |ui| {
                for algorithm in Algorithm::all() {
                    ui.selectable_value(
                        &mut self.state.algorithm,
                        algorithm,
                        algorithm.to_string(),
                    );
                }
            });

        ui.horizontal(|ui| {
            if ui.button("Run").clicked() {
                self.run_search();
            }
            if ui.button("Step").clicked() {
                self.step_search(1);
            }
            if ui.button("Finish").clicked() {
                self.step_search(usize::MAX);
            }
            if ui.button("Stop").clicked() {
                self.cancel.cancel();
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Refresh (R)").clicked() {
                self.refresh();
            }
            if ui.button("Clear (C)").clicked() {
                self.clear();
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Reweight (W)").clicked() {
                self.reweight();
            }
            ui.checkbox(&mut self.state.random_weights, "random weights");
        });

        ui.separator();
        ui.checkbox(&mut self.state.auto_step, "Auto step");
        ui.add(
            egui::Slider::new(&mut self.state.steps_per_frame, 1..=50).text("steps per frame"),
        );
        ui.checkbox(&mut self.state.draw_grid_lines, "Draw grid lines");

        ui.separator();
        ui.label("1-4 run BFS / DFS / Dijkstra / A*");
        ui.label("drag: paint walls, right-drag: erase");
        ui.separator();
        ui.label(&self.status);
    }

    fn paint_walls(&mut self, rect: egui::Rect, cell: f32, response: &egui::Response) {
        let Some(pos) = response.interact_pointer_pos() else {
            return;
        };
        let x = pos.x - rect.left();
        let y = pos.y - rect.top();
        if x < 0.0 || y < 0.0 {
            return;
        }

        // pointer position to cell coordinates by floor division
        let point = Point {
            col: (x / cell) as usize,
            row: (y / cell) as usize,
        };
        if !self.state.grid.contains(point) {
            return;
        }

        if response.dragged_by(egui::PointerButton::Primary)
            || response.clicked_by(egui::PointerButton::Primary)
        {
            self.state.grid.set_wall(point, true);
        } else if response.dragged_by(egui::PointerButton::Secondary)
            || response.clicked_by(egui::PointerButton::Secondary)
        {
            self.state.grid.set_wall(point, false);
        }
    }

    fn cell_color(&self, kind: CellKind, weight: u32, visit: Option<VisitState>) -> egui::Color32 {
        match kind {
            CellKind::Wall => egui::Color32::from_gray(40),
            CellKind::Start => egui::Color32::from_rgb(0, 170, 0),
            CellKind::End => egui::Color32::from_rgb(200, 30, 30),
            CellKind::Empty => match visit {
                Some(VisitState::Visited) => egui::Color32::from_rgb(100, 149, 237),
                Some(VisitState::Frontier) => egui::Color32::from_rgb(175, 238, 238),
                _ if weight > 1 => {
                    // heavier cells shade darker yellow
                    let shade = 255 - (weight * 8).min(160) as u8;
                    egui::Color32::from_rgb(255, 255, shade.saturating_sub(95))
                }
                _ => egui::Color32::WHITE,
            },
        }
    }

    fn central_panel(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());

        let grid = &self.state.grid;
        let cell = (rect.width() / grid.cols() as f32).min(rect.height() / grid.rows() as f32);

        self.paint_walls(rect, cell, &response);

        let grid = &self.state.grid;
        let visit = self
            .search
            .as_ref()
            .map(|s| s.visit_map())
            .or_else(|| self.finished.as_ref().map(|(_, v)| v));

        let painter = ui.painter_at(rect);
        let origin = rect.min;

        for c in grid.cells() {
            let Point { col, row } = c.pos;
            let cell_rect = egui::Rect::from_min_size(
                origin + egui::vec2(col as f32 * cell, row as f32 * cell),
                egui::vec2(cell, cell),
            );
            let visit_state = visit.map(|v| v.state(grid.index(c.pos)));
            painter.rect_filled(
                cell_rect,
                0.0,
                self.cell_color(c.kind, c.weight, visit_state),
            );
        }

        if self.state.draw_grid_lines {
            let stroke = egui::Stroke::new(0.5, egui::Color32::from_gray(90));
            for row in 0..=grid.rows() {
                let y = origin.y + row as f32 * cell;
                painter.line_segment(
                    [
                        egui::pos2(origin.x, y),
                        egui::pos2(origin.x + grid.cols() as f32 * cell, y),
                    ],
                    stroke,
                );
            }
            for col in 0..=grid.cols() {
                let x = origin.x + col as f32 * cell;
                painter.line_segment(
                    [
                        egui::pos2(x, origin.y),
                        egui::pos2(x, origin.y + grid.rows() as f32 * cell),
                    ],
                    stroke,
                );
            }
        }

        // the final path as a polyline through cell centers
        if let Some((path, _)) = &self.finished {
            if !path.is_empty() {
                let points: Vec<egui::Pos2> = path
                    .cells
                    .iter()
                    .map(|p| {
                        origin
                            + egui::vec2(
                                (p.col as f32 + 0.5) * cell,
                                (p.row as f32 + 0.5) * cell,
                            )
                    })
                    .collect();
                painter.add(egui::Shape::line(
                    points,
                    egui::Stroke::new((cell * 0.25).max(2.0), egui::Color32::from_rgb(240, 200, 0)),
                ));
            }
        }
    }
}

impl eframe::App for App {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.state);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);

        // auto-step a bounded number of expansions, then let a frame render
        if self.state.auto_step && self.search.is_some() {
            self.step_search(self.state.steps_per_frame);
            ctx.request_repaint_after(Duration::from_millis(20));
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);
                egui::widgets::global_dark_light_mode_buttons(ui);
            });
        });

        egui::SidePanel::left("side_panel").show(ctx, |ui| {
            self.side_panel(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.central_panel(ui);
        });
    }
}
