use ego_kinematics::{Bounds, Waypoint};
use macroquad::prelude::*;
use tracing::info;

use crate::scenario::{self, ScenarioRun};

// Function to configure the macroquad window
pub fn window_conf() -> Conf {
    Conf {
        window_title: "Ego Trajectory Playback".to_string(),
        window_width: 1200,
        window_height: 800,
        high_dpi: true,
        ..Default::default()
    }
}

const MARGIN_PX: f32 = 60.0;
const VEHICLE_SIZE_PX: f32 = 12.0;
const EGO_SIZE_PX: f32 = 16.0;
const GRID_STEP_M: f64 = 10.0;

fn to_mq(color: scenario::Color, opacity: f32) -> Color {
    Color::from_rgba(color.r, color.g, color.b, (opacity.clamp(0.0, 1.0) * 255.0) as u8)
}

/// World-to-screen mapping recomputed every frame so window resizes are honoured.
struct Screen {
    bounds: Bounds,
    scale: f32,
    origin_x: f32,
    origin_y: f32,
}

impl Screen {
    fn fit(bounds: Bounds) -> Self {
        let w = (bounds.width().max(1.0)) as f32;
        let h = (bounds.height().max(1.0)) as f32;
        let scale = ((screen_width() - 2.0 * MARGIN_PX) / w).min((screen_height() - 2.0 * MARGIN_PX) / h);
        let center = bounds.center();
        Screen {
            bounds,
            scale,
            origin_x: screen_width() / 2.0 - center.x as f32 * scale,
            origin_y: screen_height() / 2.0 + center.y as f32 * scale,
        }
    }

    fn point(&self, p: Waypoint) -> Vec2 {
        vec2(self.origin_x + p.x as f32 * self.scale, self.origin_y - p.y as f32 * self.scale)
    }
}

fn draw_grid(screen: &Screen) {
    let grid = Color::new(1.0, 1.0, 1.0, 0.08);
    let b = screen.bounds;
    let mut x = (b.min_x / GRID_STEP_M).floor() * GRID_STEP_M;
    while x <= b.max_x {
        let top = screen.point(Waypoint::new(x, b.max_y));
        let bottom = screen.point(Waypoint::new(x, b.min_y));
        draw_line(top.x, top.y, bottom.x, bottom.y, 1.0, grid);
        x += GRID_STEP_M;
    }
    let mut y = (b.min_y / GRID_STEP_M).floor() * GRID_STEP_M;
    while y <= b.max_y {
        let left = screen.point(Waypoint::new(b.min_x, y));
        let right = screen.point(Waypoint::new(b.max_x, y));
        draw_line(left.x, left.y, right.x, right.y, 1.0, grid);
        y += GRID_STEP_M;
    }
}

fn draw_vehicle(screen: &Screen, at: Waypoint, heading: f32, color: Color) {
    let center = screen.point(at);
    // Screen y grows downward, so flip the heading.
    let th = -heading;
    let corner = |offset: f32| {
        vec2(
            center.x + VEHICLE_SIZE_PX * (th + offset).cos(),
            center.y + VEHICLE_SIZE_PX * (th + offset).sin(),
        )
    };
    let nose = corner(0.0);
    let left = corner(2.0 * std::f32::consts::PI / 3.0);
    let right = corner(-2.0 * std::f32::consts::PI / 3.0);
    draw_triangle(nose, left, right, color);
    draw_line(center.x, center.y, nose.x, nose.y, 2.0, WHITE);
}

/// Loop every scenario's trajectory in real time until the window is closed or Escape is pressed.
pub async fn run_playback(runs: Vec<ScenarioRun>) {
    let mut bounds = Bounds::at(Waypoint::origin());
    for run in &runs {
        if let Some(b) = run.trajectory.bounds() {
            bounds.union(&b);
        }
    }
    let duration = runs
        .iter()
        .map(|run| run.trajectory.end_time())
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    info!(scenarios = runs.len(), duration, "Playback loop starting...");

    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("Playback closed.");
            break;
        }

        clear_background(BLACK);
        let screen = Screen::fit(bounds);
        draw_grid(&screen);

        let t = get_time() % duration;

        for run in &runs {
            let color = to_mq(run.scenario.color, run.scenario.opacity);
            for pair in run.trajectory.waypoints().windows(2) {
                let a = screen.point(pair[0]);
                let b = screen.point(pair[1]);
                draw_line(a.x, a.y, b.x, b.y, 3.0, color);
            }

            let (Some(now), Some(ahead)) = (
                run.trajectory.sample(t),
                run.trajectory.sample(t + run.trajectory.dt()),
            ) else {
                continue;
            };
            let heading = (ahead.y - now.y).atan2(ahead.x - now.x) as f32;
            draw_vehicle(&screen, now, heading, to_mq(run.scenario.color, 1.0));
        }

        let ego = screen.point(Waypoint::origin());
        draw_rectangle(ego.x - EGO_SIZE_PX / 2.0, ego.y - EGO_SIZE_PX / 2.0, EGO_SIZE_PX, EGO_SIZE_PX, YELLOW);

        draw_text(&format!("t = {:.1} s / {:.1} s", t, duration), 10.0, 20.0, 20.0, LIGHTGRAY);
        for (i, run) in runs.iter().enumerate() {
            let pos = run.trajectory.sample(t).unwrap_or_default();
            draw_text(
                &format!("{}: x={:.1} y={:.2}", run.scenario.name, pos.x, pos.y),
                10.0,
                44.0 + 22.0 * i as f32,
                20.0,
                to_mq(run.scenario.color, 1.0),
            );
        }

        next_frame().await
    }
}
