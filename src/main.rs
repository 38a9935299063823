mod config;    // brings `config.rs` in as `crate::config`
mod graphics;  // brings `graphics.rs` in as `crate::graphics`
mod inference; // brings `inference.rs` in as `crate::inference`
mod render;    // brings `render.rs` in as `crate::render`
mod scenario;  // brings `scenario.rs` in as `crate::scenario`

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, DEFAULT_CONFIG_PATH};
use crate::scenario::ScenarioRun;

#[derive(Parser)]
#[command(name = "ego-trajectory", about = "Ego-vehicle trajectory scenarios and planner harness")]
struct Cli {
    /// TOML configuration file; optional unless given explicitly
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the multi-scenario verification plot.
    Verify {
        /// Override the output image path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the waypoints for a single steering rate.
    Generate {
        #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
        steering_rate: f64,
        /// Also write the trajectory to a JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Plan a trajectory for a camera frame and plot it.
    Infer {
        /// Camera frame; defaults to the configured image path
        #[arg(long)]
        image: Option<PathBuf>,
        /// Replace the user prompt
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Open an interactive window that plays every scenario back in real time.
    View,
}

fn main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt().with_env_filter(log_filter(rust_log.as_deref())).init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load(path, true),
        None => Settings::load(Path::new(DEFAULT_CONFIG_PATH), false),
    }
    .context("loading configuration")?;

    match cli.command {
        Commands::Verify { output } => verify(&settings, output.as_deref()),
        Commands::Generate { steering_rate, json } => generate(&settings, steering_rate, json.as_deref()),
        Commands::Infer { image, prompt } => inference::run(&settings, image.as_deref(), prompt.as_deref()),
        Commands::View => {
            let runs = scenario_runs(&settings)?;
            macroquad::Window::from_config(graphics::window_conf(), graphics::run_playback(runs));
            Ok(())
        }
    }
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn scenario_runs(settings: &Settings) -> Result<Vec<ScenarioRun>> {
    let model = settings.model()?;
    let horizon = settings.horizon()?;
    let scenarios = settings.scenarios()?;
    info!(%model, %horizon, scenarios = scenarios.len(), "Generating scenarios");
    Ok(scenario::run_all(&model, &horizon, &scenarios))
}

fn verify(settings: &Settings, output: Option<&Path>) -> Result<()> {
    let runs = scenario_runs(settings)?;
    for run in &runs {
        info!(
            scenario = %run.scenario.name,
            color = %run.scenario.color,
            steering_rate = run.scenario.steering_rate,
            end = %run.trajectory.last().unwrap_or_default(),
            "Scenario generated"
        );
    }

    let output = output.unwrap_or(settings.verification.path.as_path());
    render::verification_plot(&runs, &settings.verification).save(output)?;
    println!("Visualization saved to {}", output.display());
    Ok(())
}

fn generate(settings: &Settings, steering_rate: f64, json: Option<&Path>) -> Result<()> {
    ensure!(steering_rate.is_finite(), "steering rate must be finite, got {steering_rate}");
    let model = settings.model()?;
    let horizon = settings.horizon()?;
    let trajectory = model.generate(&horizon, steering_rate);

    println!("{} (steering rate {})", trajectory, steering_rate);
    for line in inference::format_waypoints(&trajectory) {
        println!("{}", line);
    }

    if let Some(path) = json {
        let doc = serde_json::json!({
            "steering_rate": steering_rate,
            "model": model,
            "horizon": horizon,
            "trajectory": trajectory,
        });
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Trajectory saved to {}", path.display());
    }
    Ok(())
}
