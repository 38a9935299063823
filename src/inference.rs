use std::path::Path;

use anyhow::{Context, Result};
use ego_kinematics::Trajectory;
use ego_planner::{
    load_with_fallback, Conversation, EgoHistory, ImageTensor, KinematicPlanner, PlannerOutput,
    PlannerRequest, TrajectoryPlanner,
};
use tracing::info;

use crate::config::Settings;
use crate::render;

/// Build the planner request for one camera frame.
pub fn build_request(settings: &Settings, image_path: &Path, prompt: &str) -> Result<PlannerRequest> {
    let tensor = ImageTensor::load(image_path)?;
    info!(path = %image_path.display(), shape = ?tensor.shape(), "Image loaded");

    let conversation = Conversation::for_image(tensor).with_user_prompt(prompt);
    // A single frame carries no odometry, so the vehicle is assumed stationary.
    let history = EgoHistory::stationary(settings.inference.history_steps);
    Ok(PlannerRequest::new(conversation, history, settings.inference.sampling))
}

/// Load the configured planner, trying each quantization mode in order.
pub fn load_planner(settings: &Settings) -> Result<KinematicPlanner> {
    let model = settings.model()?;
    let horizon = settings.horizon()?;
    let steering_rate = settings.inference.steering_rate;
    let planner = load_with_fallback(&settings.inference.quantization, |mode| {
        Ok(KinematicPlanner::new(model, horizon, steering_rate, mode))
    })?;
    info!(
        model = %settings.inference.model_id,
        backend = planner.name(),
        quantization = %planner.quantization(),
        "Planner loaded"
    );
    Ok(planner)
}

/// `Waypoint i: (x, y)` lines, 1-based, two decimals.
pub fn format_waypoints(trajectory: &Trajectory) -> Vec<String> {
    trajectory
        .iter()
        .enumerate()
        .map(|(i, wp)| format!("Waypoint {}: ({:.2}, {:.2})", i + 1, wp.x, wp.y))
        .collect()
}

/// Run one rollout, print reasoning and waypoints, and save the prediction plot.
pub fn run_with<P: TrajectoryPlanner>(
    planner: &mut P,
    request: &PlannerRequest,
    settings: &Settings,
) -> Result<PlannerOutput> {
    info!(seed = request.sampling.seed, top_p = request.sampling.top_p, "Running inference");
    let output = planner.plan(request)?;
    let trajectory = output
        .primary()
        .context("planner returned no trajectory samples")?;

    println!("Chain of Causation Reasoning:");
    println!("{}", output.reasoning);

    println!("\nPredicted Trajectory Coordinates (X, Y in meters):");
    for line in format_waypoints(trajectory) {
        println!("{}", line);
    }

    let figure = &settings.inference.plot;
    render::prediction_plot(trajectory, figure).save(&figure.path)?;
    println!("\nTrajectory plot saved to: {}", figure.path.display());

    Ok(output)
}

pub fn run(settings: &Settings, image: Option<&Path>, prompt: Option<&str>) -> Result<()> {
    let image_path = image.unwrap_or(settings.inference.image_path.as_path());
    let prompt = prompt.unwrap_or(settings.inference.prompt.as_str());

    let request = build_request(settings, image_path, prompt)?;
    let mut planner = load_planner(settings)?;
    run_with(&mut planner, &request, settings)?;
    Ok(())
}
