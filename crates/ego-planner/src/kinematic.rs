//! A deterministic stand-in for a learned planner.
//!
//! It honours the full request contract but answers with the closed-form
//! kinematic model, which makes the harness runnable without model weights.

use ego_kinematics::{Horizon, KinematicModel, Trajectory};
use tracing::debug;

use crate::{PlannerError, PlannerOutput, PlannerRequest, Quantization, TrajectoryPlanner};

/// Planner backed by [`KinematicModel`] with a fixed steering rate.
#[derive(Debug, Clone)]
pub struct KinematicPlanner {
    model: KinematicModel,
    horizon: Horizon,
    steering_rate: f64,
    quantization: Quantization,
}

impl KinematicPlanner {
    /// Construct a planner. Quantization is recorded for reporting only.
    pub fn new(
        model: KinematicModel,
        horizon: Horizon,
        steering_rate: f64,
        quantization: Quantization,
    ) -> Self {
        KinematicPlanner {
            model,
            horizon,
            steering_rate,
            quantization,
        }
    }

    /// Steering rate used for every rollout.
    pub fn steering_rate(&self) -> f64 {
        self.steering_rate
    }

    fn maneuver(&self) -> &'static str {
        if self.steering_rate > 0.0 {
            "An opening in the left lane allows a gradual lane change to the left"
        } else if self.steering_rate < 0.0 {
            "An obstruction ahead requires an evasive steer to the right"
        } else {
            "The lane ahead is clear, so the ego vehicle keeps its current lane"
        }
    }

    fn reasoning(&self, luma: f32, trajectory: &Trajectory) -> String {
        let end_time = trajectory.end_time();
        let lateral = trajectory.last().map_or(0.0, |wp| wp.y);
        let side = if lateral > 0.0 {
            "left of"
        } else if lateral < 0.0 {
            "right of"
        } else {
            "on"
        };
        format!(
            "Scene brightness is {:.2}. {}. Starting at {:.1} m/s and accelerating gently to {:.1} m/s, \
             the ego vehicle covers {:.1} m in {:.1} s and ends {:.2} m {} the current lane center.",
            luma,
            self.maneuver(),
            self.model.speed_at(0.0),
            self.model.speed_at(end_time),
            trajectory.path_length(),
            end_time,
            lateral.abs(),
            side,
        )
    }
}

impl TrajectoryPlanner for KinematicPlanner {
    fn name(&self) -> &str {
        "kinematic"
    }

    fn quantization(&self) -> Quantization {
        self.quantization
    }

    fn plan(&mut self, request: &PlannerRequest) -> Result<PlannerOutput, PlannerError> {
        request.validate()?;
        let luma = request.conversation.image().map_or(0.0, |image| image.mean_luma());

        let trajectory = self.model.generate(&self.horizon, self.steering_rate);
        if trajectory.is_empty() {
            return Err(PlannerError::Inference("planning horizon has no samples".into()));
        }
        debug!(
            steering_rate = self.steering_rate,
            waypoints = trajectory.len(),
            samples = request.sampling.num_traj_samples,
            "Generated kinematic rollout"
        );

        let reasoning = self.reasoning(luma, &trajectory);
        Ok(PlannerOutput {
            reasoning,
            trajectories: vec![trajectory; request.sampling.num_traj_samples],
        })
    }
}
