//! The planner seam: what a trajectory model is asked, what it answers, and how
//! it gets loaded.

use std::fmt;

use ego_kinematics::Trajectory;
use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Conversation, EgoHistory, PlannerError};

/// Weight quantization used when loading a model.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantization {
    /// 4-bit NormalFloat with double quantization, bf16 compute.
    Nf4,
    /// 8-bit integer weights, bf16 compute.
    Int8,
}

impl Quantization {
    /// Load order used when nothing else is configured: smallest footprint first.
    pub const FALLBACK_ORDER: [Quantization; 2] = [Quantization::Nf4, Quantization::Int8];

    /// Bits per weight.
    pub fn bits(&self) -> u8 {
        match self {
            Quantization::Nf4 => 4,
            Quantization::Int8 => 8,
        }
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantization::Nf4 => write!(f, "nf4"),
            Quantization::Int8 => write!(f, "int8"),
        }
    }
}

/// Nucleus-sampling parameters for the reasoning/trajectory rollout.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Cumulative probability mass kept at each step, in `(0, 1]`.
    pub top_p: f32,
    /// Softmax temperature, positive.
    pub temperature: f32,
    /// Number of trajectories to sample, at least one.
    pub num_traj_samples: usize,
    /// Maximum number of generated reasoning tokens.
    pub max_generation_length: usize,
    /// Seed for the sampler.
    pub seed: u64,
}

impl SamplingParams {
    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::InvalidRequest` naming the first offending parameter.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(PlannerError::InvalidRequest("top_p must be in (0, 1]"));
        }
        if !(self.temperature > 0.0) || !self.temperature.is_finite() {
            return Err(PlannerError::InvalidRequest("temperature must be positive"));
        }
        if self.num_traj_samples == 0 {
            return Err(PlannerError::InvalidRequest("num_traj_samples must be at least 1"));
        }
        if self.max_generation_length == 0 {
            return Err(PlannerError::InvalidRequest(
                "max_generation_length must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        SamplingParams {
            top_p: 0.98,
            temperature: 0.6,
            num_traj_samples: 1,
            max_generation_length: 256,
            seed: 42,
        }
    }
}

/// Everything a planner needs for one rollout.
#[derive(Debug, Clone)]
pub struct PlannerRequest {
    /// Chat messages with the camera frame and the prompt.
    pub conversation: Conversation,
    /// Past ego motion.
    pub ego_history: EgoHistory,
    /// Sampling parameters.
    pub sampling: SamplingParams,
}

impl PlannerRequest {
    /// Bundle a request.
    pub fn new(conversation: Conversation, ego_history: EgoHistory, sampling: SamplingParams) -> Self {
        PlannerRequest {
            conversation,
            ego_history,
            sampling,
        }
    }

    /// Check the request is complete before handing it to a backend.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::InvalidRequest` if the frame, the prompt or the
    /// history is missing, or if sampling parameters are out of range.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.conversation.image().is_none() {
            return Err(PlannerError::InvalidRequest("conversation carries no image"));
        }
        if self.conversation.user_prompt().is_none_or(|p| p.trim().is_empty()) {
            return Err(PlannerError::InvalidRequest("user prompt is empty"));
        }
        if self.ego_history.is_empty() {
            return Err(PlannerError::InvalidRequest("ego history is empty"));
        }
        self.sampling.validate()
    }
}

/// Reasoning text plus one trajectory per requested sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerOutput {
    /// Natural-language chain of reasoning.
    pub reasoning: String,
    /// Sampled trajectories; never empty for a successful rollout.
    pub trajectories: Vec<Trajectory>,
}

impl PlannerOutput {
    /// The first sampled trajectory.
    pub fn primary(&self) -> Option<&Trajectory> {
        self.trajectories.first()
    }
}

/// A model that looks at a camera frame and plans the ego vehicle's next seconds.
pub trait TrajectoryPlanner {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Quantization the backend was loaded with.
    fn quantization(&self) -> Quantization;

    /// Run one rollout.
    ///
    /// # Errors
    ///
    /// Returns `PlannerError::InvalidRequest` for malformed requests and
    /// `PlannerError::Inference` if sampling fails.
    fn plan(&mut self, request: &PlannerRequest) -> Result<PlannerOutput, PlannerError>;
}

/// Try `load` with each quantization mode in order and keep the first success.
///
/// Failures before the last mode are logged and skipped. If every mode fails
/// the last error is returned.
///
/// # Errors
///
/// Returns `PlannerError::NoQuantization` if `modes` is empty, otherwise the
/// error of the final attempt.
pub fn load_with_fallback<P, F>(modes: &[Quantization], mut load: F) -> Result<P, PlannerError>
where
    F: FnMut(Quantization) -> Result<P, PlannerError>,
{
    let mut last_err = None;
    for (attempt, &mode) in modes.iter().enumerate() {
        info!(%mode, attempt = attempt + 1, "Loading planner");
        match load(mode) {
            Ok(planner) => return Ok(planner),
            Err(e) => {
                warn!(%mode, error = %e, "Planner load failed");
                if attempt + 1 < modes.len() {
                    warn!("Falling back to the next quantization mode...");
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(PlannerError::NoQuantization))
}
