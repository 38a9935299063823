#![warn(missing_docs)]

//! Planner seam for vision-language trajectory models.
//!
//! A pretrained model is an external collaborator: it takes a camera frame and
//! a text prompt and answers with a chain of reasoning and future ego
//! waypoints. This crate owns everything around that call: turning an image
//! into a `[1, 3, H, W]` tensor, building the chat conversation, supplying the
//! ego history, holding sampling parameters, and loading with a quantization
//! fallback. [`KinematicPlanner`] implements the contract without weights.

pub mod error;
pub mod history;
pub mod kinematic;
pub mod message;
pub mod planner;
pub mod tensor;

pub use error::PlannerError;
pub use history::{EgoHistory, HISTORY_STEPS};
pub use kinematic::KinematicPlanner;
pub use message::{ChatMessage, ContentPart, Conversation, Role, DEFAULT_USER_PROMPT};
pub use planner::{
    load_with_fallback, PlannerOutput, PlannerRequest, Quantization, SamplingParams,
    TrajectoryPlanner,
};
pub use tensor::ImageTensor;
