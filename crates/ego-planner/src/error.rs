//! This module defines the error types used by the `ego-planner` crate.

use std::path::PathBuf;

use ego_kinematics::KinematicsError;
use thiserror::Error;

use crate::planner::Quantization;

/// Error type for planner operations.
///
/// Every failure is fail-fast: the harness reports the message and stops. The
/// only retry is the quantization fallback in [`crate::load_with_fallback`].
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The input image does not exist.
    #[error("Image file not found: {}. Please place your dashcam image there.", .0.display())]
    ImageNotFound(PathBuf),
    /// The input image exists but could not be decoded.
    #[error("Failed to decode image {}: {source}", .path.display())]
    ImageDecode {
        /// Path of the offending file.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },
    /// The request is malformed (missing image, missing prompt, bad sampling parameters).
    #[error("Invalid planner request: {0}")]
    InvalidRequest(&'static str),
    /// The model could not be loaded with the given quantization.
    #[error("Error loading model ({quantization}): {reason}")]
    Load {
        /// Quantization mode that was attempted.
        quantization: Quantization,
        /// Backend-specific reason.
        reason: String,
    },
    /// Loading was requested with an empty list of quantization modes.
    #[error("No quantization modes configured")]
    NoQuantization,
    /// Sampling trajectories from the model failed.
    #[error("Inference failed: {0}")]
    Inference(String),
    /// The backend produced waypoints that do not form a valid trajectory.
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}
