//! Error types for the kinematics library.
//!
//! This module defines the errors that can occur when a kinematic model or a
//! time horizon is constructed from out-of-range parameters.

use core::fmt;

/// Errors that can occur when building kinematic models and horizons.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for invalid time step.
    /// This variant is returned when a sampling interval is not positive and finite.
    InvalidTimeStep(&'static str),
    /// Error for invalid base speed.
    /// This variant is returned when the base speed is not positive and finite.
    InvalidBaseSpeed(&'static str),
    /// Error for invalid acceleration.
    /// This variant is returned when the acceleration coefficient is not finite.
    InvalidAcceleration(&'static str),
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidTimeStep(msg) => write!(f, "Invalid time step: {}", msg),
            KinematicsError::InvalidBaseSpeed(msg) => write!(f, "Invalid base speed: {}", msg),
            KinematicsError::InvalidAcceleration(msg) => {
                write!(f, "Invalid acceleration coefficient: {}", msg)
            }
        }
    }
}

impl core::error::Error for KinematicsError {}
