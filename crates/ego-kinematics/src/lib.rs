#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for closed-form ego-vehicle scenario kinematics."]
#![doc = ""]
#![doc = "This crate provides a speed/heading model that turns a steering rate and a"]
#![doc = "fixed sampling horizon into an ordered trajectory of 2D waypoints."]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use libm::{cos, pow, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Number of samples in the default planning horizon.
pub const DEFAULT_TIME_STEPS: usize = 64;
/// Sampling interval of the default planning horizon (s).
pub const DEFAULT_DT: f64 = 0.1;
/// Speed of the ego vehicle at `t = 0` (m/s).
pub const DEFAULT_BASE_SPEED: f64 = 15.0;
/// Gentle constant acceleration applied over the horizon (m/s²).
pub const DEFAULT_ACCELERATION: f64 = 0.5;

/// Exponent of the heading growth law. Above 1 so steering compounds over time.
const HEADING_EXPONENT: f64 = 1.2;
/// Divisor of the heading growth law.
const HEADING_DIVISOR: f64 = 5.0;

/// A 2‑D position in the ego frame, in meters.
///
/// `x` is longitudinal distance along the initial heading, `y` is the lateral
/// offset (positive to the left).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Waypoint {
    /// Longitudinal position (m).
    pub x: f64,
    /// Lateral position (m).
    pub y: f64,
}

impl Waypoint {
    /// Construct a new waypoint.
    pub const fn new(x: f64, y: f64) -> Self {
        Waypoint { x, y }
    }

    /// The ego origin `(0, 0)`.
    pub const fn origin() -> Self {
        Waypoint { x: 0.0, y: 0.0 }
    }

    /// Rotate this point about the origin by `angle` radians (counter‑clockwise).
    ///
    /// # Arguments
    ///
    /// * `angle`: The rotation angle in radians.
    ///
    /// # Returns
    ///
    /// The rotated point.
    pub fn rotate(self, angle: f64) -> Self {
        let (c, s) = (cos(angle), sin(angle));
        Waypoint {
            x: self.x * c - self.y * s,
            y: self.x * s + self.y * c,
        }
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((x, y): (f64, f64)) -> Self {
        Waypoint { x, y }
    }
}

/// A fixed sampling horizon: `time_steps` samples spaced `dt` seconds apart,
/// the first one at `t = 0`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "HorizonParts"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizon {
    time_steps: usize,
    dt: f64,
}

impl Horizon {
    /// Construct a new horizon.
    ///
    /// A horizon of zero steps is valid and produces empty trajectories.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidTimeStep)` if `dt` is not positive and finite.
    pub fn new(time_steps: usize, dt: f64) -> Result<Self, KinematicsError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(KinematicsError::InvalidTimeStep("must be positive and finite"));
        }
        Ok(Horizon { time_steps, dt })
    }

    /// Number of samples.
    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    /// Sampling interval (s).
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Timestamp of sample `index` (s).
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.dt
    }

    /// Total time covered by the horizon, `time_steps * dt` (s).
    pub fn duration(&self) -> f64 {
        self.time_steps as f64 * self.dt
    }

    /// Iterator over the sample timestamps.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.time_steps).map(move |i| self.time_at(i))
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Horizon {
            time_steps: DEFAULT_TIME_STEPS,
            dt: DEFAULT_DT,
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps @ {:.2} s ({:.1} s)",
            self.time_steps,
            self.dt,
            self.duration()
        )
    }
}

/// Closed‑form speed/heading model of the ego vehicle.
///
/// Speed grows linearly from `base_speed`, the longitudinal displacement is
/// `t * speed(t)`, and the heading grows as `steering_rate * t^1.2 / 5`. Each
/// sample is the longitudinal displacement rotated by the heading at that
/// instant; there is no state carried between samples.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "KinematicModelParts"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicModel {
    /// Speed at `t = 0` (m/s).
    base_speed: f64,
    /// Acceleration coefficient (m/s²).
    acceleration: f64,
}

impl KinematicModel {
    /// Construct a new kinematic model.
    ///
    /// # Arguments
    ///
    /// * `base_speed`: Speed at `t = 0` in m/s.
    /// * `acceleration`: Linear speed gain per second in m/s².
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidBaseSpeed)` if `base_speed` is not positive and finite.
    /// Returns `Err(KinematicsError::InvalidAcceleration)` if `acceleration` is not finite.
    pub fn new(base_speed: f64, acceleration: f64) -> Result<Self, KinematicsError> {
        if !(base_speed > 0.0) || !base_speed.is_finite() {
            return Err(KinematicsError::InvalidBaseSpeed("must be positive and finite"));
        }
        if !acceleration.is_finite() {
            return Err(KinematicsError::InvalidAcceleration("must be finite"));
        }
        Ok(KinematicModel {
            base_speed,
            acceleration,
        })
    }

    /// Returns the base speed.
    pub fn base_speed(&self) -> f64 {
        self.base_speed
    }

    /// Returns the acceleration coefficient.
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Speed at time `t` (m/s).
    pub fn speed_at(&self, t: f64) -> f64 {
        self.base_speed + self.acceleration * t
    }

    /// Unrotated longitudinal displacement at time `t` (m).
    pub fn longitudinal_at(&self, t: f64) -> f64 {
        t * self.speed_at(t)
    }

    /// Heading angle at time `t` for the given steering rate (rad).
    ///
    /// The growth is super-linear in `t`, so a constant steering rate bends
    /// the path more sharply the further along the horizon it is.
    pub fn heading_at(steering_rate: f64, t: f64) -> f64 {
        steering_rate * (pow(t, HEADING_EXPONENT) / HEADING_DIVISOR)
    }

    /// Position at time `t` for the given steering rate.
    pub fn waypoint_at(&self, steering_rate: f64, t: f64) -> Waypoint {
        Waypoint::new(self.longitudinal_at(t), 0.0).rotate(Self::heading_at(steering_rate, t))
    }

    /// Lazily sample the model over `horizon`.
    pub fn waypoints<'a>(
        &'a self,
        horizon: &'a Horizon,
        steering_rate: f64,
    ) -> impl Iterator<Item = Waypoint> + 'a {
        horizon
            .times()
            .map(move |t| self.waypoint_at(steering_rate, t))
    }

    /// Generate the full trajectory for `steering_rate` over `horizon`.
    ///
    /// The result has exactly `horizon.time_steps()` waypoints and the first one
    /// (if any) is the origin.
    pub fn generate(&self, horizon: &Horizon, steering_rate: f64) -> Trajectory {
        Trajectory {
            dt: horizon.dt,
            waypoints: self.waypoints(horizon, steering_rate).collect(),
        }
    }
}

impl Default for KinematicModel {
    fn default() -> Self {
        KinematicModel {
            base_speed: DEFAULT_BASE_SPEED,
            acceleration: DEFAULT_ACCELERATION,
        }
    }
}

impl fmt::Display for KinematicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KinematicModel (v0: {:.2} m/s, a: {:.2} m/s²)",
            self.base_speed, self.acceleration
        )
    }
}

/// Axis-aligned bounding box of a set of waypoints.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest x (m).
    pub min_x: f64,
    /// Largest x (m).
    pub max_x: f64,
    /// Smallest y (m).
    pub min_y: f64,
    /// Largest y (m).
    pub max_y: f64,
}

impl Bounds {
    /// Degenerate box containing a single point.
    pub const fn at(point: Waypoint) -> Self {
        Bounds {
            min_x: point.x,
            max_x: point.x,
            min_y: point.y,
            max_y: point.y,
        }
    }

    /// Grow the box to contain `point`.
    pub fn include(&mut self, point: Waypoint) {
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    /// Grow the box to contain `other`.
    pub fn union(&mut self, other: &Bounds) {
        self.include(Waypoint::new(other.min_x, other.min_y));
        self.include(Waypoint::new(other.max_x, other.max_y));
    }

    /// Extent along x (m).
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along y (m).
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point of the box.
    pub fn center(&self) -> Waypoint {
        Waypoint::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// An ordered sequence of waypoints sampled every `dt` seconds from `t = 0`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TrajectoryParts"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    dt: f64,
    waypoints: Vec<Waypoint>,
}

impl Trajectory {
    /// Wrap waypoints produced elsewhere (e.g. by a learned planner).
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidTimeStep)` if `dt` is not positive and finite.
    pub fn from_waypoints(dt: f64, waypoints: Vec<Waypoint>) -> Result<Self, KinematicsError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(KinematicsError::InvalidTimeStep("must be positive and finite"));
        }
        Ok(Trajectory { dt, waypoints })
    }

    /// Sampling interval (s).
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// `true` if the trajectory has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// All waypoints in time order.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Iterator over waypoints in time order.
    pub fn iter(&self) -> core::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    /// Iterator over `(t, waypoint)` pairs.
    pub fn timed(&self) -> impl Iterator<Item = (f64, Waypoint)> + '_ {
        self.waypoints
            .iter()
            .enumerate()
            .map(move |(i, wp)| (i as f64 * self.dt, *wp))
    }

    /// First waypoint, if any.
    pub fn first(&self) -> Option<Waypoint> {
        self.waypoints.first().copied()
    }

    /// Last waypoint, if any.
    pub fn last(&self) -> Option<Waypoint> {
        self.waypoints.last().copied()
    }

    /// Timestamp of the last waypoint (s), `0` for an empty trajectory.
    pub fn end_time(&self) -> f64 {
        self.waypoints.len().saturating_sub(1) as f64 * self.dt
    }

    /// Position at time `t`, linearly interpolated between samples and
    /// clamped to the first/last waypoint outside the sampled range.
    pub fn sample(&self, t: f64) -> Option<Waypoint> {
        let last = self.waypoints.len().checked_sub(1)?;
        if !(t > 0.0) {
            return self.first();
        }
        let pos = t / self.dt;
        let i = pos as usize;
        if i >= last {
            return self.last();
        }
        let frac = pos - i as f64;
        let (a, b) = (self.waypoints[i], self.waypoints[i + 1]);
        Some(Waypoint::new(
            a.x + (b.x - a.x) * frac,
            a.y + (b.y - a.y) * frac,
        ))
    }

    /// Path length along the polyline (m).
    pub fn path_length(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|w| libm::hypot(w[1].x - w[0].x, w[1].y - w[0].y))
            .sum()
    }

    /// Bounding box of all waypoints, `None` if empty.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut iter = self.waypoints.iter();
        let mut bounds = Bounds::at(*iter.next()?);
        for wp in iter {
            bounds.include(*wp);
        }
        Some(bounds)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Waypoint;
    type IntoIter = core::slice::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "Trajectory ({} waypoints, {} -> {} over {:.1} s)",
                self.len(),
                first,
                last,
                self.end_time()
            ),
            _ => write!(f, "Trajectory (empty)"),
        }
    }
}

// Deserialized values go through the same checks as the constructors.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct HorizonParts {
    time_steps: usize,
    dt: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<HorizonParts> for Horizon {
    type Error = KinematicsError;

    fn try_from(parts: HorizonParts) -> Result<Self, Self::Error> {
        Horizon::new(parts.time_steps, parts.dt)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct KinematicModelParts {
    base_speed: f64,
    acceleration: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<KinematicModelParts> for KinematicModel {
    type Error = KinematicsError;

    fn try_from(parts: KinematicModelParts) -> Result<Self, Self::Error> {
        KinematicModel::new(parts.base_speed, parts.acceleration)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct TrajectoryParts {
    dt: f64,
    waypoints: Vec<Waypoint>,
}

#[cfg(feature = "serde")]
impl TryFrom<TrajectoryParts> for Trajectory {
    type Error = KinematicsError;

    fn try_from(parts: TrajectoryParts) -> Result<Self, Self::Error> {
        Trajectory::from_waypoints(parts.dt, parts.waypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    fn default_trajectory(steering_rate: f64) -> Trajectory {
        KinematicModel::default().generate(&Horizon::default(), steering_rate)
    }

    #[test]
    fn test_horizon_constructor() {
        let horizon = Horizon::new(64, 0.1).unwrap();
        assert_eq!(horizon.time_steps(), 64);
        assert_eq!(horizon.dt(), 0.1);
        assert!((horizon.duration() - 6.4).abs() < EPSILON);
        assert_eq!(horizon, Horizon::default());
    }

    #[test]
    fn test_horizon_invalid_dt() {
        assert!(matches!(Horizon::new(64, 0.0), Err(KinematicsError::InvalidTimeStep(_))));
        assert!(matches!(Horizon::new(64, -0.1), Err(KinematicsError::InvalidTimeStep(_))));
        assert!(matches!(Horizon::new(64, f64::NAN), Err(KinematicsError::InvalidTimeStep(_))));
        assert!(matches!(
            Horizon::new(64, f64::INFINITY),
            Err(KinematicsError::InvalidTimeStep(_))
        ));
    }

    #[test]
    fn test_model_constructor() {
        let model = KinematicModel::new(15.0, 0.5).unwrap();
        assert_eq!(model.base_speed(), 15.0);
        assert_eq!(model.acceleration(), 0.5);
        assert_eq!(model, KinematicModel::default());

        assert!(matches!(KinematicModel::new(0.0, 0.5), Err(KinematicsError::InvalidBaseSpeed(_))));
        assert!(matches!(
            KinematicModel::new(15.0, f64::NAN),
            Err(KinematicsError::InvalidAcceleration(_))
        ));
        // Braking is allowed, only non-finite values are rejected.
        assert!(KinematicModel::new(15.0, -0.5).is_ok());
    }

    #[test]
    fn test_speed_profile() {
        let model = KinematicModel::default();
        // speed = 15 + 0.5 * t
        assert!((model.speed_at(0.0) - 15.0).abs() < EPSILON);
        assert!((model.speed_at(2.0) - 16.0).abs() < EPSILON);
        // longitudinal = t * speed = 2 * 16 = 32
        assert!((model.longitudinal_at(2.0) - 32.0).abs() < EPSILON);
    }

    #[test]
    fn test_heading_is_super_linear() {
        // angle = rate * t^1.2 / 5
        let a1 = KinematicModel::heading_at(0.1, 1.0);
        let a2 = KinematicModel::heading_at(0.1, 2.0);
        assert!((a1 - 0.02).abs() < EPSILON);
        assert!(a2 > 2.0 * a1);
        assert_eq!(KinematicModel::heading_at(0.1, 0.0), 0.0);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let p = Waypoint::new(1.0, 0.0).rotate(core::f64::consts::FRAC_PI_2);
        assert!(p.x.abs() < EPSILON);
        assert!((p.y - 1.0).abs() < EPSILON);

        let q = Waypoint::new(0.0, 2.0).rotate(core::f64::consts::PI);
        assert!(q.x.abs() < EPSILON);
        assert!((q.y + 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_straight_line() {
        let trajectory = default_trajectory(0.0);
        assert_eq!(trajectory.len(), 64);
        assert!(trajectory.iter().all(|wp| wp.y == 0.0));
    }

    #[test]
    fn test_straight_line_final_waypoint() {
        let trajectory = default_trajectory(0.0);
        // t = 6.3, speed = 15 + 0.5 * 6.3 = 18.15, x = 6.3 * 18.15 = 114.345
        let last = trajectory.last().unwrap();
        assert!((last.x - 114.345).abs() < 1e-6);
        assert_eq!(last.y, 0.0);
        assert!((trajectory.end_time() - 6.3).abs() < EPSILON);
    }

    #[test]
    fn test_first_waypoint_is_origin() {
        for rate in [0.0, 0.06, -0.15, 3.0] {
            assert_eq!(default_trajectory(rate).first(), Some(Waypoint::origin()));
        }
    }

    #[test]
    fn test_lane_change_sample() {
        let trajectory = default_trajectory(0.06);
        // t = 1.0: speed = 15.5, raw x = 15.5
        // angle = 0.06 * 1^1.2 / 5 = 0.012
        let wp = trajectory.waypoints()[10];
        assert!((wp.x - 15.5 * 0.012f64.cos()).abs() < 1e-9);
        assert!((wp.y - 15.5 * 0.012f64.sin()).abs() < 1e-9);
    }

    #[test]
    fn test_opposite_steering_opposite_sides() {
        let left = default_trajectory(0.06);
        let right = default_trajectory(-0.15);
        for (l, r) in left.iter().zip(right.iter()).skip(1) {
            assert!(l.y > 0.0);
            assert!(r.y < 0.0);
        }
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let horizon = Horizon::new(0, 0.1).unwrap();
        let trajectory = KinematicModel::default().generate(&horizon, 0.06);
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.first(), None);
        assert_eq!(trajectory.bounds(), None);
        assert_eq!(trajectory.sample(1.0), None);
        assert_eq!(trajectory.end_time(), 0.0);
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let trajectory = default_trajectory(0.0);
        let a = trajectory.waypoints()[3];
        let b = trajectory.waypoints()[4];
        let mid = trajectory.sample(0.35).unwrap();
        assert!((mid.x - (a.x + b.x) / 2.0).abs() < 1e-6);
        assert_eq!(trajectory.sample(-1.0), trajectory.first());
        assert_eq!(trajectory.sample(100.0), trajectory.last());
    }

    #[test]
    fn test_bounds() {
        let trajectory = default_trajectory(-0.15);
        let bounds = trajectory.bounds().unwrap();
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_y, 0.0);
        assert!(bounds.min_y < 0.0);
        assert!(bounds.width() > 0.0);

        let mut merged = Bounds::at(Waypoint::origin());
        merged.union(&default_trajectory(0.06).bounds().unwrap());
        assert!(merged.max_y > 0.0);
        assert_eq!(merged.min_y, 0.0);
    }

    #[test]
    fn test_path_length_straight() {
        let trajectory = default_trajectory(0.0);
        assert!((trajectory.path_length() - 114.345).abs() < 1e-6);
    }

    #[test]
    fn test_from_waypoints() {
        let points = alloc::vec![Waypoint::origin(), Waypoint::new(1.0, 0.5)];
        let trajectory = Trajectory::from_waypoints(0.1, points).unwrap();
        assert_eq!(trajectory.len(), 2);
        assert!(matches!(
            Trajectory::from_waypoints(0.0, Vec::new()),
            Err(KinematicsError::InvalidTimeStep(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_runs_constructor_checks() {
        let horizon: Horizon = serde_json::from_str(r#"{"time_steps": 4, "dt": 0.5}"#).unwrap();
        assert_eq!(horizon, Horizon::new(4, 0.5).unwrap());
        assert!(serde_json::from_str::<Horizon>(r#"{"time_steps": 4, "dt": 0.0}"#).is_err());

        assert!(serde_json::from_str::<KinematicModel>(r#"{"base_speed": 15.0, "acceleration": 0.5}"#).is_ok());
        assert!(serde_json::from_str::<KinematicModel>(r#"{"base_speed": -1.0, "acceleration": 0.5}"#).is_err());

        let points = alloc::vec![Waypoint::new(0.0, 0.0), Waypoint::new(1.5, -2.25)];
        let trajectory = Trajectory::from_waypoints(0.5, points).unwrap();
        let json = serde_json::to_string(&trajectory).unwrap();
        assert_eq!(serde_json::from_str::<Trajectory>(&json).unwrap(), trajectory);
        assert!(serde_json::from_str::<Trajectory>(r#"{"dt": -0.1, "waypoints": []}"#).is_err());
    }
}
