use ego_kinematics::{Horizon, KinematicModel, Waypoint};
use proptest::prelude::*;

const EPSILON: f64 = 1e-9;

proptest! {
    #[test]
    fn length_matches_time_steps(
        time_steps in 0usize..512,
        dt in 0.001f64..1.0,
        steering_rate in -1.0f64..1.0,
    ) {
        let horizon = Horizon::new(time_steps, dt).unwrap();
        let trajectory = KinematicModel::default().generate(&horizon, steering_rate);
        prop_assert_eq!(trajectory.len(), time_steps);
    }

    #[test]
    fn starts_at_origin(
        time_steps in 1usize..256,
        dt in 0.001f64..1.0,
        steering_rate in -5.0f64..5.0,
    ) {
        let horizon = Horizon::new(time_steps, dt).unwrap();
        let trajectory = KinematicModel::default().generate(&horizon, steering_rate);
        prop_assert_eq!(trajectory.first(), Some(Waypoint::origin()));
    }

    #[test]
    fn zero_steering_stays_on_centerline(
        time_steps in 0usize..256,
        dt in 0.001f64..1.0,
        base_speed in 0.1f64..60.0,
        acceleration in -0.01f64..3.0,
    ) {
        let horizon = Horizon::new(time_steps, dt).unwrap();
        let model = KinematicModel::new(base_speed, acceleration).unwrap();
        for wp in model.generate(&horizon, 0.0).iter() {
            prop_assert_eq!(wp.y, 0.0);
        }
    }

    #[test]
    fn lateral_offset_follows_steering_sign(
        steering_rate in prop_oneof![-0.5f64..-0.001, 0.001f64..0.5],
    ) {
        let trajectory = KinematicModel::default().generate(&Horizon::default(), steering_rate);
        for wp in trajectory.iter().skip(1) {
            prop_assert!(wp.y != 0.0);
            prop_assert_eq!(wp.y.signum(), steering_rate.signum());
        }
    }

    #[test]
    fn mirrored_steering_mirrors_path(steering_rate in 0.0f64..2.0) {
        let model = KinematicModel::default();
        let horizon = Horizon::default();
        let left = model.generate(&horizon, steering_rate);
        let right = model.generate(&horizon, -steering_rate);
        for (l, r) in left.iter().zip(right.iter()) {
            prop_assert!((l.x - r.x).abs() < EPSILON);
            prop_assert!((l.y + r.y).abs() < EPSILON);
        }
    }

    #[test]
    fn longitudinal_displacement_increases(
        base_speed in 0.1f64..60.0,
        acceleration in 0.0f64..3.0,
        dt in 0.01f64..1.0,
    ) {
        let model = KinematicModel::new(base_speed, acceleration).unwrap();
        let horizon = Horizon::new(64, dt).unwrap();
        let raw: Vec<f64> = horizon.times().map(|t| model.longitudinal_at(t)).collect();
        for pair in raw.windows(2) {
            prop_assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn distance_from_origin_is_unrotated_displacement(
        steering_rate in -2.0f64..2.0,
    ) {
        // Rotation preserves the norm of the longitudinal displacement.
        let model = KinematicModel::default();
        let horizon = Horizon::default();
        let trajectory = model.generate(&horizon, steering_rate);
        for (t, wp) in trajectory.timed() {
            let norm = (wp.x * wp.x + wp.y * wp.y).sqrt();
            prop_assert!((norm - model.longitudinal_at(t)).abs() < 1e-6);
        }
    }
}

#[test]
fn preset_scenarios_match_reference_values() {
    let model = KinematicModel::default();
    let horizon = Horizon::default();

    let cruise = model.generate(&horizon, 0.0);
    let last = cruise.last().unwrap();
    assert!((last.x - 114.345).abs() < 1e-6);
    assert_eq!(last.y, 0.0);

    let lane_change = model.generate(&horizon, 0.06);
    let evasive = model.generate(&horizon, -0.15);
    assert!(lane_change.last().unwrap().y > 0.0);
    assert!(evasive.last().unwrap().y < 0.0);
    // The evasive turn has the larger steering magnitude, so it deviates further.
    assert!(evasive.last().unwrap().y.abs() > lane_change.last().unwrap().y.abs());
}
