use ego_kinematics::*;

fn main() {
    let base_speed = DEFAULT_BASE_SPEED;
    let acceleration = DEFAULT_ACCELERATION;
    let steering_rate = 0.06; // Gentle lane change to the left
    let model_result = KinematicModel::new(base_speed, acceleration);

    let horizon = match Horizon::new(DEFAULT_TIME_STEPS, DEFAULT_DT) {
        Ok(horizon) => horizon,
        Err(e) => {
            eprintln!("Failed to build horizon: {}", e);
            return;
        }
    };

    match model_result {
        Ok(model) => {
            println!("Initializing scenario...");
            println!("  Kinematic Model:");
            println!("    Base Speed:   {} m/s", model.base_speed());
            println!("    Acceleration: {} m/s^2", model.acceleration());
            println!("  Horizon:        {}", horizon);
            println!("  Steering Rate:  {}", steering_rate);
            println!("\nSampling...");

            let trajectory = model.generate(&horizon, steering_rate);
            for (i, (t, wp)) in trajectory.timed().enumerate().step_by(8) {
                let heading = KinematicModel::heading_at(steering_rate, t);
                println!(
                    "Step {:>2} (t={:.1}s): {} heading={:.4} rad speed={:.2} m/s",
                    i,
                    t,
                    wp,
                    heading,
                    model.speed_at(t)
                );
            }

            println!("\nSampling complete.");
            println!("{}", trajectory);
            println!("Path length: {:.2} m", trajectory.path_length());
        }
        Err(e) => {
            eprintln!("Failed to initialize kinematic model: {:?}", e);
            eprintln!(
                "Please ensure base_speed ({}) is positive and acceleration ({}) is finite.",
                base_speed, acceleration
            );
        }
    }
}
