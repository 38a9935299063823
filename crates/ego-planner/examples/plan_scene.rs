use ego_kinematics::{Horizon, KinematicModel};
use ego_planner::*;
use image::{Rgb, RgbImage};

fn main() {
    // Synthetic dashcam frame: grey road below a blue sky.
    let frame = RgbImage::from_fn(320, 180, |_, y| {
        if y < 90 { Rgb([110, 160, 230]) } else { Rgb([70, 70, 70]) }
    });
    let tensor = ImageTensor::from_rgb(&frame);
    println!("Frame tensor shape: {:?}", tensor.shape());

    let request = PlannerRequest::new(
        Conversation::for_image(tensor),
        EgoHistory::default(),
        SamplingParams::default(),
    );

    // Pretend the 4-bit load runs out of memory so the 8-bit path is exercised.
    let loaded = load_with_fallback(&Quantization::FALLBACK_ORDER, |mode| match mode {
        Quantization::Nf4 => Err(PlannerError::Load {
            quantization: mode,
            reason: "not enough memory for 4-bit kernels".into(),
        }),
        Quantization::Int8 => Ok(KinematicPlanner::new(
            KinematicModel::default(),
            Horizon::default(),
            0.06,
            mode,
        )),
    });

    let mut planner = match loaded {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Failed to load planner: {}", e);
            return;
        }
    };
    println!("Loaded '{}' planner with {} weights", planner.name(), planner.quantization());

    match planner.plan(&request) {
        Ok(output) => {
            println!("\nReasoning:\n{}", output.reasoning);
            if let Some(trajectory) = output.primary() {
                println!("\n{}", trajectory);
            }
        }
        Err(e) => eprintln!("{}", e),
    }
}
