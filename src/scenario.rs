use std::fmt;

use ego_kinematics::{Horizon, KinematicModel, Trajectory};

/// 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const YELLOW: Color = Color::rgb(0xff, 0xff, 0x00);
    pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xff);
    pub const GREEN: Color = Color::rgb(0x00, 0x80, 0x00);
    pub const RED: Color = Color::rgb(0xff, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A named steering preset and how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub steering_rate: f64,
    pub color: Color,
    /// Line opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steering_rate: f64, color: Color, opacity: f32) -> Self {
        Scenario {
            name: name.into(),
            steering_rate,
            color,
            opacity,
        }
    }

    /// Straight cruise, gentle left lane change, sharp evasive right.
    pub fn presets() -> Vec<Scenario> {
        vec![
            Scenario::new("Cruising (Straight)", 0.0, Color::rgb(0x00, 0xff, 0xcc), 0.8),
            Scenario::new("Lane Change (Left)", 0.06, Color::rgb(0x33, 0x99, 0xff), 0.9),
            Scenario::new("Evasive Maneuver (Right)", -0.15, Color::rgb(0xff, 0x33, 0x66), 1.0),
        ]
    }
}

/// A scenario together with its generated trajectory.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub scenario: Scenario,
    pub trajectory: Trajectory,
}

/// Generate one trajectory per scenario, in order.
pub fn run_all(model: &KinematicModel, horizon: &Horizon, scenarios: &[Scenario]) -> Vec<ScenarioRun> {
    scenarios
        .iter()
        .map(|scenario| ScenarioRun {
            scenario: scenario.clone(),
            trajectory: model.generate(horizon, scenario.steering_rate),
        })
        .collect()
}
