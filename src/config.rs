use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use ego_kinematics::{Horizon, KinematicModel};
use ego_planner::{Quantization, SamplingParams, DEFAULT_USER_PROMPT, HISTORY_STEPS};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::scenario::{Color, Scenario};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "EGO";
/// Largest accepted raster side; keeps the canvas allocation bounded.
pub const MAX_FIGURE_SIDE_PX: u32 = 16384;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub scenarios: Vec<ScenarioSettings>,
    pub verification: FigureSettings,
    pub inference: InferenceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub time_steps: usize,
    pub dt: f64,
    pub base_speed: f64,
    pub acceleration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSettings {
    pub name: String,
    pub steering_rate: f64,
    /// `#rrggbb`
    pub color: String,
    pub opacity: f32,
}

/// Output raster: path plus matplotlib-style figure size and resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureSettings {
    pub path: PathBuf,
    pub width_in: f32,
    pub height_in: f32,
    pub dpi: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub model_id: String,
    pub image_path: PathBuf,
    pub prompt: String,
    pub history_steps: usize,
    /// Load order; later entries are fallbacks.
    pub quantization: Vec<Quantization>,
    /// Steering rate of the kinematic backend.
    pub steering_rate: f64,
    pub sampling: SamplingParams,
    pub plot: FigureSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            simulation: SimulationSettings::default(),
            scenarios: Scenario::presets().iter().map(ScenarioSettings::from).collect(),
            verification: FigureSettings::default(),
            inference: InferenceSettings::default(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            time_steps: ego_kinematics::DEFAULT_TIME_STEPS,
            dt: ego_kinematics::DEFAULT_DT,
            base_speed: ego_kinematics::DEFAULT_BASE_SPEED,
            acceleration: ego_kinematics::DEFAULT_ACCELERATION,
        }
    }
}

impl Default for FigureSettings {
    fn default() -> Self {
        FigureSettings {
            path: PathBuf::from("visualization/trajectory_verification.png"),
            width_in: 12.0,
            height_in: 8.0,
            dpi: 200.0,
        }
    }
}

impl Default for InferenceSettings {
    fn default() -> Self {
        InferenceSettings {
            model_id: "nvidia/Alpamayo-R1-10B".to_string(),
            image_path: PathBuf::from("data/test_scene.jpg"),
            prompt: DEFAULT_USER_PROMPT.to_string(),
            history_steps: HISTORY_STEPS,
            quantization: Quantization::FALLBACK_ORDER.to_vec(),
            steering_rate: 0.0,
            sampling: SamplingParams::default(),
            plot: FigureSettings {
                path: PathBuf::from("data/trajectory_plot.png"),
                width_in: 8.0,
                height_in: 6.0,
                dpi: 150.0,
            },
        }
    }
}

impl From<&Scenario> for ScenarioSettings {
    fn from(scenario: &Scenario) -> Self {
        ScenarioSettings {
            name: scenario.name.clone(),
            steering_rate: scenario.steering_rate,
            color: scenario.color.to_string(),
            opacity: scenario.opacity,
        }
    }
}

impl FigureSettings {
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        let sides = [self.width_in * self.dpi, self.height_in * self.dpi];
        if !(self.dpi > 0.0) || sides.iter().any(|px| !px.is_finite() || px.round() < 1.0) {
            return Err(invalid(format!("{section}: figure size and dpi must be positive and finite")));
        }
        if sides.iter().any(|px| px.round() > MAX_FIGURE_SIDE_PX as f32) {
            return Err(invalid(format!(
                "{section}: figure is larger than {MAX_FIGURE_SIDE_PX} px on a side"
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(invalid(format!("{section}: output path is empty")));
        }
        Ok(())
    }
}

impl Settings {
    /// Load settings: built-in defaults, then the TOML file, then `EGO__*` environment variables.
    ///
    /// A missing file is only an error when `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Settings, ConfigError> {
        Self::load_layered(path, required, ENV_PREFIX)
    }

    fn load_layered(path: &Path, required: bool, env_prefix: &str) -> Result<Settings, ConfigError> {
        info!("Attempting to load configuration from {}", path.display());

        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(required))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize::<Settings>())
            .and_then(|settings| settings.validate().map(|()| settings));

        match settings {
            Ok(settings) => {
                info!(
                    scenarios = settings.scenarios.len(),
                    time_steps = settings.simulation.time_steps,
                    dt = settings.simulation.dt,
                    "Successfully loaded configuration"
                );
                debug!(?settings, "Effective configuration");
                Ok(settings)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(e)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.horizon()?;
        self.model()?;
        self.scenarios()?;
        self.verification.validate("verification")?;
        self.inference.plot.validate("inference.plot")?;
        if self.inference.quantization.is_empty() {
            return Err(invalid("inference.quantization: at least one mode is required".into()));
        }
        if !self.inference.steering_rate.is_finite() {
            return Err(invalid("inference.steering_rate must be finite".into()));
        }
        if self.inference.history_steps == 0 {
            return Err(invalid("inference.history_steps must be at least 1".into()));
        }
        self.inference
            .sampling
            .validate()
            .map_err(|e| invalid(format!("inference.sampling: {e}")))
    }

    pub fn horizon(&self) -> Result<Horizon, ConfigError> {
        Horizon::new(self.simulation.time_steps, self.simulation.dt)
            .map_err(|e| invalid(format!("simulation: {e}")))
    }

    pub fn model(&self) -> Result<KinematicModel, ConfigError> {
        KinematicModel::new(self.simulation.base_speed, self.simulation.acceleration)
            .map_err(|e| invalid(format!("simulation: {e}")))
    }

    pub fn scenarios(&self) -> Result<Vec<Scenario>, ConfigError> {
        self.scenarios
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if s.name.trim().is_empty() {
                    return Err(invalid(format!("scenarios[{i}]: name is empty")));
                }
                if !s.steering_rate.is_finite() {
                    return Err(invalid(format!("scenarios[{i}]: steering_rate must be finite")));
                }
                if !(0.0..=1.0).contains(&s.opacity) {
                    return Err(invalid(format!("scenarios[{i}]: opacity must be in [0, 1]")));
                }
                let color = Color::from_hex(&s.color)
                    .ok_or_else(|| invalid(format!("scenarios[{i}]: invalid color '{}'", s.color)))?;
                Ok(Scenario::new(s.name.clone(), s.steering_rate, color, s.opacity))
            })
            .collect()
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::Message(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ego-trajectory-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_match_reference_constants() {
        let settings = Settings::default();
        assert_eq!(settings.simulation.time_steps, 64);
        assert_eq!(settings.simulation.dt, 0.1);
        assert_eq!(settings.simulation.base_speed, 15.0);
        assert_eq!(settings.simulation.acceleration, 0.5);
        assert_eq!(settings.scenarios().unwrap(), Scenario::presets());
        assert_eq!(settings.verification.pixel_size(), (2400, 1600));
        assert_eq!(settings.inference.plot.pixel_size(), (1200, 900));
        assert_eq!(settings.inference.quantization, vec![Quantization::Nf4, Quantization::Int8]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let settings = Settings::load(Path::new("does/not/exist.toml"), false).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_required_file_fails() {
        assert!(Settings::load(Path::new("does/not/exist.toml"), true).is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = write_config(
            "override",
            r##"
[simulation]
time_steps = 32
dt = 0.2

[[scenarios]]
name = "Hard Left"
steering_rate = 0.3
color = "#abcdef"
opacity = 0.5

[inference]
quantization = ["int8"]
"##,
        );
        let settings = Settings::load(&path, true).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.simulation.time_steps, 32);
        assert_eq!(settings.simulation.dt, 0.2);
        // Untouched keys keep their defaults.
        assert_eq!(settings.simulation.base_speed, 15.0);
        let scenarios = settings.scenarios().unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].color, Color::rgb(0xab, 0xcd, 0xef));
        assert_eq!(settings.inference.quantization, vec![Quantization::Int8]);
        assert_eq!(settings.inference.sampling, SamplingParams::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.simulation.dt = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.scenarios[0].color = "teal".into();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.scenarios[1].opacity = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.inference.quantization.clear();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.verification.dpi = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_figures_are_rejected() {
        let mut settings = Settings::default();
        settings.verification.width_in = 1e9;
        settings.verification.height_in = 1e9;
        assert!(settings.validate().is_err());

        // 100 in at 1000 dpi is 100000 px wide.
        let mut settings = Settings::default();
        settings.inference.plot.width_in = 100.0;
        settings.inference.plot.dpi = 1000.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.verification.height_in = f32::INFINITY;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.verification.width_in = f32::NAN;
        assert!(settings.validate().is_err());

        // Exactly at the limit is still fine.
        let mut settings = Settings::default();
        settings.verification.width_in = MAX_FIGURE_SIDE_PX as f32 / settings.verification.dpi;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_non_finite_inference_steering_rate_is_rejected() {
        let mut settings = Settings::default();
        settings.inference.steering_rate = f64::INFINITY;
        assert!(settings.validate().is_err());

        settings.inference.steering_rate = f64::NAN;
        assert!(settings.validate().is_err());

        settings.inference.steering_rate = -0.15;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_file() {
        // A prefix of its own keeps this test from leaking into other loads.
        let prefix = "EGO_ENVTEST";
        let path = write_config(
            "env",
            r##"
[simulation]
time_steps = 32
dt = 0.2
"##,
        );
        // SAFETY: only this test reads or writes variables with this prefix.
        unsafe {
            std::env::set_var("EGO_ENVTEST__SIMULATION__DT", "0.05");
            std::env::set_var("EGO_ENVTEST__INFERENCE__HISTORY_STEPS", "8");
        }
        let settings = Settings::load_layered(&path, true, prefix);
        unsafe {
            std::env::remove_var("EGO_ENVTEST__SIMULATION__DT");
            std::env::remove_var("EGO_ENVTEST__INFERENCE__HISTORY_STEPS");
        }
        std::fs::remove_file(&path).unwrap();

        let settings = settings.unwrap();
        assert_eq!(settings.simulation.dt, 0.05);
        assert_eq!(settings.inference.history_steps, 8);
        // The file still supplies what the environment leaves alone.
        assert_eq!(settings.simulation.time_steps, 32);
    }

    #[test]
    fn test_zero_time_steps_is_allowed() {
        let mut settings = Settings::default();
        settings.simulation.time_steps = 0;
        assert!(settings.validate().is_ok());
        assert_eq!(settings.horizon().unwrap().time_steps(), 0);
    }
}
