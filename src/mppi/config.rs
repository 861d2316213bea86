//! Controller configuration.
//!
//! Every struct deserializes from TOML with per-field defaults, so a
//! config file only needs to list the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::{MppiError, MppiResult};

/// Kinematic model used to roll out trajectories
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MotionModelKind {
    DiffDrive,
    Omni,
    Ackermann { min_turning_r: f64 },
}

impl Default for MotionModelKind {
    fn default() -> Self {
        MotionModelKind::DiffDrive
    }
}

/// Per-channel standard deviation of the sampling noise
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub vx_std: f64,
    pub vy_std: f64,
    pub wz_std: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { vx_std: 0.2, vy_std: 0.2, wz_std: 0.4 }
    }
}

/// Velocity and acceleration bounds
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintsConfig {
    pub vx_max: f64,
    pub vx_min: f64,
    pub vy_max: f64,
    pub wz_max: f64,
    /// Forward acceleration limit (m/s^2, > 0)
    pub ax_max: f64,
    /// Deceleration limit (m/s^2, < 0)
    pub ax_min: f64,
    pub ay_max: f64,
    pub az_max: f64,
}

impl Default for ConstraintsConfig {
    fn default() -> Self {
        Self {
            vx_max: 0.5,
            vx_min: -0.35,
            vy_max: 0.5,
            wz_max: 1.9,
            ax_max: 3.0,
            ax_min: -3.0,
            ay_max: 3.0,
            az_max: 3.5,
        }
    }
}

/// Settings of the sampling optimizer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Integration step of the rollouts [s]
    pub model_dt: f64,
    /// Horizon length T
    pub time_steps: usize,
    /// Number of sampled trajectories N
    pub batch_size: usize,
    pub iteration_count: usize,
    /// Softmax temperature (lambda)
    pub temperature: f64,
    /// Weight of the control cost term
    pub gamma: f64,
    pub retry_attempt_limit: usize,
    pub shift_control_sequence: bool,
    /// Stop iterating once the nominal sequence moves less than this
    pub convergence_tolerance: Option<f64>,
    pub publish_diagnostics: bool,
    pub goal_tolerance: f64,
    pub enable_filter: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            model_dt: 0.05,
            time_steps: 56,
            batch_size: 1000,
            iteration_count: 1,
            temperature: 0.3,
            gamma: 0.015,
            retry_attempt_limit: 1,
            shift_control_sequence: false,
            convergence_tolerance: None,
            publish_diagnostics: false,
            goal_tolerance: 0.25,
            enable_filter: true,
        }
    }
}

/// Reference path preprocessing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathHandlerConfig {
    /// Length of path kept ahead of the robot [m]
    pub prune_distance: f64,
    pub enforce_path_inversion: bool,
    pub inversion_xy_tolerance: f64,
    pub inversion_yaw_tolerance: f64,
}

impl Default for PathHandlerConfig {
    fn default() -> Self {
        Self {
            prune_distance: 1.5,
            enforce_path_inversion: false,
            inversion_xy_tolerance: 0.2,
            inversion_yaw_tolerance: 0.4,
        }
    }
}

/// Critic identifiers, in the order they appear in the pipeline config
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriticKind {
    Constraint,
    Obstacles,
    Goal,
    GoalAngle,
    PathAlign,
    PathFollow,
    PathAngle,
    PreferForward,
    Twirling,
    VelocitySmoothness,
}

/// How the path angle critic treats driving direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathAngleMode {
    ForwardPreference,
    NoDirectionalPreference,
    ConsiderFeasiblePathOrientations,
}

/// Parameters shared by every critic
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CriticWeight {
    pub enabled: bool,
    pub cost_weight: f64,
    pub cost_power: u32,
}

impl CriticWeight {
    pub fn new(cost_weight: f64, cost_power: u32) -> Self {
        Self { enabled: true, cost_weight, cost_power }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintCriticConfig {
    pub weight: CriticWeight,
}

impl Default for ConstraintCriticConfig {
    fn default() -> Self {
        Self { weight: CriticWeight::new(4.0, 1) }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstaclesCriticConfig {
    /// Cost assigned to a trajectory that enters a lethal cell
    pub collision_cost: f64,
    /// Cell cost above which `critical_cost` is added
    pub critical_threshold: u8,
    pub critical_cost: f64,
    pub weight: CriticWeight,
}

impl Default for ObstaclesCriticConfig {
    fn default() -> Self {
        Self {
            weight: CriticWeight::new(3.81, 1),
            collision_cost: 10_000.0,
            critical_threshold: 200,
            critical_cost: 300.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalCriticConfig {
    pub threshold_to_consider: f64,
    pub weight: CriticWeight,
}

impl Default for GoalCriticConfig {
    fn default() -> Self {
        Self { weight: CriticWeight::new(5.0, 1), threshold_to_consider: 1.4 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalAngleCriticConfig {
    pub threshold_to_consider: f64,
    pub weight: CriticWeight,
}

impl Default for GoalAngleCriticConfig {
    fn default() -> Self {
        Self { weight: CriticWeight::new(3.0, 1), threshold_to_consider: 0.5 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathAlignCriticConfig {
    pub offset_from_furthest: usize,
    pub trajectory_point_step: usize,
    pub threshold_to_consider: f64,
    pub max_path_occupancy_ratio: f64,
    pub use_path_orientations: bool,
    pub weight: CriticWeight,
}

impl Default for PathAlignCriticConfig {
    fn default() -> Self {
        Self {
            weight: CriticWeight::new(10.0, 1),
            offset_from_furthest: 20,
            trajectory_point_step: 4,
            threshold_to_consider: 0.5,
            max_path_occupancy_ratio: 0.07,
            use_path_orientations: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFollowCriticConfig {
    pub offset_from_furthest: usize,
    pub threshold_to_consider: f64,
    pub weight: CriticWeight,
}

impl Default for PathFollowCriticConfig {
    fn default() -> Self {
        Self {
            weight: CriticWeight::new(5.0, 1),
            offset_from_furthest: 6,
            threshold_to_consider: 1.4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathAngleCriticConfig {
    pub offset_from_furthest: usize,
    pub threshold_to_consider: f64,
    pub max_angle_to_furthest: f64,
    pub mode: PathAngleMode,
    pub weight: CriticWeight,
}

impl Default for PathAngleCriticConfig {
    fn default() -> Self {
        Self {
            weight: CriticWeight::new(2.2, 1),
            offset_from_furthest: 4,
            threshold_to_consider: 0.5,
            max_angle_to_furthest: 0.785398,
            mode: PathAngleMode::ForwardPreference,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferForwardCriticConfig {
    pub threshold_to_consider: f64,
    pub weight: CriticWeight,
}

impl Default for PreferForwardCriticConfig {
    fn default() -> Self {
        Self { weight: CriticWeight::new(5.0, 1), threshold_to_consider: 0.5 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TwirlingCriticConfig {
    pub weight: CriticWeight,
}

impl Default for TwirlingCriticConfig {
    fn default() -> Self {
        let mut weight = CriticWeight::new(10.0, 1);
        weight.enabled = false;
        Self { weight }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocitySmoothnessCriticConfig {
    pub weight: CriticWeight,
}

impl Default for VelocitySmoothnessCriticConfig {
    fn default() -> Self {
        Self { weight: CriticWeight::new(1.0, 1) }
    }
}

/// Critic pipeline: evaluation order plus per-critic parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticsConfig {
    pub order: Vec<CriticKind>,
    pub constraint: ConstraintCriticConfig,
    pub obstacles: ObstaclesCriticConfig,
    pub goal: GoalCriticConfig,
    pub goal_angle: GoalAngleCriticConfig,
    pub path_align: PathAlignCriticConfig,
    pub path_follow: PathFollowCriticConfig,
    pub path_angle: PathAngleCriticConfig,
    pub prefer_forward: PreferForwardCriticConfig,
    pub twirling: TwirlingCriticConfig,
    pub velocity_smoothness: VelocitySmoothnessCriticConfig,
}

impl Default for CriticsConfig {
    fn default() -> Self {
        Self {
            order: vec![
                CriticKind::Constraint,
                CriticKind::Obstacles,
                CriticKind::Goal,
                CriticKind::GoalAngle,
                CriticKind::PathAlign,
                CriticKind::PathFollow,
                CriticKind::PathAngle,
                CriticKind::PreferForward,
                CriticKind::Twirling,
                CriticKind::VelocitySmoothness,
            ],
            constraint: ConstraintCriticConfig::default(),
            obstacles: ObstaclesCriticConfig::default(),
            goal: GoalCriticConfig::default(),
            goal_angle: GoalAngleCriticConfig::default(),
            path_align: PathAlignCriticConfig::default(),
            path_follow: PathFollowCriticConfig::default(),
            path_angle: PathAngleCriticConfig::default(),
            prefer_forward: PreferForwardCriticConfig::default(),
            twirling: TwirlingCriticConfig::default(),
            velocity_smoothness: VelocitySmoothnessCriticConfig::default(),
        }
    }
}

/// Complete controller configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MppiConfig {
    pub optimizer: OptimizerConfig,
    pub noise: NoiseConfig,
    pub constraints: ConstraintsConfig,
    pub motion_model: MotionModelKind,
    pub path_handler: PathHandlerConfig,
    pub critics: CriticsConfig,
}

impl MppiConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> MppiResult<Self> {
        let config: MppiConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> MppiResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> MppiResult<String> {
        toml::to_string(self).map_err(|e| MppiError::Config(e.to_string()))
    }

    pub fn is_holonomic(&self) -> bool {
        self.motion_model == MotionModelKind::Omni
    }

    /// Replace invalid values with safe defaults, logging each correction
    pub fn sanitized(mut self) -> Self {
        let defaults = MppiConfig::default();
        let opt = &mut self.optimizer;

        fix_positive(&mut opt.model_dt, defaults.optimizer.model_dt, "optimizer.model_dt");
        fix_positive(&mut opt.temperature, defaults.optimizer.temperature, "optimizer.temperature");
        fix_non_negative(&mut opt.gamma, defaults.optimizer.gamma, "optimizer.gamma");
        fix_non_negative(&mut opt.goal_tolerance, defaults.optimizer.goal_tolerance, "optimizer.goal_tolerance");
        if opt.time_steps < 2 {
            warn!("optimizer.time_steps = {} is too short, using {}", opt.time_steps, defaults.optimizer.time_steps);
            opt.time_steps = defaults.optimizer.time_steps;
        }
        if opt.batch_size == 0 {
            warn!("optimizer.batch_size must be > 0, using {}", defaults.optimizer.batch_size);
            opt.batch_size = defaults.optimizer.batch_size;
        }
        if opt.iteration_count == 0 {
            warn!("optimizer.iteration_count must be > 0, using 1");
            opt.iteration_count = 1;
        }
        if let Some(tol) = opt.convergence_tolerance {
            if !(tol > 0.0) {
                warn!("optimizer.convergence_tolerance = {} disables convergence checks", tol);
                opt.convergence_tolerance = None;
            }
        }

        let noise = &mut self.noise;
        fix_non_negative(&mut noise.vx_std, defaults.noise.vx_std, "noise.vx_std");
        fix_non_negative(&mut noise.vy_std, defaults.noise.vy_std, "noise.vy_std");
        fix_non_negative(&mut noise.wz_std, defaults.noise.wz_std, "noise.wz_std");

        let c = &mut self.constraints;
        let dc = &defaults.constraints;
        fix_positive(&mut c.vx_max, dc.vx_max, "constraints.vx_max");
        fix_non_negative(&mut c.vy_max, dc.vy_max, "constraints.vy_max");
        fix_positive(&mut c.wz_max, dc.wz_max, "constraints.wz_max");
        if c.vx_min > c.vx_max {
            warn!("constraints.vx_min = {} exceeds vx_max, using {}", c.vx_min, -c.vx_max);
            c.vx_min = -c.vx_max;
        }
        fix_positive(&mut c.ax_max, dc.ax_max, "constraints.ax_max");
        if !(c.ax_min < 0.0) {
            warn!("constraints.ax_min = {} must be negative, using {}", c.ax_min, dc.ax_min);
            c.ax_min = dc.ax_min;
        }
        fix_positive(&mut c.ay_max, dc.ay_max, "constraints.ay_max");
        fix_positive(&mut c.az_max, dc.az_max, "constraints.az_max");

        if let MotionModelKind::Ackermann { min_turning_r } = &mut self.motion_model {
            if !(*min_turning_r > 0.0) {
                warn!("motion_model.min_turning_r = {} must be positive, using 0.2", min_turning_r);
                *min_turning_r = 0.2;
            }
        }

        let ph = &mut self.path_handler;
        fix_positive(&mut ph.prune_distance, defaults.path_handler.prune_distance, "path_handler.prune_distance");

        let critics = &mut self.critics;
        if critics.path_align.trajectory_point_step == 0 {
            warn!("critics.path_align.trajectory_point_step must be > 0, using 1");
            critics.path_align.trajectory_point_step = 1;
        }

        self
    }
}

fn fix_positive(value: &mut f64, default: f64, name: &str) {
    if !(*value > 0.0) || !value.is_finite() {
        warn!("{} = {} must be positive, using {}", name, value, default);
        *value = default;
    }
}

fn fix_non_negative(value: &mut f64, default: f64, name: &str) {
    if !(*value >= 0.0) || !value.is_finite() {
        warn!("{} = {} must be non-negative, using {}", name, value, default);
        *value = default;
    }
}
