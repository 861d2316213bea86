//! Kinematic models and the batch rollout of sampled velocities

use rayon::prelude::*;

use crate::common::{Control, MotionModel, Pose2D};
use crate::mppi::config::{ConstraintsConfig, MotionModelKind};
use crate::mppi::trajectories::{BatchState, Trajectories};
use crate::utils::geometry::normalize_angle;

/// Differential drive: no lateral velocity
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffDriveModel;

impl MotionModel for DiffDriveModel {
    fn is_holonomic(&self) -> bool {
        false
    }

    fn constrain(&self, control: Control) -> Control {
        Control::new(control.vx, 0.0, control.wz)
    }
}

/// Omnidirectional drive
#[derive(Debug, Clone, Copy, Default)]
pub struct OmniModel;

impl MotionModel for OmniModel {
    fn is_holonomic(&self) -> bool {
        true
    }
}

/// Car-like robot with a minimum turning radius
#[derive(Debug, Clone, Copy)]
pub struct AckermannModel {
    pub min_turning_r: f64,
}

impl MotionModel for AckermannModel {
    fn is_holonomic(&self) -> bool {
        false
    }

    /// Shrink `|wz|` until `|vx / wz| >= min_turning_r`
    fn constrain(&self, control: Control) -> Control {
        let max_wz = control.vx.abs() / self.min_turning_r;
        Control::new(control.vx, 0.0, control.wz.clamp(-max_wz, max_wz))
    }
}

pub fn create_motion_model(kind: MotionModelKind) -> Box<dyn MotionModel> {
    match kind {
        MotionModelKind::DiffDrive => Box::new(DiffDriveModel),
        MotionModelKind::Omni => Box::new(OmniModel),
        MotionModelKind::Ackermann { min_turning_r } => Box::new(AckermannModel { min_turning_r }),
    }
}

/// Clamp a command to the velocity bounds and the model limits
pub fn bound_control(control: Control, limits: &ConstraintsConfig, model: &dyn MotionModel) -> Control {
    let bounded = Control::new(
        control.vx.clamp(limits.vx_min, limits.vx_max),
        control.vy.clamp(-limits.vy_max, limits.vy_max),
        control.wz.clamp(-limits.wz_max, limits.wz_max),
    );
    model.constrain(bounded)
}

/// Velocity reachable from `current` towards `target` in one step
fn accel_limited_vx(current: f64, target: f64, limits: &ConstraintsConfig, dt: f64) -> f64 {
    // ax_max speeds up, ax_min (negative) slows down, mirrored when reversing
    let (lower, upper) = if current >= 0.0 {
        (current + limits.ax_min * dt, current + limits.ax_max * dt)
    } else {
        (current - limits.ax_max * dt, current - limits.ax_min * dt)
    };
    target.clamp(lower, upper)
}

fn accel_limited(current: f64, target: f64, max_accel: f64, dt: f64) -> f64 {
    target.clamp(current - max_accel * dt, current + max_accel * dt)
}

/// Fill `state.vx/vy/wz` from the sampled controls.
///
/// Column 0 is the measured robot speed; every later column follows the
/// previous column's command within the acceleration limits.
pub fn predict_velocities(state: &mut BatchState, speed: &Control, limits: &ConstraintsConfig, dt: f64) {
    let (n, t) = (state.batch_size(), state.time_steps());
    for i in 0..n {
        state.vx[(i, 0)] = speed.vx;
        state.vy[(i, 0)] = speed.vy;
        state.wz[(i, 0)] = speed.wz;
    }
    for j in 1..t {
        for i in 0..n {
            state.vx[(i, j)] = accel_limited_vx(state.vx[(i, j - 1)], state.cvx[(i, j - 1)], limits, dt);
            state.vy[(i, j)] = accel_limited(state.vy[(i, j - 1)], state.cvy[(i, j - 1)], limits.ay_max, dt);
            state.wz[(i, j)] = accel_limited(state.wz[(i, j - 1)], state.cwz[(i, j - 1)], limits.az_max, dt);
        }
    }
}

/// Integrate the state velocities of every trajectory from `state.pose`
pub fn integrate_state_velocities(state: &BatchState, model: &dyn MotionModel, dt: f64) -> Trajectories {
    let (n, t) = (state.batch_size(), state.time_steps());

    let rows: Vec<Vec<Pose2D>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut pose = state.pose;
            (0..t)
                .map(|j| {
                    let control = Control::new(state.vx[(i, j)], state.vy[(i, j)], state.wz[(i, j)]);
                    pose = model.propagate(&pose, &control, dt);
                    pose.yaw = normalize_angle(pose.yaw);
                    pose
                })
                .collect()
        })
        .collect();

    let mut traj = Trajectories::zeros(n, t);
    for (i, row) in rows.iter().enumerate() {
        for (j, pose) in row.iter().enumerate() {
            traj.x[(i, j)] = pose.x;
            traj.y[(i, j)] = pose.y;
            traj.yaws[(i, j)] = pose.yaw;
        }
    }
    traj
}

/// Integrate a single control sequence, e.g. the optimal one for display
pub fn integrate_sequence(
    start: &Pose2D,
    vx: &[f64],
    vy: &[f64],
    wz: &[f64],
    model: &dyn MotionModel,
    dt: f64,
) -> Vec<Pose2D> {
    let mut pose = *start;
    (0..vx.len())
        .map(|j| {
            pose = model.propagate(&pose, &Control::new(vx[j], vy[j], wz[j]), dt);
            pose.yaw = normalize_angle(pose.yaw);
            pose
        })
        .collect()
}
