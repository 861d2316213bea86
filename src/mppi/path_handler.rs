//! Keeps the reference plan and cuts out the window the controller tracks

use tracing::debug;

use crate::common::{MppiError, MppiResult, Path2D, Pose2D, PoseStamped};
use crate::mppi::config::PathHandlerConfig;
use crate::mppi::path::remove_after_first_inversion;
use crate::utils::geometry::shortest_angular_distance;

pub struct PathHandler {
    config: PathHandlerConfig,
    global_plan: Path2D,
    /// Plan truncated at its first cusp (the whole plan when not enforcing inversions)
    plan_up_to_inversion: Path2D,
    /// Index right after the active cusp in `global_plan`, 0 when there is none
    inversion_locale: usize,
}

impl PathHandler {
    pub fn new(config: PathHandlerConfig) -> Self {
        Self {
            config,
            global_plan: Path2D::default(),
            plan_up_to_inversion: Path2D::default(),
            inversion_locale: 0,
        }
    }

    /// Replace the reference plan
    pub fn set_path(&mut self, plan: Path2D) {
        self.global_plan = plan;
        self.plan_up_to_inversion = self.global_plan.clone();
        self.inversion_locale = if self.config.enforce_path_inversion {
            remove_after_first_inversion(&mut self.plan_up_to_inversion)
        } else {
            0
        };
    }

    pub fn path(&self) -> &Path2D {
        &self.global_plan
    }

    pub fn inversion_locale(&self) -> usize {
        self.inversion_locale
    }

    pub fn reset(&mut self) {
        self.global_plan = Path2D::default();
        self.plan_up_to_inversion = Path2D::default();
        self.inversion_locale = 0;
    }

    /// Window of the plan to track from `robot`: starts at the closest
    /// point near the beginning of the plan and spans `prune_distance`.
    ///
    /// Points behind the robot are dropped for good. Once the robot sits
    /// on an active cusp, the plan before it is dropped as well.
    pub fn transform_path(&mut self, robot: &PoseStamped) -> MppiResult<Path2D> {
        if self.plan_up_to_inversion.is_empty() {
            return Err(MppiError::PathUnavailable("received plan has no poses".to_string()));
        }
        if robot.frame_id != self.global_plan.frame_id {
            return Err(MppiError::FrameMismatch {
                expected: self.global_plan.frame_id.clone(),
                found: robot.frame_id.clone(),
            });
        }
        if !robot.pose.is_finite() {
            return Err(MppiError::InvalidPose(format!("{:?}", robot.pose)));
        }

        let poses = &self.plan_up_to_inversion.poses;
        let search_end = first_after_integrated_distance(poses, 0, self.config.prune_distance);
        let closest = (0..search_end)
            .min_by(|&a, &b| {
                robot.pose.distance(&poses[a]).total_cmp(&robot.pose.distance(&poses[b]))
            })
            .unwrap_or(0);
        let window_end = first_after_integrated_distance(poses, closest, self.config.prune_distance);
        let window = Path2D::from_poses(&self.global_plan.frame_id, poses[closest..window_end].to_vec());

        self.plan_up_to_inversion.poses.drain(..closest);

        if self.config.enforce_path_inversion && self.inversion_locale != 0 && self.within_inversion_tolerances(&robot.pose)
        {
            debug!("cusp reached, switching to the next plan segment");
            let drop = self.inversion_locale.min(self.global_plan.len());
            self.global_plan.poses.drain(..drop);
            self.plan_up_to_inversion = self.global_plan.clone();
            self.inversion_locale = remove_after_first_inversion(&mut self.plan_up_to_inversion);
        }

        if window.is_empty() {
            return Err(MppiError::PathUnavailable("resulting plan has no poses".to_string()));
        }
        Ok(window)
    }

    fn within_inversion_tolerances(&self, robot: &Pose2D) -> bool {
        match self.plan_up_to_inversion.last() {
            Some(cusp) => {
                robot.distance(cusp) <= self.config.inversion_xy_tolerance
                    && shortest_angular_distance(robot.yaw, cusp.yaw).abs() <= self.config.inversion_yaw_tolerance
            }
            None => false,
        }
    }
}

/// Exclusive end index of the poses reached by walking `distance` along
/// the path from `start`
fn first_after_integrated_distance(poses: &[Pose2D], start: usize, distance: f64) -> usize {
    let mut travelled = 0.0;
    for i in (start + 1)..poses.len() {
        travelled += poses[i].distance(&poses[i - 1]);
        if travelled > distance {
            return i;
        }
    }
    poses.len()
}
