//! Common traits defining the seams between the controller and its collaborators

use crate::common::error::MppiResult;
use crate::common::types::*;

/// Point to obstacle-cost queries against a snapshot of the obstacle map.
///
/// Implementations must not block: the controller queries them from
/// worker threads while scoring trajectories.
pub trait CostLookup: Sync {
    /// Cost of the cell containing world point (x, y), `None` when outside the map
    fn cost_at(&self, x: f64, y: f64) -> Option<u8>;

    /// Whether unknown cells are considered traversable
    fn tracks_unknown_as_free(&self) -> bool;
}

/// Trait for robot kinematic models
pub trait MotionModel: Send + Sync {
    /// Whether the model can move sideways (uses `vy`)
    fn is_holonomic(&self) -> bool;

    /// Enforce model specific limits on a command
    fn constrain(&self, control: Control) -> Control {
        control
    }

    /// Propagate a pose by one step: translate along the current heading, then rotate
    fn propagate(&self, pose: &Pose2D, control: &Control, dt: f64) -> Pose2D {
        let (sin, cos) = pose.yaw.sin_cos();
        let vy = if self.is_holonomic() { control.vy } else { 0.0 };
        Pose2D::new(
            pose.x + (control.vx * cos - vy * sin) * dt,
            pose.y + (control.vx * sin + vy * cos) * dt,
            pose.yaw + control.wz * dt,
        )
    }
}

/// Trait for path tracking controllers
pub trait PathTracker {
    /// Compute the velocity command that follows `path` from `robot`
    fn compute_control(
        &mut self,
        robot: &PoseStamped,
        speed: &Control,
        path: &Path2D,
        costmap: &dyn CostLookup,
    ) -> MppiResult<Control>;

    /// Check if the goal has been reached
    fn is_goal_reached(&self, robot: &Pose2D, goal: &Pose2D) -> bool;
}
