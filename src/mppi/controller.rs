//! Controller facade: reference plan in, velocity command out

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::common::{Control, CostLookup, MppiError, MppiResult, Path2D, PathTracker, Pose2D, PoseStamped};
use crate::mppi::config::{CriticKind, MppiConfig};
use crate::mppi::optimizer::{CancelToken, CycleStatus, Optimizer};
use crate::mppi::path::to_tensor;
use crate::mppi::path_handler::PathHandler;
use crate::mppi::trajectories::Trajectories;
use crate::utils::geometry::within_position_goal_tolerance;

/// Optimization internals of one cycle, for visualization
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub trajectories: Trajectories,
    pub costs: DVector<f64>,
    pub critic_costs: Vec<(CriticKind, DVector<f64>)>,
    pub optimal_trajectory: Vec<Pose2D>,
    pub best_trajectory: Option<usize>,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub command: Control,
    pub status: CycleStatus,
    /// Present when `publish_diagnostics` is set
    pub diagnostics: Option<Diagnostics>,
}

/// MPPI path tracking controller
pub struct MppiController {
    config: MppiConfig,
    optimizer: Optimizer,
    path_handler: PathHandler,
    last_plan: Path2D,
    cancel: CancelToken,
}

impl MppiController {
    /// Controller sampling from an entropy seeded generator
    pub fn new(config: MppiConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Controller with reproducible sampling
    pub fn with_seed(config: MppiConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: MppiConfig, rng: StdRng) -> Self {
        let config = config.sanitized();
        Self {
            optimizer: Optimizer::new(&config, rng),
            path_handler: PathHandler::new(config.path_handler.clone()),
            last_plan: Path2D::default(),
            cancel: CancelToken::new(),
            config,
        }
    }

    pub fn config(&self) -> &MppiConfig {
        &self.config
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn path_handler(&self) -> &PathHandler {
        &self.path_handler
    }

    /// Token that stops a running cycle; stays raised until `reset`
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Clear the warm start, the command history, the plan and a pending cancel
    pub fn reset(&mut self) {
        self.optimizer.reset();
        self.path_handler.reset();
        self.last_plan = Path2D::default();
        self.cancel.reset();
    }

    pub fn is_goal_reached(&self, robot: &Pose2D, goal: &Pose2D) -> bool {
        within_position_goal_tolerance(self.config.optimizer.goal_tolerance, robot, goal)
    }

    /// Compute the command for this control period.
    ///
    /// `plan` is the latest global plan; a plan different from the last
    /// one received replaces the tracked plan. Transient problems with the
    /// plan or the pose are returned as errors, infeasible or cancelled
    /// cycles as a stop command with the matching status.
    pub fn compute_velocity_command(
        &mut self,
        robot: &PoseStamped,
        speed: &Control,
        plan: &Path2D,
        goal: &Pose2D,
        costmap: &dyn CostLookup,
    ) -> MppiResult<CycleOutput> {
        if plan.is_empty() {
            return Err(MppiError::PathUnavailable("received an empty plan".to_string()));
        }
        if *plan != self.last_plan {
            debug!("new plan with {} poses", plan.len());
            self.path_handler.set_path(plan.clone());
            self.last_plan = plan.clone();
        }

        let window = self.path_handler.transform_path(robot)?;
        let path = to_tensor(&window);
        let output = self.optimizer.eval_control(robot.pose, *speed, &path, *goal, costmap, &self.cancel);

        let diagnostics = if self.config.optimizer.publish_diagnostics {
            Some(Diagnostics {
                trajectories: self.optimizer.trajectories().clone(),
                costs: self.optimizer.costs().clone(),
                critic_costs: self.optimizer.critic_costs().to_vec(),
                optimal_trajectory: self.optimizer.optimal_trajectory(),
                best_trajectory: self.optimizer.best_trajectory().map(|(idx, _)| idx),
                iterations: output.iterations,
            })
        } else {
            None
        };

        Ok(CycleOutput { command: output.command, status: output.status, diagnostics })
    }
}

impl PathTracker for MppiController {
    fn compute_control(
        &mut self,
        robot: &PoseStamped,
        speed: &Control,
        path: &Path2D,
        costmap: &dyn CostLookup,
    ) -> MppiResult<Control> {
        let goal = *path
            .last()
            .ok_or_else(|| MppiError::PathUnavailable("received an empty plan".to_string()))?;
        self.compute_velocity_command(robot, speed, path, &goal, costmap)
            .map(|output| output.command)
    }

    fn is_goal_reached(&self, robot: &Pose2D, goal: &Pose2D) -> bool {
        MppiController::is_goal_reached(self, robot, goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MotionModel;
    use crate::mppi::motion_model::DiffDriveModel;
    use crate::utils::costmap::{costs, CostmapSnapshot};

    fn small_config() -> MppiConfig {
        let mut config = MppiConfig::default();
        config.optimizer.batch_size = 50;
        config.optimizer.time_steps = 20;
        config
    }

    fn straight_plan() -> Path2D {
        let x: Vec<f64> = (0..=100).map(|i| i as f64 * 0.1).collect();
        Path2D::from_xy("map", &x, &vec![0.0; x.len()])
    }

    fn free_map() -> CostmapSnapshot {
        CostmapSnapshot::filled(300, 100, 0.1, (-5.0, -5.0), costs::FREE_SPACE).unwrap()
    }

    #[test]
    fn test_straight_line_reaches_goal() {
        let mut controller = MppiController::with_seed(small_config(), 3);
        let plan = straight_plan();
        let goal = Pose2D::new(10.0, 0.0, 0.0);
        let map = free_map();
        let model = DiffDriveModel;

        let mut robot = PoseStamped::new("map", Pose2D::origin());
        let mut speed = Control::zero();

        let first = controller.compute_velocity_command(&robot, &speed, &plan, &goal, &map).unwrap();
        assert_eq!(first.status, CycleStatus::Ok);
        assert!(first.command.vx > 0.0, "vx = {}", first.command.vx);
        assert!(first.command.wz.abs() < 0.5, "wz = {}", first.command.wz);
        assert!(first.diagnostics.is_none());

        let mut reached = false;
        for _ in 0..800 {
            let out = controller.compute_velocity_command(&robot, &speed, &plan, &goal, &map).unwrap();
            assert_eq!(out.status, CycleStatus::Ok);
            speed = out.command;
            robot.pose = model.propagate(&robot.pose, &speed, 0.1);
            if controller.is_goal_reached(&robot.pose, &goal) {
                reached = true;
                break;
            }
        }
        assert!(reached, "robot stopped at {:?}", robot.pose);
        assert!(robot.pose.y.abs() < 0.5);
    }

    #[test]
    fn test_lethal_path_stops_robot() {
        let mut controller = MppiController::with_seed(small_config(), 11);
        let plan = straight_plan();
        let mut map = free_map();
        map.set_box((-1.0, -0.6), (11.0, 0.6), costs::LETHAL_OBSTACLE);
        let robot = PoseStamped::new("map", Pose2D::origin());

        let out = controller
            .compute_velocity_command(&robot, &Control::differential(0.3, 0.0), &plan, &Pose2D::new(10.0, 0.0, 0.0), &map)
            .unwrap();
        assert_eq!(out.status, CycleStatus::NoValidTrajectories);
        assert!(out.command.is_zero());
    }

    #[test]
    fn test_empty_plan_is_an_error() {
        let mut controller = MppiController::with_seed(small_config(), 1);
        let robot = PoseStamped::new("map", Pose2D::origin());
        let result = controller.compute_velocity_command(
            &robot,
            &Control::zero(),
            &Path2D::new("map"),
            &Pose2D::origin(),
            &free_map(),
        );
        assert!(matches!(result, Err(MppiError::PathUnavailable(_))));
    }

    #[test]
    fn test_cusp_limits_tracked_plan() {
        let mut config = small_config();
        config.path_handler.enforce_path_inversion = true;
        let mut controller = MppiController::with_seed(config, 5);
        let x = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 0.8, 0.6, 0.4, 0.2];
        let plan = Path2D::from_xy("map", &x, &[0.0; 10]);
        let robot = PoseStamped::new("map", Pose2D::origin());

        let out = controller
            .compute_velocity_command(&robot, &Control::zero(), &plan, &Pose2D::new(0.2, 0.0, 0.0), &free_map())
            .unwrap();
        assert_eq!(out.status, CycleStatus::Ok);
        assert_eq!(controller.path_handler().inversion_locale(), 6);
    }

    #[test]
    fn test_diagnostics_and_cancel() {
        let mut config = small_config();
        config.optimizer.publish_diagnostics = true;
        let mut controller = MppiController::with_seed(config, 9);
        let plan = straight_plan();
        let robot = PoseStamped::new("map", Pose2D::origin());
        let goal = Pose2D::new(10.0, 0.0, 0.0);

        let out = controller.compute_velocity_command(&robot, &Control::zero(), &plan, &goal, &free_map()).unwrap();
        let diagnostics = out.diagnostics.unwrap();
        assert_eq!(diagnostics.trajectories.batch_size(), 50);
        assert_eq!(diagnostics.costs.len(), 50);
        assert_eq!(diagnostics.optimal_trajectory.len(), 20);
        assert!(diagnostics.best_trajectory.is_some());

        controller.cancel_token().cancel();
        let out = controller.compute_velocity_command(&robot, &Control::zero(), &plan, &goal, &free_map()).unwrap();
        assert_eq!(out.status, CycleStatus::Cancelled);
        assert!(out.command.is_zero());

        controller.reset();
        let out = controller.compute_velocity_command(&robot, &Control::zero(), &plan, &goal, &free_map()).unwrap();
        assert_eq!(out.status, CycleStatus::Ok);
    }

    #[test]
    fn test_path_tracker_interface() {
        let mut controller = MppiController::with_seed(small_config(), 2);
        let tracker: &mut dyn PathTracker = &mut controller;
        let robot = PoseStamped::new("map", Pose2D::origin());
        let command = tracker.compute_control(&robot, &Control::zero(), &straight_plan(), &free_map()).unwrap();
        assert!(command.vx.is_finite());
        assert!(tracker.is_goal_reached(&Pose2D::new(9.9, 0.0, 0.0), &Pose2D::new(10.0, 0.0, 0.0)));
        assert!(!tracker.is_goal_reached(&Pose2D::origin(), &Pose2D::new(10.0, 0.0, 0.0)));
    }
}
