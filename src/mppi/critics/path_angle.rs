use std::f64::consts::PI;

use crate::mppi::config::{CriticKind, PathAngleCriticConfig, PathAngleMode};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};
use crate::utils::geometry::{
    normalize_angle, normalize_yaws_between_points, pose_point_angle, pose_point_angle_with_yaw,
    shortest_angular_distance, within_position_goal_tolerance,
};

/// Turns the robot towards a look-ahead point on the path when it is
/// facing too far away from it.
pub struct PathAngleCritic {
    config: PathAngleCriticConfig,
}

impl PathAngleCritic {
    pub fn new(config: PathAngleCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for PathAngleCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::PathAngle
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let config = &self.config;
        let robot = data.robot_pose();
        if data.path.is_empty()
            || within_position_goal_tolerance(config.threshold_to_consider, &robot, &data.critic_goal())
        {
            return;
        }

        let furthest = data.ensure_furthest_reached_path_point();
        let target = (furthest + config.offset_from_furthest).min(data.path.len() - 1);
        let (gx, gy, gyaw) = (data.path.x[target], data.path.y[target], data.path.yaws[target]);

        let robot_angle = match config.mode {
            PathAngleMode::ForwardPreference => pose_point_angle(&robot, gx, gy, true),
            PathAngleMode::NoDirectionalPreference => pose_point_angle(&robot, gx, gy, false),
            PathAngleMode::ConsiderFeasiblePathOrientations => pose_point_angle_with_yaw(&robot, gx, gy, gyaw),
        };
        if robot_angle < config.max_angle_to_furthest {
            return;
        }

        let traj = data.trajectories;
        let last = traj.time_steps() - 1;
        let mode = config.mode;
        let column = par_column(data.batch_size(), |i| {
            let (tx, ty, tyaw) = (traj.x[(i, last)], traj.y[(i, last)], traj.yaws[(i, last)]);
            let yaw_between = (gy - ty).atan2(gx - tx);
            match mode {
                PathAngleMode::ForwardPreference => shortest_angular_distance(tyaw, yaw_between).abs(),
                PathAngleMode::NoDirectionalPreference => {
                    let forward = shortest_angular_distance(tyaw, yaw_between).abs();
                    let backward = shortest_angular_distance(tyaw, normalize_angle(yaw_between + PI)).abs();
                    forward.min(backward)
                }
                PathAngleMode::ConsiderFeasiblePathOrientations => {
                    let feasible = normalize_yaws_between_points(gyaw, &[yaw_between])[0];
                    shortest_angular_distance(tyaw, feasible).abs()
                }
            }
        });
        data.add_costs(self.kind(), column, &config.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Pose2D;
    use crate::mppi::critics::test_utils::*;
    use crate::mppi::path::PathTensor;
    use std::f64::consts::FRAC_PI_2;

    fn path_behind() -> PathTensor {
        // path along -x, facing -x
        let mut path = x_axis_path(30, -0.1);
        path.yaws.fill(PI);
        path
    }

    #[test]
    fn test_inactive_when_facing_path() {
        let (state, traj) = straight_batch(&[0.0, 0.5], 5, 0.1);
        let path = x_axis_path(30, 0.1);
        let map = free_map();
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PathAngleCritic::new(PathAngleCriticConfig::default()).score(&mut data);
        assert!(data.critic_costs.is_empty());
    }

    #[test]
    fn test_forward_preference_penalizes_facing_away() {
        let (mut state, mut traj) = straight_batch(&[0.0, 0.0], 3, 0.0);
        state.pose = Pose2D::new(0.0, 0.0, 0.0);
        for j in 0..3 {
            traj.yaws[(1, j)] = PI;
        }
        let path = path_behind();
        let map = free_map();
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PathAngleCritic::new(PathAngleCriticConfig::default()).score(&mut data);

        let costs = data.total_costs();
        assert!((costs[0] - PI * 2.2).abs() < 1e-9);
        assert!(costs[1].abs() < 1e-9);
    }

    #[test]
    fn test_no_directional_preference_accepts_reversing() {
        let (state, traj) = straight_batch(&[0.0], 3, 0.0);
        let path = path_behind();
        let map = free_map();
        let config = PathAngleCriticConfig { mode: PathAngleMode::NoDirectionalPreference, ..Default::default() };
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PathAngleCritic::new(config).score(&mut data);
        // robot already lines up with the path when driving backwards
        assert!(data.critic_costs.is_empty());
    }

    #[test]
    fn test_feasible_orientations_follow_path_yaw() {
        let (mut state, mut traj) = straight_batch(&[0.0, 0.0], 3, 0.0);
        state.pose = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        for j in 0..3 {
            traj.yaws[(0, j)] = 0.0;
            traj.yaws[(1, j)] = PI;
        }
        // path behind the robot but oriented along +x: reversing into it is feasible
        let path = x_axis_path(30, -0.1);
        let map = free_map();
        let config = PathAngleCriticConfig {
            mode: PathAngleMode::ConsiderFeasiblePathOrientations,
            ..Default::default()
        };
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PathAngleCritic::new(config).score(&mut data);

        let costs = data.total_costs();
        assert!(costs[0].abs() < 1e-9);
        assert!((costs[1] - PI * 2.2).abs() < 1e-9);
    }
}
