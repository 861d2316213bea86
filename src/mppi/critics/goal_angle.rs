use crate::mppi::config::{CriticKind, GoalAngleCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};
use crate::utils::geometry::{shortest_angular_distance, within_position_goal_tolerance};

/// Aligns the heading with the goal yaw near the goal
pub struct GoalAngleCritic {
    config: GoalAngleCriticConfig,
}

impl GoalAngleCritic {
    pub fn new(config: GoalAngleCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for GoalAngleCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::GoalAngle
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let goal = data.critic_goal();
        if !within_position_goal_tolerance(self.config.threshold_to_consider, &data.robot_pose(), &goal) {
            return;
        }

        let traj = data.trajectories;
        let steps = traj.time_steps();
        let column = par_column(data.batch_size(), |i| {
            let summed: f64 = (0..steps)
                .map(|j| shortest_angular_distance(traj.yaws[(i, j)], goal.yaw).abs())
                .sum();
            summed / steps.max(1) as f64
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Pose2D;
    use crate::mppi::critics::test_utils::*;

    #[test]
    fn test_mean_heading_error() {
        let (state, mut traj) = straight_batch(&[0.0, 0.0], 2, 0.1);
        for j in 0..2 {
            traj.yaws[(1, j)] = 0.5;
        }
        let path = x_axis_path(2, 0.2);
        let map = free_map();
        let mut data = CriticData::new(&state, &traj, &path, Pose2D::new(0.2, 0.0, 0.0), &map, 0.1);
        GoalAngleCritic::new(GoalAngleCriticConfig::default()).score(&mut data);

        let costs = data.total_costs();
        assert_eq!(costs[0], 0.0);
        assert!((costs[1] - 1.5).abs() < 1e-9);
    }
}
