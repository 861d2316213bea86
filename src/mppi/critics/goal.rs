use crate::mppi::config::{CriticKind, GoalCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};
use crate::utils::geometry::within_position_goal_tolerance;

/// Pulls trajectories towards the goal position once the robot is close
pub struct GoalCritic {
    config: GoalCriticConfig,
}

impl GoalCritic {
    pub fn new(config: GoalCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for GoalCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::Goal
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
                .map(|j| ((traj.x[(i, j)] - goal.x).powi(2) + (traj.y[(i, j)] - goal.y).powi(2)).sqrt())
                .sum();
            summed / steps.max(1) as f64
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}
