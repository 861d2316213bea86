use crate::mppi::config::{CriticKind, PreferForwardCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};
use crate::utils::geometry::within_position_goal_tolerance;

/// Penalizes driving backwards away from the goal
pub struct PreferForwardCritic {
    config: PreferForwardCriticConfig,
}

impl PreferForwardCritic {
    pub fn new(config: PreferForwardCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for PreferForwardCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::PreferForward
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        if within_position_goal_tolerance(self.config.threshold_to_consider, &data.robot_pose(), &data.critic_goal()) {
            return;
        }

        let state = data.state;
        let dt = data.model_dt;
        let steps = state.time_steps();
        let column = par_column(data.batch_size(), |i| {
            (0..steps).map(|j| (-state.vx[(i, j)]).max(0.0) * dt).sum()
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mppi::critics::test_utils::*;

    #[test]
    fn test_only_reverse_motion_costs() {
        let (mut state, traj) = straight_batch(&[0.0, 0.0], 4, 0.05);
        for j in 0..4 {
            state.vx[(1, j)] = -0.2;
        }
        let path = x_axis_path(30, 0.1);
        let map = free_map();
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PreferForwardCritic::new(PreferForwardCriticConfig::default()).score(&mut data);

        let costs = data.total_costs();
        assert_eq!(costs[0], 0.0);
        assert!((costs[1] - 4.0 * 0.2 * 0.1 * 5.0).abs() < 1e-9);
    }
}
