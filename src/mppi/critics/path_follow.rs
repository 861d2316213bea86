use crate::mppi::config::{CriticKind, PathFollowCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};
use crate::utils::geometry::within_position_goal_tolerance;

/// Drives progress along the path by pulling trajectory ends towards a
/// point `offset_from_furthest` beyond the furthest reached one
pub struct PathFollowCritic {
    config: PathFollowCriticConfig,
}

impl PathFollowCritic {
    pub fn new(config: PathFollowCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for PathFollowCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::PathFollow
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let path_size = data.path.len();
        if path_size < 2
            || within_position_goal_tolerance(self.config.threshold_to_consider, &data.robot_pose(), &data.critic_goal())
        {
            return;
        }

        let furthest = data.ensure_furthest_reached_path_point();
        data.ensure_path_validity();

        let mut target = (furthest + self.config.offset_from_furthest).min(path_size - 1);
        while target < path_size - 1 && !data.is_path_point_valid(target) {
            target += 1;
        }

        let (dest_x, dest_y) = (data.path.x[target], data.path.y[target]);
        let traj = data.trajectories;
        let last = traj.time_steps() - 1;
        let column = par_column(data.batch_size(), |i| {
            ((traj.x[(i, last)] - dest_x).powi(2) + (traj.y[(i, last)] - dest_y).powi(2)).sqrt()
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mppi::critics::test_utils::*;
    use crate::utils::costmap::costs;

    #[test]
    fn test_distance_to_offset_point() {
        let (state, traj) = straight_batch(&[0.0, 1.0], 5, 0.1);
        let path = x_axis_path(30, 0.1);
        let map = free_map();
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PathFollowCritic::new(PathFollowCriticConfig::default()).score(&mut data);

        // furthest reached is 5, target index 11 at x = 1.1
        let costs = data.total_costs();
        assert!((costs[0] - 0.6 * 5.0).abs() < 1e-9);
        assert!((costs[1] - (0.36f64 + 1.0).sqrt() * 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_target_skips_blocked_points() {
        let (state, traj) = straight_batch(&[0.0], 5, 0.1);
        let path = x_axis_path(30, 0.1);
        let mut map = free_map();
        map.set_box((1.06, -0.2), (1.34, 0.2), costs::LETHAL_OBSTACLE);
        let mut data = CriticData::new(&state, &traj, &path, path.pose(29), &map, 0.1);
        PathFollowCritic::new(PathFollowCriticConfig::default()).score(&mut data);

        let cost = data.total_costs()[0];
        assert!(cost > 0.6 * 5.0 + 1e-6, "cost = {}", cost);
    }
}
