//! Data bundle shared by the critics of one scoring pass

use nalgebra::DVector;

use crate::common::{CostLookup, Pose2D};
use crate::mppi::config::{CriticKind, CriticWeight};
use crate::mppi::path::{find_furthest_reached_point, find_path_obstacle_validity, PathTensor};
use crate::mppi::trajectories::{BatchState, Trajectories};

/// Inputs read by every critic, the lazily filled path caches and the
/// cost column contributed by each critic.
///
/// Critics never touch the trajectories or the path; they only add a
/// column, fill a cache or raise `fail_flag`.
pub struct CriticData<'a> {
    pub state: &'a BatchState,
    pub trajectories: &'a Trajectories,
    pub path: &'a PathTensor,
    pub goal: Pose2D,
    pub costmap: &'a dyn CostLookup,
    pub model_dt: f64,
    /// Aim the goal critics at the end of the (cusp truncated) path
    pub enforce_path_inversion: bool,
    pub furthest_reached_path_point: Option<usize>,
    pub path_pts_valid: Option<Vec<bool>>,
    pub critic_costs: Vec<(CriticKind, DVector<f64>)>,
    pub fail_flag: bool,
}

impl<'a> CriticData<'a> {
    pub fn new(
        state: &'a BatchState,
        trajectories: &'a Trajectories,
        path: &'a PathTensor,
        goal: Pose2D,
        costmap: &'a dyn CostLookup,
        model_dt: f64,
    ) -> Self {
        Self {
            state,
            trajectories,
            path,
            goal,
            costmap,
            model_dt,
            enforce_path_inversion: false,
            furthest_reached_path_point: None,
            path_pts_valid: None,
            critic_costs: Vec::new(),
            fail_flag: false,
        }
    }

    pub fn with_path_inversion(mut self, enforce: bool) -> Self {
        self.enforce_path_inversion = enforce;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.trajectories.batch_size()
    }

    pub fn robot_pose(&self) -> Pose2D {
        self.state.pose
    }

    /// Pose targeted by the goal oriented critics
    pub fn critic_goal(&self) -> Pose2D {
        if self.enforce_path_inversion {
            if let Some(last) = self.path.last_pose() {
                return last;
            }
        }
        self.goal
    }

    /// Furthest path index reached by the batch, computed on first use
    pub fn ensure_furthest_reached_path_point(&mut self) -> usize {
        if let Some(idx) = self.furthest_reached_path_point {
            return idx;
        }
        let idx = find_furthest_reached_point(self.trajectories, self.path);
        self.furthest_reached_path_point = Some(idx);
        idx
    }

    /// Obstacle validity of the path segments, computed on first use
    pub fn ensure_path_validity(&mut self) {
        if self.path_pts_valid.is_none() {
            self.path_pts_valid = Some(find_path_obstacle_validity(self.path, self.costmap));
        }
    }

    /// Whether path point `idx` is obstacle free.
    ///
    /// The final point has no segment and counts as valid, as does
    /// everything while the cache is empty.
    pub fn is_path_point_valid(&self, idx: usize) -> bool {
        self.path_pts_valid
            .as_ref()
            .and_then(|valid| valid.get(idx).copied())
            .unwrap_or(true)
    }

    /// Record a critic's raw column as `(raw * cost_weight) ^ cost_power`
    pub fn add_costs(&mut self, kind: CriticKind, raw: DVector<f64>, weight: &CriticWeight) {
        let weighted = raw * weight.cost_weight;
        let column = if weight.cost_power > 1 {
            weighted.map(|c| c.powi(weight.cost_power as i32))
        } else {
            weighted
        };
        self.critic_costs.push((kind, column));
    }

    /// Sum of all critic columns
    pub fn total_costs(&self) -> DVector<f64> {
        self.critic_costs
            .iter()
            .fold(DVector::zeros(self.batch_size()), |acc, (_, column)| acc + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Path2D;
    use crate::mppi::path::to_tensor;
    use crate::utils::costmap::CostmapSnapshot;

    #[test]
    fn test_costs_are_weighted_and_summed() {
        let state = BatchState::zeros(3, 4);
        let traj = Trajectories::zeros(3, 4);
        let path = PathTensor::zeros(0);
        let map = CostmapSnapshot::filled(10, 10, 0.1, (0.0, 0.0), 0).unwrap();
        let mut data = CriticData::new(&state, &traj, &path, Pose2D::origin(), &map, 0.1);

        assert_eq!(data.total_costs(), DVector::zeros(3));
        data.add_costs(CriticKind::Goal, DVector::from_vec(vec![1.0, 2.0, 3.0]), &CriticWeight::new(2.0, 1));
        data.add_costs(CriticKind::Twirling, DVector::from_vec(vec![1.0, 0.0, 0.5]), &CriticWeight::new(2.0, 2));
        assert_eq!(data.total_costs(), DVector::from_vec(vec![6.0, 4.0, 7.0]));
        assert_eq!(data.critic_costs.len(), 2);
    }

    #[test]
    fn test_caches_are_filled_once() {
        let state = BatchState::zeros(1, 2);
        let mut traj = Trajectories::zeros(1, 2);
        traj.x[(0, 1)] = 2.1;
        let path = to_tensor(&Path2D::from_xy("map", &[0.0, 1.0, 2.0, 3.0], &[0.5; 4]));
        let mut map = CostmapSnapshot::filled(40, 10, 0.1, (0.0, 0.0), 0).unwrap();
        map.set_disc(1.0, 0.5, 0.1, 254);
        let mut data = CriticData::new(&state, &traj, &path, Pose2D::new(3.0, 0.5, 0.0), &map, 0.1);

        assert_eq!(data.ensure_furthest_reached_path_point(), 2);
        data.furthest_reached_path_point = Some(1);
        assert_eq!(data.ensure_furthest_reached_path_point(), 1);

        assert!(data.is_path_point_valid(1));
        data.ensure_path_validity();
        assert_eq!(data.path_pts_valid.as_deref(), Some(&[true, false, true][..]));
        assert!(!data.is_path_point_valid(1));
        assert!(data.is_path_point_valid(3));
    }

    #[test]
    fn test_critic_goal_uses_path_end_when_enforcing_inversion() {
        let state = BatchState::zeros(1, 2);
        let traj = Trajectories::zeros(1, 2);
        let path = to_tensor(&Path2D::from_xy("map", &[0.0, 1.0], &[0.0, 0.0]));
        let map = CostmapSnapshot::filled(10, 10, 0.1, (0.0, 0.0), 0).unwrap();
        let goal = Pose2D::new(5.0, 5.0, 1.0);

        let data = CriticData::new(&state, &traj, &path, goal, &map, 0.1);
        assert_eq!(data.critic_goal(), goal);
        let data = data.with_path_inversion(true);
        assert_eq!(data.critic_goal().x, 1.0);
    }
}
