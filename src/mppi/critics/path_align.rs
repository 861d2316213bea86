use crate::mppi::config::{CriticKind, PathAlignCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};
use crate::mppi::path::find_closest_path_pt;
use crate::utils::geometry::{shortest_angular_distance, within_position_goal_tolerance};

/// Keeps trajectories on top of the path.
///
/// Trajectory points are matched with the path point at the same
/// integrated distance from the start and the mean separation is the
/// cost. Blocked path points are skipped, so the robot may leave the
/// path to get around an obstacle sitting on it.
pub struct PathAlignCritic {
    config: PathAlignCriticConfig,
}

impl PathAlignCritic {
    pub fn new(config: PathAlignCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for PathAlignCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::PathAlign
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let config = &self.config;
        if data.path.is_empty()
            || within_position_goal_tolerance(config.threshold_to_consider, &data.robot_pose(), &data.critic_goal())
        {
            return;
        }

        // Too little path reached yet, let the follow critic pull the robot first
        let path_segments_count = data.ensure_furthest_reached_path_point();
        if path_segments_count < config.offset_from_furthest {
            return;
        }

        data.ensure_path_validity();
        let invalid = (0..path_segments_count).filter(|&i| !data.is_path_point_valid(i)).count();
        if invalid > 2 && invalid as f64 / path_segments_count as f64 > config.max_path_occupancy_ratio {
            return;
        }

        let path = data.path;
        let traj = data.trajectories;
        let cumulative = path.cumulative_distances();
        let steps = traj.time_steps();
        let stride = config.trajectory_point_step.max(1);
        let data_ref = &*data;

        let column = par_column(data.batch_size(), |i| {
            let mut summed = 0.0;
            let mut samples = 0usize;
            let mut traj_dist = 0.0;
            let mut path_pt = 0;
            let mut p = stride;
            while p < steps {
                traj_dist += ((traj.x[(i, p)] - traj.x[(i, p - stride)]).powi(2)
                    + (traj.y[(i, p)] - traj.y[(i, p - stride)]).powi(2))
                .sqrt();
                path_pt = find_closest_path_pt(&cumulative, traj_dist, path_pt);
                if data_ref.is_path_point_valid(path_pt) {
                    let mut dist = ((path.x[path_pt] - traj.x[(i, p)]).powi(2)
                        + (path.y[path_pt] - traj.y[(i, p)]).powi(2))
                    .sqrt();
                    if config.use_path_orientations {
                        dist += shortest_angular_distance(path.yaws[path_pt], traj.yaws[(i, p)]).abs();
                    }
                    summed += dist;
                    samples += 1;
                }
                p += stride;
            }
            if samples > 0 {
                summed / samples as f64
            } else {
                0.0
            }
        });
        data.add_costs(self.kind(), column, &config.weight);
    }
}
