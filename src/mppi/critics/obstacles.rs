use nalgebra::DVector;
use rayon::prelude::*;
use tracing::debug;

use crate::mppi::config::{CriticKind, ObstaclesCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::Critic;
use crate::utils::costmap::costs;

/// Scores trajectories by the obstacle cost of the cells they cross.
///
/// A trajectory touching a lethal, inscribed, out of map or (untracked)
/// unknown cell is a collision and costs `collision_cost`. Others pay the
/// mean normalized cell cost, plus `critical_cost` once if any point lies
/// above `critical_threshold` while the path itself is clear. When every
/// trajectory collides the pipeline is stopped.
pub struct ObstaclesCritic {
    config: ObstaclesCriticConfig,
}

const NORMALIZER: f64 = (costs::INSCRIBED_INFLATED_OBSTACLE - 1) as f64;

impl ObstaclesCritic {
    pub fn new(config: ObstaclesCriticConfig) -> Self {
        Self { config }
    }

    fn in_collision(cost: Option<u8>, tracking_unknown: bool) -> bool {
        match cost {
            None => true,
            Some(costs::LETHAL_OBSTACLE) | Some(costs::INSCRIBED_INFLATED_OBSTACLE) => true,
            Some(costs::NO_INFORMATION) => !tracking_unknown,
            Some(_) => false,
        }
    }
}

impl Critic for ObstaclesCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::Obstacles
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        data.ensure_path_validity();
        // no critical penalty while the path itself is blocked
        let path_blocked = data.path_pts_valid.as_ref().map_or(false, |valid| valid.contains(&false));

        let traj = data.trajectories;
        let costmap = data.costmap;
        let tracking_unknown = costmap.tracks_unknown_as_free();
        let steps = traj.time_steps();
        let config = &self.config;

        let scored: Vec<(f64, bool)> = (0..data.batch_size())
            .into_par_iter()
            .map(|i| {
                let mut repulsive = 0.0;
                let mut critical_hit = false;
                for j in 0..steps {
                    let cost = costmap.cost_at(traj.x[(i, j)], traj.y[(i, j)]);
                    if Self::in_collision(cost, tracking_unknown) {
                        return (config.collision_cost, true);
                    }
                    let cell = match cost {
                        Some(costs::NO_INFORMATION) | None => 0,
                        Some(c) => c,
                    };
                    repulsive += cell as f64 / NORMALIZER;
                    critical_hit |= cell >= config.critical_threshold;
                }
                let critical = if critical_hit && !path_blocked { config.critical_cost } else { 0.0 };
                (critical + repulsive / steps.max(1) as f64, false)
            })
            .collect();

        let all_collide = scored.iter().all(|&(_, collided)| collided);
        let column = DVector::from_iterator(scored.len(), scored.iter().map(|&(cost, _)| cost));
        data.add_costs(self.kind(), column, &config.weight);
        if all_collide {
            debug!("every sampled trajectory is in collision");
            data.fail_flag = true;
        }
    }
}
