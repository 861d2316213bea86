use crate::mppi::config::{ConstraintCriticConfig, ConstraintsConfig, CriticKind, MotionModelKind};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};

/// Penalizes velocities outside the speed bounds and, for Ackermann
/// robots, turns tighter than the minimum turning radius.
pub struct ConstraintCritic {
    config: ConstraintCriticConfig,
    max_vel: f64,
    min_vel: f64,
    min_turning_r: Option<f64>,
}

impl ConstraintCritic {
    pub fn new(config: ConstraintCriticConfig, limits: &ConstraintsConfig, model: MotionModelKind) -> Self {
        let vy_max = if model == MotionModelKind::Omni { limits.vy_max } else { 0.0 };
        let min_turning_r = match model {
            MotionModelKind::Ackermann { min_turning_r } => Some(min_turning_r),
            _ => None,
        };
        Self {
            config,
            max_vel: (limits.vx_max.powi(2) + vy_max.powi(2)).sqrt(),
            min_vel: -(limits.vx_min.powi(2) + vy_max.powi(2)).sqrt(),
            min_turning_r,
        }
    }
}

impl Critic for ConstraintCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::Constraint
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let state = data.state;
        let dt = data.model_dt;
        let steps = state.time_steps();

        let column = par_column(data.batch_size(), |i| {
            (0..steps)
                .map(|j| {
                    let (vx, vy, wz) = (state.vx[(i, j)], state.vy[(i, j)], state.wz[(i, j)]);
                    let speed = vx.signum() * (vx * vx + vy * vy).sqrt();
                    let mut violation = (speed - self.max_vel).max(0.0) + (self.min_vel - speed).max(0.0);
                    if let Some(min_r) = self.min_turning_r {
                        if wz != 0.0 {
                            violation += (min_r - (vx / wz).abs()).max(0.0);
                        }
                    }
                    violation * dt
                })
                .sum()
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mppi::critics::test_utils::*;

    #[test]
    fn test_penalizes_only_out_of_bounds_speed() {
        let (mut state, traj) = straight_batch(&[0.0, 0.0, 0.0], 5, 0.04);
        let path = x_axis_path(5, 1.0);
        let map = free_map();
        for j in 0..5 {
            state.vx[(1, j)] = 0.7;
            state.vx[(2, j)] = -0.55;
        }
        let mut data = CriticData::new(&state, &traj, &path, path.pose(4), &map, 0.1);
        let critic = ConstraintCritic::new(
            ConstraintCriticConfig::default(),
            &ConstraintsConfig::default(),
            MotionModelKind::DiffDrive,
        );
        critic.score(&mut data);

        let costs = data.total_costs();
        assert_eq!(costs[0], 0.0);
        // 0.2 m/s over 5 steps of 0.1 s, weight 4
        assert!((costs[1] - 0.4).abs() < 1e-9);
        assert!((costs[2] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_ackermann_turning_radius() {
        let (mut state, traj) = straight_batch(&[0.0, 0.0], 1, 0.03);
        let path = x_axis_path(2, 1.0);
        let map = free_map();
        state.vx[(0, 0)] = 0.3;
        state.wz[(0, 0)] = 0.3;
        state.vx[(1, 0)] = 0.3;
        state.wz[(1, 0)] = 3.0;
        let mut data = CriticData::new(&state, &traj, &path, path.pose(1), &map, 0.1);
        let critic = ConstraintCritic::new(
            ConstraintCriticConfig::default(),
            &ConstraintsConfig::default(),
            MotionModelKind::Ackermann { min_turning_r: 0.2 },
        );
        critic.score(&mut data);

        let costs = data.total_costs();
        assert_eq!(costs[0], 0.0);
        assert!((costs[1] - 0.1 * 0.1 * 4.0).abs() < 1e-9);
    }
}
