use crate::mppi::config::{CriticKind, VelocitySmoothnessCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};

/// Penalizes squared changes between consecutive sampled controls,
/// starting from the robot's measured velocity
pub struct VelocitySmoothnessCritic {
    config: VelocitySmoothnessCriticConfig,
}

impl VelocitySmoothnessCritic {
    pub fn new(config: VelocitySmoothnessCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for VelocitySmoothnessCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::VelocitySmoothness
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let state = data.state;
        let steps = state.time_steps();
        let column = par_column(data.batch_size(), |i| {
            // column 0 of the velocities holds the measured robot speed
            let mut prev = (state.vx[(i, 0)], state.vy[(i, 0)], state.wz[(i, 0)]);
            let mut summed = 0.0;
            for j in 0..steps {
                let cur = (state.cvx[(i, j)], state.cvy[(i, j)], state.cwz[(i, j)]);
                summed += (cur.0 - prev.0).powi(2) + (cur.1 - prev.1).powi(2) + (cur.2 - prev.2).powi(2);
                prev = cur;
            }
            summed
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}
