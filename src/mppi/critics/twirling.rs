use crate::mppi::config::{CriticKind, TwirlingCriticConfig};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::{par_column, Critic};

/// Penalizes spinning on the way to the goal
pub struct TwirlingCritic {
    config: TwirlingCriticConfig,
}

impl TwirlingCritic {
    pub fn new(config: TwirlingCriticConfig) -> Self {
        Self { config }
    }
}

impl Critic for TwirlingCritic {
    fn kind(&self) -> CriticKind {
        CriticKind::Twirling
    }

    fn enabled(&self) -> bool {
        self.config.weight.enabled
    }

    fn score(&self, data: &mut CriticData) {
        let state = data.state;
        let steps = state.time_steps();
        let column = par_column(data.batch_size(), |i| {
            (0..steps).map(|j| state.wz[(i, j)].abs()).sum::<f64>() / steps.max(1) as f64
        });
        data.add_costs(self.kind(), column, &self.config.weight);
    }
}
