//! Trajectory scoring critics and the pipeline that runs them

pub mod constraint;
pub mod goal;
pub mod goal_angle;
pub mod obstacles;
pub mod path_align;
pub mod path_angle;
pub mod path_follow;
pub mod prefer_forward;
pub mod twirling;
pub mod velocity_smoothness;

pub use constraint::ConstraintCritic;
pub use goal::GoalCritic;
pub use goal_angle::GoalAngleCritic;
pub use obstacles::ObstaclesCritic;
pub use path_align::PathAlignCritic;
pub use path_angle::PathAngleCritic;
pub use path_follow::PathFollowCritic;
pub use prefer_forward::PreferForwardCritic;
pub use twirling::TwirlingCritic;
pub use velocity_smoothness::VelocitySmoothnessCritic;

use nalgebra::DVector;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::mppi::config::{ConstraintsConfig, CriticKind, CriticsConfig, MotionModelKind};
use crate::mppi::critic_data::CriticData;

/// A pluggable trajectory scoring function
pub trait Critic: Send + Sync {
    fn kind(&self) -> CriticKind;

    fn enabled(&self) -> bool;

    /// Add this critic's cost column to `data`, or raise `data.fail_flag`
    fn score(&self, data: &mut CriticData);
}

/// Evaluate `f` for every trajectory index on the rayon pool
pub(crate) fn par_column<F>(batch_size: usize, f: F) -> DVector<f64>
where
    F: Fn(usize) -> f64 + Send + Sync,
{
    DVector::from_vec((0..batch_size).into_par_iter().map(f).collect())
}

/// Ordered critic pipeline
pub struct CriticManager {
    critics: Vec<Box<dyn Critic>>,
}

impl CriticManager {
    pub fn new(critics: Vec<Box<dyn Critic>>) -> Self {
        Self { critics }
    }

    /// Build the enabled critics in configured order
    pub fn from_config(
        config: &CriticsConfig,
        constraints: &ConstraintsConfig,
        motion_model: MotionModelKind,
    ) -> Self {
        let mut critics: Vec<Box<dyn Critic>> = Vec::new();
        for kind in &config.order {
            let critic: Box<dyn Critic> = match kind {
                CriticKind::Constraint => {
                    Box::new(ConstraintCritic::new(config.constraint.clone(), constraints, motion_model))
                }
                CriticKind::Obstacles => Box::new(ObstaclesCritic::new(config.obstacles.clone())),
                CriticKind::Goal => Box::new(GoalCritic::new(config.goal.clone())),
                CriticKind::GoalAngle => Box::new(GoalAngleCritic::new(config.goal_angle.clone())),
                CriticKind::PathAlign => Box::new(PathAlignCritic::new(config.path_align.clone())),
                CriticKind::PathFollow => Box::new(PathFollowCritic::new(config.path_follow.clone())),
                CriticKind::PathAngle => Box::new(PathAngleCritic::new(config.path_angle.clone())),
                CriticKind::PreferForward => Box::new(PreferForwardCritic::new(config.prefer_forward.clone())),
                CriticKind::Twirling => Box::new(TwirlingCritic::new(config.twirling.clone())),
                CriticKind::VelocitySmoothness => {
                    Box::new(VelocitySmoothnessCritic::new(config.velocity_smoothness.clone()))
                }
            };
            if critic.enabled() {
                critics.push(critic);
            } else {
                debug!("critic {:?} disabled", kind);
            }
        }
        Self { critics }
    }

    pub fn len(&self) -> usize {
        self.critics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.critics.is_empty()
    }

    pub fn kinds(&self) -> Vec<CriticKind> {
        self.critics.iter().map(|c| c.kind()).collect()
    }

    /// Run every critic in order, stopping once one raises the fail flag
    pub fn evaluate(&self, data: &mut CriticData) {
        for critic in &self.critics {
            critic.score(data);
            if data.fail_flag {
                trace!("critic {:?} stopped the pipeline", critic.kind());
                break;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Pose2D;
    use crate::mppi::config::CriticWeight;

    struct Fixed(f64, bool);

    impl Critic for Fixed {
        fn kind(&self) -> CriticKind {
            CriticKind::Goal
        }

        fn enabled(&self) -> bool {
            true
        }

        fn score(&self, data: &mut CriticData) {
            let column = par_column(data.batch_size(), |_| self.0);
            data.add_costs(self.kind(), column, &CriticWeight::new(1.0, 1));
            data.fail_flag = self.1;
        }
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let config = CriticsConfig::default();
        let manager = CriticManager::from_config(&config, &ConstraintsConfig::default(), MotionModelKind::DiffDrive);
        assert_eq!(manager.len(), 9);
        assert!(!manager.kinds().contains(&CriticKind::Twirling));
        assert_eq!(manager.kinds()[0], CriticKind::Constraint);
    }

    #[test]
    fn test_evaluate_stops_on_fail_flag() {
        let (state, traj) = test_utils::straight_batch(&[0.0, 1.0], 3, 0.1);
        let path = test_utils::x_axis_path(3, 1.0);
        let map = test_utils::free_map();
        let mut data = CriticData::new(&state, &traj, &path, Pose2D::origin(), &map, 0.1);

        let manager = CriticManager::new(vec![
            Box::new(Fixed(1.0, false)),
            Box::new(Fixed(2.0, true)),
            Box::new(Fixed(4.0, false)),
        ]);
        manager.evaluate(&mut data);
        assert!(data.fail_flag);
        assert_eq!(data.critic_costs.len(), 2);
        assert_eq!(data.total_costs()[1], 3.0);
    }
}
