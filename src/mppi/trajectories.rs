//! Sampled controls and rolled-out trajectories of one iteration

use nalgebra::DMatrix;

use crate::common::Pose2D;

/// Rolled-out poses, N rows (trajectories) by T columns (time steps)
#[derive(Debug, Clone)]
pub struct Trajectories {
    pub x: DMatrix<f64>,
    pub y: DMatrix<f64>,
    pub yaws: DMatrix<f64>,
}

impl Trajectories {
    pub fn zeros(batch_size: usize, time_steps: usize) -> Self {
        Self {
            x: DMatrix::zeros(batch_size, time_steps),
            y: DMatrix::zeros(batch_size, time_steps),
            yaws: DMatrix::zeros(batch_size, time_steps),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.x.nrows()
    }

    pub fn time_steps(&self) -> usize {
        self.x.ncols()
    }

    pub fn pose(&self, traj: usize, step: usize) -> Pose2D {
        Pose2D::new(self.x[(traj, step)], self.y[(traj, step)], self.yaws[(traj, step)])
    }
}

/// Optimization state of one iteration.
///
/// `cvx`/`cvy`/`cwz` are the perturbed, bounded controls of every
/// trajectory. `vx`/`vy`/`wz` are the velocities the robot actually
/// follows once acceleration limits are applied; column 0 holds the
/// measured robot velocity.
#[derive(Debug, Clone)]
pub struct BatchState {
    pub cvx: DMatrix<f64>,
    pub cvy: DMatrix<f64>,
    pub cwz: DMatrix<f64>,
    pub vx: DMatrix<f64>,
    pub vy: DMatrix<f64>,
    pub wz: DMatrix<f64>,
    pub pose: Pose2D,
}

impl BatchState {
    pub fn zeros(batch_size: usize, time_steps: usize) -> Self {
        Self {
            cvx: DMatrix::zeros(batch_size, time_steps),
            cvy: DMatrix::zeros(batch_size, time_steps),
            cwz: DMatrix::zeros(batch_size, time_steps),
            vx: DMatrix::zeros(batch_size, time_steps),
            vy: DMatrix::zeros(batch_size, time_steps),
            wz: DMatrix::zeros(batch_size, time_steps),
            pose: Pose2D::origin(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.cvx.nrows()
    }

    pub fn time_steps(&self) -> usize {
        self.cvx.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let traj = Trajectories::zeros(7, 3);
        assert_eq!(traj.batch_size(), 7);
        assert_eq!(traj.time_steps(), 3);
        assert_eq!(traj.pose(6, 2), Pose2D::origin());

        let state = BatchState::zeros(7, 3);
        assert_eq!(state.batch_size(), 7);
        assert_eq!(state.time_steps(), 3);
    }
}
