//! Sampling optimizer: perturb the nominal sequence, roll out, score and
//! take the importance weighted average, then smooth and hand out the
//! command of this cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

use crate::common::{Control, CostLookup, MotionModel, Pose2D};
use crate::mppi::config::{ConstraintsConfig, CriticKind, MppiConfig, OptimizerConfig};
use crate::mppi::control_sequence::{ControlHistory, ControlSequence};
use crate::mppi::critic_data::CriticData;
use crate::mppi::critics::CriticManager;
use crate::mppi::filter::savitzky_golay_filter;
use crate::mppi::motion_model::{
    bound_control, create_motion_model, integrate_sequence, integrate_state_velocities, predict_velocities,
};
use crate::mppi::noise::{NoiseBatch, NoiseGenerator};
use crate::mppi::path::PathTensor;
use crate::mppi::trajectories::{BatchState, Trajectories};

/// Result of one control cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Ok,
    /// Every sampled trajectory was rejected, the command is a stop
    NoValidTrajectories,
    Cancelled,
}

/// Steps of a control cycle, logged at trace level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sampling,
    Scoring,
    Updating,
    Converged,
    IterationLimitReached,
    Filtering,
    Done,
}

/// Shared flag asking a running cycle to stop after its current iteration
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What the optimizer produced for one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerOutput {
    pub command: Control,
    pub status: CycleStatus,
    pub iterations: usize,
}

enum Pass {
    Completed(usize),
    Failed,
    Cancelled(usize),
}

pub struct Optimizer {
    settings: OptimizerConfig,
    constraints: ConstraintsConfig,
    motion_model: Box<dyn MotionModel>,
    noise: NoiseGenerator,
    critics: CriticManager,
    enforce_path_inversion: bool,

    control_sequence: ControlSequence,
    control_history: ControlHistory,
    state: BatchState,
    trajectories: Trajectories,
    costs: DVector<f64>,
    critic_costs: Vec<(CriticKind, DVector<f64>)>,
    phase: Phase,
}

impl Optimizer {
    /// `config` is expected to be sanitized
    pub fn new(config: &MppiConfig, rng: StdRng) -> Self {
        let settings = config.optimizer.clone();
        let motion_model = create_motion_model(config.motion_model);
        let noise = NoiseGenerator::new(&config.noise, motion_model.is_holonomic(), rng);
        let critics = CriticManager::from_config(&config.critics, &config.constraints, config.motion_model);
        let (n, t) = (settings.batch_size, settings.time_steps);

        Self {
            constraints: config.constraints.clone(),
            motion_model,
            noise,
            critics,
            enforce_path_inversion: config.path_handler.enforce_path_inversion,
            control_sequence: ControlSequence::zeros(t),
            control_history: ControlHistory::new(),
            state: BatchState::zeros(n, t),
            trajectories: Trajectories::zeros(n, t),
            costs: DVector::zeros(n),
            critic_costs: Vec::new(),
            phase: Phase::Idle,
            settings,
        }
    }

    /// Forget the warm start and the command history
    pub fn reset(&mut self) {
        self.control_sequence.reset();
        self.control_history.reset();
        self.costs.fill(0.0);
        self.critic_costs.clear();
        self.set_phase(Phase::Idle);
    }

    pub fn reseed(&mut self, seed: u64) {
        self.noise.reseed(seed);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &OptimizerConfig {
        &self.settings
    }

    pub fn control_sequence(&self) -> &ControlSequence {
        &self.control_sequence
    }

    pub fn control_history(&self) -> &ControlHistory {
        &self.control_history
    }

    pub fn trajectories(&self) -> &Trajectories {
        &self.trajectories
    }

    /// Total cost of every trajectory of the last scoring pass
    pub fn costs(&self) -> &DVector<f64> {
        &self.costs
    }

    pub fn critic_costs(&self) -> &[(CriticKind, DVector<f64>)] {
        &self.critic_costs
    }

    /// Index and cost of the cheapest trajectory of the last scoring pass
    pub fn best_trajectory(&self) -> Option<(usize, f64)> {
        self.costs
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| OrderedFloat(**c))
            .map(|(i, &c)| (i, c))
    }

    /// Rollout of the nominal sequence from the current robot pose
    pub fn optimal_trajectory(&self) -> Vec<Pose2D> {
        integrate_sequence(
            &self.state.pose,
            self.control_sequence.vx.as_slice(),
            self.control_sequence.vy.as_slice(),
            self.control_sequence.wz.as_slice(),
            self.motion_model.as_ref(),
            self.settings.model_dt,
        )
    }

    fn set_phase(&mut self, phase: Phase) {
        trace!("optimizer phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Position in the sequence of the command issued this cycle
    fn command_offset(&self) -> usize {
        if self.settings.shift_control_sequence {
            1
        } else {
            0
        }
    }

    /// Run one control cycle and return the command to apply.
    ///
    /// The nominal sequence is kept as the warm start of the next cycle.
    pub fn eval_control(
        &mut self,
        robot: Pose2D,
        speed: Control,
        path: &PathTensor,
        goal: Pose2D,
        costmap: &dyn CostLookup,
        cancel: &CancelToken,
    ) -> OptimizerOutput {
        self.prepare(robot);

        let mut attempt = 0;
        let pass = loop {
            match self.optimize(speed, path, goal, costmap, cancel) {
                Pass::Failed if attempt < self.settings.retry_attempt_limit => {
                    attempt += 1;
                    debug!("no valid trajectory, retrying ({}/{})", attempt, self.settings.retry_attempt_limit);
                    self.control_sequence.reset();
                }
                pass => break pass,
            }
        };

        let output = match pass {
            Pass::Failed => {
                warn!("no valid trajectories after {} retries, stopping", attempt);
                self.control_sequence.reset();
                OptimizerOutput { command: Control::zero(), status: CycleStatus::NoValidTrajectories, iterations: 0 }
            }
            Pass::Cancelled(iterations) => {
                debug!("cycle cancelled after {} iterations", iterations);
                self.control_sequence.reset();
                OptimizerOutput { command: Control::zero(), status: CycleStatus::Cancelled, iterations }
            }
            Pass::Completed(iterations) => {
                let offset = self.command_offset();
                if self.settings.enable_filter {
                    self.set_phase(Phase::Filtering);
                    savitzky_golay_filter(&mut self.control_sequence, &mut self.control_history, offset);
                }
                let command = self.control_sequence.get(offset.min(self.control_sequence.len() - 1));
                if !self.settings.shift_control_sequence {
                    self.control_sequence.shift();
                }
                if let Some((idx, cost)) = self.best_trajectory() {
                    debug!("cycle done: {} iterations, best trajectory {} cost {:.3}", iterations, idx, cost);
                }
                OptimizerOutput { command, status: CycleStatus::Ok, iterations }
            }
        };

        self.set_phase(Phase::Done);
        output
    }

    fn prepare(&mut self, robot: Pose2D) {
        self.state.pose = robot;
        if self.settings.shift_control_sequence {
            self.control_sequence.shift();
        }
        self.critic_costs.clear();
    }

    /// Iteration loop of one attempt
    fn optimize(
        &mut self,
        speed: Control,
        path: &PathTensor,
        goal: Pose2D,
        costmap: &dyn CostLookup,
        cancel: &CancelToken,
    ) -> Pass {
        for i in 0..self.settings.iteration_count {
            self.set_phase(Phase::Sampling);
            let noise = self.noise.generate(self.settings.batch_size, self.settings.time_steps);
            self.generate_noised_trajectories(&noise, speed);

            self.set_phase(Phase::Scoring);
            if !self.score_trajectories(path, goal, costmap) {
                return Pass::Failed;
            }

            self.set_phase(Phase::Updating);
            let previous = self.control_sequence.clone();
            let costs = self.costs.clone();
            self.update_control_sequence(&costs);

            if cancel.is_cancelled() {
                return Pass::Cancelled(i + 1);
            }

            if let Some(tolerance) = self.settings.convergence_tolerance {
                if self.control_sequence.max_abs_diff(&previous) < tolerance {
                    self.set_phase(Phase::Converged);
                    return Pass::Completed(i + 1);
                }
            }
        }
        self.set_phase(Phase::IterationLimitReached);
        Pass::Completed(self.settings.iteration_count)
    }

    /// Add `noise` to the nominal sequence, bound it and roll it out
    fn generate_noised_trajectories(&mut self, noise: &NoiseBatch, speed: Control) {
        let (n, t) = (self.settings.batch_size, self.settings.time_steps);
        let seq = &self.control_sequence;
        let model = self.motion_model.as_ref();
        let limits = &self.constraints;

        for j in 0..t {
            for i in 0..n {
                let sampled = Control::new(
                    seq.vx[j] + noise.vx[(i, j)],
                    seq.vy[j] + noise.vy[(i, j)],
                    seq.wz[j] + noise.wz[(i, j)],
                );
                let bounded = bound_control(sampled, limits, model);
                self.state.cvx[(i, j)] = bounded.vx;
                self.state.cvy[(i, j)] = bounded.vy;
                self.state.cwz[(i, j)] = bounded.wz;
            }
        }

        predict_velocities(&mut self.state, &speed, limits, self.settings.model_dt);
        self.trajectories = integrate_state_velocities(&self.state, model, self.settings.model_dt);
    }

    /// Run the critics and add the control cost. Returns false when the
    /// pipeline was stopped.
    fn score_trajectories(&mut self, path: &PathTensor, goal: Pose2D, costmap: &dyn CostLookup) -> bool {
        let mut data = CriticData::new(&self.state, &self.trajectories, path, goal, costmap, self.settings.model_dt)
            .with_path_inversion(self.enforce_path_inversion);
        self.critics.evaluate(&mut data);

        let mut costs = data.total_costs();
        let fail = data.fail_flag;
        self.critic_costs = data.critic_costs;

        if fail {
            self.costs = costs;
            return false;
        }

        costs += self.control_costs();
        self.costs = costs;
        true
    }

    /// `gamma / sigma^2 * sum_t(u_t * eps_t)` per channel, where `eps` is
    /// the bounded perturbation actually applied
    fn control_costs(&self) -> DVector<f64> {
        let n = self.settings.batch_size;
        let gamma = self.settings.gamma;
        if gamma == 0.0 {
            return DVector::zeros(n);
        }

        let (vx_std, vy_std, wz_std) = self.noise.std_devs();
        let seq = &self.control_sequence;
        let channel = |sampled: &DMatrix<f64>, nominal: &DVector<f64>, std: f64| -> DVector<f64> {
            if std <= 0.0 {
                return DVector::zeros(n);
            }
            let mut eps = sampled.clone();
            for (mut col, &u) in eps.column_iter_mut().zip(nominal.iter()) {
                col.add_scalar_mut(-u);
                col *= u;
            }
            eps.column_sum() * (gamma / (std * std))
        };

        let mut costs = channel(&self.state.cvx, &seq.vx, vx_std);
        costs += channel(&self.state.cwz, &seq.wz, wz_std);
        if self.motion_model.is_holonomic() {
            costs += channel(&self.state.cvy, &seq.vy, vy_std);
        }
        costs
    }

    /// Softmax weights over `costs` (minimum subtracted), then the
    /// weighted average of the sampled controls becomes the new sequence.
    fn update_control_sequence(&mut self, costs: &DVector<f64>) {
        let weights = softmax_weights(costs, self.settings.temperature);

        self.control_sequence.vx = self.state.cvx.tr_mul(&weights);
        self.control_sequence.vy = self.state.cvy.tr_mul(&weights);
        self.control_sequence.wz = self.state.cwz.tr_mul(&weights);

        let model = self.motion_model.as_ref();
        for j in 0..self.control_sequence.len() {
            let bounded = bound_control(self.control_sequence.get(j), &self.constraints, model);
            self.control_sequence.set(j, bounded);
        }
    }
}

/// `w_i = exp(-(c_i - min) / temperature)`, normalized to sum to one
pub fn softmax_weights(costs: &DVector<f64>, temperature: f64) -> DVector<f64> {
    if costs.is_empty() {
        return DVector::zeros(0);
    }
    let min = costs.min();
    let exponents = costs.map(|c| (-(c - min) / temperature).exp());
    let sum = exponents.sum();
    exponents / sum
}
