//! The boosting loop.

use crate::native::Booster;
use crate::params::LearningParams;
use crate::{Error, Result};

use super::early_stop::{EarlyStopAction, EarlyStopping, metric_higher_is_better};
use super::logger::TrainingLogger;
use super::options::TrainOptions;

// =============================================================================
// Types
// =============================================================================

/// Where a [`TrainingRun`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainState {
    /// More iterations may follow.
    Running,
    /// The validation metric stopped improving.
    EarlyStopped,
    /// The engine reported it cannot add more trees.
    Exhausted,
    /// The iteration budget ran out.
    Completed,
}

impl TrainState {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TrainState::Running)
    }
}

/// One evaluation of the active metric.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRecord {
    pub iteration: usize,
    pub metric: String,
    /// Present when the configuration asks the engine for training metrics.
    pub train: Option<f64>,
    pub valid: Option<f64>,
}

/// Outcome of a finished [`TrainingRun`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub state: TrainState,
    /// Iterations that added trees.
    pub iterations: usize,
    /// One-based best iteration, recorded when early stopping ended the
    /// loop before the budget.
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
    pub evaluations: Vec<EvalRecord>,
    pub warnings: Vec<String>,
}

/// Supplies gradients for custom-objective training.
pub trait CustomObjective {
    /// Fill `grad` and `hess` from the current raw training scores.
    ///
    /// All three slices have the same length: rows times models per
    /// iteration, class-major for multiclass.
    fn gradients(&self, scores: &[f64], grad: &mut [f32], hess: &mut [f32]) -> Result<()>;
}

// =============================================================================
// TrainingRun
// =============================================================================

/// Iteration-by-iteration driver for a [`Booster`].
///
/// [`step`](Self::step) runs one iteration and is the only cancellation
/// point; [`run`](Self::run) loops until a terminal state.
#[derive(Debug)]
pub struct TrainingRun {
    num_iterations: usize,
    iteration: usize,
    state: TrainState,
    early_stopping: Option<EarlyStopping>,
    metric: Option<String>,
    provide_training_metric: bool,
    options: TrainOptions,
    logger: TrainingLogger,
    evaluations: Vec<EvalRecord>,
    warnings: Vec<String>,
    grad: Vec<f32>,
    hess: Vec<f32>,
}

impl TrainingRun {
    /// Prepare a run over `booster` using its learning parameters.
    ///
    /// Early stopping is switched off, with a warning, when the booster has
    /// no validation data.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero `eval_period`; `Consistency` if early
    /// stopping is requested with a validation set but no metric is active.
    pub fn new(booster: &Booster, learning: &LearningParams, options: TrainOptions) -> Result<Self> {
        options.validate()?;
        let logger = TrainingLogger::new(options.verbosity);
        let mut warnings = Vec::new();

        let metric = if booster.has_single_metric() {
            booster.eval_names()?.into_iter().next()
        } else {
            None
        };

        let early_stopping = match learning.early_stopping_patience() {
            Some(_) if !booster.has_validation() => {
                let msg = "early stopping requires a validation dataset; disabled".to_string();
                logger.warn(&msg);
                warnings.push(msg);
                None
            }
            Some(patience) => {
                let Some(name) = metric.as_deref() else {
                    return Err(Error::Consistency(
                        "early stopping requires exactly one active metric".into(),
                    ));
                };
                Some(EarlyStopping::new(patience as usize, metric_higher_is_better(name)))
            }
            None => None,
        };

        Ok(Self {
            num_iterations: usize::try_from(learning.num_iterations()).unwrap_or(0),
            iteration: 0,
            state: TrainState::Running,
            early_stopping,
            metric,
            provide_training_metric: booster
                .params()
                .is_some_and(|p| p.objective.is_provide_training_metric()),
            options,
            logger,
            evaluations: Vec::new(),
            warnings,
            grad: Vec::new(),
            hess: Vec::new(),
        })
    }

    pub fn state(&self) -> TrainState {
        self.state
    }

    /// Iterations that added trees so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }

    pub fn early_stopping_enabled(&self) -> bool {
        self.early_stopping.is_some()
    }

    /// Zero-based iteration with the best validation score so far.
    pub fn best_iteration(&self) -> Option<usize> {
        self.early_stopping
            .as_ref()
            .filter(|es| es.rounds() > 0)
            .map(EarlyStopping::best_round)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.early_stopping.as_ref().and_then(EarlyStopping::best_value)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Run one ordinary iteration.
    pub fn step(&mut self, booster: &mut Booster) -> Result<TrainState> {
        self.advance(booster, None)
    }

    /// Run one iteration with gradients from `objective`.
    pub fn step_custom(&mut self, booster: &mut Booster, objective: &dyn CustomObjective) -> Result<TrainState> {
        self.advance(booster, Some(objective))
    }

    fn advance(&mut self, booster: &mut Booster, objective: Option<&dyn CustomObjective>) -> Result<TrainState> {
        if self.state.is_finished() {
            return Ok(self.state);
        }
        if self.iteration == 0 {
            self.logger.start_training(self.num_iterations);
        }
        if self.iteration >= self.num_iterations {
            self.state = TrainState::Completed;
            return Ok(self.state);
        }

        let finished = match objective {
            None => booster.update()?,
            Some(objective) => {
                let scores = booster.inner_predictions(0)?;
                self.grad.resize(scores.len(), 0.0);
                self.hess.resize(scores.len(), 0.0);
                objective.gradients(&scores, &mut self.grad, &mut self.hess)?;
                booster.update_custom(&self.grad, &self.hess)?
            }
        };
        if finished {
            self.state = TrainState::Exhausted;
            return Ok(self.state);
        }

        let round = self.iteration;
        self.iteration += 1;
        self.logger.log_iteration(round);

        if self.early_stopping.is_some() {
            let valid = booster.eval_valid()?;
            self.observe(booster, round, Some(valid))?;
            if let Some(es) = self.early_stopping.as_mut()
                && es.update(valid) == EarlyStopAction::Stop
            {
                self.logger.log_early_stopping(
                    round,
                    es.best_round(),
                    self.metric.as_deref().unwrap_or_default(),
                );
                self.state = TrainState::EarlyStopped;
            }
        } else if self.metric.is_some() && self.iteration % self.options.eval_period as usize == 0 {
            let valid = if booster.has_validation() {
                Some(booster.eval_valid()?)
            } else {
                None
            };
            self.observe(booster, round, valid)?;
        }

        if self.state == TrainState::Running && self.iteration >= self.num_iterations {
            self.state = TrainState::Completed;
        }
        Ok(self.state)
    }

    fn observe(&mut self, booster: &Booster, round: usize, valid: Option<f64>) -> Result<()> {
        let Some(metric) = self.metric.clone() else {
            return Ok(());
        };
        let train = if self.provide_training_metric {
            Some(booster.eval_train()?)
        } else {
            None
        };
        let record = EvalRecord {
            iteration: round,
            metric,
            train,
            valid,
        };
        if self.iteration % self.options.eval_period as usize == 0 {
            self.logger.log_metrics(&record);
        }
        if self.options.record_history {
            self.evaluations.push(record);
        }
        Ok(())
    }

    /// Loop ordinary iterations to a terminal state.
    pub fn run(mut self, booster: &mut Booster) -> Result<TrainSummary> {
        while self.step(booster)? == TrainState::Running {}
        Ok(self.finish(booster))
    }

    /// Loop custom-objective iterations to a terminal state.
    pub fn run_custom(mut self, booster: &mut Booster, objective: &dyn CustomObjective) -> Result<TrainSummary> {
        while self.step_custom(booster, objective)? == TrainState::Running {}
        Ok(self.finish(booster))
    }

    /// Close the run and record the best iteration on `booster`.
    ///
    /// The best iteration is recorded only when early stopping is active
    /// and the loop ended before the iteration budget.
    pub fn finish(self, booster: &mut Booster) -> TrainSummary {
        let stopped_early = matches!(self.state, TrainState::EarlyStopped | TrainState::Exhausted);
        let best_iteration = match self.best_iteration() {
            Some(best) if stopped_early => {
                booster.set_best_iteration((best + 1) as i32);
                Some(best + 1)
            }
            _ => None,
        };
        self.logger.finish_training(self.state, self.iteration);
        TrainSummary {
            state: self.state,
            iterations: self.iteration,
            best_iteration,
            best_score: self.best_score(),
            evaluations: self.evaluations,
            warnings: self.warnings,
        }
    }
}

/// Train `booster` with the learning parameters it was created with.
///
/// # Errors
///
/// `InvalidArgument` for a booster loaded from a model, which carries no
/// parameters; otherwise whatever [`TrainingRun`] surfaces.
pub fn train(booster: &mut Booster, options: TrainOptions) -> Result<TrainSummary> {
    let learning = booster
        .params()
        .map(|p| p.learning.clone())
        .ok_or_else(|| Error::InvalidArgument("booster has no training parameters".into()))?;
    TrainingRun::new(booster, &learning, options)?.run(booster)
}
