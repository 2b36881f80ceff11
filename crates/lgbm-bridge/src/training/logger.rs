//! Verbosity-gated training output.

use super::run::{EvalRecord, TrainState};

/// How much the training loop reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    Silent,
    /// Warnings only.
    #[default]
    Warning,
    /// Progress and metrics.
    Info,
    /// Every iteration.
    Debug,
}

/// Emits `tracing` events for one training run.
#[derive(Debug, Clone)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn start_training(&self, num_iterations: usize) {
        if self.verbosity >= Verbosity::Info {
            tracing::info!(num_iterations, "training started");
        }
    }

    pub fn log_iteration(&self, iteration: usize) {
        if self.verbosity >= Verbosity::Debug {
            tracing::debug!(iteration, "iteration finished");
        }
    }

    pub fn log_metrics(&self, record: &EvalRecord) {
        if self.verbosity < Verbosity::Info {
            return;
        }
        match record.valid {
            Some(valid) => tracing::info!(
                iteration = record.iteration,
                metric = %record.metric,
                train = record.train,
                valid,
                "evaluation"
            ),
            None => tracing::info!(
                iteration = record.iteration,
                metric = %record.metric,
                train = record.train,
                "evaluation"
            ),
        }
    }

    pub fn log_early_stopping(&self, iteration: usize, best_iteration: usize, metric: &str) {
        if self.verbosity >= Verbosity::Info {
            tracing::info!(iteration, best_iteration, metric, "early stopping");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            tracing::warn!("{message}");
        }
    }

    pub fn finish_training(&self, state: TrainState, iterations: usize) {
        if self.verbosity >= Verbosity::Info {
            tracing::info!(?state, iterations, "training finished");
        }
    }
}
