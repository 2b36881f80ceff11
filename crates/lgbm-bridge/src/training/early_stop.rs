//! Early stopping on a validation metric.

/// Outcome of feeding one validation score to [`EarlyStopping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopAction {
    /// Strictly better than every previous score.
    Improved,
    /// No improvement, patience not yet exhausted.
    Continue,
    /// `patience` iterations passed without improvement.
    Stop,
}

/// Tracks the best validation score and when it was reached.
///
/// Scores are oriented so that lower is better: metrics where larger is
/// better are negated on the way in.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    sign: f64,
    best_value: f64,
    best_round: usize,
    round: usize,
}

impl EarlyStopping {
    /// `patience == 0` disables stopping; scores are still tracked.
    pub fn new(patience: usize, higher_is_better: bool) -> Self {
        Self {
            patience,
            sign: if higher_is_better { -1.0 } else { 1.0 },
            best_value: f64::INFINITY,
            best_round: 0,
            round: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.patience > 0
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    pub fn higher_is_better(&self) -> bool {
        self.sign < 0.0
    }

    /// Feed the score for the next round.
    pub fn update(&mut self, value: f64) -> EarlyStopAction {
        let round = self.round;
        self.round += 1;

        let oriented = self.sign * value;
        if oriented < self.best_value {
            self.best_value = oriented;
            self.best_round = round;
            return EarlyStopAction::Improved;
        }
        if self.is_enabled() && round - self.best_round >= self.patience {
            EarlyStopAction::Stop
        } else {
            EarlyStopAction::Continue
        }
    }

    /// Zero-based round of the best score.
    pub fn best_round(&self) -> usize {
        self.best_round
    }

    /// Best score in the metric's own orientation; `None` before any update.
    pub fn best_value(&self) -> Option<f64> {
        (self.round > 0 && self.best_value.is_finite()).then(|| self.sign * self.best_value)
    }

    /// Rounds fed so far.
    pub fn rounds(&self) -> usize {
        self.round
    }
}

/// Whether larger values of the named engine metric are better.
///
/// Names are as the engine reports them, e.g. `auc`, `ndcg@5`, `map@3`.
pub fn metric_higher_is_better(name: &str) -> bool {
    let base = name.split('@').next().unwrap_or(name);
    matches!(base, "auc" | "auc_mu" | "ndcg" | "map" | "average_precision")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn stops_after_patience_without_improvement() {
        let mut es = EarlyStopping::new(5, false);
        let scores = [1.0, 1.0, 1.0, 0.5, 0.6, 0.6, 0.6, 0.6, 0.6];
        let actions: Vec<_> = scores.iter().map(|&s| es.update(s)).collect();
        assert_eq!(actions[0], EarlyStopAction::Improved);
        assert_eq!(actions[3], EarlyStopAction::Improved);
        assert_eq!(actions[7], EarlyStopAction::Continue);
        assert_eq!(actions[8], EarlyStopAction::Stop);
        assert_eq!(es.best_round(), 3);
        assert_eq!(es.best_value(), Some(0.5));
    }

    #[test]
    fn higher_is_better_is_negated() {
        let mut es = EarlyStopping::new(2, true);
        assert_eq!(es.update(0.7), EarlyStopAction::Improved);
        assert_eq!(es.update(0.8), EarlyStopAction::Improved);
        assert_eq!(es.update(0.75), EarlyStopAction::Continue);
        assert_eq!(es.update(0.75), EarlyStopAction::Stop);
        assert_eq!(es.best_value(), Some(0.8));
    }

    #[test]
    fn ties_are_not_improvements() {
        let mut es = EarlyStopping::new(1, false);
        es.update(1.0);
        assert_eq!(es.update(1.0), EarlyStopAction::Stop);
    }

    #[test]
    fn disabled_never_stops() {
        let mut es = EarlyStopping::new(0, false);
        for _ in 0..20 {
            assert_ne!(es.update(3.0), EarlyStopAction::Stop);
        }
    }

    #[rstest]
    #[case("auc", true)]
    #[case("ndcg@5", true)]
    #[case("map@3", true)]
    #[case("average_precision", true)]
    #[case("l2", false)]
    #[case("binary_logloss", false)]
    #[case("multi_error", false)]
    fn metric_direction(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(metric_higher_is_better(name), expected);
    }
}
