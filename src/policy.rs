//! Decision threshold applied to model probabilities.

/// Turns a fraud probability into a binary verdict.
///
/// The default threshold of 0.4 sits below the naive 0.5 midpoint on
/// purpose: fraud is a heavily imbalanced class and the trained model's
/// probabilities run conservative, so the business-tuned cutoff trades a
/// few more false positives for better recall.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    threshold: f64,
}

impl DecisionPolicy {
    pub const DEFAULT_THRESHOLD: f64 = 0.4;

    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The probability cutoff in force.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A probability exactly at the threshold classifies as fraud.
    pub fn is_fraud(&self, probability: f64) -> bool {
        probability >= self.threshold
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}
