//! Fraud probability scoring over a loaded ONNX model.

use std::path::PathBuf;
use std::sync::Mutex;

use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use thiserror::Error;
use tracing::debug;

use crate::feature_extractor::FeatureVector;
use crate::models::loader::{LoadedModel, ModelLoader};

/// Errors from model loading and inference.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The scoring artifact could not be loaded. Fatal at startup: the
    /// process must not begin serving without a model.
    #[error("model artifact unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// The feature vector does not match the model's expected input width.
    /// Upstream derivation guarantees this never happens; seeing it means an
    /// internal contract was broken.
    #[error("feature vector has {got} values, model expects {expected}")]
    InputShape { expected: usize, got: usize },

    /// ONNX Runtime failed while executing the session.
    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),

    /// The session ran but no probability could be read from its outputs.
    #[error("could not extract probability: {0}")]
    Output(String),
}

/// A trained classifier exposing a fraud probability per feature vector.
///
/// Implementations are read-only after construction and shared across all
/// cycles.
pub trait Scorer: Send + Sync {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

/// Scorer backed by a single ONNX session loaded once at startup.
pub struct OnnxScorer {
    // ort sessions take &mut to run; the lock serializes access for the
    // single-worker loop without making the scorer itself mutable.
    model: Mutex<LoadedModel>,
    expected_features: usize,
}

impl OnnxScorer {
    /// Load the scoring artifact from `path`.
    pub fn load(
        path: impl Into<PathBuf>,
        intra_threads: usize,
        expected_features: usize,
    ) -> Result<Self, ModelError> {
        let model = ModelLoader::new(intra_threads).load(path)?;
        Ok(Self {
            model: Mutex::new(model),
            expected_features,
        })
    }

    /// Input width the model expects.
    pub fn expected_features(&self) -> usize {
        self.expected_features
    }

    /// Read the fraud-class probability from the session outputs.
    ///
    /// Gradient-boosting exports emit a plain `[batch, 2]` tensor;
    /// sklearn-style exports wrap probabilities in `seq(map(int64, float))`.
    /// Both are handled.
    fn extract_probability(
        outputs: &ort::session::SessionOutputs,
        output_name: &str,
    ) -> Result<f64, ModelError> {
        if let Some(output) = outputs.get(output_name) {
            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let prob = Self::probability_from_tensor(&shape, data)?;
                debug!(prob, "extracted probability from tensor output");
                return Ok(prob);
            }

            if DynSequenceValueType::can_downcast(&output.dtype()) {
                let prob = Self::probability_from_sequence_map(output)?;
                debug!(prob, "extracted probability from seq(map) output");
                return Ok(prob);
            }
        }

        // The preferred output was missing or unreadable; scan the rest,
        // skipping the class-label output.
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                return Self::probability_from_tensor(&shape, data);
            }
            if DynSequenceValueType::can_downcast(&output.dtype()) {
                return Self::probability_from_sequence_map(&output);
            }
        }

        Err(ModelError::Output(format!(
            "no usable probability output (looked for {:?})",
            output_name
        )))
    }

    /// Probability from `seq(map(int64, float))`, the sklearn ZipMap shape.
    fn probability_from_sequence_map(output: &ort::value::DynValue) -> Result<f64, ModelError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| ModelError::Output(format!("not a sequence: {e}")))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let map_value = maps
            .first()
            .ok_or_else(|| ModelError::Output("empty probability sequence".to_string()))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        // Class 1 is fraud
        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
            return Ok(*prob as f64);
        }
        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
            return Ok(1.0 - *prob as f64);
        }

        Err(ModelError::Output("no class probability in output map".to_string()))
    }

    /// Probability from a plain tensor output: `[batch, 2]`, `[batch, 1]`,
    /// `[2]` or `[1]`.
    fn probability_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> Result<f64, ModelError> {
        let dims: Vec<i64> = shape.iter().copied().collect();

        let class_count = match dims.as_slice() {
            [_, n] => *n as usize,
            [n] => *n as usize,
            _ => 0,
        };

        let prob = match class_count {
            n if n >= 2 => data.get(1),
            1 => data.first(),
            _ => None,
        };

        prob.map(|&p| p as f64)
            .ok_or_else(|| ModelError::Output(format!("unexpected output shape {:?}", dims)))
    }
}

impl Scorer for OnnxScorer {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if features.len() != self.expected_features {
            return Err(ModelError::InputShape {
                expected: self.expected_features,
                got: features.len(),
            });
        }

        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.values().to_vec()))?;

        let mut model = self
            .model
            .lock()
            .map_err(|_| ModelError::Output("model session lock poisoned".to_string()))?;

        let input_name = model.input_name.clone();
        let output_name = model.output_name.clone();
        let outputs = model.session.run(ort::inputs![input_name.as_str() => input_tensor])?;

        let probability = Self::extract_probability(&outputs, &output_name)?;
        Ok(probability.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    // Inference against a real session is covered by deployment smoke tests;
    // exercising `run` here would require shipping an ONNX artifact with the
    // repository. Shape validation is pure and tested via the trait in
    // predictor tests.
}
