//! ONNX model loader

use std::path::PathBuf;

use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::info;

use crate::models::scorer::ModelError;

/// Loaded ONNX model with the metadata needed to run it.
#[derive(Debug)]
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
}

/// Loader for the frozen scoring artifact.
pub struct ModelLoader {
    /// Number of intra-op threads for ONNX inference
    intra_threads: usize,
}

impl ModelLoader {
    pub fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }

    /// Load the ONNX model at `path`.
    ///
    /// Any failure here is [`ModelError::Unavailable`]; callers at startup
    /// treat it as fatal.
    pub fn load(&self, path: impl Into<PathBuf>) -> Result<LoadedModel, ModelError> {
        let path = path.into();

        info!(path = %path.display(), threads = self.intra_threads, "loading ONNX model");

        let unavailable = |source: ort::Error| ModelError::Unavailable {
            path: path.clone(),
            source,
        };

        ort::init().commit().map_err(unavailable)?;

        let session = self.build_session(&path).map_err(unavailable)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        info!(
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            "model loaded"
        );

        Ok(LoadedModel {
            session,
            input_name,
            output_name,
        })
    }

    fn build_session(&self, path: &std::path::Path) -> Result<Session, ort::Error> {
        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.intra_threads)?
            .commit_from_file(path)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { intra_threads: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let loader = ModelLoader::new(1);
        let err = loader.load("/nonexistent/fraud_classifier.onnx").unwrap_err();

        assert!(matches!(err, ModelError::Unavailable { .. }));
    }

    #[test]
    fn test_garbage_artifact_is_unavailable() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not an onnx graph").unwrap();

        let loader = ModelLoader::new(1);
        let err = loader.load(file.path()).unwrap_err();

        assert!(matches!(err, ModelError::Unavailable { .. }));
    }
}
