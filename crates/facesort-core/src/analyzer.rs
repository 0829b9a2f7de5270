//! Face analysis: detection followed by per-face embedding.
//!
//! Everything downstream (gallery loading, matching, sorting) takes a
//! `&mut impl FaceAnalyzer`, so tests can substitute a double for the ONNX
//! models.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::DetectedFace;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// SCRFD detection model from the InsightFace `buffalo_l` pack.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model from the InsightFace `buffalo_l` pack.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Finds every face in a photo and embeds it.
pub trait FaceAnalyzer {
    /// Returns all detected faces, highest detector confidence first.
    fn analyze(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, AnalyzerError>;
}

/// Options for loading [`FaceAnalysis`].
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub model_dir: PathBuf,
    /// Square detector input resolution; must be a multiple of 32.
    pub det_size: usize,
    /// L2-normalize embeddings.
    pub normalize: bool,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
}

impl AnalysisOptions {
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(DETECTOR_MODEL_FILE)
    }

    pub fn recognizer_model_path(&self) -> PathBuf {
        self.model_dir.join(RECOGNIZER_MODEL_FILE)
    }
}

/// SCRFD + ArcFace analyzer backed by ONNX Runtime.
pub struct FaceAnalysis {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FaceAnalysis {
    /// Load both models. Fails fast if either model file is missing.
    pub fn load(options: &AnalysisOptions) -> Result<Self, AnalyzerError> {
        let detector = FaceDetector::load(
            &options.detector_model_path(),
            options.det_size,
            options.intra_threads,
        )?;
        let recognizer = FaceRecognizer::load(
            &options.recognizer_model_path(),
            options.normalize,
            options.intra_threads,
        )?;
        Ok(Self {
            detector,
            recognizer,
        })
    }
}

impl FaceAnalyzer for FaceAnalysis {
    fn analyze(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        let boxes = self.detector.detect(image)?;
        tracing::trace!(faces = boxes.len(), "detected faces");

        boxes
            .into_iter()
            .map(|bbox| -> Result<DetectedFace, AnalyzerError> {
                let embedding = self.recognizer.extract(image, &bbox)?;
                Ok(DetectedFace { bbox, embedding })
            })
            .collect()
    }
}

/// Default model directory: where InsightFace itself unpacks `buffalo_l`.
pub fn default_model_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    Path::new(&home).join(".insightface/models/buffalo_l")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_paths() {
        let options = AnalysisOptions {
            model_dir: PathBuf::from("/models"),
            det_size: 640,
            normalize: true,
            intra_threads: 2,
        };
        assert_eq!(options.detector_model_path(), PathBuf::from("/models/det_10g.onnx"));
        assert_eq!(options.recognizer_model_path(), PathBuf::from("/models/w600k_r50.onnx"));
    }

    #[test]
    fn test_load_missing_models_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let options = AnalysisOptions {
            model_dir: dir.path().to_path_buf(),
            det_size: 640,
            normalize: true,
            intra_threads: 1,
        };
        let err = FaceAnalysis::load(&options).err().unwrap();
        assert!(matches!(err, AnalyzerError::Detector(DetectorError::ModelNotFound(_))));
    }
}
