use std::path::PathBuf;

use facesort_core::detector::SCRFD_DEFAULT_INPUT_SIZE;
use facesort_core::matcher::DEFAULT_THRESHOLD;
use facesort_core::{AnalysisOptions, MatchPolicy};

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing det_10g.onnx and w600k_r50.onnx.
    pub model_dir: PathBuf,
    /// One subdirectory of sample photos per known person.
    pub known_dir: PathBuf,
    /// Flat directory of photos to sort.
    pub input_dir: PathBuf,
    /// Root of the per-person output folders.
    pub output_dir: PathBuf,
    /// Euclidean distance below which a face matches a person.
    pub threshold: f32,
    /// Square SCRFD input resolution.
    pub det_size: usize,
    /// L2-normalize ArcFace embeddings before matching.
    pub normalize: bool,
    pub match_policy: MatchPolicy,
    /// ONNX Runtime intra-op threads per model.
    pub intra_threads: usize,
}

impl Config {
    /// Load configuration from `FACESORT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| {
            get(key).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            model_dir: get("FACESORT_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(facesort_core::default_model_dir),
            known_dir: path("FACESORT_KNOWN_DIR", "known_faces"),
            input_dir: path("FACESORT_INPUT_DIR", "album"),
            output_dir: path("FACESORT_OUTPUT_DIR", "sorted"),
            threshold: parsed(&get, "FACESORT_THRESHOLD", DEFAULT_THRESHOLD),
            det_size: parsed(&get, "FACESORT_DET_SIZE", SCRFD_DEFAULT_INPUT_SIZE),
            normalize: get("FACESORT_NORMALIZE").map(|v| v != "0").unwrap_or(true),
            match_policy: parsed(&get, "FACESORT_MATCH_POLICY", MatchPolicy::All),
            intra_threads: parsed(&get, "FACESORT_INTRA_THREADS", 2),
        }
    }

    /// Which embeddings are compared, for logs and reports.
    pub fn embedding_mode(&self) -> &'static str {
        if self.normalize {
            "normalized"
        } else {
            "raw"
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            model_dir: self.model_dir.clone(),
            det_size: self.det_size,
            normalize: self.normalize,
            intra_threads: self.intra_threads,
        }
    }
}

fn parsed<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
