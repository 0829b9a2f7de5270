//! facesort-core — sort photos into per-person folders by face.
//!
//! Uses SCRFD for face detection and ArcFace for face embeddings, both
//! running via ONNX Runtime. A reference gallery of per-person centroids is
//! built from sample photos, and album photos are matched against it by
//! Euclidean distance.

pub mod alignment;
pub mod analyzer;
pub mod detector;
pub mod gallery;
pub mod matcher;
pub mod photo;
pub mod recognizer;
pub mod sorter;
pub mod types;

#[cfg(test)]
mod testing;

pub use analyzer::{default_model_dir, AnalysisOptions, FaceAnalysis, FaceAnalyzer};
pub use detector::FaceDetector;
pub use gallery::{load_gallery, Gallery};
pub use matcher::{recognize, MatchPolicy, Matcher, NearestMatcher, Recognition, ThresholdMatcher};
pub use recognizer::FaceRecognizer;
pub use sorter::{sort_photos, SortOptions, SortReport};
pub use types::{BoundingBox, DetectedFace, Embedding, Identity};
