use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (typically 512-dimensional for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Unweighted arithmetic mean of a set of embeddings.
    ///
    /// Returns `None` for an empty set. All inputs are expected to share one
    /// dimension; the first embedding's dimension and model version win.
    pub fn mean(embeddings: &[Embedding]) -> Option<Embedding> {
        let first = embeddings.first()?;
        let mut sum = vec![0.0f32; first.values.len()];

        for embedding in embeddings {
            for (acc, v) in sum.iter_mut().zip(embedding.values.iter()) {
                *acc += v;
            }
        }

        let n = embeddings.len() as f32;
        Some(Embedding {
            values: sum.into_iter().map(|s| s / n).collect(),
            model_version: first.model_version.clone(),
        })
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }
}

/// A face found in a photo: where it is, and what it looks like.
///
/// No identity is attached until it is compared against a [`Gallery`](crate::Gallery).
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// A known person: a name and the centroid of their reference embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub centroid: Embedding,
    /// Number of reference photos averaged into the centroid.
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_known() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_of_embeddings() {
        let embeddings = vec![
            Embedding::new(vec![1.0, 0.0, 2.0]),
            Embedding::new(vec![3.0, 2.0, 0.0]),
        ];
        let mean = Embedding::mean(&embeddings).unwrap();
        assert_eq!(mean.values, vec![2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_mean_single_is_identity() {
        let e = Embedding {
            values: vec![0.25, -0.5],
            model_version: Some("w600k_r50".into()),
        };
        let mean = Embedding::mean(std::slice::from_ref(&e)).unwrap();
        assert_eq!(mean, e);
    }

    #[test]
    fn test_mean_empty() {
        assert!(Embedding::mean(&[]).is_none());
    }
}
