//! Test doubles shared by module tests.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::detector::DetectorError;
use crate::types::{BoundingBox, DetectedFace, Embedding};
use image::{Rgb, RgbImage};
use std::collections::HashMap;
use std::path::Path;

/// Analyzer that "recognizes" faces by the color of a photo's top-left pixel.
///
/// Colors without registered faces yield no faces. Colors registered with
/// [`FakeAnalyzer::failing_on`] make inference fail.
#[derive(Default)]
pub struct FakeAnalyzer {
    faces: HashMap<[u8; 3], Vec<Vec<f32>>>,
    failing: Vec<[u8; 3]>,
    pub calls: usize,
}

impl FakeAnalyzer {
    pub fn with_faces(mut self, color: [u8; 3], embeddings: Vec<Vec<f32>>) -> Self {
        self.faces.insert(color, embeddings);
        self
    }

    pub fn failing_on(mut self, color: [u8; 3]) -> Self {
        self.failing.push(color);
        self
    }
}

impl FaceAnalyzer for FakeAnalyzer {
    fn analyze(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        self.calls += 1;
        let key = image.get_pixel(0, 0).0;
        if self.failing.contains(&key) {
            return Err(DetectorError::InferenceFailed(format!("no inference for {key:?}")).into());
        }
        let embeddings = self.faces.get(&key).cloned().unwrap_or_default();

        Ok(embeddings
            .into_iter()
            .enumerate()
            .map(|(i, values)| DetectedFace {
                bbox: BoundingBox {
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                    confidence: 1.0 - i as f32 * 0.1,
                    landmarks: None,
                },
                embedding: Embedding::new(values),
            })
            .collect())
    }
}

/// Write a small solid-color PNG, creating parent directories.
pub fn write_photo(path: &Path, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(4, 4, Rgb(color))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}
