//! Matching detected faces against the gallery.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::gallery::Gallery;
use crate::types::{Embedding, Identity};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default Euclidean distance threshold for a match.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Strategy for deciding which identities a single face matches.
///
/// A match always requires a distance strictly below `threshold`.
pub trait Matcher {
    fn matches<'g>(&self, probe: &Embedding, gallery: &'g Gallery, threshold: f32) -> Vec<&'g Identity>;
}

/// Every identity under the threshold matches, in gallery order.
///
/// A face close to two centroids is attributed to both.
pub struct ThresholdMatcher;

impl Matcher for ThresholdMatcher {
    fn matches<'g>(&self, probe: &Embedding, gallery: &'g Gallery, threshold: f32) -> Vec<&'g Identity> {
        gallery
            .iter()
            .filter(|identity| probe.euclidean_distance(&identity.centroid) < threshold)
            .collect()
    }
}

/// Only the closest identity matches, if it is under the threshold.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn matches<'g>(&self, probe: &Embedding, gallery: &'g Gallery, threshold: f32) -> Vec<&'g Identity> {
        let mut best: Option<(&Identity, f32)> = None;

        for identity in gallery {
            let distance = probe.euclidean_distance(&identity.centroid);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((identity, distance));
            }
        }

        match best {
            Some((identity, distance)) if distance < threshold => vec![identity],
            _ => Vec::new(),
        }
    }
}

/// Which [`Matcher`] to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Every identity under the threshold, per face ([`ThresholdMatcher`]).
    #[default]
    All,
    /// Closest identity under the threshold, per face ([`NearestMatcher`]).
    Nearest,
}

impl MatchPolicy {
    pub fn matcher(self) -> &'static dyn Matcher {
        match self {
            MatchPolicy::All => &ThresholdMatcher,
            MatchPolicy::Nearest => &NearestMatcher,
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchPolicy::All => "all",
            MatchPolicy::Nearest => "nearest",
        })
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(MatchPolicy::All),
            "nearest" => Ok(MatchPolicy::Nearest),
            other => Err(format!("unknown match policy '{other}' (expected 'all' or 'nearest')")),
        }
    }
}

/// Outcome of recognizing one photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recognition {
    /// Number of faces the analyzer found.
    pub faces: usize,
    /// Matched identity names, face by face. A name repeats when several
    /// faces match it.
    pub names: Vec<String>,
}

/// Detect every face in `image` and collect the identities each one matches.
pub fn recognize<A: FaceAnalyzer + ?Sized>(
    analyzer: &mut A,
    image: &RgbImage,
    gallery: &Gallery,
    threshold: f32,
    policy: MatchPolicy,
) -> Result<Recognition, AnalyzerError> {
    let faces = analyzer.analyze(image)?;
    let matcher = policy.matcher();

    let names = faces
        .iter()
        .flat_map(|face| matcher.matches(&face.embedding, gallery, threshold))
        .map(|identity| identity.name.clone())
        .collect();

    Ok(Recognition {
        faces: faces.len(),
        names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAnalyzer;
    use image::Rgb;

    fn gallery() -> Gallery {
        Gallery::from_identities([
            Identity { name: "alice".into(), centroid: Embedding::new(vec![1.0, 0.0, 0.0]), samples: 2 },
            Identity { name: "bob".into(), centroid: Embedding::new(vec![0.0, 1.0, 0.0]), samples: 1 },
        ])
    }

    fn photo(color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(4, 4, Rgb(color))
    }

    #[test]
    fn test_single_face_single_match() {
        let mut analyzer = FakeAnalyzer::default().with_faces([1, 1, 1], vec![vec![1.01, 0.0, 0.0]]);
        let result = recognize(&mut analyzer, &photo([1, 1, 1]), &gallery(), 0.6, MatchPolicy::All).unwrap();
        assert_eq!(result.faces, 1);
        assert_eq!(result.names, ["alice"]);
    }

    #[test]
    fn test_no_face_no_match() {
        let mut analyzer = FakeAnalyzer::default();
        let result = recognize(&mut analyzer, &photo([0, 0, 0]), &gallery(), 0.6, MatchPolicy::All).unwrap();
        assert_eq!(result, Recognition::default());
    }

    #[test]
    fn test_repeated_name_per_matching_face() {
        let mut analyzer = FakeAnalyzer::default()
            .with_faces([2, 2, 2], vec![vec![1.0, 0.1, 0.0], vec![0.9, 0.0, 0.0]]);
        let result = recognize(&mut analyzer, &photo([2, 2, 2]), &gallery(), 0.6, MatchPolicy::All).unwrap();
        assert_eq!(result.faces, 2);
        assert_eq!(result.names, ["alice", "alice"]);
    }

    #[test]
    fn test_multiple_identities_in_one_photo() {
        let mut analyzer = FakeAnalyzer::default()
            .with_faces([3, 3, 3], vec![vec![0.0, 1.0, 0.0], vec![5.0, 5.0, 5.0], vec![1.0, 0.0, 0.0]]);
        let result = recognize(&mut analyzer, &photo([3, 3, 3]), &gallery(), 0.6, MatchPolicy::All).unwrap();
        assert_eq!(result.faces, 3);
        assert_eq!(result.names, ["bob", "alice"]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let probe = Embedding::new(vec![1.5, 0.0, 0.0]); // exactly 0.5 from alice
        let gallery = gallery();
        assert!(ThresholdMatcher.matches(&probe, &gallery, 0.5).is_empty());
        assert_eq!(ThresholdMatcher.matches(&probe, &gallery, 0.51).len(), 1);
    }

    #[test]
    fn test_all_policy_matches_every_centroid_under_threshold() {
        // Equidistant (~0.707) from alice and bob.
        let probe = Embedding::new(vec![0.5, 0.5, 0.0]);
        let gallery = gallery();
        let names: Vec<_> = ThresholdMatcher
            .matches(&probe, &gallery, 0.8)
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[test]
    fn test_nearest_policy_picks_closest() {
        let probe = Embedding::new(vec![0.6, 0.4, 0.0]);
        let gallery = gallery();
        let names: Vec<_> = NearestMatcher
            .matches(&probe, &gallery, 0.8)
            .into_iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, ["alice"]);
    }

    #[test]
    fn test_nearest_policy_respects_threshold() {
        let probe = Embedding::new(vec![0.0, 0.0, 1.0]);
        assert!(NearestMatcher.matches(&probe, &gallery(), 0.6).is_empty());
        assert!(NearestMatcher.matches(&probe, &Gallery::default(), 0.6).is_empty());
    }

    #[test]
    fn test_match_policy_parse() {
        assert_eq!("all".parse::<MatchPolicy>(), Ok(MatchPolicy::All));
        assert_eq!("Nearest".parse::<MatchPolicy>(), Ok(MatchPolicy::Nearest));
        assert!("best".parse::<MatchPolicy>().is_err());
        assert_eq!(MatchPolicy::Nearest.to_string(), "nearest");
    }
}
