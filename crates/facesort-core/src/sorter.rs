//! Distribute album photos into per-person folders.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::gallery::{sorted_entries, Gallery};
use crate::matcher::{self, MatchPolicy, DEFAULT_THRESHOLD};
use crate::photo::{self, PhotoError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("listing {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("creating {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("copying {from} to {to}: {source}")]
    Copy {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

#[derive(Debug, Clone)]
pub struct SortOptions {
    /// Euclidean distance below which a face matches an identity.
    pub threshold: f32,
    pub policy: MatchPolicy,
    /// Log the copies that would be made without touching the output root.
    pub dry_run: bool,
    /// Abort on the first undecodable photo instead of skipping it.
    pub strict: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            policy: MatchPolicy::default(),
            dry_run: false,
            strict: false,
        }
    }
}

/// What happened to one photo.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoOutcome {
    pub path: PathBuf,
    pub faces: usize,
    pub matches: Vec<String>,
}

/// Summary of a sorting run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SortReport {
    pub photos: Vec<PhotoOutcome>,
    /// Files that could not be decoded.
    pub skipped: Vec<PathBuf>,
    /// Copies made (or planned, in a dry run).
    pub copies: usize,
}

impl SortReport {
    /// Photos with at least one match.
    pub fn matched(&self) -> usize {
        self.photos.iter().filter(|p| !p.matches.is_empty()).count()
    }
}

/// Recognize every photo in `input_dir` and copy it to
/// `output_dir/<name>/` once for each matched identity.
///
/// Only regular files directly inside `input_dir` are considered, in name
/// order. Existing copies are overwritten, so repeated runs converge on the
/// same output.
pub fn sort_photos<A: FaceAnalyzer + ?Sized>(
    input_dir: &Path,
    output_dir: &Path,
    gallery: &Gallery,
    analyzer: &mut A,
    options: &SortOptions,
) -> Result<SortReport, SortError> {
    let entries = sorted_entries(input_dir).map_err(|source| SortError::ReadDir {
        path: input_dir.display().to_string(),
        source,
    })?;

    let mut report = SortReport::default();

    for path in entries {
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        let image = match photo::load_photo(&path) {
            Ok(image) => image,
            Err(e) if !options.strict => {
                tracing::warn!(error = %e, "skipping unreadable photo");
                report.skipped.push(path);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let recognition =
            matcher::recognize(analyzer, &image, gallery, options.threshold, options.policy)?;

        tracing::info!(
            photo = %path.display(),
            faces = recognition.faces,
            matches = ?recognition.names,
            "recognized"
        );

        for name in &recognition.names {
            let person_dir = output_dir.join(name);
            let target = person_dir.join(file_name);

            if options.dry_run {
                tracing::info!(from = %path.display(), to = %target.display(), "dry run: would copy");
            } else {
                std::fs::create_dir_all(&person_dir).map_err(|source| SortError::CreateDir {
                    path: person_dir.display().to_string(),
                    source,
                })?;
                std::fs::copy(&path, &target).map_err(|source| SortError::Copy {
                    from: path.display().to_string(),
                    to: target.display().to_string(),
                    source,
                })?;
                tracing::debug!(to = %target.display(), "copied");
            }
            report.copies += 1;
        }

        report.photos.push(PhotoOutcome {
            path,
            faces: recognition.faces,
            matches: recognition.names,
        });
    }

    Ok(report)
}
