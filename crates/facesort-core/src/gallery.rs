//! Reference gallery: one averaged centroid per known person.
//!
//! The known-faces directory holds one subdirectory per person, named after
//! them, containing sample photos:
//!
//! ```text
//! known_faces/
//!   alice/  a1.jpg a2.jpg
//!   bob/    b1.png
//! ```
//!
//! Only the first (highest-confidence) face of each sample photo contributes
//! to the centroid. Group shots in a reference folder therefore only count
//! their most prominent face.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::photo::{self, PhotoError};
use crate::types::{Embedding, Identity};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("listing {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// Known identities, ordered by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Gallery {
    identities: Vec<Identity>,
}

impl Gallery {
    /// Build a gallery, keeping it sorted by name. A later duplicate name
    /// replaces the earlier one.
    pub fn from_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let mut gallery = Self::default();
        for identity in identities {
            gallery.insert(identity);
        }
        gallery
    }

    pub fn insert(&mut self, identity: Identity) {
        match self
            .identities
            .binary_search_by(|probe| probe.name.as_str().cmp(&identity.name))
        {
            Ok(pos) => self.identities[pos] = identity,
            Err(pos) => self.identities.insert(pos, identity),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Identity> {
        self.identities
            .binary_search_by(|probe| probe.name.as_str().cmp(name))
            .ok()
            .map(|pos| &self.identities[pos])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identity> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl<'a> IntoIterator for &'a Gallery {
    type Item = &'a Identity;
    type IntoIter = std::slice::Iter<'a, Identity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// List a directory's entries sorted by path.
pub(crate) fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

fn read_dir_err(dir: &Path) -> impl FnOnce(std::io::Error) -> GalleryError + '_ {
    move |source| GalleryError::ReadDir {
        path: dir.display().to_string(),
        source,
    }
}

/// Build the gallery from a known-faces directory.
///
/// Undecodable sample photos are skipped with a warning unless `strict` is
/// set, in which case the first one aborts loading. People whose folder
/// yields no usable face are left out of the gallery.
pub fn load_gallery<A: FaceAnalyzer + ?Sized>(
    known_faces_dir: &Path,
    analyzer: &mut A,
    strict: bool,
) -> Result<Gallery, GalleryError> {
    let mut gallery = Gallery::default();

    for person_dir in sorted_entries(known_faces_dir).map_err(read_dir_err(known_faces_dir))? {
        if !person_dir.is_dir() {
            continue;
        }
        let Some(name) = person_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let embeddings = collect_samples(&person_dir, analyzer, strict)?;

        match Embedding::mean(&embeddings) {
            Some(centroid) => {
                tracing::info!(
                    identity = %name,
                    samples = embeddings.len(),
                    "loaded reference identity"
                );
                gallery.insert(Identity {
                    name,
                    centroid,
                    samples: embeddings.len(),
                });
            }
            None => {
                tracing::warn!(identity = %name, dir = %person_dir.display(), "no usable face found; identity omitted");
            }
        }
    }

    Ok(gallery)
}

/// First-face embedding of every usable sample photo in one person's folder.
fn collect_samples<A: FaceAnalyzer + ?Sized>(
    person_dir: &Path,
    analyzer: &mut A,
    strict: bool,
) -> Result<Vec<Embedding>, GalleryError> {
    let mut embeddings = Vec::new();

    for sample in sorted_entries(person_dir).map_err(read_dir_err(person_dir))? {
        if !sample.is_file() {
            continue;
        }

        let image = match photo::load_photo(&sample) {
            Ok(image) => image,
            Err(e) if !strict => {
                tracing::warn!(error = %e, "skipping unreadable reference photo");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let faces = analyzer.analyze(&image)?;
        match faces.into_iter().next() {
            Some(face) => embeddings.push(face.embedding),
            None => tracing::debug!(path = %sample.display(), "no face in reference photo"),
        }
    }

    Ok(embeddings)
}
