//! Photo acquisition for a chosen candidate
//!
//! Photos land in `<photo_root>/<identifier>/` as `1.jpeg`, `2.jpeg`, ...
//! The directory is reset on every acquisition, so nothing from an earlier
//! run for the same identifier survives. A failed transfer is logged and
//! skipped; numbering stays contiguous over the files actually saved.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::api::{CandidateRecord, PeopleSearch};
use crate::config::DEFAULT_PHOTO_SAMPLE_SIZE;
use crate::error::PersonaError;
use crate::identity::Identity;
use crate::Result;

/// Photo bodies are written in blocks of this many bytes
pub const WRITE_CHUNK_SIZE: usize = 1024;

/// Files written by one acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoReport {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
    /// Sampled URLs whose transfer failed
    pub skipped: usize,
}

/// Destination directory held for the duration of one acquisition.
///
/// Dropping the guard without [`PhotoDir::commit`] removes the directory,
/// which covers early returns and cancelled futures alike.
#[derive(Debug)]
pub struct PhotoDir {
    path: PathBuf,
    committed: bool,
}

impl PhotoDir {
    /// Remove `path` if it exists, then create it empty.
    pub async fn reset(path: PathBuf) -> Result<Self> {
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed previous photo directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&path).await?;
        Ok(PhotoDir {
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory and hand back its path.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PhotoDir {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Failed to clean up photo directory"
                    );
                }
            }
        }
    }
}

/// Storage directory name must be a single plain path component
fn check_identifier(identifier: &str) -> Result<()> {
    let plain = !identifier.is_empty()
        && identifier != "."
        && identifier != ".."
        && !identifier.contains(['/', '\\']);
    if plain {
        Ok(())
    } else {
        Err(PersonaError::InvariantViolation(format!(
            "identifier {identifier:?} is not usable as a directory name"
        )))
    }
}

/// Remove a half-written photo. Failures are logged; saved photos stay put.
async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial photo");
        }
    }
}

/// Downloads a random sample of a candidate's profile photos
pub struct PhotoAcquisitionService<'a, S: PeopleSearch + ?Sized> {
    search: &'a S,
    photo_root: PathBuf,
    sample_size: usize,
}

impl<'a, S: PeopleSearch + ?Sized> PhotoAcquisitionService<'a, S> {
    pub fn new(search: &'a S, photo_root: impl Into<PathBuf>) -> Self {
        PhotoAcquisitionService {
            search,
            photo_root: photo_root.into(),
            sample_size: DEFAULT_PHOTO_SAMPLE_SIZE,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    /// Highest-resolution URL of every listed photo, deduplicated in listing order.
    pub async fn photo_urls(&self, owner_id: i64) -> Result<Vec<String>> {
        let listing = self.search.profile_photos(owner_id).await.inspect_err(|e| {
            warn!(owner_id, error = %e, "Photo listing failed");
        })?;

        let mut seen = HashSet::new();
        Ok(listing
            .iter()
            .filter_map(|photo| photo.best_url())
            .filter(|url| seen.insert(url.to_string()))
            .map(str::to_string)
            .collect())
    }

    /// Fetch up to `sample_size` photos of `candidate` into the identity's directory.
    pub async fn acquire<R: Rng + ?Sized>(
        &self,
        candidate: &CandidateRecord,
        identity: &Identity,
        rng: &mut R,
    ) -> Result<PhotoReport> {
        let identifier = identity.identifier().ok_or_else(|| {
            PersonaError::InvariantViolation("photo acquisition requires an identifier".into())
        })?;
        check_identifier(identifier)?;

        let urls = self.photo_urls(candidate.id).await?;
        let sample: Vec<String> = urls
            .choose_multiple(rng, self.sample_size)
            .cloned()
            .collect();
        if sample.is_empty() {
            warn!(owner_id = candidate.id, "No usable photo URLs");
            return Err(PersonaError::EmptyCandidateSet {
                owner_id: candidate.id,
            });
        }

        let dir = PhotoDir::reset(self.photo_root.join(identifier)).await?;
        let mut files = Vec::with_capacity(sample.len());
        let mut skipped = 0;

        for url in &sample {
            let path = dir.path().join(format!("{}.jpeg", files.len() + 1));
            match self.download(url, &path).await {
                Ok(bytes) => {
                    debug!(url = %url, bytes, path = %path.display(), "Saved photo");
                    files.push(path);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Photo transfer failed, skipping");
                    discard_partial(&path).await;
                    skipped += 1;
                }
            }
        }

        if files.is_empty() {
            warn!(owner_id = candidate.id, skipped, "Every photo transfer failed");
            return Err(PersonaError::PhotoTransferFailed {
                owner_id: candidate.id,
                attempted: skipped,
            });
        }

        let directory = dir.commit();
        info!(
            identifier,
            saved = files.len(),
            skipped,
            "Photo acquisition complete"
        );
        Ok(PhotoReport {
            directory,
            files,
            skipped,
        })
    }

    /// Stream one URL into `path`, returning the byte count.
    async fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let mut stream = self.search.fetch_photo(url).await?;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            for block in chunk?.chunks(WRITE_CHUNK_SIZE) {
                file.write_all(block).await?;
                written += block.len() as u64;
            }
        }
        file.flush().await?;
        Ok(written)
    }
}
