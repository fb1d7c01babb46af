//! Job catalog: the immutable list of images processed in one run

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CompressError, Result};
use crate::processing::is_catalog_extension;

/// One unit of work. The index is its identity for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source_path: PathBuf,
    pub index: usize,
}

/// Ordered, read-only job list shared by every worker
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    jobs: Vec<Job>,
}

impl Catalog {
    /// Enumerate eligible files directly inside `input_dir`.
    ///
    /// With `filter` set, only a file with exactly that name is included,
    /// whatever its extension. Otherwise every `jpg`, `jpeg` or `png` file is
    /// included in directory iteration order.
    pub fn build(input_dir: &Path, filter: Option<&str>) -> Result<Self> {
        if !input_dir.is_dir() {
            return Err(CompressError::directory_not_found(input_dir));
        }

        let mut jobs = Vec::new();
        let walker = WalkDir::new(input_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Broken symlinks and unreadable entries are not jobs
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let eligible = match filter {
                Some(name) => entry.file_name().to_str() == Some(name),
                None => entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(is_catalog_extension),
            };

            if eligible {
                jobs.push(Job {
                    source_path: entry.into_path(),
                    index: jobs.len(),
                });
            }
        }

        debug!("Catalog built from {:?}: {} jobs", input_dir, jobs.len());
        Ok(Self { jobs })
    }

    /// Build a catalog from an explicit list of paths
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let jobs = paths
            .into_iter()
            .enumerate()
            .map(|(index, source_path)| Job { source_path, index })
            .collect();
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Job at `index`, `None` outside `[0, len)`
    pub fn get(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}
