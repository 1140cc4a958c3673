//! The change-detection capability and its directory-level view.
//!
//! A [`Differ`] reports which files changed relative to some baseline.
//! All of its views derive from a single changed-file set: grouped by
//! containing directory ([`Differ::diff_dirs`]), as a per-file existence
//! map ([`Differ::diff_files`]), or as changed module-manifest
//! dependencies ([`Differ::diff_manifest_deps`]).

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::DiffError;

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Changes to a directory and its contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    /// Whether the directory is present after the change.
    pub exists: bool,
    /// Basenames of the changed files within the directory (not the
    /// directory's full contents).
    pub files: Vec<String>,
}

// ---------------------------------------------------------------------------
// Differ
// ---------------------------------------------------------------------------

/// Produces the set of changed paths, viewed several ways.
pub trait Differ {
    /// Changed directories, keyed by absolute path.
    fn diff_dirs(&self) -> Result<BTreeMap<PathBuf, Directory>, DiffError>;

    /// Changed files, keyed by absolute path. A `false` value means the
    /// file was deleted.
    fn diff_files(&self) -> Result<BTreeMap<PathBuf, bool>, DiffError>;

    /// Module-manifest dependencies that changed. Empty for differs
    /// that do not consult version control.
    fn diff_manifest_deps(&self) -> Result<BTreeSet<String>, DiffError>;
}

/// Group a changed-file set by containing directory.
///
/// `exists` reflects the directory's presence on disk at call time.
pub(crate) fn group_by_dir(files: &BTreeSet<PathBuf>) -> BTreeMap<PathBuf, Directory> {
    let mut dirs: BTreeMap<PathBuf, Directory> = BTreeMap::new();

    for abs in files {
        let Some(parent) = abs.parent() else {
            continue;
        };
        let Some(name) = abs.file_name() else {
            continue;
        };

        let dir = dirs.entry(parent.to_path_buf()).or_insert_with(|| Directory {
            exists: parent.exists(),
            files: Vec::new(),
        });
        dir.files.push(name.to_string_lossy().into_owned());
    }

    dirs
}

/// Report existence for each path in a changed-file set.
pub(crate) fn existence_of(files: &BTreeSet<PathBuf>) -> BTreeMap<PathBuf, bool> {
    files
        .iter()
        .map(|abs| (abs.clone(), abs.exists()))
        .collect()
}

// ---------------------------------------------------------------------------
// FileDiffer
// ---------------------------------------------------------------------------

/// A differ over an explicit list of absolute file paths.
///
/// All paths are reported as existing when present on disk; there is no
/// version-control involvement, so manifest-dependency changes are
/// always empty.
#[derive(Clone, Debug)]
pub struct FileDiffer {
    changed: BTreeSet<PathBuf>,
}

impl FileDiffer {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            changed: files.into_iter().map(Into::into).collect(),
        }
    }
}

impl Differ for FileDiffer {
    fn diff_dirs(&self) -> Result<BTreeMap<PathBuf, Directory>, DiffError> {
        Ok(group_by_dir(&self.changed))
    }

    fn diff_files(&self) -> Result<BTreeMap<PathBuf, bool>, DiffError> {
        Ok(existence_of(&self.changed))
    }

    fn diff_manifest_deps(&self) -> Result<BTreeSet<String>, DiffError> {
        Ok(BTreeSet::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
