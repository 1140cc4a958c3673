//! Package identity and the package-resolution capability.
//!
//! A [`Package`] is identified by its canonical import path; the
//! directory is carried alongside but never participates in equality or
//! ordering. [`Packager`] is the seam between the engine and whatever
//! loads the workspace — production code uses
//! [`WorkspaceLoader`](crate::loader::WorkspaceLoader), tests supply
//! in-memory fakes.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::graph::Graph;

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// A Go package, identified by its canonical import path.
///
/// `dir` is the absolute path of the package directory, or empty when
/// the package was deleted or cannot be resolved on disk.
#[derive(Clone, Debug, Default)]
pub struct Package {
    pub import_path: String,
    pub dir: PathBuf,
}

impl Package {
    /// A package known only by identity (deleted or unresolvable).
    pub fn bare(import_path: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            dir: PathBuf::new(),
        }
    }

    /// A package resolved to a directory on disk.
    pub fn resolved(import_path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            import_path: import_path.into(),
            dir: dir.into(),
        }
    }
}

// Identity is the import path alone; `dir` is advisory.
impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.import_path == other.import_path
    }
}

impl Eq for Package {}

impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.import_path.cmp(&other.import_path)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.import_path)
    }
}

// ---------------------------------------------------------------------------
// PackageError
// ---------------------------------------------------------------------------

/// Errors from resolving directories and import paths to packages.
///
/// `NoGoFiles` and `Syntax` are soft conditions: the classifier skips
/// the affected directory instead of failing the run.
#[derive(Clone, Debug)]
pub enum PackageError {
    /// The directory contains no Go source files that satisfy the build
    /// constraints.
    NoGoFiles { dir: PathBuf },

    /// A source file header could not be scanned.
    Syntax { file: PathBuf, detail: String },

    /// The import path does not appear in the loaded graph.
    NotFound { import_path: String },

    /// The workspace load failed; retained and reported when the
    /// dependent graph is requested.
    Load { detail: String },

    /// The directory is not under any workspace root.
    OutsideWorkspace { dir: PathBuf },

    /// An I/O error while reading the directory or its files.
    Io { path: PathBuf, detail: String },
}

impl PackageError {
    /// Whether this is the "no buildable source files" sentinel.
    pub fn is_no_go_files(&self) -> bool {
        matches!(self, Self::NoGoFiles { .. })
    }
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGoFiles { dir } => {
                write!(f, "no buildable Go source files in {}", dir.display())
            }
            Self::Syntax { file, detail } => {
                write!(f, "scanning {}: {detail}", file.display())
            }
            Self::NotFound { import_path } => write!(f, "{import_path} not found"),
            Self::Load { detail } => write!(f, "loading workspace packages: {detail}"),
            Self::OutsideWorkspace { dir } => {
                write!(
                    f,
                    "directory {} is outside the workspace roots",
                    dir.display()
                )
            }
            Self::Io { path, detail } => write!(f, "reading {}: {detail}", path.display()),
        }
    }
}

impl std::error::Error for PackageError {}

// ---------------------------------------------------------------------------
// Packager
// ---------------------------------------------------------------------------

/// Access to package information for a Go workspace.
pub trait Packager {
    /// Resolve a directory to its package. Returns the
    /// [`PackageError::NoGoFiles`] sentinel when the directory holds no
    /// source files satisfying the build constraints.
    fn package_from_dir(&self, dir: &Path) -> Result<Package, PackageError>;

    /// Resolve a directory to its package without scanning for source
    /// files. Used to discover the import path of a directory that
    /// contains none (e.g. a deleted directory's surviving parent).
    fn package_from_empty_dir(&self, dir: &Path) -> Result<Package, PackageError>;

    /// Resolve an import path against the loaded graph.
    fn package_from_import(&self, import_path: &str) -> Result<Package, PackageError>;

    /// The reverse import graph: package → packages that import it.
    /// Fails with the retained first-load error, if any.
    fn dependent_graph(&self) -> Result<Graph, PackageError>;

    /// Import paths of packages that embed the file.
    fn embedded_by(&self, file: &Path) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_equality_ignores_dir() {
        let a = Package::resolved("example.com/mod/pkg", "/repo/pkg");
        let b = Package::bare("example.com/mod/pkg");
        assert_eq!(a, b);
    }

    #[test]
    fn package_ordering_is_by_import_path() {
        let mut pkgs = vec![
            Package::bare("example.com/mod/b"),
            Package::resolved("example.com/mod/a", "/repo/a"),
        ];
        pkgs.sort();
        assert_eq!(pkgs[0].import_path, "example.com/mod/a");
    }

    #[test]
    fn no_go_files_sentinel_is_detectable() {
        let err = PackageError::NoGoFiles {
            dir: PathBuf::from("/repo/docs"),
        };
        assert!(err.is_no_go_files());
        assert!(!PackageError::NotFound {
            import_path: "x".to_owned()
        }
        .is_no_go_files());
    }

    #[test]
    fn display_outside_workspace_names_dir() {
        let err = PackageError::OutsideWorkspace {
            dir: PathBuf::from("/elsewhere"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("/elsewhere"));
        assert!(msg.contains("outside the workspace"));
    }
}
