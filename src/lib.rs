//! ripple — incremental test selection for Go monorepos.
//!
//! Given the files changed relative to a baseline and the workspace's
//! import graph, ripple computes the directly-changed packages, the
//! transitive closure of packages depending on them, and the union of
//! both, optionally filtered by import-path prefixes. The result bounds
//! what needs rebuilding and retesting.
//!
//! ```no_run
//! use ripple::{GitDiffer, Ripple};
//!
//! # fn main() -> Result<(), ripple::Error> {
//! let engine = Ripple::builder()
//!     .differ(GitDiffer::builder().base_branch("origin/main").build())
//!     .prefixes(["example.com/mod/services"])
//!     .build()?;
//! let packages = engine.changed_packages()?;
//! for pkg in &packages.all_changes {
//!     println!("{pkg}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod differ;
pub mod engine;
pub mod error;
pub mod git;
pub mod graph;
pub mod loader;
pub mod output;
pub mod packager;

pub use differ::{Differ, Directory, FileDiffer};
pub use engine::{Ripple, RippleBuilder};
pub use error::{DiffError, Error};
pub use git::{GitDiffer, GitDifferBuilder};
pub use graph::Graph;
pub use loader::{WorkspaceLoader, WorkspaceMode};
pub use output::Packages;
pub use packager::{Package, PackageError, Packager};
