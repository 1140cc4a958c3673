//! Shared fixtures for ripple integration tests.
//!
//! All tests work against temp directories — no side effects on the
//! real repository. `Workspace` lays out a Go module on disk;
//! `GitRepo` builds throwaway git repositories for the differ tests.

// Each integration test binary compiles its own copy of this module and
// uses a different subset of it.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use ripple::{FileDiffer, Ripple, WorkspaceMode};

/// The module path used by every workspace fixture.
pub const MODULE: &str = "ripple.test";

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// A Go module laid out in a temp directory.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace with a `go.mod` and the given
    /// (relative path, contents) files.
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        fs::write(
            dir.path().join("go.mod"),
            format!("module {MODULE}\n\ngo 1.21\n"),
        )
        .unwrap();

        let ws = Self { dir };
        for (rel, contents) in files {
            ws.write(rel, contents);
        }
        ws
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn abs(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.abs(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn remove_file(&self, rel: &str) {
        fs::remove_file(self.abs(rel)).unwrap();
    }

    pub fn remove_dir(&self, rel: &str) {
        fs::remove_dir_all(self.abs(rel)).unwrap();
    }

    /// The canonical import path of a package directory.
    pub fn import_path(&self, rel: &str) -> String {
        format!("{MODULE}/{rel}")
    }

    /// An engine over this workspace whose change set is the given
    /// relative paths.
    pub fn engine(&self, changed: &[&str]) -> Ripple {
        self.engine_with(changed, &[], &[])
    }

    /// Like [`Workspace::engine`], with prefix filters and build tags.
    pub fn engine_with(&self, changed: &[&str], prefixes: &[&str], tags: &[&str]) -> Ripple {
        let files: Vec<PathBuf> = changed.iter().map(|rel| self.abs(rel)).collect();
        let mode = WorkspaceMode::detect_in(self.root()).expect("fixture has a go.mod");

        Ripple::builder()
            .differ(FileDiffer::new(files))
            .workspace_mode(mode)
            .prefixes(prefixes.iter().copied())
            .build_tags(tags.iter().copied())
            .build()
            .expect("engine construction should succeed")
    }
}

/// A minimal Go source file that imports the given workspace packages.
pub fn go_source(package: &str, imports: &[&str]) -> String {
    let mut src = format!("package {package}\n");
    if !imports.is_empty() {
        src.push_str("\nimport (\n");
        for import in imports {
            src.push_str(&format!("\t_ \"{MODULE}/{import}\"\n"));
        }
        src.push_str(")\n");
    }
    src
}

// ---------------------------------------------------------------------------
// GitRepo
// ---------------------------------------------------------------------------

/// A throwaway git repository.
pub struct GitRepo {
    dir: TempDir,
}

impl GitRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let repo = Self { dir };

        repo.git(&["init", "-b", "master"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The repository root as git reports it (symlinks resolved).
    pub fn canonical_root(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    pub fn git(&self, args: &[&str]) -> String {
        let out = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("failed to run git");
        assert!(
            out.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).into_owned()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.dir.path().join(rel)).unwrap();
    }

    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message]);
    }
}
