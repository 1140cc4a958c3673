//! The change-selection engine.
//!
//! [`Ripple`] wires a [`Differ`] and a [`Packager`] together: the differ
//! reports which directories changed, the classifier resolves them to
//! package identities (handling deletions, test-only changes, embedded
//! assets, and directories the go tool ignores), and the propagator
//! walks the reverse import graph to find every package dirtied by the
//! change.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::differ::{Differ, Directory};
use crate::error::Error;
use crate::git::GitDiffer;
use crate::loader::{WorkspaceLoader, WorkspaceMode};
use crate::output::Packages;
use crate::packager::{Package, PackageError, Packager};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Ripple`]. Later calls overwrite earlier ones.
#[derive(Default)]
pub struct RippleBuilder {
    differ: Option<Box<dyn Differ>>,
    packager: Option<Box<dyn Packager>>,
    prefixes: Vec<String>,
    build_tags: Vec<String>,
    workspace_mode: Option<WorkspaceMode>,
}

impl RippleBuilder {
    /// Use a specific differ instead of the default git differ.
    pub fn differ(mut self, differ: impl Differ + 'static) -> Self {
        self.differ = Some(Box::new(differ));
        self
    }

    /// Use a specific packager instead of the default workspace loader.
    pub fn packager(mut self, packager: impl Packager + 'static) -> Self {
        self.packager = Some(Box::new(packager));
        self
    }

    /// Keep only packages whose import path starts with one of these
    /// prefixes. An empty list keeps everything.
    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Build-constraint tags to satisfy when loading packages.
    pub fn build_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Use an explicit workspace mode instead of detecting one from the
    /// environment and the current directory.
    pub fn workspace_mode(mut self, mode: WorkspaceMode) -> Self {
        self.workspace_mode = Some(mode);
        self
    }

    pub fn build(self) -> Result<Ripple, Error> {
        let mode = match self.workspace_mode {
            Some(mode) => mode,
            None => WorkspaceMode::detect()?,
        };
        let roots = mode.roots();

        let differ = self
            .differ
            .unwrap_or_else(|| Box::new(GitDiffer::new()));

        // The default loader is created only now, after all options have
        // applied, so a caller-supplied packager is used as-is. It loads
        // every package rather than just the prefix subtrees: a package
        // excluded by build constraints on one platform must still
        // appear in the graph when another platform's files change.
        let packager = match self.packager {
            Some(packager) => packager,
            None => Box::new(WorkspaceLoader::load_with_mode(mode, &[], &self.build_tags)),
        };

        Ok(Ripple {
            differ: Some(differ),
            packager: Some(packager),
            prefixes: self.prefixes,
            roots,
        })
    }
}

// ---------------------------------------------------------------------------
// Ripple
// ---------------------------------------------------------------------------

/// Computes dirty packages and their dependents.
pub struct Ripple {
    differ: Option<Box<dyn Differ>>,
    packager: Option<Box<dyn Packager>>,
    prefixes: Vec<String>,
    roots: Vec<PathBuf>,
}

impl Ripple {
    pub fn builder() -> RippleBuilder {
        RippleBuilder::default()
    }

    /// Compute the changed packages, their dependents, and the union of
    /// both.
    ///
    /// A package "foo" imported by "bar" and "qux" yields, when "foo"
    /// changes:
    ///
    /// ```text
    /// dependencies = {"foo": ["bar", "qux"]}
    /// changes      = ["foo"]
    /// all_changes  = ["foo", "bar", "qux"]
    /// ```
    ///
    /// All lists are sorted ascending by import path.
    pub fn changed_packages(&self) -> Result<Packages, Error> {
        let paths = self.marked_packages()?;
        let packager = self.packager.as_deref().ok_or(Error::NoPackager)?;

        let mut dependencies = BTreeMap::new();
        let mut changes = Vec::new();
        let mut all_changes: BTreeMap<String, Package> = BTreeMap::new();

        for (change, marked) in &paths {
            let mut dependents = Vec::new();

            for (import_path, needs_lookup) in marked {
                let pkg = if *needs_lookup {
                    packager
                        .package_from_import(import_path)
                        .map_err(|_| Error::Resolve {
                            import_path: import_path.clone(),
                        })?
                } else {
                    // Deleted packages are carried as bare identities.
                    Package::bare(import_path.clone())
                };

                if !has_prefix_in(&pkg.import_path, &self.prefixes) {
                    continue;
                }

                all_changes.insert(pkg.import_path.clone(), pkg.clone());
                if pkg.import_path == *change {
                    changes.push(pkg);
                } else {
                    dependents.push(pkg);
                }
            }

            if !dependents.is_empty() {
                dependents.sort();
                dependencies.insert(change.clone(), dependents);
            }
        }

        changes.sort();
        Ok(Packages {
            dependencies,
            changes,
            all_changes: all_changes.into_values().collect(),
        })
    }

    /// Classify the diff into changed package identities and mark each
    /// one's reverse-dependency closure.
    ///
    /// The outer map is keyed by changed import path. The inner map
    /// holds the closure; a `true` value means the package still exists
    /// and must be resolved, `false` means it was deleted.
    fn marked_packages(&self) -> Result<BTreeMap<String, BTreeMap<String, bool>>, Error> {
        let differ = self.differ.as_deref().ok_or(Error::NoDiffer)?;
        let packager = self.packager.as_deref().ok_or(Error::NoPackager)?;

        let dirs = differ.diff_dirs()?;

        // Identity → deleted. Built up from the per-directory passes.
        let mut changed: BTreeMap<String, bool> = BTreeMap::new();
        let mut embedded_changed: BTreeSet<String> = BTreeSet::new();
        let mut only_tests_affected: BTreeSet<PathBuf> = BTreeSet::new();
        let mut only_test_packages: BTreeSet<String> = BTreeSet::new();

        for (abs, dir) in &dirs {
            let mut abs = abs.clone();
            let mut dir = dir.clone();

            // An embedded file may live in a directory with or without
            // source files and may be embedded by several packages, so
            // record every embedding package as changed up front.
            for file in &dir.files {
                for import_path in packager.embedded_by(&abs.join(file)) {
                    embedded_changed.insert(import_path.clone());
                    // The embedding package is known to exist.
                    changed.insert(import_path, false);
                }
            }

            if is_ignored_by_go(&abs, &self.roots) {
                if !is_testdata(&abs) {
                    continue;
                }

                let ancestor = deepest_unignored_dir(&abs, &self.roots);
                if dirs.contains_key(&ancestor) {
                    // The ancestor is handled on its own pass.
                    continue;
                }
                if ancestor == Path::new("/") {
                    continue;
                }

                // Changes under testdata affect only the tests of the
                // enclosing package. The ancestor is assumed to exist:
                // it is not in the diff, so nothing deleted it wholesale.
                abs = ancestor;
                only_tests_affected.insert(abs.clone());
                dir = Directory {
                    exists: true,
                    files: Vec::new(),
                };
            } else if has_only_test_filenames(&dir.files) {
                only_tests_affected.insert(abs.clone());
            }

            // A deleted directory that contained no source files is not
            // a package change. Embedded files were already handled; for
            // a deleted file there is no way to know whether it used to
            // be embedded.
            if !dir.exists && !has_go_file(&dir.files) {
                continue;
            }

            match packager.package_from_dir(&abs) {
                Ok(pkg) => {
                    let mut should_mark = has_go_file(&dir.files);
                    if only_tests_affected.contains(&abs) {
                        only_test_packages.insert(pkg.import_path.clone());
                        should_mark = true;
                    }
                    if only_test_packages.contains(&pkg.import_path) {
                        should_mark = true;
                    }
                    if should_mark {
                        changed.insert(pkg.import_path, false);
                    }
                }
                Err(err) if err.is_no_go_files() => {
                    if has_go_file(&dir.files) {
                        // The sources are gone; recover the identity by
                        // walking up from the deleted leaf.
                        let Ok(import_path) = find_import_path(packager, &abs) else {
                            continue;
                        };
                        if only_tests_affected.contains(&abs) {
                            only_test_packages.insert(import_path.clone());
                        }
                        changed.insert(import_path, true);
                    }
                    // No source files before or after: nothing dirty.
                }
                Err(PackageError::Syntax { file, detail }) => {
                    tracing::debug!(file = %file.display(), detail = %detail, "skipping unbuildable directory");
                    continue;
                }
                Err(err) => {
                    if !dir.exists && has_go_file(&dir.files) {
                        if let Ok(import_path) = find_import_path(packager, &abs) {
                            if only_tests_affected.contains(&abs) {
                                only_test_packages.insert(import_path.clone());
                            }
                            changed.insert(import_path, true);
                        }
                        continue;
                    }
                    return Err(Error::Package {
                        dir: abs,
                        detail: err.to_string(),
                    });
                }
            }
        }

        // A changed embedded asset may be used by non-test code; there
        // is not enough information to assume it only affects tests.
        for import_path in &embedded_changed {
            only_test_packages.remove(import_path);
        }

        let graph = packager.dependent_graph().map_err(|err| Error::Load {
            detail: err.to_string(),
        })?;

        // Dependents of a changed module requirement are dirty too, when
        // the requirement (or a package under it) is in the graph.
        let manifest_deps = differ.diff_manifest_deps()?;
        if !manifest_deps.is_empty() {
            for node in graph.nodes() {
                let hit = manifest_deps
                    .iter()
                    .any(|dep| node == dep || node.starts_with(&format!("{dep}/")));
                if hit && !changed.contains_key(node) {
                    changed.insert(node.clone(), false);
                }
            }
        }

        let mut paths = BTreeMap::new();
        for (change, deleted) in &changed {
            let mut marked = BTreeMap::new();

            if only_test_packages.contains(change) {
                // Test-only changes do not dirty dependents.
                marked.insert(change.clone(), !*deleted);
                paths.insert(change.clone(), marked);
                continue;
            }

            graph.traverse(change, &mut marked);

            // Demote marks on identities whose packages were deleted:
            // there is nothing left on disk for dependents to resolve.
            for (import_path, mark) in marked.iter_mut() {
                if changed.get(import_path).copied().unwrap_or(false) {
                    *mark = false;
                }
            }

            paths.insert(change.clone(), marked);
        }

        Ok(paths)
    }
}

// ---------------------------------------------------------------------------
// Classifier helpers
// ---------------------------------------------------------------------------

fn has_go_file(files: &[String]) -> bool {
    files.iter().any(|f| f.ends_with(".go"))
}

/// True when every changed file is a test file. Vacuously true for an
/// empty list, which keeps file-less directory records from dirtying
/// dependents.
fn has_only_test_filenames(files: &[String]) -> bool {
    files.iter().all(|f| f.ends_with("_test.go"))
}

fn has_prefix_in(s: &str, prefixes: &[String]) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|p| s.starts_with(p.as_str()))
}

/// Whether the go tool would skip this directory when discovering
/// packages: some path segment below a workspace root starts with `.`
/// or `_`, or equals `testdata`.
fn is_ignored_by_go(name: &Path, roots: &[PathBuf]) -> bool {
    if roots.iter().any(|root| root.as_path() == name) {
        return false;
    }

    let Some(base) = name.file_name() else {
        return false;
    };
    let base = base.to_string_lossy();
    if base.starts_with('.') || base.starts_with('_') || base == "testdata" {
        return true;
    }

    match name.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => is_ignored_by_go(parent, roots),
        _ => false,
    }
}

fn is_testdata(name: &Path) -> bool {
    name.components()
        .any(|c| c.as_os_str() == "testdata")
}

/// The deepest ancestor of `name` (possibly `name` itself) that the go
/// tool does not ignore.
fn deepest_unignored_dir(name: &Path, roots: &[PathBuf]) -> PathBuf {
    if name == Path::new(".") || name == Path::new("/") {
        return name.to_path_buf();
    }

    if is_ignored_by_go(name, roots) {
        let parent = match name.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            Some(_) => Path::new("."),
            None => Path::new("/"),
        };
        return deepest_unignored_dir(parent, roots);
    }

    name.to_path_buf()
}

// ---------------------------------------------------------------------------
// find_import_path
// ---------------------------------------------------------------------------

/// No ancestor of a deleted directory could be resolved.
struct ImportPathNotFound;

/// Recover the import path of a directory whose sources are gone by
/// walking upward.
///
/// While the current directory does not exist, the walk recurses and
/// appends the directory's basename to whatever the parent resolves to,
/// reconstructing the deleted tail. Once an existing directory resolves
/// to a package, its import path is returned as-is — the tail has
/// already been collected by the unwinding recursion.
fn find_import_path(packager: &dyn Packager, abs: &Path) -> Result<String, ImportPathNotFound> {
    let Some(base) = abs.file_name().map(|b| b.to_string_lossy().into_owned()) else {
        return Err(ImportPathNotFound);
    };
    let parent = match abs.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Err(ImportPathNotFound),
    };

    if !abs.exists() {
        let import_path = find_import_path(packager, parent)?;
        return Ok(format!("{import_path}/{base}"));
    }

    match packager.package_from_dir(abs) {
        Ok(pkg) => Ok(pkg.import_path),
        Err(err) if err.is_no_go_files() => {
            // The directory exists but holds no sources; it may still
            // have a well-defined import path.
            if let Ok(pkg) = packager.package_from_empty_dir(abs) {
                return Ok(pkg.import_path);
            }
            let import_path = find_import_path(packager, parent)?;
            Ok(format!("{import_path}/{base}"))
        }
        Err(_) => {
            let import_path = find_import_path(packager, parent)?;
            Ok(format!("{import_path}/{base}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
