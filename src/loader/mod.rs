//! Workspace package loading.
//!
//! [`WorkspaceLoader`] is the production [`Packager`]: it walks the
//! workspace roots, discovers packages from `.go` file headers, and
//! assembles the forward and reverse import graphs, the embed-file
//! index, and the module-path index. Loading never touches the network
//! or the `go` binary; everything derives from the files on disk.
//!
//! Identities are canonical import paths. In module mode, packages
//! under `vendor/` are registered under their vendor-stripped import
//! path; in GOPATH mode vendor segments are preserved.

mod constraint;
mod gofile;

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::graph::Graph;
use crate::packager::{Package, PackageError, Packager};

pub use constraint::BuildTags;

// ---------------------------------------------------------------------------
// WorkspaceMode
// ---------------------------------------------------------------------------

/// How the workspace is rooted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkspaceMode {
    /// Module mode: one root, the directory holding `go.mod`.
    Module {
        root: PathBuf,
        module_path: String,
    },
    /// GOPATH mode (`GO111MODULE=off`): one root per GOPATH entry;
    /// packages live under `<root>/src`.
    Gopath { roots: Vec<PathBuf> },
}

impl WorkspaceMode {
    /// Detect the mode from the environment, starting the module-root
    /// search at the current directory.
    pub fn detect() -> Result<Self, Error> {
        let cwd = env::current_dir().map_err(|e| Error::WorkspaceRoot {
            detail: e.to_string(),
        })?;
        Self::detect_in(&cwd)
    }

    /// Detect the mode, searching for `go.mod` upward from `dir`.
    pub fn detect_in(dir: &Path) -> Result<Self, Error> {
        if env::var("GO111MODULE").as_deref() == Ok("off") {
            let gopath = env::var("GOPATH").unwrap_or_default();
            let mut roots: Vec<PathBuf> = env::split_paths(&gopath)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if roots.is_empty() {
                let home = env::var("HOME").map_err(|_| Error::WorkspaceRoot {
                    detail: "GOPATH is empty and HOME is not set".to_owned(),
                })?;
                roots.push(PathBuf::from(home).join("go"));
            }
            return Ok(Self::Gopath { roots });
        }

        let mut cur = dir;
        loop {
            let go_mod = cur.join("go.mod");
            if go_mod.is_file() {
                let module_path = module_path_from(&go_mod)?;
                return Ok(Self::Module {
                    root: cur.to_path_buf(),
                    module_path,
                });
            }
            match cur.parent() {
                Some(parent) => cur = parent,
                None => {
                    return Err(Error::WorkspaceRoot {
                        detail: format!("no go.mod found above {}", dir.display()),
                    })
                }
            }
        }
    }

    /// The directories that bound ignored-path checks and the package
    /// walk.
    pub fn roots(&self) -> Vec<PathBuf> {
        match self {
            Self::Module { root, .. } => vec![root.clone()],
            Self::Gopath { roots } => roots.clone(),
        }
    }

    /// Vendor segments are stripped from import paths in module mode
    /// only.
    pub fn strips_vendor(&self) -> bool {
        matches!(self, Self::Module { .. })
    }
}

/// Read the `module` directive from a `go.mod` file.
fn module_path_from(go_mod: &Path) -> Result<String, Error> {
    let contents = fs::read_to_string(go_mod).map_err(|e| Error::WorkspaceRoot {
        detail: format!("reading {}: {e}", go_mod.display()),
    })?;

    for line in contents.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("module") {
            let name = rest.trim().trim_matches('"');
            if !name.is_empty() {
                return Ok(name.to_owned());
            }
        }
    }

    Err(Error::WorkspaceRoot {
        detail: format!("{} has no module directive", go_mod.display()),
    })
}

/// Strip everything through the last `vendor/` segment.
fn strip_vendor(import_path: &str) -> &str {
    match import_path.rfind("/vendor/") {
        Some(idx) => &import_path[idx + "/vendor/".len()..],
        None => import_path
            .strip_prefix("vendor/")
            .unwrap_or(import_path),
    }
}

// ---------------------------------------------------------------------------
// WorkspaceLoader
// ---------------------------------------------------------------------------

/// The production package loader.
///
/// Constructed once per invocation; read-only afterwards. A first-load
/// failure is retained and surfaced by [`Packager::dependent_graph`],
/// so directory-level lookups still work against the partial state.
#[derive(Debug)]
pub struct WorkspaceLoader {
    mode: WorkspaceMode,
    tags: BuildTags,
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
    dirs_by_import: BTreeMap<String, PathBuf>,
    embed_index: BTreeMap<PathBuf, Vec<String>>,
    module_paths: BTreeMap<PathBuf, String>,
    /// Raw import strings per package, consumed by `connect_imports`.
    pending_imports: BTreeMap<String, BTreeSet<String>>,
    load_err: Option<String>,
}

impl WorkspaceLoader {
    /// Load the workspace detected from the environment.
    ///
    /// `patterns` restricts loading to import-path subtrees (an empty
    /// list or a single `...` loads everything); `tags` are additional
    /// satisfied build-constraint identifiers.
    pub fn load(patterns: &[String], tags: &[String]) -> Result<Self, Error> {
        Ok(Self::load_with_mode(WorkspaceMode::detect()?, patterns, tags))
    }

    /// Load with an explicit workspace mode. Scan failures are retained
    /// rather than returned.
    pub fn load_with_mode(mode: WorkspaceMode, patterns: &[String], tags: &[String]) -> Self {
        let mut loader = Self {
            mode,
            tags: BuildTags::new(tags.iter().cloned()),
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
            dirs_by_import: BTreeMap::new(),
            embed_index: BTreeMap::new(),
            module_paths: BTreeMap::new(),
            pending_imports: BTreeMap::new(),
            load_err: None,
        };

        let prefixes = pattern_prefixes(patterns);

        match loader.mode.clone() {
            WorkspaceMode::Module { root, module_path } => {
                loader.module_paths.insert(root.clone(), module_path.clone());
                loader.scan_tree(&root, Some(&module_path), &prefixes);
            }
            WorkspaceMode::Gopath { roots } => {
                for root in roots {
                    let src = root.join("src");
                    if src.is_dir() {
                        loader.scan_tree(&src, None, &prefixes);
                    }
                }
            }
        }

        loader.connect_imports();
        loader
    }

    /// Walk a root, collecting one package per directory that holds at
    /// least one source file satisfying the build constraints.
    fn scan_tree(&mut self, root: &Path, module_path: Option<&str>, prefixes: &[String]) {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    if dir == root {
                        self.load_err = Some(format!("reading {}: {e}", dir.display()));
                    } else {
                        tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    }
                    continue;
                }
            };

            let mut names: Vec<(PathBuf, bool)> = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                names.push((path, is_dir));
            }
            names.sort();

            let mut headers: Vec<gofile::GoFileHeader> = Vec::new();
            for (path, is_dir) in names {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                if is_dir {
                    // The go tool does not descend into dot, underscore,
                    // or testdata directories. vendor is walked so that
                    // vendored packages land in the graph.
                    if name.starts_with('.') || name.starts_with('_') || name == "testdata" {
                        continue;
                    }
                    pending.push(path);
                    continue;
                }

                if !name.ends_with(".go") || name.starts_with('.') || name.starts_with('_') {
                    continue;
                }

                let contents = match fs::read_to_string(&path) {
                    Ok(contents) => contents,
                    Err(e) => {
                        tracing::debug!(file = %path.display(), error = %e, "skipping unreadable file");
                        continue;
                    }
                };
                let header = match gofile::scan_header(&contents) {
                    Ok(header) => header,
                    Err(e) => {
                        tracing::debug!(file = %path.display(), error = %e, "skipping unscannable file");
                        continue;
                    }
                };

                if self.tags.includes_file(name, header.build_expr.as_deref()) {
                    headers.push(header);
                }
            }

            if headers.is_empty() {
                continue;
            }

            let Some(import_path) = self.import_path_under(&dir, root, module_path) else {
                continue;
            };

            if !prefixes.is_empty() && !prefixes.iter().any(|p| import_path.starts_with(p.as_str())) {
                continue;
            }

            let mut imports = BTreeSet::new();
            for header in &headers {
                imports.extend(header.imports.iter().cloned());

                for pattern in &header.embed_patterns {
                    for file in expand_embed_pattern(&dir, pattern) {
                        self.embed_index
                            .entry(file)
                            .or_default()
                            .push(import_path.clone());
                    }
                }
            }

            self.forward.entry(import_path.clone()).or_default();
            self.dirs_by_import.insert(import_path.clone(), dir.clone());
            self.pending_imports
                .entry(import_path)
                .or_default()
                .extend(imports);
        }
    }

    /// Resolve raw import strings into graph edges. Imports that do not
    /// name a loaded package (standard library, external modules without
    /// a vendored copy) contribute no edges. Self-edges — an external
    /// test package importing the package under test folds back into the
    /// same identity — are suppressed.
    fn connect_imports(&mut self) {
        let strips_vendor = self.mode.strips_vendor();
        let pending = std::mem::take(&mut self.pending_imports);

        for (pkg, imports) in &pending {
            for import in imports {
                let target = if strips_vendor {
                    strip_vendor(import)
                } else {
                    import.as_str()
                };

                if target == pkg || !self.forward.contains_key(target) {
                    continue;
                }

                self.forward
                    .get_mut(pkg.as_str())
                    .expect("package was registered during the scan")
                    .insert(target.to_owned());
                self.reverse
                    .entry(target.to_owned())
                    .or_default()
                    .insert(pkg.clone());
            }
        }
    }

    /// The canonical import path for a directory under `base`.
    fn import_path_under(&self, dir: &Path, base: &Path, module_path: Option<&str>) -> Option<String> {
        let rel = dir.strip_prefix(base).ok()?;
        let rel = path_to_slashes(rel);

        match module_path {
            Some(module_path) => {
                let joined = if rel.is_empty() {
                    module_path.to_owned()
                } else {
                    format!("{module_path}/{rel}")
                };
                if self.mode.strips_vendor() {
                    Some(strip_vendor(&joined).to_owned())
                } else {
                    Some(joined)
                }
            }
            None => {
                if rel.is_empty() {
                    return None;
                }
                Some(rel)
            }
        }
    }

    /// The canonical import path for an arbitrary absolute directory,
    /// whether or not it was loaded.
    fn import_path_for_dir(&self, dir: &Path) -> Result<String, PackageError> {
        match &self.mode {
            WorkspaceMode::Module { .. } => {
                // There may be nested modules; resolve against the
                // deepest module root containing the directory.
                let mut best: Option<(&PathBuf, &String)> = None;
                for (root, module_path) in &self.module_paths {
                    if dir.starts_with(root)
                        && best.is_none_or(|(b, _)| root.components().count() > b.components().count())
                    {
                        best = Some((root, module_path));
                    }
                }
                best.and_then(|(root, module_path)| {
                    self.import_path_under(dir, root, Some(module_path))
                })
                .ok_or_else(|| PackageError::OutsideWorkspace {
                    dir: dir.to_path_buf(),
                })
            }
            WorkspaceMode::Gopath { roots } => {
                for root in roots {
                    if let Some(ip) = self.import_path_under(dir, &root.join("src"), None) {
                        return Ok(ip);
                    }
                }
                Err(PackageError::OutsideWorkspace {
                    dir: dir.to_path_buf(),
                })
            }
        }
    }
}

impl Packager for WorkspaceLoader {
    fn package_from_dir(&self, dir: &Path) -> Result<Package, PackageError> {
        let import_path = self.import_path_for_dir(dir)?;

        let entries = fs::read_dir(dir).map_err(|e| PackageError::Io {
            path: dir.to_path_buf(),
            detail: e.to_string(),
        })?;

        let mut saw_go_file = false;
        let mut any_included = false;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".go") || name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            saw_go_file = true;

            let contents = fs::read_to_string(&path).map_err(|e| PackageError::Io {
                path: path.clone(),
                detail: e.to_string(),
            })?;
            let header = gofile::scan_header(&contents).map_err(|e| PackageError::Syntax {
                file: path.clone(),
                detail: e.to_string(),
            })?;

            if self.tags.includes_file(name, header.build_expr.as_deref()) {
                any_included = true;
            }
        }

        if !saw_go_file || !any_included {
            return Err(PackageError::NoGoFiles {
                dir: dir.to_path_buf(),
            });
        }

        Ok(Package::resolved(import_path, dir))
    }

    fn package_from_empty_dir(&self, dir: &Path) -> Result<Package, PackageError> {
        let import_path = self.import_path_for_dir(dir)?;
        Ok(Package::resolved(import_path, dir))
    }

    fn package_from_import(&self, import_path: &str) -> Result<Package, PackageError> {
        let import_path = if self.mode.strips_vendor() {
            strip_vendor(import_path)
        } else {
            import_path
        };

        if !self.forward.contains_key(import_path) {
            return Err(PackageError::NotFound {
                import_path: import_path.to_owned(),
            });
        }

        let dir = self
            .dirs_by_import
            .get(import_path)
            .cloned()
            .unwrap_or_default();
        Ok(Package {
            import_path: import_path.to_owned(),
            dir,
        })
    }

    fn dependent_graph(&self) -> Result<Graph, PackageError> {
        if let Some(detail) = &self.load_err {
            return Err(PackageError::Load {
                detail: detail.clone(),
            });
        }
        Ok(Graph::new(self.reverse.clone()))
    }

    fn embedded_by(&self, file: &Path) -> Vec<String> {
        self.embed_index.get(file).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reduce load patterns to plain import-path prefixes. An empty list or
/// a lone `...` means "everything".
fn pattern_prefixes(patterns: &[String]) -> Vec<String> {
    let mut prefixes = Vec::new();
    for pattern in patterns {
        if pattern == "..." {
            return Vec::new();
        }
        let trimmed = pattern.trim_end_matches("...").trim_end_matches('/');
        if !trimmed.is_empty() {
            prefixes.push(trimmed.to_owned());
        }
    }
    prefixes
}

fn path_to_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Expand one `//go:embed` pattern into the files it embeds. Directory
/// matches are walked recursively; dot and underscore entries are
/// skipped unless the pattern carries the `all:` prefix.
fn expand_embed_pattern(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let (pattern, include_hidden) = match pattern.strip_prefix("all:") {
        Some(rest) => (rest, true),
        None => (pattern, false),
    };

    let full = dir.join(pattern);
    let Some(full_str) = full.to_str() else {
        return Vec::new();
    };

    let matches = match glob::glob(full_str) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::debug!(pattern, error = %e, "skipping invalid embed pattern");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for path in matches.flatten() {
        collect_embedded(&path, include_hidden, &mut files);
    }
    files
}

fn collect_embedded(path: &Path, include_hidden: bool, files: &mut Vec<PathBuf>) {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') || n.starts_with('_'))
        .unwrap_or(false);
    if hidden && !include_hidden {
        return;
    }

    if path.is_dir() {
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        let mut children: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        children.sort();
        for child in children {
            collect_embedded(&child, include_hidden, files);
        }
    } else {
        files.push(path.to_path_buf());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MODULE: &str = "example.com/mod";

    /// Lay out a Go module in a temp dir from (relative path, contents)
    /// pairs and return the loader over it.
    fn module_fixture(files: &[(&str, &str)]) -> (TempDir, WorkspaceLoader) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), format!("module {MODULE}\n\ngo 1.21\n")).unwrap();

        for (rel, contents) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        let mode = WorkspaceMode::detect_in(tmp.path()).unwrap();
        let loader = WorkspaceLoader::load_with_mode(mode, &[], &[]);
        (tmp, loader)
    }

    fn ip(rel: &str) -> String {
        format!("{MODULE}/{rel}")
    }

    #[test]
    fn detect_in_finds_module_root_above_nested_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), "module example.com/mod\n").unwrap();
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let mode = WorkspaceMode::detect_in(&nested).unwrap();
        match mode {
            WorkspaceMode::Module { root, module_path } => {
                assert_eq!(root, tmp.path());
                assert_eq!(module_path, "example.com/mod");
            }
            other => panic!("expected module mode, got {other:?}"),
        }
    }

    #[test]
    fn detect_in_fails_without_go_mod() {
        let tmp = TempDir::new().unwrap();
        assert!(WorkspaceMode::detect_in(tmp.path()).is_err());
    }

    #[test]
    fn load_builds_forward_and_reverse_graphs() {
        let (_tmp, loader) = module_fixture(&[
            ("c/c.go", "package c\n"),
            ("b/b.go", "package b\n\nimport \"example.com/mod/c\"\n\nvar _ = c.Nothing\n"),
            ("a/a.go", "package a\n\nimport \"example.com/mod/b\"\n"),
        ]);

        assert!(loader.forward[&ip("b")].contains(&ip("c")));
        assert!(loader.forward[&ip("a")].contains(&ip("b")));
        assert!(loader.reverse[&ip("c")].contains(&ip("b")));
        assert!(loader.reverse[&ip("b")].contains(&ip("a")));
        assert!(!loader.reverse.contains_key(&ip("a")));
    }

    #[test]
    fn external_and_stdlib_imports_contribute_no_edges() {
        let (_tmp, loader) = module_fixture(&[(
            "a/a.go",
            "package a\n\nimport (\n\t\"fmt\"\n\t\"github.com/elsewhere/dep\"\n)\n",
        )]);

        assert!(loader.forward[&ip("a")].is_empty());
        assert!(!loader.reverse.contains_key("fmt"));
    }

    #[test]
    fn test_file_imports_fold_into_the_package() {
        let (_tmp, loader) = module_fixture(&[
            ("util/util.go", "package util\n"),
            ("a/a.go", "package a\n"),
            (
                "a/a_test.go",
                "package a_test\n\nimport (\n\t\"example.com/mod/a\"\n\t\"example.com/mod/util\"\n)\n",
            ),
        ]);

        // The external test package folds into `a`: the util edge is
        // attributed to `a`, and the self-import is suppressed.
        assert!(loader.forward[&ip("a")].contains(&ip("util")));
        assert!(!loader.forward[&ip("a")].contains(&ip("a")));
        assert!(loader.reverse[&ip("util")].contains(&ip("a")));
    }

    #[test]
    fn vendored_packages_are_registered_vendor_stripped() {
        let (_tmp, loader) = module_fixture(&[
            ("vendor/github.com/x/y/y.go", "package y\n"),
            ("a/a.go", "package a\n\nimport \"github.com/x/y\"\n"),
        ]);

        assert!(loader.forward.contains_key("github.com/x/y"));
        assert!(loader.forward[&ip("a")].contains("github.com/x/y"));
        assert!(loader.reverse["github.com/x/y"].contains(&ip("a")));
    }

    #[test]
    fn ignored_directories_are_not_loaded() {
        let (_tmp, loader) = module_fixture(&[
            ("a/a.go", "package a\n"),
            ("a/testdata/fake.go", "package fake\n"),
            ("_attic/old.go", "package old\n"),
            (".hidden/h.go", "package h\n"),
        ]);

        assert!(loader.forward.contains_key(&ip("a")));
        assert!(!loader.forward.contains_key(&ip("a/testdata")));
        assert!(!loader.forward.contains_key(&ip("_attic")));
        assert!(!loader.forward.contains_key(&ip(".hidden")));
    }

    #[test]
    fn constrained_files_do_not_form_packages() {
        let (_tmp, loader) = module_fixture(&[(
            "constrained/constrained.go",
            "//go:build never_set_tag\n\npackage constrained\n",
        )]);

        assert!(!loader.forward.contains_key(&ip("constrained")));
    }

    #[test]
    fn tags_admit_constrained_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), format!("module {MODULE}\n")).unwrap();
        let dir = tmp.path().join("constrained");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("constrained.go"),
            "//go:build special\n\npackage constrained\n",
        )
        .unwrap();

        let mode = WorkspaceMode::detect_in(tmp.path()).unwrap();
        let loader = WorkspaceLoader::load_with_mode(mode, &[], &["special".to_owned()]);
        assert!(loader.forward.contains_key(&ip("constrained")));
    }

    #[test]
    fn embed_index_maps_files_to_embedding_packages() {
        let (tmp, loader) = module_fixture(&[
            (
                "assets/assets.go",
                "package assets\n\nimport \"embed\"\n\n//go:embed README.md\nvar readme embed.FS\n",
            ),
            ("assets/README.md", "# readme\n"),
        ]);

        let embedded = loader.embedded_by(&tmp.path().join("assets/README.md"));
        assert_eq!(embedded, vec![ip("assets")]);
        assert!(loader.embedded_by(&tmp.path().join("assets/assets.go")).is_empty());
    }

    #[test]
    fn embed_directory_pattern_walks_recursively() {
        let (tmp, loader) = module_fixture(&[
            (
                "site/site.go",
                "package site\n\nimport \"embed\"\n\n//go:embed static\nvar static embed.FS\n",
            ),
            ("site/static/app.js", "js\n"),
            ("site/static/css/app.css", "css\n"),
        ]);

        assert_eq!(
            loader.embedded_by(&tmp.path().join("site/static/app.js")),
            vec![ip("site")]
        );
        assert_eq!(
            loader.embedded_by(&tmp.path().join("site/static/css/app.css")),
            vec![ip("site")]
        );
    }

    #[test]
    fn package_from_dir_resolves_import_path() {
        let (tmp, loader) = module_fixture(&[("a/a.go", "package a\n")]);
        let pkg = loader.package_from_dir(&tmp.path().join("a")).unwrap();
        assert_eq!(pkg.import_path, ip("a"));
        assert_eq!(pkg.dir, tmp.path().join("a"));
    }

    #[test]
    fn package_from_dir_reports_no_go_files() {
        let (tmp, loader) = module_fixture(&[("docs/readme.md", "# docs\n")]);
        let err = loader.package_from_dir(&tmp.path().join("docs")).unwrap_err();
        assert!(err.is_no_go_files(), "got: {err}");
    }

    #[test]
    fn package_from_dir_reports_syntax_errors() {
        let (tmp, loader) = module_fixture(&[("broken/broken.go", "func main() {}\n")]);
        let err = loader
            .package_from_dir(&tmp.path().join("broken"))
            .unwrap_err();
        assert!(matches!(err, PackageError::Syntax { .. }), "got: {err}");
    }

    #[test]
    fn package_from_dir_outside_workspace() {
        let (_tmp, loader) = module_fixture(&[("a/a.go", "package a\n")]);
        let err = loader.package_from_dir(Path::new("/definitely/elsewhere")).unwrap_err();
        assert!(matches!(err, PackageError::OutsideWorkspace { .. }));
    }

    #[test]
    fn package_from_empty_dir_skips_source_scanning() {
        let (tmp, loader) = module_fixture(&[("docs/readme.md", "# docs\n")]);
        let pkg = loader
            .package_from_empty_dir(&tmp.path().join("docs"))
            .unwrap();
        assert_eq!(pkg.import_path, ip("docs"));
    }

    #[test]
    fn package_from_import_requires_a_loaded_package() {
        let (tmp, loader) = module_fixture(&[("a/a.go", "package a\n")]);

        let pkg = loader.package_from_import(&ip("a")).unwrap();
        assert_eq!(pkg.dir, tmp.path().join("a"));

        let err = loader.package_from_import(&ip("nope")).unwrap_err();
        assert!(matches!(err, PackageError::NotFound { .. }));
    }

    #[test]
    fn patterns_restrict_loaded_subtrees() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), format!("module {MODULE}\n")).unwrap();
        for rel in ["keep/a", "drop/b"] {
            let dir = tmp.path().join(rel);
            fs::create_dir_all(&dir).unwrap();
            let name = rel.split('/').next_back().unwrap();
            fs::write(dir.join("f.go"), format!("package {name}\n")).unwrap();
        }

        let mode = WorkspaceMode::detect_in(tmp.path()).unwrap();
        let loader = WorkspaceLoader::load_with_mode(
            mode,
            &[format!("{MODULE}/keep...")],
            &[],
        );
        assert!(loader.forward.contains_key(&ip("keep/a")));
        assert!(!loader.forward.contains_key(&ip("drop/b")));
    }

    #[test]
    fn gopath_mode_uses_src_relative_identities_and_keeps_vendor() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        for (rel, contents) in [
            ("proj/a/a.go", "package a\n\nimport \"proj/b\"\n"),
            ("proj/b/b.go", "package b\n"),
            ("proj/vendor/dep/dep.go", "package dep\n"),
        ] {
            let path = src.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }

        let mode = WorkspaceMode::Gopath {
            roots: vec![tmp.path().to_path_buf()],
        };
        let loader = WorkspaceLoader::load_with_mode(mode, &[], &[]);

        assert!(loader.forward.contains_key("proj/a"));
        assert!(loader.forward["proj/a"].contains("proj/b"));
        // vendor identities keep their full path in GOPATH mode
        assert!(loader.forward.contains_key("proj/vendor/dep"));
    }

    #[test]
    fn dependent_graph_surfaces_retained_load_error() {
        let mode = WorkspaceMode::Module {
            root: PathBuf::from("/nonexistent-root-for-ripple-tests"),
            module_path: "example.com/gone".to_owned(),
        };
        let loader = WorkspaceLoader::load_with_mode(mode, &[], &[]);
        let err = loader.dependent_graph().unwrap_err();
        assert!(matches!(err, PackageError::Load { .. }), "got: {err}");
    }

    #[test]
    fn strip_vendor_takes_the_last_vendor_segment() {
        assert_eq!(strip_vendor("a/vendor/b/vendor/c"), "c");
        assert_eq!(strip_vendor("vendor/x"), "x");
        assert_eq!(strip_vendor("plain/path"), "plain/path");
    }

    #[test]
    fn pattern_prefixes_normalize_wildcards() {
        assert!(pattern_prefixes(&[]).is_empty());
        assert!(pattern_prefixes(&["...".to_owned()]).is_empty());
        assert_eq!(
            pattern_prefixes(&["example.com/mod/...".to_owned(), "other/".to_owned()]),
            vec!["example.com/mod".to_owned(), "other".to_owned()]
        );
    }
}
