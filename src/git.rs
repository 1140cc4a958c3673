//! Git-backed differ.
//!
//! Determines the changed-file set by diffing the current branch against
//! a left revision chosen from branch history:
//!
//! - default: the branch point — the oldest commit on the current branch
//!   that is not on the base branch; falls back to the configured base
//!   branch when the branch point cannot be determined
//! - `use_merge_commit`: the first parent of `HEAD`, diffing against the
//!   remaining parents (or the most recent merge commit for
//!   squash/rebase flows)
//! - `use_head_to_head`: the base branch head directly
//!
//! Rename detection is disabled so a move appears as one deletion plus
//! one addition. The underlying `git diff` runs at most once; all views
//! observe the same snapshot and error.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use crate::differ::{existence_of, group_by_dir, Differ, Directory};
use crate::error::DiffError;

const DEFAULT_BASE_BRANCH: &str = "origin/master";

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`GitDiffer`].
#[derive(Clone, Debug)]
pub struct GitDifferBuilder {
    base_branch: String,
    use_merge_commit: bool,
    use_head_to_head: bool,
    dir: Option<PathBuf>,
}

impl Default for GitDifferBuilder {
    fn default() -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.to_owned(),
            use_merge_commit: false,
            use_head_to_head: false,
            dir: None,
        }
    }
}

impl GitDifferBuilder {
    /// The branch to diff against (default `origin/master`).
    pub fn base_branch(mut self, branch: impl Into<String>) -> Self {
        self.base_branch = branch.into();
        self
    }

    /// Diff the parents of the latest merge commit instead of the
    /// branch point.
    pub fn use_merge_commit(mut self, yes: bool) -> Self {
        self.use_merge_commit = yes;
        self
    }

    /// Diff the base branch head against `HEAD`, skipping the
    /// branch-point lookup.
    pub fn use_head_to_head(mut self, yes: bool) -> Self {
        self.use_head_to_head = yes;
        self
    }

    /// Run git inside this directory instead of the process working
    /// directory.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn build(self) -> GitDiffer {
        GitDiffer {
            base_branch: self.base_branch,
            use_merge_commit: self.use_merge_commit,
            use_head_to_head: self.use_head_to_head,
            dir: self.dir,
            snapshot: OnceLock::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// GitDiffer
// ---------------------------------------------------------------------------

/// A [`Differ`] that shells out to `git`.
#[derive(Debug)]
pub struct GitDiffer {
    base_branch: String,
    use_merge_commit: bool,
    use_head_to_head: bool,
    dir: Option<PathBuf>,
    snapshot: OnceLock<Result<BTreeSet<PathBuf>, DiffError>>,
}

impl Default for GitDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GitDiffer {
    /// A differ with the default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> GitDifferBuilder {
        GitDifferBuilder::default()
    }

    /// Run a git command and return its stdout. Non-zero exit carries
    /// the stderr text verbatim.
    fn git_stdout(&self, args: &[&str]) -> Result<String, DiffError> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        let output = cmd.output().map_err(|e| DiffError::Io {
            context: format!("running `git {}`", args.join(" ")),
            detail: e.to_string(),
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(DiffError::Command {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
                exit_code: output.status.code(),
            })
        }
    }

    /// The repository top-level directory.
    fn root(&self) -> Result<PathBuf, DiffError> {
        let out = self.git_stdout(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// The oldest commit on `branch` that is not on the base branch.
    ///
    /// Returns `None` when no such commit can be determined (shallow
    /// clone, unrelated history, or a failing probe). The probe failure
    /// is deliberately discarded: the caller falls back to the base
    /// branch.
    fn branch_point_of(&self, branch: &str) -> Option<String> {
        // --topo-order respects graph order; --parents lists each commit
        // with its parents; --reverse puts the oldest commit first. No
        // --first-parent: merges from other branches must not hide the
        // oldest possible branch point. git merge-base is unsuitable
        // here: when the base branch was merged into `branch` after it
        // was created, the merge base would be that merge commit.
        let exclude = format!("^{}", self.base_branch);
        let out = match self.git_stdout(&["rev-list", "--topo-order", "--parents", "--reverse", branch, &exclude]) {
            Ok(out) => out,
            Err(err) => {
                tracing::debug!(%err, branch, base = %self.base_branch, "branch point lookup failed; falling back to base branch");
                return None;
            }
        };

        let first_commit = out.lines().next().unwrap_or_default();
        let ancestors: Vec<&str> = first_commit.split_whitespace().collect();
        if ancestors.len() < 2 {
            return None;
        }
        Some(ancestors[1].to_owned())
    }

    /// Left and right revisions for merge-commit mode.
    ///
    /// A merge commit at `HEAD` yields (first parent, remaining
    /// parents). A single-parent `HEAD` (squash-merge or rebase flow)
    /// yields (most recent merge commit, `HEAD`).
    fn merge_parents(&self) -> Result<(String, Vec<String>), DiffError> {
        let out = self.git_stdout(&["log", "-1", "--pretty=format:%p"])?;
        let parents: Vec<String> = out.split_whitespace().map(str::to_owned).collect();

        if parents.len() >= 2 {
            return Ok((parents[0].clone(), parents[1..].to_vec()));
        }

        let out = self.git_stdout(&["log", "-1", "--merges", "--pretty=format:%h"])?;
        Ok((out.trim().to_owned(), vec!["HEAD".to_owned()]))
    }

    /// The left revision and the right revisions to diff it against.
    fn parents(&self) -> Result<(String, Vec<String>), DiffError> {
        let mut left = self.base_branch.clone();
        let mut rights = vec!["HEAD".to_owned()];

        if !self.use_head_to_head {
            if let Some(branch_point) = self.branch_point_of("HEAD") {
                left = branch_point;
            }
        }

        if self.use_merge_commit {
            (left, rights) = self.merge_parents()?;
        }

        Ok((left, rights))
    }

    fn compute_changed(&self) -> Result<BTreeSet<PathBuf>, DiffError> {
        let root = self.root()?;
        let (left, rights) = self.parents()?;

        let mut files = BTreeSet::new();
        for right in &rights {
            let range = format!("{left}...{right}");
            let out = self.git_stdout(&["diff", &range, "--name-only", "--no-renames"])?;

            for line in out.lines() {
                let path = line.trim();
                if path.is_empty() {
                    continue;
                }
                files.insert(root.join(path));
            }
        }

        Ok(files)
    }

    /// The memoized changed-file set. The underlying git invocations
    /// happen at most once per differ value.
    fn changed_files(&self) -> Result<&BTreeSet<PathBuf>, DiffError> {
        self.snapshot
            .get_or_init(|| self.compute_changed())
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl Differ for GitDiffer {
    fn diff_dirs(&self) -> Result<BTreeMap<PathBuf, Directory>, DiffError> {
        Ok(group_by_dir(self.changed_files()?))
    }

    fn diff_files(&self) -> Result<BTreeMap<PathBuf, bool>, DiffError> {
        Ok(existence_of(self.changed_files()?))
    }

    /// Module requirements and replacements added or updated in
    /// `go.mod`, derived from the same revision range as the file diff.
    fn diff_manifest_deps(&self) -> Result<BTreeSet<String>, DiffError> {
        let changed = self.changed_files()?;
        let root = self.root()?;
        if !changed.contains(&root.join("go.mod")) {
            return Ok(BTreeSet::new());
        }

        let (left, rights) = self.parents()?;
        let mut deps = BTreeSet::new();
        for right in &rights {
            let range = format!("{left}...{right}");
            let out = self.git_stdout(&["--no-pager", "diff", "--unified=0", &range, "--", "go.mod"])?;

            for line in out.lines() {
                if let Some(module) = manifest_dep_from_line(line) {
                    deps.insert(module);
                }
            }
        }

        Ok(deps)
    }
}

/// Extract the module path from an added `go.mod` diff line, if the
/// line is a requirement or replacement directive.
fn manifest_dep_from_line(line: &str) -> Option<String> {
    let added = line.strip_prefix('+')?;
    if added.starts_with("++") {
        return None;
    }

    let mut rest = added.trim();
    if let Some(r) = rest.strip_prefix("require ") {
        rest = r.trim();
    }
    if let Some(r) = rest.strip_prefix("replace ") {
        rest = r.trim();
    }

    // A replacement names the replaced module left of `=>`; the version
    // on the left side is optional.
    if let Some((lhs, _)) = rest.split_once("=>") {
        let module = lhs.split_whitespace().next()?;
        return looks_like_module_path(module).then(|| module.to_owned());
    }

    let mut fields = rest.split_whitespace();
    let module = fields.next()?;
    let version = fields.next()?;
    if !version.starts_with('v') {
        return None;
    }
    looks_like_module_path(module).then(|| module.to_owned())
}

fn looks_like_module_path(s: &str) -> bool {
    s.contains('.') || s.contains('/')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
