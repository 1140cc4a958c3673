//! ripple CLI.
//!
//! Uses git to find the changes on the current branch, resolves them to
//! Go packages, and prints every package dirtied by the change —
//! including transitive dependents. The plain listing feeds `go test`
//! directly; `--json` emits the full dependency breakdown.

use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;

use ripple::{FileDiffer, GitDiffer, Packages, Ripple};

/// Find the Go packages affected by a change, including dependents.
///
/// By default the change set is computed with git, diffing the current
/// branch against the point where it left the base branch. The output
/// lists one import path per line on a terminal, or a single
/// space-joined line when piped.
#[derive(Parser)]
#[command(name = "ripple")]
#[command(version, about)]
struct Cli {
    /// Branch to diff against
    #[arg(long, default_value = "origin/master", value_name = "REF")]
    base: String,

    /// Keep only packages matching these comma-separated import path
    /// prefixes
    #[arg(long, value_name = "PREFIXES")]
    include: Option<String>,

    /// Diff using the latest merge commit
    #[arg(long)]
    merge: bool,

    /// Diff the base branch head against the current head
    #[arg(long)]
    h2h: bool,

    /// Output the result as JSON
    #[arg(long)]
    json: bool,

    /// Keep only packages that still resolve on disk
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    buildable_only: bool,

    /// Read the change set from a file holding newline-separated
    /// absolute paths instead of asking git
    #[arg(long, value_name = "PATH")]
    changed_files: Option<PathBuf>,

    /// Comma-separated build tags to consider
    #[arg(long, value_name = "TAGS")]
    tags: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "ripple=debug" } else { "ripple=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ripple: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.json && cli.buildable_only {
        bail!("--buildable-only must be set to false when using --json");
    }
    if cli.merge && cli.changed_files.is_some() {
        bail!("changed files must not be provided when using the latest merge commit");
    }
    if cli.merge && cli.h2h {
        bail!("--merge and --h2h cannot be used together");
    }
    if cli.h2h && cli.changed_files.is_some() {
        bail!("--changed-files and --h2h cannot be used together");
    }

    let mut builder = Ripple::builder()
        .prefixes(parse_csv(cli.include.as_deref()))
        .build_tags(parse_csv(cli.tags.as_deref()));

    builder = match &cli.changed_files {
        Some(path) => {
            let files = changed_files_from(path)
                .with_context(|| format!("could not read changed file list {}", path.display()))?;
            builder.differ(FileDiffer::new(files))
        }
        None => builder.differ(
            GitDiffer::builder()
                .base_branch(cli.base.clone())
                .use_merge_commit(cli.merge)
                .use_head_to_head(cli.h2h)
                .build(),
        ),
    };

    let engine = builder.build()?;
    let packages = engine.changed_packages()?;

    if cli.json {
        serde_json::to_writer(std::io::stdout(), &packages)?;
        println!();
        return Ok(());
    }

    let listing = stringify(&packages, cli.buildable_only);
    if std::io::stdin().is_terminal() {
        for pkg in &listing {
            println!("{pkg}");
        }
    } else {
        println!("{}", listing.join(" "));
    }

    Ok(())
}

/// Import paths of every dirty package, optionally restricted to
/// packages that resolve on disk.
fn stringify(packages: &Packages, buildable_only: bool) -> Vec<String> {
    packages
        .all_changes
        .iter()
        .filter(|pkg| !buildable_only || !pkg.dir.as_os_str().is_empty())
        .map(|pkg| pkg.import_path.clone())
        .collect()
}

/// Read a newline-separated list of absolute changed paths. Blank lines
/// and surrounding whitespace (including CR from CRLF files) are
/// discarded.
fn changed_files_from(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = std::fs::read_to_string(path)?;

    let mut files = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !Path::new(line).is_absolute() {
            bail!("all changed file paths must be absolute paths");
        }
        files.push(PathBuf::from(line));
    }

    Ok(files)
}

fn parse_csv(value: Option<&str>) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for part in value.unwrap_or_default().split(',') {
        let part = part.trim();
        if !part.is_empty() && seen.insert(part.to_owned()) {
            out.push(part.to_owned());
        }
    }
    out
}
