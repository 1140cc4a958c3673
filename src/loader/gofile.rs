//! Header scanning for single Go source files.
//!
//! Extracts the pieces of a file the engine cares about without a full
//! parse: the package clause, the import section, `//go:embed` patterns,
//! and the `//go:build` constraint line. The scan is line-oriented and
//! tracks block comments so license headers and doc comments do not
//! confuse it.

use std::fmt;

/// The scanned header of one Go source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoFileHeader {
    /// The name from the package clause.
    pub package_name: String,
    /// Import paths, in order of appearance.
    pub imports: Vec<String>,
    /// Patterns from `//go:embed` directives anywhere in the file.
    pub embed_patterns: Vec<String>,
    /// The expression text of the first `//go:build` line before the
    /// package clause, if any.
    pub build_expr: Option<String>,
}

/// A header that could not be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanError {
    pub detail: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for ScanError {}

/// Scan the header of a Go source file.
pub fn scan_header(contents: &str) -> Result<GoFileHeader, ScanError> {
    let mut header = GoFileHeader::default();
    let mut in_block_comment = false;
    let mut in_import_block = false;
    let mut seen_package = false;
    let mut past_imports = false;

    for raw in contents.lines() {
        let mut line = raw.trim();

        if in_block_comment {
            match line.find("*/") {
                Some(idx) => {
                    line = line[idx + 2..].trim();
                    in_block_comment = false;
                }
                None => continue,
            }
        }

        if let Some(expr) = directive_arg(line, "//go:build") {
            if !seen_package && header.build_expr.is_none() {
                header.build_expr = Some(expr.trim().to_owned());
            }
            continue;
        }

        if let Some(rest) = directive_arg(line, "//go:embed") {
            header.embed_patterns.extend(embed_patterns_from(rest));
            continue;
        }

        if line.starts_with("//") {
            continue;
        }

        if let Some(rest) = line.strip_prefix("/*") {
            match rest.find("*/") {
                Some(idx) => line = rest[idx + 2..].trim(),
                None => {
                    in_block_comment = true;
                    continue;
                }
            }
        }

        if line.is_empty() {
            continue;
        }

        if !seen_package {
            let Some(rest) = line.strip_prefix("package ") else {
                return Err(ScanError {
                    detail: format!("expected package clause, found {line:?}"),
                });
            };
            let name: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if name.is_empty() {
                return Err(ScanError {
                    detail: "package clause has no name".to_owned(),
                });
            }
            header.package_name = name;
            seen_package = true;
            continue;
        }

        if past_imports {
            continue;
        }

        if in_import_block {
            if line.starts_with(')') {
                in_import_block = false;
            } else if let Some(path) = quoted_import_in(line) {
                header.imports.push(path);
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("import") {
            let rest = rest.trim_start();
            if let Some(body) = rest.strip_prefix('(') {
                // A one-line block closes immediately; otherwise the
                // following lines belong to the import section.
                match body.find(')') {
                    Some(end) => {
                        if let Some(path) = quoted_import_in(&body[..end]) {
                            header.imports.push(path);
                        }
                    }
                    None => {
                        in_import_block = true;
                        if let Some(path) = quoted_import_in(body) {
                            header.imports.push(path);
                        }
                    }
                }
            } else if let Some(path) = quoted_import_in(rest) {
                header.imports.push(path);
            }
            continue;
        }

        // First non-import declaration: nothing but embed directives
        // matters from here on.
        past_imports = true;
    }

    if !seen_package {
        return Err(ScanError {
            detail: "no package clause found".to_owned(),
        });
    }

    Ok(header)
}

/// The argument of a `//go:...` directive line, or `None` when the line
/// is some other comment that merely shares the prefix.
fn directive_arg<'a>(line: &'a str, directive: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(directive)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Extract the quoted import path from an import line, tolerating an
/// alias, dot, or blank qualifier before it.
fn quoted_import_in(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    let path = &rest[..end];
    if path.is_empty() {
        return None;
    }
    Some(path.to_owned())
}

/// Split the argument of a `//go:embed` directive into patterns.
/// Patterns may be bare tokens or quoted with `"` or `` ` ``.
fn embed_patterns_from(rest: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut chars = rest.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '"' | '`' => {
                let quote = c;
                chars.next();
                let mut pattern = String::new();
                for c in chars.by_ref() {
                    if c == quote {
                        break;
                    }
                    pattern.push(c);
                }
                if !pattern.is_empty() {
                    patterns.push(pattern);
                }
            }
            _ => {
                let mut pattern = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ' ' || c == '\t' {
                        break;
                    }
                    pattern.push(c);
                    chars.next();
                }
                patterns.push(pattern);
            }
        }
    }

    patterns
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
