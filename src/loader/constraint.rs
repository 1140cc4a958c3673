//! Build-constraint evaluation for Go source files.
//!
//! Two mechanisms decide whether a file participates in the build:
//! `//go:build` expression lines and filename suffix rules
//! (`name_GOOS.go`, `name_GOARCH.go`, `name_GOOS_GOARCH.go`). An
//! identifier is satisfied when it is one of the configured tags, names
//! the host GOOS/GOARCH, or is `unix` on a unix-family host.

use std::collections::BTreeSet;

/// Operating systems the go tool recognizes in constraints.
const KNOWN_GOOS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows",
];

/// Architectures the go tool recognizes in constraints.
const KNOWN_GOARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle", "ppc64",
    "ppc64le", "riscv64", "s390x", "wasm",
];

const UNIX_GOOS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

// ---------------------------------------------------------------------------
// BuildTags
// ---------------------------------------------------------------------------

/// The set of satisfied constraint identifiers.
#[derive(Clone, Debug)]
pub struct BuildTags {
    tags: BTreeSet<String>,
    goos: String,
    goarch: String,
}

impl BuildTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            goos: host_goos(),
            goarch: host_goarch(),
        }
    }

    #[cfg(test)]
    fn with_host(tags: &[&str], goos: &str, goarch: &str) -> Self {
        Self {
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            goos: goos.to_owned(),
            goarch: goarch.to_owned(),
        }
    }

    fn satisfies(&self, ident: &str) -> bool {
        if self.tags.contains(ident) {
            return true;
        }
        if ident == self.goos || ident == self.goarch {
            return true;
        }
        ident == "unix" && UNIX_GOOS.contains(&self.goos.as_str())
    }

    /// Whether a file participates in the build, given its basename and
    /// the `//go:build` expression from its header, if any.
    pub fn includes_file(&self, filename: &str, build_expr: Option<&str>) -> bool {
        if !self.filename_allows(filename) {
            return false;
        }

        match build_expr {
            Some(expr) => match parse(expr) {
                Some(parsed) => self.eval(&parsed),
                // An unparsable expression never matches, like the go tool.
                None => false,
            },
            None => true,
        }
    }

    /// Apply the `name_GOOS_GOARCH.go` filename rules.
    fn filename_allows(&self, filename: &str) -> bool {
        let Some(stem) = filename.strip_suffix(".go") else {
            return false;
        };
        let stem = stem.strip_suffix("_test").unwrap_or(stem);

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 2 {
            return true;
        }

        let last = parts[parts.len() - 1];
        if KNOWN_GOARCH.contains(&last) {
            if last != self.goarch {
                return false;
            }
            if parts.len() >= 3 {
                let prev = parts[parts.len() - 2];
                if KNOWN_GOOS.contains(&prev) && prev != self.goos {
                    return false;
                }
            }
            return true;
        }

        if KNOWN_GOOS.contains(&last) && last != self.goos {
            return false;
        }

        true
    }

    fn eval(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Ident(ident) => self.satisfies(ident),
            Expr::Not(inner) => !self.eval(inner),
            Expr::And(lhs, rhs) => self.eval(lhs) && self.eval(rhs),
            Expr::Or(lhs, rhs) => self.eval(lhs) || self.eval(rhs),
        }
    }
}

fn host_goos() -> String {
    match std::env::consts::OS {
        "macos" => "darwin".to_owned(),
        other => other.to_owned(),
    }
}

fn host_goarch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "amd64".to_owned(),
        "aarch64" => "arm64".to_owned(),
        "x86" => "386".to_owned(),
        "powerpc64" => "ppc64".to_owned(),
        other => other.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Expression parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Expr {
    Ident(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '&' => {
                chars.next();
                if chars.next() != Some('&') {
                    return None;
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    return None;
                }
                tokens.push(Token::Or);
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return None,
        }
    }

    Some(tokens)
}

/// Parse a `//go:build` expression. `||` binds looser than `&&`, which
/// binds looser than `!`.
fn parse(input: &str) -> Option<Expr> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let expr = parse_or(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return None;
    }
    Some(expr)
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> Option<Expr> {
    let mut lhs = parse_and(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::Or) {
        *pos += 1;
        let rhs = parse_and(tokens, pos)?;
        lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
    }
    Some(lhs)
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Option<Expr> {
    let mut lhs = parse_unary(tokens, pos)?;
    while tokens.get(*pos) == Some(&Token::And) {
        *pos += 1;
        let rhs = parse_unary(tokens, pos)?;
        lhs = Expr::And(Box::new(lhs), Box::new(rhs));
    }
    Some(lhs)
}

fn parse_unary(tokens: &[Token], pos: &mut usize) -> Option<Expr> {
    match tokens.get(*pos)? {
        Token::Not => {
            *pos += 1;
            Some(Expr::Not(Box::new(parse_unary(tokens, pos)?)))
        }
        Token::Open => {
            *pos += 1;
            let inner = parse_or(tokens, pos)?;
            if tokens.get(*pos) != Some(&Token::Close) {
                return None;
            }
            *pos += 1;
            Some(inner)
        }
        Token::Ident(ident) => {
            let ident = ident.clone();
            *pos += 1;
            Some(Expr::Ident(ident))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
