//! Parser for OpenSSH client configuration files
//!
//! Understands `Host` blocks with wildcard and negated patterns and the
//! directives the collector needs. Everything else is ignored, the same way
//! `ssh` ignores options it does not care about for a given connection.

use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// A single `Host` pattern (`*`, `?` wildcards, optional `!` negation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    pattern: String,
    negated: bool,
}

impl HostPattern {
    /// Parses a pattern token as written after `Host`
    #[must_use]
    pub fn new(token: &str) -> Self {
        match token.strip_prefix('!') {
            Some(rest) => Self {
                pattern: rest.to_string(),
                negated: true,
            },
            None => Self {
                pattern: token.to_string(),
                negated: false,
            },
        }
    }

    /// Returns true if this is a `!pattern`
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// Glob-matches the alias, ignoring negation
    #[must_use]
    pub fn matches(&self, alias: &str) -> bool {
        let pattern: Vec<char> = self.pattern.chars().collect();
        let text: Vec<char> = alias.chars().collect();
        glob_match(&pattern, &text)
    }
}

fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Which hosts a block applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockCriteria {
    /// Directives before the first `Host` line apply to every host
    Global,
    /// `Host pattern...`
    Host(Vec<HostPattern>),
    /// `Match ...` blocks are not evaluated and never apply
    Match,
}

impl BlockCriteria {
    /// Returns true if the block applies to the alias.
    ///
    /// A `Host` block applies when at least one positive pattern matches and
    /// no negated pattern does.
    #[must_use]
    pub fn applies_to(&self, alias: &str) -> bool {
        match self {
            Self::Global => true,
            Self::Match => false,
            Self::Host(patterns) => {
                let mut matched = false;
                for pattern in patterns {
                    if pattern.matches(alias) {
                        if pattern.is_negated() {
                            return false;
                        }
                        matched = true;
                    }
                }
                matched
            }
        }
    }
}

/// A recognised directive with its raw (unexpanded) value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `HostName`
    HostName(String),
    /// `User`
    User(String),
    /// `Port`
    Port(u16),
    /// `IdentityFile` (may repeat)
    IdentityFile(String),
    /// `ProxyCommand`, rest of line verbatim
    ProxyCommand(String),
}

/// A `Host` (or global / `Match`) block and its directives in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBlock {
    /// Hosts the block applies to
    pub criteria: BlockCriteria,
    /// Recognised directives
    pub directives: Vec<Directive>,
}

/// Raw values obtained for one alias, before defaults and token expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEntry {
    /// First `HostName` obtained
    pub hostname: Option<String>,
    /// First `User` obtained
    pub user: Option<String>,
    /// First `Port` obtained
    pub port: Option<u16>,
    /// Every `IdentityFile` obtained, in order
    pub identity_files: Vec<String>,
    /// First `ProxyCommand` obtained
    pub proxy_command: Option<String>,
}

/// A parsed ssh client configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshConfigFile {
    blocks: Vec<HostBlock>,
}

impl SshConfigFile {
    /// Creates an empty configuration (every lookup falls back to defaults)
    #[must_use]
    pub const fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Reads and parses the file at `path`.
    ///
    /// A missing file yields an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file exists but cannot be read,
    /// or [`ConfigError::Syntax`] if it cannot be parsed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No ssh config file, using defaults");
                Ok(Self::empty())
            }
            Err(e) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] naming the first offending line.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let mut blocks = vec![HostBlock {
            criteria: BlockCriteria::Global,
            directives: Vec::new(),
        }];

        for (idx, raw_line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (keyword, rest) = split_keyword(line);
            let syntax = |reason: String| ConfigError::Syntax {
                line: line_no,
                reason,
            };
            if rest.is_empty() {
                return Err(syntax(format!("'{keyword}' requires a value")));
            }

            match keyword.to_ascii_lowercase().as_str() {
                "host" => {
                    let patterns = split_args(rest).map_err(syntax)?;
                    if patterns.is_empty() {
                        return Err(syntax("'Host' requires at least one pattern".into()));
                    }
                    blocks.push(HostBlock {
                        criteria: BlockCriteria::Host(
                            patterns.iter().map(|p| HostPattern::new(p)).collect(),
                        ),
                        directives: Vec::new(),
                    });
                }
                "match" => {
                    tracing::debug!(line = line_no, "Skipping unsupported Match block");
                    blocks.push(HostBlock {
                        criteria: BlockCriteria::Match,
                        directives: Vec::new(),
                    });
                }
                "hostname" => push(&mut blocks, Directive::HostName(first_arg(rest, syntax)?)),
                "user" => push(&mut blocks, Directive::User(first_arg(rest, syntax)?)),
                "port" => {
                    let value = first_arg(rest, syntax)?;
                    let port = value
                        .parse::<u16>()
                        .ok()
                        .filter(|p| *p != 0)
                        .ok_or_else(|| syntax(format!("invalid port '{value}'")))?;
                    push(&mut blocks, Directive::Port(port));
                }
                "identityfile" => {
                    push(&mut blocks, Directive::IdentityFile(first_arg(rest, syntax)?));
                }
                "proxycommand" => {
                    push(&mut blocks, Directive::ProxyCommand(rest.to_string()));
                }
                _ => {}
            }
        }

        Ok(Self { blocks })
    }

    /// Returns the parsed blocks, the implicit global block first
    #[must_use]
    pub fn blocks(&self) -> &[HostBlock] {
        &self.blocks
    }

    /// Collects the raw values that apply to `alias`, first value wins
    #[must_use]
    pub fn lookup(&self, alias: &str) -> HostEntry {
        let mut entry = HostEntry::default();

        for block in self.blocks.iter().filter(|b| b.criteria.applies_to(alias)) {
            for directive in &block.directives {
                match directive {
                    Directive::HostName(v) => {
                        entry.hostname.get_or_insert_with(|| v.clone());
                    }
                    Directive::User(v) => {
                        entry.user.get_or_insert_with(|| v.clone());
                    }
                    Directive::Port(p) => {
                        entry.port.get_or_insert(*p);
                    }
                    Directive::IdentityFile(v) => entry.identity_files.push(v.clone()),
                    Directive::ProxyCommand(v) => {
                        entry.proxy_command.get_or_insert_with(|| v.clone());
                    }
                }
            }
        }

        entry
    }
}

fn push(blocks: &mut [HostBlock], directive: Directive) {
    if let Some(block) = blocks.last_mut() {
        block.directives.push(directive);
    }
}

/// Splits `Keyword value`, `Keyword=value` and `Keyword = value`
fn split_keyword(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(line.len());
    let (keyword, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
    (keyword, rest.trim_end())
}

/// Splits arguments on whitespace, honouring double quotes
fn split_args(input: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".into());
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

fn first_arg(rest: &str, syntax: impl Fn(String) -> ConfigError) -> ConfigResult<String> {
    split_args(rest)
        .map_err(&syntax)?
        .into_iter()
        .next()
        .ok_or_else(|| syntax("missing value".into()))
}
