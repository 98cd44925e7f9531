//! Entry filtering.
//!
//! One mode governs a whole run. A non-empty whitelist always wins over the
//! legacy marker rule, and [`Filter::new`] is the only constructor that
//! picks between them.
//!
//! Whitelist patterns are substrings of the root-relative path (`/a/b/c`).
//! A pattern starting with `/` is anchored at the root; any other pattern
//! may match at any depth. Directories that do not match themselves but may
//! lead to a match are classified [`Admission::Traverse`]: the engine walks
//! them without materialising them unless something below actually matches.

use std::path::{Component, Path};

/// Names starting with this character are skipped in legacy mode.
pub const LEGACY_MARKER: char = '!';

/// How a filter treats one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Synced like any other entry.
    Match,
    /// A directory walked only to reach matches below it.
    Traverse,
    /// Skipped together with its subtree.
    Reject,
}

/// Which entries a sync run processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Only entries whose root-relative path contains one of the patterns
    /// (plus the directories leading to them).
    Whitelist(Vec<String>),
    /// Everything except names starting with `marker`.
    Legacy { marker: char },
}

impl Filter {
    /// Build the filter for a run: whitelist when any pattern is given,
    /// legacy marker otherwise.
    pub fn new<I, S>(whitelist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = whitelist
            .into_iter()
            .filter_map(|p| normalize_pattern(p.as_ref()))
            .collect();

        if patterns.is_empty() {
            Self::Legacy {
                marker: LEGACY_MARKER,
            }
        } else {
            Self::Whitelist(patterns)
        }
    }

    /// Classify an entry. `rel_path` is its path below the sync root.
    #[must_use]
    pub fn classify(&self, rel_path: &Path, is_dir: bool) -> Admission {
        match self {
            Self::Legacy { marker } => {
                let marked = rel_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.starts_with(*marker));
                if marked { Admission::Reject } else { Admission::Match }
            }
            Self::Whitelist(patterns) => {
                let key = path_key(rel_path);
                if patterns.iter().any(|p| key.contains(p.as_str())) {
                    Admission::Match
                } else if is_dir && patterns.iter().any(|p| may_match_below(&key, p)) {
                    Admission::Traverse
                } else {
                    Admission::Reject
                }
            }
        }
    }

    #[must_use]
    pub fn is_whitelist(&self) -> bool {
        matches!(self, Self::Whitelist(_))
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::Legacy {
            marker: LEGACY_MARKER,
        }
    }
}

/// Render a root-relative path as `/a/b/c` regardless of platform.
fn path_key(rel_path: &Path) -> String {
    let mut key = String::new();
    for component in rel_path.components() {
        if let Component::Normal(part) = component {
            key.push('/');
            key.push_str(&part.to_string_lossy());
        }
    }
    key
}

/// Whether `pattern` can match some path below the directory `key`.
fn may_match_below(key: &str, pattern: &str) -> bool {
    if pattern.starts_with('/') {
        pattern.starts_with(&format!("{key}/"))
    } else {
        true
    }
}

fn normalize_pattern(raw: &str) -> Option<String> {
    let cleaned = raw.trim().replace('\\', "/");
    let anchored = cleaned.starts_with('/') || cleaned.starts_with("./");
    let body = cleaned.trim_start_matches("./").trim_matches('/');
    if body.is_empty() {
        return None;
    }

    if anchored {
        Some(format!("/{body}"))
    } else {
        Some(body.to_string())
    }
}
