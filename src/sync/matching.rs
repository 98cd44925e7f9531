//! Name-based matching between local paths and remote siblings.
//!
//! The remote store does not keep names unique within a folder. When several
//! siblings share a name, the first one in listing order wins.

use std::collections::HashMap;

use crate::model::{RemoteEntry, RemoteKind};

/// How a local name is resolved against remote siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Take the first sibling with the same name and kind.
    #[default]
    FirstMatch,
}

impl MatchPolicy {
    /// Find the sibling that stands for `name`.
    #[must_use]
    pub fn find<'a>(
        self,
        siblings: &'a [RemoteEntry],
        name: &str,
        kind: RemoteKind,
    ) -> Option<&'a RemoteEntry> {
        match self {
            Self::FirstMatch => siblings.iter().find(|e| e.kind == kind && e.name == name),
        }
    }
}

/// Names that occur more than once among `siblings`, with their counts.
///
/// Sorted by name so log output is stable.
#[must_use]
pub fn duplicate_names(siblings: &[RemoteEntry]) -> Vec<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in siblings {
        *counts.entry(entry.name.as_str()).or_default() += 1;
    }

    let mut duplicates: Vec<(&str, usize)> =
        counts.into_iter().filter(|(_, count)| *count > 1).collect();
    duplicates.sort_unstable();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, name: &str, kind: RemoteKind) -> RemoteEntry {
        RemoteEntry {
            id: id.to_string(),
            name: name.to_string(),
            parent_ids: vec!["root".to_string()],
            modified_time: Utc::now(),
            size: 10,
            kind,
        }
    }

    #[test]
    fn test_first_match_wins() {
        let siblings = vec![
            entry("1", "a.txt", RemoteKind::File),
            entry("2", "a.txt", RemoteKind::File),
        ];
        let found = MatchPolicy::FirstMatch
            .find(&siblings, "a.txt", RemoteKind::File)
            .unwrap();
        assert_eq!(found.id, "1");
    }

    #[test]
    fn test_kind_must_match() {
        let siblings = vec![
            entry("1", "docs", RemoteKind::File),
            entry("2", "docs", RemoteKind::Container),
        ];

        let policy = MatchPolicy::default();
        assert_eq!(policy.find(&siblings, "docs", RemoteKind::Container).unwrap().id, "2");
        assert_eq!(policy.find(&siblings, "docs", RemoteKind::File).unwrap().id, "1");
        assert!(policy.find(&siblings, "other", RemoteKind::File).is_none());
    }

    #[test]
    fn test_duplicate_names() {
        let siblings = vec![
            entry("1", "b", RemoteKind::File),
            entry("2", "a", RemoteKind::File),
            entry("3", "b", RemoteKind::Container),
            entry("4", "c", RemoteKind::File),
        ];
        assert_eq!(duplicate_names(&siblings), vec![("b", 2)]);
    }
}
