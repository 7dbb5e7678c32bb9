//! Fuzzy name resolution for commands and levels.
//!
//! Operators abbreviate. A query is looked up in three tiers, stopping at the
//! first tier that yields exactly one key:
//!
//! 1. exact key match
//! 2. unique case-insensitive prefix match
//! 3. unique case-insensitive subsequence match anchored at the first character
//!    (`cfg` matches `configure`)
//!
//! More than one candidate in a tier is never resolved by guessing: the tier
//! fails and the next one is tried, and ambiguity in the last tier yields
//! `None`. Matching counts keys, so a descriptor reachable through both its
//! name and an alias is ambiguous if both keys match.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// Resolve `query` against `items`, returning the matched key and its value.
pub fn resolve<'a, V>(items: &'a BTreeMap<String, V>, query: &str) -> Option<(&'a str, &'a V)> {
    if let Some((key, value)) = items.get_key_value(query) {
        return Some((key.as_str(), value));
    }

    let escaped: Vec<String> = query
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect();

    let prefix = format!("^{}.*", escaped.concat());
    if let Some(found) = unique_match(items, &prefix) {
        return Some(found);
    }

    let subsequence = format!("^{}.*", escaped.join(".*"));
    unique_match(items, &subsequence)
}

/// Like [`resolve`], but returns only the value.
pub fn fuzzy_get<'a, V>(items: &'a BTreeMap<String, V>, query: &str) -> Option<&'a V> {
    resolve(items, query).map(|(_, value)| value)
}

fn unique_match<'a, V>(items: &'a BTreeMap<String, V>, pattern: &str) -> Option<(&'a str, &'a V)> {
    let matcher = compile(pattern)?;
    let mut matches = items.iter().filter(|(key, _)| matcher.is_match(key));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some((first.0.as_str(), first.1))
}

fn compile(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(keys: &[&str]) -> BTreeMap<String, usize> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (k.to_string(), i))
            .collect()
    }

    #[test]
    fn test_exact_match() {
        let map = items(&["status", "start", "stop"]);
        assert_eq!(resolve(&map, "stop"), Some(("stop", &2)));
    }

    #[test]
    fn test_ambiguous_prefix_is_none() {
        let map = items(&["status", "start", "stop"]);
        assert_eq!(resolve(&map, "sta"), None);
    }

    #[test]
    fn test_unique_prefix() {
        let map = items(&["status", "start", "stop"]);
        assert_eq!(resolve(&map, "star"), Some(("start", &1)));
        assert_eq!(resolve(&map, "stat"), Some(("status", &0)));
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        let map = items(&["configure", "node"]);
        assert_eq!(fuzzy_get(&map, "CONF"), Some(&0));
    }

    #[test]
    fn test_exact_is_case_sensitive_but_falls_back() {
        let map = items(&["Node", "node2"]);
        // "node" is not an exact key; both keys share it as a prefix.
        assert_eq!(resolve(&map, "node"), None);
        assert_eq!(resolve(&map, "Node"), Some(("Node", &0)));
    }

    #[test]
    fn test_exact_beats_prefix() {
        let map = items(&["ra", "rate", "rack"]);
        assert_eq!(resolve(&map, "ra"), Some(("ra", &0)));
    }

    #[test]
    fn test_subsequence_match() {
        let map = items(&["configure", "cluster", "node"]);
        assert_eq!(resolve(&map, "cfg"), Some(("configure", &0)));
        assert_eq!(resolve(&map, "nd"), Some(("node", &2)));
    }

    #[test]
    fn test_subsequence_is_anchored_at_start() {
        let map = items(&["configure", "node"]);
        // "fg" occurs inside "configure" but not from the first character.
        assert_eq!(resolve(&map, "fg"), None);
    }

    #[test]
    fn test_subsequence_ambiguous_is_none() {
        let map = items(&["cluster", "cib"]);
        assert_eq!(resolve(&map, "cl"), Some(("cluster", &0)));
        assert_eq!(resolve(&map, "c"), None);
    }

    #[test]
    fn test_single_character_unique() {
        let map = items(&["node", "ra", "configure"]);
        assert_eq!(resolve(&map, "n"), Some(("node", &0)));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let map = items(&["?", "-h", "--help", "ls"]);
        assert_eq!(resolve(&map, "?"), Some(("?", &0)));
        assert_eq!(resolve(&map, "--"), Some(("--help", &2)));
        assert_eq!(resolve(&map, "l."), None);
    }

    #[test]
    fn test_empty_query() {
        let single = items(&["only"]);
        assert_eq!(resolve(&single, ""), Some(("only", &0)));
        let many = items(&["a", "b"]);
        assert_eq!(resolve(&many, ""), None);
    }

    #[test]
    fn test_empty_map() {
        let map: BTreeMap<String, usize> = BTreeMap::new();
        assert_eq!(resolve(&map, "anything"), None);
    }
}
