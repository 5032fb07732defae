//! Record name generation
//!
//! Generated record names come from the field path leading to the record,
//! so two records reached through different paths never share a name even
//! when their leaf field names are equal.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name regex"));

static INVALID_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid character class"));

/// Suffix appended to the last path segment for array item records
pub const ITEMS_SUFFIX: &str = "_items";

/// Check a simple (undotted) name
pub fn is_valid_name(name: &str) -> bool {
    NAME.is_match(name)
}

/// Check a dotted namespace
pub fn is_valid_namespace(namespace: &str) -> bool {
    namespace.split('.').all(is_valid_name)
}

/// Make one path segment a valid name
///
/// Invalid characters become `_`; a leading digit gets a `_` prefix.
pub fn sanitize_segment(segment: &str) -> String {
    let mut cleaned = INVALID_NAME_CHARS.replace_all(segment, "_").into_owned();
    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned
}

/// Avro field names for one record's value keys, in the same order
///
/// Valid keys keep their name. Other keys are sanitised and take a numeric
/// suffix when that collides with a name already in the record; suffixes
/// go out in key order so the result does not depend on field order.
pub fn field_names<'a, I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: Vec<&str> = keys.into_iter().collect();
    let mut taken: HashSet<String> = keys
        .iter()
        .filter(|key| is_valid_name(key))
        .map(ToString::to_string)
        .collect();

    let mut invalid: Vec<&str> = keys.iter().copied().filter(|key| !is_valid_name(key)).collect();
    invalid.sort_unstable();
    let renamed: HashMap<&str, String> = invalid
        .into_iter()
        .map(|key| (key, claim(&mut taken, sanitize_segment(key))))
        .collect();

    keys.iter()
        .map(|key| match renamed.get(key) {
            Some(name) => name.clone(),
            None => (*key).to_string(),
        })
        .collect()
}

// Sanitising can fold distinct keys together ("a-b" and "a_b");
// a numeric suffix keeps them apart.
fn claim(taken: &mut HashSet<String>, name: String) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{name}_{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Hands out unique record names for one inference run
#[derive(Debug, Default)]
pub struct NameRegistry {
    namespace: Option<String>,
    taken: HashSet<String>,
}

impl NameRegistry {
    /// Create a registry prefixing names with an optional namespace
    pub fn new(namespace: Option<String>) -> Self {
        Self {
            namespace,
            taken: HashSet::new(),
        }
    }

    /// Register the root record name
    pub fn root(&mut self, name: &str) -> String {
        self.claim(self.qualify(&sanitize_segment(name)))
    }

    /// Register the name for the record at `path`
    pub fn register(&mut self, path: &[String]) -> String {
        let joined = path
            .iter()
            .map(|segment| sanitize_segment(segment))
            .collect::<Vec<_>>()
            .join(".");
        self.claim(self.qualify(&joined))
    }

    fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{name}"),
            None => name.to_string(),
        }
    }

    fn claim(&mut self, name: String) -> String {
        claim(&mut self.taken, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("root"));
        assert!(is_valid_name("_x1"));
        assert!(!is_valid_name("1x"));
        assert!(!is_valid_name("a-b"));
        assert!(!is_valid_name(""));

        assert!(is_valid_namespace("com.example"));
        assert!(!is_valid_namespace("com..example"));
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("user"), "user");
        assert_eq!(sanitize_segment("my-field"), "my_field");
        assert_eq!(sanitize_segment("2nd"), "_2nd");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment("名前"), "__");
    }

    #[test]
    fn test_register_joins_path() {
        let mut names = NameRegistry::default();
        assert_eq!(names.register(&path(&["user", "address"])), "user.address");
        assert_eq!(names.register(&path(&["tags_items"])), "tags_items");
    }

    #[test]
    fn test_register_with_namespace() {
        let mut names = NameRegistry::new(Some("com.acme".to_string()));
        assert_eq!(names.root("root"), "com.acme.root");
        assert_eq!(names.register(&path(&["user"])), "com.acme.user");
    }

    #[test]
    fn test_sanitized_collisions_get_suffix() {
        let mut names = NameRegistry::default();
        assert_eq!(names.register(&path(&["a-b"])), "a_b");
        assert_eq!(names.register(&path(&["a_b"])), "a_b_2");
        assert_eq!(names.register(&path(&["a b"])), "a_b_3");
    }

    #[test]
    fn test_field_names_keep_valid_keys() {
        assert_eq!(field_names(["id", "name"]), vec!["id", "name"]);
    }

    #[test]
    fn test_field_names_sanitise_and_dedupe() {
        // "a_b" is valid and keeps its name; the others move aside
        assert_eq!(
            field_names(["a-b", "a_b", "a b", "1st"]),
            vec!["a_b_3", "a_b", "a_b_2", "_1st"]
        );
        assert_eq!(
            field_names(["a b", "a-b"]),
            vec!["a_b", "a_b_2"]
        );
        assert_eq!(
            field_names(["a-b", "a b"]),
            vec!["a_b_2", "a_b"]
        );
    }
}
