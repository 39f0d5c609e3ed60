use serde::Serialize;

use crate::normalize::normalize;

/// The current recipe-query selection: an insertion-ordered set of canonical
/// names. Local-only; never synced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorkingList {
    names: Vec<String>,
}

impl WorkingList {
    /// Build from raw names, normalizing and dropping blanks and repeats.
    #[must_use]
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for name in raw {
            list.add(name.as_ref());
        }
        list
    }

    /// Returns `true` if the name was appended.
    pub fn add(&mut self, raw: &str) -> bool {
        let name = normalize(raw);
        if name.is_empty() || self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Returns `true` if the name was present.
    pub fn remove(&mut self, raw: &str) -> bool {
        let name = normalize(raw);
        let before = self.names.len();
        self.names.retain(|n| *n != name);
        self.names.len() != before
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dedups_after_normalizing() {
        let mut list = WorkingList::default();
        assert!(list.add("番茄"));
        assert!(!list.add("  番茄 "));
        assert!(list.add("鸡蛋"));
        assert_eq!(list.as_slice(), ["番茄", "鸡蛋"]);
    }

    #[test]
    fn test_add_ignores_blank() {
        let mut list = WorkingList::default();
        assert!(!list.add("   "));
        assert!(list.is_empty());
    }

    #[test]
    fn test_membership_is_case_sensitive() {
        let mut list = WorkingList::default();
        assert!(list.add("Basil"));
        assert!(list.add("basil"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut list = WorkingList::from_raw(["土豆", "牛肉"]);
        assert!(list.remove(" 土豆"));
        assert!(!list.remove("土豆"));
        assert_eq!(list.as_slice(), ["牛肉"]);
    }

    #[test]
    fn test_from_raw_keeps_first_occurrence_order() {
        let list = WorkingList::from_raw(["b", "a", " b ", "c", "a  "]);
        assert_eq!(list.as_slice(), ["b", "a", "c"]);
    }

    #[test]
    fn test_clear() {
        let mut list = WorkingList::from_raw(["x"]);
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn test_serializes_as_array() {
        let list = WorkingList::from_raw(["葱", "姜"]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["葱","姜"]"#);
    }
}
