use std::collections::HashMap;

use crate::{MULTI_SELECT_DELIMITER, SKIPPED};

/// Collected answers of one user, keyed by field name.
///
/// Values are stored as strings exactly as they were persisted: formatted
/// answers, `"skipped"` for bypassed fields, and delimiter-joined strings for
/// multi-select answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: HashMap<String, String>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the field was bypassed by its skip predicate.
    pub fn is_skipped(&self, name: &str) -> bool {
        self.get(name) == Some(SKIPPED)
    }

    /// Whether the field holds a real answer: present, non-empty, not skipped.
    pub fn has_value(&self, name: &str) -> bool {
        match self.get(name) {
            Some(value) => !value.is_empty() && value != SKIPPED,
            None => false,
        }
    }

    /// Whether the value stored for `name` equals `expected`.
    pub fn is(&self, name: &str, expected: &str) -> bool {
        self.get(name) == Some(expected)
    }

    /// Split a multi-select answer into its options. Missing or empty values
    /// yield an empty list.
    pub fn get_list(&self, name: &str) -> Vec<&str> {
        match self.get(name) {
            Some(value) if !value.is_empty() => value.split(MULTI_SELECT_DELIMITER).collect(),
            _ => Vec::new(),
        }
    }
}

impl FromIterator<(String, String)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FieldValues {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
