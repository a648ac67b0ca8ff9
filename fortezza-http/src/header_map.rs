// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use unicase::UniCase;

/// A field store with ASCII-case-insensitive names and stable
/// insertion order.
///
/// Inserting under an existing name (any case) overwrites the value
/// in place: the entry keeps its position and the name it was first
/// stored under, and the map size is unchanged. Values are stored
/// verbatim; the parser trims optional whitespace before insertion,
/// so an empty value is legal here.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    fields: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.fields[index].1 = value,
            None => self.fields.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.fields[index].1.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        let name = UniCase::ascii(name);
        self.fields.retain(|(stored, _)| UniCase::ascii(stored.as_str()) != name);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Each stored name exactly once, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = UniCase::ascii(name);
        self.fields.iter().position(|(stored, _)| UniCase::ascii(stored.as_str()) == name)
    }
}
