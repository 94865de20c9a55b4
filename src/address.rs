//! The navigable address: the only persistent state of a portal page.
//!
//! Every derived value (selection, drawers, download dialog) is recomputed from an
//! [`AddressSnapshot`]. Writes go through [`AddressStateStore::batch_update`], which applies
//! an ordered list of mutations as a single history entry.

use std::fmt;

use tracing::debug;
use url::form_urlencoded;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set(String, String),
    Delete(String),
}

impl Mutation {
    pub fn set(key: impl AsRef<str>, value: impl Into<String>) -> Self {
        Mutation::Set(key.as_ref().to_string(), value.into())
    }

    pub fn delete(key: impl AsRef<str>) -> Self {
        Mutation::Delete(key.as_ref().to_string())
    }

    pub fn key(&self) -> &str {
        match self {
            Mutation::Set(key, _) | Mutation::Delete(key) => key,
        }
    }
}

/// Immutable view of the query parameters at one point in history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSnapshot {
    params: Vec<(String, String)>,
}

impl AddressSnapshot {
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut snapshot = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            // Repeated keys keep the first value, matching `URLSearchParams::get`.
            if snapshot.get(&key).is_none() {
                snapshot.params.push((key.into_owned(), value.into_owned()));
            }
        }
        snapshot
    }

    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`get`](Self::get) but treats an empty value as absent.
    pub fn get_non_empty(&self, key: impl AsRef<str>) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn apply(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Set(key, value) => {
                match self.params.iter_mut().find(|(k, _)| k == key) {
                    Some(entry) => entry.1 = value.clone(),
                    None => self.params.push((key.clone(), value.clone())),
                }
            }
            Mutation::Delete(key) => self.params.retain(|(k, _)| k != key),
        }
    }
}

impl fmt::Display for AddressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.to_query())
    }
}

/// Read/write access to the current address plus its navigation history.
///
/// Mutations are synchronous: a read issued right after a write observes it. Observers
/// detect changes by comparing [`revision`](Self::revision) values.
#[derive(Debug, Clone)]
pub struct AddressStateStore {
    history: Vec<AddressSnapshot>,
    cursor: usize,
    revision: u64,
}

impl Default for AddressStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressStateStore {
    pub fn new() -> Self {
        Self::from_snapshot(AddressSnapshot::default())
    }

    pub fn from_query(query: &str) -> Self {
        Self::from_snapshot(AddressSnapshot::from_query(query))
    }

    pub fn from_snapshot(snapshot: AddressSnapshot) -> Self {
        Self {
            history: vec![snapshot],
            cursor: 0,
            revision: 0,
        }
    }

    pub fn current(&self) -> &AddressSnapshot {
        &self.history[self.cursor]
    }

    pub fn snapshot(&self) -> AddressSnapshot {
        self.current().clone()
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.current().get(key)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> bool {
        self.batch_update([Mutation::set(key, value)])
    }

    pub fn delete(&mut self, key: impl AsRef<str>) -> bool {
        self.batch_update([Mutation::delete(key)])
    }

    /// Applies all mutations in order as one address transition.
    ///
    /// Returns `false` without touching history when the resulting address equals the
    /// current one.
    pub fn batch_update<I>(&mut self, mutations: I) -> bool
    where
        I: IntoIterator<Item = Mutation>,
    {
        let mut next = self.current().clone();
        let mut count = 0usize;
        for mutation in mutations {
            next.apply(&mutation);
            count += 1;
        }
        if &next == self.current() {
            return false;
        }
        debug!(mutations = count, address = %next, "address transition");
        self.push(next);
        true
    }

    /// Replaces the whole address, as following a link or reloading with a new URL does.
    pub fn navigate(&mut self, query: &str) -> bool {
        let next = AddressSnapshot::from_query(query);
        if &next == self.current() {
            return false;
        }
        debug!(address = %next, "address navigation");
        self.push(next);
        true
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.revision += 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.history.len() {
            return false;
        }
        self.cursor += 1;
        self.revision += 1;
        true
    }

    fn push(&mut self, snapshot: AddressSnapshot) {
        self.history.truncate(self.cursor + 1);
        self.history.push(snapshot);
        self.cursor = self.history.len() - 1;
        self.revision += 1;
    }
}
