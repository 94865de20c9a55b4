//! Metadata drawers and their address representation.
//!
//! A drawer is open when the `metadata` parameter names it; its active tab lives in a
//! per-kind parameter. Closing removes both parameters, so absence is the closed state.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::address::{AddressSnapshot, AddressStateStore, Mutation};
use crate::query::QueryParam;

pub const DEFAULT_TAB: &str = "metadata";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawerKind {
    Dataset,
    Run,
    Annotation,
    Tomogram,
}

impl DrawerKind {
    pub const ALL: [DrawerKind; 4] = [
        DrawerKind::Dataset,
        DrawerKind::Run,
        DrawerKind::Annotation,
        DrawerKind::Tomogram,
    ];

    /// Value of the `metadata` parameter while this drawer is open.
    pub fn marker(&self) -> &'static str {
        match self {
            DrawerKind::Dataset => "dataset-metadata",
            DrawerKind::Run => "run-metadata",
            DrawerKind::Annotation => "annotation-metadata",
            DrawerKind::Tomogram => "tomogram-metadata",
        }
    }

    pub fn tab_param(&self) -> &'static str {
        match self {
            DrawerKind::Dataset => "tab",
            DrawerKind::Run => "run-tab",
            DrawerKind::Annotation => "annotation-tab",
            DrawerKind::Tomogram => "tomogram-tab",
        }
    }

    pub fn from_marker(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.marker() == value)
    }
}

impl fmt::Display for DrawerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawerKind::Dataset => write!(f, "dataset"),
            DrawerKind::Run => write!(f, "run"),
            DrawerKind::Annotation => write!(f, "annotation"),
            DrawerKind::Tomogram => write!(f, "tomogram"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawerRecord {
    pub kind: DrawerKind,
    pub open: bool,
    /// Active tab; `None` while closed.
    pub tab: Option<String>,
}

/// Keeps drawer state and the address in sync.
///
/// Holds a single piece of state of its own: whether the deep-link bootstrap has already
/// run. It runs on the first [`observe`](Self::observe) and never again for the lifetime
/// of the coordinator.
#[derive(Debug)]
pub struct DrawerCoordinator {
    bootstrap_pending: bool,
}

impl Default for DrawerCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawerCoordinator {
    pub fn new() -> Self {
        Self {
            bootstrap_pending: true,
        }
    }

    pub fn open_drawer(address: &AddressSnapshot) -> Option<DrawerKind> {
        address
            .get(QueryParam::MetadataDrawer)
            .and_then(DrawerKind::from_marker)
    }

    pub fn record(address: &AddressSnapshot, kind: DrawerKind) -> DrawerRecord {
        let open = Self::open_drawer(address) == Some(kind);
        let tab = open.then(|| {
            address
                .get_non_empty(kind.tab_param())
                .unwrap_or(DEFAULT_TAB)
                .to_string()
        });
        DrawerRecord { kind, open, tab }
    }

    pub fn records(address: &AddressSnapshot) -> Vec<DrawerRecord> {
        DrawerKind::ALL
            .into_iter()
            .map(|kind| Self::record(address, kind))
            .collect()
    }

    /// Opens `kind` on `tab`, closing whichever drawer was open before.
    pub fn open_with(store: &mut AddressStateStore, kind: DrawerKind, tab: &str) -> bool {
        let mut mutations = vec![
            Mutation::set(QueryParam::MetadataDrawer, kind.marker()),
            Mutation::set(kind.tab_param(), tab),
        ];
        mutations.extend(
            DrawerKind::ALL
                .into_iter()
                .filter(|other| *other != kind)
                .map(|other| Mutation::delete(other.tab_param())),
        );
        store.batch_update(mutations)
    }

    /// Opens `kind` on the tab already in the address, or the default tab.
    pub fn open(store: &mut AddressStateStore, kind: DrawerKind) -> bool {
        let tab = store
            .current()
            .get_non_empty(kind.tab_param())
            .unwrap_or(DEFAULT_TAB)
            .to_string();
        Self::open_with(store, kind, &tab)
    }

    pub fn close(store: &mut AddressStateStore, kind: DrawerKind) -> bool {
        let mut mutations = vec![Mutation::delete(kind.tab_param())];
        if Self::open_drawer(store.current()) == Some(kind) {
            mutations.push(Mutation::delete(QueryParam::MetadataDrawer));
        }
        store.batch_update(mutations)
    }

    /// Switches the tab of an open drawer. Writing the current tab again is a no-op.
    pub fn set_tab(store: &mut AddressStateStore, kind: DrawerKind, tab: &str) -> bool {
        if Self::open_drawer(store.current()) != Some(kind) {
            return false;
        }
        if store.get(kind.tab_param()) == Some(tab) {
            return false;
        }
        store.set(kind.tab_param(), tab)
    }

    /// Opens the drawer a shared link points at: a tab parameter without an open marker.
    ///
    /// Only the first call can open anything; later calls return `None`.
    pub fn observe(&mut self, store: &mut AddressStateStore) -> Option<DrawerKind> {
        if !self.bootstrap_pending {
            return None;
        }
        self.bootstrap_pending = false;

        let address = store.current();
        if Self::open_drawer(address).is_some() {
            return None;
        }
        let kind = DrawerKind::ALL
            .into_iter()
            .find(|kind| address.contains(kind.tab_param()))?;
        let tab = address.get(kind.tab_param()).unwrap_or(DEFAULT_TAB).to_string();
        debug!(drawer = %kind, tab = %tab, "opening drawer from deep link");
        Self::open_with(store, kind, &tab);
        Some(kind)
    }

    pub fn bootstrap_pending(&self) -> bool {
        self.bootstrap_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_writes_marker_and_tab_in_one_transition() {
        let mut store = AddressStateStore::new();
        assert!(DrawerCoordinator::open_with(&mut store, DrawerKind::Run, "howToCite"));
        assert_eq!(store.revision(), 1);
        let record = DrawerCoordinator::record(store.current(), DrawerKind::Run);
        assert!(record.open);
        assert_eq!(record.tab.as_deref(), Some("howToCite"));
    }

    #[test]
    fn close_removes_both_parameters() {
        let mut store = AddressStateStore::from_query("metadata=run-metadata&run-tab=metadata&page=2");
        assert!(DrawerCoordinator::close(&mut store, DrawerKind::Run));
        assert_eq!(store.current().to_query(), "page=2");
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn set_tab_is_idempotent() {
        let mut store = AddressStateStore::from_query("metadata=dataset-metadata&tab=metadata");
        assert!(DrawerCoordinator::set_tab(&mut store, DrawerKind::Dataset, "x"));
        assert!(!DrawerCoordinator::set_tab(&mut store, DrawerKind::Dataset, "x"));
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn set_tab_on_closed_drawer_is_ignored() {
        let mut store = AddressStateStore::new();
        assert!(!DrawerCoordinator::set_tab(&mut store, DrawerKind::Tomogram, "x"));
        assert!(store.current().is_empty());
    }

    #[test]
    fn opening_another_drawer_drops_previous_tab() {
        let mut store = AddressStateStore::from_query("metadata=dataset-metadata&tab=howToCite");
        DrawerCoordinator::open(&mut store, DrawerKind::Annotation);
        assert_eq!(
            DrawerCoordinator::open_drawer(store.current()),
            Some(DrawerKind::Annotation)
        );
        assert!(!store.current().contains("tab"));
        assert_eq!(store.get("annotation-tab"), Some(DEFAULT_TAB));
    }
}
