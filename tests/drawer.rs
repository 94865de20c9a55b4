use portal_download_engine::address::AddressStateStore;
use portal_download_engine::drawer::{DrawerCoordinator, DrawerKind};

#[test]
fn deep_link_tab_opens_drawer_once() {
    let mut store = AddressStateStore::from_query("tab=howToCite");
    let mut drawers = DrawerCoordinator::new();

    assert_eq!(drawers.observe(&mut store), Some(DrawerKind::Dataset));
    assert_eq!(store.revision(), 1);
    let record = DrawerCoordinator::record(store.current(), DrawerKind::Dataset);
    assert!(record.open);
    assert_eq!(record.tab.as_deref(), Some("howToCite"));

    // Switching tabs afterwards must not re-trigger the bootstrap.
    DrawerCoordinator::set_tab(&mut store, DrawerKind::Dataset, "metadata");
    assert_eq!(drawers.observe(&mut store), None);
    assert_eq!(store.revision(), 2);
}

#[test]
fn closed_drawer_never_reopens_in_same_session() {
    let mut store = AddressStateStore::from_query("run-tab=metadata");
    let mut drawers = DrawerCoordinator::new();
    drawers.observe(&mut store);
    DrawerCoordinator::close(&mut store, DrawerKind::Run);
    assert!(!DrawerCoordinator::record(store.current(), DrawerKind::Run).open);

    // Even if the tab key comes back through a later navigation.
    store.navigate("run-tab=metadata");
    assert_eq!(drawers.observe(&mut store), None);
    assert!(!DrawerCoordinator::record(store.current(), DrawerKind::Run).open);
}

#[test]
fn latch_is_consumed_by_first_observation_without_tab() {
    let mut store = AddressStateStore::from_query("annotations-page=2");
    let mut drawers = DrawerCoordinator::new();
    assert_eq!(drawers.observe(&mut store), None);
    assert!(!drawers.bootstrap_pending());

    store.set("tomogram-tab", "metadata");
    assert_eq!(drawers.observe(&mut store), None);
    assert_eq!(DrawerCoordinator::open_drawer(store.current()), None);
}

#[test]
fn address_with_open_marker_needs_no_bootstrap() {
    let mut store = AddressStateStore::from_query("metadata=annotation-metadata&annotation-tab=howToCite");
    let mut drawers = DrawerCoordinator::new();
    assert_eq!(drawers.observe(&mut store), None);
    assert_eq!(store.revision(), 0);
    let record = DrawerCoordinator::record(store.current(), DrawerKind::Annotation);
    assert_eq!(record.tab.as_deref(), Some("howToCite"));
}

#[test]
fn repeated_identical_tab_write_is_one_transition() {
    let mut store = AddressStateStore::new();
    DrawerCoordinator::open(&mut store, DrawerKind::Tomogram);
    let before = store.revision();
    DrawerCoordinator::set_tab(&mut store, DrawerKind::Tomogram, "x");
    DrawerCoordinator::set_tab(&mut store, DrawerKind::Tomogram, "x");
    assert_eq!(store.revision(), before + 1);
}

#[test]
fn unknown_tab_values_are_kept_verbatim() {
    let mut store = AddressStateStore::new();
    DrawerCoordinator::open_with(&mut store, DrawerKind::Run, "not-a-real-tab");
    let record = DrawerCoordinator::record(store.current(), DrawerKind::Run);
    assert_eq!(record.tab.as_deref(), Some("not-a-real-tab"));
}

#[test]
fn closed_drawers_report_no_tab() {
    let store = AddressStateStore::from_query("tab=howToCite");
    let records = DrawerCoordinator::records(store.current());
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|record| !record.open && record.tab.is_none()));
}
