use assert_matches::assert_matches;

use portal_download_engine::address::AddressSnapshot;
use portal_download_engine::catalog::{CatalogClient, RunLoader, RunQuery, SnapshotCatalog};
use portal_download_engine::domain::RunId;
use portal_download_engine::error::PortalError;

const FIXTURE: &str = include_str!("fixtures/run_page.json");

fn catalog() -> SnapshotCatalog {
    SnapshotCatalog::from_json(FIXTURE).unwrap()
}

#[test]
fn loader_rejects_non_numeric_ids() {
    let loader = RunLoader::new(catalog(), 20);
    for id in ["", "abc", "12x", "-4"] {
        let err = loader.load(id, &AddressSnapshot::default()).unwrap_err();
        assert!(err.is_bad_request(), "{id:?} should be a bad request");
    }
}

#[test]
fn loader_reports_missing_run() {
    let loader = RunLoader::new(catalog(), 20);
    let err = loader.load("1", &AddressSnapshot::default()).unwrap_err();
    assert_matches!(err, PortalError::RunNotFound(1));
    assert!(err.is_not_found());
}

#[test]
fn snapshot_paginates_annotations() {
    let address = AddressSnapshot::from_query("annotations-page=2");
    let query = RunQuery::from_address(RunId::new(14069), &address, 2);
    let page = catalog().fetch_run(&query).unwrap().unwrap();
    assert_eq!(page.run.annotations.len(), 1);
    assert_eq!(page.run.annotations[0].id.get(), 7003);
    assert_eq!(page.annotation_aggregates.total_count, 3);
    assert_eq!(page.annotation_aggregates.filtered_count, 3);
}

#[test]
fn snapshot_applies_filters() {
    let address = AddressSnapshot::from_query("object=RIBO&author=ada");
    let query = RunQuery::from_address(RunId::new(14069), &address, 20);
    let page = catalog().fetch_run(&query).unwrap().unwrap();
    assert_eq!(page.run.annotations.len(), 1);
    assert_eq!(page.annotation_aggregates.filtered_count, 1);
    assert_eq!(page.annotation_aggregates.total_count, 3);
}

#[test]
fn snapshot_filters_object_id_and_software() {
    let address = AddressSnapshot::from_query("object-id=go:0016020");
    let query = RunQuery::from_address(RunId::new(14069), &address, 20);
    let page = catalog().fetch_run(&query).unwrap().unwrap();
    assert_eq!(page.run.annotations.len(), 1);
    assert_eq!(page.run.annotations[0].id.get(), 7002);

    let address = AddressSnapshot::from_query("annotation-software=pytom");
    let query = RunQuery::from_address(RunId::new(14069), &address, 20);
    let page = catalog().fetch_run(&query).unwrap().unwrap();
    assert_eq!(page.run.annotations.len(), 1);
    assert_eq!(page.run.annotations[0].id.get(), 7001);
}

#[test]
fn deposition_only_reported_when_filtered_by_it() {
    let plain = RunQuery::from_address(RunId::new(14069), &AddressSnapshot::default(), 20);
    assert!(catalog().fetch_run(&plain).unwrap().unwrap().deposition.is_none());

    let address = AddressSnapshot::from_query("deposition-id=10301");
    let filtered = RunQuery::from_address(RunId::new(14069), &address, 20);
    let page = catalog().fetch_run(&filtered).unwrap().unwrap();
    assert_eq!(page.deposition.map(|d| d.id), Some(10301));
}

#[test]
fn snapshot_file_can_hold_a_single_page() {
    let single = r#"{ "run": { "id": 5, "name": "TS_001", "dataset": { "id": 1, "title": "t" } } }"#;
    let catalog = SnapshotCatalog::from_json(single).unwrap();
    let query = RunQuery::from_address(RunId::new(5), &AddressSnapshot::default(), 20);
    assert!(catalog.fetch_run(&query).unwrap().is_some());
}

#[test]
fn malformed_snapshot_is_reported() {
    let err = SnapshotCatalog::from_json("[{}]").unwrap_err();
    assert_matches!(err, PortalError::SnapshotParse(_));
}
