use portal_download_engine::domain::RunPage;
use portal_download_engine::projector::{TableRow, project_rows, table_rows};

const FIXTURE: &str = include_str!("fixtures/run_page.json");

fn first_page() -> RunPage {
    let pages: Vec<RunPage> = serde_json::from_str(FIXTURE).unwrap();
    pages.into_iter().next().unwrap()
}

#[test]
fn rows_merge_annotation_and_file_fields() {
    let page = first_page();
    let rows = project_rows(&page.run.annotations);
    let mask = rows
        .iter()
        .find(|row| row.shape_type == "SegmentationMask")
        .unwrap();
    assert_eq!(mask.object_name, "cytosolic ribosome");
    assert_eq!(mask.format, "mrc");
    assert_eq!(mask.s3_path, "s3://bucket/7001/mask.mrc");
    assert_eq!(mask.authors.len(), 3);
    assert_eq!(mask.confidence_precision, Some(84.5));
    assert_eq!(mask.confidence_recall, None);
}

#[test]
fn first_file_per_shape_wins() {
    let page = first_page();
    let rows = project_rows(&page.run.annotations);
    let point = rows.iter().find(|row| row.shape_type == "Point").unwrap();
    assert_eq!(point.format, "ndjson");
    assert_eq!(rows.iter().filter(|row| row.id.get() == 7001).count(), 2);
}

#[test]
fn ready_rows_are_not_padded() {
    let page = first_page();
    let rows = table_rows(&page.run.annotations, false, 20);
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| matches!(row, TableRow::Ready(_))));
}
