use std::collections::HashSet;

use serde::Serialize;

use crate::domain::{Annotation, AnnotationFile, AnnotationId, Author};

/// One annotation table row: an annotation merged with one of its files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRow {
    pub id: AnnotationId,
    pub object_name: String,
    pub object_count: Option<u64>,
    pub ground_truth_status: bool,
    pub method_type: Option<String>,
    pub confidence_precision: Option<f64>,
    pub confidence_recall: Option<f64>,
    pub authors: Vec<Author>,
    pub format: String,
    pub shape_type: String,
    pub s3_path: String,
    pub https_path: String,
}

impl AnnotationRow {
    fn merge(annotation: &Annotation, file: &AnnotationFile) -> Self {
        Self {
            id: annotation.id,
            object_name: annotation.object_name.clone(),
            object_count: annotation.object_count,
            ground_truth_status: annotation.ground_truth_status,
            method_type: annotation.method_type.clone(),
            confidence_precision: annotation.confidence_precision,
            confidence_recall: annotation.confidence_recall,
            authors: annotation.authors.clone(),
            format: file.format.clone(),
            shape_type: file.shape_type.clone(),
            s3_path: file.s3_path.clone(),
            https_path: file.https_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TableRow {
    Loading,
    Ready(AnnotationRow),
}

/// Flattens annotations into rows, keeping the first file seen for each shape type.
pub fn project_rows(annotations: &[Annotation]) -> Vec<AnnotationRow> {
    let mut rows = Vec::new();
    for annotation in annotations {
        let mut seen = HashSet::new();
        for file in &annotation.files {
            if seen.insert(file.shape_type.as_str()) {
                rows.push(AnnotationRow::merge(annotation, file));
            }
        }
    }
    rows
}

pub fn placeholder_rows(page_size: usize) -> Vec<TableRow> {
    vec![TableRow::Loading; page_size]
}

/// Rows to display: a full page of placeholders while loading, projected rows otherwise.
pub fn table_rows(annotations: &[Annotation], loading: bool, page_size: usize) -> Vec<TableRow> {
    if loading {
        return placeholder_rows(page_size);
    }
    project_rows(annotations)
        .into_iter()
        .map(TableRow::Ready)
        .collect()
}
