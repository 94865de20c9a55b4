//! Maps a [`Selection`] onto the concrete artifact it names.

use serde::Serialize;

use crate::domain::{Annotation, RunPage, Tomogram, format_sampling};
use crate::selection::{AnnotationSelection, Selection, TomogramSelection, TomogramTarget};

/// Suffix appended to a run's storage prefix to address every annotation of the run.
pub const ANNOTATIONS_DIR: &str = "Annotations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    /// One file, size can be probed (`mrc`, `json`, `ndjson`, ...).
    SingleFile,
    /// Directory of chunks; size depends on the listing and is not probed.
    Chunked,
}

impl FormatClass {
    pub fn of(format: &str) -> Self {
        if format.eq_ignore_ascii_case("zarr") {
            FormatClass::Chunked
        } else {
            FormatClass::SingleFile
        }
    }
}

/// Resolved artifact. Any field may be absent while the selection is incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadDescriptor {
    pub storage_path: Option<String>,
    pub transfer_path: Option<String>,
    /// Transfer path to probe for a size; only set for single-file artifacts.
    pub size_query: Option<String>,
}

impl DownloadDescriptor {
    pub fn is_resolved(&self) -> bool {
        self.storage_path.is_some() || self.transfer_path.is_some()
    }

    fn single_file(storage_path: Option<String>, transfer_path: Option<String>) -> Self {
        Self {
            size_query: transfer_path.clone(),
            storage_path,
            transfer_path,
        }
    }

    fn unprobed(storage_path: Option<String>, transfer_path: Option<String>) -> Self {
        Self {
            storage_path,
            transfer_path,
            size_query: None,
        }
    }
}

pub fn resolve(selection: &Selection, page: &RunPage) -> DownloadDescriptor {
    match selection {
        Selection::Annotation(selection) => resolve_annotation(selection, page),
        Selection::Tomogram(selection) => resolve_tomogram(selection, page),
        Selection::AllAnnotations => resolve_all_annotations(page),
        Selection::Unresolved => DownloadDescriptor::default(),
    }
}

pub fn active_tomogram<'a>(selection: &Selection, page: &'a RunPage) -> Option<&'a Tomogram> {
    match selection {
        Selection::Tomogram(selection) => find_tomogram(&selection.target, page),
        _ => None,
    }
}

pub fn active_annotation<'a>(selection: &Selection, page: &'a RunPage) -> Option<&'a Annotation> {
    match selection {
        Selection::Annotation(selection) => page.find_annotation(selection.id()?),
        _ => None,
    }
}

fn find_tomogram<'a>(target: &TomogramTarget, page: &'a RunPage) -> Option<&'a Tomogram> {
    match target {
        TomogramTarget::Id { id } => page.tomograms().find(|tomogram| tomogram.id == *id),
        TomogramTarget::Sampling {
            sampling,
            processing,
        } => {
            let sampling = normalize_sampling(sampling);
            page.tomograms().find(|tomogram| {
                tomogram.sampling() == sampling && tomogram.processing == *processing
            })
        }
    }
}

fn normalize_sampling(value: &str) -> String {
    match value.trim().parse::<f64>() {
        Ok(number) => format_sampling(number),
        Err(_) => value.to_string(),
    }
}

fn resolve_tomogram(selection: &TomogramSelection, page: &RunPage) -> DownloadDescriptor {
    let Some(format) = selection.file_format.as_deref() else {
        return DownloadDescriptor::default();
    };
    let Some(tomogram) = find_tomogram(&selection.target, page) else {
        return DownloadDescriptor::default();
    };
    match FormatClass::of(format) {
        FormatClass::Chunked => DownloadDescriptor::unprobed(
            tomogram.s3_omezarr_dir.clone(),
            tomogram.https_omezarr_dir.clone(),
        ),
        FormatClass::SingleFile if format.eq_ignore_ascii_case("mrc") => {
            DownloadDescriptor::single_file(
                tomogram.s3_mrc_scale0.clone(),
                tomogram.https_mrc_scale0.clone(),
            )
        }
        FormatClass::SingleFile => DownloadDescriptor::default(),
    }
}

fn resolve_all_annotations(page: &RunPage) -> DownloadDescriptor {
    let storage_path = page
        .primary_voxel_spacing()
        .and_then(|group| group.s3_prefix.as_deref())
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| format!("{prefix}{ANNOTATIONS_DIR}"));
    DownloadDescriptor::unprobed(storage_path, None)
}

fn resolve_annotation(selection: &AnnotationSelection, page: &RunPage) -> DownloadDescriptor {
    let (Some(format), Some(shape_type)) = (
        selection.file_format.as_deref(),
        selection.shape_type.as_deref(),
    ) else {
        return DownloadDescriptor::default();
    };
    let file = selection
        .id()
        .and_then(|id| page.find_annotation(id))
        .and_then(|annotation| annotation.find_file(format, shape_type));
    match file {
        Some(file) => match FormatClass::of(format) {
            FormatClass::SingleFile => DownloadDescriptor::single_file(
                Some(file.s3_path.clone()),
                Some(file.https_path.clone()),
            ),
            FormatClass::Chunked => DownloadDescriptor::unprobed(
                Some(file.s3_path.clone()),
                Some(file.https_path.clone()),
            ),
        },
        None => DownloadDescriptor::default(),
    }
}
