use serde::Serialize;

use crate::domain::{AnnotationId, RunId, RunPage, Tomogram, TomogramId};
use crate::error::PortalError;
use crate::resolver::{DownloadDescriptor, active_annotation, active_tomogram};
use crate::selection::{DialogType, Selection};

/// Values the download dialog renders, built once per address or data change and
/// handed to the dialog explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadContext {
    pub dialog_type: DialogType,
    pub dataset_id: u64,
    pub dataset_title: String,
    pub run_id: RunId,
    pub run_name: String,
    pub object_name: Option<String>,
    pub annotation_id: Option<AnnotationId>,
    pub tomogram_id: Option<TomogramId>,
    pub tomogram_voxel_id: Option<u64>,
    pub all_tomogram_processing: Vec<String>,
    pub all_tomograms: Vec<Tomogram>,
    pub descriptor: DownloadDescriptor,
    pub file_size: Option<u64>,
}

impl DownloadContext {
    pub fn new(
        page: Option<&RunPage>,
        selection: &Selection,
        descriptor: DownloadDescriptor,
        file_size: Option<u64>,
    ) -> Result<Self, PortalError> {
        let page = page.ok_or_else(|| PortalError::MissingContext("run page not loaded".to_string()))?;

        let annotation = active_annotation(selection, page);
        let tomogram = active_tomogram(selection, page);
        let dialog_type = match selection {
            Selection::Annotation(_) => DialogType::Annotation,
            _ => DialogType::Runs,
        };

        Ok(Self {
            dialog_type,
            dataset_id: page.run.dataset.id,
            dataset_title: page.run.dataset.title.clone(),
            run_id: page.run.id,
            run_name: page.run.name.clone(),
            object_name: annotation.map(|annotation| annotation.object_name.clone()),
            annotation_id: annotation.map(|annotation| annotation.id),
            tomogram_id: tomogram.map(|tomogram| tomogram.id),
            tomogram_voxel_id: page.primary_voxel_spacing().map(|group| group.id),
            all_tomogram_processing: page.processing_methods(),
            all_tomograms: page.tomograms().cloned().collect(),
            // Size belongs to the descriptor it was probed for.
            file_size: file_size.filter(|_| descriptor.size_query.is_some()),
            descriptor,
        })
    }
}
