//! What the user is trying to download, derived from the address.

use std::fmt;

use serde::Serialize;

use crate::address::{AddressSnapshot, AddressStateStore, Mutation};
use crate::config::FeatureFlags;
use crate::domain::{AnnotationId, TomogramId};
use crate::query::{DOWNLOAD_PARAMS, QueryParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadConfig {
    Tomogram,
    AllAnnotations,
    Annotation,
}

impl DownloadConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadConfig::Tomogram => "tomogram",
            DownloadConfig::AllAnnotations => "all-annotations",
            DownloadConfig::Annotation => "annotation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tomogram" => Some(DownloadConfig::Tomogram),
            "all-annotations" => Some(DownloadConfig::AllAnnotations),
            "annotation" => Some(DownloadConfig::Annotation),
            _ => None,
        }
    }
}

impl fmt::Display for DownloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum TomogramTarget {
    Id { id: TomogramId },
    Sampling { sampling: String, processing: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TomogramSelection {
    pub target: TomogramTarget,
    pub file_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSelection {
    /// Raw address value; an id that does not parse selects nothing.
    pub annotation_id: String,
    pub file_format: Option<String>,
    pub shape_type: Option<String>,
}

impl AnnotationSelection {
    pub fn id(&self) -> Option<AnnotationId> {
        self.annotation_id.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    Annotation(AnnotationSelection),
    Tomogram(TomogramSelection),
    AllAnnotations,
    Unresolved,
}

type SelectionRule = fn(&AddressSnapshot, FeatureFlags) -> Option<Selection>;

/// Evaluated in order; the first rule that matches decides the selection.
///
/// Annotation parameters outrank tomogram parameters when both are present.
const SELECTION_RULES: &[SelectionRule] = &[annotation_rule, tomogram_rule, all_annotations_rule];

impl Selection {
    pub fn from_address(address: &AddressSnapshot, features: FeatureFlags) -> Self {
        SELECTION_RULES
            .iter()
            .find_map(|rule| rule(address, features))
            .unwrap_or(Selection::Unresolved)
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Selection::Unresolved)
    }

    pub fn file_format(&self) -> Option<&str> {
        match self {
            Selection::Annotation(selection) => selection.file_format.as_deref(),
            Selection::Tomogram(selection) => selection.file_format.as_deref(),
            Selection::AllAnnotations | Selection::Unresolved => None,
        }
    }
}

fn download_config(address: &AddressSnapshot) -> Option<DownloadConfig> {
    address
        .get(QueryParam::DownloadConfig)
        .and_then(DownloadConfig::parse)
}

fn owned(address: &AddressSnapshot, param: QueryParam) -> Option<String> {
    address.get_non_empty(param).map(str::to_string)
}

fn annotation_rule(address: &AddressSnapshot, _features: FeatureFlags) -> Option<Selection> {
    let annotation_id = owned(address, QueryParam::AnnotationId)?;
    Some(Selection::Annotation(AnnotationSelection {
        annotation_id,
        file_format: owned(address, QueryParam::FileFormat),
        shape_type: owned(address, QueryParam::ObjectShapeType),
    }))
}

fn tomogram_rule(address: &AddressSnapshot, features: FeatureFlags) -> Option<Selection> {
    if download_config(address)? != DownloadConfig::Tomogram {
        return None;
    }
    let target = if features.multiple_tomograms {
        let id = address
            .get_non_empty(QueryParam::TomogramId)
            .and_then(|value| value.parse().ok());
        id.map(|id| TomogramTarget::Id { id })
    } else {
        match (
            owned(address, QueryParam::TomogramSampling),
            owned(address, QueryParam::TomogramProcessing),
        ) {
            (Some(sampling), Some(processing)) => Some(TomogramTarget::Sampling {
                sampling,
                processing,
            }),
            _ => None,
        }
    };
    // A tomogram request with an incomplete target resolves to nothing rather than
    // falling through to the bulk-annotation rule.
    Some(match target {
        Some(target) => Selection::Tomogram(TomogramSelection {
            target,
            file_format: owned(address, QueryParam::FileFormat),
        }),
        None => Selection::Unresolved,
    })
}

fn all_annotations_rule(address: &AddressSnapshot, _features: FeatureFlags) -> Option<Selection> {
    (download_config(address)? == DownloadConfig::AllAnnotations).then_some(Selection::AllAnnotations)
}

const TOMOGRAM_KEYS: &[QueryParam] = &[
    QueryParam::TomogramId,
    QueryParam::TomogramProcessing,
    QueryParam::TomogramSampling,
];

fn deletions(keys: &[QueryParam]) -> impl Iterator<Item = Mutation> + '_ {
    keys.iter().map(Mutation::delete)
}

/// Removes a selected annotation.
///
/// `object_shape` doubles as an annotation table filter, so it only goes away together
/// with the `annotation_id` it was written alongside.
fn annotation_deletions(store: &AddressStateStore) -> Vec<Mutation> {
    let mut mutations = vec![Mutation::delete(QueryParam::AnnotationId)];
    if store.current().contains(QueryParam::AnnotationId) {
        mutations.push(Mutation::delete(QueryParam::ObjectShapeType));
    }
    mutations
}

/// Address writes for the download dialog.
///
/// Each call is one address transition, and choosing one kind of target removes the
/// parameters of the other kinds so the address never carries two competing selections.
pub struct SelectionWriter;

impl SelectionWriter {
    pub fn select_tomogram(
        store: &mut AddressStateStore,
        sampling: &str,
        processing: &str,
        file_format: &str,
    ) -> bool {
        let mutations = [
            Mutation::set(QueryParam::DownloadConfig, DownloadConfig::Tomogram.as_str()),
            Mutation::set(QueryParam::TomogramSampling, sampling),
            Mutation::set(QueryParam::TomogramProcessing, processing),
            Mutation::set(QueryParam::FileFormat, file_format),
            Mutation::delete(QueryParam::TomogramId),
        ];
        let annotation = annotation_deletions(store);
        store.batch_update(mutations.into_iter().chain(annotation))
    }

    pub fn select_tomogram_by_id(
        store: &mut AddressStateStore,
        id: TomogramId,
        file_format: &str,
    ) -> bool {
        let mutations = [
            Mutation::set(QueryParam::DownloadConfig, DownloadConfig::Tomogram.as_str()),
            Mutation::set(QueryParam::TomogramId, id.to_string()),
            Mutation::set(QueryParam::FileFormat, file_format),
            Mutation::delete(QueryParam::TomogramSampling),
            Mutation::delete(QueryParam::TomogramProcessing),
        ];
        let annotation = annotation_deletions(store);
        store.batch_update(mutations.into_iter().chain(annotation))
    }

    pub fn select_all_annotations(store: &mut AddressStateStore) -> bool {
        let mutations = [
            Mutation::set(
                QueryParam::DownloadConfig,
                DownloadConfig::AllAnnotations.as_str(),
            ),
            Mutation::delete(QueryParam::FileFormat),
        ];
        let annotation = annotation_deletions(store);
        store.batch_update(
            mutations
                .into_iter()
                .chain(deletions(TOMOGRAM_KEYS))
                .chain(annotation),
        )
    }

    pub fn select_annotation(
        store: &mut AddressStateStore,
        id: AnnotationId,
        shape_type: &str,
        file_format: &str,
    ) -> bool {
        let mutations = [
            Mutation::set(QueryParam::DownloadConfig, DownloadConfig::Annotation.as_str()),
            Mutation::set(QueryParam::AnnotationId, id.to_string()),
            Mutation::set(QueryParam::ObjectShapeType, shape_type),
            Mutation::set(QueryParam::FileFormat, file_format),
        ];
        store.batch_update(mutations.into_iter().chain(deletions(TOMOGRAM_KEYS)))
    }

    pub fn set_file_format(store: &mut AddressStateStore, file_format: &str) -> bool {
        store.set(QueryParam::FileFormat, file_format)
    }

    /// Drops every download parameter, closing the dialog.
    pub fn clear(store: &mut AddressStateStore) -> bool {
        let annotation = annotation_deletions(store);
        store.batch_update(deletions(DOWNLOAD_PARAMS).chain(annotation))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStep {
    Configure,
    Download,
}

impl DownloadStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStep::Configure => "configure",
            DownloadStep::Download => "download",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogType {
    Runs,
    Annotation,
}

/// Download dialog state as the address describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadDialog {
    pub open: bool,
    pub step: DownloadStep,
    pub tab: Option<String>,
    pub dialog_type: DialogType,
}

impl DownloadDialog {
    pub fn from_address(address: &AddressSnapshot) -> Self {
        let step = match address.get(QueryParam::DownloadStep) {
            Some("download") => DownloadStep::Download,
            _ => DownloadStep::Configure,
        };
        let dialog_type = if address.get_non_empty(QueryParam::AnnotationId).is_some() {
            DialogType::Annotation
        } else {
            DialogType::Runs
        };
        let open = address.contains(QueryParam::DownloadStep)
            || address.contains(QueryParam::DownloadConfig);
        Self {
            open,
            step,
            tab: address.get(QueryParam::DownloadTab).map(str::to_string),
            dialog_type,
        }
    }

    pub fn show(store: &mut AddressStateStore) -> bool {
        store.set(QueryParam::DownloadStep, DownloadStep::Configure.as_str())
    }

    pub fn go_to_step(store: &mut AddressStateStore, step: DownloadStep) -> bool {
        store.set(QueryParam::DownloadStep, step.as_str())
    }

    /// Writes the tab only when it differs from the current one.
    pub fn set_tab(store: &mut AddressStateStore, tab: &str) -> bool {
        if store.get(QueryParam::DownloadTab) == Some(tab) {
            return false;
        }
        store.set(QueryParam::DownloadTab, tab)
    }

    pub fn close(store: &mut AddressStateStore) -> bool {
        SelectionWriter::clear(store)
    }
}
