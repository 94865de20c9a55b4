use std::fmt;

/// Address parameters read or written by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryParam {
    AnnotationId,
    AnnotationSoftware,
    AnnotationsPage,
    AuthorName,
    AuthorOrcid,
    DepositionId,
    DownloadConfig,
    DownloadStep,
    DownloadTab,
    FileFormat,
    MetadataDrawer,
    MethodType,
    ObjectId,
    ObjectName,
    ObjectShapeType,
    TomogramId,
    TomogramProcessing,
    TomogramSampling,
    TomogramsPage,
}

impl QueryParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryParam::AnnotationId => "annotation_id",
            QueryParam::AnnotationSoftware => "annotation-software",
            QueryParam::AnnotationsPage => "annotations-page",
            QueryParam::AuthorName => "author",
            QueryParam::AuthorOrcid => "author_orcid",
            QueryParam::DepositionId => "deposition-id",
            QueryParam::DownloadConfig => "download-config",
            QueryParam::DownloadStep => "download-step",
            QueryParam::DownloadTab => "download-tab",
            QueryParam::FileFormat => "file-format",
            QueryParam::MetadataDrawer => "metadata",
            QueryParam::MethodType => "method-type",
            QueryParam::ObjectId => "object-id",
            QueryParam::ObjectName => "object",
            QueryParam::ObjectShapeType => "object_shape",
            QueryParam::TomogramId => "tomogram-id",
            QueryParam::TomogramProcessing => "tomogram-processing",
            QueryParam::TomogramSampling => "tomogram-sampling",
            QueryParam::TomogramsPage => "tomograms-page",
        }
    }
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters whose change invalidates the fetched run page.
pub const REFETCH_PARAMS: &[QueryParam] = &[
    QueryParam::AuthorName,
    QueryParam::AuthorOrcid,
    QueryParam::ObjectName,
    QueryParam::ObjectId,
    QueryParam::ObjectShapeType,
    QueryParam::MethodType,
    QueryParam::AnnotationSoftware,
    QueryParam::AnnotationsPage,
    QueryParam::DepositionId,
];

/// Parameters forwarded to the catalog as annotation filters.
pub const FILTER_PARAMS: &[QueryParam] = &[
    QueryParam::AuthorName,
    QueryParam::AuthorOrcid,
    QueryParam::ObjectName,
    QueryParam::ObjectId,
    QueryParam::ObjectShapeType,
    QueryParam::MethodType,
    QueryParam::AnnotationSoftware,
];

/// Parameters owned by the download dialog alone. `object_shape` is shared with the
/// annotation filters.
pub const DOWNLOAD_PARAMS: &[QueryParam] = &[
    QueryParam::DownloadConfig,
    QueryParam::DownloadStep,
    QueryParam::DownloadTab,
    QueryParam::FileFormat,
    QueryParam::AnnotationId,
    QueryParam::TomogramId,
    QueryParam::TomogramProcessing,
    QueryParam::TomogramSampling,
];

impl AsRef<str> for QueryParam {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
