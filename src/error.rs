use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PortalError {
    #[error("invalid run id: {0}")]
    #[diagnostic(help("run ids are positive integers, e.g. `runs/14069`"))]
    InvalidRunId(String),

    #[error("invalid tomogram id: {0}")]
    InvalidTomogramId(String),

    #[error("invalid annotation id: {0}")]
    InvalidAnnotationId(String),

    #[error("run with ID {0} not found")]
    RunNotFound(u64),

    #[error("missing download context: {0}")]
    MissingContext(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read catalog snapshot at {0}")]
    SnapshotRead(PathBuf),

    #[error("failed to parse catalog snapshot: {0}")]
    SnapshotParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("catalog query failed: {0}")]
    CatalogQuery(String),

    #[error("size probe failed: {0}")]
    SizeProbe(String),
}

impl PortalError {
    /// HTTP-style status for errors that terminate a navigation.
    pub fn status(&self) -> u16 {
        match self {
            PortalError::InvalidRunId(_)
            | PortalError::InvalidTomogramId(_)
            | PortalError::InvalidAnnotationId(_) => 400,
            PortalError::RunNotFound(_) => 404,
            _ => 500,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        self.status() == 400
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == 404
    }
}
