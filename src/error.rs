/// Error types for template substitution operations.
use thiserror::Error;

/// Result type for template substitution operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Error taxonomy for the substitution engine.
///
/// Structural archive failures (`ArchiveNotFound`, `ArchiveCorrupt`,
/// `CatalogIncomplete`) and token-set validation (`AmbiguousTokenSet`) are
/// fatal for a generation run: no partial archive is ever written.
/// `NoMediaCandidate` is recoverable — text substitution output is still
/// valid and callers decide how to treat the run. Unresolved or unknown
/// placeholder tokens are never errors; they are surfaced through the
/// [`SubstitutionReport`](crate::template::SubstitutionReport).
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template archive does not exist at the given path
    #[error("archive not found: {0}")]
    ArchiveNotFound(String),

    /// Input is not a readable OPC package (bad ZIP, missing content types,
    /// missing relationship parts)
    #[error("archive corrupt: {0}")]
    ArchiveCorrupt(String),

    /// The package contains no slide markup parts
    #[error("catalog incomplete: no slide parts found in package")]
    CatalogIncomplete,

    /// Token set configuration is ambiguous or malformed
    #[error("ambiguous token set: {0}")]
    AmbiguousTokenSet(String),

    /// No slide in the package carries an image relationship
    #[error("no media candidate: no slide references an image part")]
    NoMediaCandidate,

    /// Part name is not a valid pack URI
    #[error("invalid part name: {0}")]
    InvalidPartName(String),

    /// Part not found in the package
    #[error("part not found: {0}")]
    PartNotFound(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// ZIP error while writing the output archive
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for TemplateError {
    fn from(err: quick_xml::Error) -> Self {
        TemplateError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for TemplateError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        TemplateError::Xml(err.to_string())
    }
}
