//! Error types for the OPC container layer.

use thiserror::Error;

/// Result type for OPC operations.
pub type Result<T> = std::result::Result<T, OpcError>;

/// Errors raised while reading, mutating, or writing an OPC package.
#[derive(Error, Debug)]
pub enum OpcError {
    #[error("invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("part not found: {0}")]
    PartNotFound(String),

    #[error("no content type declared for part: {0}")]
    ContentTypeNotFound(String),

    #[error("relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("ZIP container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for OpcError {
    fn from(err: quick_xml::Error) -> Self {
        OpcError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for OpcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OpcError::Xml(err.to_string())
    }
}
