use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// The archive or its body part cannot be read or parsed.
    InvalidDocx(String),
    /// A relationship id referenced from the body has no usable part behind it.
    MissingRelationship(String),
    /// A single coordinate could not be rewritten.
    Mutation(String),
    Recognition(String),
    Image(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidDocx(msg) => write!(f, "invalid DOCX: {msg}"),
            Error::MissingRelationship(id) => write!(f, "missing relationship: {id}"),
            Error::Mutation(msg) => write!(f, "cannot rewrite document: {msg}"),
            Error::Recognition(msg) => write!(f, "text recognition failed: {msg}"),
            Error::Image(msg) => write!(f, "image error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::InvalidDocx(format!("malformed XML: {e}"))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Error::Io(io),
            other => Error::InvalidDocx(other.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}
