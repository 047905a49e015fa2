use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AcrError>;

#[derive(Debug, Error)]
pub enum AcrError {
    #[error("`{}` is not an OLE compound document", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to open `{}`: {source}", path.display())]
    FailedToOpen { path: PathBuf, source: io::Error },

    #[error("an I/O error occurred while reading stream `{name}`: {source}")]
    StreamRead { name: String, source: io::Error },

    #[error("property set stream is malformed: {message}")]
    MalformedPropertySet { message: String },

    #[error("failed to decode: {message}")]
    Decode { message: String },
}
