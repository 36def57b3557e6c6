use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Pack file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid magic string in header")]
    InvalidMagic,

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid entry count: {0}")]
    NegativeEntryCount(i32),

    #[error("Duplicate entry ({0})")]
    DuplicateEntry(String),

    #[error("Entry name is not valid UTF-8")]
    InvalidName,

    #[error("Invalid record for entry {name}: {reason}")]
    InvalidRecord { name: String, reason: String },

    #[error("Corrupt pack file: {0}")]
    Corrupt(String),

    #[error("No data found when trying to write file {0}")]
    MissingContent(String),

    #[error("Content region exceeds format limits at entry {0}")]
    ContentOverflow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to move temporary file into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PackError {
    /// True for errors raised while decoding the header or table.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PackError::InvalidMagic
                | PackError::UnsupportedVersion(_)
                | PackError::NegativeEntryCount(_)
                | PackError::DuplicateEntry(_)
                | PackError::InvalidName
                | PackError::InvalidRecord { .. }
                | PackError::Corrupt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PackError>;
