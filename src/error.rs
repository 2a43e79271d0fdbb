/// Error types for the activity log
///
/// Every failure the store and the exporters can produce ends up here.
/// Callers are expected to show the `Display` text to the user; nothing
/// in this crate retries on its own.
use std::path::PathBuf;
use thiserror::Error;

/// All errors raised by project, log and export operations
#[derive(Debug, Error)]
pub enum LogError {
    /// Blank project name, or one that cannot be used as a folder name
    #[error("Invalid project name: {0:?}")]
    InvalidName(String),

    /// A required field was missing before any mutation happened
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The project (or a file it should own) does not exist
    #[error("Project '{0}' does not exist")]
    NotFound(String),

    /// The OS trash refused the project folder
    #[error("Could not move {} to the trash: {message}", .path.display())]
    TrashFailed { path: PathBuf, message: String },

    /// A record references an image that is no longer on disk.
    /// Only ever raised internally; the report renderer turns it into a placeholder.
    #[error("Image not found: {0}")]
    MissingAsset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read activity table: {0}")]
    SheetRead(#[from] calamine::XlsxError),

    #[error("Failed to write activity table: {0}")]
    SheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid config file: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;
