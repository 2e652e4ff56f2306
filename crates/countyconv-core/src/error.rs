//! Error types for county conversion.
//!
//! Format crates report [`SpatialFormatReadError`] / [`SpatialFormatWriteError`];
//! this module lifts them into a single [`ConvertError`] that carries the
//! dataset path and offers user-facing messages and recovery hints.

use std::io::ErrorKind;
use std::path::PathBuf;

use format_shared::{SpatialFormatReadError, SpatialFormatWriteError};
use thiserror::Error;

/// Main error type for conversions.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// I/O errors (file read/write, path issues, permissions)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Archive, shapefile or WKT parsing and encoding errors
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Coordinate reference system errors
    #[error(transparent)]
    Crs(#[from] CrsError),

    /// Invalid options
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Errors from dependencies without a dedicated variant
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// I/O related errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {format} file '{path}': {source}")]
    Read {
        /// The format being read (e.g. "shapefile archive")
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write to a file
    #[error("Failed to write {format} file '{path}': {source}")]
    Write {
        /// The format being written
        format: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File was not found
    #[error("File not found: '{path}'")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
    },

    /// Permission was denied
    #[error("Permission denied for '{path}'")]
    PermissionDenied {
        /// The path with permission issues
        path: PathBuf,
    },
}

/// Format parsing and encoding errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The input archive or one of its members could not be decoded
    #[error("Failed to decode {format} '{path}': {message}")]
    Decode {
        /// The format being decoded
        format: String,
        /// The dataset path
        path: PathBuf,
        /// Description of the problem, including the position when known
        message: String,
    },

    /// A geometry could not be serialized or parsed
    #[error("Invalid geometry{}: {message}", feature.map(|f| format!(" (feature {f})")).unwrap_or_default())]
    InvalidGeometry {
        /// Description of the geometry problem
        message: String,
        /// Zero-based row index, when known
        feature: Option<usize>,
    },

    /// The output table could not be encoded
    #[error("Failed to encode {format}: {message}")]
    Encode {
        /// The output format
        format: String,
        /// Description of the problem
        message: String,
    },
}

/// Coordinate reference system errors.
#[derive(Debug, Error)]
pub enum CrsError {
    /// The dataset has no CRS, so its coordinates cannot be interpreted
    #[error("Dataset '{path}' has no coordinate reference system")]
    Missing {
        /// The dataset path
        path: PathBuf,
    },

    /// The CRS was read but has no known EPSG code or projection definition
    #[error("Unsupported coordinate reference system: {crs}")]
    Unsupported {
        /// Display form of the CRS
        crs: String,
    },

    /// Transforming a coordinate failed
    #[error("Failed to reproject feature {feature} from {from} to {to}: {message}")]
    Transform {
        /// Zero-based row index
        feature: usize,
        /// Source CRS identifier
        from: String,
        /// Target CRS identifier
        to: String,
        /// Message reported by the projection library
        message: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Type alias for Results using `ConvertError`.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Io(e) => e.user_message(),
            Self::Format(e) => e.to_string(),
            Self::Crs(e) => format!("Projection error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Io(e) => e.recovery_suggestion(),
            Self::Format(e) => e.recovery_suggestion(),
            Self::Crs(e) => e.recovery_suggestion(),
            Self::Config(_) | Self::Other(_) => None,
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { format, path, .. } => {
                format!("Failed to read {} file: {}", format, path.display())
            },
            Self::Write { format, path, .. } => {
                format!("Failed to write {} file: {}", format, path.display())
            },
            Self::FileNotFound { path } => format!("File not found: {}", path.display()),
            Self::PermissionDenied { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::FileNotFound { .. } => Some(
                "Place the county archive in the working directory and run again.".to_string(),
            ),
            Self::PermissionDenied { .. } => {
                Some("Check file permissions and ensure you have access.".to_string())
            },
            Self::Write { .. } => {
                Some("Make sure the output directory exists and is writable.".to_string())
            },
            Self::Read { .. } => None,
        }
    }
}

impl FormatError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Decode { .. } => Some(
                "Check that the file is a zip archive holding .shp, .shx, .dbf and .prj members."
                    .to_string(),
            ),
            Self::InvalidGeometry { .. } => {
                Some("Validate geometries using a GIS tool before converting.".to_string())
            },
            Self::Encode { .. } => None,
        }
    }
}

impl CrsError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Missing { .. } => {
                Some("Add the dataset's .prj member to the archive.".to_string())
            },
            Self::Unsupported { .. } => Some(
                "Re-export the dataset with a .prj that names an EPSG authority.".to_string(),
            ),
            Self::Transform { .. } => None,
        }
    }
}

/// Lifts a format crate read error into a [`ConvertError`] for `path`.
pub(crate) fn read_error(
    format: &str,
    path: impl Into<PathBuf>,
    err: SpatialFormatReadError,
) -> ConvertError {
    let path = path.into();
    match err {
        SpatialFormatReadError::Io { source, .. } => match source.kind() {
            ErrorKind::NotFound => IoError::FileNotFound { path }.into(),
            ErrorKind::PermissionDenied => IoError::PermissionDenied { path }.into(),
            _ => IoError::Read {
                format: format.to_string(),
                path,
                source: Box::new(source),
            }
            .into(),
        },
        other => FormatError::Decode {
            format: format.to_string(),
            path,
            message: other.to_string(),
        }
        .into(),
    }
}

/// Lifts a format crate write error into a [`ConvertError`] for `path`.
pub(crate) fn write_error(
    format: &str,
    path: impl Into<PathBuf>,
    err: SpatialFormatWriteError,
) -> ConvertError {
    let path = path.into();
    match err {
        SpatialFormatWriteError::Io { source, .. } => match source.kind() {
            ErrorKind::PermissionDenied => IoError::PermissionDenied { path }.into(),
            _ => IoError::Write {
                format: format.to_string(),
                path,
                source: Box::new(source),
            }
            .into(),
        },
        SpatialFormatWriteError::Encode { message, .. } => FormatError::Encode {
            format: format.to_string(),
            message,
        }
        .into(),
    }
}
