//! Error and position types shared by the format crates.
//!
//! Format crates (`shapefile-zip`, `parquet-wkt`) report failures through the
//! types in this crate so the core can wrap them without depending on the
//! individual decoder or encoder libraries.

use std::error::Error as StdError;
use std::fmt;

/// A position within a shapefile dataset.
///
/// Record numbers are 1-based to match what GIS tools display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Archive member the position refers to (e.g. `tl_2019_us_county.dbf`)
    pub member: Option<String>,
    /// Record number within the member (1-based)
    pub record: Option<u64>,
    /// Attribute field name
    pub field: Option<String>,
    /// Byte offset from the start of the member
    pub byte_offset: Option<u64>,
}

impl SourcePosition {
    /// Position pointing at a record of an archive member.
    #[must_use]
    pub fn record(member: impl Into<String>, record: u64) -> Self {
        Self {
            member: Some(member.into()),
            record: Some(record),
            ..Self::default()
        }
    }

    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.member.is_none()
            && self.record.is_none()
            && self.field.is_none()
            && self.byte_offset.is_none()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(member) = &self.member {
            parts.push(format!("member {member}"));
        }
        if let Some(record) = self.record {
            parts.push(format!("record {record}"));
        }
        if let Some(field) = &self.field {
            parts.push(format!("field {field}"));
        }
        if let Some(byte) = self.byte_offset {
            parts.push(format!("byte {byte}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors that can occur when reading a spatial dataset.
#[derive(Debug)]
pub enum SpatialFormatReadError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// The container (zip archive) could not be opened or is missing members.
    Archive {
        /// Human readable description of the failure.
        message: String,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Decoding failed for the input source.
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// The attribute schema could not be mapped to Arrow.
    Schema {
        /// Human readable description of the failure.
        message: String,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Other error type not classified above.
    Other {
        /// Human readable description of the failure.
        message: String,
    },
}

impl SpatialFormatReadError {
    fn fmt_context(context: Option<&str>) -> String {
        context
            .map(|c| format!(" while reading {c}"))
            .unwrap_or_default()
    }

    fn fmt_position(position: Option<&SourcePosition>) -> String {
        position.map(|pos| format!(" at {pos}")).unwrap_or_default()
    }

    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            SpatialFormatReadError::Io {
                context: existing, ..
            }
            | SpatialFormatReadError::Archive {
                context: existing, ..
            }
            | SpatialFormatReadError::Parse {
                context: existing, ..
            }
            | SpatialFormatReadError::Schema {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
            SpatialFormatReadError::Other { message } => {
                message.push_str(" (");
                message.push_str(&context);
                message.push(')');
            },
        }
        self
    }
}

impl fmt::Display for SpatialFormatReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialFormatReadError::Io { source, context } => {
                write!(
                    f,
                    "I/O error{}: {source}",
                    Self::fmt_context(context.as_deref())
                )
            },
            SpatialFormatReadError::Archive { message, context } => write!(
                f,
                "Archive error{}: {message}",
                Self::fmt_context(context.as_deref())
            ),
            SpatialFormatReadError::Parse {
                message,
                position,
                context,
            } => write!(
                f,
                "Parse error{}{}: {message}",
                Self::fmt_context(context.as_deref()),
                Self::fmt_position(position.as_ref())
            ),
            SpatialFormatReadError::Schema { message, context } => write!(
                f,
                "Schema error{}: {message}",
                Self::fmt_context(context.as_deref())
            ),
            SpatialFormatReadError::Other { message } => f.write_str(message),
        }
    }
}

impl StdError for SpatialFormatReadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SpatialFormatReadError::Io { source, .. } => Some(source),
            SpatialFormatReadError::Archive { .. }
            | SpatialFormatReadError::Parse { .. }
            | SpatialFormatReadError::Schema { .. }
            | SpatialFormatReadError::Other { .. } => None,
        }
    }
}

impl From<std::io::Error> for SpatialFormatReadError {
    fn from(source: std::io::Error) -> Self {
        SpatialFormatReadError::Io {
            source,
            context: None,
        }
    }
}

/// Errors that can occur when writing a columnar output file.
#[derive(Debug)]
pub enum SpatialFormatWriteError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being written.
        context: Option<String>,
    },
    /// The encoder rejected the data.
    Encode {
        /// Human readable description of the failure.
        message: String,
        /// Optional context describing what was being written.
        context: Option<String>,
    },
}

impl SpatialFormatWriteError {
    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            SpatialFormatWriteError::Io {
                context: existing, ..
            }
            | SpatialFormatWriteError::Encode {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
        }
        self
    }
}

impl fmt::Display for SpatialFormatWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = |c: &Option<String>| {
            c.as_deref()
                .map(|c| format!(" while writing {c}"))
                .unwrap_or_default()
        };
        match self {
            SpatialFormatWriteError::Io { source, context: c } => {
                write!(f, "I/O error{}: {source}", context(c))
            },
            SpatialFormatWriteError::Encode {
                message,
                context: c,
            } => write!(f, "Encode error{}: {message}", context(c)),
        }
    }
}

impl StdError for SpatialFormatWriteError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SpatialFormatWriteError::Io { source, .. } => Some(source),
            SpatialFormatWriteError::Encode { .. } => None,
        }
    }
}

impl From<std::io::Error> for SpatialFormatWriteError {
    fn from(source: std::io::Error) -> Self {
        SpatialFormatWriteError::Io {
            source,
            context: None,
        }
    }
}

/// Result type alias that uses [`SpatialFormatReadError`].
pub type SpatialFormatResult<T> = Result<T, SpatialFormatReadError>;

/// Result type alias that uses [`SpatialFormatWriteError`].
pub type SpatialFormatWriteResult<T> = Result<T, SpatialFormatWriteError>;
