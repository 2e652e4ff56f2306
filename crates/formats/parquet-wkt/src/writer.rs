//! Parquet writer implementation for Arrow record batches

use std::io::{self, Write as IoWrite};
use std::path::Path;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use format_shared::{SpatialFormatWriteError, SpatialFormatWriteResult};
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use tempfile::NamedTempFile;

/// Options for Parquet writing
#[derive(Debug, Clone)]
pub struct ParquetWriterOptions {
    /// Compression codec for every column (default: uncompressed)
    pub compression: Compression,
    /// Maximum rows per row group (default: None, the writer's own limit)
    pub max_row_group_size: Option<usize>,
    /// Extra key/value pairs stored in the file footer (default: none)
    pub key_value_metadata: Vec<(String, String)>,
}

impl Default for ParquetWriterOptions {
    fn default() -> Self {
        Self {
            compression: Compression::UNCOMPRESSED,
            max_row_group_size: None,
            key_value_metadata: Vec::new(),
        }
    }
}

impl ParquetWriterOptions {
    /// Create new writer options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression codec
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the maximum number of rows per row group
    #[must_use]
    pub fn with_max_row_group_size(mut self, rows: usize) -> Self {
        self.max_row_group_size = Some(rows);
        self
    }

    /// Add a key/value pair to the file footer
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_value_metadata.push((key.into(), value.into()));
        self
    }

    fn writer_properties(&self) -> WriterProperties {
        let mut builder = WriterProperties::builder().set_compression(self.compression);
        if let Some(rows) = self.max_row_group_size {
            builder = builder.set_max_row_group_size(rows);
        }
        if !self.key_value_metadata.is_empty() {
            let metadata = self
                .key_value_metadata
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
                .collect();
            builder = builder.set_key_value_metadata(Some(metadata));
        }
        builder.build()
    }
}

fn encode_error(err: ParquetError) -> SpatialFormatWriteError {
    SpatialFormatWriteError::Encode {
        message: err.to_string(),
        context: None,
    }
}

/// Write record batches with an explicit schema.
///
/// An empty batch list produces a valid file with zero rows.
///
/// # Errors
///
/// Returns an error if a batch does not match the schema or writing to the
/// output fails
pub fn write_parquet_with_schema<W: IoWrite + Send>(
    writer: W,
    schema: SchemaRef,
    batches: &[RecordBatch],
    options: &ParquetWriterOptions,
) -> SpatialFormatWriteResult<()> {
    let mut parquet_writer =
        ArrowWriter::try_new(writer, schema, Some(options.writer_properties()))
            .map_err(encode_error)?;

    for batch in batches {
        parquet_writer.write(batch).map_err(encode_error)?;
    }

    let metadata = parquet_writer.close().map_err(encode_error)?;
    debug!(
        "Wrote {} row(s) in {} row group(s)",
        metadata.num_rows,
        metadata.row_groups.len()
    );
    Ok(())
}

/// Write record batches to Parquet format, taking the schema from the first batch
///
/// # Errors
///
/// Returns an error if `batches` is empty, the batches disagree on their
/// schema, or writing to the output fails
pub fn write_parquet<W: IoWrite + Send>(
    writer: W,
    batches: &[RecordBatch],
    options: &ParquetWriterOptions,
) -> SpatialFormatWriteResult<()> {
    let Some(first) = batches.first() else {
        return Err(SpatialFormatWriteError::Encode {
            message: "No record batches to write; use write_parquet_with_schema for empty output"
                .to_string(),
            context: None,
        });
    };
    write_parquet_with_schema(writer, first.schema(), batches, options)
}

/// Write record batches to Parquet bytes
///
/// # Errors
///
/// Returns an error if Parquet serialization fails
pub fn write_parquet_to_bytes(
    batches: &[RecordBatch],
    options: &ParquetWriterOptions,
) -> SpatialFormatWriteResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_parquet(&mut buffer, batches, options)?;
    Ok(buffer)
}

/// Write record batches to a file, replacing it atomically.
///
/// The data goes to a temporary file next to `path` that is renamed into
/// place only after the footer has been written, so a failure never leaves a
/// truncated file at `path`.
///
/// # Errors
///
/// Returns an error if the destination directory is not writable or
/// Parquet serialization fails
pub fn write_parquet_file(
    path: &Path,
    schema: SchemaRef,
    batches: &[RecordBatch],
    options: &ParquetWriterOptions,
) -> SpatialFormatWriteResult<()> {
    let context = path.display().to_string();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = staging_file(directory, path).map_err(|source| SpatialFormatWriteError::Io {
        source,
        context: Some(context.clone()),
    })?;
    debug!("Staging Parquet output in {}", temp.path().display());

    write_parquet_with_schema(temp.as_file(), schema, batches, options)
        .map_err(|err| err.with_additional_context(context.clone()))?;

    temp.persist(path)
        .map_err(|err| SpatialFormatWriteError::Io {
            source: err.error,
            context: Some(context),
        })?;
    Ok(())
}

/// Temporary file next to `destination`, readable like a plain new file.
///
/// New outputs get `0o666` less the umask; an existing output keeps its mode.
#[cfg(unix)]
fn staging_file(directory: &Path, destination: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(0o666))
        .tempfile_in(directory)?;
    if let Ok(existing) = std::fs::metadata(destination) {
        temp.as_file().set_permissions(existing.permissions())?;
    }
    Ok(temp)
}

#[cfg(not(unix))]
fn staging_file(directory: &Path, _destination: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(directory)
}
