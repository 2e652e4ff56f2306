//! Plain Parquet writer for tables whose geometry has already been
//! serialized to WKT text.
//!
//! Files are written uncompressed by default so that any Parquet reader can
//! open them without codec support.

pub mod writer;

pub use writer::{
    ParquetWriterOptions, write_parquet, write_parquet_file, write_parquet_to_bytes,
    write_parquet_with_schema,
};
