//! CSV-over-object-storage targets for the Emberflow workflow engine.
//!
//! Two layers compose here:
//!
//! - [`CsvTarget`] streams a column-major [`Frame`] (or raw row tuples)
//!   to and from an object-store target, optionally framed through gzip.
//! - [`TypedCsvTarget`] adds a per-column codec mapping: each mapped
//!   column declares its on-wire dtype plus an encode/decode transform
//!   pair, and encode/decode are mutual inverses for every in-range
//!   value. Unmapped columns pass through with inferred types.
//!
//! Path resolution (remote store vs. local mirror) lives in
//! `emberflow_store`; this crate only frames bytes and shapes rows.

mod codec;
mod csv_target;
mod error;
mod frame;
mod options;

pub use codec::{
    BoolCodec, CodecError, CodecResult, ColumnCodec, ColumnTypes, FloatCodec, IntCodec, TextCodec,
    TimestampCodec, WireType,
};
pub use csv_target::{
    read_typed_csv, write_csv, write_typed_csv, CsvChunks, CsvTarget, TypedCsvTarget,
};
pub use error::{Result, TargetError};
pub use frame::{Column, Frame, Value};
pub use options::{CsvOptions, DEFAULT_CHUNK_SIZE};
