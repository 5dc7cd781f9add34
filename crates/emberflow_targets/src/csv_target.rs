//! CSV targets over object storage, with optional gzip framing and an
//! optional typed column layer.
//!
//! Compression is framed here, not in the path resolver: the resolver
//! hands out raw byte handles and this layer wraps them in gzip when the
//! target is marked compressed. On write, the gzip encoder is finished
//! (flushing its trailer) strictly before the underlying handle, so the
//! stream on disk is always a valid single-member gzip file.

use std::io::{Read, Write};
use std::sync::Arc;

use csv::{Reader, ReaderBuilder, StringRecord, WriterBuilder};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use emberflow_store::{ObjectStore, StoreConfig, StoreTarget, TargetHandle};

use crate::codec::{infer, ColumnCodec, ColumnTypes};
use crate::error::{Result, TargetError};
use crate::frame::{Column, Frame, Value};
use crate::options::CsvOptions;

/// CSV target addressed by an object-store URI.
///
/// Carries per-direction option defaults; per-call overrides win field by
/// field.
pub struct CsvTarget {
    store: StoreTarget,
    compressed: bool,
    read_options: CsvOptions,
    write_options: CsvOptions,
}

impl CsvTarget {
    pub fn new(store: StoreTarget, compressed: bool) -> Self {
        Self {
            store,
            compressed,
            read_options: CsvOptions::default(),
            write_options: CsvOptions::default(),
        }
    }

    /// Parse `uri` and build a target for it.
    pub fn from_uri(
        uri: &str,
        config: StoreConfig,
        remote: Arc<dyn ObjectStore>,
        compressed: bool,
    ) -> Result<Self> {
        Ok(Self::new(StoreTarget::from_uri(uri, config, remote)?, compressed))
    }

    pub fn with_read_options(mut self, options: CsvOptions) -> Self {
        self.read_options = options;
        self
    }

    pub fn with_write_options(mut self, options: CsvOptions) -> Self {
        self.write_options = options;
        self
    }

    pub fn store(&self) -> &StoreTarget {
        &self.store
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.store.exists()?)
    }

    /// Open the raw byte handle. Compression framing is the caller's
    /// responsibility on this path.
    pub fn open(&self, mode: &str) -> Result<TargetHandle> {
        Ok(self.store.open(mode)?)
    }

    /// Write a frame as CSV: header row of column names, then one record
    /// per row, values serialized as-is.
    pub fn write_frame(&self, frame: &Frame) -> Result<()> {
        self.write_frame_with(frame, &CsvOptions::default())
    }

    pub fn write_frame_with(&self, frame: &Frame, overrides: &CsvOptions) -> Result<()> {
        let options = self.write_options.merge(overrides);
        self.write_with(&options, |w, opts| write_csv(w, frame, opts))
    }

    /// Write arbitrary row tuples, optionally preceded by a header row.
    /// No per-column transforms apply on this path.
    pub fn write_rows(&self, rows: &[Vec<String>], header: Option<&[String]>) -> Result<()> {
        self.write_with(&self.write_options.clone(), |w, opts| {
            write_raw_rows(w, rows, header, opts)
        })
    }

    /// Read the whole target into a frame with inferred column types.
    pub fn read_frame(&self) -> Result<Frame> {
        self.read_frame_with(&CsvOptions::default())
    }

    pub fn read_frame_with(&self, overrides: &CsvOptions) -> Result<Frame> {
        let options = self.read_options.merge(overrides);
        let reader = self.byte_reader()?;
        parse_csv(reader, &ColumnTypes::new(), &options)
    }

    /// Lazy forward-only chunked read. Each chunk holds at most
    /// `chunk_size` rows and is coerced independently; the handle is
    /// consumed, so re-reading requires another call.
    pub fn read_chunks(&self) -> Result<CsvChunks> {
        self.read_chunks_with(&CsvOptions::default())
    }

    pub fn read_chunks_with(&self, overrides: &CsvOptions) -> Result<CsvChunks> {
        let options = self.read_options.merge(overrides);
        let reader = self.byte_reader()?;
        CsvChunks::new(reader, ColumnTypes::new(), &options)
    }

    fn byte_reader(&self) -> Result<Box<dyn Read>> {
        let reader = self.store.reader()?;
        if self.compressed {
            Ok(Box::new(GzDecoder::new(reader)))
        } else {
            Ok(Box::new(reader))
        }
    }

    fn write_with<F>(&self, options: &CsvOptions, serialize: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write, &CsvOptions) -> Result<()>,
    {
        let writer = self.store.writer()?;
        if self.compressed {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            serialize(&mut encoder, options)?;
            // Trailer first, then the handle; the other order produces a
            // truncated gzip stream.
            let writer = encoder.finish()?;
            writer.finish()?;
        } else {
            let mut writer = writer;
            serialize(&mut writer, options)?;
            writer.finish()?;
        }
        debug!(uri = %self.store.uri(), compressed = self.compressed, "Wrote CSV target");
        Ok(())
    }
}

/// CSV target whose columns are (de)serialized through a codec mapping.
///
/// Mapped columns are encoded before writing and parsed with their
/// declared wire type then decoded after reading; unmapped columns pass
/// through with inferred types.
pub struct TypedCsvTarget {
    inner: CsvTarget,
    types: ColumnTypes,
}

impl TypedCsvTarget {
    pub fn new(inner: CsvTarget, types: ColumnTypes) -> Self {
        Self { inner, types }
    }

    pub fn inner(&self) -> &CsvTarget {
        &self.inner
    }

    pub fn types(&self) -> &ColumnTypes {
        &self.types
    }

    pub fn exists(&self) -> Result<bool> {
        self.inner.exists()
    }

    pub fn write_typed(&self, frame: &Frame) -> Result<()> {
        self.write_typed_with(frame, &CsvOptions::default())
    }

    pub fn write_typed_with(&self, frame: &Frame, overrides: &CsvOptions) -> Result<()> {
        let options = self.inner.write_options.merge(overrides);
        self.inner
            .write_with(&options, |w, opts| write_typed_csv(w, frame, &self.types, opts))
    }

    pub fn read_typed(&self) -> Result<Frame> {
        self.read_typed_with(&CsvOptions::default())
    }

    pub fn read_typed_with(&self, overrides: &CsvOptions) -> Result<Frame> {
        let options = self.inner.read_options.merge(overrides);
        let reader = self.inner.byte_reader()?;
        read_typed_csv(reader, &self.types, &options)
    }

    /// Streaming variant of [`read_typed`](Self::read_typed); every chunk
    /// is dtype-coerced and decoded independently.
    pub fn read_typed_chunks(&self) -> Result<CsvChunks> {
        self.read_typed_chunks_with(&CsvOptions::default())
    }

    pub fn read_typed_chunks_with(&self, overrides: &CsvOptions) -> Result<CsvChunks> {
        let options = self.inner.read_options.merge(overrides);
        let reader = self.inner.byte_reader()?;
        CsvChunks::new(reader, self.types.clone(), &options)
    }

    /// Untransformed tuple writes, same as the untyped target.
    pub fn write_rows(&self, rows: &[Vec<String>], header: Option<&[String]>) -> Result<()> {
        self.inner.write_rows(rows, header)
    }
}

/// Serialize a frame as CSV onto any writer, applying each mapped
/// column's `encode` transform first.
pub fn write_typed_csv(
    writer: &mut dyn Write,
    frame: &Frame,
    types: &ColumnTypes,
    options: &CsvOptions,
) -> Result<()> {
    let encoded = transform_columns(frame.clone(), types, |codec, value| codec.encode(value))?;
    write_csv(writer, &encoded, options)
}

/// Parse CSV from any reader with each mapped column's declared wire
/// type, then apply its `decode` transform. Unmapped columns infer.
pub fn read_typed_csv<R: Read>(reader: R, types: &ColumnTypes, options: &CsvOptions) -> Result<Frame> {
    let frame = parse_csv(reader, types, options)?;
    transform_columns(frame, types, |codec, value| codec.decode(value))
}

/// Serialize a frame as CSV with no column transforms.
pub fn write_csv(writer: &mut dyn Write, frame: &Frame, options: &CsvOptions) -> Result<()> {
    let mut w = WriterBuilder::new()
        .delimiter(options.delimiter_or_default())
        .from_writer(writer);
    if options.has_header_or_default() {
        w.write_record(frame.column_names())?;
    }
    for row in 0..frame.num_rows() {
        w.write_record(frame.columns().iter().map(|c| c.values[row].render()))?;
    }
    w.flush()?;
    Ok(())
}

fn write_raw_rows(
    writer: &mut dyn Write,
    rows: &[Vec<String>],
    header: Option<&[String]>,
    options: &CsvOptions,
) -> Result<()> {
    let mut w = WriterBuilder::new()
        .delimiter(options.delimiter_or_default())
        .from_writer(writer);
    if let Some(header) = header {
        w.write_record(header)?;
    }
    for row in rows {
        w.write_record(row)?;
    }
    w.flush()?;
    Ok(())
}

fn parse_csv<R: Read>(raw: R, types: &ColumnTypes, options: &CsvOptions) -> Result<Frame> {
    let (mut reader, header) = open_csv_reader(raw, options)?;
    let rows = read_rows(&mut reader)?;
    let names = column_names(header, rows.first());
    build_frame(&names, &rows, types)
}

/// Lazy, finite, forward-only sequence of dtype-coerced frame chunks.
///
/// Not restartable: the underlying handle is consumed as chunks are
/// yielded.
pub struct CsvChunks {
    reader: Reader<Box<dyn Read>>,
    header: Option<Vec<String>>,
    types: ColumnTypes,
    chunk_size: usize,
    done: bool,
}

impl CsvChunks {
    fn new(raw: Box<dyn Read>, types: ColumnTypes, options: &CsvOptions) -> Result<Self> {
        let (reader, header) = open_csv_reader(raw, options)?;
        Ok(Self {
            reader,
            header,
            types,
            chunk_size: options.chunk_size_or_default(),
            done: false,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn read_chunk(&mut self) -> Result<Option<Frame>> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut record = StringRecord::new();
        while rows.len() < self.chunk_size {
            if !self.reader.read_record(&mut record)? {
                break;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        if rows.is_empty() {
            return Ok(None);
        }
        let names = column_names(self.header.clone(), rows.first());
        let frame = build_frame(&names, &rows, &self.types)?;
        transform_columns(frame, &self.types, |codec, value| codec.decode(value)).map(Some)
    }
}

impl Iterator for CsvChunks {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn open_csv_reader<R: Read>(raw: R, options: &CsvOptions) -> Result<(Reader<R>, Option<Vec<String>>)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(options.delimiter_or_default())
        .from_reader(raw);
    let header = if options.has_header_or_default() {
        let mut record = StringRecord::new();
        if reader.read_record(&mut record)? {
            Some(record.iter().map(str::to_string).collect())
        } else {
            // Empty input still declares an (empty) header.
            Some(Vec::new())
        }
    } else {
        None
    };
    Ok((reader, header))
}

fn read_rows<R: Read>(reader: &mut Reader<R>) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn column_names(header: Option<Vec<String>>, first_row: Option<&Vec<String>>) -> Vec<String> {
    match header {
        Some(names) => names,
        // Headerless CSV names its columns by position.
        None => (0..first_row.map_or(0, |r| r.len()))
            .map(|i| i.to_string())
            .collect(),
    }
}

fn build_frame(names: &[String], rows: &[Vec<String>], types: &ColumnTypes) -> Result<Frame> {
    let mut columns = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let codec = types.get(name);
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            let value = match codec {
                Some(codec) => codec.wire_type().coerce(name, cell)?,
                None => infer(cell),
            };
            values.push(value);
        }
        columns.push(Column::new(name.clone(), values));
    }
    Frame::try_new(columns)
}

fn transform_columns<F>(frame: Frame, types: &ColumnTypes, apply: F) -> Result<Frame>
where
    F: Fn(&dyn ColumnCodec, Value) -> crate::codec::CodecResult<Value>,
{
    let columns = frame
        .into_columns()
        .into_iter()
        .map(|column| match types.get(&column.name) {
            Some(codec) => {
                let Column { name, values } = column;
                let values = values
                    .into_iter()
                    .map(|value| {
                        apply(codec.as_ref(), value).map_err(|e| TargetError::codec(&name, e))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Column::new(name, values))
            }
            None => Ok(column),
        })
        .collect::<Result<Vec<_>>>()?;
    Frame::try_new(columns)
}
