// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Columnar writer tier (§4.10). A [`Sink`] accepts decoded [`Record`]s
against a declared [`Schema`] and batches them into a columnar file.
*/

pub mod flat;
pub mod null;
pub mod partitioned;

use std::path::PathBuf;

use arrow_array::{
    ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    ListArray, RecordBatch, StringArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow_schema::{DataType, Field, Schema as ArrowSchema};
use std::sync::Arc;

use crate::errors::SinkError;
use crate::record::{FieldKind, FieldValue, Record, Schema};

/// What a sink does when it finds data already at its destination (§6).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ExistingDataPolicy {
    /// Delete whatever matches this run's output before writing.
    DeleteMatching,
    /// Append to, or silently ignore, whatever is already there.
    #[default]
    OverwriteOrIgnore,
    /// Refuse to run.
    Error,
}

/// Per-sink configuration, set by the driver from CLI options.
#[derive(Clone, Debug)]
pub struct SinkOptions {
    /// Directory or file path a sink writes under.
    pub destination: PathBuf,
    /// Rows buffered in memory before a batch is flushed to storage.
    pub batch_size: usize,
    /// Behavior when existing output is found at `destination`.
    pub existing_data: ExistingDataPolicy,
    /// Codec name (e.g. `"zstd"`), or `None` for uncompressed.
    pub compression: Option<String>,
    /// Compression level, meaningful only when `compression` is set.
    pub compression_level: Option<i32>,
}

/// A destination for decoded records (§4.10). Implementors own batching
/// and the on-disk columnar layout; the driver only calls `add_record`
/// and, exactly once per run, `close`.
pub trait Sink {
    /// File extension this sink's output carries (sans dot), used when
    /// deriving a default destination file name.
    fn extension(&self) -> &str;

    /// Appends one record. The sink buffers and flushes on its own
    /// schedule; callers must not assume synchronous durability.
    fn add_record(&mut self, row: &Record) -> Result<(), SinkError>;

    /// Flushes any buffered rows and releases the underlying writer.
    /// Idempotent: a second call is a no-op.
    fn close(&mut self) -> Result<(), SinkError>;
}

fn arrow_field(name: &'static str, kind: FieldKind) -> Field {
    let (data_type, nullable) = match kind {
        FieldKind::Bool => (DataType::Boolean, false),
        FieldKind::U8 => (DataType::UInt8, false),
        FieldKind::U16 => (DataType::UInt16, false),
        FieldKind::U32 => (DataType::UInt32, false),
        FieldKind::U64 => (DataType::UInt64, false),
        FieldKind::I16 => (DataType::Int16, false),
        FieldKind::I32 => (DataType::Int32, false),
        FieldKind::I64 => (DataType::Int64, false),
        FieldKind::F32 => (DataType::Float32, false),
        FieldKind::F64 => (DataType::Float64, false),
        FieldKind::Str => (DataType::Utf8, true),
        FieldKind::I16Vec => (
            DataType::List(Arc::new(Field::new("item", DataType::Int16, false))),
            false,
        ),
        FieldKind::U16Vec => (
            DataType::List(Arc::new(Field::new("item", DataType::UInt16, false))),
            false,
        ),
        FieldKind::U32Vec => (
            DataType::List(Arc::new(Field::new("item", DataType::UInt32, false))),
            false,
        ),
        FieldKind::F32Vec => (
            DataType::List(Arc::new(Field::new("item", DataType::Float32, false))),
            false,
        ),
        FieldKind::F64Vec => (
            DataType::List(Arc::new(Field::new("item", DataType::Float64, false))),
            false,
        ),
    };
    Field::new(name, data_type, nullable)
}

/// Builds the Arrow schema a sink's declared [`Schema`] maps to.
pub fn to_arrow_schema(schema: &Schema) -> ArrowSchema {
    ArrowSchema::new(
        schema
            .0
            .iter()
            .map(|(name, kind)| arrow_field(name, *kind))
            .collect::<Vec<_>>(),
    )
}

/// Converts a batch of records into one Arrow [`RecordBatch`] against
/// `schema`'s column order. A record missing a declared column, or
/// carrying a value of the wrong kind, is a schema mismatch.
pub fn to_record_batch(schema: &Schema, rows: &[Record]) -> Result<RecordBatch, SinkError> {
    let arrow_schema = Arc::new(to_arrow_schema(schema));
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.0.len());

    for (name, kind) in &schema.0 {
        let column = build_column(name, *kind, rows)?;
        columns.push(column);
    }

    RecordBatch::try_new(arrow_schema, columns)
        .map_err(|e| SinkError::SchemaMismatch(e.to_string()))
}

fn field_or_err<'a>(name: &str, rows: &'a [Record], i: usize) -> Result<&'a FieldValue, SinkError> {
    rows[i]
        .get(name)
        .ok_or_else(|| SinkError::SchemaMismatch(format!("missing column `{name}`")))
}

macro_rules! scalar_column {
    ($name:expr, $rows:expr, $variant:path, $array:ty) => {{
        let mut values = Vec::with_capacity($rows.len());
        for i in 0..$rows.len() {
            match field_or_err($name, $rows, i)? {
                $variant(v) => values.push(*v),
                other => {
                    return Err(SinkError::SchemaMismatch(format!(
                        "column `{}` expected {}, got {other:?}",
                        $name,
                        stringify!($variant)
                    )))
                }
            }
        }
        Arc::new(<$array>::from(values)) as ArrayRef
    }};
}

macro_rules! list_column {
    ($name:expr, $rows:expr, $variant:path, $array:ty) => {{
        let mut lists = Vec::with_capacity($rows.len());
        for i in 0..$rows.len() {
            match field_or_err($name, $rows, i)? {
                $variant(v) => lists.push(Some(v.iter().map(|x| Some(*x)).collect::<Vec<_>>())),
                other => {
                    return Err(SinkError::SchemaMismatch(format!(
                        "column `{}` expected {}, got {other:?}",
                        $name,
                        stringify!($variant)
                    )))
                }
            }
        }
        Arc::new(ListArray::from_iter_primitive::<
            <$array as ArrowPrimitiveHint>::Native,
            _,
            _,
        >(lists)) as ArrayRef
    }};
}

// A thin shim so `list_column!` can name the arrow-native primitive type
// for each FieldKind vector without a second macro argument list.
trait ArrowPrimitiveHint {
    type Native;
}
impl ArrowPrimitiveHint for Int16Array {
    type Native = arrow_array::types::Int16Type;
}
impl ArrowPrimitiveHint for UInt16Array {
    type Native = arrow_array::types::UInt16Type;
}
impl ArrowPrimitiveHint for UInt32Array {
    type Native = arrow_array::types::UInt32Type;
}
impl ArrowPrimitiveHint for Float32Array {
    type Native = arrow_array::types::Float32Type;
}
impl ArrowPrimitiveHint for Float64Array {
    type Native = arrow_array::types::Float64Type;
}

fn build_column(name: &str, kind: FieldKind, rows: &[Record]) -> Result<ArrayRef, SinkError> {
    Ok(match kind {
        FieldKind::Bool => scalar_column!(name, rows, FieldValue::Bool, BooleanArray),
        FieldKind::U8 => scalar_column!(name, rows, FieldValue::U8, UInt8Array),
        FieldKind::U16 => scalar_column!(name, rows, FieldValue::U16, UInt16Array),
        FieldKind::U32 => scalar_column!(name, rows, FieldValue::U32, UInt32Array),
        FieldKind::U64 => scalar_column!(name, rows, FieldValue::U64, UInt64Array),
        FieldKind::I16 => scalar_column!(name, rows, FieldValue::I16, Int16Array),
        FieldKind::I32 => scalar_column!(name, rows, FieldValue::I32, Int32Array),
        FieldKind::I64 => scalar_column!(name, rows, FieldValue::I64, Int64Array),
        FieldKind::F32 => scalar_column!(name, rows, FieldValue::F32, Float32Array),
        FieldKind::F64 => scalar_column!(name, rows, FieldValue::F64, Float64Array),
        FieldKind::Str => {
            let mut values = Vec::with_capacity(rows.len());
            for i in 0..rows.len() {
                match field_or_err(name, rows, i)? {
                    FieldValue::Str(s) => values.push(Some(s.clone())),
                    FieldValue::Null => values.push(None),
                    other => {
                        return Err(SinkError::SchemaMismatch(format!(
                            "column `{name}` expected Str, got {other:?}"
                        )))
                    }
                }
            }
            Arc::new(StringArray::from(values)) as ArrayRef
        }
        FieldKind::I16Vec => list_column!(name, rows, FieldValue::I16Vec, Int16Array),
        FieldKind::U16Vec => list_column!(name, rows, FieldValue::U16Vec, UInt16Array),
        FieldKind::U32Vec => list_column!(name, rows, FieldValue::U32Vec, UInt32Array),
        FieldKind::F32Vec => list_column!(name, rows, FieldValue::F32Vec, Float32Array),
        FieldKind::F64Vec => list_column!(name, rows, FieldValue::F64Vec, Float64Array),
    })
}
