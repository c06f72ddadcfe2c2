// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The record type: the flat mapping from named field to typed scalar or
vector that every decoder emits (§3 "Record") and every sink consumes.
*/

use std::collections::BTreeMap;

/// A single field value. Covers every scalar/vector type any decoder in
/// this crate produces.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// Boolean.
    Bool(bool),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// 32-bit IEEE-754 float.
    F32(f32),
    /// 64-bit IEEE-754 float.
    F64(f64),
    /// UTF-8 string.
    Str(String),
    /// A vector of signed 16-bit samples (I or Q rail).
    I16Vec(Vec<i16>),
    /// A vector of unsigned 16-bit values (e.g. per-record GPS status words).
    U16Vec(Vec<u16>),
    /// A vector of unsigned 32-bit values (e.g. per-slot buffer counters).
    U32Vec(Vec<u32>),
    /// A vector of 32-bit floats (e.g. per-record GPS velocity/attitude).
    F32Vec(Vec<f32>),
    /// A vector of 64-bit floats (e.g. per-record GPS lat/lon/alt).
    F64Vec(Vec<f64>),
    /// Absent value for a nullable column.
    Null,
}

/// The kind of a field, independent of any particular value. Used to
/// declare a sink's columnar schema (§4.10).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// See [`FieldValue::Bool`].
    Bool,
    /// See [`FieldValue::U8`].
    U8,
    /// See [`FieldValue::U16`].
    U16,
    /// See [`FieldValue::U32`].
    U32,
    /// See [`FieldValue::U64`].
    U64,
    /// See [`FieldValue::I16`].
    I16,
    /// See [`FieldValue::I32`].
    I32,
    /// See [`FieldValue::I64`].
    I64,
    /// See [`FieldValue::F32`].
    F32,
    /// See [`FieldValue::F64`].
    F64,
    /// See [`FieldValue::Str`].
    Str,
    /// See [`FieldValue::I16Vec`].
    I16Vec,
    /// See [`FieldValue::U16Vec`].
    U16Vec,
    /// See [`FieldValue::U32Vec`].
    U32Vec,
    /// See [`FieldValue::F32Vec`].
    F32Vec,
    /// See [`FieldValue::F64Vec`].
    F64Vec,
}

/// A flat mapping from field name to value: the output of a successful
/// decode, and the unit of work a [`crate::sink::Sink`] consumes.
pub type Record = BTreeMap<String, FieldValue>;

/// An ordered column-name/kind declaration. Column order here is the
/// column order written to the backing columnar file.
#[derive(Clone, Debug)]
pub struct Schema(pub Vec<(&'static str, FieldKind)>);

impl Schema {
    /// Declares a new schema from an ordered list of (name, kind) pairs.
    pub fn new(fields: Vec<(&'static str, FieldKind)>) -> Schema {
        Schema(fields)
    }

    /// Column names, in declared order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(n, _)| *n)
    }
}

/// Convenience builders used by decoders to assemble a [`Record`].
pub trait RecordBuilderExt {
    /// Inserts a field, overwriting any existing value under that name.
    fn put(&mut self, name: &str, value: FieldValue) -> &mut Self;
}

impl RecordBuilderExt for Record {
    fn put(&mut self, name: &str, value: FieldValue) -> &mut Self {
        self.insert(name.to_string(), value);
        self
    }
}
