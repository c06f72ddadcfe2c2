// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Run metadata sidecar (§6): `metadata.json`, written once a run's sinks
have all been closed. Records the engine name/version, the options the
run was invoked with, its counters, and the declared schema of every
sink kind the profile could have emitted.
*/

use std::fs;

use serde::Serialize;

use crate::driver::{DriverOptions, DriverStats};
use crate::errors::EngineError;
use crate::record::{FieldKind, Schema};

#[derive(Serialize)]
struct RunOptions {
    input: String,
    output: String,
    profile: &'static str,
    batch_size: usize,
    existing_data: &'static str,
    compression: Option<String>,
    compression_level: Option<i32>,
    clean: bool,
    partition_data: bool,
    partition_key_prefix: String,
    partition_orphan_key: String,
    dwell_output: bool,
}

#[derive(Serialize)]
struct SinkSchema {
    kind: &'static str,
    columns: Vec<SinkColumn>,
}

#[derive(Serialize)]
struct SinkColumn {
    name: &'static str,
    kind: &'static str,
}

#[derive(Serialize)]
struct RunMetadata {
    name: &'static str,
    version: &'static str,
    options: RunOptions,
    bytes_read: u64,
    frames_read: u64,
    packets_read: u64,
    bad_packets: u64,
    unknown_packets: u64,
    messages_read: u64,
    orphan_count: u64,
    sinks: Vec<SinkSchema>,
}

fn existing_data_name(policy: crate::sink::ExistingDataPolicy) -> &'static str {
    match policy {
        crate::sink::ExistingDataPolicy::DeleteMatching => "delete_matching",
        crate::sink::ExistingDataPolicy::OverwriteOrIgnore => "overwrite_or_ignore",
        crate::sink::ExistingDataPolicy::Error => "error",
    }
}

fn field_kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool => "bool",
        FieldKind::U8 => "u8",
        FieldKind::U16 => "u16",
        FieldKind::U32 => "u32",
        FieldKind::U64 => "u64",
        FieldKind::I16 => "i16",
        FieldKind::I32 => "i32",
        FieldKind::I64 => "i64",
        FieldKind::F32 => "f32",
        FieldKind::F64 => "f64",
        FieldKind::Str => "str",
        FieldKind::I16Vec => "i16vec",
        FieldKind::U16Vec => "u16vec",
        FieldKind::U32Vec => "u32vec",
        FieldKind::F32Vec => "f32vec",
        FieldKind::F64Vec => "f64vec",
    }
}

fn schema_to_columns(schema: &Schema) -> Vec<SinkColumn> {
    schema
        .0
        .iter()
        .map(|(name, kind)| SinkColumn {
            name,
            kind: field_kind_name(*kind),
        })
        .collect()
}

/// Writes `metadata.json` under `options.output`. Called once, after
/// every sink has been closed (§4.11).
pub(crate) fn write(
    options: &DriverOptions,
    stats: &DriverStats,
    sink_schemas: &[(&'static str, Schema)],
) -> Result<(), EngineError> {
    let mut sinks: Vec<SinkSchema> = sink_schemas
        .iter()
        .map(|(kind, schema)| SinkSchema {
            kind,
            columns: schema_to_columns(schema),
        })
        .collect();
    sinks.sort_by_key(|s| s.kind);

    let metadata = RunMetadata {
        name: "vita49",
        version: env!("CARGO_PKG_VERSION"),
        options: RunOptions {
            input: options.input.display().to_string(),
            output: options.output.display().to_string(),
            profile: options.profile.as_str(),
            batch_size: options.batch_size,
            existing_data: existing_data_name(options.existing_data),
            compression: options.compression.clone(),
            compression_level: options.compression_level,
            clean: options.clean,
            partition_data: options.partition_data,
            partition_key_prefix: options.partition_key_prefix.clone(),
            partition_orphan_key: options.partition_orphan_key.clone(),
            dwell_output: options.dwell_output,
        },
        bytes_read: stats.bytes_read,
        frames_read: stats.frames_read,
        packets_read: stats.packets_read,
        bad_packets: stats.bad_packets,
        unknown_packets: stats.unknown_packets,
        messages_read: stats.messages_read,
        orphan_count: stats.orphan_count,
        sinks,
    };

    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| EngineError::Sink(crate::errors::SinkError::Write(e.to_string())))?;
    let path = options.output.join("metadata.json");
    fs::write(&path, json).map_err(EngineError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_a_json_sidecar_with_counters_and_sink_schemas() {
        let dir = tempdir().unwrap();
        let options = DriverOptions {
            input: dir.path().join("in.jul"),
            output: dir.path().to_path_buf(),
            ..DriverOptions::default()
        };
        let stats = DriverStats {
            bytes_read: 100,
            frames_read: 3,
            packets_read: 3,
            bad_packets: 0,
            unknown_packets: 0,
            messages_read: 0,
            orphan_count: 0,
        };
        let schemas = vec![(
            "data",
            Schema::new(vec![("stream_id", FieldKind::U32)]),
        )];
        write(&options, &stats, &schemas).unwrap();

        let contents = fs::read_to_string(dir.path().join("metadata.json")).unwrap();
        assert!(contents.contains("\"bytes_read\": 100"));
        assert!(contents.contains("\"profile\": \"juliet\""));
        assert!(contents.contains("\"stream_id\""));
    }
}
