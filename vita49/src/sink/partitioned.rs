// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The partitioned sink (§4.10): fans records out into one file per distinct
value of a configured partition column (the context key, by default)
inside a dataset directory.
*/

use std::collections::HashMap;
use std::fs;

use crate::errors::SinkError;
use crate::record::{FieldValue, Record, Schema};
use crate::sink::flat::FlatSink;
use crate::sink::{ExistingDataPolicy, Sink, SinkOptions};

/// Writes each record into the flat file for its partition value, opening
/// new partitions lazily.
pub struct PartitionedSink {
    schema: Schema,
    options: SinkOptions,
    partition_column: &'static str,
    partitions: HashMap<String, FlatSink>,
    closed: bool,
}

fn partition_value(row: &Record, column: &str) -> Result<String, SinkError> {
    match row.get(column) {
        Some(FieldValue::Str(s)) => Ok(s.clone()),
        Some(FieldValue::U32(v)) => Ok(v.to_string()),
        Some(FieldValue::U64(v)) => Ok(v.to_string()),
        Some(other) => Ok(format!("{other:?}")),
        None => Err(SinkError::SchemaMismatch(format!(
            "partition column `{column}` missing from record"
        ))),
    }
}

impl PartitionedSink {
    /// Opens a partitioned sink rooted at `options.destination`, a
    /// directory, fanning out on `partition_column` (typically
    /// `context_key`, per §3).
    pub fn new(
        schema: Schema,
        options: SinkOptions,
        partition_column: &'static str,
    ) -> Result<PartitionedSink, SinkError> {
        if options.destination.exists() && options.existing_data == ExistingDataPolicy::Error {
            return Err(SinkError::ExistingData(options.destination.clone()));
        }
        if options.existing_data == ExistingDataPolicy::DeleteMatching
            && options.destination.exists()
        {
            fs::remove_dir_all(&options.destination).map_err(|source| SinkError::Open {
                path: options.destination.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&options.destination).map_err(|source| SinkError::Open {
            path: options.destination.clone(),
            source,
        })?;
        Ok(PartitionedSink {
            schema,
            options,
            partition_column,
            partitions: HashMap::new(),
            closed: false,
        })
    }

    fn partition_sink(&mut self, key: &str) -> Result<&mut FlatSink, SinkError> {
        if !self.partitions.contains_key(key) {
            let mut part_options = self.options.clone();
            part_options.destination = self.options.destination.join(format!("{key}.arrow"));
            let sink = FlatSink::new(self.schema.clone(), part_options)?;
            self.partitions.insert(key.to_string(), sink);
        }
        Ok(self.partitions.get_mut(key).expect("inserted above"))
    }
}

impl Sink for PartitionedSink {
    fn extension(&self) -> &str {
        "arrow"
    }

    fn add_record(&mut self, row: &Record) -> Result<(), SinkError> {
        let key = partition_value(row, self.partition_column)?;
        self.partition_sink(&key)?.add_record(row)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        for sink in self.partitions.values_mut() {
            sink.close()?;
        }
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldKind, RecordBuilderExt};
    use tempfile::tempdir;

    fn schema() -> Schema {
        Schema::new(vec![
            ("context_key", FieldKind::Str),
            ("x", FieldKind::U32),
        ])
    }

    fn options(dir: &std::path::Path) -> SinkOptions {
        SinkOptions {
            destination: dir.to_path_buf(),
            batch_size: 4,
            existing_data: ExistingDataPolicy::OverwriteOrIgnore,
            compression: None,
            compression_level: None,
        }
    }

    #[test]
    fn fans_out_into_one_file_per_key() {
        let dir = tempdir().unwrap();
        let mut sink = PartitionedSink::new(schema(), options(dir.path()), "context_key").unwrap();
        for (key, x) in [("a", 1u32), ("b", 2), ("a", 3)] {
            let mut row = Record::new();
            row.put("context_key", FieldValue::Str(key.to_string()));
            row.put("x", FieldValue::U32(x));
            sink.add_record(&row).unwrap();
        }
        sink.close().unwrap();
        assert!(dir.path().join("a.arrow").exists());
        assert!(dir.path().join("b.arrow").exists());
    }

    #[test]
    fn missing_partition_column_is_a_schema_mismatch() {
        let dir = tempdir().unwrap();
        let mut sink = PartitionedSink::new(schema(), options(dir.path()), "context_key").unwrap();
        let mut row = Record::new();
        row.put("x", FieldValue::U32(1));
        assert!(matches!(
            sink.add_record(&row),
            Err(SinkError::SchemaMismatch(_))
        ));
    }
}
