// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The flat sink (§4.10): one output file per sink, batched `batch_size`
rows at a time into Arrow IPC record batches.
*/

use std::fs::{self, File};
use std::io::BufWriter;

use arrow_ipc::writer::FileWriter;

use crate::errors::SinkError;
use crate::record::{Record, Schema};
use crate::sink::{to_arrow_schema, to_record_batch, ExistingDataPolicy, Sink, SinkOptions};

/// Writes every record to a single `.arrow` file at `options.destination`.
pub struct FlatSink {
    schema: Schema,
    options: SinkOptions,
    writer: Option<FileWriter<BufWriter<File>>>,
    buffer: Vec<Record>,
    closed: bool,
}

impl FlatSink {
    /// Opens (or prepares to lazily open) a flat sink. The underlying file
    /// isn't created until the first `add_record` call succeeds, so a
    /// profile that never sees a matching packet leaves no empty file
    /// behind.
    pub fn new(schema: Schema, options: SinkOptions) -> Result<FlatSink, SinkError> {
        if options.destination.exists() {
            match options.existing_data {
                ExistingDataPolicy::Error => {
                    return Err(SinkError::ExistingData(options.destination.clone()))
                }
                ExistingDataPolicy::DeleteMatching => {
                    fs::remove_file(&options.destination).map_err(|source| SinkError::Open {
                        path: options.destination.clone(),
                        source,
                    })?;
                }
                ExistingDataPolicy::OverwriteOrIgnore => {}
            }
        }
        Ok(FlatSink {
            schema,
            options,
            writer: None,
            buffer: Vec::new(),
            closed: false,
        })
    }

    fn open_writer(&mut self) -> Result<(), SinkError> {
        if self.writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.options.destination.parent() {
            fs::create_dir_all(parent).map_err(|source| SinkError::Open {
                path: self.options.destination.clone(),
                source,
            })?;
        }
        let file = File::create(&self.options.destination).map_err(|source| SinkError::Open {
            path: self.options.destination.clone(),
            source,
        })?;
        let arrow_schema = to_arrow_schema(&self.schema);
        let writer = FileWriter::try_new(BufWriter::new(file), &arrow_schema)
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.writer = Some(writer);
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.open_writer()?;
        let batch = to_record_batch(&self.schema, &self.buffer)?;
        self.writer
            .as_mut()
            .expect("opened above")
            .write(&batch)
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.buffer.clear();
        Ok(())
    }
}

impl Sink for FlatSink {
    fn extension(&self) -> &str {
        "arrow"
    }

    fn add_record(&mut self, row: &Record) -> Result<(), SinkError> {
        self.buffer.push(row.clone());
        if self.buffer.len() >= self.options.batch_size {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.flush_buffer()?;
        if let Some(mut writer) = self.writer.take() {
            writer.finish().map_err(|e| SinkError::Write(e.to_string()))?;
        }
        self.closed = true;
        Ok(())
    }
}

impl Drop for FlatSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldKind, FieldValue, RecordBuilderExt};
    use tempfile::tempdir;

    fn schema() -> Schema {
        Schema::new(vec![("x", FieldKind::U32), ("y", FieldKind::F64)])
    }

    fn options(dir: &std::path::Path) -> SinkOptions {
        SinkOptions {
            destination: dir.join("out.arrow"),
            batch_size: 2,
            existing_data: ExistingDataPolicy::OverwriteOrIgnore,
            compression: None,
            compression_level: None,
        }
    }

    #[test]
    fn flushes_on_batch_size_and_on_close() {
        let dir = tempdir().unwrap();
        let mut sink = FlatSink::new(schema(), options(dir.path())).unwrap();
        for i in 0..3u32 {
            let mut row = Record::new();
            row.put("x", FieldValue::U32(i));
            row.put("y", FieldValue::F64(i as f64));
            sink.add_record(&row).unwrap();
        }
        sink.close().unwrap();
        assert!(dir.path().join("out.arrow").exists());
    }

    #[test]
    fn existing_file_errors_under_error_policy() {
        let dir = tempdir().unwrap();
        let mut opts = options(dir.path());
        fs::write(&opts.destination, b"stale").unwrap();
        opts.existing_data = ExistingDataPolicy::Error;
        assert!(matches!(
            FlatSink::new(schema(), opts),
            Err(SinkError::ExistingData(_))
        ));
    }

    #[test]
    fn never_seeing_a_record_writes_no_file() {
        let dir = tempdir().unwrap();
        let mut sink = FlatSink::new(schema(), options(dir.path())).unwrap();
        sink.close().unwrap();
        assert!(!dir.path().join("out.arrow").exists());
    }
}
