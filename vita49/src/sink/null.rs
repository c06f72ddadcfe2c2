// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*! The null sink: accepts and discards every record. Used by tests and by
profiles that declare a record kind with no configured destination. */

use crate::errors::SinkError;
use crate::record::Record;
use crate::sink::Sink;

/// A [`Sink`] that does nothing.
#[derive(Default)]
pub struct NullSink {
    rows_seen: u64,
}

impl NullSink {
    /// Number of records passed to `add_record` so far.
    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }
}

impl Sink for NullSink {
    fn extension(&self) -> &str {
        "null"
    }

    fn add_record(&mut self, _row: &Record) -> Result<(), SinkError> {
        self.rows_seen += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, RecordBuilderExt};

    #[test]
    fn counts_records_without_storing_them() {
        let mut sink = NullSink::default();
        let mut row = Record::new();
        row.put("x", FieldValue::U32(1));
        sink.add_record(&row).unwrap();
        sink.add_record(&row).unwrap();
        assert_eq!(sink.rows_seen(), 2);
        sink.close().unwrap();
    }
}
