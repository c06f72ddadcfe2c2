// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Dwell aggregator & sink (§4.9): groups contiguous runs of same-key
records into per-dwell sample files, alongside a packet-metadata table
and a dwell-index table.
*/

use std::collections::HashMap;

use crate::errors::SinkError;
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};
use crate::sink::flat::FlatSink;
use crate::sink::{Sink, SinkOptions};

/// One row of the dwell-index table (§4.9 step 2).
#[derive(Clone, Debug, PartialEq)]
pub struct DwellIndexRow {
    /// The dwell key for this run.
    pub local_key: String,
    /// Sample file this run's samples were written to.
    pub filename: String,
    /// Index, among records seen by this sink, of the run's first record.
    pub first_record_index: usize,
}

/// Extracts the dwell key for a record. Defaults to the `stream_id`
/// column, stringified; MikeLima's polarization split passes a different
/// function (§4.9 final paragraph).
pub type DwellKeyFn = Box<dyn Fn(&Record, usize) -> String>;

/// Default dwell key function: the record's `stream_id` field.
pub fn stream_id_key() -> DwellKeyFn {
    Box::new(|row, _record_index| match row.get("stream_id") {
        Some(FieldValue::U32(v)) => v.to_string(),
        Some(other) => format!("{other:?}"),
        None => "unknown".to_string(),
    })
}

/// A sink that groups records by dwell key into one sample file per
/// contiguous run, plus a packet-metadata table and a dwell-index table.
pub struct DwellSink {
    sample_schema: Schema,
    metadata_schema: Schema,
    options: SinkOptions,
    key_fn: DwellKeyFn,
    samples_field: (&'static str, &'static str),

    current_key: Option<String>,
    current_sample_sink: Option<FlatSink>,
    reuse_counters: HashMap<String, u64>,
    record_index: usize,

    metadata_sink: Option<FlatSink>,
    dwell_index: Vec<DwellIndexRow>,
    closed: bool,
}

impl DwellSink {
    /// Builds a dwell sink. `sample_schema` covers the `samples_i`/
    /// `samples_q` columns popped off each record; `metadata_schema`
    /// covers everything else. `samples_field` names the two sample
    /// columns to extract (`("samples_i", "samples_q")` for Juliet/Tango).
    pub fn new(
        sample_schema: Schema,
        metadata_schema: Schema,
        options: SinkOptions,
        key_fn: DwellKeyFn,
        samples_field: (&'static str, &'static str),
    ) -> DwellSink {
        DwellSink {
            sample_schema,
            metadata_schema,
            options,
            key_fn,
            samples_field,
            current_key: None,
            current_sample_sink: None,
            reuse_counters: HashMap::new(),
            record_index: 0,
            metadata_sink: None,
            dwell_index: Vec::new(),
            closed: false,
        }
    }

    /// The dwell-index rows produced so far.
    pub fn dwell_index(&self) -> &[DwellIndexRow] {
        &self.dwell_index
    }

    fn open_metadata_sink(&mut self) -> Result<&mut FlatSink, SinkError> {
        if self.metadata_sink.is_none() {
            let mut opts = self.options.clone();
            opts.destination = self.options.destination.join("packet_metadata.arrow");
            self.metadata_sink = Some(FlatSink::new(self.metadata_schema.clone(), opts)?);
        }
        Ok(self.metadata_sink.as_mut().expect("opened above"))
    }

    fn rotate(&mut self, new_key: String) -> Result<(), SinkError> {
        if let Some(mut sink) = self.current_sample_sink.take() {
            sink.close()?;
        }
        let n = self.reuse_counters.entry(new_key.clone()).or_insert(0);
        let filename = format!("{new_key}-{n}.arrow");
        *n += 1;

        let mut opts = self.options.clone();
        opts.destination = self.options.destination.join(&filename);
        self.current_sample_sink = Some(FlatSink::new(self.sample_schema.clone(), opts)?);
        self.dwell_index.push(DwellIndexRow {
            local_key: new_key.clone(),
            filename,
            first_record_index: self.record_index,
        });
        self.current_key = Some(new_key);
        Ok(())
    }
}

impl Sink for DwellSink {
    fn extension(&self) -> &str {
        "arrow"
    }

    fn add_record(&mut self, row: &Record) -> Result<(), SinkError> {
        let key = (self.key_fn)(row, self.record_index);
        if self.current_key.as_deref() != Some(key.as_str()) {
            self.rotate(key)?;
        }

        let mut metadata_row = row.clone();
        let samples_i = metadata_row.remove(self.samples_field.0);
        let samples_q = metadata_row.remove(self.samples_field.1);
        let mut sample_row = Record::new();
        if let Some(v) = samples_i {
            sample_row.put(self.samples_field.0, v);
        }
        if let Some(v) = samples_q {
            sample_row.put(self.samples_field.1, v);
        }

        self.current_sample_sink
            .as_mut()
            .expect("rotate always opens a sample sink")
            .add_record(&sample_row)?;
        self.open_metadata_sink()?.add_record(&metadata_row)?;

        self.record_index += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        if let Some(mut sink) = self.current_sample_sink.take() {
            sink.close()?;
        }
        if let Some(mut sink) = self.metadata_sink.take() {
            sink.close()?;
        }
        self.closed = true;
        Ok(())
    }
}

/// MikeLima's polarization-split dwell key (§4.9 final paragraph): each
/// record fans out into `beams` separate dwell streams, renumbered
/// `3 * record_index + polarization` so left/right/center land in
/// distinct files.
pub fn polarization_key(record_index: usize, polarization: usize) -> String {
    (3 * record_index + polarization).to_string()
}

fn pol_key_fn(polarization: usize) -> DwellKeyFn {
    Box::new(move |_row, record_index| polarization_key(record_index, polarization))
}

/// A dwell sink that fans each MikeLima packet record out into 2 or 3
/// polarization lanes (left, right, [center]; §4.9 final paragraph). Each
/// lane is its own [`DwellSink`], keyed by [`polarization_key`], writing
/// under its own subdirectory of `options.destination`.
pub struct PolarizedDwellSink {
    lanes: Vec<DwellSink>,
    beam_names: Vec<&'static str>,
}

impl PolarizedDwellSink {
    /// `metadata_schema` must still carry every per-beam sample column
    /// (`samples_i_left`, etc.); each lane strips its own pair out and
    /// discards the others before writing its metadata row.
    pub fn new(
        metadata_schema: Schema,
        options: SinkOptions,
        beam_names: Vec<&'static str>,
    ) -> PolarizedDwellSink {
        let sample_schema = Schema::new(vec![
            ("samples_i", FieldKind::I16Vec),
            ("samples_q", FieldKind::I16Vec),
        ]);
        let stripped_metadata_schema = Schema::new(
            metadata_schema
                .0
                .iter()
                .filter(|(name, _)| {
                    !beam_names
                        .iter()
                        .any(|b| *name == format!("samples_i_{b}") || *name == format!("samples_q_{b}"))
                })
                .cloned()
                .collect(),
        );

        let mut lanes = Vec::with_capacity(beam_names.len());
        for (polarization, name) in beam_names.iter().enumerate() {
            let mut lane_options = options.clone();
            lane_options.destination = options.destination.join(name);
            lanes.push(DwellSink::new(
                sample_schema.clone(),
                stripped_metadata_schema.clone(),
                lane_options,
                pol_key_fn(polarization),
                ("samples_i", "samples_q"),
            ));
        }
        PolarizedDwellSink { lanes, beam_names }
    }
}

impl Sink for PolarizedDwellSink {
    fn extension(&self) -> &str {
        "arrow"
    }

    fn add_record(&mut self, row: &Record) -> Result<(), SinkError> {
        for (polarization, name) in self.beam_names.clone().iter().enumerate() {
            let i_name = format!("samples_i_{name}");
            let q_name = format!("samples_q_{name}");
            if !row.contains_key(i_name.as_str()) {
                continue;
            }
            let mut lane_row = row.clone();
            for other in &self.beam_names {
                if other == name {
                    continue;
                }
                lane_row.remove(format!("samples_i_{other}").as_str());
                lane_row.remove(format!("samples_q_{other}").as_str());
            }
            if let Some(v) = lane_row.remove(i_name.as_str()) {
                lane_row.put("samples_i", v);
            }
            if let Some(v) = lane_row.remove(q_name.as_str()) {
                lane_row.put("samples_q", v);
            }
            self.lanes[polarization].add_record(&lane_row)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        for lane in &mut self.lanes {
            lane.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldKind;
    use tempfile::tempdir;

    fn sample_schema() -> Schema {
        Schema::new(vec![
            ("samples_i", FieldKind::I16Vec),
            ("samples_q", FieldKind::I16Vec),
        ])
    }

    fn metadata_schema() -> Schema {
        Schema::new(vec![("stream_id", FieldKind::U32)])
    }

    fn options(dir: &std::path::Path) -> SinkOptions {
        SinkOptions {
            destination: dir.to_path_buf(),
            batch_size: 8,
            existing_data: crate::sink::ExistingDataPolicy::OverwriteOrIgnore,
            compression: None,
            compression_level: None,
        }
    }

    fn row(stream_id: u32) -> Record {
        let mut r = Record::new();
        r.put("stream_id", FieldValue::U32(stream_id));
        r.put("samples_i", FieldValue::I16Vec(vec![1, 2]));
        r.put("samples_q", FieldValue::I16Vec(vec![3, 4]));
        r
    }

    #[test]
    fn p8_runs_of_a_a_b_a_a_produce_three_dwells() {
        let dir = tempdir().unwrap();
        let mut sink = DwellSink::new(
            sample_schema(),
            metadata_schema(),
            options(dir.path()),
            stream_id_key(),
            ("samples_i", "samples_q"),
        );
        for s in [1u32, 1, 2, 1, 1] {
            sink.add_record(&row(s)).unwrap();
        }
        sink.close().unwrap();

        let index = sink.dwell_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index[0].first_record_index, 0);
        assert_eq!(index[1].first_record_index, 2);
        assert_eq!(index[2].first_record_index, 3);
        assert_eq!(index[0].filename, "1-0.arrow");
        assert_eq!(index[1].filename, "2-0.arrow");
        assert_eq!(index[2].filename, "1-1.arrow");
        assert!(dir.path().join("1-0.arrow").exists());
        assert!(dir.path().join("2-0.arrow").exists());
        assert!(dir.path().join("1-1.arrow").exists());
        assert!(dir.path().join("packet_metadata.arrow").exists());
    }

    #[test]
    fn s5_two_runs_a_a_b() {
        let dir = tempdir().unwrap();
        let mut sink = DwellSink::new(
            sample_schema(),
            metadata_schema(),
            options(dir.path()),
            stream_id_key(),
            ("samples_i", "samples_q"),
        );
        for s in [1u32, 1, 2] {
            sink.add_record(&row(s)).unwrap();
        }
        sink.close().unwrap();
        let index = sink.dwell_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].first_record_index, 0);
        assert_eq!(index[1].first_record_index, 2);
    }

    #[test]
    fn polarization_key_renumbers_by_three() {
        assert_eq!(polarization_key(0, 0), "0");
        assert_eq!(polarization_key(0, 1), "1");
        assert_eq!(polarization_key(1, 0), "3");
        assert_eq!(polarization_key(1, 2), "5");
    }
}
