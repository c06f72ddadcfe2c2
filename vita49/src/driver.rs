// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Pipeline driver (§4.11): owns the frame-read/classify/associate/persist
loop that turns one capture file into a directory of columnar sinks plus
a metadata sidecar (§6). Single-threaded and cooperative (§5): the only
blocking points are stream reads and sink flushes, records are emitted
in strict stream order, and every sink opened during the run is closed
exactly once before `run` returns, on both the success and error paths.
*/

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use log::warn;

use crate::association::ContextKeyTable;
use crate::dwell::{stream_id_key, DwellSink, PolarizedDwellSink};
use crate::errors::{EngineError, SinkError};
use crate::frame::{BadPacketRecord, FrameEvent, FrameProvenance};
use crate::profile::{Profile, ProfileName};
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};
use crate::sink::flat::FlatSink;
use crate::sink::partitioned::PartitionedSink;
use crate::sink::{ExistingDataPolicy, Sink, SinkOptions};

/// Options controlling one pipeline run, mirroring the CLI flags of §6.
pub struct DriverOptions {
    /// Path to the capture file to read.
    pub input: PathBuf,
    /// Directory the run's sinks and metadata sidecar are written under.
    pub output: PathBuf,
    /// Which framing/dispatch strategy to use.
    pub profile: ProfileName,
    /// Rows buffered per sink before a batch is flushed.
    pub batch_size: usize,
    /// Behavior when a sink finds data already at its destination.
    pub existing_data: ExistingDataPolicy,
    /// Codec name passed through to sinks; the engine does not interpret it.
    pub compression: Option<String>,
    /// Compression level passed through to sinks.
    pub compression_level: Option<i32>,
    /// Tango `--clean`: excise `DEADBEEF` needles at the frame boundary.
    pub clean: bool,
    /// Tango `--partition-data`: fan signal-data out by context key.
    pub partition_data: bool,
    /// Prefix prepended to every generated context key (§4.8).
    pub partition_key_prefix: String,
    /// Context key attached to signal-data with no governing context packet.
    pub partition_orphan_key: String,
    /// Route signal-data through the dwell aggregator instead of a flat
    /// (or partitioned) sink.
    pub dwell_output: bool,
    /// MikeLima IQ type (`5` selects the 3-lane variant, §4.6).
    pub iq_type: u8,
}

impl Default for DriverOptions {
    fn default() -> DriverOptions {
        DriverOptions {
            input: PathBuf::new(),
            output: PathBuf::new(),
            profile: ProfileName::Juliet,
            batch_size: 4096,
            existing_data: ExistingDataPolicy::default(),
            compression: None,
            compression_level: None,
            clean: false,
            partition_data: false,
            partition_key_prefix: "ctx-".to_string(),
            partition_orphan_key: "ORPHAN_DATA".to_string(),
            dwell_output: false,
            iq_type: 0,
        }
    }
}

/// Per-run counters, reported in `metadata.json` (§4.11, §6).
#[derive(Default, Clone, Debug)]
pub struct DriverStats {
    /// Total bytes consumed from the input stream.
    pub bytes_read: u64,
    /// Outer frames (or, for MikeLima, messages) successfully read.
    pub frames_read: u64,
    /// Decoded records dispatched to a sink, across every kind.
    pub packets_read: u64,
    /// Malformed frames recorded to `bad_packets`.
    pub bad_packets: u64,
    /// Frames whose payload didn't match any known packet shape.
    pub unknown_packets: u64,
    /// MikeLima messages read (always equal to `frames_read` under that
    /// profile; zero otherwise).
    pub messages_read: u64,
    /// MikeLima orphan packets found before the stream's first SOM
    /// (§4.6 "Initial discovery"); zero for every other profile.
    pub orphan_count: u64,
}

fn builds_profile(options: &DriverOptions) -> Box<dyn Profile> {
    match options.profile {
        ProfileName::Juliet => Box::new(crate::profile::juliet::JulietProfile),
        ProfileName::Tango => Box::new(crate::profile::tango::TangoProfile::new(options.clean)),
        ProfileName::MikeLima => {
            Box::new(crate::profile::mikelima::MikeLimaProfile::new(options.iq_type))
        }
    }
}

/// Runs one pipeline from `options.input` to `options.output`, returning
/// the run's counters. Every sink opened along the way is closed before
/// this returns, including on an early `Err`.
pub fn run(options: &DriverOptions) -> Result<DriverStats, EngineError> {
    let profile = builds_profile(options);
    std::fs::create_dir_all(&options.output)?;

    let file = File::open(&options.input)?;
    let mut input = BufReader::new(file);
    let mut frame_reader = profile.frame_reader();

    let prefix = options.partition_key_prefix.clone();
    let key_fn: crate::association::KeyFn =
        Box::new(move |frame_index| format!("{prefix}{{stream_id}}-{frame_index}"));
    let mut context_keys = ContextKeyTable::new(key_fn, options.partition_orphan_key.clone());

    let mut registry = SinkRegistry::new(profile.as_ref(), options);
    let mut stats = DriverStats::default();
    let mut bytes_read = 0u64;
    let is_mikelima = options.profile == ProfileName::MikeLima;

    let result = (|| -> Result<(), EngineError> {
        loop {
            let event = frame_reader.next(&mut input, &mut bytes_read)?;
            for bad in frame_reader.take_pending_bad_packets() {
                record_bad_packet(&mut registry, &bad, &mut stats);
            }
            for orphan in frame_reader.take_pending_orphan_packets() {
                record_orphan_packet(&mut registry, profile.as_ref(), &orphan, &mut stats);
            }

            match event {
                FrameEvent::EndOfStream => break,
                FrameEvent::BadPacket(bad) => {
                    record_bad_packet(&mut registry, &bad, &mut stats);
                }
                FrameEvent::Frame(payload, provenance) => {
                    stats.frames_read += 1;
                    if is_mikelima {
                        stats.messages_read += 1;
                    }
                    record_framing_packet(&mut registry, &provenance);

                    match profile.classify_multi(&payload, provenance.frame_index) {
                        Ok(dispatched) => {
                            for mut item in dispatched {
                                stats.packets_read += 1;
                                if item.is_context {
                                    if let Some(stream_id) = item.stream_id {
                                        context_keys.update(stream_id, provenance.frame_index);
                                    }
                                } else if item.wants_context_key {
                                    let key = item
                                        .stream_id
                                        .map(|s| context_keys.lookup(s))
                                        .unwrap_or_else(|| options.partition_orphan_key.clone());
                                    item.record.put("context_key", FieldValue::Str(key));
                                }
                                registry.route(item.kind, &item.record);
                            }
                        }
                        Err(e) => {
                            record_unknown_packet(&mut registry, &provenance, &e, &mut stats);
                        }
                    }
                }
            }
        }
        Ok(())
    })();

    registry.close_all();
    stats.bytes_read = bytes_read;

    result?;
    crate::metadata::write(options, &stats, &registry.schemas())?;
    Ok(stats)
}

fn record_framing_packet(registry: &mut SinkRegistry, provenance: &FrameProvenance) {
    let mut row = Record::new();
    row.put("offset", FieldValue::U64(provenance.offset));
    row.put("frame_index", FieldValue::U64(provenance.frame_index as u64));
    row.put("word_count", FieldValue::U64(provenance.word_count as u64));
    registry.route("framing_packets", &row);
}

fn record_bad_packet(registry: &mut SinkRegistry, bad: &BadPacketRecord, stats: &mut DriverStats) {
    stats.bad_packets += 1;
    let preview_len = bad.bytes.len().min(64);
    let preview = bad.bytes[..preview_len]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>();
    let mut row = Record::new();
    row.put("start_bytes", FieldValue::U64(bad.start_bytes));
    row.put("byte_len", FieldValue::U64(bad.bytes.len() as u64));
    row.put("reason", FieldValue::Str(bad.reason.clone()));
    row.put("preview_hex", FieldValue::Str(preview));
    registry.route("bad_packets", &row);
}

fn record_unknown_packet(
    registry: &mut SinkRegistry,
    provenance: &FrameProvenance,
    err: &crate::errors::DecodeError,
    stats: &mut DriverStats,
) {
    stats.unknown_packets += 1;
    let (packet_type, indicators) = match err {
        crate::errors::DecodeError::UnknownPacketType {
            packet_type,
            indicators,
        } => (*packet_type, *indicators),
        _ => (0, 0),
    };
    let mut row = Record::new();
    row.put("frame_index", FieldValue::U64(provenance.frame_index as u64));
    row.put("packet_type", FieldValue::U8(packet_type));
    row.put("indicators", FieldValue::U8(indicators));
    row.put("reason", FieldValue::Str(err.to_string()));
    registry.route("unknown_packets", &row);
}

fn record_orphan_packet(
    registry: &mut SinkRegistry,
    profile: &dyn Profile,
    packet: &[u8],
    stats: &mut DriverStats,
) {
    stats.orphan_count += 1;
    match profile.classify_orphan(packet) {
        Ok(dispatched) => {
            stats.packets_read += 1;
            registry.route(dispatched.kind, &dispatched.record);
        }
        Err(e) => warn!("failed to decode MBLB orphan packet: {e}"),
    }
}

enum SinkSlot {
    Pending,
    Open(Box<dyn Sink>),
    Failed,
}

/// Owns every sink opened during a run. Sinks are opened lazily, the
/// first time a record of their kind is routed (§5); a sink that fails
/// to open, or later fails to write, is marked `Failed` and its records
/// are silently dropped from then on, without disturbing the run.
struct SinkRegistry<'a> {
    options: &'a DriverOptions,
    profile_name: ProfileName,
    schemas: HashMap<&'static str, Schema>,
    slots: HashMap<&'static str, SinkSlot>,
}

impl<'a> SinkRegistry<'a> {
    fn new(profile: &dyn Profile, options: &'a DriverOptions) -> SinkRegistry<'a> {
        let mut schemas: HashMap<&'static str, Schema> = profile.sink_schemas().into_iter().collect();
        schemas.insert("framing_packets", framing_packets_schema());
        schemas.insert("bad_packets", bad_packets_schema());
        schemas.insert("unknown_packets", unknown_packets_schema());
        let slots = schemas.keys().map(|k| (*k, SinkSlot::Pending)).collect();
        SinkRegistry {
            options,
            profile_name: profile.name(),
            schemas,
            slots,
        }
    }

    fn route(&mut self, kind: &'static str, record: &Record) {
        let schema = match self.schemas.get(kind) {
            Some(s) => s.clone(),
            None => {
                warn!("no declared schema for sink kind `{kind}`; dropping record");
                return;
            }
        };
        let slot = self.slots.entry(kind).or_insert(SinkSlot::Pending);
        if matches!(slot, SinkSlot::Pending) {
            match open_sink(kind, &schema, self.options, self.profile_name) {
                Ok(sink) => *slot = SinkSlot::Open(sink),
                Err(e) => {
                    warn!("failed to open sink `{kind}`: {e}");
                    *slot = SinkSlot::Failed;
                }
            }
        }
        if let SinkSlot::Open(sink) = slot {
            if let Err(e) = sink.add_record(record) {
                warn!("write failed for sink `{kind}`, dropping it: {e}");
                *slot = SinkSlot::Failed;
            }
        }
    }

    fn close_all(&mut self) {
        for slot in self.slots.values_mut() {
            if let SinkSlot::Open(sink) = slot {
                if let Err(e) = sink.close() {
                    warn!("failed to close sink: {e}");
                }
            }
        }
    }

    /// Declared schemas for every sink kind this profile can emit, for
    /// the metadata sidecar (§6).
    fn schemas(&self) -> Vec<(&'static str, Schema)> {
        self.schemas.clone().into_iter().collect()
    }
}

fn base_sink_options(options: &DriverOptions, destination: PathBuf) -> SinkOptions {
    SinkOptions {
        destination,
        batch_size: options.batch_size,
        existing_data: options.existing_data,
        compression: options.compression.clone(),
        compression_level: options.compression_level,
    }
}

fn split_dwell_schema(schema: &Schema, samples_field: (&str, &str)) -> (Schema, Schema) {
    let mut sample_fields = Vec::new();
    let mut meta_fields = Vec::new();
    for (name, kind) in &schema.0 {
        if *name == samples_field.0 || *name == samples_field.1 {
            sample_fields.push((*name, *kind));
        } else {
            meta_fields.push((*name, *kind));
        }
    }
    (Schema::new(sample_fields), Schema::new(meta_fields))
}

/// Opens the concrete sink for `kind` (§4.10). Signal-data (`"data"`)
/// is the only kind with more than one possible shape: flat by default,
/// dwell-aggregated under `--dwell-output`, or partitioned under
/// `--partition-data` (Tango only, §6).
fn open_sink(
    kind: &'static str,
    schema: &Schema,
    options: &DriverOptions,
    profile_name: ProfileName,
) -> Result<Box<dyn Sink>, SinkError> {
    if kind == "data" {
        if options.dwell_output {
            let (sample_schema, meta_schema) = split_dwell_schema(schema, ("samples_i", "samples_q"));
            let dest = options.output.join("data");
            let sink_options = base_sink_options(options, dest);
            return Ok(Box::new(DwellSink::new(
                sample_schema,
                meta_schema,
                sink_options,
                stream_id_key(),
                ("samples_i", "samples_q"),
            )));
        }
        if options.partition_data && profile_name == ProfileName::Tango {
            let dest = options.output.join("data");
            let sink_options = base_sink_options(options, dest);
            return Ok(Box::new(PartitionedSink::new(
                schema.clone(),
                sink_options,
                "context_key",
            )?));
        }
    }
    if options.dwell_output
        && profile_name == ProfileName::MikeLima
        && (kind == "iq0_packet_content" || kind == "iq5_packet_content")
    {
        let beam_names = if kind == "iq5_packet_content" {
            vec!["left", "right", "center"]
        } else {
            vec!["left", "right"]
        };
        let dest = options.output.join(kind);
        let sink_options = base_sink_options(options, dest);
        return Ok(Box::new(PolarizedDwellSink::new(
            schema.clone(),
            sink_options,
            beam_names,
        )));
    }
    let dest = options.output.join(format!("{kind}.arrow"));
    Ok(Box::new(FlatSink::new(schema.clone(), base_sink_options(options, dest))?))
}

fn framing_packets_schema() -> Schema {
    Schema::new(vec![
        ("offset", FieldKind::U64),
        ("frame_index", FieldKind::U64),
        ("word_count", FieldKind::U64),
    ])
}

fn bad_packets_schema() -> Schema {
    Schema::new(vec![
        ("start_bytes", FieldKind::U64),
        ("byte_len", FieldKind::U64),
        ("reason", FieldKind::Str),
        ("preview_hex", FieldKind::Str),
    ])
}

fn unknown_packets_schema() -> Schema {
    Schema::new(vec![
        ("frame_index", FieldKind::U64),
        ("packet_type", FieldKind::U8),
        ("indicators", FieldKind::U8),
        ("reason", FieldKind::Str),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn juliet_capture(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("capture.jul");
        let mut buf = Vec::new();
        // One signal-data frame, stream id 1, no samples.
        let header = 0x1000_0000u32 | 2u32;
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        let mut payload = Vec::new();
        payload.extend_from_slice(&header.to_le_bytes());
        payload.extend_from_slice(&7u32.to_le_bytes());
        let mut swapped = payload.clone();
        for chunk in swapped.chunks_exact_mut(4) {
            chunk.swap(0, 3);
            chunk.swap(1, 2);
        }
        buf.extend_from_slice(&swapped);
        // Terminating all-zero header.
        buf.extend_from_slice(&[0u8; 12]);
        std::fs::File::create(&path).unwrap().write_all(&buf).unwrap();
        path
    }

    #[test]
    fn runs_a_juliet_capture_and_reports_counters() {
        let dir = tempdir().unwrap();
        let input = juliet_capture(dir.path());
        let output = dir.path().join("out");
        let options = DriverOptions {
            input,
            output: output.clone(),
            profile: ProfileName::Juliet,
            ..DriverOptions::default()
        };
        let stats = run(&options).unwrap();
        assert_eq!(stats.frames_read, 1);
        assert_eq!(stats.packets_read, 1);
        assert_eq!(stats.unknown_packets, 0);
        assert!(output.join("metadata.json").exists());
        assert!(output.join("data.arrow").exists());
    }

    fn mblb_packet_header(packet_size: u64) -> Vec<u8> {
        let mut words = vec![0u64; 12];
        words[3] = packet_size << 32;
        let mut header = Vec::with_capacity(96);
        for w in &words {
            header.extend_from_slice(&w.to_le_bytes());
        }
        header
    }

    fn mikelima_capture(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("capture.mlb");
        let mut buf = Vec::new();

        // One orphan packet before the first SOM: IQ0 (2-beam), two
        // (I, Q) sample pairs.
        let orphan_data_len: u64 = 8;
        buf.extend_from_slice(&[0xF1, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F]);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&mblb_packet_header(orphan_data_len));
        buf.extend_from_slice(&vec![0u8; orphan_data_len as usize]);

        // One message: SOM, one SOP+payload packet, EOM.
        buf.extend_from_slice(&[0xF0, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F]);
        buf.extend_from_slice(&[0u8; 288]);

        let packet_data_len = 4 * 1 * 1280 * 2;
        buf.extend_from_slice(&[0xF1, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F]);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&mblb_packet_header(packet_data_len as u64));
        buf.extend_from_slice(&vec![0u8; packet_data_len]);

        buf.extend_from_slice(&[0xF2, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F]);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&[0u8; 22 * 8]);

        std::fs::File::create(&path).unwrap().write_all(&buf).unwrap();
        path
    }

    #[test]
    fn s4_mikelima_orphan_and_polarization_split() {
        let dir = tempdir().unwrap();
        let input = mikelima_capture(dir.path());
        let output = dir.path().join("out");
        let options = DriverOptions {
            input,
            output: output.clone(),
            profile: ProfileName::MikeLima,
            dwell_output: true,
            ..DriverOptions::default()
        };
        let stats = run(&options).unwrap();
        assert_eq!(stats.orphan_count, 1);
        assert_eq!(stats.messages_read, 1);
        assert!(stats.packets_read >= 2);
        assert!(output.join("iq0_packet_content").join("left").exists());
        assert!(output.join("iq0_packet_content").join("right").exists());
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempdir().unwrap();
        let options = DriverOptions {
            input: dir.path().join("does-not-exist"),
            output: dir.path().join("out"),
            ..DriverOptions::default()
        };
        assert!(matches!(run(&options), Err(EngineError::Io(_))));
    }
}
