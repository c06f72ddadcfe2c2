// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
MikeLima baseband (MBLB) decoders, §4.6 "MikeLima baseband (MBLB)".

MBLB frames carry a non-VITA-49 three-lane message family: a start-of-message
(SOM) header, zero or more per-lane data packets, and an end-of-message (EOM)
trailer. Unlike every other decoder in this crate, MBLB payloads are read as
64-bit native words rather than 32-bit VRT words.
*/

use crate::errors::DecodeError;
use crate::packet::Words;
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

/// Clock rate underlying every MBLB time-domain field. Source unknown;
/// preserved as found.
const CLOCKS_PER_US: f64 = 160.0;

fn bits(word: u64, mask: u64, shift: u32) -> u64 {
    (word & mask) >> shift
}

/// Declared schema for the `mblb_som` sink.
pub fn som_schema() -> Schema {
    Schema::new(vec![
        ("lane1_id", FieldKind::U8),
        ("lane2_id", FieldKind::U8),
        ("lane3_id", FieldKind::U8),
        ("ci_number", FieldKind::U32),
        ("message_number", FieldKind::U16),
        ("si_number", FieldKind::U8),
        ("path_id", FieldKind::U8),
        ("path_width", FieldKind::U8),
        ("subpath_id", FieldKind::U8),
        ("subpath_width", FieldKind::U8),
        ("be", FieldKind::U8),
        ("beam_select", FieldKind::U8),
        ("afs_mode", FieldKind::U8),
        ("sched_num", FieldKind::U16),
        ("si_in_sched_num", FieldKind::U16),
        ("high_gain", FieldKind::U32),
        ("event_start_time_us", FieldKind::F64),
        ("time_since_epoch_us", FieldKind::F64),
        ("bti_length", FieldKind::F64),
        ("dwell", FieldKind::F64),
        ("freq_ghz", FieldKind::F64),
    ])
}

/// Decodes a MikeLima start-of-message (SOM) packet.
///
/// `timestamp_us` is the frame-level epoch timestamp carried alongside this
/// message (§4.5); it's added to `event_start_time_us` to produce
/// `time_since_epoch_us`.
pub fn decode_som(words: &Words, timestamp_us: f64) -> Result<Record, DecodeError> {
    words.require64(16)?;

    let w0 = words.u64_at(0);
    let w1 = words.u64_at(1);
    let w2 = words.u64_at(2);
    let w3 = words.u64_at(3);
    let w9 = words.u64_at(9);
    let w12 = words.u64_at(12);
    let w13 = words.u64_at(13);
    let w14 = words.u64_at(14);
    let w15 = words.u64_at(15);

    let lane1_id = bits(w0, 0xFF00_0000_0000_0000, 56) as u8;
    let lane2_id = bits(w1, 0xFF00_0000_0000_0000, 56) as u8;
    let lane3_id = bits(w2, 0xFF00_0000_0000_0000, 56) as u8;
    let ci_number = (w0 & 0x0000_0000_FFFF_FFFF) as u32;
    let message_number = bits(w3, 0x0000_0000_0000_FF00, 8) as u16;
    let si_number = (w3 & 0x0000_0000_0000_00FF) as u8;

    let path_id = bits(w9, 0x00FF_0000_0000_0000, 48) as u8;
    let path_width = bits(w9, 0x0000_FF00_0000_0000, 40) as u8;
    let subpath_id = bits(w9, 0x0000_00F0_0000_0000, 36) as u8;
    let subpath_width = bits(w9, 0x0000_000F_0000_0000, 32) as u8;
    let be = bits(w9, 0x0000_0000_8000_0000, 31) as u8;
    let beam_select = bits(w9, 0x0000_0000_6000_0000, 29) as u8;
    let afs_mode = bits(w9, 0x0000_0000_1E00_0000, 25) as u8;

    let sched_num = bits(w12, 0x0000_0000_FFFF_0000, 16) as u16;
    let si_in_sched_num = (w12 & 0x0000_0000_0000_FFFF) as u16;
    let high_gain = bits(w12, 0xFFFF_FFFF_0000_0000, 32) as u32;

    // Source swaps the two halves of word 13 before dividing, rather than
    // combining them as a plain little-endian 64-bit value.
    let back_half = (w13 & 0x0000_0000_FFFF_FFFF) << 32;
    let front_half = (w13 & 0xFFFF_FFFF_0000_0000) >> 32;
    let event_start_time_us = (back_half + front_half) as f64 / CLOCKS_PER_US;
    let time_since_epoch_us = event_start_time_us + timestamp_us;

    let bti_length = bits(w14, 0xFFFF_FFFF_0000_0000, 32) as f64 / CLOCKS_PER_US;
    let dwell = (w14 & 0x0000_0000_FFFF_FFFF) as f64 / CLOCKS_PER_US;

    let freq_ghz = freq_ghz(w15);

    let mut record = Record::new();
    record
        .put("lane1_id", FieldValue::U8(lane1_id))
        .put("lane2_id", FieldValue::U8(lane2_id))
        .put("lane3_id", FieldValue::U8(lane3_id))
        .put("ci_number", FieldValue::U32(ci_number))
        .put("message_number", FieldValue::U16(message_number))
        .put("si_number", FieldValue::U8(si_number))
        .put("path_id", FieldValue::U8(path_id))
        .put("path_width", FieldValue::U8(path_width))
        .put("subpath_id", FieldValue::U8(subpath_id))
        .put("subpath_width", FieldValue::U8(subpath_width))
        .put("be", FieldValue::U8(be))
        .put("beam_select", FieldValue::U8(beam_select))
        .put("afs_mode", FieldValue::U8(afs_mode))
        .put("sched_num", FieldValue::U16(sched_num))
        .put("si_in_sched_num", FieldValue::U16(si_in_sched_num))
        .put("high_gain", FieldValue::U32(high_gain))
        .put(
            "event_start_time_us",
            FieldValue::F64(event_start_time_us),
        )
        .put("time_since_epoch_us", FieldValue::F64(time_since_epoch_us))
        .put("bti_length", FieldValue::F64(bti_length))
        .put("dwell", FieldValue::F64(dwell))
        .put("freq_ghz", FieldValue::F64(freq_ghz));
    Ok(record)
}

/// Derives `freq_GHz` from SOM word 15: a coarse/fine tune split over a
/// 320 MHz step. Preserved verbatim from its source derivation.
fn freq_ghz(word15: u64) -> f64 {
    const FS_MHZ: f64 = 2560.0 * 16.0;
    const FINE_TUNE_LSB_MHZ: f64 = 0.625;
    const CT_STEP_MHZ: f64 = FS_MHZ / 128.0; // 320 MHz

    let ct = (word15 & 0x0000_0000_FFFF_FFFF) as i64;
    let ft = bits(word15, 0xFFFF_FFFF_0000_0000, 32) as i64;

    let fine_tune_mhz = ft as f64 * FINE_TUNE_LSB_MHZ;

    let ctf = 2i64.pow(7) - ct;
    let cal_ct = (ctf + 1) / 3; // integer division, matches source
    let coarse_tune_mhz = cal_ct as f64 * CT_STEP_MHZ * 3.0 - CT_STEP_MHZ;

    (coarse_tune_mhz + fine_tune_mhz) / 1000.0
}

fn header_fields() -> Vec<(&'static str, FieldKind)> {
    vec![
        ("packet_number", FieldKind::U16),
        ("mode_tag", FieldKind::U16),
        ("ci_number", FieldKind::U32),
        ("packet_size", FieldKind::U32),
        ("data_fmt", FieldKind::U8),
        ("event_id", FieldKind::U8),
        ("message_number", FieldKind::U8),
        ("sub_cci_number", FieldKind::U8),
        ("bti_number", FieldKind::U16),
        ("rf", FieldKind::U16),
        ("cagc", FieldKind::U8),
        ("rx_beam_id", FieldKind::U8),
        ("rx_config", FieldKind::U8),
        ("channelizer_chan", FieldKind::U8),
        ("dbf", FieldKind::U8),
        ("routing_index", FieldKind::U8),
        ("lane1_id", FieldKind::U8),
        ("lane2_id", FieldKind::U8),
        ("lane3_id", FieldKind::U8),
        ("path_id", FieldKind::U8),
        ("path_width", FieldKind::U8),
        ("subpath_id", FieldKind::U8),
        ("subpath_width", FieldKind::U8),
        ("dv", FieldKind::U8),
        ("rs", FieldKind::U8),
        ("valid_channels_beams", FieldKind::U8),
        ("channels_beams_per_subpath", FieldKind::U8),
    ]
}

/// Declared schema for the `iq0_packet_content` sink (2-beam, left/right;
/// `iq_type` typed `uint8`, §6/§C.6).
pub fn iq0_packet_schema() -> Schema {
    let mut fields = header_fields();
    fields.push(("iq_type", FieldKind::U8));
    fields.push(("samples_i_left", FieldKind::I16Vec));
    fields.push(("samples_q_left", FieldKind::I16Vec));
    fields.push(("samples_i_right", FieldKind::I16Vec));
    fields.push(("samples_q_right", FieldKind::I16Vec));
    Schema::new(fields)
}

/// Declared schema for the `iq5_packet_content` sink (3-beam, left/right/
/// center; `iq_type` typed `float32`, §6/§C.6).
pub fn iq5_packet_schema() -> Schema {
    let mut fields = header_fields();
    fields.push(("iq_type", FieldKind::F32));
    fields.push(("samples_i_left", FieldKind::I16Vec));
    fields.push(("samples_q_left", FieldKind::I16Vec));
    fields.push(("samples_i_right", FieldKind::I16Vec));
    fields.push(("samples_q_right", FieldKind::I16Vec));
    fields.push(("samples_i_center", FieldKind::I16Vec));
    fields.push(("samples_q_center", FieldKind::I16Vec));
    Schema::new(fields)
}

/// Beam names a packet's sample block is deinterleaved into: `left`/
/// `right` for the 2-beam variant, plus `center` for the 3-beam one.
pub fn beam_names(beam_count: usize) -> &'static [&'static str] {
    if beam_count >= 3 {
        &["left", "right", "center"]
    } else {
        &["left", "right"]
    }
}

/// Deinterleaves raw packet sample bytes into per-beam `(I, Q)` vectors.
/// Consecutive little-endian `i16` `(I, Q)` pairs round-robin across
/// `beam_count` beams in declaration order (left, right[, center]).
fn decode_samples(data: &[u8], beam_count: usize) -> Vec<(Vec<i16>, Vec<i16>)> {
    let beam_count = beam_count.max(1);
    let mut beams = vec![(Vec::new(), Vec::new()); beam_count];
    for (idx, pair) in data.chunks_exact(4).enumerate() {
        let i = i16::from_le_bytes([pair[0], pair[1]]);
        let q = i16::from_le_bytes([pair[2], pair[3]]);
        let beam = idx % beam_count;
        beams[beam].0.push(i);
        beams[beam].1.push(q);
    }
    beams
}

/// Decodes a MikeLima per-lane data packet's header fields only. Used to
/// read `rx_config` before a packet's sample-block length is known
/// (§4.6), and as the base of [`decode_packet`].
pub fn decode_packet_header(words: &Words) -> Result<Record, DecodeError> {
    words.require64(12)?;

    let w0 = words.u64_at(0);
    let w3 = words.u64_at(3);
    let w6 = words.u64_at(6);
    let w9 = words.u64_at(9);
    let w10 = words.u64_at(10);
    let w11 = words.u64_at(11);

    let packet_number = bits(w0, 0xFFFF_0000_0000_0000, 48) as u16;
    let mode_tag = bits(w0, 0x0000_FFFF_0000_0000, 32) as u16;
    let ci_number = (w0 & 0x0000_0000_FFFF_FFFF) as u32;

    let packet_size = bits(w3, 0xFFFF_FFFF_0000_0000, 32) as u32;
    let data_fmt = bits(w3, 0x0000_0000_FF00_0000, 24) as u8;
    let event_id = bits(w3, 0x0000_0000_00FF_0000, 16) as u8;
    let message_number = bits(w3, 0x0000_0000_0000_FF00, 8) as u8;
    let sub_cci_number = (w3 & 0x0000_0000_0000_00FF) as u8;

    let bti_number = bits(w6, 0xFFFF_0000_0000_0000, 48) as u16;
    let rf = bits(w6, 0x0000_FFC0_0000_0000, 38) as u16;
    let cagc = bits(w6, 0x0000_003F_0000_0000, 28) as u8;
    let rx_beam_id = bits(w6, 0x0000_0000_FF00_0000, 24) as u8;
    let rx_config = bits(w6, 0x0000_0000_00FC_0000, 18) as u8;
    let channelizer_chan = bits(w6, 0x0000_0000_0003_F000, 12) as u8;
    let dbf = bits(w6, 0x0000_0000_0000_0F00, 8) as u8;
    let routing_index = (w6 & 0x0000_0000_0000_00FF) as u8;

    let lane1_id = bits(w9, 0xFF00_0000_0000_0000, 56) as u8;
    let lane2_id = bits(w10, 0xFF00_0000_0000_0000, 56) as u8;
    let lane3_id = bits(w11, 0xFF00_0000_0000_0000, 56) as u8;

    let path_id = bits(w9, 0x00FF_0000_0000_0000, 48) as u8;
    let path_width = bits(w9, 0x0000_FF00_0000_0000, 40) as u8;
    let subpath_id = bits(w9, 0x0000_00F0_0000_0000, 36) as u8;
    let subpath_width = bits(w9, 0x0000_000F_0000_0000, 32) as u8;
    let dv = bits(w9, 0x0000_0000_8000_0000, 31) as u8;
    let rs = bits(w9, 0x0000_0000_6000_0000, 30) as u8;
    let valid_channels_beams = bits(w9, 0x0000_0000_0000_FF00, 8) as u8;
    let channels_beams_per_subpath = (w9 & 0x0000_0000_0000_00FF) as u8;

    let mut record = Record::new();
    record
        .put("packet_number", FieldValue::U16(packet_number))
        .put("mode_tag", FieldValue::U16(mode_tag))
        .put("ci_number", FieldValue::U32(ci_number))
        .put("packet_size", FieldValue::U32(packet_size))
        .put("data_fmt", FieldValue::U8(data_fmt))
        .put("event_id", FieldValue::U8(event_id))
        .put("message_number", FieldValue::U8(message_number))
        .put("sub_cci_number", FieldValue::U8(sub_cci_number))
        .put("bti_number", FieldValue::U16(bti_number))
        .put("rf", FieldValue::U16(rf))
        .put("cagc", FieldValue::U8(cagc))
        .put("rx_beam_id", FieldValue::U8(rx_beam_id))
        .put("rx_config", FieldValue::U8(rx_config))
        .put("channelizer_chan", FieldValue::U8(channelizer_chan))
        .put("dbf", FieldValue::U8(dbf))
        .put("routing_index", FieldValue::U8(routing_index))
        .put("lane1_id", FieldValue::U8(lane1_id))
        .put("lane2_id", FieldValue::U8(lane2_id))
        .put("lane3_id", FieldValue::U8(lane3_id))
        .put("path_id", FieldValue::U8(path_id))
        .put("path_width", FieldValue::U8(path_width))
        .put("subpath_id", FieldValue::U8(subpath_id))
        .put("subpath_width", FieldValue::U8(subpath_width))
        .put("dv", FieldValue::U8(dv))
        .put("rs", FieldValue::U8(rs))
        .put(
            "valid_channels_beams",
            FieldValue::U8(valid_channels_beams),
        )
        .put(
            "channels_beams_per_subpath",
            FieldValue::U8(channels_beams_per_subpath),
        );
    Ok(record)
}

/// Decodes a MikeLima per-lane data packet: header fields plus its
/// sample block, deinterleaved by beam (`iq0_packet_content`/
/// `iq5_packet_content`, §6). `iq_type` is stored verbatim, typed
/// `uint8` for the 2-beam variant and `float32` for the 3-beam one
/// (§C.6).
pub fn decode_packet(
    words: &Words,
    samples: &[u8],
    beam_count: usize,
    iq_type: u8,
) -> Result<Record, DecodeError> {
    let mut record = decode_packet_header(words)?;
    let beams = decode_samples(samples, beam_count);
    for (name, (i, q)) in beam_names(beam_count).iter().zip(beams) {
        record.put(&format!("samples_i_{name}"), FieldValue::I16Vec(i));
        record.put(&format!("samples_q_{name}"), FieldValue::I16Vec(q));
    }
    if beam_count >= 3 {
        record.put("iq_type", FieldValue::F32(iq_type as f32));
    } else {
        record.put("iq_type", FieldValue::U8(iq_type));
    }
    Ok(record)
}

/// Declared schema for the `mblb_eom` sink.
pub fn eom_schema() -> Schema {
    Schema::new(vec![
        ("packet_count", FieldKind::U16),
        ("ci_number", FieldKind::U32),
        ("error_status", FieldKind::U64),
        ("message_number", FieldKind::U8),
        ("sub_cci_number", FieldKind::U8),
        ("crc", FieldKind::U64),
        ("lane1_id", FieldKind::U8),
        ("lane2_id", FieldKind::U8),
        ("lane3_id", FieldKind::U8),
        ("path_id", FieldKind::U8),
        ("path_width", FieldKind::U8),
        ("subpath_id", FieldKind::U8),
        ("subpath_width", FieldKind::U8),
    ])
}

/// Decodes a MikeLima end-of-message (EOM) trailer.
pub fn decode_eom(words: &Words) -> Result<Record, DecodeError> {
    words.require64(12)?;

    let w0 = words.u64_at(0);
    let w1 = words.u64_at(1);
    let w2 = words.u64_at(2);
    let w9 = words.u64_at(9);
    let w10 = words.u64_at(10);
    let w11 = words.u64_at(11);

    let packet_count = bits(w0, 0xFFFF_0000_0000_0000, 48) as u16;
    let ci_number = (w0 & 0x0000_0000_FFFF_FFFF) as u32;

    let error_status = bits(w1, 0xFFFF_FFFF_FFFF_0000, 16);
    let message_number = bits(w1, 0x0000_0000_0000_FF00, 8) as u8;
    let sub_cci_number = (w1 & 0x0000_0000_0000_00FF) as u8;

    let crc = w2;

    let lane1_id = bits(w9, 0xFF00_0000_0000_0000, 56) as u8;
    let lane2_id = bits(w10, 0xFF00_0000_0000_0000, 56) as u8;
    let lane3_id = bits(w11, 0xFF00_0000_0000_0000, 56) as u8;

    let path_id = bits(w9, 0x00FF_0000_0000_0000, 48) as u8;
    let path_width = bits(w9, 0x0000_FF00_0000_0000, 40) as u8;
    let subpath_id = bits(w9, 0x0000_00F0_0000_0000, 36) as u8;
    let subpath_width = bits(w9, 0x0000_000F_0000_0000, 32) as u8;

    let mut record = Record::new();
    record
        .put("packet_count", FieldValue::U16(packet_count))
        .put("ci_number", FieldValue::U32(ci_number))
        .put("error_status", FieldValue::U64(error_status))
        .put("message_number", FieldValue::U8(message_number))
        .put("sub_cci_number", FieldValue::U8(sub_cci_number))
        .put("crc", FieldValue::U64(crc))
        .put("lane1_id", FieldValue::U8(lane1_id))
        .put("lane2_id", FieldValue::U8(lane2_id))
        .put("lane3_id", FieldValue::U8(lane3_id))
        .put("path_id", FieldValue::U8(path_id))
        .put("path_width", FieldValue::U8(path_width))
        .put("subpath_id", FieldValue::U8(subpath_id))
        .put("subpath_width", FieldValue::U8(subpath_width));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn som_payload() -> Vec<u8> {
        let mut words = vec![0u64; 16];
        words[0] = (0xABu64 << 56) | 0x0000_0042; // lane1_id=0xAB, ci_number=0x42
        words[1] = 0xCDu64 << 56; // lane2_id=0xCD
        words[2] = 0xEFu64 << 56; // lane3_id=0xEF
        words[3] = (7u64 << 8) | 3u64; // message_number=7, si_number=3
        words[9] = (1u64 << 48) // path_id
            | (2u64 << 40) // path_width
            | (3u64 << 36) // subpath_id
            | (4u64 << 32) // subpath_width
            | (1u64 << 31) // be
            | (2u64 << 29) // beam_select
            | (5u64 << 25); // afs_mode
        words[12] = (9u64 << 32) | (10u64 << 16) | 11u64; // high_gain, sched_num, si_in_sched_num
                                                           // word13: front half (top 32 bits) = 100, back half (low 32 bits) = 0
                                                           // EventStartTime_us = (back<<32 + front)/160 = 100/160
        words[13] = 100u64 << 32;
        words[14] = (3200u64 << 32) | 1600u64; // bti_length=20, dwell=10
        words[15] = 64u64; // ct=64, ft=0

        let mut buf = Vec::with_capacity(words.len() * 8);
        for w in &words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        buf
    }

    #[test]
    fn som_decodes_lane_ids_and_counters() {
        let buf = som_payload();
        let words = Words::new(&buf);
        let record = decode_som(&words, 0.0).unwrap();
        assert_eq!(record["lane1_id"], FieldValue::U8(0xAB));
        assert_eq!(record["lane2_id"], FieldValue::U8(0xCD));
        assert_eq!(record["lane3_id"], FieldValue::U8(0xEF));
        assert_eq!(record["ci_number"], FieldValue::U32(0x42));
        assert_eq!(record["message_number"], FieldValue::U16(7));
        assert_eq!(record["si_number"], FieldValue::U8(3));
        assert_eq!(record["path_id"], FieldValue::U8(1));
        assert_eq!(record["beam_select"], FieldValue::U8(2));
        assert_eq!(record["afs_mode"], FieldValue::U8(5));
    }

    #[test]
    fn som_swaps_word13_halves_for_event_start_time() {
        let buf = som_payload();
        let words = Words::new(&buf);
        let record = decode_som(&words, 1000.0).unwrap();
        match record["event_start_time_us"] {
            FieldValue::F64(v) => assert!((v - 100.0 / CLOCKS_PER_US).abs() < 1e-9),
            _ => panic!("expected F64"),
        }
        match record["time_since_epoch_us"] {
            FieldValue::F64(v) => assert!((v - (100.0 / CLOCKS_PER_US + 1000.0)).abs() < 1e-9),
            _ => panic!("expected F64"),
        }
    }

    #[test]
    fn som_derives_bti_length_and_dwell() {
        let buf = som_payload();
        let words = Words::new(&buf);
        let record = decode_som(&words, 0.0).unwrap();
        assert_eq!(record["bti_length"], FieldValue::F64(20.0));
        assert_eq!(record["dwell"], FieldValue::F64(10.0));
    }

    #[test]
    fn som_freq_ghz_matches_coarse_fine_formula() {
        // ct=64, ft=0 -> ctf=64, cal_ct=(64+1)/3=21, coarse=21*320*3-320=19840
        let expected = (21.0 * 320.0 * 3.0 - 320.0) / 1000.0;
        assert!((freq_ghz(64u64) - expected).abs() < 1e-9);
    }

    #[test]
    fn som_rejects_short_payload() {
        let buf = vec![0u8; 8 * 10];
        let words = Words::new(&buf);
        assert!(matches!(
            decode_som(&words, 0.0),
            Err(DecodeError::PayloadTooShort { .. })
        ));
    }

    fn packet_payload() -> Vec<u8> {
        let mut words = vec![0u64; 12];
        words[0] = (5u64 << 48) | (6u64 << 32) | 77u64; // packet_number, mode_tag, ci_number
        words[3] = (1000u64 << 32) | (2u64 << 24) | (3u64 << 16) | (4u64 << 8) | 5u64;
        words[6] = (11u64 << 48)
            | (22u64 << 38)
            | (33u64 << 28)
            | (44u64 << 24)
            | (5u64 << 18)
            | (6u64 << 12)
            | (7u64 << 8)
            | 8u64;
        words[9] = (0xAAu64 << 56) | (1u64 << 48) | (2u64 << 40) | (3u64 << 36) | (4u64 << 32);
        words[10] = 0xBBu64 << 56;
        words[11] = 0xCCu64 << 56;

        let mut buf = Vec::with_capacity(words.len() * 8);
        for w in &words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        buf
    }

    #[test]
    fn packet_decodes_per_lane_ids_from_distinct_words() {
        let buf = packet_payload();
        let words = Words::new(&buf);
        let record = decode_packet_header(&words).unwrap();
        assert_eq!(record["lane1_id"], FieldValue::U8(0xAA));
        assert_eq!(record["lane2_id"], FieldValue::U8(0xBB));
        assert_eq!(record["lane3_id"], FieldValue::U8(0xCC));
        assert_eq!(record["packet_number"], FieldValue::U16(5));
        assert_eq!(record["mode_tag"], FieldValue::U16(6));
        assert_eq!(record["ci_number"], FieldValue::U32(77));
        assert_eq!(record["packet_size"], FieldValue::U32(1000));
    }

    #[test]
    fn packet_deinterleaves_samples_by_beam() {
        let buf = packet_payload();
        let words = Words::new(&buf);
        // Four (I, Q) pairs round-robin across two beams: left gets
        // indices 0, 2; right gets 1, 3.
        let mut samples = Vec::new();
        for (i, q) in [(1i16, -1i16), (2, -2), (3, -3), (4, -4)] {
            samples.extend_from_slice(&i.to_le_bytes());
            samples.extend_from_slice(&q.to_le_bytes());
        }
        let record = decode_packet(&words, &samples, 2, 0).unwrap();
        assert_eq!(record["samples_i_left"], FieldValue::I16Vec(vec![1, 3]));
        assert_eq!(record["samples_q_left"], FieldValue::I16Vec(vec![-1, -3]));
        assert_eq!(record["samples_i_right"], FieldValue::I16Vec(vec![2, 4]));
        assert_eq!(record["samples_q_right"], FieldValue::I16Vec(vec![-2, -4]));
        assert_eq!(record["iq_type"], FieldValue::U8(0));
    }

    #[test]
    fn packet_types_iq_type_as_float_for_three_beams() {
        let buf = packet_payload();
        let words = Words::new(&buf);
        let record = decode_packet(&words, &[], 3, 5).unwrap();
        assert_eq!(record["iq_type"], FieldValue::F32(5.0));
        assert!(record.contains_key("samples_i_center"));
    }

    fn eom_payload() -> Vec<u8> {
        let mut words = vec![0u64; 12];
        words[0] = (42u64 << 48) | 99u64;
        words[1] = (123_456u64 << 16) | (9u64 << 8) | 1u64;
        words[2] = 0xDEAD_BEEF_CAFE_0000u64;
        words[9] = 0x11u64 << 56;
        words[10] = 0x22u64 << 56;
        words[11] = 0x33u64 << 56;

        let mut buf = Vec::with_capacity(words.len() * 8);
        for w in &words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        buf
    }

    #[test]
    fn eom_decodes_counters_and_crc() {
        let buf = eom_payload();
        let words = Words::new(&buf);
        let record = decode_eom(&words).unwrap();
        assert_eq!(record["packet_count"], FieldValue::U16(42));
        assert_eq!(record["ci_number"], FieldValue::U32(99));
        assert_eq!(record["error_status"], FieldValue::U64(123_456));
        assert_eq!(record["message_number"], FieldValue::U8(9));
        assert_eq!(record["sub_cci_number"], FieldValue::U8(1));
        assert_eq!(record["crc"], FieldValue::U64(0xDEAD_BEEF_CAFE_0000));
        assert_eq!(record["lane1_id"], FieldValue::U8(0x11));
        assert_eq!(record["lane2_id"], FieldValue::U8(0x22));
        assert_eq!(record["lane3_id"], FieldValue::U8(0x33));
    }
}
