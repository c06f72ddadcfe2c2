// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Context decoder (Tango), §4.7 "Context decoder (Tango)".

The 64-bit combine fields here (bandwidth, IF/RF reference frequency,
sample rate, pulse width, PRI, duration) are packed with the *first*
word as the least-significant half, the reverse of the convention used
by the Juliet decoders and [`crate::bitfields::combine`]. This is
preserved exactly from the source rather than normalized; see
`DESIGN.md`.
*/

use crate::bitfields;
use crate::errors::DecodeError;
use crate::packet::{VrtPrologue, Words};
use crate::packet_header::{Tsf, Tsi};
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

const CIF0_EXPECTED: u32 = 0b0011_1000_1010_0100_0000_0000_0000_1110;
const CIF1_EXPECTED: u32 = 0b1101_0011_0000_0000_0000_0000_0001_0000;
const CIF2_EXPECTED: u32 = 0b0000_0000_0000_0000_0000_0001_1000_0000;
const CIF3_EXPECTED: u32 = 0b0000_0001_1100_0000_0000_0000_0000_0000;

/// Declared schema for the `context` sink.
pub fn schema() -> Schema {
    Schema::new(vec![
        ("stream_id", FieldKind::U32),
        ("time", FieldKind::F64),
        ("cif0", FieldKind::U32),
        ("cif1", FieldKind::U32),
        ("cif2", FieldKind::U32),
        ("cif3", FieldKind::U32),
        ("bandwidth", FieldKind::F64),
        ("if_reference_freq", FieldKind::F64),
        ("rf_reference_freq", FieldKind::F64),
        ("gain1", FieldKind::F32),
        ("gain2", FieldKind::F32),
        ("sample_rate", FieldKind::F64),
        ("temperature", FieldKind::F32),
        ("phase_offset", FieldKind::F32),
        ("ellipticity", FieldKind::F32),
        ("tilt", FieldKind::F32),
        ("array_size", FieldKind::U32),
        ("header_size", FieldKind::U32),
        ("num_words_per_rec", FieldKind::U32),
        ("num_records", FieldKind::U32),
        ("ecef_0", FieldKind::F64),
        ("ecef_1", FieldKind::F64),
        ("ecef_2", FieldKind::F64),
        ("azimuthal_angle_0", FieldKind::F32),
        ("elevation_angle_0", FieldKind::F32),
        ("steering_mode_0", FieldKind::U32),
        ("reserved_0", FieldKind::U32),
        ("reserved_1", FieldKind::U32),
        ("beam_width_vert", FieldKind::F32),
        ("beam_width_horiz", FieldKind::F32),
        ("range", FieldKind::F32),
        ("health_status", FieldKind::U32),
        ("mode_id", FieldKind::U32),
        ("event_id", FieldKind::U32),
        ("pulse_width", FieldKind::F64),
        ("pri", FieldKind::F64),
        ("duration", FieldKind::F64),
    ])
}

fn low_i16(word: u32) -> i16 {
    (word & 0xFFFF) as u16 as i16
}

fn high_i16(word: u32) -> i16 {
    (word >> 16) as u16 as i16
}

/// Decodes a Tango context packet.
pub fn decode(words: &Words) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    words.require32(46)?;

    let class_id = prologue
        .class_id
        .as_ref()
        .ok_or_else(|| DecodeError::SchemaAssertion("context packet missing class id".into()))?;
    if class_id.information_class_code() != 1 || class_id.packet_class_code() != 2 {
        return Err(DecodeError::SchemaAssertion(format!(
            "class id mismatch: information_class_code={}, packet_class_code={}",
            class_id.information_class_code(),
            class_id.packet_class_code()
        )));
    }
    if prologue.header.tsi() != Tsi::Gps || prologue.header.tsf() != Tsf::RealTimePs {
        return Err(DecodeError::SchemaAssertion(
            "context packet timestamp mode mismatch".into(),
        ));
    }

    let cif0 = words.u32_at(7);
    let cif1 = words.u32_at(8);
    let cif2 = words.u32_at(9);
    let cif3 = words.u32_at(10);
    for (name, got, want) in [
        ("cif0", cif0, CIF0_EXPECTED),
        ("cif1", cif1, CIF1_EXPECTED),
        ("cif2", cif2, CIF2_EXPECTED),
        ("cif3", cif3, CIF3_EXPECTED),
    ] {
        if got != want {
            return Err(DecodeError::SchemaAssertion(format!(
                "{name} mismatch: expected {want:#010x}, got {got:#010x}"
            )));
        }
    }

    // words[11],[12] etc. are read by the source as a little-endian int64
    // view, making the *first* word the low half; bitfields::bandwidth
    // expects (high, low), so the word order is swapped on each call.
    let bandwidth = bitfields::bandwidth(words.u32_at(12), words.u32_at(11));
    let if_reference_freq = bitfields::frequency(words.u32_at(14), words.u32_at(13));
    let rf_reference_freq = bitfields::frequency(words.u32_at(16), words.u32_at(15));

    let gain_word = words.u32_at(17);
    let gain1 = low_i16(gain_word) as f64 * 2f64.powi(-7);
    let gain2 = high_i16(gain_word) as f64 * 2f64.powi(-7);

    let sample_rate = bitfields::bandwidth(words.u32_at(19), words.u32_at(18));

    let temperature = low_i16(words.u32_at(20)) as f64 * 2f64.powi(-6);
    let phase_offset = low_i16(words.u32_at(21)) as f64 * 2f64.powi(-7);

    let ellip_tilt_word = words.u32_at(22);
    let ellipticity = low_i16(ellip_tilt_word) as f64 * 2f64.powi(-13);
    let tilt = high_i16(ellip_tilt_word) as f64 * 2f64.powi(-13);

    let array_size = words.u32_at(23);
    let struct_word = words.u32_at(24);
    let header_size = struct_word >> 24;
    let num_words_per_rec = (struct_word >> 12) & 0xFFF;
    let num_records = struct_word & 0xFFF;

    let ecef_0 = words.f64_lsw_first(25);
    let ecef_1 = words.f64_lsw_first(27);
    let ecef_2 = words.f64_lsw_first(29);

    let pointing_word = words.u32_at(31);
    let azimuthal_angle_0 = low_i16(pointing_word) as f64 * 2f64.powi(-7);
    let elevation_angle_0 = high_i16(pointing_word) as f64 * 2f64.powi(-7);
    let steering_mode_0 = words.u32_at(32);
    let reserved_0 = words.u32_at(33);
    let reserved_1 = words.u32_at(34);

    let beam_width_word = words.u32_at(35);
    let beam_width_vert = (beam_width_word >> 16) as f64 * 2f64.powi(-7);
    let beam_width_horiz = (beam_width_word & 0xFFFF) as f64 * 2f64.powi(-7);

    let range = words.u32_at(36) as f64 * 2f64.powi(-6);
    let health_status = words.u32_at(37);
    let mode_id = words.u32_at(38);
    let event_id = words.u32_at(39);

    let pulse_width = words.i64_lsw_first(40) as f64 * 1e-15;
    let pri = words.i64_lsw_first(42) as f64 * 1e-15;
    let duration = words.i64_lsw_first(44) as f64 * 1e-15;

    let tsi = prologue.tsi.unwrap_or(0);
    let (tsf0, tsf1) = prologue.tsf.unwrap_or((0, 0));
    let time = bitfields::time(tsi, tsf0, tsf1);

    let mut record = Record::new();
    record
        .put(
            "stream_id",
            FieldValue::U32(prologue.stream_id.unwrap_or(0)),
        )
        .put("time", FieldValue::F64(time))
        .put("cif0", FieldValue::U32(cif0))
        .put("cif1", FieldValue::U32(cif1))
        .put("cif2", FieldValue::U32(cif2))
        .put("cif3", FieldValue::U32(cif3))
        .put("bandwidth", FieldValue::F64(bandwidth))
        .put("if_reference_freq", FieldValue::F64(if_reference_freq))
        .put("rf_reference_freq", FieldValue::F64(rf_reference_freq))
        .put("gain1", FieldValue::F32(gain1 as f32))
        .put("gain2", FieldValue::F32(gain2 as f32))
        .put("sample_rate", FieldValue::F64(sample_rate))
        .put("temperature", FieldValue::F32(temperature as f32))
        .put("phase_offset", FieldValue::F32(phase_offset as f32))
        .put("ellipticity", FieldValue::F32(ellipticity as f32))
        .put("tilt", FieldValue::F32(tilt as f32))
        .put("array_size", FieldValue::U32(array_size))
        .put("header_size", FieldValue::U32(header_size))
        .put("num_words_per_rec", FieldValue::U32(num_words_per_rec))
        .put("num_records", FieldValue::U32(num_records))
        .put("ecef_0", FieldValue::F64(ecef_0))
        .put("ecef_1", FieldValue::F64(ecef_1))
        .put("ecef_2", FieldValue::F64(ecef_2))
        .put("azimuthal_angle_0", FieldValue::F32(azimuthal_angle_0 as f32))
        .put("elevation_angle_0", FieldValue::F32(elevation_angle_0 as f32))
        .put("steering_mode_0", FieldValue::U32(steering_mode_0))
        .put("reserved_0", FieldValue::U32(reserved_0))
        .put("reserved_1", FieldValue::U32(reserved_1))
        .put("beam_width_vert", FieldValue::F32(beam_width_vert as f32))
        .put("beam_width_horiz", FieldValue::F32(beam_width_horiz as f32))
        .put("range", FieldValue::F32(range as f32))
        .put("health_status", FieldValue::U32(health_status))
        .put("mode_id", FieldValue::U32(mode_id))
        .put("event_id", FieldValue::U32(event_id))
        .put("pulse_width", FieldValue::F64(pulse_width))
        .put("pri", FieldValue::F64(pri))
        .put("duration", FieldValue::F64(duration));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> Vec<u8> {
        // header(1) + stream_id(1) + class_id(2) + tsi(1) + tsf(2) + cif(4)
        // + 35 field words = 46 words.
        // packet_type=0b0100 (Context), class_id_present=1, indicators=0,
        // tsi=0b10 (Gps), tsf=0b10 (RealTimePs), packet_count=0.
        let header = 0x48A0_0000u32 | 46u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // stream id
        buf.extend_from_slice(&0u32.to_le_bytes()); // class id word 1 (pad/oui)
        buf.extend_from_slice(&((1u32 << 16) | 2u32).to_le_bytes()); // info=1, class=2
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsi
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsf0
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsf1
        buf.extend_from_slice(&CIF0_EXPECTED.to_le_bytes());
        buf.extend_from_slice(&CIF1_EXPECTED.to_le_bytes());
        buf.extend_from_slice(&CIF2_EXPECTED.to_le_bytes());
        buf.extend_from_slice(&CIF3_EXPECTED.to_le_bytes());
        for _ in 0..35 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    #[test]
    fn accepts_exact_class_id_and_timestamp_mode() {
        let buf = base_payload();
        let words = Words::new(&buf);
        assert!(decode(&words).is_ok());
    }

    #[test]
    fn rejects_wrong_packet_class_code() {
        let mut buf = base_payload();
        // word index 3 (byte offset 12) holds (info<<16)|class; corrupt class.
        let bad = (1u32 << 16) | 9u32;
        buf[12..16].copy_from_slice(&bad.to_le_bytes());
        let words = Words::new(&buf);
        assert!(matches!(
            decode(&words),
            Err(DecodeError::SchemaAssertion(_))
        ));
    }

    #[test]
    fn rejects_any_flipped_cif_bit() {
        let mut buf = base_payload();
        let o = 7 * 4;
        buf[o] ^= 0x01;
        let words = Words::new(&buf);
        assert!(matches!(
            decode(&words),
            Err(DecodeError::SchemaAssertion(_))
        ));
    }
}
