// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Data-context decoder (Juliet), §4.7 "Data-context decoder (Juliet)".

Reads CIF0..CIF4 from words 7-11 and asserts the exact bitmasks required
by property `P3`; then reads the fixed field table at words 12..33. Time
is offset by the Juliet custom-epoch constant (§9 Open Questions) — this
decoder is the one source location in the crate that applies it; the
asymmetry with `ExtensionCommand`/`AckR` not applying it is preserved
intentionally (see `DESIGN.md`).
*/

use crate::bitfields;
use crate::errors::DecodeError;
use crate::packet::{VrtPrologue, Words};
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

/// The Juliet custom epoch (2019-01-01T00:00:00Z) expressed as an offset,
/// in seconds, from the Unix epoch.
pub const JULIET_EPOCH_OFFSET_S: f64 = 1_546_300_800.0;

const CIF0_EXPECTED: u32 = 0x3010_0000;
const CIF1_EXPECTED: u32 = 0xD300_0000;
const CIF2_EXPECTED: u32 = 0x0000_0180;
const CIF3_EXPECTED: u32 = 0x01C0_0000;
const CIF4_EXPECTED: u32 = 0x0000_0000;

/// Declared schema for the `context_data` sink.
pub fn schema() -> Schema {
    Schema::new(vec![
        ("stream_id", FieldKind::U32),
        ("time", FieldKind::F64),
        ("bandwidth", FieldKind::F64),
        ("frequency", FieldKind::F64),
        ("rf_freq_offset", FieldKind::F64),
        ("gain_stage1", FieldKind::F64),
        ("gain_stage2", FieldKind::F64),
        ("sample_rate", FieldKind::U32),
        ("data_formats", FieldKind::U32),
        ("polarization", FieldKind::U32),
        ("pointing_elevation", FieldKind::F64),
        ("pointing_azimuth", FieldKind::F64),
        ("beam_width_az", FieldKind::F64),
        ("beam_width_el", FieldKind::F64),
        ("cited_sid", FieldKind::U32),
        ("function_priority_id", FieldKind::U32),
        ("dwell", FieldKind::F64),
        ("requested_input", FieldKind::U32),
        ("reject_reason", FieldKind::U32),
        ("data_addr_index", FieldKind::U32),
        ("tx_digital_input_power", FieldKind::F32),
    ])
}

fn gain(word: u32) -> (f64, f64) {
    let stage1 = (word >> 16) as u16 as i16;
    let stage2 = (word & 0xFFFF) as u16 as i16;
    (stage1 as f64 * 2f64.powi(-7), stage2 as f64 * 2f64.powi(-7))
}

fn beam_width(word: u32) -> (f64, f64) {
    let az = (word >> 16) as u16;
    let el = (word & 0xFFFF) as u16;
    (az as f64 * 2f64.powi(-7), el as f64 * 2f64.powi(-7))
}

/// Decodes a Juliet data-context packet.
pub fn decode(words: &Words) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    words.require32(33)?;

    let cifs = [
        words.u32_at(7),
        words.u32_at(8),
        words.u32_at(9),
        words.u32_at(10),
        words.u32_at(11),
    ];
    let expected = [
        CIF0_EXPECTED,
        CIF1_EXPECTED,
        CIF2_EXPECTED,
        CIF3_EXPECTED,
        CIF4_EXPECTED,
    ];
    for (i, (got, want)) in cifs.iter().zip(expected.iter()).enumerate() {
        if got != want {
            return Err(DecodeError::SchemaAssertion(format!(
                "CIF{i} mismatch: expected {want:#010x}, got {got:#010x}"
            )));
        }
    }

    let bandwidth = bitfields::bandwidth(words.u32_at(12), words.u32_at(13));
    let frequency = bitfields::frequency(words.u32_at(14), words.u32_at(15));
    let rf_freq_offset = bitfields::offset(words.u32_at(16), words.u32_at(17));
    let (gain_stage1, gain_stage2) = gain(words.u32_at(18));
    let sample_rate = bitfields::sample_rate(words.u32_at(19), words.u32_at(20));
    let data_formats = words.u32_at(21);
    let polarization = words.u32_at(22);
    let pointing = bitfields::pointing(words.u32_at(23));
    let (beam_width_az, beam_width_el) = beam_width(words.u32_at(24));
    let cited_sid = words.u32_at(25);
    let function_priority_id = words.u32_at(26);
    let dwell = bitfields::dwell(words.u32_at(27), words.u32_at(28));
    let requested_input = words.u32_at(29);
    let reject_reason = words.u32_at(30);
    let data_addr_index = words.u32_at(31);
    let tx_digital_input_power = f32::from_bits(words.u32_at(32));

    let time = match (prologue.tsi, prologue.tsf) {
        (Some(tsi), Some((tsf0, tsf1))) => {
            bitfields::time(tsi, tsf0, tsf1) + JULIET_EPOCH_OFFSET_S
        }
        _ => JULIET_EPOCH_OFFSET_S,
    };

    let mut record = Record::new();
    record
        .put(
            "stream_id",
            FieldValue::U32(prologue.stream_id.unwrap_or(0)),
        )
        .put("time", FieldValue::F64(time))
        .put("bandwidth", FieldValue::F64(bandwidth))
        .put("frequency", FieldValue::F64(frequency))
        .put("rf_freq_offset", FieldValue::F64(rf_freq_offset))
        .put("gain_stage1", FieldValue::F64(gain_stage1))
        .put("gain_stage2", FieldValue::F64(gain_stage2))
        .put("sample_rate", FieldValue::U32(sample_rate))
        .put("data_formats", FieldValue::U32(data_formats))
        .put("polarization", FieldValue::U32(polarization))
        .put("pointing_elevation", FieldValue::F64(pointing.elevation))
        .put("pointing_azimuth", FieldValue::F64(pointing.azimuth))
        .put("beam_width_az", FieldValue::F64(beam_width_az))
        .put("beam_width_el", FieldValue::F64(beam_width_el))
        .put("cited_sid", FieldValue::U32(cited_sid))
        .put("function_priority_id", FieldValue::U32(function_priority_id))
        .put("dwell", FieldValue::F64(dwell))
        .put("requested_input", FieldValue::U32(requested_input))
        .put("reject_reason", FieldValue::U32(reject_reason))
        .put("data_addr_index", FieldValue::U32(data_addr_index))
        .put(
            "tx_digital_input_power",
            FieldValue::F32(tx_digital_input_power),
        );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> Vec<u8> {
        // 33 words: header, stream id, 5 CIF words (expected values), then
        // 21 zeroed field words.
        let header = 0x4000_0000u32 | 33u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // stream id
        for _ in 0..5 {
            buf.extend_from_slice(&0u32.to_le_bytes()); // placeholder, fixed below
        }
        for _ in 0..21 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    fn set_cifs(buf: &mut [u8]) {
        let cifs = [
            CIF0_EXPECTED,
            CIF1_EXPECTED,
            CIF2_EXPECTED,
            CIF3_EXPECTED,
            CIF4_EXPECTED,
        ];
        for (i, c) in cifs.iter().enumerate() {
            let o = (7 + i) * 4;
            buf[o..o + 4].copy_from_slice(&c.to_le_bytes());
        }
    }

    #[test]
    fn p3_accepts_exact_cif_bitmasks() {
        let mut buf = base_payload();
        set_cifs(&mut buf);
        let words = Words::new(&buf);
        assert!(decode(&words).is_ok());
    }

    #[test]
    fn p3_rejects_any_flipped_cif_bit() {
        let mut buf = base_payload();
        set_cifs(&mut buf);
        // Flip one bit of CIF0.
        let o = 7 * 4;
        buf[o] ^= 0x01;
        let words = Words::new(&buf);
        assert!(matches!(
            decode(&words),
            Err(DecodeError::SchemaAssertion(_))
        ));
    }
}
