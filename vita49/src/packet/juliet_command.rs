// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Extension-Command and AckR decoders (Juliet), §4.7.

Unlike the data-context decoder, neither of these applies the Juliet
epoch offset to `time` — the asymmetry is in the source and is preserved
here deliberately (see `DESIGN.md`).
*/

use crate::bitfields;
use crate::errors::DecodeError;
use crate::packet::{VrtPrologue, Words};
use crate::packet_header::Indicators;
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

fn header_fields(record: &mut Record, prologue: &VrtPrologue) {
    record
        .put(
            "packet_size",
            FieldValue::U16(prologue.header.packet_size()),
        )
        .put(
            "packet_count",
            FieldValue::U8(prologue.header.packet_count()),
        )
        .put("tsi_mode", FieldValue::U8(prologue.header.tsi() as u8))
        .put("tsf_mode", FieldValue::U8(prologue.header.tsf() as u8))
        .put(
            "stream_id",
            FieldValue::U32(prologue.stream_id.unwrap_or(0)),
        );
    if let Some(class_id) = &prologue.class_id {
        record
            .put(
                "class_id_0",
                FieldValue::U32((class_id.oui() as u32) | ((class_id.pad_bit_count() as u32) << 27)),
            )
            .put(
                "class_id_1",
                FieldValue::U32(
                    ((class_id.information_class_code() as u32) << 16)
                        | class_id.packet_class_code() as u32,
                ),
            );
    }
    record
        .put("tsi", FieldValue::U32(prologue.tsi.unwrap_or(0)))
        .put("tsf0", FieldValue::U32(prologue.tsf.map(|t| t.0).unwrap_or(0)))
        .put("tsf1", FieldValue::U32(prologue.tsf.map(|t| t.1).unwrap_or(0)));
    let time = match (prologue.tsi, prologue.tsf) {
        (Some(tsi), Some((tsf0, tsf1))) => bitfields::time(tsi, tsf0, tsf1),
        _ => 0.0,
    };
    record.put("time", FieldValue::F64(time));
}

/// Declared schema for the `extension_command` sink.
pub fn extension_command_schema() -> Schema {
    Schema::new(vec![
        ("packet_size", FieldKind::U16),
        ("packet_count", FieldKind::U8),
        ("tsi_mode", FieldKind::U8),
        ("tsf_mode", FieldKind::U8),
        ("stream_id", FieldKind::U32),
        ("class_id_0", FieldKind::U32),
        ("class_id_1", FieldKind::U32),
        ("tsi", FieldKind::U32),
        ("tsf0", FieldKind::U32),
        ("tsf1", FieldKind::U32),
        ("time", FieldKind::F64),
        ("frequency", FieldKind::F64),
        ("rf_freq_offset", FieldKind::F64),
        ("sample_rate", FieldKind::U32),
        ("dwell", FieldKind::F64),
        ("pointing_azimuth", FieldKind::F64),
        ("pointing_elevation", FieldKind::F64),
        ("cited_sid", FieldKind::U32),
    ])
}

/// Decodes a Juliet Extension-Command packet (`packet_type = 0b0111`,
/// indicators `0b0000`).
pub fn decode_extension_command(words: &Words) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    match prologue.header.indicators() {
        Indicators::ExtensionCommand(i) if !i.ack_packet => {}
        _ => {
            return Err(DecodeError::SchemaAssertion(
                "Extension-Command indicators mismatch".into(),
            ))
        }
    }
    words.require32(30)?;

    let frequency = bitfields::frequency(words.u32_at(16), words.u32_at(17));
    let rf_freq_offset = bitfields::offset(words.u32_at(18), words.u32_at(19));
    let sample_rate = bitfields::sample_rate(words.u32_at(21), words.u32_at(22));
    let pointing = bitfields::pointing(words.u32_at(25));
    let cited_sid = words.u32_at(26);
    let dwell = bitfields::dwell(words.u32_at(28), words.u32_at(29));

    let mut record = Record::new();
    header_fields(&mut record, &prologue);
    record
        .put("frequency", FieldValue::F64(frequency))
        .put("rf_freq_offset", FieldValue::F64(rf_freq_offset))
        .put("sample_rate", FieldValue::U32(sample_rate))
        .put("dwell", FieldValue::F64(dwell))
        .put("pointing_azimuth", FieldValue::F64(pointing.azimuth))
        .put("pointing_elevation", FieldValue::F64(pointing.elevation))
        .put("cited_sid", FieldValue::U32(cited_sid));
    Ok(record)
}

/// Declared schema for the `ackr` sink.
pub fn ackr_schema() -> Schema {
    Schema::new(vec![
        ("packet_size", FieldKind::U16),
        ("packet_count", FieldKind::U8),
        ("tsi_mode", FieldKind::U8),
        ("tsf_mode", FieldKind::U8),
        ("stream_id", FieldKind::U32),
        ("class_id_0", FieldKind::U32),
        ("class_id_1", FieldKind::U32),
        ("tsi", FieldKind::U32),
        ("tsf0", FieldKind::U32),
        ("tsf1", FieldKind::U32),
        ("time", FieldKind::F64),
        ("cam", FieldKind::U32),
        ("message_id", FieldKind::U32),
        ("cif0", FieldKind::U32),
        ("cif2", FieldKind::U32),
        ("cif4", FieldKind::U32),
        ("cited_sid", FieldKind::U32),
        ("reject_reason", FieldKind::U32),
        ("data_addr_index", FieldKind::U32),
    ])
}

/// Decodes a Juliet AckR packet (`packet_type = 0b0111`, indicators
/// `0b0100`, `packet_size = 15` words).
pub fn decode_ackr(words: &Words) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    match prologue.header.indicators() {
        Indicators::ExtensionCommand(i) if i.ack_packet => {}
        _ => {
            return Err(DecodeError::SchemaAssertion(
                "AckR indicators mismatch".into(),
            ))
        }
    }
    if prologue.header.packet_size() != 15 {
        return Err(DecodeError::SchemaAssertion(format!(
            "AckR packet_size mismatch: expected 15, got {}",
            prologue.header.packet_size()
        )));
    }
    words.require32(15)?;

    let cam = words.u32_at(7);
    let message_id = words.u32_at(8);
    let cif0 = words.u32_at(9);
    let cif2 = words.u32_at(10);
    let cif4 = words.u32_at(11);
    let cited_sid = words.u32_at(12);
    let reject_reason = words.u32_at(13);
    let data_addr_index = words.u32_at(14);

    let mut record = Record::new();
    header_fields(&mut record, &prologue);
    record
        .put("cam", FieldValue::U32(cam))
        .put("message_id", FieldValue::U32(message_id))
        .put("cif0", FieldValue::U32(cif0))
        .put("cif2", FieldValue::U32(cif2))
        .put("cif4", FieldValue::U32(cif4))
        .put("cited_sid", FieldValue::U32(cited_sid))
        .put("reject_reason", FieldValue::U32(reject_reason))
        .put("data_addr_index", FieldValue::U32(data_addr_index));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension_command_payload() -> Vec<u8> {
        let header = 0x7000_0000u32 | 30u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&7u32.to_le_bytes()); // stream id
        for _ in 7..30 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    fn ackr_payload() -> Vec<u8> {
        let header = 0x7400_0000u32 | 15u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&7u32.to_le_bytes());
        for _ in 7..15 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    #[test]
    fn extension_command_decodes_without_epoch_offset() {
        let buf = extension_command_payload();
        let words = Words::new(&buf);
        let record = decode_extension_command(&words).unwrap();
        assert_eq!(record["time"], FieldValue::F64(0.0));
    }

    #[test]
    fn ackr_rejects_wrong_packet_size() {
        let mut buf = ackr_payload();
        // Corrupt the declared packet_size in the header word.
        let bad_header = 0x7400_0000u32 | 20u32;
        buf[0..4].copy_from_slice(&bad_header.to_le_bytes());
        let words = Words::new(&buf);
        assert!(matches!(
            decode_ackr(&words),
            Err(DecodeError::SchemaAssertion(_))
        ));
    }

    #[test]
    fn ackr_decodes_fixed_fields() {
        let buf = ackr_payload();
        let words = Words::new(&buf);
        let record = decode_ackr(&words).unwrap();
        assert_eq!(record["cam"], FieldValue::U32(0));
        assert_eq!(record["stream_id"], FieldValue::U32(7));
    }
}
