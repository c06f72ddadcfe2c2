// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
GPS-context decoder (Tango), §4.7 "GPS-context decoder (Tango)".

Decodes 25 navigation records, each spanning 25 words starting at word
offset `4 + 25*i`.
*/

use crate::errors::DecodeError;
use crate::packet::{VrtPrologue, Words};
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

const RECORD_COUNT: usize = 25;
const RECORD_WORDS: usize = 25;
const FIRST_RECORD_WORD: usize = 4;

/// Declared schema for the `gps_context` sink.
pub fn schema() -> Schema {
    Schema::new(vec![
        ("stream_id", FieldKind::U32),
        ("system_status", FieldKind::U16Vec),
        ("filter_status", FieldKind::U16Vec),
        ("unix_time_seconds", FieldKind::U32Vec),
        ("microseconds", FieldKind::U32Vec),
        ("latitude", FieldKind::F64Vec),
        ("longitude", FieldKind::F64Vec),
        ("altitude", FieldKind::F64Vec),
        ("velocity_0", FieldKind::F32Vec),
        ("velocity_1", FieldKind::F32Vec),
        ("velocity_2", FieldKind::F32Vec),
        ("acceleration_0", FieldKind::F32Vec),
        ("acceleration_1", FieldKind::F32Vec),
        ("acceleration_2", FieldKind::F32Vec),
        ("gforce", FieldKind::F32Vec),
        ("attitude_0", FieldKind::F32Vec),
        ("attitude_1", FieldKind::F32Vec),
        ("attitude_2", FieldKind::F32Vec),
        ("attitude_rate_0", FieldKind::F32Vec),
        ("attitude_rate_1", FieldKind::F32Vec),
        ("attitude_rate_2", FieldKind::F32Vec),
        ("latitude_std_dev", FieldKind::F32Vec),
        ("longitude_std_dev", FieldKind::F32Vec),
        ("altitude_std_dev", FieldKind::F32Vec),
    ])
}

fn f32_at(words: &Words, i: usize) -> f32 {
    f32::from_bits(words.u32_at(i))
}

/// Decodes a Tango GPS-context packet.
pub fn decode(words: &Words) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    words.require32(FIRST_RECORD_WORD + RECORD_COUNT * RECORD_WORDS)?;

    let class_id = prologue
        .class_id
        .as_ref()
        .ok_or_else(|| DecodeError::SchemaAssertion("gps-context missing class id".into()))?;
    if class_id.information_class_code() != 3 || class_id.packet_class_code() != 3 {
        return Err(DecodeError::SchemaAssertion(format!(
            "class id mismatch: information_class_code={}, packet_class_code={}",
            class_id.information_class_code(),
            class_id.packet_class_code()
        )));
    }

    let mut system_status = Vec::with_capacity(RECORD_COUNT);
    let mut filter_status = Vec::with_capacity(RECORD_COUNT);
    let mut unix_time_seconds = Vec::with_capacity(RECORD_COUNT);
    let mut microseconds = Vec::with_capacity(RECORD_COUNT);
    let mut latitude = Vec::with_capacity(RECORD_COUNT);
    let mut longitude = Vec::with_capacity(RECORD_COUNT);
    let mut altitude = Vec::with_capacity(RECORD_COUNT);
    let mut velocity_0 = Vec::with_capacity(RECORD_COUNT);
    let mut velocity_1 = Vec::with_capacity(RECORD_COUNT);
    let mut velocity_2 = Vec::with_capacity(RECORD_COUNT);
    let mut acceleration_0 = Vec::with_capacity(RECORD_COUNT);
    let mut acceleration_1 = Vec::with_capacity(RECORD_COUNT);
    let mut acceleration_2 = Vec::with_capacity(RECORD_COUNT);
    let mut gforce = Vec::with_capacity(RECORD_COUNT);
    let mut attitude_0 = Vec::with_capacity(RECORD_COUNT);
    let mut attitude_1 = Vec::with_capacity(RECORD_COUNT);
    let mut attitude_2 = Vec::with_capacity(RECORD_COUNT);
    let mut attitude_rate_0 = Vec::with_capacity(RECORD_COUNT);
    let mut attitude_rate_1 = Vec::with_capacity(RECORD_COUNT);
    let mut attitude_rate_2 = Vec::with_capacity(RECORD_COUNT);
    let mut latitude_std_dev = Vec::with_capacity(RECORD_COUNT);
    let mut longitude_std_dev = Vec::with_capacity(RECORD_COUNT);
    let mut altitude_std_dev = Vec::with_capacity(RECORD_COUNT);

    for i in 0..RECORD_COUNT {
        let b = FIRST_RECORD_WORD + RECORD_WORDS * i;
        let status_word = words.u32_at(b);
        system_status.push((status_word & 0xFFFF) as u16);
        filter_status.push((status_word >> 16) as u16);
        unix_time_seconds.push(words.u32_at(b + 1));
        microseconds.push(words.u32_at(b + 2));
        latitude.push(words.f64_lsw_first(b + 3));
        longitude.push(words.f64_lsw_first(b + 5));
        altitude.push(words.f64_lsw_first(b + 7));
        velocity_0.push(f32_at(words, b + 9));
        velocity_1.push(f32_at(words, b + 10));
        velocity_2.push(f32_at(words, b + 11));
        acceleration_0.push(f32_at(words, b + 12));
        acceleration_1.push(f32_at(words, b + 13));
        acceleration_2.push(f32_at(words, b + 14));
        gforce.push(f32_at(words, b + 15));
        attitude_0.push(f32_at(words, b + 16));
        attitude_1.push(f32_at(words, b + 17));
        attitude_2.push(f32_at(words, b + 18));
        attitude_rate_0.push(f32_at(words, b + 19));
        attitude_rate_1.push(f32_at(words, b + 20));
        attitude_rate_2.push(f32_at(words, b + 21));
        latitude_std_dev.push(f32_at(words, b + 22));
        longitude_std_dev.push(f32_at(words, b + 23));
        altitude_std_dev.push(f32_at(words, b + 24));
    }

    let mut record = Record::new();
    record
        .put(
            "stream_id",
            FieldValue::U32(prologue.stream_id.unwrap_or(0)),
        )
        .put("system_status", FieldValue::U16Vec(system_status))
        .put("filter_status", FieldValue::U16Vec(filter_status))
        .put("unix_time_seconds", FieldValue::U32Vec(unix_time_seconds))
        .put("microseconds", FieldValue::U32Vec(microseconds))
        .put("latitude", FieldValue::F64Vec(latitude))
        .put("longitude", FieldValue::F64Vec(longitude))
        .put("altitude", FieldValue::F64Vec(altitude))
        .put("velocity_0", FieldValue::F32Vec(velocity_0))
        .put("velocity_1", FieldValue::F32Vec(velocity_1))
        .put("velocity_2", FieldValue::F32Vec(velocity_2))
        .put("acceleration_0", FieldValue::F32Vec(acceleration_0))
        .put("acceleration_1", FieldValue::F32Vec(acceleration_1))
        .put("acceleration_2", FieldValue::F32Vec(acceleration_2))
        .put("gforce", FieldValue::F32Vec(gforce))
        .put("attitude_0", FieldValue::F32Vec(attitude_0))
        .put("attitude_1", FieldValue::F32Vec(attitude_1))
        .put("attitude_2", FieldValue::F32Vec(attitude_2))
        .put("attitude_rate_0", FieldValue::F32Vec(attitude_rate_0))
        .put("attitude_rate_1", FieldValue::F32Vec(attitude_rate_1))
        .put("attitude_rate_2", FieldValue::F32Vec(attitude_rate_2))
        .put("latitude_std_dev", FieldValue::F32Vec(latitude_std_dev))
        .put("longitude_std_dev", FieldValue::F32Vec(longitude_std_dev))
        .put("altitude_std_dev", FieldValue::F32Vec(altitude_std_dev));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> Vec<u8> {
        let total_words = FIRST_RECORD_WORD + RECORD_COUNT * RECORD_WORDS;
        // class_id_present=1 (bit 27) so the decoder's class-id checks run.
        let header = 0x4800_0000u32 | (total_words as u32 & 0xFFFF);
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&9u32.to_le_bytes()); // stream id
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&((3u32 << 16) | 3u32).to_le_bytes());
        for _ in FIRST_RECORD_WORD..total_words {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decodes_twenty_five_records_per_field() {
        let buf = base_payload();
        let words = Words::new(&buf);
        let record = decode(&words).unwrap();
        match &record["latitude"] {
            FieldValue::F64Vec(v) => assert_eq!(v.len(), RECORD_COUNT),
            _ => panic!("expected F64Vec"),
        }
    }

    #[test]
    fn rejects_wrong_class_id() {
        let mut buf = base_payload();
        let bad = (3u32 << 16) | 9u32;
        buf[12..16].copy_from_slice(&bad.to_le_bytes());
        let words = Words::new(&buf);
        assert!(matches!(
            decode(&words),
            Err(DecodeError::SchemaAssertion(_))
        ));
    }
}
