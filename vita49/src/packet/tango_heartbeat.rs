// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Heartbeat-context decoder (Tango), §4.7 "Heartbeat-context decoder
(Tango)".
*/

use crate::bitfields;
use crate::errors::DecodeError;
use crate::packet::{VrtPrologue, Words};
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

const SLOT_COUNT: usize = 16;
const TX_BUFFER_FREE_START: usize = 7;
const RX_BUFFER_FREE_START: usize = TX_BUFFER_FREE_START + SLOT_COUNT;
const TX_STREAM_ID_START: usize = RX_BUFFER_FREE_START + SLOT_COUNT;
const RX_STREAM_ID_START: usize = TX_STREAM_ID_START + SLOT_COUNT;
const SYSTEM_TIME_WORD: usize = RX_STREAM_ID_START + SLOT_COUNT;

/// Declared schema for the `heartbeat_context` sink.
pub fn schema() -> Schema {
    Schema::new(vec![
        ("stream_id", FieldKind::U32),
        ("time", FieldKind::F64),
        ("tx_buffer_free", FieldKind::U32Vec),
        ("rx_buffer_free", FieldKind::U32Vec),
        ("tx_stream_id", FieldKind::U32Vec),
        ("rx_stream_id", FieldKind::U32Vec),
        ("system_time", FieldKind::F64),
    ])
}

fn read_slots(words: &Words, start: usize) -> Vec<u32> {
    (0..SLOT_COUNT).map(|i| words.u32_at(start + i)).collect()
}

/// Decodes a Tango heartbeat-context packet.
pub fn decode(words: &Words) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    words.require32(SYSTEM_TIME_WORD + 2)?;

    let class_id = prologue
        .class_id
        .as_ref()
        .ok_or_else(|| DecodeError::SchemaAssertion("heartbeat-context missing class id".into()))?;
    if class_id.information_class_code() != 1 || class_id.packet_class_code() != 2 {
        return Err(DecodeError::SchemaAssertion(format!(
            "class id mismatch: information_class_code={}, packet_class_code={}",
            class_id.information_class_code(),
            class_id.packet_class_code()
        )));
    }

    let tx_buffer_free = read_slots(words, TX_BUFFER_FREE_START);
    let rx_buffer_free = read_slots(words, RX_BUFFER_FREE_START);
    let tx_stream_id = read_slots(words, TX_STREAM_ID_START);
    let rx_stream_id = read_slots(words, RX_STREAM_ID_START);

    let system_time = words.f64_lsw_first(SYSTEM_TIME_WORD);

    let tsi = prologue.tsi.unwrap_or(0);
    let (tsf0, tsf1) = prologue.tsf.unwrap_or((0, 0));
    // Source swaps tsf0/tsf1 relative to the canonical combine order used
    // elsewhere: `tsi + ((tsf1 << 32) | tsf0) * 1e-12`.
    let time = bitfields::time(tsi, tsf1, tsf0);

    let mut record = Record::new();
    record
        .put(
            "stream_id",
            FieldValue::U32(prologue.stream_id.unwrap_or(0)),
        )
        .put("time", FieldValue::F64(time))
        .put("tx_buffer_free", FieldValue::U32Vec(tx_buffer_free))
        .put("rx_buffer_free", FieldValue::U32Vec(rx_buffer_free))
        .put("tx_stream_id", FieldValue::U32Vec(tx_stream_id))
        .put("rx_stream_id", FieldValue::U32Vec(rx_stream_id))
        .put("system_time", FieldValue::F64(system_time));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_payload() -> Vec<u8> {
        // header(1) + stream_id(1) + class_id(2) + tsi(1) + tsf(2) +
        // 64 slot words + 2 system_time words = 73 words.
        let header = 0x4800_0000u32 | 73u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&5u32.to_le_bytes()); // stream id
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&((1u32 << 16) | 2u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsi
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsf0
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsf1
        for slot in 0..SLOT_COUNT as u32 {
            buf.extend_from_slice(&slot.to_le_bytes()); // tx_buffer_free
        }
        for slot in 0..SLOT_COUNT as u32 {
            buf.extend_from_slice(&(slot + 100).to_le_bytes()); // rx_buffer_free
        }
        for slot in 0..SLOT_COUNT as u32 {
            buf.extend_from_slice(&(slot + 200).to_le_bytes()); // tx_stream_id
        }
        for slot in 0..SLOT_COUNT as u32 {
            buf.extend_from_slice(&(slot + 300).to_le_bytes()); // rx_stream_id
        }
        buf.extend_from_slice(&1_000_000_000u64.to_le_bytes()); // system_time bits placeholder
        buf
    }

    #[test]
    fn decodes_all_four_slot_tables() {
        let buf = base_payload();
        let words = Words::new(&buf);
        let record = decode(&words).unwrap();
        match &record["tx_buffer_free"] {
            FieldValue::U32Vec(v) => {
                assert_eq!(v.len(), 16);
                assert_eq!(v[0], 0);
                assert_eq!(v[15], 15);
            }
            _ => panic!("expected U32Vec"),
        }
        match &record["rx_stream_id"] {
            FieldValue::U32Vec(v) => assert_eq!(v[0], 300),
            _ => panic!("expected U32Vec"),
        }
    }

    #[test]
    fn rejects_wrong_class_id() {
        let mut buf = base_payload();
        let bad = (1u32 << 16) | 9u32;
        buf[12..16].copy_from_slice(&bad.to_le_bytes());
        let words = Words::new(&buf);
        assert!(matches!(
            decode(&words),
            Err(DecodeError::SchemaAssertion(_))
        ));
    }
}
