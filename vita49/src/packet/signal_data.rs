// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Signal-data decoder, shared by the Juliet and Tango profiles (§4.7
"Signal-data decoder").
*/

use crate::bitfields;
use crate::errors::DecodeError;
use crate::packet::{VrtPrologue, Words};
use crate::packet_header::Indicators;
use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

/// Which profile's trailer convention applies: Tango uses a 2-word
/// trailer, Juliet a 1-word trailer, any other vendor none.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrailerConvention {
    /// No trailer regardless of the trailer-included indicator bit.
    None,
    /// Juliet: 1-word trailer when the indicator bit is set.
    Juliet,
    /// Tango: 2-word trailer when the indicator bit is set.
    Tango,
}

/// Declared schema for the `data` sink.
pub fn schema() -> Schema {
    Schema::new(vec![
        ("stream_id", FieldKind::U32),
        ("packet_count", FieldKind::U8),
        ("trailer_included", FieldKind::Bool),
        ("time", FieldKind::F64),
        ("sample_count", FieldKind::U32),
        ("samples_i", FieldKind::I16Vec),
        ("samples_q", FieldKind::I16Vec),
    ])
}

fn trailer_included(prologue: &VrtPrologue) -> bool {
    match prologue.header.indicators() {
        Indicators::SignalData(i) | Indicators::SignalDataNoStreamId(i) => i.trailer_included,
        _ => false,
    }
}

/// Decodes a signal-data packet: `sample_count = payload_size - 7 -
/// trailer_size`; samples are `2 * sample_count` 16-bit signed integers,
/// interleaved `(I, Q)` pairs starting at the word offset where the
/// prologue ends.
pub fn decode(words: &Words, convention: TrailerConvention) -> Result<Record, DecodeError> {
    let prologue = VrtPrologue::parse(words)?;
    let trailer_present = trailer_included(&prologue);
    let trailer_size = match (trailer_present, convention) {
        (false, _) | (true, TrailerConvention::None) => 0usize,
        (true, TrailerConvention::Juliet) => 1,
        (true, TrailerConvention::Tango) => 2,
    };

    let total_words = prologue.header.packet_size() as usize;
    let sample_count = total_words
        .checked_sub(prologue.payload_offset)
        .and_then(|v| v.checked_sub(trailer_size))
        .ok_or(DecodeError::PayloadTooShort {
            wanted: prologue.payload_offset + trailer_size,
            got: total_words,
        })?;

    words.require32(prologue.payload_offset + sample_count)?;

    let mut samples_i = Vec::with_capacity(sample_count);
    let mut samples_q = Vec::with_capacity(sample_count);
    for k in 0..sample_count {
        let half_word = (prologue.payload_offset + k) * 2;
        samples_i.push(words.i16_at(half_word));
        samples_q.push(words.i16_at(half_word + 1));
    }

    let time = match (prologue.tsi, prologue.tsf) {
        (Some(tsi), Some((tsf0, tsf1))) => bitfields::time(tsi, tsf0, tsf1),
        _ => 0.0,
    };

    let mut record = Record::new();
    record
        .put(
            "stream_id",
            FieldValue::U32(prologue.stream_id.unwrap_or(0)),
        )
        .put("packet_count", FieldValue::U8(prologue.header.packet_count()))
        .put("trailer_included", FieldValue::Bool(trailer_present))
        .put("time", FieldValue::F64(time))
        .put("sample_count", FieldValue::U32(sample_count as u32))
        .put("samples_i", FieldValue::I16Vec(samples_i))
        .put("samples_q", FieldValue::I16Vec(samples_q));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_payload(word_count: u16, sample_count: usize) -> Vec<u8> {
        // header: packet_type=SignalData(1), stream_id included, no class id,
        // no timestamps, trailer not included.
        let header = 0x1000_0000u32 | word_count as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&123456789u32.to_le_bytes()); // stream id
        for k in 0..sample_count {
            let i = k as i16;
            let q = -(k as i16);
            buf.extend_from_slice(&i.to_le_bytes());
            buf.extend_from_slice(&q.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decodes_interleaved_iq_samples() {
        // S1: word_count=5000, sample_count = 5000 - 7 - 1... but here there's
        // no trailer and prologue is only 2 words (header + stream id), so
        // sample_count = word_count - 2.
        let word_count = 10u16;
        let sample_count = 8usize;
        let buf = build_payload(word_count, sample_count);
        let words = Words::new(&buf);
        let record = decode(&words, TrailerConvention::None).unwrap();
        assert_eq!(record["sample_count"], FieldValue::U32(8));
        match &record["samples_i"] {
            FieldValue::I16Vec(v) => assert_eq!(v.len(), 8),
            _ => panic!("expected I16Vec"),
        }
    }
}
