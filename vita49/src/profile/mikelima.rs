// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The MikeLima profile (§4.1, §4.6, §4.7): non-VRT multi-lane
Message/Packet/EndOfMessage framing. A single frame is a composite
message; [`Profile::classify_multi`] re-walks the flattened bytes
[`crate::frame::MikeLimaFrameReader`] produced to recover the SOM,
each per-lane packet, and the EOM trailer as separate records.
*/

use crate::errors::DecodeError;
use crate::frame::{FrameReader, MikeLimaFrameReader};
use crate::packet::mblb;
use crate::packet::Words;
use crate::profile::{Dispatched, Profile, ProfileName};
use crate::record::FieldValue;

const SOM_HEADER_BYTES: usize = 288;
const PACKET_HEADER_BYTES: usize = 96;

/// The MikeLima profile descriptor.
pub struct MikeLimaProfile {
    iq_type: u8,
    beam_count: usize,
}

impl MikeLimaProfile {
    /// Builds a MikeLima profile for the given IQ type (`5` selects the
    /// 3-lane/21-word-trailer variant; anything else the 2-lane/22-word
    /// variant, §4.6/§9).
    pub fn new(iq_type: u8) -> MikeLimaProfile {
        MikeLimaProfile {
            iq_type,
            beam_count: if iq_type == 5 { 3 } else { 2 },
        }
    }

    fn eom_len_bytes(&self) -> usize {
        (if self.beam_count == 3 { 21 } else { 22 }) * 8
    }

    /// Sink kind this profile's per-lane packets route to (§6): split by
    /// IQ type so the uint8/float32 `iq_type` asymmetry (§C.6) lands in
    /// distinct schemas rather than being forced into one.
    fn packet_kind(&self) -> &'static str {
        if self.beam_count >= 3 {
            "iq5_packet_content"
        } else {
            "iq0_packet_content"
        }
    }

    fn packet_schema(&self) -> crate::record::Schema {
        if self.beam_count >= 3 {
            mblb::iq5_packet_schema()
        } else {
            mblb::iq0_packet_schema()
        }
    }
}

fn packet_rx_config(header: &[u8]) -> Result<u32, DecodeError> {
    let words = Words::new(header);
    let record = mblb::decode_packet_header(&words)?;
    match record.get("rx_config") {
        Some(FieldValue::U8(v)) => Ok(*v as u32),
        _ => Ok(0),
    }
}

impl Profile for MikeLimaProfile {
    fn name(&self) -> ProfileName {
        ProfileName::MikeLima
    }

    fn frame_reader(&self) -> Box<dyn FrameReader> {
        Box::new(MikeLimaFrameReader::new(self.iq_type))
    }

    fn sink_schemas(&self) -> Vec<(&'static str, crate::record::Schema)> {
        vec![
            ("mblb_som", mblb::som_schema()),
            (self.packet_kind(), self.packet_schema()),
            ("mblb_eom", mblb::eom_schema()),
        ]
    }

    fn classify(&self, payload: &[u8], frame_index: usize) -> Result<Dispatched, DecodeError> {
        self.classify_multi(payload, frame_index)?
            .into_iter()
            .next()
            .ok_or_else(|| DecodeError::SchemaAssertion("empty MBLB message".into()))
    }

    fn classify_orphan(&self, packet: &[u8]) -> Result<Dispatched, DecodeError> {
        if packet.len() < PACKET_HEADER_BYTES {
            return Err(DecodeError::PayloadTooShort {
                wanted: PACKET_HEADER_BYTES,
                got: packet.len(),
            });
        }
        let header = &packet[..PACKET_HEADER_BYTES];
        let samples = &packet[PACKET_HEADER_BYTES..];
        let words = Words::new(header);
        let record = mblb::decode_packet(&words, samples, self.beam_count, self.iq_type)?;
        Ok(Dispatched {
            kind: self.packet_kind(),
            record,
            stream_id: None,
            wants_context_key: false,
            is_context: false,
        })
    }

    fn classify_multi(
        &self,
        payload: &[u8],
        _frame_index: usize,
    ) -> Result<Vec<Dispatched>, DecodeError> {
        let eom_len = self.eom_len_bytes();
        if payload.len() < SOM_HEADER_BYTES + eom_len {
            return Err(DecodeError::PayloadTooShort {
                wanted: SOM_HEADER_BYTES + eom_len,
                got: payload.len(),
            });
        }

        let mut out = Vec::new();

        let som_bytes = &payload[0..SOM_HEADER_BYTES];
        let som_words = Words::new(som_bytes);
        let som_record = mblb::decode_som(&som_words, 0.0)?;
        let dwell = match som_record.get("dwell") {
            Some(FieldValue::F64(v)) if *v > 0.0 => *v as usize,
            _ => 1,
        };
        out.push(Dispatched {
            kind: "mblb_som",
            record: som_record,
            stream_id: None,
            wants_context_key: false,
            is_context: false,
        });

        let packets_end = payload.len() - eom_len;
        let mut offset = SOM_HEADER_BYTES;
        while offset < packets_end {
            if offset + PACKET_HEADER_BYTES > packets_end {
                return Err(DecodeError::SchemaAssertion(
                    "truncated MBLB packet header".into(),
                ));
            }
            let header = &payload[offset..offset + PACKET_HEADER_BYTES];
            let rx_config = packet_rx_config(header)?;
            let data_len = 4 * dwell.max(1) * (1280usize >> rx_config.min(10)) * self.beam_count;
            let packet_end = offset + PACKET_HEADER_BYTES + data_len;
            if packet_end > packets_end {
                return Err(DecodeError::SchemaAssertion(
                    "MBLB packet data runs past message end".into(),
                ));
            }

            let samples = &payload[offset + PACKET_HEADER_BYTES..packet_end];
            let header_words = Words::new(header);
            let record = mblb::decode_packet(&header_words, samples, self.beam_count, self.iq_type)?;
            out.push(Dispatched {
                kind: self.packet_kind(),
                record,
                stream_id: None,
                wants_context_key: false,
                is_context: false,
            });
            offset = packet_end;
        }

        let eom_bytes = &payload[packets_end..];
        let eom_words = Words::new(eom_bytes);
        let eom_record = mblb::decode_eom(&eom_words)?;
        out.push(Dispatched {
            kind: "mblb_eom",
            record: eom_record,
            stream_id: None,
            wants_context_key: false,
            is_context: false,
        });

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn som_bytes() -> Vec<u8> {
        vec![0u8; SOM_HEADER_BYTES]
    }

    fn packet_bytes(data_len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; PACKET_HEADER_BYTES];
        buf.extend(std::iter::repeat(0u8).take(data_len));
        buf
    }

    #[test]
    fn walks_som_one_packet_and_eom() {
        let profile = MikeLimaProfile::new(0);
        let mut payload = som_bytes();
        // dwell=0 in a zeroed SOM falls back to 1; rx_config=0 in a
        // zeroed packet header => data_len = 4*1*1280*2 = 10240.
        let data_len = 4 * 1 * 1280 * 2;
        payload.extend(packet_bytes(data_len));
        payload.extend(vec![0u8; 22 * 8]);

        let dispatched = profile.classify_multi(&payload, 0).unwrap();
        assert_eq!(dispatched.len(), 3);
        assert_eq!(dispatched[0].kind, "mblb_som");
        assert_eq!(dispatched[1].kind, "iq0_packet_content");
        assert_eq!(dispatched[2].kind, "mblb_eom");
        assert!(dispatched[1].record.contains_key("samples_i_left"));
    }

    #[test]
    fn short_payload_is_rejected() {
        let profile = MikeLimaProfile::new(0);
        let payload = vec![0u8; 10];
        assert!(matches!(
            profile.classify_multi(&payload, 0),
            Err(DecodeError::PayloadTooShort { .. })
        ));
    }

    #[test]
    fn classifies_an_orphan_packet_into_the_packet_content_sink() {
        let profile = MikeLimaProfile::new(0);
        let packet = packet_bytes(4 * 2); // two (I, Q) pairs
        let dispatched = profile.classify_orphan(&packet).unwrap();
        assert_eq!(dispatched.kind, "iq0_packet_content");
        assert!(dispatched.record.contains_key("samples_i_left"));
    }

    #[test]
    fn orphan_packet_shorter_than_a_header_is_rejected() {
        let profile = MikeLimaProfile::new(0);
        assert!(matches!(
            profile.classify_orphan(&[0u8; 10]),
            Err(DecodeError::PayloadTooShort { .. })
        ));
    }
}
