// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*! The Juliet profile (§4.1, §4.7): VRT framing, byte-swapped payloads,
no trailer markers. */

use crate::errors::DecodeError;
use crate::frame::{FrameReader, JulietFrameReader};
use crate::packet::juliet_command::{
    ackr_schema, decode_ackr, decode_extension_command, extension_command_schema,
};
use crate::packet::juliet_context::{self, JULIET_EPOCH_OFFSET_S};
use crate::packet::signal_data::{self, TrailerConvention};
use crate::packet::Words;
use crate::packet_header::{Indicators, PacketHeader, PacketType};
use crate::profile::{Dispatched, Profile, ProfileName};
use crate::record::FieldValue;

/// The Juliet profile descriptor.
pub struct JulietProfile;

impl Profile for JulietProfile {
    fn name(&self) -> ProfileName {
        ProfileName::Juliet
    }

    fn frame_reader(&self) -> Box<dyn FrameReader> {
        Box::<JulietFrameReader>::default()
    }

    fn sink_schemas(&self) -> Vec<(&'static str, crate::record::Schema)> {
        vec![
            ("data", signal_data::schema()),
            ("context_data", juliet_context::schema()),
            ("extension_command", extension_command_schema()),
            ("ackr", ackr_schema()),
        ]
    }

    fn classify(&self, payload: &[u8], _frame_index: usize) -> Result<Dispatched, DecodeError> {
        let words = Words::new(payload);
        words.require32(1)?;
        let header = PacketHeader::from_u32(words.u32_at(0));

        match header.packet_type() {
            PacketType::SignalData | PacketType::SignalDataWithoutStreamId => {
                let mut record = signal_data::decode(&words, TrailerConvention::Juliet)?;
                if let Some(FieldValue::F64(t)) = record.get("time").cloned() {
                    record.insert(
                        "time".to_string(),
                        FieldValue::F64(t + JULIET_EPOCH_OFFSET_S),
                    );
                }
                let stream_id = match &record.get("stream_id") {
                    Some(FieldValue::U32(v)) => Some(*v),
                    _ => None,
                };
                Ok(Dispatched {
                    kind: "data",
                    record,
                    stream_id,
                    wants_context_key: true,
                    is_context: false,
                })
            }
            PacketType::ExtensionContext => {
                let record = juliet_context::decode(&words)?;
                let stream_id = match &record.get("stream_id") {
                    Some(FieldValue::U32(v)) => Some(*v),
                    _ => None,
                };
                Ok(Dispatched {
                    kind: "context_data",
                    record,
                    stream_id,
                    wants_context_key: false,
                    is_context: true,
                })
            }
            PacketType::ExtensionCommand | PacketType::ExtensionData => {
                match header.indicators() {
                    Indicators::ExtensionCommand(i) if i.ack_packet => {
                        let record = decode_ackr(&words)?;
                        Ok(Dispatched {
                            kind: "ackr",
                            record,
                            stream_id: None,
                            wants_context_key: false,
                            is_context: false,
                        })
                    }
                    Indicators::ExtensionCommand(_) => {
                        let record = decode_extension_command(&words)?;
                        Ok(Dispatched {
                            kind: "extension_command",
                            record,
                            stream_id: None,
                            wants_context_key: false,
                            is_context: false,
                        })
                    }
                    _ => Err(DecodeError::UnknownPacketType {
                        packet_type: header.packet_type() as u8,
                        indicators: header.raw_indicators(),
                    }),
                }
            }
            _ => Err(DecodeError::UnknownPacketType {
                packet_type: header.packet_type() as u8,
                indicators: header.raw_indicators(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_data_gets_epoch_offset_applied() {
        let header = 0x1000_0000u32 | 9u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        for _ in 1..9 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        let dispatched = JulietProfile.classify(&buf, 0).unwrap();
        assert_eq!(dispatched.kind, "data");
        assert_eq!(
            dispatched.record["time"],
            FieldValue::F64(JULIET_EPOCH_OFFSET_S)
        );
        assert!(dispatched.wants_context_key);
    }

    #[test]
    fn unknown_packet_type_is_reported() {
        let header = 0x6000_0000u32 | 7u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        for _ in 1..7 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        assert!(matches!(
            JulietProfile.classify(&buf, 0),
            Err(DecodeError::UnknownPacketType { .. })
        ));
    }
}
