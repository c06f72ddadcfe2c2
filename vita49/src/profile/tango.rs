// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*! The Tango profile (§4.1, §4.7): `VRLP`/`VEND`-bracketed VRT framing,
no epoch offset. */

use crate::errors::DecodeError;
use crate::frame::{FrameReader, TangoFrameReader};
use crate::packet::signal_data::{self, TrailerConvention};
use crate::packet::{tango_context, tango_heartbeat, tango_gps, VrtPrologue, Words};
use crate::packet_header::PacketType;
use crate::profile::{Dispatched, Profile, ProfileName};
use crate::record::FieldValue;

/// The Tango profile descriptor.
pub struct TangoProfile {
    clean: bool,
}

impl TangoProfile {
    /// Builds a Tango profile. `clean` enables DEADBEEF-excision at the
    /// frame boundary (§4.5, `--clean`).
    pub fn new(clean: bool) -> TangoProfile {
        TangoProfile { clean }
    }
}

fn stream_id_of(words: &Words) -> Option<u32> {
    VrtPrologue::parse(words).ok().and_then(|p| p.stream_id)
}

impl Profile for TangoProfile {
    fn name(&self) -> ProfileName {
        ProfileName::Tango
    }

    fn frame_reader(&self) -> Box<dyn FrameReader> {
        Box::new(TangoFrameReader::new(self.clean))
    }

    fn sink_schemas(&self) -> Vec<(&'static str, crate::record::Schema)> {
        vec![
            ("data", signal_data::schema()),
            ("context", tango_context::schema()),
            ("heartbeat_context", tango_heartbeat::schema()),
            ("gps_context", tango_gps::schema()),
        ]
    }

    fn classify(&self, payload: &[u8], _frame_index: usize) -> Result<Dispatched, DecodeError> {
        let words = Words::new(payload);
        words.require32(1)?;
        let header = crate::packet_header::PacketHeader::from_u32(words.u32_at(0));

        match header.packet_type() {
            PacketType::SignalData | PacketType::SignalDataWithoutStreamId => {
                let record = signal_data::decode(&words, TrailerConvention::Tango)?;
                let stream_id = stream_id_of(&words);
                Ok(Dispatched {
                    kind: "data",
                    record,
                    stream_id,
                    wants_context_key: true,
                    is_context: false,
                })
            }
            PacketType::Context => {
                let record = tango_context::decode(&words)?;
                let stream_id = stream_id_of(&words);
                Ok(Dispatched {
                    kind: "context",
                    record,
                    stream_id,
                    wants_context_key: false,
                    is_context: true,
                })
            }
            PacketType::ExtensionContext => {
                // Heartbeat and GPS-context share packet_type; disambiguate
                // by class id (§3), trying heartbeat first.
                match tango_heartbeat::decode(&words) {
                    Ok(record) => Ok(Dispatched {
                        kind: "heartbeat_context",
                        stream_id: stream_id_of(&words),
                        record,
                        wants_context_key: false,
                        is_context: false,
                    }),
                    Err(_) => {
                        let record = tango_gps::decode(&words)?;
                        Ok(Dispatched {
                            kind: "gps_context",
                            stream_id: stream_id_of(&words),
                            record,
                            wants_context_key: false,
                            is_context: false,
                        })
                    }
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

    fn context_payload() -> Vec<u8> {
        // class_id_present=1, tsi=Gps(2), tsf=RealTimePs(2).
        let header = 0x48A0_0000u32 | 46u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&header.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes()); // stream id
        buf.extend_from_slice(&0u32.to_le_bytes()); // class id word 1
        buf.extend_from_slice(&((1u32 << 16) | 2u32).to_le_bytes()); // class id word 2
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsi
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsf0
        buf.extend_from_slice(&0u32.to_le_bytes()); // tsf1
        let cif0 = 0b0011_1000_1010_0100_0000_0000_0000_1110u32;
        let cif1 = 0b1101_0011_0000_0000_0000_0000_0001_0000u32;
        let cif2 = 0b0000_0000_0000_0000_0000_0001_1000_0000u32;
        let cif3 = 0b0000_0001_1100_0000_0000_0000_0000_0000u32;
        buf.extend_from_slice(&cif0.to_le_bytes());
        buf.extend_from_slice(&cif1.to_le_bytes());
        buf.extend_from_slice(&cif2.to_le_bytes());
        buf.extend_from_slice(&cif3.to_le_bytes());
        for _ in 11..46 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        buf
    }

    #[test]
    fn context_packet_routes_to_context_sink() {
        let buf = context_payload();
        let dispatched = TangoProfile::new(false).classify(&buf, 0).unwrap();
        assert_eq!(dispatched.kind, "context");
        assert_eq!(dispatched.stream_id, Some(3));
        assert!(!dispatched.wants_context_key);
    }
}
