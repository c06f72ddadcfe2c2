// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Data structures and methods related to the common VRT packet header
(ANSI/VITA-49.2-2017 section 5.1.1): `packet_type[31:28]`,
`class_id_present[27]`, `indicators[26:24]`, `tsi[23:22]`, `tsf[21:20]`,
`packet_count[19:16]`, `packet_size[15:0]`.
*/

use deku::prelude::*;

/// Base packet header data structure.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, DekuRead, DekuWrite,
)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketHeader {
    hword_1: u16,
    packet_size: u16,
}

/// The kind of VRT packet this header describes, as recognized by the three
/// profiles (Juliet, Tango, MikeLima uses its own non-VRT framing and does
/// not go through this type).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PacketType {
    /// Signal data packet without a stream ID.
    #[deku(id = 0x0)]
    SignalDataWithoutStreamId,
    /// Signal data packet *with* a stream ID. Juliet and Tango signal-data.
    #[deku(id = 0x1)]
    SignalData,
    /// Extension data packet without a stream ID.
    #[deku(id = 0x2)]
    ExtensionDataWithoutStreamId,
    /// Extension data packet *with* a stream ID.
    #[deku(id = 0x3)]
    ExtensionData,
    /// Context packet. Tango context, Juliet data-context.
    #[deku(id = 0x4)]
    Context,
    /// Extension context packet. Tango heartbeat-context and GPS-context.
    #[deku(id = 0x5)]
    ExtensionContext,
    /// Command packet.
    #[deku(id = 0x6)]
    Command,
    /// Extension command packet. Juliet extension-command and AckR.
    #[deku(id = 0x7)]
    ExtensionCommand,
    // All other values are reserved.
}

impl TryFrom<u8> for PacketType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == PacketType::SignalDataWithoutStreamId as u8 => {
                Ok(PacketType::SignalDataWithoutStreamId)
            }
            x if x == PacketType::SignalData as u8 => Ok(PacketType::SignalData),
            x if x == PacketType::ExtensionDataWithoutStreamId as u8 => {
                Ok(PacketType::ExtensionDataWithoutStreamId)
            }
            x if x == PacketType::ExtensionData as u8 => Ok(PacketType::ExtensionData),
            x if x == PacketType::Context as u8 => Ok(PacketType::Context),
            x if x == PacketType::ExtensionContext as u8 => Ok(PacketType::ExtensionContext),
            x if x == PacketType::Command as u8 => Ok(PacketType::Command),
            x if x == PacketType::ExtensionCommand as u8 => Ok(PacketType::ExtensionCommand),
            _ => Err(()),
        }
    }
}

/// Indicator field enumeration. The three indicator bits have different
/// meaning depending on whether the packet is a signal-data, context, or
/// command packet.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, DekuRead, DekuWrite)]
#[deku(
    endian = "endian",
    ctx = "endian: deku::ctx::Endian, packet_type: PacketType",
    id = "packet_type"
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Indicators {
    /// The bits represent signal data indicators.
    #[deku(id = "PacketType::SignalData")]
    SignalData(SignalDataIndicators),
    /// The bits represent signal data indicators (no stream id variant).
    #[deku(id = "PacketType::SignalDataWithoutStreamId")]
    SignalDataNoStreamId(SignalDataIndicators),
    /// The bits represent context indicators.
    #[deku(id = "PacketType::Context")]
    Context(ContextIndicators),
    /// The bits represent extension-context indicators.
    #[deku(id = "PacketType::ExtensionContext")]
    ExtensionContext(ContextIndicators),
    /// The bits represent command indicators.
    #[deku(id = "PacketType::Command")]
    Command(CommandIndicators),
    /// The bits represent extension-command indicators.
    #[deku(id = "PacketType::ExtensionCommand")]
    ExtensionCommand(CommandIndicators),
}

/// Signal data indicator fields.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, DekuRead, DekuWrite,
)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalDataIndicators {
    /// The packet includes a trailer (§4.7 `trailer_present`).
    pub trailer_included: bool,
    /// The packet is not compliant with VITA 49.0.
    pub not_a_vita490_packet: bool,
    /// The signal data represents spectral data.
    pub signal_spectral_data: bool,
}

/// Context packet indicator fields.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, DekuRead, DekuWrite)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextIndicators {
    /// The packet is not compliant with VITA 49.0.
    pub not_a_vita490_packet: bool,
    /// Reserved bit.
    pub reserved: bool,
    /// Context timestamp mode.
    pub timestamp_mode: bool,
}

/// Command packet indicators. `ack_packet` set identifies an AckR packet;
/// unset with an `ExtensionCommand` packet type identifies a scheduling /
/// control Extension-Command.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, DekuRead, DekuWrite,
)]
#[deku(endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandIndicators {
    /// The command packet is an ACK packet (AckR).
    pub ack_packet: bool,
    /// Reserved bit.
    pub reserved: bool,
    /// The command packet is a cancellation packet.
    pub cancellation_packet: bool,
}

/// TimeStamp-Integer (TSI) field.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tsi {
    /// Timestamp is not included.
    #[deku(id = 0x0)]
    Null,
    /// Timestamp represents UTC time.
    #[deku(id = 0x1)]
    Utc,
    /// Timestamp represents GPS time.
    #[deku(id = 0x2)]
    Gps,
    /// Timestamp represents some other time.
    #[deku(id = 0x3)]
    Other,
}

impl TryFrom<u8> for Tsi {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == Tsi::Null as u8 => Ok(Tsi::Null),
            x if x == Tsi::Utc as u8 => Ok(Tsi::Utc),
            x if x == Tsi::Gps as u8 => Ok(Tsi::Gps),
            x if x == Tsi::Other as u8 => Ok(Tsi::Other),
            _ => Err(()),
        }
    }
}

/// TimeStamp-Fractional (TSF) field.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, DekuRead, DekuWrite)]
#[deku(id_type = "u8", endian = "endian", ctx = "endian: deku::ctx::Endian")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tsf {
    /// Timestamp is not included.
    #[deku(id = 0x0)]
    Null,
    /// Timestamp represents a sample counter.
    #[deku(id = 0x1)]
    SampleCount,
    /// Timestamp represents a real fractional time (in picoseconds).
    #[deku(id = 0x2)]
    RealTimePs,
    /// Timestamp represents a free-running count.
    #[deku(id = 0x3)]
    FreeRunningCount,
}

impl TryFrom<u8> for Tsf {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            x if x == Tsf::Null as u8 => Ok(Tsf::Null),
            x if x == Tsf::SampleCount as u8 => Ok(Tsf::SampleCount),
            x if x == Tsf::RealTimePs as u8 => Ok(Tsf::RealTimePs),
            x if x == Tsf::FreeRunningCount as u8 => Ok(Tsf::FreeRunningCount),
            _ => Err(()),
        }
    }
}

impl PacketHeader {
    /// Builds a header directly from its raw 32-bit value (as read,
    /// post byte-swap, from word 0 of a frame payload).
    pub fn from_u32(value: u32) -> PacketHeader {
        PacketHeader {
            hword_1: (value >> 16) as u16,
            packet_size: (value & 0xFFFF) as u16,
        }
    }

    /// Gets the raw 32-bit value of the packet header.
    pub fn as_u32(&self) -> u32 {
        ((self.hword_1 as u32) << 16) | ((self.packet_size as u32) & 0xFFFF)
    }

    /// Gets the packet type.
    pub fn packet_type(&self) -> PacketType {
        (((self.hword_1 >> 12) & 0b1111) as u8).try_into().unwrap()
    }

    /// Returns true if a class identifier is included in the packet.
    pub fn class_id_included(&self) -> bool {
        self.hword_1 & (1 << 11) > 0
    }

    /// Returns the raw indicator bits, disambiguated by packet type.
    pub fn indicators(&self) -> Indicators {
        let i1 = self.hword_1 & (1 << 10) > 0;
        let i2 = self.hword_1 & (1 << 9) > 0;
        let i3 = self.hword_1 & (1 << 8) > 0;
        match self.packet_type() {
            PacketType::SignalData => Indicators::SignalData(SignalDataIndicators {
                trailer_included: i1,
                not_a_vita490_packet: i2,
                signal_spectral_data: i3,
            }),
            PacketType::SignalDataWithoutStreamId => {
                Indicators::SignalDataNoStreamId(SignalDataIndicators {
                    trailer_included: i1,
                    not_a_vita490_packet: i2,
                    signal_spectral_data: i3,
                })
            }
            PacketType::Context => Indicators::Context(ContextIndicators {
                not_a_vita490_packet: i1,
                reserved: i2,
                timestamp_mode: i3,
            }),
            PacketType::ExtensionContext => Indicators::ExtensionContext(ContextIndicators {
                not_a_vita490_packet: i1,
                reserved: i2,
                timestamp_mode: i3,
            }),
            PacketType::Command => Indicators::Command(CommandIndicators {
                ack_packet: i1,
                reserved: i2,
                cancellation_packet: i3,
            }),
            PacketType::ExtensionCommand | PacketType::ExtensionData => {
                Indicators::ExtensionCommand(CommandIndicators {
                    ack_packet: i1,
                    reserved: i2,
                    cancellation_packet: i3,
                })
            }
        }
    }

    /// Gets the raw three indicator bits as a `0..8` value, independent of
    /// packet-type disambiguation. Used by the classifier's dispatch table.
    pub fn raw_indicators(&self) -> u8 {
        ((self.hword_1 >> 8) & 0b111) as u8
    }

    /// Gets the TimeStamp-Integer (TSI) field.
    pub fn tsi(&self) -> Tsi {
        (((self.hword_1 >> 6) & 0b11) as u8).try_into().unwrap()
    }

    /// Gets the TimeStamp-Fractional (TSF) field.
    pub fn tsf(&self) -> Tsf {
        (((self.hword_1 >> 4) & 0b11) as u8).try_into().unwrap()
    }

    /// Gets the modulo-16 packet counter field.
    pub fn packet_count(&self) -> u8 {
        (self.hword_1 & 0b1111) as u8
    }

    /// Gets the packet size field (32-bit words, header included).
    pub fn packet_size(&self) -> u16 {
        self.packet_size
    }

    /// Returns true if a stream ID is included, false if not.
    pub fn stream_id_included(&self) -> bool {
        !matches!(
            &self.packet_type(),
            PacketType::SignalDataWithoutStreamId | PacketType::ExtensionDataWithoutStreamId
        )
    }

    /// Returns true if an integer timestamp is included, false if not.
    pub fn integer_timestamp_included(&self) -> bool {
        self.tsi() != Tsi::Null
    }

    /// Returns true if a fractional timestamp is included, false if not.
    pub fn fractional_timestamp_included(&self) -> bool {
        self.tsf() != Tsf::Null
    }

    /// Returns the payload size in 32-bit words: `packet_size` minus the
    /// header word and every optional prologue field that is present.
    pub fn payload_size_words(&self) -> usize {
        let mut ret = self.packet_size as usize - 1;
        if self.stream_id_included() {
            ret -= 1;
        }
        if self.class_id_included() {
            ret -= 2;
        }
        if self.integer_timestamp_included() {
            ret -= 1;
        }
        if self.fractional_timestamp_included() {
            ret -= 2;
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_raw_u32() {
        // packet_type=0b0001, class_id_present=1, indicators=0b000,
        // tsi=0b01 (Utc), tsf=0b10 (RealTimePs), packet_count=0b0110,
        // packet_size=5
        let raw = 0x1866_0005u32;
        let header = PacketHeader::from_u32(raw);
        assert_eq!(header.as_u32(), raw);
        assert_eq!(header.packet_type(), PacketType::SignalData);
        assert!(header.class_id_included());
        assert_eq!(header.tsi(), Tsi::Utc);
        assert_eq!(header.tsf(), Tsf::RealTimePs);
        assert_eq!(header.packet_count(), 0b0110);
        assert_eq!(header.packet_size(), 5);
    }

    #[test]
    fn signal_data_indicators_decode_trailer_bit() {
        // packet_type=0b0001 (SignalData), indicators bits set to 0b100 (trailer only)
        let raw = 0x1400_0000u32;
        let header = PacketHeader::from_u32(raw);
        match header.indicators() {
            Indicators::SignalData(i) => {
                assert!(i.trailer_included);
                assert!(!i.not_a_vita490_packet);
                assert!(!i.signal_spectral_data);
            }
            _ => panic!("expected SignalData indicators"),
        }
    }

    #[test]
    fn command_indicators_disambiguate_ack_from_extension_command() {
        let raw = 0x7400_0000u32;
        let header = PacketHeader::from_u32(raw);
        match header.indicators() {
            Indicators::ExtensionCommand(i) => assert!(i.ack_packet),
            _ => panic!("expected ExtensionCommand indicators"),
        }
    }

    #[test]
    fn payload_size_words_accounts_for_optional_prologue_fields() {
        // packet_size = 10 words; stream id + 2 class id words + 1 int ts + 2 frac ts = 6 overhead + 1 header
        let raw = 0x1850_0000u32 | 10u32;
        let header = PacketHeader::from_u32(raw);
        assert_eq!(header.payload_size_words(), 10 - 1 - 1 - 2 - 1 - 2);
    }
}
