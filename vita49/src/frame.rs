// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Frame readers (§4.4-4.6): locate the next outer frame in a capture file,
validate its bracketing markers, and return its payload plus provenance.
One implementation per profile.
*/

use std::io::Read;

use log::warn;

use crate::errors::FramingError;
use crate::packet::mblb;
use crate::packet::Words;
use crate::record::FieldValue;

/// Anything the driver can read frames from. `std::fs::File` and
/// `std::io::Cursor<Vec<u8>>` both satisfy this.
pub trait InputStream: Read {}
impl<T: Read> InputStream for T {}

/// Where a decoded frame came from in the byte stream.
#[derive(Clone, Debug)]
pub struct FrameProvenance {
    /// Byte offset of the frame's first byte.
    pub offset: u64,
    /// Zero-based index of this frame within the stream.
    pub frame_index: usize,
    /// Payload length, in 32-bit words.
    pub word_count: usize,
}

/// A malformed-frame observation, recorded to the `bad_packets` sink.
#[derive(Clone, Debug)]
pub struct BadPacketRecord {
    /// Byte offset where the bad frame began.
    pub start_bytes: u64,
    /// Whatever bytes were recovered before the error was detected.
    pub bytes: Vec<u8>,
    /// Human-readable cause, matching spec §4.5/§4.6 wording where given.
    pub reason: String,
}

/// The result of asking a frame reader for the next frame.
pub enum FrameEvent {
    /// A well-formed frame, ready for classification.
    Frame(Vec<u8>, FrameProvenance),
    /// A malformed frame; the driver logs it and continues.
    BadPacket(BadPacketRecord),
    /// No more frames remain.
    EndOfStream,
}

/// Per-profile frame location and validation strategy.
pub trait FrameReader {
    /// Reads and validates the next frame, advancing `bytes_read` by
    /// however many bytes were consumed (including any resync preamble).
    fn next(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
    ) -> Result<FrameEvent, FramingError>;

    /// Drains any bad-packet observations logged alongside an otherwise
    /// successful frame (e.g. Tango's DEADBEEF clean, §4.5 rule 2, which
    /// both returns a cleaned frame and records the dirty original). The
    /// driver calls this after every `next()` and forwards each entry to
    /// the `bad_packets` sink.
    fn take_pending_bad_packets(&mut self) -> Vec<BadPacketRecord> {
        Vec::new()
    }

    /// Drains orphan packets observed during MikeLima's initial preamble
    /// scan (§4.6 "Initial discovery"): Start-of-Packet markers seen
    /// before the stream's first SOM. Empty for every other reader.
    fn take_pending_orphan_packets(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }
}

/// Juliet frame reader (§4.4): 12-byte little-endian header
/// `(time_msw, time_lsw, word_count)`, payload big-endian, no trailer.
#[derive(Default)]
pub struct JulietFrameReader {
    frame_index: usize,
}

impl FrameReader for JulietFrameReader {
    fn next(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
    ) -> Result<FrameEvent, FramingError> {
        let offset = *bytes_read;
        let mut header = [0u8; 12];
        let n = read_up_to(input, &mut header)?;
        if n == 0 {
            return Ok(FrameEvent::EndOfStream);
        }
        if n != 12 {
            *bytes_read += n as u64;
            return Ok(FrameEvent::BadPacket(BadPacketRecord {
                start_bytes: offset,
                bytes: header[..n].to_vec(),
                reason: format!("short Juliet frame header: wanted 12 bytes, got {n}"),
            }));
        }
        *bytes_read += 12;

        let time_msw = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let time_lsw = u32::from_le_bytes(header[4..8].try_into().unwrap());
        let word_count = u32::from_le_bytes(header[8..12].try_into().unwrap());
        if time_msw == 0 && time_lsw == 0 && word_count == 0 {
            return Ok(FrameEvent::EndOfStream);
        }

        let want = word_count as usize * 4;
        let mut payload = vec![0u8; want];
        let n = read_up_to(input, &mut payload)?;
        *bytes_read += n as u64;
        if n != want {
            return Ok(FrameEvent::BadPacket(BadPacketRecord {
                start_bytes: offset,
                bytes: payload[..n].to_vec(),
                reason: format!("short Juliet frame payload: wanted {want} bytes, got {n}"),
            }));
        }

        byte_swap_words(&mut payload);

        let provenance = FrameProvenance {
            offset,
            frame_index: self.frame_index,
            word_count: word_count as usize,
        };
        self.frame_index += 1;
        Ok(FrameEvent::Frame(payload, provenance))
    }
}

fn byte_swap_words(buf: &mut [u8]) {
    for chunk in buf.chunks_exact_mut(4) {
        chunk.swap(0, 3);
        chunk.swap(1, 2);
    }
}

const VRLP: &[u8; 4] = b"VRLP";
const VEND: &[u8; 4] = b"VEND";
const DNEV: &[u8; 4] = b"DNEV";
const DEADBEEF: [u8; 4] = [0xEF, 0xBE, 0xAD, 0xDE];

/// Tango frame reader (§4.5): `"VRLP"` marker, 4-byte header word encoding
/// `(frame_count[31:20], frame_size[19:0])`, payload, `"VEND"` trailer.
pub struct TangoFrameReader {
    frame_index: usize,
    /// Whether to excise `DEADBEEF` needles from the payload (`--clean`).
    pub clean: bool,
    pending_bad_packets: Vec<BadPacketRecord>,
}

impl TangoFrameReader {
    /// Builds a reader with the cleaning option spec §4.5 rule 2 requires.
    pub fn new(clean: bool) -> TangoFrameReader {
        TangoFrameReader {
            frame_index: 0,
            clean,
            pending_bad_packets: Vec::new(),
        }
    }
}

impl FrameReader for TangoFrameReader {
    fn next(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
    ) -> Result<FrameEvent, FramingError> {
        let start = *bytes_read;

        // Resync: advance until "VRLP" is found. Skipped bytes count toward
        // bytes_read but aren't otherwise recorded (§4.5).
        let mut window = [0u8; 4];
        if read_up_to(input, &mut window)? < 4 {
            *bytes_read += window.len() as u64;
            return Ok(FrameEvent::EndOfStream);
        }
        *bytes_read += 4;
        loop {
            if &window == VRLP {
                break;
            }
            let mut next_byte = [0u8; 1];
            let n = read_up_to(input, &mut next_byte)?;
            if n == 0 {
                return Ok(FrameEvent::EndOfStream);
            }
            *bytes_read += 1;
            window.copy_within(1..4, 0);
            window[3] = next_byte[0];
        }

        let mut header = [0u8; 4];
        if read_up_to(input, &mut header)? != 4 {
            return Ok(FrameEvent::BadPacket(BadPacketRecord {
                start_bytes: start,
                bytes: Vec::new(),
                reason: "short read of Tango frame header".into(),
            }));
        }
        *bytes_read += 4;

        let header_word = u32::from_le_bytes(header);
        let frame_count = header_word >> 20;
        let frame_size = header_word & 0x000F_FFFF;
        let _ = frame_count;

        let want = (frame_size.saturating_sub(2)) as usize * 4;
        let mut payload = vec![0u8; want];
        let n = read_up_to(input, &mut payload)?;
        *bytes_read += n as u64;
        if n != want {
            return Ok(FrameEvent::BadPacket(BadPacketRecord {
                start_bytes: start,
                bytes: payload[..n].to_vec(),
                reason: format!("short read: wanted {want} bytes, got {n}"),
            }));
        }

        let mut trailer = [0u8; 4];
        let tn = read_up_to(input, &mut trailer)?;
        *bytes_read += tn as u64;
        if tn != 4 || &trailer != VEND {
            return self.handle_malformed_trailer(input, bytes_read, start, payload, &trailer[..tn]);
        }

        if self.clean && payload.windows(4).any(|w| w == DEADBEEF) {
            return self.clean_and_finish(input, bytes_read, start, payload, frame_size);
        }

        let provenance = FrameProvenance {
            offset: start,
            frame_index: self.frame_index,
            word_count: payload.len() / 4,
        };
        self.frame_index += 1;
        Ok(FrameEvent::Frame(payload, provenance))
    }

    fn take_pending_bad_packets(&mut self) -> Vec<BadPacketRecord> {
        std::mem::take(&mut self.pending_bad_packets)
    }
}

impl TangoFrameReader {
    /// Rules 3-4 of §4.5: the trailer we read wasn't `"VEND"`. Either the
    /// declared length over-reports (`"DNEV"` is embedded earlier in the
    /// payload) or under-reports (keep consuming words until `"DNEV"`).
    fn handle_malformed_trailer(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
        start: u64,
        mut payload: Vec<u8>,
        trailer_read: &[u8],
    ) -> Result<FrameEvent, FramingError> {
        if let Some(pos) = find_subslice(&payload, DNEV) {
            payload.truncate(pos);
            self.frame_index += 1;
            return Ok(FrameEvent::BadPacket(BadPacketRecord {
                start_bytes: start,
                bytes: payload,
                reason: "DNEV within payload".into(),
            }));
        }

        // Keep consuming 4-byte words until "DNEV" appears or EOF.
        let mut tail = trailer_read.to_vec();
        loop {
            if let Some(pos) = find_subslice(&tail, DNEV) {
                tail.truncate(pos);
                break;
            }
            let mut word = [0u8; 4];
            let n = read_up_to(input, &mut word)?;
            *bytes_read += n as u64;
            if n == 0 {
                warn!("Could not find DNEV trailer before end of stream");
                break;
            }
            tail.extend_from_slice(&word[..n]);
        }
        payload.extend_from_slice(&tail);
        self.frame_index += 1;
        Ok(FrameEvent::BadPacket(BadPacketRecord {
            start_bytes: start,
            bytes: payload,
            reason: "Could not find DNEV trailer at declared frame end".into(),
        }))
    }

    /// Rule 2 of §4.5: excise every `DEADBEEF` occurrence. Declared frame
    /// length accounted for the junk words, so for each occurrence removed
    /// an equal number of bytes are pulled from the stream and discarded
    /// (keeping the cursor aligned with the next frame) rather than
    /// appended to the returned payload.
    fn clean_and_finish(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
        start: u64,
        payload: Vec<u8>,
        frame_size: u32,
    ) -> Result<FrameEvent, FramingError> {
        let dirty = payload.clone();
        let mut cleaned = payload;
        let _ = frame_size;
        loop {
            let Some(pos) = find_subslice(&cleaned, &DEADBEEF) else {
                break;
            };
            cleaned.drain(pos..pos + 4);
            let mut extra = [0u8; 4];
            let n = read_up_to(input, &mut extra)?;
            *bytes_read += n as u64;
            let _ = extra;
        }

        warn!("DEADBEEF found in payload at Tango frame offset {start}");
        self.pending_bad_packets.push(BadPacketRecord {
            start_bytes: start,
            bytes: dirty,
            reason: "DEADBEEF found in payload".into(),
        });

        let provenance = FrameProvenance {
            offset: start,
            frame_index: self.frame_index,
            word_count: cleaned.len() / 4,
        };
        self.frame_index += 1;
        Ok(FrameEvent::Frame(cleaned, provenance))
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn read_up_to(input: &mut dyn InputStream, buf: &mut [u8]) -> Result<usize, FramingError> {
    let mut total = 0;
    while total < buf.len() {
        let n = input.read(&mut buf[total..]).map_err(|_| FramingError::ShortRead {
            wanted: buf.len(),
            got: total,
        })?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// MikeLima SOM marker: three repeats of this 8-byte pattern open a message.
pub(crate) const MBLB_SOM_MARKER: [u8; 8] = [0xF0, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F];
/// MikeLima SOP marker: opens a per-lane data packet inside a message.
pub(crate) const MBLB_SOP_MARKER: [u8; 8] = [0xF1, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F];
/// MikeLima EOM marker: closes a message.
pub(crate) const MBLB_EOM_MARKER: [u8; 8] = [0xF2, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F, 0xFF, 0x7F];

fn is_unhandled_marker(word: &[u8; 8]) -> bool {
    matches!(word[0], 0xF3 | 0xF7 | 0xF8 | 0xF9 | 0xFA) && word[1..] == MBLB_SOM_MARKER[1..]
}

/// Byte length of the three-lane MBLB packet header (§4.6).
const MBLB_PACKET_HEADER_BYTES: usize = 96;

/// One fully-read MikeLima message: a SOM header, its packets (still raw
/// bytes; per-lane decoding happens in `profile::mikelima`), and an EOM
/// trailer.
pub(crate) struct MblbMessage {
    /// 288-byte (36-word) SOM header.
    pub som_header: Vec<u8>,
    /// Raw bytes of every SOP-delimited packet encountered, in order.
    pub packets: Vec<Vec<u8>>,
    /// EOM trailer bytes (21 or 22 words, by IQ type; §9 Open Questions).
    pub eom_trailer: Vec<u8>,
}

/// MikeLima frame reader (§4.6). Unlike Juliet/Tango this reads one
/// *message* (SOM + N packets + EOM) per call rather than a single VRT
/// frame; the resulting packets are handed to the classifier individually.
#[derive(Default)]
pub struct MikeLimaFrameReader {
    frame_index: usize,
    /// Packet data size in bytes for a single lane's worth of payload,
    /// `4 * dwell * (1280 / 2^rx_config) * beam_count`. Resolved once the
    /// first packet header of a message has been read.
    beam_count: Option<usize>,
    /// Whether the initial preamble scan (§4.6 "Initial discovery") has
    /// run yet. Orphan-packet collection is scoped to that one scan.
    first_scan_done: bool,
    /// Orphan packets (header + payload bytes) found before the stream's
    /// first SOM, awaiting `take_pending_orphan_packets`.
    pending_orphan_packets: Vec<Vec<u8>>,
}

fn som_dwell(header_buf: &[u8]) -> usize {
    let words = Words::new(header_buf);
    match mblb::decode_som(&words, 0.0) {
        Ok(record) => match record.get("dwell") {
            Some(FieldValue::F64(v)) if *v > 0.0 => *v as usize,
            _ => 1,
        },
        Err(_) => 1,
    }
}

fn packet_rx_config(lane_headers: &[u8]) -> u32 {
    let words = Words::new(lane_headers);
    match mblb::decode_packet_header(&words) {
        Ok(record) => match record.get("rx_config") {
            Some(FieldValue::U8(v)) => *v as u32,
            _ => 0,
        },
        Err(_) => 0,
    }
}

fn header_packet_size(header: &[u8]) -> usize {
    let words = Words::new(header);
    match mblb::decode_packet_header(&words) {
        Ok(record) => match record.get("packet_size") {
            Some(FieldValue::U32(v)) => *v as usize,
            _ => 0,
        },
        Err(_) => 0,
    }
}

impl MikeLimaFrameReader {
    /// `beam_count = 2` for IQ type 0, `3` for IQ type 5 (§4.6).
    pub fn new(iq_type: u8) -> MikeLimaFrameReader {
        MikeLimaFrameReader {
            frame_index: 0,
            beam_count: Some(if iq_type == 5 { 3 } else { 2 }),
            first_scan_done: false,
            pending_orphan_packets: Vec::new(),
        }
    }
}

impl FrameReader for MikeLimaFrameReader {
    fn next(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
    ) -> Result<FrameEvent, FramingError> {
        let start = *bytes_read;
        // Bytes preceding the SOM marker carry a timestamp/filename preamble
        // (§4.6); this engine doesn't parse it, only accounts for its bytes.
        // The very first such scan also collects any SOP-delimited orphan
        // packets seen ahead of the stream's first SOM ("Initial discovery").
        let collect_orphans = !self.first_scan_done;
        let found = self.find_marker(input, bytes_read, &MBLB_SOM_MARKER, collect_orphans)?;
        self.first_scan_done = true;
        if found.is_none() {
            return Ok(FrameEvent::EndOfStream);
        }

        let mut header_buf = vec![0u8; 288];
        let n = read_up_to(input, &mut header_buf)?;
        *bytes_read += n as u64;
        if n != 288 {
            return Ok(FrameEvent::BadPacket(BadPacketRecord {
                start_bytes: start,
                bytes: header_buf[..n].to_vec(),
                reason: "short read of MBLB SOM header".into(),
            }));
        }

        let dwell = som_dwell(&header_buf);
        let mut packets = Vec::new();
        loop {
            let mut marker = [0u8; 8];
            let n = read_up_to(input, &mut marker)?;
            *bytes_read += n as u64;
            if n != 8 {
                return Ok(self.truncated_message(start, header_buf, packets));
            }

            if marker == MBLB_SOP_MARKER {
                let mut rest = [0u8; 16];
                let n = read_up_to(input, &mut rest)?;
                *bytes_read += n as u64;
                if n != 16 {
                    return Ok(self.truncated_message(start, header_buf, packets));
                }
                let mut lane_headers = vec![0u8; 96];
                let n = read_up_to(input, &mut lane_headers)?;
                *bytes_read += n as u64;
                if n != 96 {
                    return Ok(self.truncated_message(start, header_buf, packets));
                }

                let rx_config = packet_rx_config(&lane_headers);
                let beam_count = self.beam_count.unwrap_or(2);
                let data_len =
                    4 * dwell.max(1) * (1280usize >> rx_config.min(10)) * beam_count;

                let mut packet_data = vec![0u8; data_len];
                let n = read_up_to(input, &mut packet_data)?;
                *bytes_read += n as u64;
                if n != data_len {
                    return Ok(self.truncated_message(start, header_buf, packets));
                }

                let mut packet = Vec::with_capacity(96 + data_len);
                packet.extend_from_slice(&lane_headers);
                packet.extend_from_slice(&packet_data);
                packets.push(packet);
            } else if marker == MBLB_EOM_MARKER {
                let mut rest = [0u8; 16];
                let n = read_up_to(input, &mut rest)?;
                *bytes_read += n as u64;
                if n != 16 {
                    return Ok(self.truncated_message(start, header_buf, packets));
                }
                // 22 words for most IQ types, 21 for IQ5; see §9 Open
                // Questions for the 22x8-vs-24x8 inconsistency this
                // preserves rather than normalizes.
                let eom_len = if self.beam_count == Some(3) { 21 } else { 22 };
                let mut eom_trailer = vec![0u8; eom_len * 8];
                let n = read_up_to(input, &mut eom_trailer)?;
                *bytes_read += n as u64;
                if n != eom_trailer.len() {
                    return Ok(self.truncated_message(start, header_buf, packets));
                }

                let provenance = FrameProvenance {
                    offset: start,
                    frame_index: self.frame_index,
                    word_count: (header_buf.len() + packets.iter().map(|p| p.len()).sum::<usize>())
                        / 4,
                };
                self.frame_index += 1;
                let message = MblbMessage {
                    som_header: header_buf,
                    packets,
                    eom_trailer,
                };
                return Ok(FrameEvent::Frame(encode_message(&message), provenance));
            } else if is_unhandled_marker(&marker) {
                return Err(FramingError::UnhandledMarker(format!(
                    "{:02X?}",
                    marker
                )));
            }
            // Anything else: continue scanning (§4.6).
        }
    }

    fn take_pending_orphan_packets(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_orphan_packets)
    }
}

impl MikeLimaFrameReader {
    fn find_marker(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
        marker: &[u8; 8],
        collect_orphans: bool,
    ) -> Result<Option<Vec<u8>>, FramingError> {
        let mut preamble = Vec::new();
        let mut word = [0u8; 8];
        loop {
            let n = read_up_to(input, &mut word)?;
            if n == 0 {
                return Ok(None);
            }
            *bytes_read += n as u64;
            if n == 8 && &word == marker {
                return Ok(Some(preamble));
            }
            if collect_orphans && n == 8 && word == MBLB_SOP_MARKER {
                if let Some(orphan) = self.read_orphan_packet(input, bytes_read)? {
                    self.pending_orphan_packets.push(orphan);
                }
                continue;
            }
            preamble.extend_from_slice(&word[..n]);
        }
    }

    /// Reads one orphan packet (§4.6 "Initial discovery"): the SOP marker
    /// itself is already consumed by the caller. Layout is 16 bytes of
    /// repeated marker/rest, then the 96-byte lane header, then
    /// `packet_size` bytes of sample data taken from the header itself
    /// (no enclosing SOM/dwell value is known yet). Returns `None` on a
    /// short read, same as a truncated in-message packet.
    fn read_orphan_packet(
        &mut self,
        input: &mut dyn InputStream,
        bytes_read: &mut u64,
    ) -> Result<Option<Vec<u8>>, FramingError> {
        let mut rest = [0u8; 16];
        let n = read_up_to(input, &mut rest)?;
        *bytes_read += n as u64;
        if n != 16 {
            return Ok(None);
        }

        let mut header = vec![0u8; MBLB_PACKET_HEADER_BYTES];
        let n = read_up_to(input, &mut header)?;
        *bytes_read += n as u64;
        if n != MBLB_PACKET_HEADER_BYTES {
            return Ok(None);
        }

        let data_len = header_packet_size(&header);
        let mut data = vec![0u8; data_len];
        let n = read_up_to(input, &mut data)?;
        *bytes_read += n as u64;
        if n != data_len {
            return Ok(None);
        }

        let mut packet = Vec::with_capacity(header.len() + data.len());
        packet.extend_from_slice(&header);
        packet.extend_from_slice(&data);
        Ok(Some(packet))
    }

    fn truncated_message(
        &mut self,
        start: u64,
        header: Vec<u8>,
        packets: Vec<Vec<u8>>,
    ) -> FrameEvent {
        warn!("MBLB message truncated by EOF or short read; emitting zeroed EOM");
        let message = MblbMessage {
            som_header: header,
            packets,
            eom_trailer: vec![0u8; 22 * 8],
        };
        self.frame_index += 1;
        FrameEvent::BadPacket(BadPacketRecord {
            start_bytes: start,
            bytes: encode_message(&message),
            reason: "message truncated before EOM".into(),
        })
    }
}

/// Serializes a parsed MBLB message back to a flat byte buffer for handoff
/// to `profile::mikelima`, which re-slices it into SOM/packet/EOM spans.
fn encode_message(message: &MblbMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        message.som_header.len()
            + message.packets.iter().map(|p| p.len()).sum::<usize>()
            + message.eom_trailer.len(),
    );
    buf.extend_from_slice(&message.som_header);
    for packet in &message.packets {
        buf.extend_from_slice(packet);
    }
    buf.extend_from_slice(&message.eom_trailer);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn juliet_reads_header_and_byte_swaps_payload() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&123456789u32.to_le_bytes()); // time_lsw position unused here
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes()); // word_count = 1
        buf.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]); // big-endian payload word
        let mut cursor = Cursor::new(buf);
        let mut reader = JulietFrameReader::default();
        let mut bytes_read = 0u64;
        match reader.next(&mut cursor, &mut bytes_read).unwrap() {
            FrameEvent::Frame(payload, prov) => {
                assert_eq!(payload, vec![0x04, 0x03, 0x02, 0x01]);
                assert_eq!(prov.word_count, 1);
            }
            _ => panic!("expected a frame"),
        }
        assert_eq!(bytes_read, 12 + 4);
    }

    #[test]
    fn juliet_zero_header_is_end_of_stream() {
        let buf = vec![0u8; 12];
        let mut cursor = Cursor::new(buf);
        let mut reader = JulietFrameReader::default();
        let mut bytes_read = 0u64;
        assert!(matches!(
            reader.next(&mut cursor, &mut bytes_read).unwrap(),
            FrameEvent::EndOfStream
        ));
    }

    fn tango_frame(payload: &[u8]) -> Vec<u8> {
        let frame_size = (payload.len() / 4) as u32 + 2;
        let mut buf = Vec::new();
        buf.extend_from_slice(VRLP);
        buf.extend_from_slice(&frame_size.to_le_bytes());
        buf.extend_from_slice(payload);
        buf.extend_from_slice(VEND);
        buf
    }

    #[test]
    fn tango_resyncs_past_leading_garbage() {
        let payload = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut buf = vec![0xAA; 7];
        buf.extend_from_slice(&tango_frame(&payload));
        let mut cursor = Cursor::new(buf);
        let mut reader = TangoFrameReader::new(false);
        let mut bytes_read = 0u64;
        match reader.next(&mut cursor, &mut bytes_read).unwrap() {
            FrameEvent::Frame(p, _) => assert_eq!(p, payload),
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn tango_rejects_wrong_trailer_without_dnev() {
        let payload = [1u8, 2, 3, 4];
        let mut buf = Vec::new();
        buf.extend_from_slice(VRLP);
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&payload);
        buf.extend_from_slice(b"XYZW");
        let mut cursor = Cursor::new(buf);
        let mut reader = TangoFrameReader::new(false);
        let mut bytes_read = 0u64;
        match reader.next(&mut cursor, &mut bytes_read).unwrap() {
            FrameEvent::BadPacket(b) => assert!(b.reason.contains("DNEV")),
            _ => panic!("expected a bad packet"),
        }
    }

    #[test]
    fn tango_cleans_deadbeef_when_enabled() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.extend_from_slice(&DEADBEEF);
        payload.extend_from_slice(&DEADBEEF);
        payload.extend_from_slice(&3u32.to_le_bytes());
        payload.extend_from_slice(&4u32.to_le_bytes());
        payload.extend_from_slice(&5u32.to_le_bytes());
        let mut buf = tango_frame(&payload);
        // Two DEADBEEF words are excised; an equal number of trailing
        // bytes must still be consumable from the stream to keep the
        // cursor aligned with the next frame.
        buf.extend_from_slice(&[0xAA; 4]);
        buf.extend_from_slice(&[0xBB; 4]);
        let mut cursor = Cursor::new(buf);
        let mut reader = TangoFrameReader::new(true);
        let mut bytes_read = 0u64;
        match reader.next(&mut cursor, &mut bytes_read).unwrap() {
            FrameEvent::Frame(p, _) => {
                let words: Vec<u32> = p
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
                    .collect();
                assert_eq!(words, vec![1, 2, 3, 4, 5]);
            }
            _ => panic!("expected a cleaned frame"),
        }
    }

    #[test]
    fn mikelima_collects_orphan_packet_before_first_som() {
        let mut words = vec![0u64; 12];
        let packet_size: u64 = 8;
        words[3] = packet_size << 32;
        let mut header = Vec::with_capacity(96);
        for w in &words {
            header.extend_from_slice(&w.to_le_bytes());
        }

        let mut buf = Vec::new();
        buf.extend_from_slice(&MBLB_SOP_MARKER);
        buf.extend_from_slice(&[0u8; 16]);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&vec![0u8; packet_size as usize]);

        let mut cursor = Cursor::new(buf);
        let mut reader = MikeLimaFrameReader::new(0);
        let mut bytes_read = 0u64;
        assert!(matches!(
            reader.next(&mut cursor, &mut bytes_read).unwrap(),
            FrameEvent::EndOfStream
        ));
        let orphans = reader.take_pending_orphan_packets();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].len(), 96 + packet_size as usize);
    }
}
