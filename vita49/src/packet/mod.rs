// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Packet classifier & decoder (§4.7). Each submodule owns one decoder; this
module owns the shared word-indexed view over a frame payload and the VRT
prologue (header, stream id, class id, timestamps) every VRT-family
decoder starts from.
*/

pub mod juliet_command;
pub mod juliet_context;
pub mod mblb;
pub mod signal_data;
pub mod tango_context;
pub mod tango_gps;
pub mod tango_heartbeat;

use crate::class_id::ClassIdentifier;
use crate::errors::DecodeError;
use crate::packet_header::PacketHeader;

/// A zero-copy word-indexed view over a decoded frame payload. All VRT
/// words are 32-bit little-endian by the time they reach a decoder
/// (Juliet payloads are byte-swapped at the frame boundary, §4.4; Tango
/// payloads are native little-endian already). MBLB words are 64-bit
/// little-endian, read with [`Words::u64_at`].
pub struct Words<'a> {
    buf: &'a [u8],
}

impl<'a> Words<'a> {
    /// Wraps a byte buffer for word-indexed access.
    pub fn new(buf: &'a [u8]) -> Words<'a> {
        Words { buf }
    }

    /// Number of complete 32-bit words available.
    pub fn len32(&self) -> usize {
        self.buf.len() / 4
    }

    /// Number of complete 64-bit words available.
    pub fn len64(&self) -> usize {
        self.buf.len() / 8
    }

    /// Reads the 32-bit little-endian word at word index `i`.
    pub fn u32_at(&self, i: usize) -> u32 {
        let o = i * 4;
        u32::from_le_bytes(self.buf[o..o + 4].try_into().unwrap())
    }

    /// Reads the 64-bit little-endian word at word index `i`.
    pub fn u64_at(&self, i: usize) -> u64 {
        let o = i * 8;
        u64::from_le_bytes(self.buf[o..o + 8].try_into().unwrap())
    }

    /// Reads a signed 16-bit little-endian sample at half-word index `i`
    /// (i.e. the `i`-th `i16` in the buffer).
    pub fn i16_at(&self, i: usize) -> i16 {
        let o = i * 2;
        i16::from_le_bytes(self.buf[o..o + 2].try_into().unwrap())
    }

    /// Combines the 32-bit words at `lo_idx` and `lo_idx + 1` into a 64-bit
    /// unsigned integer with `lo_idx` as the *least*-significant half —
    /// the convention produced by reinterpreting two little-endian 32-bit
    /// words as one 64-bit value in place (as opposed to [`combine`]-style
    /// decoders, which take the first word as most-significant). The Tango
    /// context decoder's 64-bit fields use this convention; see
    /// `DESIGN.md`.
    ///
    /// [`combine`]: crate::bitfields
    pub fn u64_lsw_first(&self, lo_idx: usize) -> u64 {
        let lo = self.u32_at(lo_idx) as u64;
        let hi = self.u32_at(lo_idx + 1) as u64;
        (hi << 32) | lo
    }

    /// Signed variant of [`Words::u64_lsw_first`].
    pub fn i64_lsw_first(&self, lo_idx: usize) -> i64 {
        self.u64_lsw_first(lo_idx) as i64
    }

    /// Reinterprets the 64 bits at `lo_idx`/`lo_idx + 1` (in
    /// [`Words::u64_lsw_first`] order) as an IEEE-754 double.
    pub fn f64_lsw_first(&self, lo_idx: usize) -> f64 {
        f64::from_bits(self.u64_lsw_first(lo_idx))
    }

    /// Asserts at least `words` 32-bit words are present.
    pub fn require32(&self, words: usize) -> Result<(), DecodeError> {
        if self.len32() < words {
            return Err(DecodeError::PayloadTooShort {
                wanted: words,
                got: self.len32(),
            });
        }
        Ok(())
    }

    /// Asserts at least `words` 64-bit words are present.
    pub fn require64(&self, words: usize) -> Result<(), DecodeError> {
        if self.len64() < words {
            return Err(DecodeError::PayloadTooShort {
                wanted: words,
                got: self.len64(),
            });
        }
        Ok(())
    }
}

/// The common VRT prologue: header, optional stream id, optional class id,
/// optional integer + fractional timestamp, and the word offset where the
/// packet-kind-specific payload begins (§4.3).
pub struct VrtPrologue {
    /// The packet header (word 0).
    pub header: PacketHeader,
    /// Stream identifier (word 1), when included.
    pub stream_id: Option<u32>,
    /// Class identifier (words 2-3), when included.
    pub class_id: Option<ClassIdentifier>,
    /// Integer timestamp (TSI), when included.
    pub tsi: Option<u32>,
    /// Fractional timestamp, two words (TSF), when included.
    pub tsf: Option<(u32, u32)>,
    /// Word index where the packet-specific payload begins.
    pub payload_offset: usize,
}

impl VrtPrologue {
    /// Parses the common VRT prologue from a word-indexed view.
    pub fn parse(words: &Words) -> Result<VrtPrologue, DecodeError> {
        words.require32(1)?;
        let header = PacketHeader::from_u32(words.u32_at(0));
        let mut idx = 1;

        let stream_id = if header.stream_id_included() {
            words.require32(idx + 1)?;
            let v = words.u32_at(idx);
            idx += 1;
            Some(v)
        } else {
            None
        };

        let class_id = if header.class_id_included() {
            words.require32(idx + 2)?;
            let v = ClassIdentifier::from_words(words.u32_at(idx), words.u32_at(idx + 1));
            idx += 2;
            Some(v)
        } else {
            None
        };

        let tsi = if header.integer_timestamp_included() {
            words.require32(idx + 1)?;
            let v = words.u32_at(idx);
            idx += 1;
            Some(v)
        } else {
            None
        };

        let tsf = if header.fractional_timestamp_included() {
            words.require32(idx + 2)?;
            let v = (words.u32_at(idx), words.u32_at(idx + 1));
            idx += 2;
            Some(v)
        } else {
            None
        };

        Ok(VrtPrologue {
            header,
            stream_id,
            class_id,
            tsi,
            tsf,
            payload_offset: idx,
        })
    }
}
