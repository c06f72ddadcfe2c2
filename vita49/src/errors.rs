// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Error types for the `vita49` crate. Errors are split along the taxonomy
the driver distinguishes between at runtime: framing errors are locally
recovered and logged, decode errors drop a single record, sink errors
disable a sink, and everything else is fatal.
*/

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or validating an outer frame.
#[derive(Error, Debug)]
pub enum FramingError {
    /// The stream ended where a frame was expected.
    #[error("end of stream")]
    EndOfStream,
    /// Fewer bytes were available than the frame declared.
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead {
        /// Bytes the frame declared it needed.
        wanted: usize,
        /// Bytes actually read before the stream ran out.
        got: usize,
    },
    /// A bracketing marker (`VRLP`/`VEND`, SOM/SOP/EOM) did not match.
    #[error("marker mismatch: {0}")]
    MarkerMismatch(String),
    /// The frame's declared length was inconsistent with its content.
    #[error("length inconsistency: {0}")]
    LengthInconsistency(String),
    /// A marker from a set the engine doesn't handle was encountered.
    #[error("unhandled marker: {0}")]
    UnhandledMarker(String),
}

/// Errors raised while decoding a recognized packet's fields.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The classifier found no dispatch entry for this packet shape.
    #[error("unknown packet type (packet_type={packet_type:#06b}, indicators={indicators:#05b})")]
    UnknownPacketType {
        /// The packet_type nibble.
        packet_type: u8,
        /// The three indicator bits.
        indicators: u8,
    },
    /// A CIF bitmask or class-code assertion the decoder requires did not hold.
    #[error("schema assertion failed: {0}")]
    SchemaAssertion(String),
    /// A payload was shorter than the decoder's fixed word layout requires.
    #[error("payload too short: wanted at least {wanted} words, got {got}")]
    PayloadTooShort {
        /// Minimum words the decoder needs.
        wanted: usize,
        /// Words actually present.
        got: usize,
    },
}

/// Errors raised from the columnar writer tier.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink's underlying writer could not be opened.
    #[error("failed to open sink at {path}: {source}")]
    Open {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A record failed to convert into a row of the sink's declared schema.
    #[error("schema mismatch in sink: {0}")]
    SchemaMismatch(String),
    /// A write to the sink's underlying storage failed.
    #[error("write failed: {0}")]
    Write(String),
    /// Existing data was found at a partitioned sink's destination and the
    /// configured existing-data policy rejected the run.
    #[error("existing data at {0} and the existing-data policy is `error`")]
    ExistingData(PathBuf),
}

/// Top-level engine error, covering every stage of the pipeline driver.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Framing-level failure, not locally recoverable.
    #[error(transparent)]
    Framing(#[from] FramingError),
    /// Packet-decode failure.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Sink-tier failure.
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// The requested profile name did not resolve to exactly one descriptor.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),
    /// Input or output path could not be used.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}
