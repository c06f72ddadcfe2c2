// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Profile registry (§4.1, §C.2): maps a profile name to a profile
descriptor (framing strategy, packet-kind dispatch table, sink-key
schema table). Populated from a static table at startup — never by
scanning a directory for loadable plugins.
*/

pub mod juliet;
pub mod mikelima;
pub mod tango;

use std::str::FromStr;

use crate::errors::{DecodeError, EngineError};
use crate::frame::FrameReader;
use crate::record::{Record, Schema};

/// One of the three supported acquisition front-ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProfileName {
    /// VRT framing with byte-swapped big-endian payloads, no trailer.
    Juliet,
    /// VRT framing bracketed by `VRLP`/`VEND` markers.
    Tango,
    /// Non-VRT multi-lane Message/Packet/EndOfMessage framing.
    MikeLima,
}

impl FromStr for ProfileName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<ProfileName, EngineError> {
        match s {
            "juliet" => Ok(ProfileName::Juliet),
            "tango" => Ok(ProfileName::Tango),
            "mikelima" => Ok(ProfileName::MikeLima),
            other => Err(EngineError::UnknownProfile(other.to_string())),
        }
    }
}

impl ProfileName {
    /// The profile's name as it appears on the CLI and in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileName::Juliet => "juliet",
            ProfileName::Tango => "tango",
            ProfileName::MikeLima => "mikelima",
        }
    }
}

/// A single classified, decoded record: which sink kind it belongs to,
/// the record itself, and the stream id used by context-key association
/// (`None` for kinds association doesn't apply to, e.g. MikeLima).
pub struct Dispatched {
    /// Sink key this record routes to (e.g. `"data"`, `"context"`).
    pub kind: &'static str,
    /// The decoded record.
    pub record: Record,
    /// Stream id, when the packet kind carries one.
    pub stream_id: Option<u32>,
    /// True if this record kind is signal-data and should receive a
    /// context key from the association table (§4.8).
    pub wants_context_key: bool,
    /// True if this record kind is a context packet and should update
    /// the association table's `stream_id -> context_key` entry (§4.8).
    pub is_context: bool,
}

/// A profile descriptor: framing, classification/decoding, and the set
/// of sink kinds (with their declared schemas) it can emit.
pub trait Profile {
    /// This profile's name.
    fn name(&self) -> ProfileName;

    /// Builds a fresh frame reader for this profile.
    fn frame_reader(&self) -> Box<dyn FrameReader>;

    /// Declared `(sink_key, schema)` pairs, in the order sinks should be
    /// opened/listed in run metadata.
    fn sink_schemas(&self) -> Vec<(&'static str, Schema)>;

    /// Classifies and decodes one frame's payload into a record, routed
    /// to a sink kind. For Juliet/Tango a frame carries exactly one
    /// packet; see [`Profile::classify_multi`] for MikeLima, whose frame
    /// is a composite message.
    fn classify(&self, payload: &[u8], frame_index: usize) -> Result<Dispatched, DecodeError>;

    /// Classifies and decodes one frame's payload into zero or more
    /// records. The default wraps [`Profile::classify`]; MikeLima
    /// overrides this since one message frame yields a SOM record, N
    /// packet records, and an EOM record.
    fn classify_multi(
        &self,
        payload: &[u8],
        frame_index: usize,
    ) -> Result<Vec<Dispatched>, DecodeError> {
        Ok(vec![self.classify(payload, frame_index)?])
    }

    /// Classifies and decodes one orphan packet: a header + payload seen
    /// before any enclosing frame was recognized (MikeLima §4.6 "Initial
    /// discovery"). Profiles with no orphan concept reject every call.
    fn classify_orphan(&self, _packet: &[u8]) -> Result<Dispatched, DecodeError> {
        Err(DecodeError::SchemaAssertion(
            "this profile has no orphan packets".into(),
        ))
    }
}

/// Resolves a profile name to its descriptor (§4.1). The only place new
/// profiles are registered.
pub fn resolve(name: ProfileName) -> Box<dyn Profile> {
    match name {
        ProfileName::Juliet => Box::new(juliet::JulietProfile),
        ProfileName::Tango => Box::new(tango::TangoProfile::new(false)),
        ProfileName::MikeLima => Box::new(mikelima::MikeLimaProfile::new(0)),
    }
}
