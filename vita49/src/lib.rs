// SPDX-FileCopyrightText: 2025 The vita49-rs Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!(concat!("../", std::env!("CARGO_PKG_README")))]
#![deny(missing_docs)]
#![deny(unstable_features, unused_import_braces, unreachable_pub)]
#![allow(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::unescaped_backticks)]
#![forbid(unsafe_code)]

mod association;
mod bitfields;
mod class_id;
mod driver;
mod dwell;
pub mod errors;
mod frame;
mod metadata;
pub mod packet;
mod packet_header;
pub mod profile;
pub mod record;
pub mod sink;

pub use crate::association::{ContextKeyTable, KeyFn};
pub use crate::class_id::ClassIdentifier;
pub use crate::driver::{run, DriverOptions, DriverStats};
pub use crate::dwell::{
    polarization_key, stream_id_key, DwellIndexRow, DwellKeyFn, DwellSink, PolarizedDwellSink,
};
pub use crate::frame::{
    BadPacketRecord, FrameEvent, FrameProvenance, FrameReader, InputStream, JulietFrameReader,
    MikeLimaFrameReader, TangoFrameReader,
};
pub use crate::packet_header::*;
pub use crate::profile::{resolve, Dispatched, Profile, ProfileName};
pub use crate::record::{FieldKind, FieldValue, Record, RecordBuilderExt, Schema};

/// Standard imports for driving a full capture-to-columnar-dataset run.
pub mod prelude {
    pub use crate::driver::{run, DriverOptions, DriverStats};
    pub use crate::errors::EngineError;
    pub use crate::profile::{resolve, ProfileName};
    pub use crate::sink::ExistingDataPolicy;
}
