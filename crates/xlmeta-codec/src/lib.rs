//! # xlmeta-codec
//!
//! MessagePack codec for object metadata envelopes.
//!
//! - [`encode_envelope`] / [`decode_envelope`]: whole-record serialization.
//!   Unrecognized keys in any schema map are skipped, so records written by
//!   newer software remain readable.
//! - [`delta`]: the signed delta coding used for part numbers and sizes.
//! - [`JournalReader`] / [`entry_at`]: decode one journal entry by index
//!   (negative counts from the end) into a reusable destination, without
//!   reading entries past it.
//!
//! Every error is a [`CodecError`] carrying the [`FieldPath`] it occurred at.

pub mod config;
pub mod decode;
pub mod delta;
pub mod encode;
pub mod error;
pub mod keys;
pub mod path;
pub mod reader;
mod wire;

#[cfg(test)]
mod testutil;

pub use config::DecodeLimits;
pub use decode::{decode_entry, decode_envelope, decode_envelope_with_limits, Decoder, EnvelopeHeader};
pub use encode::{encode_entry, encode_envelope, encode_envelope_with_limits, Encoder};
pub use error::{CodecError, CodecResult, ErrorKind};
pub use path::{FieldPath, Segment};
pub use reader::{entry_at, JournalReader};
