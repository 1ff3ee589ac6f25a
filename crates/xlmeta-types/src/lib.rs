//! Record schema for erasure-coded object metadata.
//!
//! An [`Envelope`] holds the append-only journal of an object's versions.
//! Each [`JournalEntry`] is exactly one of an object version, a delete
//! marker, or a link to another version's data. This crate carries no wire
//! knowledge; encoding lives in `xlmeta-codec`.
//!
//! # Key Types
//!
//! - [`Envelope`]: version, format, and the journal
//! - [`JournalEntry`]: sum type over [`ObjectVersion`], [`DeleteMarker`], [`LinkVersion`]
//! - [`ErasureInfo`]: shard counts, block size, and shard distribution
//! - [`VersionId`] / [`DataDir`]: full-width 128-bit identifiers

pub mod entry;
pub mod envelope;
pub mod erasure;
pub mod error;
pub mod id;

pub use entry::{
    DeleteMarker, EntryKind, JournalEntry, LinkVersion, ObjectVersion, SystemMetadata,
    UserMetaValue, UserMetadata,
};
pub use envelope::{resolve_index, Envelope, MetaFormat, ENVELOPE_VERSION};
pub use erasure::{ChecksumAlgorithm, ErasureAlgorithm, ErasureInfo};
pub use error::TypeError;
pub use id::{DataDir, VersionId};
