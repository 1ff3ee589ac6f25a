use tracing::debug;
use xlmeta_types::{DeleteMarker, Envelope, JournalEntry, ObjectVersion, UserMetaValue};

use crate::config::DecodeLimits;
use crate::error::{CodecError, CodecResult};
use crate::keys;
use crate::path::FieldPath;
use crate::wire::{self, WireError};

/// Writes envelopes and journal entries as MessagePack.
///
/// Every recognized key is always emitted, empty sequences included, and no
/// other keys are ever written. Lengths are checked against the same
/// [`DecodeLimits`] a decoder applies, so nothing is written that a decoder
/// with those limits would reject.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
    path: FieldPath,
    limits: DecodeLimits,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn wire(&self, err: WireError) -> CodecError {
        CodecError::Encode {
            path: self.path.clone(),
            reason: match err {
                WireError::TooLong => "length does not fit in 32 bits".into(),
                WireError::Write(reason) => reason,
                other => format!("{other:?}"),
            },
        }
    }

    pub(crate) fn path(&self) -> &FieldPath {
        &self.path
    }

    fn check_limit(&self, what: &'static str, len: usize, limit: usize) -> CodecResult<()> {
        if len > limit {
            return Err(CodecError::LimitExceeded {
                path: self.path.clone(),
                what,
                limit,
                actual: len,
            });
        }
        Ok(())
    }

    /// Map header; every map counts against `max_map_entries`.
    pub(crate) fn map_len(&mut self, what: &'static str, len: usize) -> CodecResult<()> {
        self.check_limit(what, len, self.limits.max_map_entries)?;
        wire::write_map_len(&mut self.buf, len).map_err(|e| self.wire(e))
    }

    pub(crate) fn array_len(&mut self, what: &'static str, len: usize, limit: usize) -> CodecResult<()> {
        self.check_limit(what, len, limit)?;
        wire::write_array_len(&mut self.buf, len).map_err(|e| self.wire(e))
    }

    /// A string subject to `max_string_len`; schema keys are written with [`str`](Self::str).
    fn string(&mut self, s: &str) -> CodecResult<()> {
        self.check_limit("string", s.len(), self.limits.max_string_len)?;
        self.str(s)
    }

    fn str(&mut self, s: &str) -> CodecResult<()> {
        wire::write_str(&mut self.buf, s).map_err(|e| self.wire(e))
    }

    fn bin(&mut self, data: &[u8]) -> CodecResult<()> {
        wire::write_bin(&mut self.buf, data).map_err(|e| self.wire(e))
    }

    /// A metadata value, subject to `max_string_len`.
    fn bytes(&mut self, data: &[u8]) -> CodecResult<()> {
        self.check_limit("binary", data.len(), self.limits.max_string_len)?;
        self.bin(data)
    }

    pub(crate) fn sint(&mut self, value: i64) -> CodecResult<()> {
        wire::write_sint(&mut self.buf, value).map_err(|e| self.wire(e))
    }

    fn uint(&mut self, value: u64) -> CodecResult<()> {
        wire::write_uint(&mut self.buf, value).map_err(|e| self.wire(e))
    }

    /// Write `key` and then its value, with `key` on the path while the value is written.
    fn field(
        &mut self,
        key: &'static str,
        f: impl FnOnce(&mut Self) -> CodecResult<()>,
    ) -> CodecResult<()> {
        self.str(key)?;
        self.path.push_key(key);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Like [`field`](Self::field) for a runtime map key, such as a metadata key.
    fn keyed(&mut self, key: &str, f: impl FnOnce(&mut Self) -> CodecResult<()>) -> CodecResult<()> {
        self.string(key)?;
        self.path.push_owned_key(key.to_owned());
        let out = f(self);
        self.path.pop();
        out
    }

    pub fn write_envelope(&mut self, env: &Envelope) -> CodecResult<()> {
        self.map_len("envelope", 3)?;
        self.field(keys::VERSION, |e| e.uint(env.version))?;
        self.field(keys::FORMAT, |e| e.uint(env.format.to_u8().into()))?;
        self.field(keys::JOURNAL, |e| {
            e.array_len("journal", env.len(), e.limits.max_journal_entries)?;
            for (i, entry) in env.journal().iter().enumerate() {
                e.path.push_index(i);
                let out = e.write_entry(entry);
                e.path.pop();
                out?;
            }
            Ok(())
        })
    }

    /// Write one journal entry: its discriminator and only the matching payload.
    pub fn write_entry(&mut self, entry: &JournalEntry) -> CodecResult<()> {
        let kind = entry.kind();
        self.map_len("journal entry", 2)?;
        self.field(keys::TYPE, |e| e.uint(kind.to_u8().into()))?;
        match entry {
            JournalEntry::Object(obj) => self.field(keys::OBJECT, |e| e.write_object(obj)),
            JournalEntry::DeleteMarker(marker) => {
                self.field(keys::DELETE, |e| e.write_delete_marker(marker))
            }
            JournalEntry::Link(link) => self.field(keys::LINK, |e| e.write_object(link.target())),
        }
    }

    fn write_delete_marker(&mut self, marker: &DeleteMarker) -> CodecResult<()> {
        self.map_len("delete marker", 2)?;
        self.field(keys::VERSION_ID, |e| e.bin(marker.version_id.as_bytes()))?;
        self.field(keys::MOD_TIME, |e| e.sint(marker.mod_time))
    }

    fn write_object(&mut self, obj: &ObjectVersion) -> CodecResult<()> {
        obj.validate().map_err(|err| CodecError::Invalid {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;

        let ec = &obj.erasure;
        self.map_len("object", keys::OBJECT_FIELDS)?;
        self.field(keys::VERSION_ID, |e| e.bin(obj.version_id.as_bytes()))?;
        self.field(keys::DATA_DIR, |e| e.bin(obj.data_dir.as_bytes()))?;
        self.field(keys::EC_ALGO, |e| e.uint(ec.algorithm.to_u8().into()))?;
        self.field(keys::EC_DATA, |e| e.uint(ec.data_blocks.into()))?;
        self.field(keys::EC_PARITY, |e| e.uint(ec.parity_blocks.into()))?;
        self.field(keys::EC_BLOCK_SIZE, |e| e.uint(ec.block_size))?;
        self.field(keys::EC_INDEX, |e| e.uint(ec.index.into()))?;
        self.field(keys::EC_DIST, |e| {
            e.array_len("shard distribution", ec.distribution.len(), e.limits.max_shards)?;
            ec.distribution.iter().try_for_each(|&shard| e.uint(shard.into()))
        })?;
        self.field(keys::CHECKSUM_ALGO, |e| e.uint(ec.checksum.to_u8().into()))?;
        self.field(keys::PART_NUMBERS, |e| e.write_deltas(&obj.part_numbers))?;
        self.field(keys::PART_SIZES, |e| e.write_deltas(&obj.part_sizes))?;
        self.field(keys::SIZE, |e| e.sint(obj.size))?;
        self.field(keys::MOD_TIME, |e| e.sint(obj.mod_time))?;
        self.field(keys::META_SYS, |e| {
            e.map_len("system metadata", obj.meta_sys.len())?;
            obj.meta_sys.iter().try_for_each(|(k, v)| e.keyed(k, |e| e.bytes(v)))
        })?;
        self.field(keys::META_USER, |e| {
            e.map_len("user metadata", obj.meta_user.len())?;
            obj.meta_user.iter().try_for_each(|(k, v)| {
                e.keyed(k, |e| match v {
                    UserMetaValue::Single(s) => e.string(s),
                    UserMetaValue::Multi(values) => {
                        let limit = e.limits.max_map_entries;
                        e.array_len("user metadata values", values.len(), limit)?;
                        values.iter().try_for_each(|s| e.string(s))
                    }
                })
            })
        })
    }
}

/// Serialize a whole envelope within the default [`DecodeLimits`].
pub fn encode_envelope(env: &Envelope) -> CodecResult<Vec<u8>> {
    encode_envelope_with_limits(env, DecodeLimits::default())
}

pub fn encode_envelope_with_limits(env: &Envelope, limits: DecodeLimits) -> CodecResult<Vec<u8>> {
    let mut enc = Encoder::with_limits(limits);
    enc.write_envelope(env)?;
    let buf = enc.finish();
    debug!(entries = env.len(), bytes = buf.len(), "encoded envelope");
    Ok(buf)
}

/// Serialize a single journal entry on its own.
pub fn encode_entry(entry: &JournalEntry) -> CodecResult<Vec<u8>> {
    let mut enc = Encoder::new();
    enc.write_entry(entry)?;
    Ok(enc.finish())
}
