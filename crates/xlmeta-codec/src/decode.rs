use std::mem;
use std::str::FromStr;

use rmp::Marker;
use tracing::{debug, trace};
use xlmeta_types::{
    ChecksumAlgorithm, DataDir, DeleteMarker, EntryKind, Envelope, ErasureAlgorithm,
    JournalEntry, LinkVersion, MetaFormat, ObjectVersion, SystemMetadata, TypeError,
    UserMetaValue, UserMetadata, VersionId,
};

use crate::config::DecodeLimits;
use crate::error::{CodecError, CodecResult};
use crate::keys;
use crate::path::FieldPath;
use crate::wire::{WireError, WireReader};

/// Top-level envelope fields read before the journal.
///
/// A field the writer placed after the journal is `None` here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: Option<u64>,
    pub format: Option<MetaFormat>,
}

/// Where the journal begins, as found by [`Decoder::enter_journal`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct JournalStart {
    pub header: EnvelopeHeader,
    pub len: usize,
    /// Top-level fields that follow the journal.
    pub fields_after: usize,
}

/// Recognized keys already read from one map.
#[derive(Clone, Copy, Debug)]
struct SeenKeys {
    known: &'static [&'static str],
    bits: u32,
}

impl SeenKeys {
    fn new(known: &'static [&'static str]) -> Self {
        debug_assert!(known.len() <= 32);
        Self { known, bits: 0 }
    }

    /// Record `key`. Returns it as `Err` if it was already recorded; keys
    /// outside `known` are never repeats.
    fn visit(&mut self, key: &str) -> Result<(), &'static str> {
        let Some(i) = self.known.iter().position(|k| *k == key) else {
            return Ok(());
        };
        let bit = 1u32 << i;
        if self.bits & bit != 0 {
            return Err(self.known[i]);
        }
        self.bits |= bit;
        Ok(())
    }
}

/// Streaming decoder over one envelope buffer.
///
/// Unrecognized keys at any mapping level are skipped structurally. Every
/// error carries the path of the field being decoded.
#[derive(Debug)]
pub struct Decoder<'a> {
    rd: WireReader<'a>,
    path: FieldPath,
    limits: DecodeLimits,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_limits(buf, DecodeLimits::default())
    }

    pub fn with_limits(buf: &'a [u8], limits: DecodeLimits) -> Self {
        Self {
            rd: WireReader::new(buf),
            path: FieldPath::root(),
            limits,
        }
    }

    /// Continue decoding at byte offset `pos` with `path` as the current location.
    pub(crate) fn resume(buf: &'a [u8], pos: usize, path: FieldPath, limits: DecodeLimits) -> Self {
        Self {
            rd: WireReader::at(buf, pos),
            path,
            limits,
        }
    }

    /// Byte offset of the next unread value.
    pub fn position(&self) -> usize {
        self.rd.position()
    }

    pub fn remaining(&self) -> usize {
        self.rd.remaining()
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    pub(crate) fn path(&self) -> &FieldPath {
        &self.path
    }

    // ---- error construction ----

    fn wire(&self, err: WireError) -> CodecError {
        let path = self.path.clone();
        match err {
            WireError::Truncated => CodecError::Truncated { path },
            WireError::TypeMismatch { expected, found } => CodecError::TypeMismatch {
                path,
                expected,
                found: format!("{found:?}"),
            },
            WireError::OutOfRange => CodecError::Overflow { path },
            WireError::InvalidUtf8 => CodecError::TypeMismatch {
                path,
                expected: "utf-8 string",
                found: "invalid utf-8".into(),
            },
            WireError::Reserved => CodecError::TypeMismatch {
                path,
                expected: "value",
                found: "reserved marker 0xc1".into(),
            },
            WireError::TooDeep => CodecError::LimitExceeded {
                path,
                what: "nesting",
                limit: self.limits.max_skip_depth,
                actual: self.limits.max_skip_depth.saturating_add(1),
            },
            WireError::TooLong | WireError::Write(_) => CodecError::Invalid {
                path,
                reason: format!("{err:?}"),
            },
        }
    }

    /// Like [`wire`](Self::wire), but a wrong marker where a length header is
    /// expected is a malformed header.
    fn header(&self, err: WireError) -> CodecError {
        match err {
            WireError::TypeMismatch { expected, found } => CodecError::MalformedHeader {
                path: self.path.clone(),
                reason: format!("expected {expected} header, found {found:?}"),
            },
            other => self.wire(other),
        }
    }

    fn missing(&self, key: &'static str) -> CodecError {
        CodecError::MissingField {
            path: self.path.child(key),
        }
    }

    fn duplicate(&self, key: &'static str) -> CodecError {
        CodecError::Invalid {
            path: self.path.child(key),
            reason: "duplicate field".into(),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> CodecError {
        CodecError::Invalid {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn unknown(&self, what: &'static str, value: u64) -> CodecError {
        CodecError::UnknownVariant {
            path: self.path.clone(),
            what,
            value,
        }
    }

    fn check_limit(&self, what: &'static str, len: usize, limit: usize) -> CodecResult<usize> {
        if len > limit {
            return Err(CodecError::LimitExceeded {
                path: self.path.clone(),
                what,
                limit,
                actual: len,
            });
        }
        Ok(len)
    }

    /// Check a container length against its limit and the bytes left.
    fn check_len(&self, what: &'static str, len: usize, limit: usize) -> CodecResult<usize> {
        self.check_limit(what, len, limit)?;
        // Every element occupies at least one byte.
        if len > self.rd.remaining() {
            return Err(CodecError::Truncated {
                path: self.path.clone(),
            });
        }
        Ok(len)
    }

    // ---- path scoping ----

    fn scoped<T>(
        &mut self,
        key: &'static str,
        f: impl FnOnce(&mut Self) -> CodecResult<T>,
    ) -> CodecResult<T> {
        self.path.push_key(key);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Run `f` with a runtime map key (a metadata key) on the path.
    fn keyed<T>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> CodecResult<T>) -> CodecResult<T> {
        self.path.push_owned_key(key.to_owned());
        let out = f(self);
        self.path.pop();
        out
    }

    pub(crate) fn indexed<T>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Self) -> CodecResult<T>,
    ) -> CodecResult<T> {
        self.path.push_index(index);
        let out = f(self);
        self.path.pop();
        out
    }

    // ---- primitives ----

    pub(crate) fn try_nil(&mut self) -> CodecResult<bool> {
        self.rd.try_read_nil().map_err(|e| self.wire(e))
    }

    fn read_map_header(&mut self, what: &'static str, limit: usize) -> CodecResult<usize> {
        let len = self.rd.read_map_len().map_err(|e| self.header(e))?;
        self.check_len(what, len, limit)
    }

    pub(crate) fn read_array_header(&mut self, what: &'static str, limit: usize) -> CodecResult<usize> {
        let len = self.rd.read_array_len().map_err(|e| self.header(e))?;
        self.check_len(what, len, limit)
    }

    fn read_key(&mut self) -> CodecResult<&'a str> {
        self.rd.read_str().map_err(|e| self.wire(e))
    }

    fn read_string(&mut self) -> CodecResult<String> {
        let s = self.rd.read_str().map_err(|e| self.wire(e))?;
        self.check_limit("string", s.len(), self.limits.max_string_len)?;
        Ok(s.to_owned())
    }

    /// Binary value, or a string taken as its UTF-8 bytes.
    fn read_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let marker = self.rd.peek_marker().map_err(|e| self.wire(e))?;
        let bytes = if is_str(marker) {
            self.rd.read_str().map(str::as_bytes)
        } else {
            self.rd.read_bin()
        }
        .map_err(|e| self.wire(e))?;
        self.check_limit("binary", bytes.len(), self.limits.max_string_len)?;
        Ok(bytes.to_vec())
    }

    fn read_u64(&mut self) -> CodecResult<u64> {
        self.rd.read_u64().map_err(|e| self.wire(e))
    }

    pub(crate) fn read_i64(&mut self) -> CodecResult<i64> {
        self.rd.read_i64().map_err(|e| self.wire(e))
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        let v = self.read_u64()?;
        u32::try_from(v).map_err(|_| CodecError::Overflow {
            path: self.path.clone(),
        })
    }

    /// Small enum tag; anything above `u8` is an unknown variant.
    fn read_tag(&mut self, what: &'static str) -> CodecResult<u8> {
        let v = self.read_u64()?;
        u8::try_from(v).map_err(|_| self.unknown(what, v))
    }

    /// 16-byte binary identifier, or its canonical text form.
    fn read_id<T: FromStr<Err = TypeError>>(
        &mut self,
        from_slice: fn(&[u8]) -> Result<T, TypeError>,
    ) -> CodecResult<T> {
        let marker = self.rd.peek_marker().map_err(|e| self.wire(e))?;
        let parsed = if is_str(marker) {
            let text = self.rd.read_str().map_err(|e| self.wire(e))?;
            text.parse::<T>()
        } else {
            let bytes = self.rd.read_bin().map_err(|e| self.wire(e))?;
            from_slice(bytes)
        };
        parsed.map_err(|e| self.invalid(e.to_string()))
    }

    fn skip_field(&mut self, key: &str) -> CodecResult<()> {
        trace!(path = %self.path, key, "skipping unknown field");
        self.keyed(key, |d| {
            let depth = d.limits.max_skip_depth;
            d.rd.skip_value(depth).map_err(|e| d.wire(e))
        })
    }

    // ---- enums ----

    fn read_format(&mut self) -> CodecResult<MetaFormat> {
        let tag = self.read_tag("format")?;
        MetaFormat::from_u8(tag).ok_or_else(|| self.unknown("format", tag.into()))
    }

    fn read_entry_kind(&mut self) -> CodecResult<EntryKind> {
        let tag = self.read_tag("journal entry type")?;
        EntryKind::from_u8(tag).ok_or_else(|| self.unknown("journal entry type", tag.into()))
    }

    fn read_erasure_algorithm(&mut self) -> CodecResult<ErasureAlgorithm> {
        let tag = self.read_tag("erasure algorithm")?;
        ErasureAlgorithm::from_u8(tag).ok_or_else(|| self.unknown("erasure algorithm", tag.into()))
    }

    fn read_checksum_algorithm(&mut self) -> CodecResult<ChecksumAlgorithm> {
        let tag = self.read_tag("checksum algorithm")?;
        ChecksumAlgorithm::from_u8(tag)
            .ok_or_else(|| self.unknown("checksum algorithm", tag.into()))
    }

    // ---- envelope ----

    fn read_header_field(&mut self, key: &str, header: &mut EnvelopeHeader) -> CodecResult<()> {
        match key {
            keys::VERSION if header.version.is_some() => return Err(self.duplicate(keys::VERSION)),
            keys::FORMAT if header.format.is_some() => return Err(self.duplicate(keys::FORMAT)),
            keys::VERSION => header.version = Some(self.scoped(keys::VERSION, Self::read_u64)?),
            keys::FORMAT => header.format = Some(self.scoped(keys::FORMAT, Self::read_format)?),
            other => self.skip_field(other)?,
        }
        Ok(())
    }

    /// Read top-level fields up to and including the journal's length header.
    ///
    /// Leaves the cursor on the first journal entry.
    pub(crate) fn enter_journal(&mut self) -> CodecResult<JournalStart> {
        let mut fields = self.read_map_header("envelope", self.limits.max_map_entries)?;
        let mut header = EnvelopeHeader::default();
        while fields > 0 {
            fields -= 1;
            let key = self.read_key()?;
            if key == keys::JOURNAL {
                let len = self.scoped(keys::JOURNAL, |d| {
                    if d.try_nil()? {
                        return Ok(0);
                    }
                    d.read_array_header("journal", d.limits.max_journal_entries)
                })?;
                return Ok(JournalStart {
                    header,
                    len,
                    fields_after: fields,
                });
            }
            self.read_header_field(key, &mut header)?;
        }
        Err(self.missing(keys::JOURNAL))
    }

    /// Decode a complete envelope, every journal entry included.
    pub fn decode_envelope(&mut self) -> CodecResult<Envelope> {
        let start = self.enter_journal()?;
        let mut header = start.header;

        let journal = self.scoped(keys::JOURNAL, |d| {
            // Declared lengths are bounded by the buffer, not by entry size.
            let mut journal = Vec::with_capacity(start.len.min(1024));
            for i in 0..start.len {
                let mut entry = JournalEntry::default();
                d.indexed(i, |d| d.decode_entry_into(&mut entry))?;
                journal.push(entry);
            }
            Ok(journal)
        })?;

        for _ in 0..start.fields_after {
            let key = self.read_key()?;
            if key == keys::JOURNAL {
                return Err(self.duplicate(keys::JOURNAL));
            }
            self.read_header_field(key, &mut header)?;
        }

        let version = header.version.ok_or_else(|| self.missing(keys::VERSION))?;
        let format = header.format.ok_or_else(|| self.missing(keys::FORMAT))?;
        Ok(Envelope::with_journal(version, format, journal))
    }

    // ---- journal entry ----

    /// Decode one journal entry into `dst`, overwriting it completely.
    ///
    /// Allocations held by `dst` are reused when the new entry carries an
    /// object or link payload.
    pub fn decode_entry_into(&mut self, dst: &mut JournalEntry) -> CodecResult<()> {
        let fields = self.read_map_header("journal entry", self.limits.max_map_entries)?;
        let mut seen = SeenKeys::new(&keys::ENTRY_KEYS);
        let mut declared: Option<EntryKind> = None;
        let mut decoded: Option<EntryKind> = None;

        for _ in 0..fields {
            let key = self.read_key()?;
            seen.visit(key).map_err(|k| self.duplicate(k))?;
            let kind = match key {
                keys::TYPE => {
                    declared = Some(self.scoped(keys::TYPE, Self::read_entry_kind)?);
                    continue;
                }
                keys::OBJECT => EntryKind::Object,
                keys::DELETE => EntryKind::Delete,
                keys::LINK => EntryKind::Link,
                other => {
                    self.skip_field(other)?;
                    continue;
                }
            };
            let key = kind.payload_key();
            if self.scoped(key, Self::try_nil)? {
                continue;
            }
            if let Some(first) = decoded {
                return Err(CodecError::Invalid {
                    path: self.path.child(key),
                    reason: format!("second payload after {first}"),
                });
            }
            self.scoped(key, |d| d.decode_payload(kind, dst))?;
            decoded = Some(kind);
        }

        let declared = declared.ok_or_else(|| self.missing(keys::TYPE))?;
        match decoded {
            Some(kind) if kind == declared => Ok(()),
            Some(kind) => Err(self.invalid(format!("type is {declared} but payload is {kind}"))),
            None => Err(self.missing(declared.payload_key())),
        }
    }

    fn decode_payload(&mut self, kind: EntryKind, dst: &mut JournalEntry) -> CodecResult<()> {
        match kind {
            EntryKind::Delete => {
                let mut marker = DeleteMarker::default();
                let out = self.decode_delete_marker(&mut marker);
                *dst = JournalEntry::DeleteMarker(marker);
                out
            }
            EntryKind::Object => {
                let mut obj = take_object_buffer(dst);
                let out = self.decode_object(&mut obj);
                *dst = JournalEntry::Object(obj);
                out
            }
            EntryKind::Link => {
                let mut obj = take_object_buffer(dst);
                let out = self.decode_object(&mut obj);
                *dst = JournalEntry::Link(LinkVersion::new(obj));
                out
            }
        }
    }

    fn decode_delete_marker(&mut self, marker: &mut DeleteMarker) -> CodecResult<()> {
        let fields = self.read_map_header("delete marker", self.limits.max_map_entries)?;
        let mut seen = SeenKeys::new(&keys::DELETE_MARKER_KEYS);
        for _ in 0..fields {
            let key = self.read_key()?;
            seen.visit(key).map_err(|k| self.duplicate(k))?;
            match key {
                keys::VERSION_ID => {
                    marker.version_id =
                        self.scoped(keys::VERSION_ID, |d| d.read_id(VersionId::from_slice))?
                }
                keys::MOD_TIME => marker.mod_time = self.scoped(keys::MOD_TIME, Self::read_i64)?,
                other => self.skip_field(other)?,
            }
        }
        Ok(())
    }

    fn decode_object(&mut self, obj: &mut ObjectVersion) -> CodecResult<()> {
        obj.clear();
        let fields = self.read_map_header("object", self.limits.max_map_entries)?;
        let mut seen = SeenKeys::new(&keys::OBJECT_KEYS);
        for _ in 0..fields {
            let key = self.read_key()?;
            seen.visit(key).map_err(|k| self.duplicate(k))?;
            let ec = &mut obj.erasure;
            match key {
                keys::VERSION_ID => {
                    obj.version_id =
                        self.scoped(keys::VERSION_ID, |d| d.read_id(VersionId::from_slice))?
                }
                keys::DATA_DIR => {
                    obj.data_dir = self.scoped(keys::DATA_DIR, |d| d.read_id(DataDir::from_slice))?
                }
                keys::EC_ALGO => {
                    ec.algorithm = self.scoped(keys::EC_ALGO, Self::read_erasure_algorithm)?
                }
                keys::EC_DATA => ec.data_blocks = self.scoped(keys::EC_DATA, Self::read_u32)?,
                keys::EC_PARITY => ec.parity_blocks = self.scoped(keys::EC_PARITY, Self::read_u32)?,
                keys::EC_BLOCK_SIZE => {
                    ec.block_size = self.scoped(keys::EC_BLOCK_SIZE, Self::read_u64)?
                }
                keys::EC_INDEX => ec.index = self.scoped(keys::EC_INDEX, Self::read_u32)?,
                keys::EC_DIST => {
                    let dist = &mut ec.distribution;
                    self.scoped(keys::EC_DIST, |d| d.read_distribution(dist))?
                }
                keys::CHECKSUM_ALGO => {
                    ec.checksum = self.scoped(keys::CHECKSUM_ALGO, Self::read_checksum_algorithm)?
                }
                keys::PART_NUMBERS => {
                    let out = &mut obj.part_numbers;
                    self.scoped(keys::PART_NUMBERS, |d| d.read_deltas_into(out))?
                }
                keys::PART_SIZES => {
                    let out = &mut obj.part_sizes;
                    self.scoped(keys::PART_SIZES, |d| d.read_deltas_into(out))?
                }
                keys::SIZE => obj.size = self.scoped(keys::SIZE, Self::read_i64)?,
                keys::MOD_TIME => obj.mod_time = self.scoped(keys::MOD_TIME, Self::read_i64)?,
                keys::META_SYS => {
                    let out = &mut obj.meta_sys;
                    self.scoped(keys::META_SYS, |d| d.read_system_metadata(out))?
                }
                keys::META_USER => {
                    let out = &mut obj.meta_user;
                    self.scoped(keys::META_USER, |d| d.read_user_metadata(out))?
                }
                other => self.skip_field(other)?,
            }
        }
        obj.validate().map_err(|e| self.invalid(e.to_string()))
    }

    fn read_distribution(&mut self, out: &mut Vec<u32>) -> CodecResult<()> {
        out.clear();
        if self.try_nil()? {
            return Ok(());
        }
        let len = self.read_array_header("shard distribution", self.limits.max_shards)?;
        out.reserve(len);
        for i in 0..len {
            out.push(self.indexed(i, Self::read_u32)?);
        }
        Ok(())
    }

    fn read_system_metadata(&mut self, out: &mut SystemMetadata) -> CodecResult<()> {
        out.clear();
        if self.try_nil()? {
            return Ok(());
        }
        let len = self.read_map_header("system metadata", self.limits.max_map_entries)?;
        for _ in 0..len {
            let key = self.read_string()?;
            let value = self.keyed(&key, Self::read_bytes)?;
            out.insert(key, value);
        }
        Ok(())
    }

    fn read_user_metadata(&mut self, out: &mut UserMetadata) -> CodecResult<()> {
        out.clear();
        if self.try_nil()? {
            return Ok(());
        }
        let len = self.read_map_header("user metadata", self.limits.max_map_entries)?;
        for _ in 0..len {
            let key = self.read_string()?;
            let value = self.keyed(&key, Self::read_user_value)?;
            out.insert(key, value);
        }
        Ok(())
    }

    fn read_user_value(&mut self) -> CodecResult<UserMetaValue> {
        let marker = self.rd.peek_marker().map_err(|e| self.wire(e))?;
        if is_str(marker) {
            return self.read_string().map(UserMetaValue::Single);
        }
        if !matches!(marker, Marker::FixArray(_) | Marker::Array16 | Marker::Array32) {
            return Err(CodecError::TypeMismatch {
                path: self.path.clone(),
                expected: "string or array of strings",
                found: format!("{marker:?}"),
            });
        }
        let len = self.read_array_header("user metadata values", self.limits.max_map_entries)?;
        let mut values = Vec::with_capacity(len);
        for i in 0..len {
            values.push(self.indexed(i, Self::read_string)?);
        }
        Ok(UserMetaValue::Multi(values))
    }
}

fn is_str(marker: Marker) -> bool {
    matches!(
        marker,
        Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32
    )
}

/// Pull a reusable object payload out of `dst`, leaving a placeholder behind.
fn take_object_buffer(dst: &mut JournalEntry) -> ObjectVersion {
    match mem::take(dst) {
        JournalEntry::Object(obj) => obj,
        JournalEntry::Link(link) => link.into_inner(),
        JournalEntry::DeleteMarker(_) => ObjectVersion::default(),
    }
}

/// Decode a complete envelope. Bytes left over after the envelope are an error.
pub fn decode_envelope(buf: &[u8]) -> CodecResult<Envelope> {
    decode_envelope_with_limits(buf, DecodeLimits::default())
}

pub fn decode_envelope_with_limits(buf: &[u8], limits: DecodeLimits) -> CodecResult<Envelope> {
    let mut dec = Decoder::with_limits(buf, limits);
    let env = dec.decode_envelope()?;
    if dec.remaining() > 0 {
        return Err(CodecError::Invalid {
            path: FieldPath::root(),
            reason: format!("{} trailing bytes after envelope", dec.remaining()),
        });
    }
    debug!(bytes = buf.len(), entries = env.len(), "decoded envelope");
    Ok(env)
}

/// Decode a single journal entry encoded on its own.
pub fn decode_entry(buf: &[u8]) -> CodecResult<JournalEntry> {
    let mut entry = JournalEntry::default();
    Decoder::new(buf).decode_entry_into(&mut entry)?;
    Ok(entry)
}
