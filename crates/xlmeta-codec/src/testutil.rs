//! Hand-built buffers and generators shared by the codec tests.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use xlmeta_types::{
    DataDir, DeleteMarker, Envelope, ErasureInfo, JournalEntry, LinkVersion, ObjectVersion,
    UserMetaValue, VersionId,
};

use crate::encode::encode_entry;
use crate::keys;
use crate::wire::WireReader;

/// Builds a MessagePack map one field at a time, in the order given.
#[derive(Default)]
pub(crate) struct RawMap {
    len: u32,
    body: Vec<u8>,
}

impl RawMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(mut self, key: &str) -> Self {
        self.len += 1;
        rmp::encode::write_str(&mut self.body, key).unwrap();
        self
    }

    pub fn uint(self, key: &str, v: u64) -> Self {
        let mut this = self.key(key);
        rmp::encode::write_uint(&mut this.body, v).unwrap();
        this
    }

    pub fn int(self, key: &str, v: i64) -> Self {
        let mut this = self.key(key);
        rmp::encode::write_sint(&mut this.body, v).unwrap();
        this
    }

    pub fn str(self, key: &str, v: &str) -> Self {
        let mut this = self.key(key);
        rmp::encode::write_str(&mut this.body, v).unwrap();
        this
    }

    pub fn bin(self, key: &str, v: &[u8]) -> Self {
        let mut this = self.key(key);
        rmp::encode::write_bin(&mut this.body, v).unwrap();
        this
    }

    /// A field whose value is already encoded.
    pub fn raw(self, key: &str, value: Vec<u8>) -> Self {
        let mut this = self.key(key);
        this.body.extend_from_slice(&value);
        this
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 5);
        rmp::encode::write_map_len(&mut out, self.len).unwrap();
        out.extend_from_slice(&self.body);
        out
    }
}

/// A value a newer writer might add: nested maps and arrays of mixed types.
pub(crate) fn nested_junk() -> Vec<u8> {
    let mut inner = vec![0x94];
    rmp::encode::write_sint(&mut inner, -70_000).unwrap();
    rmp::encode::write_str(&mut inner, "later").unwrap();
    rmp::encode::write_bin(&mut inner, &[0xde; 40]).unwrap();
    inner.extend_from_slice(&RawMap::new().raw("nil", vec![0xc0]).finish());
    RawMap::new()
        .raw("list", inner)
        .raw("float", vec![0xcb, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18])
        .raw("ext", vec![0xd5, 0x07, 0x01, 0x02])
        .str("version", "shadowed")
        .finish()
}

/// The journal array of `env`, encoded on its own.
pub(crate) fn journal_bytes(env: &Envelope) -> Vec<u8> {
    let mut out = Vec::new();
    rmp::encode::write_array_len(&mut out, env.len() as u32).unwrap();
    for entry in env.journal() {
        out.extend_from_slice(&encode_entry(entry).unwrap());
    }
    out
}

/// A version 2 envelope around already-encoded journal entries.
pub(crate) fn envelope_with_entries(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut journal = Vec::new();
    rmp::encode::write_array_len(&mut journal, entries.len() as u32).unwrap();
    for entry in entries {
        journal.extend_from_slice(entry);
    }
    RawMap::new()
        .uint(keys::VERSION, 2)
        .uint(keys::FORMAT, 1)
        .raw(keys::JOURNAL, journal)
        .finish()
}

/// Byte spans `(key, value)` of each field in a top-level map.
fn fields(buf: &[u8]) -> (usize, Vec<(String, std::ops::Range<usize>)>) {
    let mut rd = WireReader::new(buf);
    let len = rd.read_map_len().unwrap();
    let header = rd.position();
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let key = rd.read_str().unwrap().to_owned();
        let start = rd.position();
        rd.skip_value(64).unwrap();
        out.push((key, start..rd.position()));
    }
    (header, out)
}

/// The encoded value stored under `key` in a top-level map.
pub(crate) fn field_value(buf: &[u8], key: &str) -> Vec<u8> {
    let (_, fields) = fields(buf);
    let (_, span) = fields.into_iter().find(|(k, _)| k == key).unwrap();
    buf[span].to_vec()
}

/// `buf` with the value under `key` swapped for `value`.
pub(crate) fn replace_field(buf: &[u8], key: &str, value: Vec<u8>) -> Vec<u8> {
    let (header, fields) = fields(buf);
    let mut out = buf[..header].to_vec();
    for (k, span) in fields {
        rmp::encode::write_str(&mut out, &k).unwrap();
        if k == key {
            out.extend_from_slice(&value);
        } else {
            out.extend_from_slice(&buf[span]);
        }
    }
    out
}

/// Deepest container level that belongs to the schema: the envelope is
/// level 0, entries level 2 and payloads level 3. Metadata maps below that
/// hold user keys, where an extra key is data rather than an unknown field.
const SCHEMA_DEPTH: usize = 3;

/// Copy an encoded envelope, adding an unknown field to schema maps.
///
/// With `only = Some(k)` just the k-th schema map (in encounter order)
/// gets the field; with `None` every one does. The field goes first in
/// even-numbered maps and last in odd ones.
pub(crate) fn with_unknown_fields(buf: &[u8], only: Option<usize>) -> Vec<u8> {
    let mut rd = WireReader::new(buf);
    let mut out = Vec::with_capacity(buf.len() * 2);
    let mut seen = 0;
    copy_value(buf, &mut rd, &mut out, 0, &mut seen, only);
    assert_eq!(rd.remaining(), 0);
    out
}

/// Number of maps [`with_unknown_fields`] can target in `buf`.
pub(crate) fn schema_map_count(buf: &[u8]) -> usize {
    let mut rd = WireReader::new(buf);
    let mut seen = 0;
    copy_value(buf, &mut rd, &mut Vec::new(), 0, &mut seen, Some(usize::MAX));
    seen
}

fn copy_value(
    buf: &[u8],
    rd: &mut WireReader<'_>,
    out: &mut Vec<u8>,
    depth: usize,
    seen: &mut usize,
    only: Option<usize>,
) {
    use rmp::Marker;

    match rd.peek_marker().unwrap() {
        Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
            let len = rd.read_map_len().unwrap();
            let inject = depth <= SCHEMA_DEPTH && {
                let nth = *seen;
                *seen += 1;
                only.map_or(true, |k| k == nth)
            };
            let first = inject && *seen % 2 == 1;
            let extra = u32::from(inject);
            rmp::encode::write_map_len(out, len as u32 + extra).unwrap();
            if first {
                write_unknown(out);
            }
            for _ in 0..len {
                let key = rd.read_str().unwrap();
                rmp::encode::write_str(out, key).unwrap();
                copy_value(buf, rd, out, depth + 1, seen, only);
            }
            if inject && !first {
                write_unknown(out);
            }
        }
        Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {
            let len = rd.read_array_len().unwrap();
            rmp::encode::write_array_len(out, len as u32).unwrap();
            for _ in 0..len {
                copy_value(buf, rd, out, depth + 1, seen, only);
            }
        }
        _ => {
            let start = rd.position();
            rd.skip_value(1).unwrap();
            out.extend_from_slice(&buf[start..rd.position()]);
        }
    }
}

fn write_unknown(out: &mut Vec<u8>) {
    rmp::encode::write_str(out, "x-future-field").unwrap();
    out.extend_from_slice(&nested_junk());
}

// ---- generators ----

fn arb_version_id() -> impl Strategy<Value = VersionId> {
    any::<[u8; 16]>().prop_map(VersionId::from_bytes)
}

fn arb_user_value() -> impl Strategy<Value = UserMetaValue> {
    prop_oneof![
        "[ -~]{0,24}".prop_map(UserMetaValue::Single),
        vec("[a-z0-9]{0,8}", 0..4).prop_map(UserMetaValue::Multi),
    ]
}

pub(crate) fn arb_object() -> impl Strategy<Value = ObjectVersion> {
    (
        (arb_version_id(), any::<[u8; 16]>(), 1u32..=8, 0u32..=8, any::<u64>()),
        vec((-10_000i64..10_000, 0i64..1 << 40), 0..12),
        (any::<i64>(), any::<i64>()),
        btree_map("[a-z-]{1,12}", vec(any::<u8>(), 0..16), 0..4),
        btree_map("[a-z-]{1,12}", arb_user_value(), 0..4),
    )
        .prop_map(
            |((version_id, dir, data, parity, block_size), parts, (size, mod_time), sys, user)| {
                let mut obj = ObjectVersion {
                    version_id,
                    data_dir: DataDir::from_bytes(dir),
                    erasure: ErasureInfo {
                        data_blocks: data,
                        parity_blocks: parity,
                        block_size,
                        index: 1,
                        distribution: (1..=data + parity).rev().collect(),
                        ..Default::default()
                    },
                    size,
                    mod_time,
                    meta_sys: sys,
                    meta_user: user,
                    ..Default::default()
                };
                for (number, part_size) in parts {
                    obj.push_part(number, part_size);
                }
                obj
            },
        )
}

pub(crate) fn arb_entry() -> impl Strategy<Value = JournalEntry> {
    prop_oneof![
        arb_object().prop_map(JournalEntry::Object),
        (arb_version_id(), any::<i64>())
            .prop_map(|(id, t)| JournalEntry::DeleteMarker(DeleteMarker::new(id, t))),
        arb_object().prop_map(|obj| JournalEntry::Link(LinkVersion::new(obj))),
    ]
}

pub(crate) fn arb_envelope() -> impl Strategy<Value = Envelope> {
    vec(arb_entry(), 0..6).prop_map(|journal| {
        let mut env = Envelope::new();
        for entry in journal {
            env.push(entry);
        }
        env
    })
}
