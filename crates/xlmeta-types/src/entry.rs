use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::erasure::ErasureInfo;
use crate::error::TypeError;
use crate::id::{DataDir, VersionId};

/// Internal system metadata: reserved keys mapped to raw bytes.
pub type SystemMetadata = BTreeMap<String, Vec<u8>>;

/// User-supplied metadata: keys mapped to one or many string values.
pub type UserMetadata = BTreeMap<String, UserMetaValue>;

/// A user metadata value. Headers may repeat, so a key can carry several values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserMetaValue {
    Single(String),
    Multi(Vec<String>),
}

impl UserMetaValue {
    /// All values in order.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multi(vs) => vs,
        }
    }
}

impl From<&str> for UserMetaValue {
    fn from(s: &str) -> Self {
        Self::Single(s.to_owned())
    }
}

impl From<String> for UserMetaValue {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<String>> for UserMetaValue {
    fn from(vs: Vec<String>) -> Self {
        Self::Multi(vs)
    }
}

fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Discriminator of a [`JournalEntry`]. The integer values are the wire tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Object,
    Delete,
    Link,
}

impl EntryKind {
    /// Wire tag.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Object => 0,
            Self::Delete => 1,
            Self::Link => 2,
        }
    }

    /// Parse from a wire tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Object),
            1 => Some(Self::Delete),
            2 => Some(Self::Link),
            _ => None,
        }
    }

    /// Map key under which this kind's payload is stored.
    pub fn payload_key(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Delete => "delete",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload_key())
    }
}

/// Tombstone recording that the object was deleted at `mod_time`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMarker {
    pub version_id: VersionId,
    /// Unix seconds.
    pub mod_time: i64,
}

impl DeleteMarker {
    pub fn new(version_id: VersionId, mod_time: i64) -> Self {
        Self { version_id, mod_time }
    }

    pub fn mod_time_utc(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.mod_time)
    }
}

/// A written object version: erasure layout, parts, stat, and metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub version_id: VersionId,
    pub data_dir: DataDir,
    pub erasure: ErasureInfo,
    /// Part numbers in upload order. Parallel to `part_sizes`.
    pub part_numbers: Vec<i64>,
    pub part_sizes: Vec<i64>,
    /// Total object size in bytes.
    pub size: i64,
    /// Unix seconds.
    pub mod_time: i64,
    pub meta_sys: SystemMetadata,
    pub meta_user: UserMetadata,
}

impl ObjectVersion {
    /// Append a part. Keeps the number and size sequences the same length.
    pub fn push_part(&mut self, number: i64, size: i64) {
        self.part_numbers.push(number);
        self.part_sizes.push(size);
    }

    /// Iterate over `(number, size)` pairs.
    pub fn parts(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.part_numbers
            .iter()
            .copied()
            .zip(self.part_sizes.iter().copied())
    }

    pub fn part_count(&self) -> usize {
        self.part_numbers.len()
    }

    pub fn mod_time_utc(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.mod_time)
    }

    /// Check the parallel-sequence and shard-distribution invariants.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.part_numbers.len() != self.part_sizes.len() {
            return Err(TypeError::PartsMismatch {
                numbers: self.part_numbers.len(),
                sizes: self.part_sizes.len(),
            });
        }
        self.erasure.validate()
    }

    /// Reset every field to its default while keeping allocations.
    pub fn clear(&mut self) {
        self.version_id = VersionId::nil();
        self.data_dir = DataDir::nil();
        self.erasure.clear();
        self.part_numbers.clear();
        self.part_sizes.clear();
        self.size = 0;
        self.mod_time = 0;
        self.meta_sys.clear();
        self.meta_user.clear();
    }
}

/// A version that references another version's data instead of owning new data.
///
/// Same payload shape as [`ObjectVersion`], kept as a separate type so a
/// link is never mistaken for an object that owns its shards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkVersion(ObjectVersion);

impl LinkVersion {
    pub fn new(target: ObjectVersion) -> Self {
        Self(target)
    }

    /// The linked payload.
    pub fn target(&self) -> &ObjectVersion {
        &self.0
    }

    pub fn target_mut(&mut self) -> &mut ObjectVersion {
        &mut self.0
    }

    pub fn into_inner(self) -> ObjectVersion {
        self.0
    }
}

/// One record in an object's metadata journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum JournalEntry {
    Object(ObjectVersion),
    DeleteMarker(DeleteMarker),
    Link(LinkVersion),
}

/// A zero-valued delete marker, the cheapest variant to hold as a reusable
/// decode destination.
impl Default for JournalEntry {
    fn default() -> Self {
        Self::DeleteMarker(DeleteMarker::default())
    }
}

impl JournalEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Object(_) => EntryKind::Object,
            Self::DeleteMarker(_) => EntryKind::Delete,
            Self::Link(_) => EntryKind::Link,
        }
    }

    pub fn version_id(&self) -> VersionId {
        match self {
            Self::Object(o) => o.version_id,
            Self::DeleteMarker(d) => d.version_id,
            Self::Link(l) => l.target().version_id,
        }
    }

    /// Unix seconds.
    pub fn mod_time(&self) -> i64 {
        match self {
            Self::Object(o) => o.mod_time,
            Self::DeleteMarker(d) => d.mod_time,
            Self::Link(l) => l.target().mod_time,
        }
    }

    /// The object payload, for both objects and links.
    pub fn payload(&self) -> Option<&ObjectVersion> {
        match self {
            Self::Object(o) => Some(o),
            Self::Link(l) => Some(l.target()),
            Self::DeleteMarker(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectVersion> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_delete_marker(&self) -> Option<&DeleteMarker> {
        match self {
            Self::DeleteMarker(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkVersion> {
        match self {
            Self::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_delete_marker(&self) -> bool {
        matches!(self, Self::DeleteMarker(_))
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        match self.payload() {
            Some(obj) => obj.validate(),
            None => Ok(()),
        }
    }
}

impl From<ObjectVersion> for JournalEntry {
    fn from(obj: ObjectVersion) -> Self {
        Self::Object(obj)
    }
}

impl From<DeleteMarker> for JournalEntry {
    fn from(marker: DeleteMarker) -> Self {
        Self::DeleteMarker(marker)
    }
}

impl From<LinkVersion> for JournalEntry {
    fn from(link: LinkVersion) -> Self {
        Self::Link(link)
    }
}
