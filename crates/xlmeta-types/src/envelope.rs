use serde::{Deserialize, Serialize};

use crate::entry::{DeleteMarker, JournalEntry, LinkVersion, ObjectVersion};

/// Current envelope version written by this crate.
pub const ENVELOPE_VERSION: u64 = 2;

/// Layout family of the metadata record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaFormat {
    /// Erasure-coded layout.
    #[default]
    Xl,
}

impl MetaFormat {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Xl => 1,
        }
    }

    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Xl),
            _ => None,
        }
    }
}

/// Top-level metadata record for one stored object.
///
/// The journal is append-only: index 0 is the oldest entry and entries are
/// never modified once pushed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u64,
    pub format: MetaFormat,
    journal: Vec<JournalEntry>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    /// An empty envelope at the current version.
    pub fn new() -> Self {
        Self::with_journal(ENVELOPE_VERSION, MetaFormat::Xl, Vec::new())
    }

    /// Rebuild an envelope from already-ordered parts (used by decoders).
    pub fn with_journal(version: u64, format: MetaFormat, journal: Vec<JournalEntry>) -> Self {
        Self {
            version,
            format,
            journal,
        }
    }

    /// Append any entry.
    pub fn push(&mut self, entry: impl Into<JournalEntry>) {
        self.journal.push(entry.into());
    }

    /// Record a newly written version.
    pub fn push_object(&mut self, obj: ObjectVersion) {
        self.push(obj);
    }

    /// Record a deletion.
    pub fn push_delete_marker(&mut self, marker: DeleteMarker) {
        self.push(marker);
    }

    /// Record a version that references existing data.
    pub fn push_link(&mut self, link: LinkVersion) {
        self.push(link);
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn into_journal(self) -> Vec<JournalEntry> {
        self.journal
    }

    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&JournalEntry> {
        self.journal.get(index)
    }

    /// The most recently appended entry.
    pub fn latest(&self) -> Option<&JournalEntry> {
        self.journal.last()
    }

    /// Signed lookup: negative indexes count from the end (`-1` is the latest).
    pub fn entry_at(&self, index: i64) -> Option<&JournalEntry> {
        resolve_index(index, self.journal.len()).and_then(|i| self.journal.get(i))
    }
}

/// Resolve a signed journal index against a journal of `len` entries.
///
/// Negative indexes count back from the end: `-1` is the last entry, `-len`
/// the first. Returns `None` when the resolved position falls outside `0..len`.
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        return len.checked_sub(back);
    }
    let index = usize::try_from(index).ok()?;
    (index < len).then_some(index)
}
