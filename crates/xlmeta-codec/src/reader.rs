//! Random access to a single journal entry.
//!
//! Only the top-level fields ahead of the journal and the journal's length
//! header are read up front. A lookup then decodes entries from the start of
//! the journal into the caller's destination, stopping at the target. Entries
//! after the target are never read.

use tracing::debug;
use xlmeta_types::{resolve_index, JournalEntry};

use crate::config::DecodeLimits;
use crate::decode::{Decoder, EnvelopeHeader};
use crate::error::{CodecError, CodecResult};
use crate::keys;
use crate::path::FieldPath;

/// A parsed envelope prefix, positioned at the first journal entry.
#[derive(Clone, Debug)]
pub struct JournalReader<'a> {
    buf: &'a [u8],
    limits: DecodeLimits,
    header: EnvelopeHeader,
    journal_start: usize,
    len: usize,
}

impl<'a> JournalReader<'a> {
    pub fn new(buf: &'a [u8]) -> CodecResult<Self> {
        Self::with_limits(buf, DecodeLimits::default())
    }

    pub fn with_limits(buf: &'a [u8], limits: DecodeLimits) -> CodecResult<Self> {
        let mut dec = Decoder::with_limits(buf, limits.clone());
        let start = dec.enter_journal()?;
        Ok(Self {
            buf,
            limits,
            header: start.header,
            journal_start: dec.position(),
            len: start.len,
        })
    }

    /// Declared number of journal entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Top-level fields that precede the journal.
    pub fn header(&self) -> EnvelopeHeader {
        self.header
    }

    /// Decode the entry at `index` into `dst` and return it.
    ///
    /// Negative indexes count from the end: `-1` is the latest entry. An
    /// index outside the journal fails before `dst` is touched. Any other
    /// failure leaves `dst` in an unspecified state.
    pub fn entry_at<'d>(
        &self,
        index: i64,
        dst: &'d mut JournalEntry,
    ) -> CodecResult<&'d JournalEntry> {
        let target = resolve_index(index, self.len).ok_or(CodecError::IndexOutOfRange {
            path: FieldPath::key(keys::JOURNAL),
            index,
            len: self.len,
        })?;

        let mut dec = Decoder::resume(
            self.buf,
            self.journal_start,
            FieldPath::key(keys::JOURNAL),
            self.limits.clone(),
        );
        // Earlier entries are decoded in full and overwritten.
        for i in 0..=target {
            dec.indexed(i, |d| d.decode_entry_into(&mut *dst))?;
        }
        debug!(index, resolved = target, entries = self.len, "read journal entry");
        Ok(dst)
    }

    /// The most recently appended entry.
    pub fn latest<'d>(&self, dst: &'d mut JournalEntry) -> CodecResult<&'d JournalEntry> {
        self.entry_at(-1, dst)
    }
}

/// Decode only the journal entry at `index` from a serialized envelope.
///
/// See [`JournalReader::entry_at`] for index rules.
pub fn entry_at<'d>(
    buf: &[u8],
    index: i64,
    dst: &'d mut JournalEntry,
) -> CodecResult<&'d JournalEntry> {
    JournalReader::new(buf)?.entry_at(index, dst)
}
