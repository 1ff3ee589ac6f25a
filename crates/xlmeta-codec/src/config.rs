use serde::{Deserialize, Serialize};

/// Upper bounds on record sizes.
///
/// A decoder fails with `LimitExceeded` on declared lengths beyond these, and
/// an encoder refuses to write them. Decode allocation is additionally capped
/// by the bytes remaining in the buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    /// Maximum entries in the journal array.
    pub max_journal_entries: usize,
    /// Maximum length of the part-number and part-size sequences.
    pub max_parts: usize,
    /// Maximum length of an erasure shard distribution.
    pub max_shards: usize,
    /// Maximum entries in a metadata map or in any schema mapping.
    pub max_map_entries: usize,
    /// Maximum byte length of a string or binary value.
    pub max_string_len: usize,
    /// Maximum container nesting when skipping an unknown field.
    pub max_skip_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_journal_entries: 100_000,
            max_parts: 10_000,
            max_shards: 256,
            max_map_entries: 1_024,
            max_string_len: 64 * 1024,
            max_skip_depth: 64,
        }
    }
}

impl DecodeLimits {
    /// No limits beyond the buffer length itself.
    pub fn unbounded() -> Self {
        Self {
            max_journal_entries: usize::MAX,
            max_parts: usize::MAX,
            max_shards: usize::MAX,
            max_map_entries: usize::MAX,
            max_string_len: usize::MAX,
            max_skip_depth: usize::MAX,
        }
    }
}
