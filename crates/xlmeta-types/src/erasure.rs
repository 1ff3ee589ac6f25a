use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Erasure coding algorithm used to split an object into shards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErasureAlgorithm {
    #[default]
    ReedSolomon,
}

impl ErasureAlgorithm {
    /// Integer tag written on the wire.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::ReedSolomon => 0,
        }
    }

    /// Parse from the wire tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::ReedSolomon),
            _ => None,
        }
    }
}

/// Bitrot checksum algorithm applied to each shard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    #[default]
    HighwayHash256S,
}

impl ChecksumAlgorithm {
    /// Integer tag written on the wire.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::HighwayHash256S => 0,
        }
    }

    /// Parse from the wire tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::HighwayHash256S),
            _ => None,
        }
    }
}

/// Erasure parameters for one object version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureInfo {
    pub algorithm: ErasureAlgorithm,
    /// Number of data shards.
    pub data_blocks: u32,
    /// Number of parity shards.
    pub parity_blocks: u32,
    /// Erasure block size in bytes.
    pub block_size: u64,
    /// 1-based index of the shard held by this copy of the metadata.
    pub index: u32,
    pub checksum: ChecksumAlgorithm,
    /// Shard placement: one entry per data and parity shard.
    pub distribution: Vec<u32>,
}

impl ErasureInfo {
    /// Total shard count (data + parity).
    pub fn total_shards(&self) -> usize {
        self.data_blocks as usize + self.parity_blocks as usize
    }

    /// Check that the distribution covers exactly data + parity shards.
    pub fn validate(&self) -> Result<(), TypeError> {
        let expected = self.total_shards();
        if self.distribution.len() != expected {
            return Err(TypeError::DistributionMismatch {
                expected,
                actual: self.distribution.len(),
            });
        }
        Ok(())
    }

    /// Reset to defaults while keeping the distribution's allocation.
    pub fn clear(&mut self) {
        self.algorithm = ErasureAlgorithm::default();
        self.data_blocks = 0;
        self.parity_blocks = 0;
        self.block_size = 0;
        self.index = 0;
        self.checksum = ChecksumAlgorithm::default();
        self.distribution.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sixteen_shards() -> ErasureInfo {
        ErasureInfo {
            data_blocks: 8,
            parity_blocks: 8,
            block_size: 10 * 1024 * 1024,
            index: 1,
            distribution: (1..=16).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn algorithm_tags_roundtrip() {
        let algo = ErasureAlgorithm::ReedSolomon;
        assert_eq!(ErasureAlgorithm::from_u8(algo.to_u8()), Some(algo));
        let sum = ChecksumAlgorithm::HighwayHash256S;
        assert_eq!(ChecksumAlgorithm::from_u8(sum.to_u8()), Some(sum));
    }

    #[test]
    fn unknown_tags_rejected() {
        assert!(ErasureAlgorithm::from_u8(1).is_none());
        assert!(ChecksumAlgorithm::from_u8(200).is_none());
    }

    #[test]
    fn valid_distribution() {
        let info = sixteen_shards();
        assert_eq!(info.total_shards(), 16);
        assert!(info.validate().is_ok());
    }

    #[test]
    fn short_distribution_rejected() {
        let mut info = sixteen_shards();
        info.distribution.pop();
        assert_eq!(
            info.validate().unwrap_err(),
            TypeError::DistributionMismatch { expected: 16, actual: 15 }
        );
    }

    #[test]
    fn clear_resets_fields() {
        let mut info = sixteen_shards();
        info.clear();
        assert_eq!(info, ErasureInfo::default());
    }
}
