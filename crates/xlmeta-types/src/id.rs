use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Byte width on the wire.
            pub const LEN: usize = 16;

            /// Allocate a fresh, time-ordered identifier (UUID v7).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The nil identifier (all zeros).
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Returns `true` if this is the nil identifier.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Build from the raw 16 bytes.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Build from a slice that must be exactly 16 bytes long.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
                let arr: [u8; 16] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
                    expected: Self::LEN,
                    actual: bytes.len(),
                })?;
                Ok(Self::from_bytes(arr))
            }

            /// The raw 16 bytes.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId(e.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of one version of an object.
    ///
    /// Assigned when the journal entry is created and never reused by a
    /// later entry. The full 128 bits are kept on the wire.
    VersionId,
    "VersionId"
);

uuid_id!(
    /// Identifier of the data directory that backs an object version's shards.
    DataDir,
    "DataDir"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(VersionId::new(), VersionId::new());
        assert_ne!(DataDir::new(), DataDir::new());
    }

    #[test]
    fn nil_is_all_zeros() {
        let nil = VersionId::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.as_bytes(), &[0u8; 16]);
        assert_eq!(VersionId::default(), nil);
    }

    #[test]
    fn from_slice_checks_length() {
        let err = DataDir::from_slice(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 16, actual: 3 });

        let id = DataDir::from_slice(&[7u8; 16]).unwrap();
        assert_eq!(id.as_bytes(), &[7u8; 16]);
    }

    #[test]
    fn parse_display_roundtrip() {
        let text = "9dd7d884-121a-41e9-9a4e-d64e608d1b51";
        let dir: DataDir = text.parse().unwrap();
        assert_eq!(dir.to_string(), text);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!("not-a-uuid".parse::<VersionId>(), Err(TypeError::InvalidId(_))));
    }

    #[test]
    fn high_bits_are_preserved() {
        let bytes = [0xFFu8, 0xEE, 0xDD, 0xCC, 0xBB, 0xAA, 0x99, 0x88, 1, 2, 3, 4, 5, 6, 7, 8];
        let id = VersionId::from_bytes(bytes);
        assert_eq!(id.as_bytes(), &bytes);
    }

    #[test]
    fn debug_names_the_kind() {
        let id = VersionId::nil();
        assert!(format!("{id:?}").starts_with("VersionId("));
    }

    #[test]
    fn serde_roundtrip() {
        let id = VersionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: VersionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
