//! Map keys used on the wire.

// Envelope
pub const VERSION: &str = "version";
pub const FORMAT: &str = "format";
pub const JOURNAL: &str = "journal";

// Journal entry
pub const TYPE: &str = "type";
pub const DELETE: &str = "delete";
pub const OBJECT: &str = "object";
pub const LINK: &str = "link";

// Delete marker, object, and link payloads
pub const VERSION_ID: &str = "versionID";
pub const MOD_TIME: &str = "modTime";
pub const DATA_DIR: &str = "dataDir";
pub const EC_ALGO: &str = "ecAlgo";
pub const EC_DATA: &str = "ecM";
pub const EC_PARITY: &str = "ecN";
pub const EC_BLOCK_SIZE: &str = "ecBSize";
pub const EC_INDEX: &str = "ecIndex";
pub const EC_DIST: &str = "ecDist";
pub const CHECKSUM_ALGO: &str = "csumAlgo";
pub const PART_NUMBERS: &str = "partNums";
pub const PART_SIZES: &str = "partSizes";
pub const SIZE: &str = "size";
pub const META_SYS: &str = "metaSys";
pub const META_USER: &str = "metaUsr";

/// Field count of an encoded object or link payload.
pub const OBJECT_FIELDS: usize = 15;

/// Recognized keys of each schema map. A decoder rejects any of these
/// appearing twice in one map.
pub const ENTRY_KEYS: [&str; 4] = [TYPE, DELETE, OBJECT, LINK];
pub const DELETE_MARKER_KEYS: [&str; 2] = [VERSION_ID, MOD_TIME];
pub const OBJECT_KEYS: [&str; OBJECT_FIELDS] = [
    VERSION_ID,
    DATA_DIR,
    EC_ALGO,
    EC_DATA,
    EC_PARITY,
    EC_BLOCK_SIZE,
    EC_INDEX,
    EC_DIST,
    CHECKSUM_ALGO,
    PART_NUMBERS,
    PART_SIZES,
    SIZE,
    MOD_TIME,
    META_SYS,
    META_USER,
];
