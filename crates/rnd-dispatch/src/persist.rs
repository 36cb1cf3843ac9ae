//! Persistent research records and their binary encoding.
//!
//! The host saves research state as flat keyed records: subject id to
//! collected total, node id to state, part id to owner count, and the set
//! of purchased parts. A missing key means the default value.
//!
//! [`SaveRecords::encode`] produces a `bitcode` blob with a versioned
//! header so a stale or foreign blob is rejected before it is applied.

use rnd_tech_tree::TechState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a research record blob.
pub const RECORDS_MAGIC: u32 = 0x524E_4401;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", RECORDS_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("records from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Header prepended to every encoded record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub magic: u32,
    pub version: u32,
}

impl RecordHeader {
    pub fn new() -> Self {
        Self {
            magic: RECORDS_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != RECORDS_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for RecordHeader {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Every keyed record the host persists for research.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveRecords {
    #[serde(default)]
    pub subjects: BTreeMap<String, f64>,
    #[serde(default)]
    pub tech: BTreeMap<String, TechState>,
    #[serde(default)]
    pub experimental_parts: BTreeMap<String, u32>,
    #[serde(default)]
    pub purchased_parts: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordsBlob {
    header: RecordHeader,
    records: SaveRecords,
}

impl SaveRecords {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
            && self.tech.is_empty()
            && self.experimental_parts.is_empty()
            && self.purchased_parts.is_empty()
    }

    /// Encode with the current header.
    pub fn encode(&self) -> Result<Vec<u8>, SerializeError> {
        let blob = RecordsBlob {
            header: RecordHeader::new(),
            records: self.clone(),
        };
        bitcode::serialize(&blob).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode and validate the header. Returns an error (not a panic) on
    /// truncated or foreign data.
    pub fn decode(data: &[u8]) -> Result<Self, DeserializeError> {
        let blob: RecordsBlob =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        blob.header.validate()?;
        Ok(blob.records)
    }
}
