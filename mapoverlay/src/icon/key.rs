//! Cache keys and on-disk naming.

use std::fmt;

use super::source::IconSource;

/// Identity of a resolved icon: source plus requested size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconKey {
    source_id: String,
    size_points: u32,
}

impl IconKey {
    pub fn new(source: &IconSource, size_points: u32) -> Self {
        Self {
            source_id: source.source_id(),
            size_points,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn size_points(&self) -> u32 {
        self.size_points
    }

    /// Flat file name for the disk tier: djb2 of `source@size`, 16 hex digits.
    pub fn disk_filename(&self) -> String {
        format!("{:016x}.png", djb2(self.to_string().as_bytes()))
    }
}

impl fmt::Display for IconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.source_id, self.size_points)
    }
}

/// The djb2 string hash (`h = h * 33 + byte`, seeded with 5381).
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes.iter().fold(5381u64, |hash, &b| {
        hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(b as u64)
    })
}
