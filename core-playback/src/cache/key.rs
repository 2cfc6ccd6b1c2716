//! Cache keys

use bridge_traits::DataSpec;
use core_runtime::logging::redact_url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifies one cached byte range of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub url: String,
    pub offset: u64,
    pub length: Option<u64>,
}

impl CacheKey {
    pub fn new(url: impl Into<String>, offset: u64, length: Option<u64>) -> Self {
        Self {
            url: url.into(),
            offset,
            length,
        }
    }

    /// Entry file name: hex SHA-256 over the key fields.
    pub fn file_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        hasher.update(self.offset.to_be_bytes());
        match self.length {
            Some(len) => {
                hasher.update([1u8]);
                hasher.update(len.to_be_bytes());
            }
            None => hasher.update([0u8]),
        }
        format!("{}.bin", hex::encode(hasher.finalize()))
    }
}

impl From<&DataSpec> for CacheKey {
    fn from(spec: &DataSpec) -> Self {
        Self::new(spec.url.clone(), spec.offset, spec.length)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(len) => write!(f, "{}[{}+{}]", redact_url(&self.url), self.offset, len),
            None => write!(f, "{}[{}..]", redact_url(&self.url), self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_distinguishes_ranges() {
        let whole = CacheKey::new("http://h/a.mp4", 0, None);
        let head = CacheKey::new("http://h/a.mp4", 0, Some(1024));
        let tail = CacheKey::new("http://h/a.mp4", 1024, None);

        assert_ne!(whole.file_name(), head.file_name());
        assert_ne!(whole.file_name(), tail.file_name());
        assert_eq!(whole.file_name(), CacheKey::new("http://h/a.mp4", 0, None).file_name());
        assert!(whole.file_name().ends_with(".bin"));
        assert_eq!(whole.file_name().len(), 64 + 4);
    }

    #[test]
    fn test_display_hides_query() {
        let key = CacheKey::new("http://h/a.mp4?sig=secret", 10, Some(5));
        assert_eq!(key.to_string(), "http://h/a.mp4[10+5]");
    }

    #[test]
    fn test_from_data_spec() {
        let spec = DataSpec::new("http://h/a.mp3").with_range(7, Some(9));
        assert_eq!(CacheKey::from(&spec), CacheKey::new("http://h/a.mp3", 7, Some(9)));
    }
}
