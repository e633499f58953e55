//! Icon source descriptors.
//!
//! Descriptor grammar:
//!
//! - `data:[<mime>][;base64],<payload>` inline bytes
//! - `http://…` / `https://…` remote URL
//! - `asset://<path>`, `file://<path>` or a bare path, resolved against the
//!   configured asset root

use base64::Engine as _;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::key::{djb2, IconKey};
use super::types::IconError;

/// An icon request: where the bytes come from and the target size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRef {
    pub source: IconSource,
    pub size_points: u32,
}

impl IconRef {
    pub fn new(source: IconSource, size_points: u32) -> Self {
        Self {
            source,
            size_points,
        }
    }

    pub fn key(&self) -> IconKey {
        IconKey::new(&self.source, self.size_points)
    }
}

/// Where an icon's bytes come from.
#[derive(Clone, PartialEq, Eq)]
pub enum IconSource {
    /// Raw encoded image bytes supplied by the caller
    Inline(Arc<[u8]>),
    /// Path to a bundled asset
    Asset(PathBuf),
    /// Remote URL fetched over HTTP
    Remote(String),
}

impl IconSource {
    /// Parses a textual icon descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, IconError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(IconError::InvalidSource(descriptor.to_string()));
        }

        if let Some(rest) = descriptor.strip_prefix("data:") {
            return parse_data_url(rest)
                .map(Self::inline)
                .ok_or_else(|| IconError::InvalidSource(truncated(descriptor)));
        }

        let lower = descriptor.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Remote(descriptor.to_string()));
        }

        let path = descriptor
            .strip_prefix("asset://")
            .or_else(|| descriptor.strip_prefix("file://"))
            .unwrap_or(descriptor);
        if path.is_empty() {
            return Err(IconError::InvalidSource(descriptor.to_string()));
        }
        Ok(Self::Asset(PathBuf::from(path)))
    }

    pub fn inline(bytes: Vec<u8>) -> Self {
        Self::Inline(Arc::from(bytes))
    }

    /// Stable identity used for cache keys.
    ///
    /// Inline sources are identified by content hash and length so two
    /// payloads with identical bytes share cache entries.
    pub fn source_id(&self) -> String {
        match self {
            Self::Inline(bytes) => format!("inline:{:016x}:{}", djb2(bytes), bytes.len()),
            Self::Asset(path) => format!("asset:{}", path.display()),
            Self::Remote(url) => url.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Resolves an asset path against `root`. Absolute paths are kept.
    pub fn asset_path(path: &Path, root: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

impl fmt::Debug for IconSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            Self::Asset(path) => write!(f, "Asset({})", path.display()),
            Self::Remote(url) => write!(f, "Remote({})", url),
        }
    }
}

fn parse_data_url(rest: &str) -> Option<Vec<u8>> {
    let (meta, payload) = rest.split_once(',')?;
    if meta.ends_with(";base64") {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .ok()
    } else {
        Some(payload.as_bytes().to_vec())
    }
}

fn truncated(descriptor: &str) -> String {
    descriptor.chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let source = IconSource::parse("https://example.com/pin.png").unwrap();
        assert_eq!(
            source,
            IconSource::Remote("https://example.com/pin.png".into())
        );
        assert!(source.is_remote());
        assert!(IconSource::parse("HTTP://example.com/a.png")
            .unwrap()
            .is_remote());
    }

    #[test]
    fn test_parse_data_url_base64() {
        let source = IconSource::parse("data:image/png;base64,AAEC").unwrap();
        assert_eq!(source, IconSource::inline(vec![0, 1, 2]));
    }

    #[test]
    fn test_parse_data_url_invalid_base64() {
        assert!(IconSource::parse("data:image/png;base64,@@@").is_err());
        assert!(IconSource::parse("data:image/png;base64").is_err());
    }

    #[test]
    fn test_parse_assets() {
        assert_eq!(
            IconSource::parse("asset://icons/pin.png").unwrap(),
            IconSource::Asset(PathBuf::from("icons/pin.png"))
        );
        assert_eq!(
            IconSource::parse("file:///tmp/pin.png").unwrap(),
            IconSource::Asset(PathBuf::from("/tmp/pin.png"))
        );
        assert_eq!(
            IconSource::parse("pin.png").unwrap(),
            IconSource::Asset(PathBuf::from("pin.png"))
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(IconSource::parse("  ").is_err());
        assert!(IconSource::parse("asset://").is_err());
    }

    #[test]
    fn test_source_id_inline_is_content_based() {
        let a = IconSource::inline(vec![1, 2, 3]);
        let b = IconSource::inline(vec![1, 2, 3]);
        let c = IconSource::inline(vec![1, 2, 4]);
        assert_eq!(a.source_id(), b.source_id());
        assert_ne!(a.source_id(), c.source_id());
    }

    #[test]
    fn test_asset_path_resolution() {
        let root = Path::new("/assets");
        assert_eq!(
            IconSource::asset_path(Path::new("pin.png"), root),
            PathBuf::from("/assets/pin.png")
        );
        assert_eq!(
            IconSource::asset_path(Path::new("/abs/pin.png"), root),
            PathBuf::from("/abs/pin.png")
        );
    }
}
