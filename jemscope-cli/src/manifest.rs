//! Dump manifests.
//!
//! A manifest describes a captured process image:
//!
//! ```toml
//! pointer_width = 8
//! page_size = 4096
//!
//! [symbols]
//! je_chunksize = 0x7f8a2c1e40
//! je_arena_bin_info = 0x7f8a2c3000
//!
//! [[segments]]
//! base = 0x7f80000000
//! file = "segments/7f80000000.bin"
//! ```
//!
//! Segment files hold raw bytes and are resolved relative to the manifest.

use jemscope::{Address, MemoryImage};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported pointer width {0} (expected 4 or 8)")]
    PointerWidth(u64),

    #[error("segment at {base:#x} is empty ({})", file.display())]
    EmptySegment { base: Address, file: PathBuf },

    #[error("segment at {base:#x} overlaps the segment at {previous:#x}")]
    Overlap { base: Address, previous: Address },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub pointer_width: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u64,

    #[serde(default)]
    pub symbols: BTreeMap<String, Address>,

    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub base: Address,
    pub file: PathBuf,
}

fn default_page_size() -> u64 {
    4096
}

impl Manifest {
    /// Parse and validate a manifest.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if !matches!(manifest.pointer_width, 4 | 8) {
            return Err(ManifestError::PointerWidth(manifest.pointer_width));
        }
        Ok(manifest)
    }

    /// Read a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Read every segment file and build the image.
    pub fn into_image(self, root: &Path) -> Result<MemoryImage, ManifestError> {
        let mut image = MemoryImage::new(self.pointer_width).with_page_size(self.page_size);
        for (name, address) in self.symbols {
            image.define_symbol(name, address);
        }

        let mut segments = self.segments;
        segments.sort_by_key(|segment| segment.base);

        let mut previous: Option<(Address, u64)> = None;
        for segment in segments {
            let path = root.join(&segment.file);
            let bytes = std::fs::read(&path).map_err(|source| ManifestError::Read {
                path: path.clone(),
                source,
            })?;
            if bytes.is_empty() {
                return Err(ManifestError::EmptySegment {
                    base: segment.base,
                    file: segment.file,
                });
            }
            if let Some((start, end)) = previous {
                if segment.base < end {
                    return Err(ManifestError::Overlap {
                        base: segment.base,
                        previous: start,
                    });
                }
            }

            previous = Some((segment.base, segment.base.saturating_add(bytes.len() as u64)));
            image.map_bytes(segment.base, bytes);
        }

        Ok(image)
    }
}

/// Load the manifest at `path` and the segments it names.
pub fn load_image(path: &Path) -> Result<MemoryImage, ManifestError> {
    let manifest = Manifest::load(path)?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.into_image(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jemscope::MemoryReader;

    fn write_dump(dir: &Path, manifest: &str, segments: &[(&str, &[u8])]) -> PathBuf {
        for (name, bytes) in segments {
            std::fs::write(dir.join(name), bytes).unwrap();
        }
        let path = dir.join("dump.toml");
        std::fs::write(&path, manifest).unwrap();
        path
    }

    #[test]
    fn test_load_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dump(
            dir.path(),
            r#"
pointer_width = 8

[symbols]
je_chunksize = 0x1000

[[segments]]
base = 0x1000
file = "low.bin"

[[segments]]
base = 0x2000
file = "high.bin"
"#,
            &[
                ("low.bin", &0x20_0000u64.to_le_bytes()[..]),
                ("high.bin", &[0xaa; 16][..]),
            ],
        );

        let image = load_image(&path).unwrap();
        assert_eq!(image.segment_count(), 2);
        assert_eq!(image.page_size(), 4096);
        assert_eq!(image.resolve_symbol("je_chunksize"), Some(0x1000));
        assert_eq!(image.read_u64(0x1000).unwrap(), 0x20_0000);
        assert_eq!(image.read_u8(0x200f).unwrap(), 0xaa);
        assert!(image.read_u8(0x2010).is_err());
    }

    #[test]
    fn test_rejects_bad_pointer_width() {
        let err = Manifest::parse(Path::new("dump.toml"), "pointer_width = 2\n").unwrap_err();
        assert!(matches!(err, ManifestError::PointerWidth(2)));
    }

    #[test]
    fn test_rejects_overlapping_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dump(
            dir.path(),
            r#"
pointer_width = 4

[[segments]]
base = 0x1008
file = "b.bin"

[[segments]]
base = 0x1000
file = "a.bin"
"#,
            &[("a.bin", &[0; 16][..]), ("b.bin", &[0; 16][..])],
        );

        let err = load_image(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Overlap { base: 0x1008, previous: 0x1000 }));
    }

    #[test]
    fn test_missing_segment_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dump(
            dir.path(),
            "pointer_width = 8\n\n[[segments]]\nbase = 0\nfile = \"gone.bin\"\n",
            &[],
        );

        let err = load_image(&path).unwrap_err();
        assert!(err.to_string().contains("gone.bin"));
    }
}
