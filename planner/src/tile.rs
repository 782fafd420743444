// Licensed under the Apache-2.0 license

//! The tiles ("PEs") a system is assembled from.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const KIB: u64 = 1024;

/// Scratchpad size of a compute tile that specifies neither a scratchpad nor a cache.
pub const DEFAULT_SPM_SIZE: MemorySize = MemorySize(8 * KIB * KIB);

/// A size in bytes. Deserializes from an integer or from strings such as `"8MB"` or `"64KiB"`.
/// All units are binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MemorySize(pub u64);

impl MemorySize {
    pub fn bytes(&self) -> u64 {
        self.0
    }

    pub fn kib(&self) -> u64 {
        self.0 / KIB
    }
}

impl From<u64> for MemorySize {
    fn from(bytes: u64) -> Self {
        MemorySize(bytes)
    }
}

impl FromStr for MemorySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: u64 = num
            .parse()
            .map_err(|_| format!("Invalid memory size: '{}'", s))?;
        let shift = match unit.trim() {
            "" | "B" => 0,
            "kB" | "KB" | "KiB" => 10,
            "MB" | "MiB" => 20,
            "GB" | "GiB" => 30,
            "TB" | "TiB" => 40,
            other => return Err(format!("Unknown memory size unit '{}' in '{}'", other, s)),
        };
        value
            .checked_mul(1 << shift)
            .map(MemorySize)
            .ok_or_else(|| format!("Memory size '{}' is out of range", s))
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u32, &str); 4] = [(40, "TiB"), (30, "GiB"), (20, "MiB"), (10, "KiB")];
        for (shift, unit) in UNITS {
            let scale = 1u64 << shift;
            if self.0 >= scale && self.0 % scale == 0 {
                return write!(f, "{}{}", self.0 / scale, unit);
            }
        }
        write!(f, "{}B", self.0)
    }
}

impl<'de> Deserialize<'de> for MemorySize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bytes(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bytes(bytes) => Ok(MemorySize(bytes)),
            Raw::Text(s) => MemorySize::from_str(&s).map_err(de::Error::custom),
        }
    }
}

impl Serialize for MemorySize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Tile {
    Compute(ComputeTile),
    Memory(MemoryTile),
}

impl Tile {
    pub fn as_memory(&self) -> Option<&MemoryTile> {
        match self {
            Tile::Memory(mem) => Some(mem),
            Tile::Compute(_) => None,
        }
    }
}

/// A tile with a core, a DTU and either a scratchpad or a cache hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawComputeTile", into = "RawComputeTile")]
pub struct ComputeTile {
    pub cmdline: String,
    /// The memory tile that backs this tile's private slot.
    pub memory_pe: usize,
    pub local: LocalMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalMemory {
    Scratchpad {
        size: MemorySize,
    },
    Cache {
        l1: MemorySize,
        l2: Option<MemorySize>,
    },
}

impl LocalMemory {
    /// The scratchpad size, if this tile has one.
    pub fn spm_size(&self) -> Option<MemorySize> {
        match self {
            LocalMemory::Scratchpad { size } => Some(*size),
            LocalMemory::Cache { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    pub l1: MemorySize,
    pub l2: Option<MemorySize>,
}

/// On-disk form of a compute tile: `spm` and `cache` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawComputeTile {
    cmdline: String,
    memory_pe: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spm: Option<MemorySize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache: Option<CacheConfig>,
}

impl TryFrom<RawComputeTile> for ComputeTile {
    type Error = String;

    fn try_from(raw: RawComputeTile) -> Result<Self, Self::Error> {
        let local = match (raw.spm, raw.cache) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "tile '{}' specifies both a scratchpad and a cache",
                    raw.cmdline
                ))
            }
            (Some(size), None) => LocalMemory::Scratchpad { size },
            (None, Some(cache)) => LocalMemory::Cache {
                l1: cache.l1,
                l2: cache.l2,
            },
            (None, None) => LocalMemory::Scratchpad {
                size: DEFAULT_SPM_SIZE,
            },
        };
        Ok(ComputeTile {
            cmdline: raw.cmdline,
            memory_pe: raw.memory_pe,
            local,
        })
    }
}

impl From<ComputeTile> for RawComputeTile {
    fn from(tile: ComputeTile) -> Self {
        let (spm, cache) = match tile.local {
            LocalMemory::Scratchpad { size } => (Some(size), None),
            LocalMemory::Cache { l1, l2 } => (None, Some(CacheConfig { l1, l2 })),
        };
        RawComputeTile {
            cmdline: tile.cmdline,
            memory_pe: tile.memory_pe,
            spm,
            cache,
        }
    }
}

/// A DRAM tile, optionally preloaded with a filesystem image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryTile {
    pub capacity: MemorySize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<FsImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PathBuf", into = "PathBuf")]
pub struct FsImage {
    pub path: PathBuf,
    /// Filled in from the file system when the topology is loaded.
    pub size: u64,
}

impl From<PathBuf> for FsImage {
    fn from(path: PathBuf) -> Self {
        FsImage { path, size: 0 }
    }
}

impl From<FsImage> for PathBuf {
    fn from(image: FsImage) -> Self {
        image.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_size() {
        assert_eq!("8MB".parse::<MemorySize>().unwrap().bytes(), 8 << 20);
        assert_eq!("64kB".parse::<MemorySize>().unwrap().bytes(), 64 << 10);
        assert_eq!("4KiB".parse::<MemorySize>().unwrap().bytes(), 4096);
        assert_eq!("3GB".parse::<MemorySize>().unwrap().bytes(), 3 << 30);
        assert_eq!("512".parse::<MemorySize>().unwrap().bytes(), 512);
        assert_eq!(" 1 GiB ".parse::<MemorySize>().unwrap().bytes(), 1 << 30);
        assert!("8XB".parse::<MemorySize>().is_err());
        assert!("MB".parse::<MemorySize>().is_err());
        assert!("99999999999TB".parse::<MemorySize>().is_err());
    }

    #[test]
    fn test_display_memory_size() {
        assert_eq!(MemorySize(8 << 20).to_string(), "8MiB");
        assert_eq!(MemorySize(1536 << 10).to_string(), "1536KiB");
        assert_eq!(MemorySize(100).to_string(), "100B");
    }

    #[derive(Deserialize)]
    struct Tiles {
        tiles: Vec<Tile>,
    }

    #[test]
    fn test_deserialize_tiles() {
        let parsed: Tiles = toml::from_str(
            r#"
            [[tiles]]
            kind = "compute"
            cmdline = "kernel"
            memory_pe = 3
            spm = "4MB"

            [[tiles]]
            kind = "compute"
            cmdline = "fs"
            memory_pe = 3
            cache = { l1 = "64kB", l2 = 262144 }

            [[tiles]]
            kind = "compute"
            cmdline = "idle"
            memory_pe = 3

            [[tiles]]
            kind = "memory"
            capacity = "1GB"
            image = "build/fs.img"
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.tiles[0],
            Tile::Compute(ComputeTile {
                cmdline: "kernel".to_string(),
                memory_pe: 3,
                local: LocalMemory::Scratchpad {
                    size: MemorySize(4 << 20)
                },
            })
        );
        match &parsed.tiles[1] {
            Tile::Compute(tile) => assert_eq!(
                tile.local,
                LocalMemory::Cache {
                    l1: MemorySize(64 << 10),
                    l2: Some(MemorySize(256 << 10)),
                }
            ),
            other => panic!("unexpected tile {:?}", other),
        }
        match &parsed.tiles[2] {
            Tile::Compute(tile) => assert_eq!(tile.local.spm_size(), Some(DEFAULT_SPM_SIZE)),
            other => panic!("unexpected tile {:?}", other),
        }
        let mem = parsed.tiles[3].as_memory().unwrap();
        assert_eq!(mem.capacity.bytes(), 1 << 30);
        assert_eq!(
            mem.image.as_ref().unwrap().path,
            PathBuf::from("build/fs.img")
        );
    }

    #[test]
    fn test_reject_spm_and_cache() {
        let parsed = toml::from_str::<Tiles>(
            r#"
            [[tiles]]
            kind = "compute"
            cmdline = "app"
            memory_pe = 1
            spm = "8MB"
            cache = { l1 = "64kB" }
            "#,
        );
        let err = parsed.err().unwrap().to_string();
        assert!(err.contains("both a scratchpad and a cache"), "{}", err);
    }
}
