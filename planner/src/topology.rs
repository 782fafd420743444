// Licensed under the Apache-2.0 license

use crate::error::{PlanError, PlanResult};
use crate::tile::Tile;
use m3_config::noc::MAX_CORES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The ordered list of tiles that make up a system. A tile's position is its PE id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    pub tiles: Vec<Tile>,
}

impl Topology {
    /// Parses a topology without touching the file system; image sizes stay zero.
    pub fn from_toml_str(contents: &str) -> PlanResult<Self> {
        let topology: Topology = toml::de::from_str(contents)?;
        topology.verify()?;
        Ok(topology)
    }

    /// Parses a topology file and resolves the size of every filesystem image.
    pub fn parse_file(path: &Path) -> PlanResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut topology = Topology::from_toml_str(&contents)?;
        topology.resolve_images()?;
        Ok(topology)
    }

    pub fn verify(&self) -> PlanResult<()> {
        if self.is_empty() {
            return Err(PlanError::InvalidTopology(
                "at least one tile is required".to_string(),
            ));
        }
        if self.tiles.len() > MAX_CORES {
            return Err(PlanError::InvalidTopology(format!(
                "{} tiles exceed the {} PEs a NoC address can name",
                self.tiles.len(),
                MAX_CORES
            )));
        }
        Ok(())
    }

    fn resolve_images(&mut self) -> PlanResult<()> {
        for (no, tile) in self.tiles.iter_mut().enumerate() {
            let Tile::Memory(mem) = tile else {
                continue;
            };
            if let Some(image) = mem.image.as_mut() {
                let meta = fs::metadata(&image.path).map_err(|source| PlanError::Io {
                    path: image.path.clone(),
                    source,
                })?;
                image.size = meta.len();
                log::debug!(
                    "PE{:02}: image {} has {} bytes",
                    no,
                    image.path.display(),
                    image.size
                );
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{ComputeTile, LocalMemory, DEFAULT_SPM_SIZE};

    #[test]
    fn test_empty_topology() {
        let err = Topology::from_toml_str("tiles = []").unwrap_err();
        assert!(matches!(err, PlanError::InvalidTopology(_)));
    }

    #[test]
    fn test_too_many_tiles() {
        let idle = Tile::Compute(ComputeTile {
            cmdline: "idle".to_string(),
            memory_pe: 0,
            local: LocalMemory::Scratchpad {
                size: DEFAULT_SPM_SIZE,
            },
        });
        let mut topology = Topology {
            tiles: vec![idle; MAX_CORES],
        };
        assert!(topology.verify().is_ok());
        assert_eq!(topology.len(), MAX_CORES);

        topology.tiles.push(topology.tiles[0].clone());
        let err = topology.verify().unwrap_err();
        assert!(matches!(err, PlanError::InvalidTopology(_)));
        assert!(err.to_string().contains("1025 tiles"), "{}", err);
    }

    #[test]
    fn test_unknown_kind() {
        let err = Topology::from_toml_str(
            r#"
            [[tiles]]
            kind = "accelerator"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::Toml(_)));
    }

    #[test]
    fn test_image_size_left_unresolved() {
        let topology = Topology::from_toml_str(
            r#"
            [[tiles]]
            kind = "memory"
            capacity = "1GB"
            image = "does/not/exist.img"
            "#,
        )
        .unwrap();
        let image = topology.tiles[0].as_memory().unwrap().image.as_ref().unwrap();
        assert_eq!(image.size, 0);
    }
}
