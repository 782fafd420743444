// Licensed under the Apache-2.0 license

use std::path::PathBuf;
use thiserror::Error;

pub type PlanResult<T> = Result<T, PlanError>;

/// Every planning failure is fatal: the system must not be instantiated.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("PE{tile:02} is too large: requested {requested} bytes, maximum allowed SPM size is {limit} bytes")]
    CapacityExceeded { tile: usize, requested: u64, limit: u64 },
    #[error("{}memory size {size:#x} is not page aligned", tile_prefix(.tile))]
    AlignmentViolation { tile: Option<usize>, size: u64 },
    #[error("PE{tile:02}: filesystem image of {size} bytes does not fit the module reservation of {limit} bytes")]
    ImageTooLarge { tile: usize, size: u64, limit: u64 },
    #[error("PE{tile:02}: not enough memory for filesystem ({required} bytes required, {capacity} bytes available)")]
    InsufficientCapacity {
        tile: usize,
        required: u128,
        capacity: u64,
    },
    #[error("PE{tile:02}: memory PE {memory_pe} is not a memory tile")]
    InvalidBackingTile { tile: usize, memory_pe: usize },
    #[error("PE{tile:02}: slot ends at {end:#x} but memory PE {memory_pe} only has {capacity:#x} bytes")]
    BackingTooSmall {
        tile: usize,
        memory_pe: usize,
        end: u64,
        capacity: u64,
    },
    #[error("PE{tile:02}: address {offset:#x} does not fit into a NoC address")]
    AddressOverflow { tile: usize, offset: u64 },
    #[error("PE{tile:02}: slot of {pe_size:#x} bytes after {pe_offset:#x} exceeds the 64-bit address space")]
    SlotOutOfRange {
        tile: usize,
        pe_offset: u64,
        pe_size: u64,
    },
    #[error("Invalid memory map: {0}")]
    InvalidMemoryMap(String),
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
    #[error("Cannot access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse topology: {0}")]
    Toml(#[from] toml::de::Error),
}

fn tile_prefix(tile: &Option<usize>) -> String {
    match tile {
        Some(tile) => format!("PE{:02}: ", tile),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = PlanError::CapacityExceeded {
            tile: 3,
            requested: 16 << 20,
            limit: 8 << 20,
        };
        assert_eq!(
            err.to_string(),
            "PE03 is too large: requested 16777216 bytes, maximum allowed SPM size is 8388608 bytes"
        );

        let err = PlanError::AlignmentViolation {
            tile: None,
            size: 0x1001,
        };
        assert_eq!(err.to_string(), "memory size 0x1001 is not page aligned");

        let err = PlanError::AlignmentViolation {
            tile: Some(1),
            size: 0x1001,
        };
        assert_eq!(err.to_string(), "PE01: memory size 0x1001 is not page aligned");
    }
}
