// Licensed under the Apache-2.0 license

//! Buffer and endpoint parameters of the DTU attached to every tile.

use crate::tile::LocalMemory;
use m3_config::PeMemoryMap;
use serde::Serialize;

pub const NUM_ENDPOINTS: u32 = 16;
pub const MAX_NOC_PACKET_SIZE: u64 = 4096;
pub const MEM_BUF_COUNT: u32 = 8;

const DEFAULT_BLOCK_SIZE: u64 = 64;
const DEFAULT_BUF_COUNT: u32 = 4;
const DEFAULT_TLB_ENTRIES: u32 = 32;

/// Invariant: `buf_size >= max_noc_packet_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DtuParams {
    pub num_endpoints: u32,
    pub max_noc_packet_size: u64,
    pub block_size: u64,
    pub buf_size: u64,
    pub buf_count: u32,
    pub tlb_entries: u32,
    pub regfile_base_addr: u64,
    pub rw_barrier: u64,
}

impl DtuParams {
    fn new(map: &PeMemoryMap) -> Self {
        DtuParams {
            num_endpoints: NUM_ENDPOINTS,
            max_noc_packet_size: MAX_NOC_PACKET_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            buf_size: MAX_NOC_PACKET_SIZE,
            buf_count: DEFAULT_BUF_COUNT,
            tlb_entries: DEFAULT_TLB_ENTRIES,
            regfile_base_addr: map.regfile_base_addr,
            rw_barrier: map.rw_barrier,
        }
    }

    // Memory and SPM tiles move whole packets between memory and the NoC, so the
    // buffer degenerates to a single packet and the TLB is unused.
    fn packet_buffered(mut self) -> Self {
        self.block_size = self.max_noc_packet_size;
        self.buf_size = self.max_noc_packet_size;
        self.tlb_entries = 0;
        self
    }

    pub fn for_memory_tile(map: &PeMemoryMap) -> Self {
        DtuParams {
            buf_count: MEM_BUF_COUNT,
            ..DtuParams::new(map)
        }
        .packet_buffered()
    }

    pub fn for_compute_tile(map: &PeMemoryMap, local: &LocalMemory) -> Self {
        match local {
            LocalMemory::Scratchpad { .. } => DtuParams::new(map).packet_buffered(),
            LocalMemory::Cache { .. } => DtuParams::new(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::MemorySize;

    #[test]
    fn test_memory_tile() {
        let dtu = DtuParams::for_memory_tile(&PeMemoryMap::default());
        assert_eq!(dtu.buf_count, 8);
        assert_eq!(dtu.buf_size, 4096);
        assert_eq!(dtu.block_size, 4096);
        assert_eq!(dtu.tlb_entries, 0);
    }

    #[test]
    fn test_compute_tiles() {
        let map = PeMemoryMap::default();
        let spm = DtuParams::for_compute_tile(
            &map,
            &LocalMemory::Scratchpad {
                size: MemorySize(8 << 20),
            },
        );
        assert_eq!(spm.block_size, spm.max_noc_packet_size);
        assert_eq!(spm.tlb_entries, 0);

        let cache = DtuParams::for_compute_tile(
            &map,
            &LocalMemory::Cache {
                l1: MemorySize(64 << 10),
                l2: None,
            },
        );
        assert!(cache.tlb_entries > 0);
        assert!(cache.buf_size >= cache.max_noc_packet_size);
        assert_eq!(cache.regfile_base_addr, 0x5_C000_0000);
    }
}
