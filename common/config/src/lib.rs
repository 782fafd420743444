// Licensed under the Apache-2.0 license

pub mod noc;

pub use noc::NocAddr;

pub const PAGE_BITS: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_BITS;

const MIB: u64 = 1024 * 1024;

/// Configures the physical memory layout every memory PE provides.
/// These are the defaults of the reference system; the planner accepts overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeMemoryMap {
    pub base_offset: u64,
    pub mod_offset: u64,
    pub mod_size: u64,
    pub pe_offset: u64,
    pub pe_size: u64,
    pub io_space_base: u64,
    pub interrupts_space_base: u64,
    pub apic_range_size: u64,
    pub regfile_base_addr: u64,
    pub rw_barrier: u64,
}

const DEFAULT_BASE_OFFSET: u64 = 6144 * MIB;
const DEFAULT_MOD_SIZE: u64 = 16 * MIB;
const DEFAULT_PE_SIZE: u64 = 8 * MIB;

impl Default for PeMemoryMap {
    fn default() -> Self {
        PeMemoryMap {
            base_offset: DEFAULT_BASE_OFFSET,
            mod_offset: DEFAULT_BASE_OFFSET,
            mod_size: DEFAULT_MOD_SIZE,
            pe_offset: DEFAULT_BASE_OFFSET + DEFAULT_MOD_SIZE,
            pe_size: DEFAULT_PE_SIZE,
            io_space_base: 0xff20_0000_0000_0000,
            interrupts_space_base: 0xff40_0000_0000_0000,
            apic_range_size: PAGE_SIZE,
            regfile_base_addr: 0x5_C000_0000,
            rw_barrier: 0x5_B000_0000,
        }
    }
}

impl PeMemoryMap {
    /// Builds a map with the boot-module window at `base_offset` followed by the per-PE slots.
    /// Returns `None` if the window ends beyond the 64-bit address space.
    pub fn new(base_offset: u64, mod_size: u64, pe_size: u64) -> Option<Self> {
        let pe_offset = base_offset.checked_add(mod_size)?;
        Some(PeMemoryMap {
            base_offset,
            mod_offset: base_offset,
            mod_size,
            pe_offset,
            pe_size,
            ..PeMemoryMap::default()
        })
    }

    /// Offset of the slot reserved for PE `index` inside every memory PE.
    pub fn pe_region_offset(&self, index: u64) -> Option<u64> {
        self.pe_size
            .checked_mul(index)
            .and_then(|off| off.checked_add(self.pe_offset))
    }

    pub fn hash_map(&self) -> std::collections::HashMap<String, String> {
        let mut map = std::collections::HashMap::new();
        map.insert(
            "BASE_OFFSET".to_string(),
            format!("0x{:x}", self.base_offset),
        );
        map.insert("MOD_OFFSET".to_string(), format!("0x{:x}", self.mod_offset));
        map.insert("MOD_SIZE".to_string(), format!("0x{:x}", self.mod_size));
        map.insert("PE_OFFSET".to_string(), format!("0x{:x}", self.pe_offset));
        map.insert("PE_SIZE".to_string(), format!("0x{:x}", self.pe_size));
        map.insert(
            "IO_SPACE_BASE".to_string(),
            format!("0x{:x}", self.io_space_base),
        );
        map.insert(
            "INTERRUPTS_SPACE_BASE".to_string(),
            format!("0x{:x}", self.interrupts_space_base),
        );
        map.insert(
            "APIC_RANGE_SIZE".to_string(),
            format!("0x{:x}", self.apic_range_size),
        );
        map.insert(
            "REGFILE_BASE_ADDR".to_string(),
            format!("0x{:x}", self.regfile_base_addr),
        );
        map.insert("RW_BARRIER".to_string(), format!("0x{:x}", self.rw_barrier));
        map
    }
}
