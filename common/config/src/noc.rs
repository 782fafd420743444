// Licensed under the Apache-2.0 license

//! Global network-on-chip addresses.
//!
//! ```text
//!  64    59        48      37         0
//!   -----------------------------------
//!   |res|V| coreId  | vpeId | offset  |
//!   -----------------------------------
//! ```

use core::fmt;

const ID_BITS: u32 = 64;
const RESERVED_BITS: u32 = 5;
const VALID_BITS: u32 = 1;
pub const CORE_BITS: u32 = 10;
pub const VPE_BITS: u32 = 11;
pub const OFFSET_BITS: u32 = ID_BITS - RESERVED_BITS - VALID_BITS - CORE_BITS - VPE_BITS;

const VALID_SHIFT: u32 = ID_BITS - RESERVED_BITS;
const CORE_SHIFT: u32 = VALID_SHIFT - CORE_BITS;
const VPE_SHIFT: u32 = CORE_SHIFT - VPE_BITS;

/// Number of PEs the core id field can name.
pub const MAX_CORES: usize = 1 << CORE_BITS;
/// First offset that no longer fits into a NoC address.
pub const MAX_OFFSET: u64 = 1 << OFFSET_BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NocAddr {
    pub valid: bool,
    pub core_id: u32,
    pub vpe_id: u32,
    pub offset: u64,
}

impl NocAddr {
    /// Returns `None` if a field does not fit its bit width.
    pub fn new(core_id: u32, vpe_id: u32, offset: u64) -> Option<Self> {
        if core_id >> CORE_BITS != 0 || vpe_id >> VPE_BITS != 0 || offset >> OFFSET_BITS != 0 {
            return None;
        }
        Some(NocAddr {
            valid: true,
            core_id,
            vpe_id,
            offset,
        })
    }

    pub fn from_raw(addr: u64) -> Self {
        NocAddr {
            valid: (addr >> VALID_SHIFT) & 1 != 0,
            core_id: ((addr >> CORE_SHIFT) & ((1 << CORE_BITS) - 1)) as u32,
            vpe_id: ((addr >> VPE_SHIFT) & ((1 << VPE_BITS) - 1)) as u32,
            offset: addr & (MAX_OFFSET - 1),
        }
    }

    pub fn raw(&self) -> u64 {
        (self.valid as u64) << VALID_SHIFT
            | (self.core_id as u64) << CORE_SHIFT
            | (self.vpe_id as u64) << VPE_SHIFT
            | self.offset
    }
}

impl fmt::Display for NocAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PE{}:VPE{}:{:#x} ({:#018x})",
            self.core_id,
            self.vpe_id,
            self.offset,
            self.raw()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_layout() {
        assert_eq!(OFFSET_BITS, 37);
        let addr = NocAddr::new(1, 0, 0).unwrap();
        assert_eq!(addr.raw(), (1 << 59) | (1 << 49));
    }

    #[test]
    fn test_decode() {
        let addr = NocAddr::new(0x3ff, 0x7ff, MAX_OFFSET - 1).unwrap();
        assert_eq!(NocAddr::from_raw(addr.raw()), addr);
        assert!(!NocAddr::from_raw(0x1234).valid);
    }

    #[test]
    fn test_field_overflow() {
        assert!(NocAddr::new(MAX_CORES as u32, 0, 0).is_none());
        assert!(NocAddr::new(0, 1 << VPE_BITS, 0).is_none());
        assert!(NocAddr::new(0, 0, MAX_OFFSET).is_none());
    }
}
