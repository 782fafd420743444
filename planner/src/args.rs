// Licensed under the Apache-2.0 license

use crate::error::{PlanError, PlanResult};
use crate::layout::SimulationParams;
use clap::{Parser, ValueEnum};
use clap_num::maybe_hex;
use log::LevelFilter;
use m3_config::PeMemoryMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuType {
    Atomic,
    Timing,
    Minor,
    Detailed,
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, name = "M3 Layout Planner")]
pub struct PlannerArgs {
    /// Topology file (TOML) listing the PEs in order
    #[arg(short, long)]
    pub topology: PathBuf,

    /// Number of filesystem image replicas per memory PE (default: 1)
    #[arg(long, env = "M3_NUMFS")]
    pub num_fs: Option<NonZeroU32>,

    /// Type of cpu to run with
    #[arg(long, value_enum, default_value_t = CpuType::Atomic)]
    pub cpu_type: CpuType,

    /// Type of memory controller for memory PEs
    #[arg(long, default_value = "DDR4_2400_x64")]
    pub mem_type: String,

    /// Stop after T ticks
    #[arg(short, long, default_value_t = u64::MAX)]
    pub maxtick: u64,

    /// The PE to pause until GDB connects
    #[arg(long)]
    pub pause_pe: Option<usize>,

    /// Remote GDB base port
    #[arg(long, default_value_t = 7000)]
    pub remote_gdb_port: u16,

    /// Override the start of the boot-module window
    #[arg(long, value_parser=maybe_hex::<u64>)]
    pub base_offset: Option<u64>,
    /// Override the size of the boot-module window
    #[arg(long, value_parser=maybe_hex::<u64>)]
    pub mod_size: Option<u64>,
    /// Override the size of each per-PE slot
    #[arg(long, value_parser=maybe_hex::<u64>)]
    pub pe_size: Option<u64>,

    /// Write the plan as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl PlannerArgs {
    pub fn memory_map(&self) -> PlanResult<PeMemoryMap> {
        let defaults = PeMemoryMap::default();
        let base_offset = self.base_offset.unwrap_or(defaults.base_offset);
        let mod_size = self.mod_size.unwrap_or(defaults.mod_size);
        let pe_size = self.pe_size.unwrap_or(defaults.pe_size);
        PeMemoryMap::new(base_offset, mod_size, pe_size).ok_or_else(|| {
            PlanError::InvalidMemoryMap(format!(
                "base offset {:#x} + module size {:#x} exceeds the 64-bit address space",
                base_offset, mod_size
            ))
        })
    }

    pub fn sim_params(&self) -> SimulationParams {
        SimulationParams {
            max_tick: self.maxtick,
            pause_pe: self.pause_pe,
            remote_gdb_port: self.remote_gdb_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = PlannerArgs::try_parse_from(["m3-planner", "-t", "system.toml"]).unwrap();
        assert_eq!(args.cpu_type, CpuType::Atomic);
        assert_eq!(args.cpu_type.to_string(), "atomic");
        assert_eq!(args.memory_map().unwrap(), PeMemoryMap::default());
        assert_eq!(args.sim_params(), SimulationParams::default());
        assert_eq!(args.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_overrides() {
        let args = PlannerArgs::try_parse_from([
            "m3-planner",
            "--topology",
            "system.toml",
            "--num-fs",
            "3",
            "--cpu-type",
            "detailed",
            "--pe-size",
            "0x1000000",
            "--base-offset",
            "0x40000000",
            "--pause-pe",
            "2",
            "--maxtick",
            "1000",
        ])
        .unwrap();
        assert_eq!(args.num_fs, NonZeroU32::new(3));
        assert_eq!(args.cpu_type, CpuType::Detailed);
        let map = args.memory_map().unwrap();
        assert_eq!(map.pe_size, 16 << 20);
        assert_eq!(map.mod_offset, 1 << 30);
        assert_eq!(map.pe_offset, (1 << 30) + (16 << 20));
        assert_eq!(args.sim_params().pause_pe, Some(2));
        assert_eq!(args.sim_params().max_tick, 1000);
    }

    #[test]
    fn test_overflowing_base_offset() {
        let args = PlannerArgs::try_parse_from([
            "m3-planner",
            "-t",
            "system.toml",
            "--base-offset",
            "0xfffffffffffff000",
            "--mod-size",
            "0x2000",
        ])
        .unwrap();
        let err = args.memory_map().unwrap_err();
        assert!(matches!(err, PlanError::InvalidMemoryMap(_)));
        assert!(err.to_string().contains("0xfffffffffffff000"), "{}", err);
    }

    #[test]
    fn test_zero_replicas_rejected() {
        assert!(
            PlannerArgs::try_parse_from(["m3-planner", "-t", "a.toml", "--num-fs", "0"]).is_err()
        );
    }
}
