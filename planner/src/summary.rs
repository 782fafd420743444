// Licensed under the Apache-2.0 license

//! Human-readable description of a plan, one block per PE.

use crate::cmdline;
use crate::dtu::DtuParams;
use crate::layout::{ComputeTilePlan, MemoryTilePlan, SystemPlan, TilePlan};
use crate::tile::LocalMemory;
use std::fmt;

pub struct PlanSummary<'a> {
    plan: &'a SystemPlan,
    cpu_type: &'a str,
    mem_type: &'a str,
}

impl<'a> PlanSummary<'a> {
    pub fn new(plan: &'a SystemPlan, cpu_type: &'a str, mem_type: &'a str) -> Self {
        PlanSummary {
            plan,
            cpu_type,
            mem_type,
        }
    }

    fn write_compute(&self, f: &mut fmt::Formatter<'_>, pe: &ComputeTilePlan) -> fmt::Result {
        writeln!(f, "PE{:02}: {}", pe.tile, pe.cmdline)?;
        writeln!(f, "      core   ={} x86", self.cpu_type)?;
        match pe.local {
            LocalMemory::Cache { l1, l2 } => {
                writeln!(f, "      L1cache={} KiB", l1.kib())?;
                if let Some(l2) = l2 {
                    writeln!(f, "      L2cache={} KiB", l2.kib())?;
                }
            }
            LocalMemory::Scratchpad { size } => writeln!(f, "      memsize={} KiB", size.kib())?,
        }
        writeln!(
            f,
            "      slot   ={} in PE{:02} (argc={})",
            pe.region,
            pe.memory_pe,
            cmdline::argc(&pe.cmdline)
        )?;
        if pe.modules.is_some() {
            let modules: Vec<&str> = pe
                .cmdline
                .split_whitespace()
                .skip(1)
                .filter(|arg| !cmdline::is_kernel_arg(arg))
                .collect();
            writeln!(f, "      modules={}", modules.join(" "))?;
        }
        Ok(())
    }

    fn write_memory(&self, f: &mut fmt::Formatter<'_>, mem: &MemoryTilePlan) -> fmt::Result {
        let placement = &mem.placement;
        match (&mem.image_path, placement.image) {
            (Some(path), Some(image)) => writeln!(
                f,
                "PE{:02}: {} (replicas={})",
                placement.tile, path, image.replicas
            )?,
            _ => writeln!(f, "PE{:02}: memory", placement.tile)?,
        }
        writeln!(f, "      memctrl={}", self.mem_type)?;
        writeln!(f, "      memsize={} KiB", placement.capacity / 1024)?;
        if let Some(image) = placement.image {
            writeln!(f, "      fsimgsize={} KiB", image.size / 1024)?;
        }
        Ok(())
    }
}

fn write_dtu(f: &mut fmt::Formatter<'_>, dtu: &DtuParams) -> fmt::Result {
    writeln!(
        f,
        "      bufsize={} B, blocksize={} B, count={}",
        dtu.buf_size, dtu.block_size, dtu.buf_count
    )
}

impl fmt::Display for PlanSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tile in &self.plan.tiles {
            match tile {
                TilePlan::Compute(pe) => self.write_compute(f, pe)?,
                TilePlan::Memory(mem) => self.write_memory(f, mem)?,
            }
            write_dtu(f, tile.dtu())?;
            if matches!(tile, TilePlan::Compute(_)) && self.plan.sim.pause_pe == Some(tile.tile()) {
                writeln!(f, "      waiting for GDB")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
