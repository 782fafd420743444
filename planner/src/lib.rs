/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Library interface for the M3 physical memory layout planner.

--*/

pub mod args;
pub mod cmdline;
pub mod dtu;
pub mod error;
pub mod layout;
pub mod summary;
pub mod tile;
pub mod topology;

pub use args::{CpuType, PlannerArgs};
pub use error::{PlanError, PlanResult};
pub use layout::{
    classify_tile_sizes, plan_compute_tile_region, plan_memory_tile_content, AddressRegion,
    MemoryPlacementPlan, PlanBuilder, SimulationParams, SystemPlan, TilePlan, TileSizeTag,
};
pub use summary::PlanSummary;
pub use tile::{ComputeTile, FsImage, LocalMemory, MemorySize, MemoryTile, Tile};
pub use topology::Topology;
