// Licensed under the Apache-2.0 license

//! Physical address-space layout of a multi-PE system.
//!
//! Every memory PE reserves a boot-module window at `mod_offset` followed by one
//! equally sized slot per PE index. A compute PE uses the slot matching its own
//! index inside the memory PE named by its `memory_pe`. Slots are never packed by
//! requested size, so placement needs no bin packing and can never collide.

use crate::cmdline;
use crate::dtu::DtuParams;
use crate::error::{PlanError, PlanResult};
use crate::tile::{LocalMemory, Tile};
use m3_config::noc::MAX_OFFSET;
use m3_config::{NocAddr, PeMemoryMap, PAGE_SIZE};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;

/// A half-open byte range `[base, base + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressRegion {
    pub base: u64,
    pub size: u64,
}

impl AddressRegion {
    pub fn new(base: u64, size: u64) -> Self {
        AddressRegion { base, size }
    }

    pub fn end(&self) -> u64 {
        self.base + self.size
    }

    pub fn contains(&self, other: &AddressRegion) -> bool {
        other.base >= self.base && other.end() <= self.end()
    }

    pub fn overlaps(&self, other: &AddressRegion) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

impl fmt::Display for AddressRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.base, self.end())
    }
}

/// Size of a PE as seen by every other PE: the size of its memory with bit 0 set
/// for memory PEs, or 0 for PEs without SPM or DRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TileSizeTag(pub u64);

impl TileSizeTag {
    pub fn is_memory(&self) -> bool {
        self.0 & 1 != 0
    }

    pub fn size(&self) -> u64 {
        self.0 & !1
    }
}

fn check_page_aligned(tile: Option<usize>, size: u64) -> PlanResult<()> {
    if size % PAGE_SIZE != 0 {
        return Err(PlanError::AlignmentViolation { tile, size });
    }
    Ok(())
}

/// Checks that all fixed windows of the memory map start and end on page boundaries
/// and that the per-PE slots start behind the boot-module window.
pub fn check_memory_map(map: &PeMemoryMap) -> PlanResult<()> {
    for value in [map.mod_offset, map.mod_size, map.pe_offset, map.pe_size] {
        check_page_aligned(None, value)?;
    }
    match map.mod_offset.checked_add(map.mod_size) {
        Some(mod_end) if mod_end <= map.pe_offset => Ok(()),
        _ => Err(PlanError::InvalidMemoryMap(format!(
            "boot-module window {:#x}+{:#x} overlaps the PE slots at {:#x}",
            map.mod_offset, map.mod_size, map.pe_offset
        ))),
    }
}

/// Returns the slot of compute PE `tile` inside its memory PE.
///
/// The slot always spans `pe_size` bytes, independent of how much of it the
/// scratchpad actually uses.
pub fn plan_compute_tile_region(
    map: &PeMemoryMap,
    tile: usize,
    requested: Option<u64>,
) -> PlanResult<AddressRegion> {
    if let Some(requested) = requested {
        if requested > map.pe_size {
            return Err(PlanError::CapacityExceeded {
                tile,
                requested,
                limit: map.pe_size,
            });
        }
    }
    let base = map
        .pe_region_offset(tile as u64)
        .filter(|base| base.checked_add(map.pe_size).is_some())
        .ok_or(PlanError::SlotOutOfRange {
            tile,
            pe_offset: map.pe_offset,
            pe_size: map.pe_size,
        })?;
    Ok(AddressRegion::new(base, map.pe_size))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImagePlacement {
    pub size: u64,
    pub replicas: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryPlacementPlan {
    pub tile: usize,
    pub capacity: u64,
    /// Window the boot modules are loaded into.
    pub modules: AddressRegion,
    pub image: Option<ImagePlacement>,
}

/// Validates the content of memory PE `tile`. `replicas` defaults to 1.
pub fn plan_memory_tile_content(
    map: &PeMemoryMap,
    tile: usize,
    capacity: u64,
    image_size: Option<u64>,
    replicas: Option<NonZeroU32>,
) -> PlanResult<MemoryPlacementPlan> {
    check_page_aligned(Some(tile), capacity)?;
    check_page_aligned(Some(tile), map.mod_size)?;

    let replicas = replicas.map_or(1, NonZeroU32::get);
    let image = match image_size {
        Some(size) => {
            if size > map.mod_size {
                return Err(PlanError::ImageTooLarge {
                    tile,
                    size,
                    limit: map.mod_size,
                });
            }
            let required = size as u128 * replicas as u128;
            if required > capacity as u128 {
                return Err(PlanError::InsufficientCapacity {
                    tile,
                    required,
                    capacity,
                });
            }
            Some(ImagePlacement { size, replicas })
        }
        None => None,
    };

    Ok(MemoryPlacementPlan {
        tile,
        capacity,
        modules: AddressRegion::new(map.mod_offset, map.mod_size),
        image,
    })
}

/// Computes the size tag of every tile, in tile order.
pub fn classify_tile_sizes(tiles: &[Tile]) -> PlanResult<Vec<TileSizeTag>> {
    tiles
        .iter()
        .enumerate()
        .map(|(no, tile)| match tile {
            Tile::Memory(mem) => {
                let size = mem.capacity.bytes();
                check_page_aligned(Some(no), size)?;
                Ok(TileSizeTag(size | 1))
            }
            Tile::Compute(compute) => match compute.local.spm_size() {
                Some(size) => {
                    check_page_aligned(Some(no), size.bytes())?;
                    Ok(TileSizeTag(size.bytes()))
                }
                None => Ok(TileSizeTag(0)),
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeTilePlan {
    pub tile: usize,
    pub cmdline: String,
    pub memory_pe: usize,
    pub local: LocalMemory,
    /// Slot inside `memory_pe`.
    pub region: AddressRegion,
    /// Global NoC address of `region`, filled in by [`PlanBuilder::finish`].
    pub noc_base: u64,
    /// Boot-module window, only mapped on kernel PEs.
    pub modules: Option<AddressRegion>,
    pub dtu: DtuParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryTilePlan {
    pub placement: MemoryPlacementPlan,
    pub image_path: Option<String>,
    /// Global NoC window covering the whole device.
    pub noc_window: AddressRegion,
    pub dtu: DtuParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TilePlan {
    Compute(ComputeTilePlan),
    Memory(MemoryTilePlan),
}

impl TilePlan {
    pub fn tile(&self) -> usize {
        match self {
            TilePlan::Compute(pe) => pe.tile,
            TilePlan::Memory(mem) => mem.placement.tile,
        }
    }

    pub fn dtu(&self) -> &DtuParams {
        match self {
            TilePlan::Compute(pe) => &pe.dtu,
            TilePlan::Memory(mem) => &mem.dtu,
        }
    }
}

/// Values handed to the simulation host untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationParams {
    pub max_tick: u64,
    /// PE that waits for a debugger before it starts.
    pub pause_pe: Option<usize>,
    pub remote_gdb_port: u16,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            max_tick: u64::MAX,
            pause_pe: None,
            remote_gdb_port: 7000,
        }
    }
}

/// The validated, immutable memory plan of a whole system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemPlan {
    pub tiles: Vec<TilePlan>,
    pub size_tags: Vec<TileSizeTag>,
    pub sim: SimulationParams,
}

impl SystemPlan {
    /// Plans every tile of `tiles` in order.
    pub fn build(
        map: PeMemoryMap,
        tiles: &[Tile],
        replicas: Option<NonZeroU32>,
        sim: SimulationParams,
    ) -> PlanResult<SystemPlan> {
        tiles
            .iter()
            .try_fold(PlanBuilder::new(map, replicas)?, |builder, tile| {
                builder.add_tile(tile)
            })?
            .with_sim(sim)
            .finish()
    }

    pub fn compute_tiles(&self) -> impl Iterator<Item = &ComputeTilePlan> {
        self.tiles.iter().filter_map(|tile| match tile {
            TilePlan::Compute(pe) => Some(pe),
            TilePlan::Memory(_) => None,
        })
    }

    pub fn memory_tiles(&self) -> impl Iterator<Item = &MemoryTilePlan> {
        self.tiles.iter().filter_map(|tile| match tile {
            TilePlan::Memory(mem) => Some(mem),
            TilePlan::Compute(_) => None,
        })
    }
}

/// Accumulates tile plans. Every step consumes the builder and either returns the
/// extended builder or the first error.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    map: PeMemoryMap,
    replicas: Option<NonZeroU32>,
    sim: SimulationParams,
    tiles: Vec<Tile>,
    plans: Vec<TilePlan>,
}

impl PlanBuilder {
    pub fn new(map: PeMemoryMap, replicas: Option<NonZeroU32>) -> PlanResult<Self> {
        check_memory_map(&map)?;
        Ok(PlanBuilder {
            map,
            replicas,
            sim: SimulationParams::default(),
            tiles: Vec::new(),
            plans: Vec::new(),
        })
    }

    pub fn with_sim(self, sim: SimulationParams) -> Self {
        PlanBuilder { sim, ..self }
    }

    /// Plans the next tile; its PE id is the number of tiles added before it.
    pub fn add_tile(mut self, tile: &Tile) -> PlanResult<Self> {
        let no = self.plans.len();
        let plan = match tile {
            Tile::Compute(pe) => {
                let requested = pe.local.spm_size().map(|size| size.bytes());
                let region = plan_compute_tile_region(&self.map, no, requested)?;
                let modules = cmdline::is_kernel(&pe.cmdline)
                    .then(|| AddressRegion::new(self.map.mod_offset, self.map.mod_size));
                log::debug!(
                    "PE{:02}: slot {} in PE{:02}",
                    no,
                    region,
                    pe.memory_pe
                );
                TilePlan::Compute(ComputeTilePlan {
                    tile: no,
                    cmdline: pe.cmdline.clone(),
                    memory_pe: pe.memory_pe,
                    local: pe.local,
                    region,
                    noc_base: 0,
                    modules,
                    dtu: DtuParams::for_compute_tile(&self.map, &pe.local),
                })
            }
            Tile::Memory(mem) => {
                let placement = plan_memory_tile_content(
                    &self.map,
                    no,
                    mem.capacity.bytes(),
                    mem.image.as_ref().map(|image| image.size),
                    self.replicas,
                )?;
                let noc_window = noc_region(no, no, AddressRegion::new(0, placement.capacity))?;
                log::debug!(
                    "PE{:02}: {} bytes of DRAM at {}",
                    no,
                    placement.capacity,
                    noc_window
                );
                TilePlan::Memory(MemoryTilePlan {
                    placement,
                    image_path: mem
                        .image
                        .as_ref()
                        .map(|image| image.path.display().to_string()),
                    noc_window,
                    dtu: DtuParams::for_memory_tile(&self.map),
                })
            }
        };
        self.tiles.push(tile.clone());
        self.plans.push(plan);
        Ok(self)
    }

    /// Resolves references between tiles and produces the final plan.
    pub fn finish(self) -> PlanResult<SystemPlan> {
        let PlanBuilder {
            tiles, mut plans, sim, ..
        } = self;

        for plan in plans.iter_mut() {
            let TilePlan::Compute(pe) = plan else {
                continue;
            };
            let backing = tiles
                .get(pe.memory_pe)
                .and_then(Tile::as_memory)
                .ok_or(PlanError::InvalidBackingTile {
                    tile: pe.tile,
                    memory_pe: pe.memory_pe,
                })?;
            if pe.region.end() > backing.capacity.bytes() {
                return Err(PlanError::BackingTooSmall {
                    tile: pe.tile,
                    memory_pe: pe.memory_pe,
                    end: pe.region.end(),
                    capacity: backing.capacity.bytes(),
                });
            }
            pe.noc_base = noc_region(pe.tile, pe.memory_pe, pe.region)?.base;
        }

        if let Some(pause) = sim.pause_pe {
            if !matches!(plans.get(pause), Some(TilePlan::Compute(_))) {
                log::warn!("PE{:02} is not a compute PE; nobody will wait for GDB", pause);
            }
        }

        let size_tags = classify_tile_sizes(&tiles)?;
        log::info!(
            "Planned {} PEs ({} memory PEs)",
            plans.len(),
            size_tags.iter().filter(|tag| tag.is_memory()).count()
        );
        Ok(SystemPlan {
            tiles: plans,
            size_tags,
            sim,
        })
    }
}

/// Maps `region` inside memory PE `core` into the global NoC address space.
fn noc_region(tile: usize, core: usize, region: AddressRegion) -> PlanResult<AddressRegion> {
    let overflow = PlanError::AddressOverflow {
        tile,
        offset: region.base,
    };
    if region.base.checked_add(region.size).map_or(true, |end| end > MAX_OFFSET) {
        return Err(overflow);
    }
    let addr = u32::try_from(core)
        .ok()
        .and_then(|core| NocAddr::new(core, 0, region.base))
        .ok_or(overflow)?;
    Ok(AddressRegion::new(addr.raw(), region.size))
}
