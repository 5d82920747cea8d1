use litematic_nbt::NBTCompound;
use litematic_util::{BlockPos, Vec3};
use serde::Deserialize;

use crate::{region::CoordinateLookup, BlockState, VoxelGrid};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    /// Bounding box of all regions together.
    pub enclosing_size: BlockPos,
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub region_count: Option<i32>,
    pub total_volume: Option<i32>,
    pub total_blocks: Option<i32>,
    /// Milliseconds since the unix epoch.
    pub time_created: Option<i64>,
    pub time_modified: Option<i64>,
    /// ARGB pixels.
    #[serde(rename = "PreviewImageData")]
    pub preview_image: Option<Box<[i32]>>,
    /// Keys not listed above, untouched.
    #[serde(skip)]
    pub extra: NBTCompound,
}

/// A block entity (chest contents, sign text, ...) stored alongside the block grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TileEntity {
    /// Local to the region's minimum corner.
    pub pos: BlockPos,
    /// Everything except the coordinates.
    pub data: NBTCompound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTick {
    /// Local to the region's minimum corner.
    pub pos: BlockPos,
    /// The `Block` or `Fluid` id the tick was scheduled for.
    pub target: Option<String>,
    pub priority: Option<i32>,
    pub sub_tick: Option<i64>,
    pub time: Option<i32>,
    pub data: NBTCompound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: Option<String>,
    /// Local to the region's minimum corner.
    pub pos: Vec3<f64>,
    pub data: NBTCompound,
}

/// Block states of a region, packed as read from the file until the region is assembled.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockStates {
    Packed(Box<[i64]>),
    Unpacked(VoxelGrid),
}

#[derive(Debug, Clone)]
pub struct Region {
    pub(crate) name: String,
    pub(crate) size: BlockPos,
    pub(crate) position: BlockPos,
    pub(crate) palette: Vec<BlockState>,
    pub(crate) block_states: BlockStates,
    pub(crate) tile_entities: Vec<TileEntity>,
    pub(crate) pending_block_ticks: Vec<PendingTick>,
    pub(crate) pending_fluid_ticks: Vec<PendingTick>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) lookup: CoordinateLookup,
}

impl Region {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signed, a negative axis grows from `position` toward negative coordinates.
    pub fn size(&self) -> BlockPos {
        self.size
    }

    pub fn position(&self) -> BlockPos {
        self.position
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn block_states(&self) -> &BlockStates {
        &self.block_states
    }

    /// `None` until the region has been assembled.
    pub fn voxels(&self) -> Option<&VoxelGrid> {
        match &self.block_states {
            BlockStates::Unpacked(grid) => Some(grid),
            BlockStates::Packed(..) => None,
        }
    }

    pub fn tile_entities(&self) -> &[TileEntity] {
        &self.tile_entities
    }

    pub fn pending_block_ticks(&self) -> &[PendingTick] {
        &self.pending_block_ticks
    }

    pub fn pending_fluid_ticks(&self) -> &[PendingTick] {
        &self.pending_fluid_ticks
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// `|size.x * size.y * size.z|`
    pub fn block_count(&self) -> Option<usize> {
        self.size.volume()
    }

    /// Lowest world coordinate covered on every axis.
    pub fn min_corner(&self) -> BlockPos {
        fn axis(position: i32, size: i32) -> i32 {
            if size < 0 { position.saturating_add(size + 1) } else { position }
        }
        BlockPos::new(
            axis(self.position.x, self.size.x),
            axis(self.position.y, self.size.y),
            axis(self.position.z, self.size.z),
        )
    }

    /// Highest world coordinate covered on every axis.
    pub fn max_corner(&self) -> BlockPos {
        fn axis(position: i32, size: i32) -> i32 {
            if size > 0 { position.saturating_add(size - 1) } else { position }
        }
        BlockPos::new(
            axis(self.position.x, self.size.x),
            axis(self.position.y, self.size.y),
            axis(self.position.z, self.size.z),
        )
    }

    pub fn local_to_world(&self, local: BlockPos) -> Option<BlockPos> {
        self.min_corner().checked_add(local)
    }

    pub fn world_to_local(&self, world: BlockPos) -> Option<BlockPos> {
        world.checked_sub(self.min_corner())
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        // The lookup is derived from the other fields.
        self.name == other.name
            && self.size == other.size
            && self.position == other.position
            && self.palette == other.palette
            && self.block_states == other.block_states
            && self.tile_entities == other.tile_entities
            && self.pending_block_ticks == other.pending_block_ticks
            && self.pending_fluid_ticks == other.pending_fluid_ticks
            && self.entities == other.entities
    }
}

/// A decoded schematic. Regions keep the order they had in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct SchematicDocument {
    pub(crate) version: Option<i32>,
    pub(crate) sub_version: Option<i32>,
    pub(crate) minecraft_data_version: Option<i32>,
    pub(crate) metadata: Metadata,
    pub(crate) regions: Vec<Region>,
    /// Scale the coordinates were divided by, `None` while still raw.
    pub(crate) coordinate_scale: Option<i32>,
}

impl SchematicDocument {
    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn sub_version(&self) -> Option<i32> {
        self.sub_version
    }

    pub fn minecraft_data_version(&self) -> Option<i32> {
        self.minecraft_data_version
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.name == name)
    }

    pub fn coordinate_scale(&self) -> Option<i32> {
        self.coordinate_scale
    }

    pub fn is_normalized(&self) -> bool {
        self.coordinate_scale.is_some()
    }
}
