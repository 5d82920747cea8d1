use std::collections::HashMap;

use itertools::Itertools as _;
use litematic_util::{BlockPos, Vec3};
use log::debug;
use thiserror::Error;

use crate::{
    unpack::{bits_per_entry, unpack, UnpackError},
    BlockState, BlockStates, Entity, PendingTick, Region, SchematicDocument, TileEntity,
};

/// Dense palette indices of one region, `x` varying fastest, then `z`, then `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    size: Vec3<usize>,
    indices: Box<[usize]>,
}

impl VoxelGrid {
    pub(crate) fn new(size: Vec3<usize>, indices: Box<[usize]>) -> Self {
        debug_assert_eq!(size.x * size.y * size.z, indices.len());
        Self { size, indices }
    }

    /// Per-axis magnitudes of the region size.
    pub fn size(&self) -> Vec3<usize> {
        self.size
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Linear index of a local coordinate, `None` outside the grid.
    pub fn index_of(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        (x < self.size.x && y < self.size.y && z < self.size.z)
            .then(|| y * (self.size.x * self.size.z) + z * self.size.x + x)
    }

    pub fn palette_index_at(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        self.index_of(x, y, z).map(|index| self.indices[index])
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Every local coordinate with its palette index, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec3<usize>, usize)> + '_ {
        (0..self.size.y)
            .cartesian_product(0..self.size.z)
            .cartesian_product(0..self.size.x)
            .map(|((y, z), x)| Vec3::new(x, y, z))
            .zip(self.indices.iter().copied())
    }

    /// How many blocks use each palette entry, indexed like the palette.
    pub fn palette_counts(&self, palette_len: usize) -> Vec<usize> {
        let mut counts = vec![0; palette_len];
        for index in self.indices.iter() {
            if let Some(count) = counts.get_mut(*index) {
                *count += 1;
            }
        }
        counts
    }
}

/// Indices into a region's tile entities, ticks and entities by local block coordinate.
#[derive(Debug, Clone, Default)]
pub(crate) struct CoordinateLookup {
    tile_entities: HashMap<BlockPos, usize>,
    pending_block_ticks: HashMap<BlockPos, Vec<usize>>,
    pending_fluid_ticks: HashMap<BlockPos, Vec<usize>>,
    entities: HashMap<BlockPos, Vec<usize>>,
}

impl CoordinateLookup {
    fn build(region: &Region) -> Self {
        fn ticks(ticks: &[PendingTick]) -> HashMap<BlockPos, Vec<usize>> {
            ticks
                .iter()
                .enumerate()
                .map(|(index, tick)| (tick.pos, index))
                .into_group_map()
        }
        Self {
            // A block holds one tile entity, later entries at the same coordinate win.
            tile_entities: region
                .tile_entities
                .iter()
                .enumerate()
                .map(|(index, tile_entity)| (tile_entity.pos, index))
                .collect(),
            pending_block_ticks: ticks(&region.pending_block_ticks),
            pending_fluid_ticks: ticks(&region.pending_fluid_ticks),
            entities: region
                .entities
                .iter()
                .enumerate()
                .filter_map(|(index, entity)| Some((entity.pos.block_pos()?, index)))
                .into_group_map(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Region \"{region}\": {source}")]
pub struct RegionError {
    pub region: String,
    #[source]
    pub source: UnpackError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Coordinates must be normalized before regions are assembled")]
    NotNormalized,
    #[error(transparent)]
    Region(#[from] RegionError),
}

impl Region {
    /// Unpacks the block states into a [`VoxelGrid`] and indexes the per-block records.
    /// Assembling an already assembled region only rebuilds the lookup.
    pub(crate) fn assemble(&mut self) -> Result<(), RegionError> {
        let error = |source| RegionError {
            region: self.name.clone(),
            source,
        };
        if let BlockStates::Packed(words) = &self.block_states {
            let block_count = self.size.volume().ok_or_else(|| {
                error(UnpackError::SizeOverflow {
                    block_count: usize::MAX,
                })
            })?;
            let indices = unpack(self.palette.len(), words, block_count).map_err(error)?;
            debug!(
                "Region \"{}\": unpacked {} blocks at {} bits from {} words, palette of {}",
                self.name,
                block_count,
                bits_per_entry(self.palette.len()),
                words.len(),
                self.palette.len()
            );
            let size = self.size.unsigned_abs().map(|v| v as usize);
            self.block_states =
                BlockStates::Unpacked(VoxelGrid::new(size, indices.into_boxed_slice()));
        }
        self.lookup = CoordinateLookup::build(self);
        Ok(())
    }

    /// Palette index at a local coordinate, `None` outside the region or before assembly.
    pub fn palette_index_at(&self, pos: BlockPos) -> Option<usize> {
        let Vec3 { x, y, z } = pos;
        let local = |v: i32| usize::try_from(v).ok();
        self.voxels()?
            .palette_index_at(local(x)?, local(y)?, local(z)?)
    }

    pub fn block_state_at(&self, pos: BlockPos) -> Option<&BlockState> {
        self.palette.get(self.palette_index_at(pos)?)
    }

    pub fn tile_entity_at(&self, pos: BlockPos) -> Option<&TileEntity> {
        self.lookup
            .tile_entities
            .get(&pos)
            .map(|index| &self.tile_entities[*index])
    }

    pub fn pending_block_ticks_at(&self, pos: BlockPos) -> impl Iterator<Item = &PendingTick> {
        Self::lookup_all(&self.lookup.pending_block_ticks, &self.pending_block_ticks, pos)
    }

    pub fn pending_fluid_ticks_at(&self, pos: BlockPos) -> impl Iterator<Item = &PendingTick> {
        Self::lookup_all(&self.lookup.pending_fluid_ticks, &self.pending_fluid_ticks, pos)
    }

    /// Entities whose position lies inside the block at `pos`.
    pub fn entities_at(&self, pos: BlockPos) -> impl Iterator<Item = &Entity> {
        Self::lookup_all(&self.lookup.entities, &self.entities, pos)
    }

    fn lookup_all<'a, T>(
        lookup: &'a HashMap<BlockPos, Vec<usize>>,
        items: &'a [T],
        pos: BlockPos,
    ) -> impl Iterator<Item = &'a T> {
        lookup
            .get(&pos)
            .into_iter()
            .flatten()
            .map(move |index| &items[*index])
    }
}

impl SchematicDocument {
    /// Assembles every region, failing on the first region that does not unpack.
    pub fn assemble(&mut self) -> Result<(), AssembleError> {
        if !self.is_normalized() {
            return Err(AssembleError::NotNormalized);
        }
        self.regions
            .iter_mut()
            .try_for_each(|region| region.assemble())?;
        Ok(())
    }

    /// Assembles every region, removing and returning the ones that do not unpack.
    pub fn assemble_lossy(&mut self) -> Result<Vec<RegionError>, AssembleError> {
        if !self.is_normalized() {
            return Err(AssembleError::NotNormalized);
        }
        let mut failed = Vec::new();
        self.regions.retain_mut(|region| match region.assemble() {
            Ok(()) => true,
            Err(err) => {
                failed.push(err);
                false
            }
        });
        Ok(failed)
    }
}
