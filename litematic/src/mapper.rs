//! Reshapes a generic tag tree into a [`SchematicDocument`].
//!
//! The typed part is read through [`litematic_nbt::from_compound`], so every field must have
//! the exact tag kind Litematica writes and errors carry the dotted path of the offending
//! field. Keys that have no typed field are kept as compounds next to the typed values.

use std::{collections::BTreeMap, fmt};

use litematic_nbt::{from_compound, LongArray, NBTCompound, NBT};
use litematic_util::{BlockPos, Vec3};
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};

pub use litematic_nbt::MappingError;

use crate::{
    region::CoordinateLookup, BlockState, BlockStates, Entity, Metadata, PendingTick, Region,
    SchematicDocument, TileEntity,
};

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSchematic {
    version: Option<i32>,
    sub_version: Option<i32>,
    minecraft_data_version: Option<i32>,
    metadata: Metadata,
    regions: RawRegions,
}

/// Regions in file order.
struct RawRegions(Vec<(String, RawRegion)>);

impl<'de> Deserialize<'de> for RawRegions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RegionsVisitor;

        impl<'de> Visitor<'de> for RegionsVisitor {
            type Value = RawRegions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a compound of named regions")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut regions = Vec::new();
                while let Some(entry) = map.next_entry::<String, RawRegion>()? {
                    regions.push(entry);
                }
                Ok(RawRegions(regions))
            }
        }

        deserializer.deserialize_map(RegionsVisitor)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRegion {
    size: BlockPos,
    position: BlockPos,
    block_state_palette: Vec<RawBlockState>,
    block_states: LongArray,
    #[serde(default)]
    tile_entities: Vec<RawTileEntity>,
    #[serde(default)]
    pending_block_ticks: Vec<RawPendingTick>,
    #[serde(default)]
    pending_fluid_ticks: Vec<RawPendingTick>,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBlockState {
    name: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawTileEntity {
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPendingTick {
    #[serde(rename = "x")]
    x: i32,
    #[serde(rename = "y")]
    y: i32,
    #[serde(rename = "z")]
    z: i32,
    /// `Block` in block ticks, `Fluid` in fluid ticks.
    #[serde(rename = "Block", alias = "Fluid")]
    target: Option<String>,
    priority: Option<i32>,
    sub_tick: Option<i64>,
    time: Option<i32>,
}

#[derive(Deserialize)]
struct RawEntity {
    id: Option<String>,
    #[serde(rename = "Pos")]
    pos: [f64; 3],
}

const METADATA_KEYS: &[&str] = &[
    "EnclosingSize",
    "Name",
    "Author",
    "Description",
    "RegionCount",
    "TotalVolume",
    "TotalBlocks",
    "TimeCreated",
    "TimeModified",
    "PreviewImageData",
];
const TILE_ENTITY_KEYS: &[&str] = &["x", "y", "z"];
const BLOCK_TICK_KEYS: &[&str] = &["x", "y", "z", "Block", "Priority", "SubTick", "Time"];
const FLUID_TICK_KEYS: &[&str] = &["x", "y", "z", "Fluid", "Priority", "SubTick", "Time"];
const ENTITY_KEYS: &[&str] = &["id", "Pos"];

fn child<'a>(compound: Option<&'a NBTCompound>, key: &str) -> Option<&'a NBTCompound> {
    match compound?.get(key)? {
        NBT::Compound(child) => Some(child),
        _ => None,
    }
}

/// The compounds of a list, in order. Anything else reads as empty.
fn compounds<'a>(compound: Option<&'a NBTCompound>, key: &str) -> Vec<&'a NBTCompound> {
    match compound.and_then(|compound| compound.get(key)) {
        Some(NBT::List(list)) => list
            .iter()
            .filter_map(|value| match value {
                NBT::Compound(compound) => Some(compound),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Clone of the compound without the keys that were mapped to typed fields.
fn remainder(compound: Option<&NBTCompound>, mapped: &[&str]) -> NBTCompound {
    compound
        .into_iter()
        .flat_map(NBTCompound::iter)
        .filter(|(key, _)| !mapped.contains(key))
        .map(|(key, value)| (key.to_owned(), value.clone()))
        .collect()
}

fn pending_ticks(
    raw: Vec<RawPendingTick>,
    sources: &[&NBTCompound],
    keys: &[&str],
) -> Vec<PendingTick> {
    raw.into_iter()
        .enumerate()
        .map(|(i, tick)| PendingTick {
            pos: BlockPos::new(tick.x, tick.y, tick.z),
            target: tick.target,
            priority: tick.priority,
            sub_tick: tick.sub_tick,
            time: tick.time,
            data: remainder(sources.get(i).copied(), keys),
        })
        .collect()
}

impl RawRegion {
    /// `source` is the compound this region was read from.
    fn into_region(self, name: String, source: Option<&NBTCompound>) -> Region {
        let tile_entities = compounds(source, "TileEntities");
        let block_ticks = compounds(source, "PendingBlockTicks");
        let fluid_ticks = compounds(source, "PendingFluidTicks");
        let entities = compounds(source, "Entities");
        Region {
            name,
            size: self.size,
            position: self.position,
            palette: self
                .block_state_palette
                .into_iter()
                .map(|state| BlockState {
                    name: state.name,
                    properties: state.properties,
                })
                .collect(),
            block_states: BlockStates::Packed(self.block_states.0),
            tile_entities: self
                .tile_entities
                .into_iter()
                .enumerate()
                .map(|(i, tile_entity)| TileEntity {
                    pos: BlockPos::new(tile_entity.x, tile_entity.y, tile_entity.z),
                    data: remainder(tile_entities.get(i).copied(), TILE_ENTITY_KEYS),
                })
                .collect(),
            pending_block_ticks: pending_ticks(
                self.pending_block_ticks,
                &block_ticks,
                BLOCK_TICK_KEYS,
            ),
            pending_fluid_ticks: pending_ticks(
                self.pending_fluid_ticks,
                &fluid_ticks,
                FLUID_TICK_KEYS,
            ),
            entities: self
                .entities
                .into_iter()
                .enumerate()
                .map(|(i, entity)| {
                    let [x, y, z] = entity.pos;
                    Entity {
                        id: entity.id,
                        pos: Vec3::new(x, y, z),
                        data: remainder(entities.get(i).copied(), ENTITY_KEYS),
                    }
                })
                .collect(),
            lookup: CoordinateLookup::default(),
        }
    }
}

/// Maps a root compound as written by Litematica. Coordinates are left exactly as stored.
pub fn map(root: &NBTCompound) -> Result<SchematicDocument, MappingError> {
    let raw: RawSchematic = from_compound(root)?;

    let mut metadata = raw.metadata;
    metadata.extra = remainder(child(Some(root), "Metadata"), METADATA_KEYS);

    let sources = child(Some(root), "Regions");
    Ok(SchematicDocument {
        version: raw.version,
        sub_version: raw.sub_version,
        minecraft_data_version: raw.minecraft_data_version,
        metadata,
        regions: raw
            .regions
            .0
            .into_iter()
            .map(|(name, region)| {
                let source = child(sources, &name);
                region.into_region(name, source)
            })
            .collect(),
        coordinate_scale: None,
    })
}
