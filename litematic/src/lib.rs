mod block_state;
mod document;
pub mod mapper;
pub mod normalize;
mod options;
pub mod region;
pub mod unpack;

use std::{io::Read, path::Path};

use litematic_nbt::{NBTError, NBT};
use litematic_util::ReadExt as _;
use log::{trace, warn};
use thiserror::Error;

pub use block_state::{BlockState, ParseBlockStateError};
pub use document::{BlockStates, Entity, Metadata, PendingTick, Region, SchematicDocument, TileEntity};
pub use mapper::MappingError;
pub use normalize::{NormalizeError, LEGACY_COORDINATE_SCALE};
pub use options::{DecodeOptions, OptionsError};
pub use region::{AssembleError, RegionError, VoxelGrid};
pub use unpack::UnpackError;

#[derive(Error, Debug)]
pub enum LitematicError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    NBTError(#[from] NBTError),
    #[error(transparent)]
    MappingError(#[from] MappingError),
    #[error(transparent)]
    NormalizeError(#[from] NormalizeError),
    #[error(transparent)]
    AssembleError(#[from] AssembleError),
    #[error(transparent)]
    OptionsError(#[from] OptionsError),
}

/// A decoded schematic plus the regions that were dropped because they failed to unpack.
/// `failed` is only ever non-empty with `skip-failed-regions` set.
#[derive(Debug)]
pub struct DecodeReport {
    pub document: SchematicDocument,
    pub failed: Vec<RegionError>,
}

/// Decodes an already decompressed tag tree into an assembled document.
pub fn decode_litematic(
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<DecodeReport, LitematicError> {
    let (_, root) = NBT::from_bytes_with_max_depth(bytes, false, options.max_depth)?;
    trace!("Decoded tag tree of {} bytes", bytes.len());

    let mut document = mapper::map(&root)?;
    trace!("Mapped {} regions", document.regions().len());

    document.normalize(options.coordinate_scale)?;

    let failed = if options.skip_failed_regions {
        let failed = document.assemble_lossy()?;
        failed
            .iter()
            .for_each(|err| warn!("Skipping region: {}", err));
        failed
    } else {
        document.assemble()?;
        Vec::new()
    };
    trace!("Assembled {} regions", document.regions().len());

    Ok(DecodeReport { document, failed })
}

/// Reads a gzip compressed `.litematic` stream.
pub fn read_litematic(
    reader: impl Read,
    options: &DecodeOptions,
) -> Result<DecodeReport, LitematicError> {
    let bytes = flate2::read::GzDecoder::new(reader).read_all()?;
    decode_litematic(&bytes, options)
}

pub fn read_litematic_file(
    path: impl AsRef<Path>,
    options: &DecodeOptions,
) -> Result<DecodeReport, LitematicError> {
    let file = std::fs::File::open(path)?;
    read_litematic(std::io::BufReader::new(file), options)
}

#[cfg(test)]
mod test {
    use litematic_nbt::{nbt_compound, nbt_list, NBTError, NBT};
    use litematic_util::BlockPos;

    use crate::{
        decode_litematic, read_litematic, BlockState, DecodeOptions, LitematicError,
        MappingError, UnpackError, LEGACY_COORDINATE_SCALE,
    };

    fn xyz(x: i32, y: i32, z: i32) -> NBT {
        nbt_compound!["x" => x, "y" => y, "z" => z]
    }

    fn region(size: NBT, position: NBT, words: Vec<i64>) -> NBT {
        nbt_compound![
            "Position" => position,
            "Size" => size,
            "BlockStatePalette" => nbt_list![
                nbt_compound!["Name" => "minecraft:air"],
                nbt_compound!["Name" => "minecraft:stone"],
            ],
            "BlockStates" => NBT::LongArray(words.into_boxed_slice()),
        ]
    }

    fn schematic(regions: NBT) -> NBT {
        nbt_compound![
            "Version" => 6,
            "Metadata" => nbt_compound!["EnclosingSize" => xyz(2, 1, 1)],
            "Regions" => regions,
        ]
    }

    #[test]
    fn reads_compressed_stream() -> Result<(), LitematicError> {
        let bytes = schematic(nbt_compound![
            "main" => region(xyz(2, 1, 1), xyz(0, 0, 0), vec![0b01]),
        ])
        .to_bytes("", true)?;
        let report = read_litematic(&bytes[..], &DecodeOptions::default())?;
        assert!(report.failed.is_empty());
        let region = report.document.region("main").unwrap();
        assert_eq!(region.voxels().unwrap().indices(), [1, 0]);
        assert_eq!(
            region.block_state_at(BlockPos::new(0, 0, 0)),
            Some(&BlockState::new("minecraft:stone"))
        );
        Ok(())
    }

    #[test]
    fn legacy_scale() -> Result<(), LitematicError> {
        let s = LEGACY_COORDINATE_SCALE;
        let bytes = nbt_compound![
            "Metadata" => nbt_compound!["EnclosingSize" => xyz(2 * s, s, s)],
            "Regions" => nbt_compound![
                "main" => region(xyz(2 * s, s, s), xyz(3 * s, 0, -s), vec![0b0100]),
            ],
        ]
        .to_bytes("", false)?;
        let options = DecodeOptions {
            coordinate_scale: s,
            ..Default::default()
        };
        let document = decode_litematic(&bytes, &options)?.document;
        assert_eq!(document.metadata().enclosing_size, BlockPos::new(2, 1, 1));
        let region = &document.regions()[0];
        assert_eq!(region.position(), BlockPos::new(3, 0, -1));
        assert_eq!(region.voxels().unwrap().indices(), [0, 1]);
        Ok(())
    }

    #[test]
    fn failed_region_is_fatal_by_default() -> Result<(), NBTError> {
        let bytes = schematic(nbt_compound![
            "short" => region(xyz(40, 1, 1), xyz(0, 0, 0), vec![0]),
            "main" => region(xyz(2, 1, 1), xyz(0, 0, 0), vec![0b01]),
        ])
        .to_bytes("", false)?;

        assert!(matches!(
            decode_litematic(&bytes, &DecodeOptions::default()),
            Err(LitematicError::AssembleError(..))
        ));

        let options = DecodeOptions {
            skip_failed_regions: true,
            ..Default::default()
        };
        let report = decode_litematic(&bytes, &options).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].region, "short");
        assert!(matches!(
            report.failed[0].source,
            UnpackError::InsufficientWords { .. }
        ));
        assert_eq!(report.document.regions().len(), 1);
        assert!(report.document.region("main").is_some());
        Ok(())
    }

    #[test]
    fn mapping_errors_surface() -> Result<(), NBTError> {
        let bytes = nbt_compound!["Regions" => nbt_compound![]].to_bytes("", false)?;
        assert!(matches!(
            decode_litematic(&bytes, &DecodeOptions::default()),
            Err(LitematicError::MappingError(MappingError::MissingField { field, .. })) if field == "Metadata"
        ));
        Ok(())
    }

    #[test]
    fn depth_limit_from_options() -> Result<(), NBTError> {
        let bytes = schematic(nbt_compound![
            "main" => region(xyz(2, 1, 1), xyz(0, 0, 0), vec![0b01]),
        ])
        .to_bytes("", false)?;
        let options = DecodeOptions {
            max_depth: 2,
            ..Default::default()
        };
        assert!(matches!(
            decode_litematic(&bytes, &options),
            Err(LitematicError::NBTError(NBTError::DepthLimitExceeded { .. }))
        ));
        Ok(())
    }
}
