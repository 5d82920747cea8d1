use litematic_util::BlockPos;
use log::debug;
use thiserror::Error;

use crate::SchematicDocument;

/// Upscale factor some older tooling assumed for every stored coordinate.
/// Litematica itself stores plain block coordinates, which is a scale of 1.
pub const LEGACY_COORDINATE_SCALE: i32 = 1 << 24;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Coordinates were already normalized with scale {0}")]
    AlreadyNormalized(i32),
    #[error("Coordinate scale must be positive, got {0}")]
    InvalidScale(i32),
}

fn scale_pos(pos: &mut BlockPos, scale: i32) {
    // Floor division, one rule for every field.
    *pos = pos.map(|v| v.div_euclid(scale));
}

/// Divides every stored coordinate by `scale`, in place. Entity positions are not block
/// coordinates and are left alone.
pub fn normalize(document: &mut SchematicDocument, scale: i32) -> Result<(), NormalizeError> {
    if let Some(scale) = document.coordinate_scale {
        return Err(NormalizeError::AlreadyNormalized(scale));
    }
    if scale <= 0 {
        return Err(NormalizeError::InvalidScale(scale));
    }
    scale_pos(&mut document.metadata.enclosing_size, scale);
    for region in document.regions.iter_mut() {
        scale_pos(&mut region.size, scale);
        scale_pos(&mut region.position, scale);
        region
            .tile_entities
            .iter_mut()
            .for_each(|tile_entity| scale_pos(&mut tile_entity.pos, scale));
        region
            .pending_block_ticks
            .iter_mut()
            .chain(region.pending_fluid_ticks.iter_mut())
            .for_each(|tick| scale_pos(&mut tick.pos, scale));
    }
    if scale != 1 {
        debug!(
            "Normalized coordinates of {} regions by {}",
            document.regions.len(),
            scale
        );
    }
    document.coordinate_scale = Some(scale);
    Ok(())
}

impl SchematicDocument {
    pub fn normalize(&mut self, scale: i32) -> Result<(), NormalizeError> {
        normalize(self, scale)
    }
}
