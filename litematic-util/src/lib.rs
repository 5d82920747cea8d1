pub mod cursor;
pub mod packed_array;
pub mod read_ext;
pub mod vec3;

pub use cursor::{ByteCursor, TruncatedRead};
pub use packed_array::{PackedArray, PackedArrayError};
pub use read_ext::ReadExt;
pub use vec3::{BlockPos, Vec3};
