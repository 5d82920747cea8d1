use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

/// An integer block coordinate.
pub type BlockPos = Vec3<i32>;

impl<T> Vec3<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Vec3<U> {
        Vec3::new(f(self.x), f(self.y), f(self.z))
    }
}

macro_rules! impl_vec3_vec3_basic_operation {
    ($trait_name:ident, $fn_name:ident, $oper:tt) => {
        impl<T: std::ops::$trait_name<Output = T>> std::ops::$trait_name for Vec3<T> {
            type Output = Self;
            fn $fn_name(self, rhs: Self) -> Self::Output {
                Self::new(self.x $oper rhs.x, self.y $oper rhs.y, self.z $oper rhs.z)
            }
        }
    };
}

impl_vec3_vec3_basic_operation!(Add, add, +);
impl_vec3_vec3_basic_operation!(Sub, sub, -);

impl Vec3<i32> {
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(rhs.x)?,
            self.y.checked_add(rhs.y)?,
            self.z.checked_add(rhs.z)?,
        ))
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        Some(Self::new(
            self.x.checked_sub(rhs.x)?,
            self.y.checked_sub(rhs.y)?,
            self.z.checked_sub(rhs.z)?,
        ))
    }

    /// Per-axis magnitudes.
    pub fn unsigned_abs(self) -> Vec3<u32> {
        self.map(i32::unsigned_abs)
    }

    /// `|x * y * z|`, `None` if it does not fit in a `usize`.
    pub fn volume(self) -> Option<usize> {
        let Vec3 { x, y, z } = self.unsigned_abs().map(|v| v as usize);
        x.checked_mul(y)?.checked_mul(z)
    }
}

impl Vec3<f64> {
    /// The block containing this point.
    pub fn block_pos(self) -> Option<BlockPos> {
        let Vec3 { x, y, z } = self.map(f64::floor);
        let range = i32::MIN as f64..=i32::MAX as f64;
        if !range.contains(&x) || !range.contains(&y) || !range.contains(&z) {
            return None;
        }
        Some(BlockPos::new(x as i32, y as i32, z as i32))
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Vec3<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
