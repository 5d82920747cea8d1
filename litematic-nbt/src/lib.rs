mod bin;
mod compound;
pub mod de;
mod json;
mod tag;

pub use bin::DEFAULT_MAX_DEPTH;
pub use compound::NBTCompound;
pub use de::{from_compound, from_nbt, LongArray, MappingError};
pub use tag::NBTTag;

use itertools::Itertools as _;
use litematic_util::TruncatedRead;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NBTError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("NBT truncated input: {0}")]
    TruncatedInput(#[from] TruncatedRead),
    #[error("NBT unknown tag kind {value} at offset {offset}")]
    UnknownTagKind { offset: usize, value: u8 },
    #[error("NBT malformed string at offset {offset}: {source}")]
    MalformedString {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("NBT unexpected end tag at offset {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("NBT negative length {length} at offset {offset}")]
    NegativeLength { offset: usize, length: i32 },
    #[error("NBT duplicate compound key \"{key}\" at offset {offset}")]
    DuplicateKey { offset: usize, key: String },
    #[error("NBT nesting deeper than {limit} levels at offset {offset}")]
    DepthLimitExceeded { offset: usize, limit: usize },
    #[error("NBT root tag must be a compound, got {got}")]
    RootNotCompound { got: NBTTag },
    #[error("NBT list tag mismatch {expected:?} {got:?}")]
    ListTagMismatch { expected: NBTTag, got: NBTTag },
    #[error("NBT length {0} does not fit its length prefix")]
    LengthOverflow(usize),
}

impl NBTError {
    /// Offset in the decompressed stream where decoding failed, if it failed while reading.
    pub fn offset(&self) -> Option<usize> {
        match self {
            NBTError::TruncatedInput(truncated) => Some(truncated.offset),
            NBTError::UnknownTagKind { offset, .. }
            | NBTError::MalformedString { offset, .. }
            | NBTError::UnexpectedEnd { offset }
            | NBTError::NegativeLength { offset, .. }
            | NBTError::DuplicateKey { offset, .. }
            | NBTError::DepthLimitExceeded { offset, .. } => Some(*offset),
            NBTError::IoError(..)
            | NBTError::RootNotCompound { .. }
            | NBTError::ListTagMismatch { .. }
            | NBTError::LengthOverflow(..) => None,
        }
    }
}

#[derive(Clone, PartialEq, Default)]
/// NBTList contains NBT values that MUST be the same type.
/// A list read from binary carries its declared element tag even when empty.
/// A list built in code starts untyped, pushing to an empty list will set its type and any
/// subsequent new items will be required to be the same type.
pub struct NBTList {
    tag: Option<NBTTag>,
    list: Vec<NBT>,
}

impl std::fmt::Debug for NBTList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.list.fmt(f)
    }
}

impl NBTList {
    /// Element tag, `None` for an untyped empty list.
    pub fn tag(&self) -> Option<NBTTag> {
        self.tag
    }

    pub fn new() -> Self {
        Self::default()
    }

    /// `NBTTag::End` makes an untyped list.
    pub fn new_with_tag(tag: NBTTag) -> Self {
        Self {
            tag: (tag != NBTTag::End).then_some(tag),
            list: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns error if new item has mismatching type from already containing items.
    pub fn push(&mut self, v: NBT) -> Result<(), NBTError> {
        match self.tag {
            Some(tag) if tag != v.tag() => {
                return Err(NBTError::ListTagMismatch {
                    expected: tag,
                    got: v.tag(),
                });
            }
            Some(..) => {}
            None => self.tag = Some(v.tag()),
        }
        self.list.push(v);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&NBT> {
        self.list.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NBT> {
        self.list.iter()
    }
}

impl IntoIterator for NBTList {
    type Item = NBT;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

impl<'a> IntoIterator for &'a NBTList {
    type Item = &'a NBT;
    type IntoIter = std::slice::Iter<'a, NBT>;
    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl TryFrom<Vec<NBT>> for NBTList {
    type Error = NBTError;

    fn try_from(value: Vec<NBT>) -> Result<Self, Self::Error> {
        let mut list = Self::new();
        value.into_iter().try_for_each(|v| list.push(v))?;
        Ok(list)
    }
}

/// One decoded tag value.
/// `NBTTag::End` only ever terminates a compound or types an empty list, so it has no value form.
#[derive(Clone, PartialEq)]
pub enum NBT {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Box<[i8]>),
    String(String),
    List(NBTList),
    Compound(NBTCompound),
    IntArray(Box<[i32]>),
    LongArray(Box<[i64]>),
}

impl std::fmt::Debug for NBT {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Byte(byte) => write!(f, "{}b", byte),
            Self::Short(short) => write!(f, "{}s", short),
            Self::Int(int) => write!(f, "{}i", int),
            Self::Long(long) => write!(f, "{}l", long),
            Self::Float(float) => write!(f, "{}f", float),
            Self::Double(double) => write!(f, "{}d", double),
            Self::ByteArray(byte_array) => byte_array.fmt(f),
            Self::String(string) => write!(f, "\"{}\"", string),
            Self::List(list) => list.fmt(f),
            Self::Compound(compound) => compound.fmt(f),
            Self::IntArray(int_array) => int_array.fmt(f),
            Self::LongArray(long_array) => long_array.fmt(f),
        }
    }
}

macro_rules! from_nbt_simple {
    ($type:ty, $ident:ident) => {
        impl From<$type> for NBT {
            fn from(value: $type) -> Self {
                Self::$ident(value)
            }
        }
    };
}

from_nbt_simple!(i8, Byte);
from_nbt_simple!(i16, Short);
from_nbt_simple!(i32, Int);
from_nbt_simple!(i64, Long);
from_nbt_simple!(f32, Float);
from_nbt_simple!(f64, Double);
from_nbt_simple!(String, String);
from_nbt_simple!(NBTList, List);
from_nbt_simple!(NBTCompound, Compound);
from_nbt_simple!(Box<[i8]>, ByteArray);
from_nbt_simple!(Box<[i32]>, IntArray);
from_nbt_simple!(Box<[i64]>, LongArray);

impl From<&str> for NBT {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Builds an `NBT::Compound`, keys keep the order they are written in.
#[macro_export]
macro_rules! nbt_compound {
    [$($name:expr => $value:expr),* $(,)?] => {{
        #[allow(unused_mut)]
        let mut compound = $crate::NBTCompound::new();
        $(
            compound.insert($name, $crate::NBT::from($value));
        )*
        $crate::NBT::Compound(compound)
    }};
}

/// Builds an `NBT::List`, panics if the items are of different types.
#[macro_export]
macro_rules! nbt_list {
    [$($value:expr),* $(,)?] => {
        $crate::NBT::List(
            $crate::NBTList::try_from(vec![$($crate::NBT::from($value)),*])
                .expect("nbt_list! items must share one tag")
        )
    };
}

impl NBT {
    pub fn tag(&self) -> NBTTag {
        match self {
            NBT::Byte(..) => NBTTag::Byte,
            NBT::Short(..) => NBTTag::Short,
            NBT::Int(..) => NBTTag::Int,
            NBT::Long(..) => NBTTag::Long,
            NBT::Float(..) => NBTTag::Float,
            NBT::Double(..) => NBTTag::Double,
            NBT::ByteArray(..) => NBTTag::ByteArray,
            NBT::String(..) => NBTTag::String,
            NBT::List(..) => NBTTag::List,
            NBT::Compound(..) => NBTTag::Compound,
            NBT::IntArray(..) => NBTTag::IntArray,
            NBT::LongArray(..) => NBTTag::LongArray,
        }
    }

    pub fn to_string_pretty(&self) -> String {
        fn pad_string(string: &str) -> String {
            const PAD: &str = "  ";
            string.lines().map(|l| format!("{}{}", PAD, l)).join("\n")
        }
        match self {
            NBT::Byte(byte) => format!("{}b", byte),
            NBT::Short(short) => format!("{}s", short),
            NBT::Int(int) => format!("{}i", int),
            NBT::Long(long) => format!("{}l", long),
            NBT::Float(float) => format!("{}f", float),
            NBT::Double(double) => format!("{}d", double),
            NBT::ByteArray(bytes) => format!("[B; {}]", bytes.iter().join(", ")),
            NBT::String(string) => format!("{:?}", string),
            NBT::List(list) if list.is_empty() => "[]".to_owned(),
            NBT::List(list) => format!(
                "[\n{}\n]",
                pad_string(&list.iter().map(|value| value.to_string_pretty()).join(",\n"))
            ),
            NBT::Compound(compound) if compound.is_empty() => "{}".to_owned(),
            NBT::Compound(compound) => format!(
                "{{\n{}\n}}",
                pad_string(
                    &compound
                        .iter()
                        .map(|(key, value)| format!("{:?}: {}", key, value.to_string_pretty()))
                        .join(",\n"),
                )
            ),
            NBT::IntArray(ints) => format!("[I; {}]", ints.iter().join(", ")),
            NBT::LongArray(longs) => format!("[L; {}]", longs.iter().join(", ")),
        }
    }
}
