//! Strict serde [`Deserializer`] over a borrowed tag tree.
//!
//! Unlike a self-describing format there is no numeric widening: an `i32` only reads from an
//! `Int`, an `f64` only from a `Double`. Every error names the dotted path of the field it
//! was raised at, e.g. `Regions.main.Size.x`.

use std::fmt::Display;

use serde::{
    de::{value::BorrowedStrDeserializer, DeserializeSeed, MapAccess, SeqAccess, Visitor},
    forward_to_deserialize_any, Deserialize, Deserializer,
};
use thiserror::Error;

use crate::{NBTCompound, NBTTag, NBT};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Missing field \"{field}\" in \"{parent}\"")]
    MissingField { parent: String, field: String },
    #[error("Field \"{path}\" should be {expected} but is {actual}")]
    TypeMismatch {
        path: String,
        expected: NBTTag,
        actual: NBTTag,
    },
    #[error("Field \"{path}\" is invalid: {reason}")]
    InvalidValue { path: String, reason: String },
}

impl serde::de::Error for MappingError {
    fn custom<T>(msg: T) -> Self
    where
        T: Display,
    {
        Self::InvalidValue {
            path: String::new(),
            reason: msg.to_string(),
        }
    }

    fn missing_field(field: &'static str) -> Self {
        Self::MissingField {
            parent: String::new(),
            field: field.to_owned(),
        }
    }
}

impl MappingError {
    /// Errors raised by a visitor don't know where they are, they get the path of the value
    /// being visited. Errors from deeper values already carry a non-empty path.
    fn at(self, location: &str) -> Self {
        match self {
            Self::MissingField { parent, field } if parent.is_empty() => Self::MissingField {
                parent: location.to_owned(),
                field,
            },
            Self::InvalidValue { path, reason } if path.is_empty() => Self::InvalidValue {
                path: location.to_owned(),
                reason,
            },
            err => err,
        }
    }
}

/// Newtype struct name that makes the deserializer require an actual `LongArray` tag.
const LONG_ARRAY_TOKEN: &str = "$litematic_nbt::LongArray";

/// A `LongArray` tag. A plain `Vec<i64>` also reads from a list of longs, this does not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LongArray(pub Box<[i64]>);

impl<'de> Deserialize<'de> for LongArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LongArrayVisitor;

        impl<'de> Visitor<'de> for LongArrayVisitor {
            type Value = LongArray;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a long array")
            }

            fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Box::<[i64]>::deserialize(deserializer).map(LongArray)
            }
        }

        deserializer.deserialize_newtype_struct(LONG_ARRAY_TOKEN, LongArrayVisitor)
    }
}

/// What is being deserialized. Array elements have no tag of their own to borrow.
#[derive(Clone, Copy)]
enum Value<'de> {
    Tag(&'de NBT),
    Root(&'de NBTCompound),
    Byte(i8),
    Int(i32),
    Long(i64),
}

impl<'de> Value<'de> {
    fn tag(self) -> NBTTag {
        match self {
            Value::Tag(nbt) => nbt.tag(),
            Value::Root(..) => NBTTag::Compound,
            Value::Byte(..) => NBTTag::Byte,
            Value::Int(..) => NBTTag::Int,
            Value::Long(..) => NBTTag::Long,
        }
    }

    fn compound(self) -> Option<&'de NBTCompound> {
        match self {
            Value::Tag(NBT::Compound(compound)) => Some(compound),
            Value::Root(compound) => Some(compound),
            _ => None,
        }
    }

    fn elements(self) -> Option<Box<dyn Iterator<Item = Value<'de>> + 'de>> {
        match self {
            Value::Tag(NBT::List(list)) => Some(Box::new(list.iter().map(Value::Tag))),
            Value::Tag(NBT::ByteArray(bytes)) => {
                Some(Box::new(bytes.iter().map(|v| Value::Byte(*v))))
            }
            Value::Tag(NBT::IntArray(ints)) => Some(Box::new(ints.iter().map(|v| Value::Int(*v)))),
            Value::Tag(NBT::LongArray(longs)) => {
                Some(Box::new(longs.iter().map(|v| Value::Long(*v))))
            }
            _ => None,
        }
    }
}

fn path_of(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{}.{}", parent, key)
    }
}

pub struct NBTDeserializer<'de> {
    value: Value<'de>,
    path: String,
}

impl<'de> NBTDeserializer<'de> {
    pub fn new(nbt: &'de NBT) -> Self {
        Self {
            value: Value::Tag(nbt),
            path: String::new(),
        }
    }

    pub fn from_compound(compound: &'de NBTCompound) -> Self {
        Self {
            value: Value::Root(compound),
            path: String::new(),
        }
    }

    fn mismatch(&self, expected: NBTTag) -> MappingError {
        MappingError::TypeMismatch {
            path: self.path.clone(),
            expected,
            actual: self.value.tag(),
        }
    }

    fn visit_compound<V>(self, visitor: V) -> Result<V::Value, MappingError>
    where
        V: Visitor<'de>,
    {
        let Some(compound) = self.value.compound() else {
            return Err(self.mismatch(NBTTag::Compound));
        };
        visitor
            .visit_map(NBTCompoundVisitor {
                entries: compound.iter(),
                stored_value: None,
                path: self.path.clone(),
            })
            .map_err(|err| err.at(&self.path))
    }

    /// With `len`, elements left over after the visitor is done are an error.
    fn visit_elements<V>(self, visitor: V, len: Option<usize>) -> Result<V::Value, MappingError>
    where
        V: Visitor<'de>,
    {
        let Some(elements) = self.value.elements() else {
            return Err(self.mismatch(NBTTag::List));
        };
        let mut access = NBTListVisitor {
            elements,
            index: 0,
            path: self.path.clone(),
        };
        let value = visitor
            .visit_seq(&mut access)
            .map_err(|err| err.at(&self.path))?;
        match len {
            Some(len) if access.elements.next().is_some() => Err(MappingError::InvalidValue {
                path: self.path,
                reason: format!("expected {} elements, got more", len),
            }),
            _ => Ok(value),
        }
    }
}

struct NBTListVisitor<'de> {
    elements: Box<dyn Iterator<Item = Value<'de>> + 'de>,
    index: usize,
    path: String,
}

impl<'de> SeqAccess<'de> for NBTListVisitor<'de> {
    type Error = MappingError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        let Some(value) = self.elements.next() else {
            return Ok(None);
        };
        let path = format!("{}[{}]", self.path, self.index);
        self.index += 1;
        seed.deserialize(NBTDeserializer { value, path }).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        self.elements.size_hint().1
    }
}

struct NBTCompoundVisitor<'de, M: Iterator<Item = (&'de str, &'de NBT)>> {
    entries: M,
    stored_value: Option<(&'de str, &'de NBT)>,
    path: String,
}

impl<'de, M: Iterator<Item = (&'de str, &'de NBT)>> MapAccess<'de> for NBTCompoundVisitor<'de, M> {
    type Error = MappingError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.stored_value = Some((key, value));
        seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let Some((key, value)) = self.stored_value.take() else {
            return Err(MappingError::InvalidValue {
                path: self.path.clone(),
                reason: "value requested before its key".to_owned(),
            });
        };
        seed.deserialize(NBTDeserializer {
            value: Value::Tag(value),
            path: path_of(&self.path, key),
        })
    }

    fn size_hint(&self) -> Option<usize> {
        self.entries.size_hint().1
    }
}

macro_rules! deserialize_strict {
    ($method:ident, $visit:ident, $tag:ident $(, $element:ident)?) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: Visitor<'de>,
        {
            match self.value {
                Value::Tag(&NBT::$tag(v)) $(| Value::$element(v))? => visitor.$visit(v),
                _ => Err(self.mismatch(NBTTag::$tag)),
            }
        }
    };
}

impl<'de> Deserializer<'de> for NBTDeserializer<'de> {
    type Error = MappingError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Tag(NBT::Byte(byte)) => visitor.visit_i8(*byte),
            Value::Tag(NBT::Short(short)) => visitor.visit_i16(*short),
            Value::Tag(NBT::Int(int)) => visitor.visit_i32(*int),
            Value::Tag(NBT::Long(long)) => visitor.visit_i64(*long),
            Value::Tag(NBT::Float(float)) => visitor.visit_f32(*float),
            Value::Tag(NBT::Double(double)) => visitor.visit_f64(*double),
            Value::Tag(NBT::String(string)) => visitor.visit_borrowed_str(string.as_str()),
            Value::Tag(NBT::Compound(..)) | Value::Root(..) => self.visit_compound(visitor),
            Value::Tag(NBT::List(..) | NBT::ByteArray(..) | NBT::IntArray(..) | NBT::LongArray(..)) => {
                self.visit_elements(visitor, None)
            }
            Value::Byte(byte) => visitor.visit_i8(byte),
            Value::Int(int) => visitor.visit_i32(int),
            Value::Long(long) => visitor.visit_i64(long),
        }
    }

    deserialize_strict!(deserialize_i8, visit_i8, Byte, Byte);
    deserialize_strict!(deserialize_i16, visit_i16, Short);
    deserialize_strict!(deserialize_i32, visit_i32, Int, Int);
    deserialize_strict!(deserialize_i64, visit_i64, Long, Long);
    deserialize_strict!(deserialize_f32, visit_f32, Float);
    deserialize_strict!(deserialize_f64, visit_f64, Double);

    /// Booleans are stored as bytes.
    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Tag(&NBT::Byte(v)) | Value::Byte(v) => visitor.visit_bool(v != 0),
            _ => Err(self.mismatch(NBTTag::Byte)),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Tag(NBT::String(string)) => visitor.visit_borrowed_str(string.as_str()),
            _ => Err(self.mismatch(NBTTag::String)),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_elements(visitor, None)
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_elements(visitor, Some(len))
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_elements(visitor, Some(len))
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_compound(visitor)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.visit_compound(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match name {
            LONG_ARRAY_TOKEN if self.value.tag() != NBTTag::LongArray => {
                Err(self.mismatch(NBTTag::LongArray))
            }
            _ => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u8 u16 u32 u64 u128 char bytes byte_buf enum
    }
}

pub fn from_nbt<'de, T>(nbt: &'de NBT) -> Result<T, MappingError>
where
    T: Deserialize<'de>,
{
    T::deserialize(NBTDeserializer::new(nbt))
}

pub fn from_compound<'de, T>(compound: &'de NBTCompound) -> Result<T, MappingError>
where
    T: Deserialize<'de>,
{
    T::deserialize(NBTDeserializer::from_compound(compound))
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use serde::Deserialize;

    use crate::{de::LongArray, from_compound, from_nbt, nbt_compound, nbt_list, MappingError, NBTTag, NBT};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pos {
        x: i32,
        y: i32,
        z: i32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Section {
        #[serde(rename = "Pos")]
        pos: Pos,
        #[serde(rename = "Label")]
        label: Option<String>,
        #[serde(rename = "Data")]
        data: LongArray,
        #[serde(rename = "Motion", default)]
        motion: Vec<[f64; 3]>,
        #[serde(rename = "Tags", default)]
        tags: BTreeMap<String, String>,
    }

    fn section() -> NBT {
        nbt_compound![
            "Pos" => nbt_compound!["x" => 1, "y" => -2, "z" => 3],
            "Data" => NBT::LongArray(vec![-1, 4].into_boxed_slice()),
            "Motion" => nbt_list![nbt_list![0.5f64, 0.0f64, -0.5f64]],
            "Tags" => nbt_compound!["kind" => "test"],
            "Unused" => nbt_list![1i8, 2i8],
        ]
    }

    #[test]
    fn deserialize_struct() -> Result<(), MappingError> {
        let section: Section = from_nbt(&section())?;
        assert_eq!(section.pos, Pos { x: 1, y: -2, z: 3 });
        assert_eq!(section.label, None);
        assert_eq!(section.data, LongArray(vec![-1, 4].into_boxed_slice()));
        assert_eq!(section.motion, [[0.5, 0.0, -0.5]]);
        assert_eq!(section.tags.get("kind").map(String::as_str), Some("test"));
        Ok(())
    }

    #[test]
    fn borrowed_strings() -> Result<(), MappingError> {
        let nbt = nbt_compound!["name" => "minecraft:stone"];
        let fields: BTreeMap<&str, &str> = from_nbt(&nbt)?;
        assert_eq!(fields["name"], "minecraft:stone");
        Ok(())
    }

    #[test]
    fn arrays_read_as_sequences() -> Result<(), MappingError> {
        let nbt = nbt_compound![
            "bytes" => NBT::ByteArray(vec![1, -1].into_boxed_slice()),
            "ints" => NBT::IntArray(vec![7].into_boxed_slice()),
        ];
        #[derive(Deserialize)]
        struct Arrays {
            bytes: Vec<i8>,
            ints: Box<[i32]>,
        }
        let arrays: Arrays = from_nbt(&nbt)?;
        assert_eq!(arrays.bytes, [1, -1]);
        assert_eq!(&arrays.ints[..], [7]);
        Ok(())
    }

    #[test]
    fn no_numeric_widening() {
        let nbt = nbt_compound!["x" => 1i64, "y" => 0, "z" => 0];
        assert_eq!(
            from_nbt::<Pos>(&nbt),
            Err(MappingError::TypeMismatch {
                path: "x".to_owned(),
                expected: NBTTag::Int,
                actual: NBTTag::Long,
            })
        );
    }

    #[test]
    fn array_elements_keep_their_kind() {
        let nbt = NBT::IntArray(vec![1, 2].into_boxed_slice());
        assert_eq!(
            from_nbt::<Vec<i64>>(&nbt),
            Err(MappingError::TypeMismatch {
                path: "[0]".to_owned(),
                expected: NBTTag::Long,
                actual: NBTTag::Int,
            })
        );
    }

    #[test]
    fn long_array_rejects_lists() {
        let mut nbt = section();
        if let NBT::Compound(compound) = &mut nbt {
            compound.insert("Data", nbt_list![1i64, 2i64]);
        }
        assert_eq!(
            from_nbt::<Section>(&nbt),
            Err(MappingError::TypeMismatch {
                path: "Data".to_owned(),
                expected: NBTTag::LongArray,
                actual: NBTTag::List,
            })
        );
    }

    #[test]
    fn missing_field_names_its_parent() {
        let root = match nbt_compound![
            "Outer" => nbt_compound!["Pos" => nbt_compound!["x" => 1, "z" => 3]],
        ] {
            NBT::Compound(compound) => compound,
            _ => unreachable!(),
        };
        #[derive(Debug, Deserialize)]
        struct Outer {
            #[serde(rename = "Outer")]
            _outer: Wrapper,
        }
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            #[serde(rename = "Pos")]
            _pos: Pos,
        }
        assert_eq!(
            from_compound::<Outer>(&root).unwrap_err(),
            MappingError::MissingField {
                parent: "Outer.Pos".to_owned(),
                field: "y".to_owned(),
            }
        );
    }

    #[test]
    fn fixed_length_sequences() {
        let mut nbt = section();
        if let NBT::Compound(compound) = &mut nbt {
            compound.insert(
                "Motion",
                nbt_list![nbt_list![0.0f64, 0.0f64, 0.0f64, 1.0f64]],
            );
        }
        assert!(matches!(
            from_nbt::<Section>(&nbt),
            Err(MappingError::InvalidValue { path, .. }) if path == "Motion[0]"
        ));

        if let NBT::Compound(compound) = &mut nbt {
            compound.insert("Motion", nbt_list![nbt_list![0.0f64]]);
        }
        assert!(matches!(
            from_nbt::<Section>(&nbt),
            Err(MappingError::InvalidValue { path, .. }) if path == "Motion[0]"
        ));
    }

    #[test]
    fn compound_expected() {
        let nbt = nbt_compound!["Pos" => nbt_list![1, 2, 3]];
        #[derive(Debug, Deserialize)]
        struct Holder {
            #[serde(rename = "Pos")]
            _pos: Pos,
        }
        assert_eq!(
            from_nbt::<Holder>(&nbt).unwrap_err(),
            MappingError::TypeMismatch {
                path: "Pos".to_owned(),
                expected: NBTTag::Compound,
                actual: NBTTag::List,
            }
        );
    }
}
