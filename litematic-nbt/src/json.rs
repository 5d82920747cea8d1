use crate::{NBTCompound, NBT};

/// https://minecraft.wiki/w/NBT_format#Conversion_to_JSON
/// Long array entries stay 64-bit integers.
impl From<NBT> for serde_json::Value {
    fn from(value: NBT) -> Self {
        match value {
            NBT::Byte(byte) => serde_json::Value::from(byte),
            NBT::Short(short) => serde_json::Value::from(short),
            NBT::Int(int) => serde_json::Value::from(int),
            NBT::Long(long) => serde_json::Value::from(long),
            NBT::Float(float) => serde_json::Value::from(float),
            NBT::Double(double) => serde_json::Value::from(double),
            NBT::ByteArray(byte_array) => serde_json::Value::from(byte_array.to_vec()),
            NBT::String(string) => serde_json::Value::from(string),
            NBT::List(list) => serde_json::Value::from_iter(list),
            NBT::Compound(compound) => serde_json::Value::from(compound),
            NBT::IntArray(int_array) => serde_json::Value::from(int_array.to_vec()),
            NBT::LongArray(long_array) => serde_json::Value::from(long_array.to_vec()),
        }
    }
}

impl From<NBTCompound> for serde_json::Value {
    fn from(value: NBTCompound) -> Self {
        serde_json::Value::Object(
            value
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::from(value)))
                .collect::<serde_json::Map<_, _>>(),
        )
    }
}
