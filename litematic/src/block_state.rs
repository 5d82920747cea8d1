use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseBlockStateError {
    #[error("Block state \"{0}\" has an empty name")]
    EmptyName(String),
    #[error("Block state \"{0}\" is missing its closing bracket")]
    UnclosedProperties(String),
    #[error("Block state \"{0}\" has a property without a value")]
    MissingValue(String),
}

/// A palette entry: namespaced block name plus its state properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockState {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }
}

/// `minecraft:oak_log[axis=y]`
impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for BlockState {
    type Err = ParseBlockStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, properties) = match s.split_once('[') {
            Some((name, rest)) => (
                name,
                Some(
                    rest.strip_suffix(']')
                        .ok_or_else(|| ParseBlockStateError::UnclosedProperties(s.to_owned()))?,
                ),
            ),
            None => (s, None),
        };
        if name.is_empty() {
            return Err(ParseBlockStateError::EmptyName(s.to_owned()));
        }
        let mut state = BlockState::new(name);
        for property in properties
            .into_iter()
            .flat_map(|properties| properties.split(','))
            .filter(|property| !property.is_empty())
        {
            let (key, value) = property
                .split_once('=')
                .ok_or_else(|| ParseBlockStateError::MissingValue(s.to_owned()))?;
            state = state.with_property(key.trim(), value.trim());
        }
        Ok(state)
    }
}
