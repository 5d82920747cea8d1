use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use litematic_nbt::DEFAULT_MAX_DEPTH;

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
    #[error("Could not find decode options file.")]
    NotFound,
}

fn options_default_coordinate_scale() -> i32 {
    1
}

fn options_default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecodeOptions {
    /// Divisor the normalizer applies to every coordinate field.
    #[serde(
        default = "options_default_coordinate_scale",
        rename = "coordinate-scale"
    )]
    pub coordinate_scale: i32,
    /// Drop regions whose block states fail to unpack instead of failing the whole decode.
    #[serde(default, rename = "skip-failed-regions")]
    pub skip_failed_regions: bool,
    #[serde(default = "options_default_max_depth", rename = "max-depth")]
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            coordinate_scale: options_default_coordinate_scale(),
            skip_failed_regions: false,
            max_depth: options_default_max_depth(),
        }
    }
}

impl DecodeOptions {
    pub fn from_toml_str(str: &str) -> Result<DecodeOptions, OptionsError> {
        Ok(toml::from_str(str)?)
    }

    /// First file that is found is loaded as options.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<DecodeOptions, OptionsError> {
        for path in paths {
            match std::fs::read_to_string(path) {
                Ok(str) => return DecodeOptions::from_toml_str(&str),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(OptionsError::NotFound)
    }
}
