use std::{fs::File, io::Read, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default name of the configuration file, looked up next to the sources.
pub const CONFIG_FILE: &str = "picoml.toml";

/// Boxed words keep an address shifted left by four,
/// which must stay positive: addresses stay below 2^27 bytes.
pub const MAX_MEMORY_PAGES: u32 = 2048;

/// Knobs for the back end. Every key is optional:
/// ```toml
/// dispatchUsingInferredType = true
/// reduceInstructions        = true
/// enableNameSection         = false
/// memoryPages               = 16
/// exportName                = "main"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Compare integers and booleans with plain word instructions
    /// when the inferred types say both operands are words.
    pub dispatch_using_inferred_type: bool,
    /// Run the peephole optimizer over the linked module.
    #[serde(alias = "reduceFloatInstructions")]
    pub reduce_instructions: bool,
    /// Attach a custom name section to the binary.
    pub enable_name_section: bool,
    /// Initial size of linear memory, in 64KiB pages.
    pub memory_pages: u32,
    /// The export under which the program's entry point is visible.
    pub export_name: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            dispatch_using_inferred_type: false,
            reduce_instructions:          false,
            enable_name_section:          false,
            memory_pages:                 16,
            export_name:                  "main".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the configuration file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("the configuration file could not be parsed: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("memoryPages must be at least 1")]
    NoMemory,
    #[error("memoryPages is {pages}, but boxed words can only address {max} pages", max = MAX_MEMORY_PAGES)]
    TooMuchMemory { pages: u32 },
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings no compiled program could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.memory_pages {
            0 => Err(ConfigError::NoMemory),
            pages if pages > MAX_MEMORY_PAGES => Err(ConfigError::TooMuchMemory { pages }),
            _ => Ok(()),
        }
    }

    /// Reads a configuration file from disk.
    pub fn path(path: &Path) -> Result<Config, ConfigError> {
        let mut source = String::new();
        File::open(path)?.read_to_string(&mut source)?;
        Config::from_toml(&source)
    }

    pub fn to_toml(&self) -> String {
        // a flat struct of scalars always serializes
        toml::to_string(self).unwrap_or_default()
    }
}
