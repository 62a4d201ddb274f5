//! Configuration of the simulated systems.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use base::prelude::*;

use crate::engine::EngineConfig;

/// What happens to a request for an address outside every window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnmappedPolicy {
    /// The address phase is never accepted, so the request stalls.
    #[default]
    Stall,
    /// A default slave accepts the request and responds with a
    /// decode error.
    DecodeError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub program_window: Window,
    pub data_window: Window,
    pub engine_window: Window,
    /// Cycles between a storage slave accepting a request and
    /// responding, beyond the minimum of one.
    pub storage_latency: u32,
    /// Initial contents of program storage, which is read-only.
    pub program_image: Vec<u32>,
    pub engine: EngineConfig,
    pub unmapped: UnmappedPolicy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            program_window: Window::new(PROGRAM_STORAGE_BASE, PROGRAM_STORAGE_SIZE),
            data_window: Window::new(DATA_STORAGE_BASE, DATA_STORAGE_SIZE),
            engine_window: Window::new(ENGINE_BASE, ENGINE_SIZE),
            storage_latency: 0,
            program_image: Vec::new(),
            engine: EngineConfig::default(),
            unmapped: UnmappedPolicy::default(),
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        MemoryMap::new(vec![
            self.program_window,
            self.data_window,
            self.engine_window,
        ])?;
        if self.engine.fifo_depth == 0 {
            return Err(ConfigError::ZeroFifoDepth);
        }
        let capacity = usize::try_from(self.program_window.size / 4).unwrap_or(usize::MAX);
        if self.program_image.len() > capacity {
            return Err(ConfigError::ImageTooLarge {
                words: self.program_image.len(),
                capacity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MemoryMap(MemoryMapError),
    ZeroFifoDepth,
    ImageTooLarge { words: usize, capacity: usize },
}

impl From<MemoryMapError> for ConfigError {
    fn from(e: MemoryMapError) -> ConfigError {
        ConfigError::MemoryMap(e)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConfigError::MemoryMap(e) => write!(f, "invalid memory map: {e}"),
            ConfigError::ZeroFifoDepth => f.write_str("engine queues must have a depth of at least 1"),
            ConfigError::ImageTooLarge { words, capacity } => write!(
                f,
                "program image has {words} words but program storage holds only {capacity}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::MemoryMap(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SystemConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_overlapping_windows() {
        let config = SystemConfig {
            engine_window: Window::new(DATA_STORAGE_BASE + 0x100, 0x100),
            ..SystemConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MemoryMap(_))));
    }

    #[test]
    fn test_zero_fifo_depth() {
        let mut config = SystemConfig::default();
        config.engine.fifo_depth = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroFifoDepth));
    }

    #[test]
    fn test_image_too_large() {
        let config = SystemConfig {
            program_window: Window::new(0, 8),
            program_image: vec![1, 2, 3],
            ..SystemConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ImageTooLarge {
                words: 3,
                capacity: 2
            })
        );
    }
}
