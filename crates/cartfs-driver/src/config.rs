use cartfs_cache::DEFAULT_CACHE_FRAMES;
use cartfs_proto::{FRAMES_PER_CARTRIDGE, MAX_CARTRIDGES};
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, Result};

/// Default open-file table size.
pub const DEFAULT_MAX_FILES: usize = 1024;

/// Default per-file frame limit (one cartridge's worth).
pub const DEFAULT_MAX_FILE_FRAMES: usize = FRAMES_PER_CARTRIDGE as usize;

/// Driver geometry and limits. Fixed for the life of a powered-on driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Frame cache capacity in frames.
    pub cache_capacity: usize,
    /// Cartridges zeroed at power-on and available to the allocator.
    pub max_cartridges: u16,
    /// Frames per cartridge before the allocator moves on.
    pub frames_per_cartridge: u16,
    /// Maximum distinct file names.
    pub max_files: usize,
    /// Maximum frames a single file may span.
    pub max_file_frames: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_FRAMES,
            max_cartridges: MAX_CARTRIDGES,
            frames_per_cartridge: FRAMES_PER_CARTRIDGE,
            max_files: DEFAULT_MAX_FILES,
            max_file_frames: DEFAULT_MAX_FILE_FRAMES,
        }
    }
}

impl DriverConfig {
    /// Check the limits that the cache does not check itself.
    pub fn validate(&self) -> Result<()> {
        if self.max_cartridges == 0 || self.frames_per_cartridge == 0 {
            return Err(DriverError::Config(
                "cartridge geometry must be non-zero".to_string(),
            ));
        }
        if self.max_files == 0 || self.max_files > u16::MAX as usize + 1 {
            return Err(DriverError::Config(format!(
                "max_files must be in 1..=65536, got {}",
                self.max_files
            )));
        }
        if self.max_file_frames == 0 {
            return Err(DriverError::Config(
                "max_file_frames must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_controller_geometry() {
        let config = DriverConfig::default();
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.max_cartridges, 64);
        assert_eq!(config.frames_per_cartridge, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DriverConfig = serde_json::from_str(r#"{"cache_capacity": 50}"#).unwrap();
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
    }

    #[test]
    fn rejects_degenerate_limits() {
        let config = DriverConfig {
            frames_per_cartridge: 0,
            ..DriverConfig::default()
        };
        assert!(matches!(config.validate(), Err(DriverError::Config(_))));

        let config = DriverConfig {
            max_files: 70_000,
            ..DriverConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
