//! TOML configuration file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::TargetProfile;
use crate::compile::CompilerOptions;
use crate::preview::PreviewConfig;
use crate::quantize::ThreadingConfig;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid grid dimensions (need width >= 2 and height >= 1)")]
    InvalidDimensions,
    #[error("invalid cell size (must be non-zero)")]
    InvalidCellSize,
    #[error("palette must have exactly 4 colors, got {0}")]
    InvalidPalette(usize),
    #[error("framebuffer of {cells} cells at {base:#x} overflows the address space")]
    AddressOverflow { base: u32, cells: usize },
    #[error("speed divisor must be at least 1")]
    InvalidSpeedDivisor,
    #[error("invalid redraw phase (period {period}, step {step})")]
    InvalidPhase { period: u32, step: u32 },
    #[error("preview opacity must be within [0, 1], got {0}")]
    InvalidOpacity(f32),
    #[error("preview upscale factor must be at least 1")]
    InvalidUpscale,
    #[error("chunk size must be at least 1")]
    InvalidChunkSize,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
///
/// Every section is optional and falls back to the reference device
/// and the tool defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub target: TargetProfile,
    #[serde(default)]
    pub compiler: CompilerOptions,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub threading: ThreadingConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.compiler.validate()?;
        self.preview.validate()?;
        self.threading.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::RedrawTrigger;
    use crate::preview::{FailurePolicy, PreviewMode};

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compiler.settle_in_frames, 30);
        assert_eq!(config.compiler.speed_divisor, 2);
        assert_eq!(config.preview.upscale, 8);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.target, TargetProfile::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = FileConfig::from_toml(
            r#"
            [target]
            width = 4
            height = 3
            base_address = 4096

            [compiler]
            speed_divisor = 1
            redraw_trigger = "pulse-then-touch"

            [preview]
            output = "both"
            on_failure = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(config.target.width, 4);
        assert_eq!(config.target.cell_size_px, 8);
        assert_eq!(config.compiler.speed_divisor, 1);
        assert_eq!(config.compiler.settle_in_frames, 30);
        assert_eq!(config.compiler.redraw_trigger, RedrawTrigger::PulseThenTouch);
        assert_eq!(config.preview.output, PreviewMode::Both);
        assert_eq!(config.preview.on_failure, FailurePolicy::Skip);
    }

    #[test]
    fn test_invalid_section_rejected() {
        let result = FileConfig::from_toml("[compiler]\nspeed_divisor = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidSpeedDivisor)));

        let result = FileConfig::from_toml("[target]\npalette = [[0, 0, 0]]\n");
        assert!(matches!(result, Err(ConfigError::InvalidPalette(1))));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            FileConfig::from_toml("[target"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
