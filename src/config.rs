//! Configuration management for schema-typegen
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (typegen.toml)
//! - Environment variables (TYPEGEN__*)
//!
//! ## Example config file (typegen.toml):
//! ```toml
//! [naming]
//! field_casing = "snake_case"
//! constant_casing = "pascal_case"
//! max_suffix_attempts = 1000
//!
//! [generation]
//! default_package = "model"
//! unsupported = "degrade"
//! element_suffix = "Item"
//!
//! [output]
//! format = "rust"
//! path = "src/generated.rs"
//! ```

use std::path::{Path, PathBuf};

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::codegen::{GenerationConfig, NamingConfig, RenderProfile};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypegenConfig {
    /// Identifier rules
    #[serde(default)]
    pub naming: NamingConfig,

    /// Dispatch policy and packages
    #[serde(default)]
    pub generation: GenerationConfig,

    /// What to write and where
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Destination file; stdout when absent
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Rendering profile for Rust output
    #[serde(default)]
    pub profile: RenderProfile,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rust source with serde derives
    #[default]
    Rust,
    /// The recorded declaration model as JSON
    Json,
}

impl TypegenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["typegen.toml", ".typegen.toml", "config/typegen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-typegen") {
            let xdg_config = config_dir.config_dir().join("typegen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // TYPEGEN__GENERATION__UNSUPPORTED=degrade
        builder = builder.add_source(
            Environment::with_prefix("TYPEGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
