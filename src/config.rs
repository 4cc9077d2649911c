//! Settings read from `form8949.toml`, overridden by command-line flags.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    form::{FormBox, Taxpayer},
    template::DEFAULT_TIMEOUT_SECS,
    Result,
};

pub const DEFAULT_CONFIG_PATH: &str = "form8949.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One CSV file for tax software import
    #[default]
    Csv,
    /// Filled Form 8949 pages
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub enabled: bool,
    /// Local copy of the blank form, used instead of downloading it.
    pub path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tax_year: Option<i32>,
    pub format: OutputFormat,
    #[serde(rename = "box")]
    pub form_box: FormBox,
    pub taxpayer: Taxpayer,
    pub output_dir: Option<PathBuf>,
    pub template: TemplateConfig,
}

impl Config {
    /// An explicit path must exist; the default one is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Path::new(DEFAULT_CONFIG_PATH),
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                return Ok(Self::default());
            }
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
