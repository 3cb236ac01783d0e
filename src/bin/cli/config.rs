use super::ThemeArg;
use clap::ValueEnum;
use pagelens::{HealthPolicy, InspectError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    theme: Option<ThemeArg>,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        data.policy
            .validate()
            .map_err(|source| ConfigError::InvalidPolicy { source })?;
        let theme = parse_theme(&data.display)?;
        Ok(Self { path, data, theme })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.data.policy
    }

    pub fn theme(&self) -> Option<ThemeArg> {
        self.theme
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.data).map_err(|source| ConfigError::Serialize { source })
    }

    /// Writes a fresh config holding the built-in defaults.
    pub fn init(&mut self, force: bool) -> Result<PathBuf, ConfigError> {
        let target = self.target_path()?;
        if target.exists() && !force {
            return Err(ConfigError::AlreadyExists { path: target });
        }
        self.data = RawConfig {
            policy: HealthPolicy::default(),
            display: DisplaySection {
                theme: Some(theme_to_string(ThemeArg::Auto)),
            },
        };
        self.theme = Some(ThemeArg::Auto);
        self.persist()
    }

    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = self.target_path()?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = self.to_toml()?;
        fs::write(&target, serialized).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    fn target_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            Ok(path.clone())
        } else if let Some(default) = default_config_path() {
            Ok(default)
        } else {
            Err(ConfigError::NoConfigPath)
        }
    }
}

fn theme_to_string(value: ThemeArg) -> String {
    match value {
        ThemeArg::Auto => "auto",
        ThemeArg::Light => "light",
        ThemeArg::Dark => "dark",
        ThemeArg::Plain => "plain",
    }
    .to_string()
}

fn parse_theme(display: &DisplaySection) -> Result<Option<ThemeArg>, ConfigError> {
    match display.theme.as_deref() {
        Some(value) => ThemeArg::from_str(value, true)
            .map(Some)
            .map_err(|_| ConfigError::InvalidTheme {
                value: value.to_string(),
            }),
        None => Ok(None),
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    policy: HealthPolicy,
    #[serde(default)]
    display: DisplaySection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct DisplaySection {
    theme: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config {path} already exists; pass --force to overwrite")]
    AlreadyExists { path: PathBuf },
    #[error("config theme '{value}' is invalid")]
    InvalidTheme { value: String },
    #[error("config policy is invalid: {source}")]
    InvalidPolicy { source: InspectError },
    #[error("no config directory found; pass --config or set PAGELENS_CONFIG")]
    NoConfigPath,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("pagelens").join("config.toml"))
}
