use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ui::Theme;

/// Settings read from `cli.toml`. Command-line flags win over every value here.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data_file(&self) -> Option<&PathBuf> {
        self.data.data_file.as_ref()
    }

    pub fn brand_label(&self) -> Option<&str> {
        self.data.brand_label.as_deref()
    }

    pub fn strict_reload(&self) -> bool {
        self.data.strict_reload.unwrap_or(false)
    }

    pub fn theme(&self) -> Option<Theme> {
        self.data.theme.as_deref().and_then(Theme::parse)
    }

    pub fn server(&self) -> &ServerSection {
        &self.data.server
    }

    /// Updates one dotted key, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let cleared = value.trim().is_empty();
        match key {
            "data_file" => self.data.data_file = (!cleared).then(|| PathBuf::from(value)),
            "brand_label" => self.data.brand_label = (!cleared).then(|| value.to_string()),
            "strict_reload" => {
                self.data.strict_reload = Some(value.parse().map_err(|_| invalid())?);
            }
            "theme" => {
                Theme::parse(value).ok_or_else(invalid)?;
                self.data.theme = Some(value.to_ascii_lowercase());
            }
            "server.host" => {
                self.data.server.host = if cleared {
                    None
                } else {
                    Some(value.parse().map_err(|_| invalid())?)
                };
            }
            "server.port" => {
                self.data.server.port = if cleared {
                    None
                } else {
                    Some(value.parse().map_err(|_| invalid())?)
                };
            }
            "server.assets" => self.data.server.assets = (!cleared).then(|| PathBuf::from(value)),
            "server.allow_origins" => {
                self.data.server.allow_origins = value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    pub fn render(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.data).map_err(|source| ConfigError::Serialize { source })
    }

    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = if let Some(path) = &self.path {
            path.clone()
        } else if let Some(default) = default_config_path() {
            default
        } else {
            return Err(ConfigError::NoConfigPath);
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, self.render()?).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    brand_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strict_reload: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theme: Option<String>,
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize CLI config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write CLI config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown config key '{key}'")]
    UnknownKey { key: String },
    #[error("invalid value '{value}' for config key '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("no config directory found; pass --config or set DYNASTY_CONFIG")]
    NoConfigPath,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("dynasty").join("cli.toml"))
}

/// Where the catalog lives when neither `--data` nor the config names a file.
pub fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .map(|base| base.join("dynasty").join("catalog.txt"))
        .unwrap_or_else(|| PathBuf::from("dynasty_catalog.txt"))
}
