use bookrec::catalog::{ColumnNames, DataPaths, BOOKS_FILE, POPULAR_FILE, SIMILARITY_FILE};
use serde::Deserialize;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_DATA_DIR: &str = "data";

/// Settings read from the optional TOML config file.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    /// Reads `explicit`, or the default location when it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data = match explicit.as_ref() {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound { path: path.clone() })
            }
            Some(path) => read_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let data = read_file(&path)?;
                    return Ok(Self {
                        path: Some(path),
                        data,
                    });
                }
                _ => RawConfig::default(),
            },
        };
        Ok(Self {
            path: explicit,
            data,
        })
    }

    /// File the settings came from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Artifact locations. `dir_override` replaces the configured base directory.
    pub fn data_paths(&self, dir_override: Option<&Path>) -> DataPaths {
        let section = &self.data.data;
        let base = dir_override
            .map(Path::to_path_buf)
            .or_else(|| section.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let resolve = |configured: &Option<PathBuf>, default: &str| match configured {
            Some(file) => base.join(file),
            None => base.join(default),
        };
        DataPaths {
            similarity: resolve(&section.similarity, SIMILARITY_FILE),
            books: resolve(&section.books, BOOKS_FILE),
            popular: resolve(&section.popular, POPULAR_FILE),
        }
    }

    /// CSV column names, defaults filled in.
    pub fn columns(&self) -> ColumnNames {
        let raw = &self.data.columns;
        let defaults = ColumnNames::default();
        ColumnNames {
            title: raw.title.clone().unwrap_or(defaults.title),
            author: raw.author.clone().unwrap_or(defaults.author),
            image: raw.image.clone().unwrap_or(defaults.image),
            rating_count: raw.rating_count.clone().unwrap_or(defaults.rating_count),
            average_rating: raw.average_rating.clone().unwrap_or(defaults.average_rating),
        }
    }

    /// `[server]` section.
    pub fn server(&self) -> &ServerSection {
        &self.data.server
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

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    data: DataSection,
    #[serde(default)]
    columns: ColumnsSection,
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DataSection {
    dir: Option<PathBuf>,
    similarity: Option<PathBuf>,
    books: Option<PathBuf>,
    popular: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnsSection {
    title: Option<String>,
    author: Option<String>,
    image: Option<String>,
    rating_count: Option<String>,
    average_rating: Option<String>,
}

/// Server defaults; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub count: Option<usize>,
    pub assets: Option<PathBuf>,
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} does not exist")]
    NotFound { path: PathBuf },
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
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("bookrec").join("config.toml"))
}
