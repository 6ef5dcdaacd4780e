use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Port the query service listens on when no explicit base address is given
pub const DEFAULT_PORT: u16 = 8000;

/// Base address injected at build time, e.g. `RAGUI_API_BASE=http://10.0.0.5:8000 cargo build`
const BUILD_API_BASE: Option<&str> = option_env!("RAGUI_API_BASE");

mod default_config {
    // This is so the initial config file can contain explanatory comments
    pub(super) const DEFAULT_CONFIG_TOML: &str =
        include_str!(concat!(env!("OUT_DIR"), "/config.toml"));
}

fn project_dirs() -> crate::Result<ProjectDirs> {
    ProjectDirs::from("", "", env!("CARGO_PKG_NAME")).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not locate the home directory",
        )
        .into()
    })
}

pub fn config_dir() -> crate::Result<PathBuf> {
    let dir = if cfg!(debug_assertions) {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_assets/config")
    } else {
        project_dirs()?.config_dir().to_path_buf()
    };

    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn data_dir() -> crate::Result<PathBuf> {
    let dir = if cfg!(debug_assertions) {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_assets/data")
    } else {
        project_dirs()?.data_dir().to_path_buf()
    };

    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    api_base: Option<String>,
    scheme: String,
    host: String,
    log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: None,
            scheme: "http".into(),
            host: "localhost".into(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn api_base(&self) -> Option<&str> {
        self.api_base.as_deref()
    }

    pub fn scheme(&self) -> &str {
        self.scheme.as_str()
    }

    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    pub fn log_file(&self) -> crate::Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("ragui.log")),
        }
    }

    pub fn from_toml(input: &str) -> crate::Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load the config at the default location, writing the bundled default there first if absent
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.try_exists()? {
            // If no config present, save the default one
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, default_config::DEFAULT_CONFIG_TOML)?;
            return Self::from_toml(default_config::DEFAULT_CONFIG_TOML);
        }

        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn path() -> crate::Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }
}

/// The resolved address of the query service.
/// Built once at startup and handed to the client, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().trim_end_matches('/').to_string(),
        }
    }

    /// Pick the base address, first match wins:
    /// command line override, build-time injection, config `api_base`,
    /// then `<scheme>://<host>:8000` from the config.
    pub fn resolve(config: &Config, cli_override: Option<&str>) -> Self {
        Self::resolve_with(config, cli_override, BUILD_API_BASE)
    }

    fn resolve_with(config: &Config, cli_override: Option<&str>, build_base: Option<&str>) -> Self {
        let non_empty = |s: &&str| !s.trim().is_empty();

        if let Some(base) = cli_override
            .filter(non_empty)
            .or(build_base.filter(non_empty))
            .or(config.api_base().filter(non_empty))
        {
            return Self::new(base);
        }

        Self::new(format!(
            "{}://{}:{}",
            config.scheme().trim_end_matches("://").trim_end_matches(':'),
            config.host(),
            DEFAULT_PORT
        ))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn query_url(&self) -> String {
        format!("{}/query", self.base)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}
