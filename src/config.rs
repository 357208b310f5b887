use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::native::SizeHint;

pub const CONFIG_ENV: &str = "WEBVIEW_CONFIG";
pub const PATH_ENV: &str = "WEBVIEW_PATH";
pub const DEBUG_ENV: &str = "WEBVIEW_DEBUG";

#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY: &str = "webview.dll";
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY: &str = "libwebview.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_LIBRARY: &str = "libwebview.so";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read webview config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Window and library settings shared by the binaries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WebviewConfig {
    /// File name of the native library; platform default when unset.
    pub library_name: Option<String>,
    /// Directories searched before the executable's own directory.
    pub search_paths: Vec<PathBuf>,
    /// Enable developer tools in the created window.
    pub debug: bool,
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub hint: SizeHint,
}

impl Default for WebviewConfig {
    fn default() -> Self {
        Self {
            library_name: None,
            search_paths: Vec::new(),
            debug: false,
            title: "Webview".to_string(),
            width: 800,
            height: 600,
            hint: SizeHint::None,
        }
    }
}

impl WebviewConfig {
    /// Read settings from `config_path`. A missing path or file yields defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path)?;
                let config: WebviewConfig = serde_yaml::from_str(&contents)?;
                debug!(target: "native", path = %path.display(), "loaded webview config");
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `load` from `WEBVIEW_CONFIG`, then apply `WEBVIEW_PATH` and `WEBVIEW_DEBUG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::load(env::var_os(CONFIG_ENV).map(PathBuf::from))?;
        config.apply_overrides(
            env::var_os(PATH_ENV).map(PathBuf::from),
            env::var(DEBUG_ENV).ok().as_deref(),
        );
        Ok(config)
    }

    fn apply_overrides(&mut self, path: Option<PathBuf>, debug: Option<&str>) {
        if let Some(path) = path.filter(|path| !path.as_os_str().is_empty()) {
            self.search_paths.insert(0, path);
        }
        if let Some(flag) = debug {
            self.debug = matches!(flag.trim(), "1" | "true" | "yes");
        }
    }

    pub fn library_name(&self) -> String {
        self.library_name
            .clone()
            .unwrap_or_else(|| DEFAULT_LIBRARY.to_string())
    }
}
