use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// API used when neither `config.json` nor `BEACON_API_URL` name one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the store root.
pub const HOME_ENV: &str = "BEACON_HOME";

/// Environment variable overriding `api_url`.
pub const API_URL_ENV: &str = "BEACON_API_URL";

/// Keys the CLI reads from `config.json`.
pub const KNOWN_KEYS: &[&str] = &["api_url", "context_mode"];

/// Return the per-user store root: `$BEACON_HOME`, else `<data_dir>/beacon`,
/// else `~/.beacon`.
pub fn store_root() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .map(|d| d.join("beacon"))
        .or_else(|| dirs::home_dir().map(|h| h.join(".beacon")))
        .unwrap_or_else(|| PathBuf::from(".beacon-store"))
}

/// Files inside a store root.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    pub config_json: PathBuf,
    pub credentials_json: PathBuf,
}

impl StorePaths {
    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            config_json: root.join("config.json"),
            credentials_json: root.join("credentials.json"),
        }
    }

    pub fn discover() -> Self {
        Self::at(&store_root())
    }
}

/// Replace `path` with `data` via a sibling temp file, so readers never see
/// a half-written file.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

// ── config.json ──

/// Typed scalar for a value typed on the command line: bool, integer,
/// finite float, otherwise string.
pub fn parse_scalar(raw: &str) -> Json {
    if let Ok(b) = raw.parse::<bool>() {
        return Json::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Json::from(n);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(raw.to_string()))
}

/// The flat JSON object stored in `config.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    entries: serde_json::Map<String, Json>,
}

impl ConfigFile {
    /// Missing file reads as empty. A file that holds JSON but not an
    /// object is ignored with a warning.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        match serde_json::from_str::<Json>(&text)
            .with_context(|| format!("parsing {}", path.display()))?
        {
            Json::Object(entries) => Ok(Self { entries }),
            _ => {
                tracing::warn!(path = %path.display(), "config is not a JSON object; ignoring");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(path, json.as_bytes())
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Json::as_str)
    }

    /// Store `raw` under `key` as a typed scalar and return what was stored.
    pub fn set(&mut self, key: &str, raw: &str) -> &Json {
        self.entries.insert(key.to_string(), parse_scalar(raw));
        &self.entries[key]
    }

    pub fn unset(&mut self, key: &str) -> Option<Json> {
        self.entries.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &Json)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the effective `api_url` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiUrlSource {
    Env,
    File,
    Default,
}

/// Settings the CLI needs, resolved from `config.json` and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconConfig {
    pub api_url: String,
    pub api_url_source: ApiUrlSource,
    /// Default chat mode; parsed by the caller.
    pub context_mode: Option<String>,
}

impl BeaconConfig {
    /// Load from `config.json`, then apply `BEACON_API_URL`.
    /// A missing or unreadable file yields defaults.
    pub fn load(paths: &StorePaths) -> Self {
        let file = ConfigFile::load(&paths.config_json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable config");
            ConfigFile::default()
        });
        Self::resolve(&file, std::env::var(API_URL_ENV).ok())
    }

    fn resolve(file: &ConfigFile, env_api_url: Option<String>) -> Self {
        let (api_url, api_url_source) = match env_api_url.filter(|s| !s.is_empty()) {
            Some(url) => (url, ApiUrlSource::Env),
            None => match file.get_str("api_url") {
                Some(url) => (url.to_string(), ApiUrlSource::File),
                None => (DEFAULT_API_URL.to_string(), ApiUrlSource::Default),
            },
        };
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_url_source,
            context_mode: file.get_str("context_mode").map(str::to_string),
        }
    }
}

// ── credentials.json ──

/// Bearer token pair issued by the auth endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// `None` when not logged in (file missing or unparseable).
    pub fn load(paths: &StorePaths) -> Option<Self> {
        let content = fs::read_to_string(&paths.credentials_json).ok()?;
        match serde_json::from_str(&content) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparseable credentials");
                None
            }
        }
    }

    pub fn save(&self, paths: &StorePaths) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&paths.credentials_json, json.as_bytes())
    }

    pub fn clear(paths: &StorePaths) -> anyhow::Result<()> {
        match fs::remove_file(&paths.credentials_json) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
