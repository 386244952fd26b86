//! Configuration Vault – reads/writes `~/.parley/config.toml`.

use parley_memory::recall::{DEFAULT_RECALL, MAX_RECALL};
use parley_types::FormKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persisted user configuration stored in `~/.parley/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which form the agent collects.
    #[serde(default)]
    pub form: FormKind,

    /// Record file.  Unset means `~/.parley/orders.json` or
    /// `~/.parley/checkins.json`, depending on `form`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// OpenAI-compatible API root (e.g. Groq, a local llama.cpp server).
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token for the LLM endpoint (stored as plain text – the file is
    /// written owner-only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Default number of entries for `recall` and `/history`.
    #[serde(default = "default_recall_window")]
    pub recall_window: usize,

    /// Tool rounds allowed per user turn.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("form", &self.form)
            .field("store_path", &self.store_path)
            .field("llm_base_url", &self.llm_base_url)
            .field("model", &self.model)
            .field(
                "api_key",
                if self.api_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("recall_window", &self.recall_window)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_recall_window() -> usize {
    DEFAULT_RECALL
}
fn default_max_tool_rounds() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            form: FormKind::default(),
            store_path: None,
            llm_base_url: default_llm_base_url(),
            model: default_model(),
            api_key: String::new(),
            recall_window: default_recall_window(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl Config {
    /// Record file for the configured form, relative to the config directory
    /// when not set explicitly.
    pub fn resolved_store_path(&self, config_dir: &Path) -> PathBuf {
        match &self.store_path {
            Some(p) => p.clone(),
            None => config_dir.join(default_store_file(self.form)),
        }
    }

    /// `recall_window` bounded to what the store will hand out.
    pub fn recall_window(&self) -> usize {
        self.recall_window.min(MAX_RECALL)
    }
}

fn default_store_file(form: FormKind) -> &'static str {
    match form {
        FormKind::Coffee => "orders.json",
        FormKind::Wellness => "checkins.json",
    }
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

/// Return the path to `~/.parley/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

/// `~/.parley`, where the config and default record files live.
pub fn config_dir() -> PathBuf {
    PathBuf::from(home_dir()).join(".parley")
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".parley").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, ConfigError> {
    load_from(&config_path())
}

/// Defaults with environment overrides applied; used when there is no
/// usable config file.
pub fn from_env() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `PARLEY_FORM` | `form` (ignored when unrecognised) |
/// | `PARLEY_STORE` | `store_path` |
/// | `PARLEY_LLM_URL` | `llm_base_url` |
/// | `PARLEY_MODEL` | `model` |
/// | `GROQ_API_KEY` | `api_key` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("PARLEY_FORM")
        && let Ok(form) = v.parse::<FormKind>()
    {
        cfg.form = form;
    }
    if let Ok(v) = std::env::var("PARLEY_STORE") {
        cfg.store_path = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("PARLEY_LLM_URL") {
        cfg.llm_base_url = v;
    }
    if let Ok(v) = std::env::var("PARLEY_MODEL") {
        cfg.model = v;
    }
    if let Ok(v) = std::env::var("GROQ_API_KEY")
        && !v.is_empty()
    {
        cfg.api_key = v;
    }
}

/// Save the config to disk, creating `~/.parley/` if necessary.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_api_key() {
        let cfg = Config {
            api_key: "gsk_super_secret".to_string(),
            ..Config::default()
        };
        let debug_str = format!("{:?}", cfg);
        assert!(!debug_str.contains("gsk_super_secret"), "key must not appear in debug output");
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    fn config_debug_shows_not_set_for_empty_key() {
        let debug_str = format!("{:?}", Config::default());
        assert!(debug_str.contains("<not set>"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn roundtrip_wellness_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            form: FormKind::Wellness,
            recall_window: 5,
            ..Config::default()
        };
        save_to(&cfg, &path).expect("save");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("form = \"wellness\""));
        assert!(!raw.contains("api_key"), "empty key is not written");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.form, FormKind::Wellness);
        assert_eq!(loaded.recall_window, 5);
        assert_eq!(loaded.max_tool_rounds, 4);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = toml::from_str("model = \"llama3\"").unwrap();
        assert_eq!(cfg.model, "llama3");
        assert_eq!(cfg.form, FormKind::Coffee);
        assert_eq!(cfg.llm_base_url, "https://api.groq.com/openai/v1");
        assert_eq!(cfg.recall_window, DEFAULT_RECALL);
    }

    #[test]
    fn unknown_form_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "form = \"pizza\"").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_parley_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.parley/config.toml"));
    }

    #[test]
    fn store_path_defaults_per_form() {
        let dir = Path::new("/home/u/.parley");
        let coffee = Config::default();
        assert_eq!(coffee.resolved_store_path(dir), dir.join("orders.json"));

        let wellness = Config {
            form: FormKind::Wellness,
            ..Config::default()
        };
        assert_eq!(wellness.resolved_store_path(dir), dir.join("checkins.json"));

        let custom = Config {
            store_path: Some(PathBuf::from("/data/log.json")),
            ..Config::default()
        };
        assert_eq!(custom.resolved_store_path(dir), PathBuf::from("/data/log.json"));
    }

    #[test]
    fn recall_window_is_capped() {
        let cfg = Config {
            recall_window: 40,
            ..Config::default()
        };
        assert_eq!(cfg.recall_window(), MAX_RECALL);
    }

    // All env-mutating assertions live in one test so they cannot race.
    #[test]
    fn apply_env_overrides_reads_parley_variables() {
        // SAFETY: the only test in this crate that touches these variables.
        unsafe {
            std::env::set_var("PARLEY_FORM", "check-in");
            std::env::set_var("PARLEY_STORE", "/tmp/parley-test.json");
            std::env::set_var("PARLEY_LLM_URL", "http://localhost:8080/v1");
            std::env::set_var("PARLEY_MODEL", "qwen2.5");
            std::env::set_var("GROQ_API_KEY", "gsk_env");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.form, FormKind::Wellness);
        assert_eq!(cfg.store_path, Some(PathBuf::from("/tmp/parley-test.json")));
        assert_eq!(cfg.llm_base_url, "http://localhost:8080/v1");
        assert_eq!(cfg.model, "qwen2.5");
        assert_eq!(cfg.api_key, "gsk_env");

        unsafe { std::env::set_var("PARLEY_FORM", "pizza") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.form, FormKind::Coffee, "unrecognised form keeps the configured one");

        unsafe {
            for var in ["PARLEY_FORM", "PARLEY_STORE", "PARLEY_LLM_URL", "PARLEY_MODEL", "GROQ_API_KEY"] {
                std::env::remove_var(var);
            }
        }
    }
}
