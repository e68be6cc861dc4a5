use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use reqwest::Url;
use std::{
    env, fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::args::BaseArgs;
use crate::ui::{print_command_status, CommandStatus};

mod get;
mod list;
mod set;

pub const DEFAULT_API_URL: &str = "https://sentry.io";
const APP_DIR: &str = "related-events";
const LOCAL_DIR: &str = ".related-events";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub org: Option<String>,
    pub api_url: Option<String>,
    pub app_url: Option<String>,
    /// Path the listing is viewed from, e.g. `/organizations/acme/issues/`.
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub const KNOWN_KEYS: &[&str] = &["org", "api_url", "app_url", "location"];

impl Config {
    pub fn get_field(&self, key: &str) -> Option<&str> {
        match key {
            "org" => self.org.as_deref(),
            "api_url" => self.api_url.as_deref(),
            "app_url" => self.app_url.as_deref(),
            "location" => self.location.as_deref(),
            _ => None,
        }
    }

    fn slot(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "org" => Some(&mut self.org),
            "api_url" => Some(&mut self.api_url),
            "app_url" => Some(&mut self.app_url),
            "location" => Some(&mut self.location),
            _ => None,
        }
    }

    pub fn set_field(&mut self, key: &str, value: String) -> bool {
        self.slot(key).map(|slot| *slot = Some(value)).is_some()
    }

    pub fn unset_field(&mut self, key: &str) -> bool {
        self.slot(key).map(|slot| *slot = None).is_some()
    }

    pub fn non_empty_fields(&self) -> Vec<(&str, &str)> {
        KNOWN_KEYS
            .iter()
            .filter_map(|&key| self.get_field(key).map(|v| (key, v)))
            .collect()
    }

    fn merge(&self, other: &Config) -> Config {
        let mut extra = self.extra.clone();
        extra.extend(other.extra.clone());
        Config {
            org: other.org.clone().or_else(|| self.org.clone()),
            api_url: other.api_url.clone().or_else(|| self.api_url.clone()),
            app_url: other.app_url.clone().or_else(|| self.app_url.clone()),
            location: other.location.clone().or_else(|| self.location.clone()),
            extra,
        }
    }
}

/// Effective settings for one run: CLI flags > local config > global config > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub org: Option<String>,
    pub api_url: String,
    pub app_url: String,
    pub location: Option<String>,
}

impl Settings {
    pub fn resolve(base: &BaseArgs, config: &Config) -> Self {
        let api_url = base
            .api_url
            .clone()
            .or_else(|| config.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let app_url = base
            .app_url
            .clone()
            .or_else(|| config.app_url.clone())
            .unwrap_or_else(|| api_url.clone());
        Self {
            org: base.org.clone().or_else(|| config.org.clone()),
            api_url: api_url.trim_end_matches('/').to_string(),
            app_url: app_url.trim_end_matches('/').to_string(),
            location: config.location.clone(),
        }
    }

    pub fn require_org(&self) -> Result<&str> {
        self.org
            .as_deref()
            .filter(|org| !org.trim().is_empty())
            .ok_or_else(|| anyhow!("--org required (or set SENTRY_ORG, or `config set org <slug>`)"))
    }
}

pub fn validate_value(key: &str, value: &str) -> Result<()> {
    match key {
        "api_url" | "app_url" => {
            let url = Url::parse(value).map_err(|e| anyhow!("invalid {key} '{value}': {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("invalid {key} '{value}': expected an http(s) URL");
            }
        }
        "location" => {
            if !value.starts_with('/') && !value.contains("://") {
                bail!("invalid location '{value}': expected a path like /organizations/<org>/issues/");
            }
        }
        "org" => {
            if value.trim().is_empty() || value.contains('/') {
                bail!("invalid org slug '{value}'");
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn global_config_dir() -> Result<PathBuf> {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join(APP_DIR));
    }
    dirs::home_dir()
        .map(|path| path.join(".config").join(APP_DIR))
        .ok_or_else(|| anyhow!("$HOME not configured."))
}

pub fn global_path() -> Result<PathBuf> {
    Ok(global_config_dir()?.join("config.json"))
}

/// Missing or unreadable files load as an empty config with a warning.
pub fn load_file(path: &Path) -> Config {
    let file_contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            print_command_status(
                CommandStatus::Warning,
                &format!("could not read {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    let config: Config = match serde_json::from_str(&file_contents) {
        Ok(c) => c,
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("could not parse {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    for key in config.extra.keys() {
        print_command_status(
            CommandStatus::Warning,
            &format!("unknown config key {} in {}", key, path.display()),
        );
    }
    tracing::debug!(path = %path.display(), "loaded config");

    config
}

pub fn load_global() -> Result<Config> {
    Ok(load_file(&global_path()?))
}

pub fn load() -> Result<Config> {
    let global = load_global().unwrap_or_default();
    let local = match local_path() {
        Some(p) => load_file(&p),
        None => Config::default(),
    };
    Ok(global.merge(&local))
}

pub fn save_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Walk up from `start` looking for a `.related-events` directory. Stops at a
/// repository root or `$HOME`.
pub fn find_local_config_dir_from(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let mut current_dir = start.to_path_buf();
    loop {
        let candidate = current_dir.join(LOCAL_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if current_dir.join(".git").exists() || Some(current_dir.as_path()) == home {
            return None;
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

pub fn local_path() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    let home = dirs::home_dir();
    find_local_config_dir_from(&cwd, home.as_deref()).map(|dir| dir.join("config.json"))
}

/// Resolve which config file to write based on --global/--local flags.
pub fn resolve_write_path(global: bool, local: bool) -> Result<PathBuf> {
    if global {
        return global_path();
    }
    match local_path() {
        Some(p) => Ok(p),
        None if local => Ok(env::current_dir()?.join(LOCAL_DIR).join("config.json")),
        None => global_path(),
    }
}

// --- CLI commands ---

#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// Apply to global config (~/.config/related-events/config.json)
    #[arg(long, short = 'g', conflicts_with = "local")]
    global: bool,

    /// Apply to local config (.related-events/config.json)
    #[arg(long, short = 'l')]
    local: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommands>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommands {
    /// List config values
    List {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Show config values grouped by source file
        #[arg(long)]
        by_source: bool,
    },
    /// Get a config value
    Get {
        /// Config key (org, api_url, app_url, location)
        key: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Set a config value
    Set {
        /// Config key (org, api_url, app_url, location)
        key: String,
        /// Value to set
        value: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Remove a config value
    Unset {
        /// Config key (org, api_url, app_url, location)
        key: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

fn validate_key(key: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!(
            "Unknown config key: {key}\nValid keys: {}",
            KNOWN_KEYS.join(", ")
        );
    }
    Ok(())
}

pub fn run(base: BaseArgs, args: ConfigArgs) -> Result<()> {
    match args.command {
        None => list::run(&base, false, false, false),
        Some(ConfigCommands::List { scope, by_source }) => {
            list::run(&base, scope.global, scope.local, by_source)
        }
        Some(ConfigCommands::Get { key, scope }) => {
            validate_key(&key)?;
            get::run(&base, &key, scope.global, scope.local)
        }
        Some(ConfigCommands::Set { key, value, scope }) => {
            validate_key(&key)?;
            validate_value(&key, &value)?;
            set::run(&key, &value, scope.global, scope.local)
        }
        Some(ConfigCommands::Unset { key, scope }) => {
            validate_key(&key)?;
            set::unset(&key, scope.global, scope.local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base() -> BaseArgs {
        BaseArgs {
            json: false,
            org: None,
            auth_token: None,
            api_url: None,
            app_url: None,
            env_file: None,
            verbose: 0,
        }
    }

    #[test]
    fn merge_other_takes_precedence() {
        let global = Config {
            org: Some("global-org".into()),
            location: Some("/organizations/global-org/issues/".into()),
            ..Default::default()
        };
        let local = Config {
            org: Some("local-org".into()),
            ..Default::default()
        };
        let merged = global.merge(&local);
        assert_eq!(merged.org, Some("local-org".into()));
        assert_eq!(
            merged.location,
            Some("/organizations/global-org/issues/".into())
        );
    }

    #[test]
    fn set_and_unset_known_keys_only() {
        let mut config = Config::default();
        assert!(config.set_field("location", "/organizations/acme/discover/".into()));
        assert_eq!(
            config.get_field("location"),
            Some("/organizations/acme/discover/")
        );
        assert!(config.unset_field("location"));
        assert_eq!(config.get_field("location"), None);
        assert!(!config.set_field("project", "nope".into()));
    }

    #[test]
    fn settings_default_app_url_to_api_url() {
        let config = Config {
            api_url: Some("https://sentry.example.com/".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(&base(), &config);
        assert_eq!(settings.api_url, "https://sentry.example.com");
        assert_eq!(settings.app_url, "https://sentry.example.com");
    }

    #[test]
    fn settings_prefer_cli_flags() {
        let mut args = base();
        args.org = Some("cli-org".into());
        args.app_url = Some("https://app.example.com".into());
        let config = Config {
            org: Some("config-org".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, &config);
        assert_eq!(settings.org.as_deref(), Some("cli-org"));
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.app_url, "https://app.example.com");
    }

    #[test]
    fn require_org_rejects_missing() {
        let settings = Settings::resolve(&base(), &Config::default());
        assert!(settings.require_org().is_err());
    }

    #[test]
    fn validate_value_checks_urls_and_locations() {
        assert!(validate_value("api_url", "https://sentry.io").is_ok());
        assert!(validate_value("api_url", "ftp://sentry.io").is_err());
        assert!(validate_value("app_url", "not a url").is_err());
        assert!(validate_value("location", "/organizations/acme/issues/").is_ok());
        assert!(validate_value("location", "issues").is_err());
        assert!(validate_value("org", "acme/other").is_err());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_file(&tmp.path().join("nonexistent.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_json_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("invalid.json");
        fs::write(&path, "not valid json {{{").unwrap();
        assert_eq!(load_file(&path).org, None);
    }

    #[test]
    fn unknown_keys_survive_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"org": "acme", "theme": "dark"}"#).unwrap();

        let config = load_file(&path);
        save_file(&path, &config).unwrap();
        let reloaded = load_file(&path);

        assert_eq!(reloaded.org, Some("acme".into()));
        assert!(reloaded.extra.contains_key("theme"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn local_dir_found_from_nested_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(LOCAL_DIR)).unwrap();
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_local_config_dir_from(&nested, None),
            Some(root.join(LOCAL_DIR))
        );
    }

    #[test]
    fn local_dir_search_stops_at_repository_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join(LOCAL_DIR)).unwrap();
        let repo = root.join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(find_local_config_dir_from(&repo, None), None);
    }
}
