//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use leadscout_core::Persona;
use serde::Deserialize;

/// TOML-backed file configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// City preset slug used when `--city` is omitted.
    pub default_city: Option<String>,
    /// Pause between text searches in milliseconds.
    pub query_delay_ms: Option<u64>,
    /// Result pages per query (1..=3).
    pub max_pages: Option<u8>,
    pub details_concurrency: Option<usize>,
    pub enrich_concurrency: Option<usize>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub supabase_table: Option<String>,
    pub sqlite_path: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub persona: Option<Persona>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(city) = self.default_city.as_deref()
            && leadscout_core::query::city_preset(city).is_none()
        {
            bail!(
                "Invalid config value for `default_city`: '{city}'. Run `leadscout presets` for known cities"
            );
        }
        if let Some(delay) = self.query_delay_ms
            && delay > 60_000
        {
            bail!("Invalid config value for `query_delay_ms`: {delay}. Expected range: 0..=60000");
        }
        if let Some(pages) = self.max_pages
            && !(1..=3).contains(&pages)
        {
            bail!("Invalid config value for `max_pages`: {pages}. Expected range: 1..=3");
        }
        validate_concurrency("details_concurrency", self.details_concurrency)?;
        validate_concurrency("enrich_concurrency", self.enrich_concurrency)?;
        validate_non_blank("llm_model", self.llm_model.as_deref())?;
        validate_non_blank("supabase_table", self.supabase_table.as_deref())?;
        if let Some(base_url) = self.llm_base_url.as_deref()
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            bail!("Invalid config value for `llm_base_url`: '{base_url}'. Expected an http(s) URL");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(persona) = self.persona.as_ref()
            && !matches!(persona.language.as_str(), "es" | "en")
        {
            bail!(
                "Invalid config value for `persona.language`: '{}'. Expected `es` or `en`",
                persona.language
            );
        }
        Ok(())
    }
}

fn validate_concurrency(field: &str, value: Option<usize>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=20).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=20");
    }
    Ok(())
}

fn validate_non_blank(field: &str, value: Option<&str>) -> Result<()> {
    if value.is_some_and(|v| v.trim().is_empty()) {
        bail!("Invalid config value for `{field}`: must not be empty");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
    pub loaded_from_file: bool,
}

impl LoadedConfig {
    /// The parsed config, or defaults when no file was found.
    #[must_use]
    pub fn file(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/leadscout/config.toml`
/// 2. `$HOME/.config/leadscout/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("leadscout")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("leadscout")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig {
            path,
            config: None,
            loaded_from_file: false,
        });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
        loaded_from_file: true,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}
