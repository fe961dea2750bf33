use crate::scope::ScopeKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScopechainConfig {
    /// Log filter used when `--verbose` is not given
    pub log_level: Option<String>,
    /// Output format: `text` or `json`
    pub format: Option<String>,
    /// Kind given to root scopes entered by scripts
    pub root_kind: Option<ScopeKind>,
}

impl ScopechainConfig {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or("text")
    }

    pub fn root_kind(&self) -> ScopeKind {
        self.root_kind.unwrap_or(ScopeKind::Module)
    }

    /// Defaults written by `scopechain init`
    pub fn starter() -> Self {
        Self {
            log_level: Some("info".to_string()),
            format: Some("text".to_string()),
            root_kind: Some(ScopeKind::Module),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("scopechain.toml")
}

pub fn parse_config(contents: &str) -> anyhow::Result<ScopechainConfig> {
    let config: ScopechainConfig = toml::from_str(contents)?;
    if let Some(format) = &config.format {
        if format != "text" && format != "json" {
            anyhow::bail!("unsupported output format '{}' (expected text or json)", format);
        }
    }
    Ok(config)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ScopechainConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    Ok(Some(parse_config(&contents)?))
}

pub fn write_config(path: &Path, config: &ScopechainConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
