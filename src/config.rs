use serde::Deserialize;
use std::path::{Path, PathBuf};

const TOKEN_ENV_VAR: &str = "DISCORD_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no Discord token in config file or 'DISCORD_TOKEN' environment variable")]
    MissingToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(rename = "charlimit", default = "default_char_limit")]
    pub char_limit: usize,
    #[serde(rename = "guildids", default)]
    pub guild_ids: GuildIds,
    #[serde(default = "default_dm_role")]
    pub dm_role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuildIds {
    #[serde(default)]
    pub test: Vec<u64>,
    #[serde(default)]
    pub prod: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub directory: Directories,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Directories {
    #[serde(default = "default_templates_dir")]
    pub templates: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            templates: default_templates_dir(),
            data: default_data_dir(),
        }
    }
}

fn default_char_limit() -> usize {
    2000
}

fn default_dm_role() -> String {
    "Dungeon Master".to_string()
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Config {
    /// Reads the JSON config at `path`. The `DISCORD_TOKEN` environment
    /// variable, when set, replaces whatever token the file holds.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw, std::env::var(TOKEN_ENV_VAR).ok()).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    fn from_json(raw: &str, token_override: Option<String>) -> Result<Self, ConfigError> {
        let mut config: Config =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        if let Some(token) = token_override.filter(|t| !t.trim().is_empty()) {
            config.discord.token = token;
        }

        if config.discord.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        Ok(config)
    }

    /// Guilds to register commands in. Empty means register globally.
    pub fn guild_ids(&self, test_mode: bool) -> &[u64] {
        if test_mode {
            &self.discord.guild_ids.test
        } else {
            &self.discord.guild_ids.prod
        }
    }

    /// Max characters a single reply message may carry.
    pub fn char_limit(&self) -> usize {
        self.discord.char_limit
    }
}
