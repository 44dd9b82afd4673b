use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What the prediction handlers do with present-but-unusable input values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Substitute defaults and carry on (historical behaviour).
    #[default]
    Permissive,
    /// Reject the request with 422 and the list of offending fields.
    Strict,
}

impl FromStr for InputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(InputMode::Permissive),
            "strict" => Ok(InputMode::Strict),
            other => anyhow::bail!("INPUT_MODE must be 'permissive' or 'strict', got '{}'", other),
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Permissive => f.write_str("permissive"),
            InputMode::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Directory holding `<stem>.json` / `.ubj` / `.xgb` model artifacts.
    pub model_dir: PathBuf,
    pub input_mode: InputMode,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            model_dir: PathBuf::from("models"),
            input_mode: InputMode::Permissive,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_dir: match std::env::var("MODEL_DIR") {
                Ok(dir) if dir.trim().is_empty() => anyhow::bail!("MODEL_DIR cannot be empty"),
                Ok(dir) => PathBuf::from(dir),
                Err(_) => defaults.model_dir.clone(),
            },
            input_mode: match std::env::var("INPUT_MODE") {
                Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
                _ => defaults.input_mode,
            },
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| defaults.max_body_bytes.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))
                .and_then(|limit: usize| {
                    if limit == 0 {
                        anyhow::bail!("MAX_BODY_BYTES must be greater than zero");
                    }
                    Ok(limit)
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Model directory: {}", config.model_dir.display());
        tracing::debug!("Input mode: {}", config.input_mode);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
