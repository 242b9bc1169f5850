//! Configuration for the API client, retries and the CSV viewer

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use log::debug;

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const API_BASE_ENV: &str = "GROQ_API_BASE";
pub const MODEL_ENV: &str = "CHATDESK_MODEL";
pub const CSV_DIR_ENV: &str = "CHATDESK_CSV_DIR";

pub const DEFAULT_API_BASE: &str
  = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Total attempts per request, including the first
    pub max_attempts: usize
  , /// Backoff multiplier for retries
    pub backoff_multiplier: f32
  , /// Initial backoff duration in milliseconds; 0 disables delay
    pub initial_backoff_ms: u64
  , /// Stop retrying on errors another attempt cannot fix
    pub stop_on_permanent: bool
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 3
          , backoff_multiplier: 1.0
          , initial_backoff_ms: 0
          , stop_on_permanent: false
        }
    }
}

/// chatdesk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig
{   /// API base URL
    pub api_base: String
  , /// Default model identifier
    pub model: String
  , /// Request timeout in seconds
    pub timeout_secs: u64
  , /// Directory holding the viewer's CSV files
    pub csv_dir: PathBuf
  , /// Retry configuration
    pub retry: RetryConfig
}

impl Default for AppConfig
{   fn default() -> Self
    {   AppConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , model: DEFAULT_MODEL.to_string()
          , timeout_secs: 60
          , csv_dir: PathBuf::from("data")
          , retry: RetryConfig::default()
        }
    }
}

impl AppConfig
{   /// Load from an optional JSON file, then apply env overrides
    pub fn load(path: Option<&Path>)
      -> Result<Self, crate::error::Error>
    {   let mut config = match path
        {   Some(path) => AppConfig::from_file(path)?
          , None => AppConfig::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path)
      -> Result<Self, crate::error::Error>
    {   debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        serde_json::from_str(&text).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
      F: Fn(&str) -> Option<String>
    {   if let Some(base) = lookup(API_BASE_ENV)
        {   debug!("{} overrides api_base", API_BASE_ENV);
            self.api_base = base;
        }
        if let Some(model) = lookup(MODEL_ENV)
        {   debug!("{} overrides model", MODEL_ENV);
            self.model = model;
        }
        if let Some(dir) = lookup(CSV_DIR_ENV)
        {   debug!("{} overrides csv_dir", CSV_DIR_ENV);
            self.csv_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.api_base.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "api_base must not be empty".to_string()
            ));
        }
        if self.model.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "model must not be empty".to_string()
            ));
        }
        if self.retry.max_attempts == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "retry.max_attempts must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

/// Read the API credential; absent or blank is an error
pub fn api_key_from_env() -> Result<String, crate::error::Error>
{   api_key_from(|key| std::env::var(key).ok())
}

pub fn api_key_from<F>(lookup: F) -> Result<String, crate::error::Error>
where
  F: Fn(&str) -> Option<String>
{   match lookup(API_KEY_ENV)
    {   Some(key) if !key.trim().is_empty() => Ok(key)
      , _ => Err(crate::error::Error::MissingApiKey(
          API_KEY_ENV.to_string()
        ))
    }
}
