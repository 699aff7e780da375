use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::util::{is_local_endpoint_url, non_empty_env};

pub const API_URL_ENV: &str = "PANELSTREAM_API_URL";
pub const API_KEY_ENV: &str = "PANELSTREAM_API_KEY";
pub const SYSTEM_PROMPT_ENV: &str = "PANELSTREAM_SYSTEM_PROMPT";
pub const CONTEXT_FILE_ENV: &str = "PANELSTREAM_CONTEXT_FILE";
const DEFAULT_API_URL: &str = "http://localhost:8000/v1/generate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    /// Host data forwarded with every request (catalog, preferences).
    pub context: Option<Value>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = non_empty_env(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let context = match non_empty_env(CONTEXT_FILE_ENV) {
            Some(path) => Some(load_context_file(Path::new(&path))?),
            None => None,
        };

        Ok(Self {
            api_url,
            api_key: non_empty_env(API_KEY_ENV),
            system_prompt: non_empty_env(SYSTEM_PROMPT_ENV),
            context,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !self.is_local_endpoint() && self.api_key.is_none() {
            bail!(
                "{API_KEY_ENV} must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        if let Some(context) = &self.context {
            if !context.is_object() {
                bail!("request context must be a JSON object");
            }
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}

pub fn load_context_file(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read context file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("context file '{}' is not valid JSON", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_uses_defaults_without_env() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        for name in [API_URL_ENV, API_KEY_ENV, SYSTEM_PROMPT_ENV, CONTEXT_FILE_ENV] {
            std::env::remove_var(name);
        }

        let config = Config::load().expect("config should load");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.api_key.is_none());
        assert!(config.context.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_reads_context_file() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("context.json");
        std::fs::write(&path, r#"{"properties":[{"id":"p1","title":"Loft"}]}"#)
            .expect("write context");
        std::env::set_var(CONTEXT_FILE_ENV, &path);

        let config = Config::load().expect("config should load");
        std::env::remove_var(CONTEXT_FILE_ENV);

        let context = config.context.expect("context loaded");
        assert_eq!(context["properties"][0]["title"], "Loft");
    }

    #[test]
    fn test_load_rejects_missing_context_file() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(CONTEXT_FILE_ENV, "/nonexistent/panelstream-context.json");
        let result = Config::load();
        std::env::remove_var(CONTEXT_FILE_ENV);

        assert!(result.is_err());
    }
}
