use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{PrerollError, Result};

/// Origins that are always allowed to call the API from a browser.
pub const BASE_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

// -- Server ------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address.  Can be overridden with the `PREROLL_BIND` env var.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Extra browser origins allowed by CORS, on top of the local
    /// development origins.  `FRONTEND_ORIGINS` (comma-separated) is
    /// appended at load time.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// -- LLM ---------------------------------------------------------------------

#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    /// Provider API key.  Usually supplied via `GROQ_API_KEY` rather than
    /// the config file.  Empty means not configured.
    #[serde(default)]
    pub api_key: String,

    /// OpenAI-compatible API base URL.
    /// Can be overridden with the `GROQ_BASE_URL` env var.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.  Can be overridden with the `GROQ_MODEL` env var.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for structured generation.
    /// Can be overridden with the `GROQ_TEMPERATURE` env var.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens for structured generation.
    /// Can be overridden with the `GROQ_MAX_TOKENS` env var.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for the free-form assistant.
    #[serde(default = "default_assist_temperature")]
    pub assist_temperature: f32,

    /// Maximum output tokens for the free-form assistant.
    #[serde(default = "default_assist_max_tokens")]
    pub assist_max_tokens: u32,

    /// Upper bound on a single completion call in seconds (0 = no timeout).
    /// Can be overridden with the `GROQ_TIMEOUT_SECS` env var.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("assist_temperature", &self.assist_temperature)
            .field("assist_max_tokens", &self.assist_max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// The configured credential, if any.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        if key.is_empty() { None } else { Some(key) }
    }
}

// -- Prompt ------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    /// Maximum character count of the assembled user prompt.
    /// Can be overridden with the `MAX_PROMPT_CHARS` env var.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Which system instruction set to use: "sections" (default) or the
    /// legacy "breakdown" schema.
    #[serde(default = "default_template_set")]
    pub template_set: String,
}

// -- Defaults ----------------------------------------------------------------

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    1400
}
fn default_assist_temperature() -> f32 {
    0.7
}
fn default_assist_max_tokens() -> u32 {
    1200
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_prompt_chars() -> usize {
    3000
}
fn default_template_set() -> String {
    "sections".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            assist_temperature: default_assist_temperature(),
            assist_max_tokens: default_assist_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            template_set: default_template_set(),
        }
    }
}

// -- Config impl -------------------------------------------------------------

impl Config {
    /// Load config from the given path (or the default XDG location), then
    /// apply environment overrides.  The result is never re-read.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let config = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)
                .map_err(|e| PrerollError::Config(format!("parse error: {e}")))?
        } else {
            info!("no config file found, using defaults");
            Config::default()
        };

        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("PREROLL_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("GROQ_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("GROQ_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("GROQ_TEMPERATURE") {
            parse_into("GROQ_TEMPERATURE", &v, &mut self.llm.temperature);
        }
        if let Some(v) = get("GROQ_MAX_TOKENS") {
            parse_into("GROQ_MAX_TOKENS", &v, &mut self.llm.max_tokens);
        }
        if let Some(v) = get("GROQ_TIMEOUT_SECS") {
            parse_into("GROQ_TIMEOUT_SECS", &v, &mut self.llm.timeout_secs);
        }
        if let Some(v) = get("MAX_PROMPT_CHARS") {
            parse_into("MAX_PROMPT_CHARS", &v, &mut self.prompt.max_prompt_chars);
        }
        if let Some(v) = get("FRONTEND_ORIGINS") {
            for origin in parse_origins(&v) {
                if !self.server.allowed_origins.contains(&origin) {
                    self.server.allowed_origins.push(origin);
                }
            }
        }
    }

    /// Full CORS allow-list: the base origins followed by configured ones,
    /// without duplicates.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = BASE_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect();
        for origin in &self.server.allowed_origins {
            let origin = origin.trim();
            if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
                origins.push(origin.to_string());
            }
        }
        origins
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/preroll/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("preroll")
            .join("config.toml")
    }

    /// Generate the default config file contents.
    pub fn default_config_contents() -> &'static str {
        include_str!("../config.example.toml")
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, raw: &str, slot: &mut T) {
    match raw.parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => warn!(var = key, value = raw, "ignoring unparseable environment override"),
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let c = Config::default();
        assert_eq!(c.server.bind, "127.0.0.1:8000");
        assert!(c.server.allowed_origins.is_empty());
        assert_eq!(c.llm.model, "llama-3.1-8b-instant");
        assert_eq!(c.llm.base_url, "https://api.groq.com/openai/v1");
        assert!((c.llm.temperature - 0.4).abs() < 0.001);
        assert_eq!(c.llm.max_tokens, 1400);
        assert!((c.llm.assist_temperature - 0.7).abs() < 0.001);
        assert_eq!(c.llm.assist_max_tokens, 1200);
        assert_eq!(c.llm.timeout_secs, 60);
        assert_eq!(c.prompt.max_prompt_chars, 3000);
        assert_eq!(c.prompt.template_set, "sections");
        assert!(c.llm.api_key().is_none());
    }

    #[test]
    fn parse_minimal_toml() {
        let c: Config = toml::from_str(r#"[server]
bind = "0.0.0.0:9000""#)
        .unwrap();
        assert_eq!(c.server.bind, "0.0.0.0:9000");
        assert_eq!(c.llm.max_tokens, 1400);
        assert_eq!(c.prompt.max_prompt_chars, 3000);
    }

    #[test]
    fn parse_llm_and_prompt_sections() {
        let toml_str = r#"
        [llm]
        model = "llama-3.3-70b-versatile"
        temperature = 0.2
        max_tokens = 900

        [prompt]
        max_prompt_chars = 500
        template_set = "breakdown"
        "#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.llm.model, "llama-3.3-70b-versatile");
        assert!((c.llm.temperature - 0.2).abs() < 0.001);
        assert_eq!(c.llm.max_tokens, 900);
        assert_eq!(c.prompt.max_prompt_chars, 500);
        assert_eq!(c.prompt.template_set, "breakdown");
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut c = Config::default();
        c.apply_overrides(env(&[
            ("GROQ_API_KEY", "  gsk_test  "),
            ("GROQ_MODEL", "mixtral-8x7b"),
            ("GROQ_TEMPERATURE", "0.9"),
            ("GROQ_MAX_TOKENS", "256"),
            ("MAX_PROMPT_CHARS", "120"),
            ("PREROLL_BIND", "0.0.0.0:8080"),
        ]));
        assert_eq!(c.llm.api_key(), Some("gsk_test"));
        assert_eq!(c.llm.model, "mixtral-8x7b");
        assert!((c.llm.temperature - 0.9).abs() < 0.001);
        assert_eq!(c.llm.max_tokens, 256);
        assert_eq!(c.prompt.max_prompt_chars, 120);
        assert_eq!(c.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn unparseable_numeric_override_keeps_previous_value() {
        let mut c = Config::default();
        c.apply_overrides(env(&[("GROQ_MAX_TOKENS", "lots"), ("MAX_PROMPT_CHARS", "-1")]));
        assert_eq!(c.llm.max_tokens, 1400);
        assert_eq!(c.prompt.max_prompt_chars, 3000);
    }

    #[test]
    fn blank_api_key_is_not_configured() {
        let mut c = Config::default();
        c.llm.api_key = "   ".into();
        assert!(c.llm.api_key().is_none());
        c.apply_overrides(env(&[("GROQ_API_KEY", "")]));
        assert!(c.llm.api_key().is_none());
    }

    #[test]
    fn frontend_origins_extend_base_set() {
        let mut c = Config::default();
        c.server.allowed_origins = vec!["https://preroll.app".into()];
        c.apply_overrides(env(&[(
            "FRONTEND_ORIGINS",
            " https://staging.preroll.app , ,https://preroll.app,http://localhost:3000",
        )]));
        assert_eq!(
            c.allowed_origins(),
            vec![
                "http://localhost:3000",
                "http://127.0.0.1:3000",
                "https://preroll.app",
                "https://staging.preroll.app",
            ]
        );
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut c = Config::default();
        c.llm.api_key = "gsk_secret_value".into();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("gsk_secret_value"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let c = Config::load_file(Some(Path::new("/tmp/nonexistent-preroll-test.toml"))).unwrap();
        assert_eq!(c.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bad-preroll.toml");
        std::fs::write(&path, "this is not valid %%% toml").unwrap();
        let result = Config::load_file(Some(&path));
        assert!(matches!(result, Err(PrerollError::Config(_))));
    }

    #[test]
    fn load_reads_file_values() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[prompt]\nmax_prompt_chars = 42\n").unwrap();
        let c = Config::load_file(Some(&path)).unwrap();
        assert_eq!(c.prompt.max_prompt_chars, 42);
    }

    #[test]
    fn default_config_path_has_preroll() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("preroll"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn default_config_contents_parse() {
        let contents = Config::default_config_contents();
        assert!(!contents.is_empty());
        let c: Config = toml::from_str(contents).unwrap();
        assert_eq!(c.prompt.max_prompt_chars, 3000);
        assert_eq!(c.llm.model, "llama-3.1-8b-instant");
    }
}
