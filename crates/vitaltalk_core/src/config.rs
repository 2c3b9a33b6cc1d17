use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VitalConfig {
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
    pub safety: SafetyConfig,
    pub gateway: GatewayConfig,
}

impl VitalConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: VitalConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse() {
                self.llm.max_tokens = n;
            }
        }
        if let Ok(v) = std::env::var("VITALTALK_STORE") {
            match v.as_str() {
                "memory" => self.store.backend = StoreBackend::Memory,
                "sqlite" => self.store.backend = StoreBackend::Sqlite,
                other => tracing::warn!("Ignoring unknown VITALTALK_STORE '{}'", other),
            }
        }
        if let Ok(v) = std::env::var("VITALTALK_SQLITE_PATH") {
            self.store.sqlite_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GATEWAY_HOST") {
            self.gateway.host = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_PORT") {
            if let Ok(n) = v.parse() {
                self.gateway.port = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.checkpoint_ttl_secs >= self.store.state_ttl_secs {
            anyhow::bail!(
                "store.checkpoint_ttl_secs ({}) must be shorter than store.state_ttl_secs ({})",
                self.store.checkpoint_ttl_secs,
                self.store.state_ttl_secs
            );
        }
        if self.pipeline.stage_timeout_secs == 0 {
            anyhow::bail!("pipeline.stage_timeout_secs must be positive");
        }
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" or "mock"
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub roles: RoleParams,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            max_tokens: 1024,
            roles: RoleParams::default(),
        }
    }
}

/// Sampling temperature per pipeline role. Judgment roles run cold.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoleParams {
    pub evaluator_temperature: f32,
    pub generator_temperature: f32,
    pub safety_temperature: f32,
    pub coach_temperature: f32,
    /// Optional stronger model for end-of-session scoring.
    pub coach_model: Option<String>,
}

impl Default for RoleParams {
    fn default() -> Self {
        Self {
            evaluator_temperature: 0.3,
            generator_temperature: 0.7,
            safety_temperature: 0.2,
            coach_temperature: 0.4,
            coach_model: Some("gpt-4o".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: PathBuf,
    pub state_ttl_secs: u64,
    pub checkpoint_ttl_secs: u64,
}

impl StoreConfig {
    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    pub fn checkpoint_ttl(&self) -> Duration {
        Duration::from_secs(self.checkpoint_ttl_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_path: PathBuf::from("vitaltalk.db"),
            state_ttl_secs: 86_400,
            checkpoint_ttl_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on each external call in a turn.
    pub stage_timeout_secs: u64,
    /// History entries shown to the response generator.
    pub history_window: usize,
    /// History entries shown to the transition evaluator.
    pub evaluator_window: usize,
    /// Largest intensity change allowed in a single turn.
    pub max_intensity_step: u8,
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 30,
            history_window: 5,
            evaluator_window: 3,
            max_intensity_step: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub blocked_keywords: Vec<String>,
    pub rejection_message: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            blocked_keywords: vec!["harm".into(), "kill".into(), "abuse".into()],
            rejection_message: "Please maintain professional communication.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = VitalConfig::default();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.state_ttl_secs, 86_400);
        assert_eq!(cfg.store.checkpoint_ttl_secs, 3_600);
        assert_eq!(cfg.pipeline.history_window, 5);
        assert_eq!(cfg.safety.blocked_keywords.len(), 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[llm]
provider = "mock"
model = "test-model"
"#;
        let cfg: VitalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.model, "test-model");
        // Defaults for unspecified fields
        assert_eq!(cfg.llm.max_tokens, 1024);
        assert!((cfg.llm.roles.generator_temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(cfg.gateway.port, 8000);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
base_url = "http://localhost:11434/v1"
max_tokens = 512

[llm.roles]
evaluator_temperature = 0.1
coach_model = "gpt-4o"

[store]
backend = "sqlite"
sqlite_path = "data/state.db"
state_ttl_secs = 7200
checkpoint_ttl_secs = 600

[pipeline]
stage_timeout_secs = 10
history_window = 8
max_intensity_step = 2

[safety]
blocked_keywords = ["harm"]
rejection_message = "Stay professional."

[gateway]
host = "0.0.0.0"
port = 9000
"#;
        let cfg: VitalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert!((cfg.llm.roles.evaluator_temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.checkpoint_ttl(), Duration::from_secs(600));
        assert_eq!(cfg.pipeline.stage_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.pipeline.evaluator_window, 3);
        assert_eq!(cfg.safety.blocked_keywords, vec!["harm".to_string()]);
        assert_eq!(cfg.gateway.port, 9000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_checkpoint_ttl_must_be_shorter() {
        let mut cfg = VitalConfig::default();
        cfg.store.checkpoint_ttl_secs = cfg.store.state_ttl_secs;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("LLM_PROVIDER", "mock");
        std::env::set_var("VITALTALK_STORE", "sqlite");

        let mut cfg = VitalConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);

        // Clean up env vars before testing defaults
        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("VITALTALK_STORE");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = VitalConfig::load_or_default("/nonexistent/path.toml");
        assert_eq!(cfg.llm.provider, "openai");
    }
}
