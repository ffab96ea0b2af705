use std::env;
use std::time::Duration;

use tracing::info;

use crate::error::CrisisError;
use crate::types::SourceId;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Reasoning models
    pub openrouter_api_key: String,

    // Providers. ACLED requires registration; the other provider APIs are keyless.
    pub acled_api_key: Option<String>,
    pub acled_email: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    pub fusion: FusionConfig,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            openrouter_api_key: required_env("OPENROUTER_API_KEY"),
            acled_api_key: env::var("ACLED_API_KEY").ok(),
            acled_email: env::var("ACLED_EMAIL").ok(),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            fusion: FusionConfig::from_env(),
        }
    }

    /// Log configuration without leaking secrets.
    pub fn log_redacted(&self) {
        info!(
            openrouter_key_set = !self.openrouter_api_key.is_empty(),
            acled_key_set = self.acled_api_key.is_some(),
            web_host = self.web_host.as_str(),
            web_port = self.web_port,
            models = self.fusion.models.len(),
            assessment_ttl_secs = self.fusion.assessment_ttl.as_secs(),
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// --- Fusion configuration ---

/// Per-source fusion weights. Explicit configuration, never inferred.
#[derive(Debug, Clone, Copy)]
pub struct SourceWeights {
    pub conflict: f64,
    pub economic: f64,
    pub climate: f64,
    pub news: f64,
}

impl SourceWeights {
    pub fn weight_for(&self, source: SourceId) -> f64 {
        match source {
            SourceId::Conflict => self.conflict,
            SourceId::Economic => self.economic,
            SourceId::Climate => self.climate,
            SourceId::News => self.news,
        }
    }

    pub fn sum(&self) -> f64 {
        self.conflict + self.economic + self.climate + self.news
    }
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            conflict: 0.35,
            economic: 0.20,
            climate: 0.20,
            news: 0.25,
        }
    }
}

/// One configured reasoning call. Priority is list order in
/// `FusionConfig::models`; slower, richer models get larger timeouts.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub timeout: Duration,
}

/// Tunables for the fusion engine, caches, and orchestrator.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub weights: SourceWeights,
    /// Sources below this weight cannot alone raise the risk ceiling.
    pub min_contribution_weight: f64,
    pub assessment_ttl: Duration,
    pub analysis_ttl: Duration,
    pub provider_ttl: Duration,
    pub fetch_timeout: Duration,
    pub models: Vec<ModelSpec>,
}

impl FusionConfig {
    pub fn from_env() -> Self {
        Self {
            weights: SourceWeights {
                conflict: env_f64("WEIGHT_CONFLICT", 0.35),
                economic: env_f64("WEIGHT_ECONOMIC", 0.20),
                climate: env_f64("WEIGHT_CLIMATE", 0.20),
                news: env_f64("WEIGHT_NEWS", 0.25),
            },
            min_contribution_weight: env_f64("MIN_CONTRIBUTION_WEIGHT", 0.15),
            assessment_ttl: Duration::from_secs(env_u64("ASSESSMENT_TTL_SECS", 300)),
            analysis_ttl: Duration::from_secs(env_u64("ANALYSIS_TTL_SECS", 120)),
            provider_ttl: Duration::from_secs(env_u64("PROVIDER_TTL_SECS", 600)),
            fetch_timeout: Duration::from_secs(env_u64("FETCH_TIMEOUT_SECS", 10)),
            models: default_models(),
        }
    }

    /// Fail-fast validation, run once at startup. A weight table that doesn't
    /// sum to 1.0 is a configuration error, not a runtime condition.
    pub fn validate(&self) -> Result<(), CrisisError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(CrisisError::Config(format!(
                "source weights must sum to 1.0, got {sum}"
            )));
        }
        for source in SourceId::ALL {
            let w = self.weights.weight_for(source);
            if !(0.0..=1.0).contains(&w) {
                return Err(CrisisError::Config(format!(
                    "weight for {source} out of range: {w}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_contribution_weight) {
            return Err(CrisisError::Config(format!(
                "min_contribution_weight out of range: {}",
                self.min_contribution_weight
            )));
        }
        if self.models.is_empty() {
            return Err(CrisisError::Config(
                "at least one reasoning model must be configured".to_string(),
            ));
        }
        if let Some(m) = self.models.iter().find(|m| m.timeout.is_zero()) {
            return Err(CrisisError::Config(format!(
                "model {} has a zero timeout",
                m.name
            )));
        }
        Ok(())
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: SourceWeights::default(),
            min_contribution_weight: 0.15,
            assessment_ttl: Duration::from_secs(300),
            analysis_ttl: Duration::from_secs(120),
            provider_ttl: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(10),
            models: default_models(),
        }
    }
}

/// Priority order is position: the first responding model that parses wins
/// only if no higher-priority model also parsed.
fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            name: "anthropic/claude-sonnet-4".to_string(),
            timeout: Duration::from_secs(7),
        },
        ModelSpec {
            name: "openai/gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(5),
        },
        ModelSpec {
            name: "meta-llama/llama-3.1-8b-instruct".to_string(),
            timeout: Duration::from_secs(3),
        },
    ]
}
