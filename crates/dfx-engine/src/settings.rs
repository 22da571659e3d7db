use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_DESCRIBE_MAX_OUTPUT_TOKENS: u64 = 1000;
pub const DEFAULT_ANALYSIS_MAX_OUTPUT_TOKENS: u64 = 4000;
pub const DEFAULT_IMAGE_MAX_DIM: u32 = 2048;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

const MAX_OUTPUT_TOKENS_RANGE: (u64, u64) = (64, 16_384);
const IMAGE_MAX_DIM_RANGE: (u64, u64) = (128, 4096);
const REQUEST_TIMEOUT_RANGE: (u64, u64) = (5, 600);

/// Reply budgets and image limits for the three analysis calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerSettings {
    pub describe_max_output_tokens: u64,
    pub analysis_max_output_tokens: u64,
    pub image_max_dim: u32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            describe_max_output_tokens: DEFAULT_DESCRIBE_MAX_OUTPUT_TOKENS,
            analysis_max_output_tokens: DEFAULT_ANALYSIS_MAX_OUTPUT_TOKENS,
            image_max_dim: DEFAULT_IMAGE_MAX_DIM,
        }
    }
}

impl AnalyzerSettings {
    pub fn from_env() -> Self {
        Self {
            describe_max_output_tokens: env_u64_clamped(
                "DFX_DESCRIBE_MAX_TOKENS",
                DEFAULT_DESCRIBE_MAX_OUTPUT_TOKENS,
                MAX_OUTPUT_TOKENS_RANGE,
            ),
            analysis_max_output_tokens: env_u64_clamped(
                "DFX_ANALYSIS_MAX_TOKENS",
                DEFAULT_ANALYSIS_MAX_OUTPUT_TOKENS,
                MAX_OUTPUT_TOKENS_RANGE,
            ),
            image_max_dim: env_u64_clamped(
                "DFX_IMAGE_MAX_DIM",
                u64::from(DEFAULT_IMAGE_MAX_DIM),
                IMAGE_MAX_DIM_RANGE,
            ) as u32,
        }
    }
}

/// Connection settings for the OpenAI Responses endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for OpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl OpenAiSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: first_non_empty(&lookup, &["OPENAI_API_KEY"]),
            api_base: normalize_api_base(
                first_non_empty(&lookup, &["OPENAI_API_BASE", "OPENAI_BASE_URL"]).as_deref(),
            ),
            model: first_non_empty(&lookup, &["DFX_MODEL", "OPENAI_VISION_MODEL"])
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout: Duration::from_secs(parse_u64_clamped(
                first_non_empty(&lookup, &["DFX_REQUEST_TIMEOUT_SECS"]).as_deref(),
                DEFAULT_REQUEST_TIMEOUT_SECS,
                REQUEST_TIMEOUT_RANGE,
            )),
        }
    }
}

fn first_non_empty_env(keys: &[&str]) -> Option<String> {
    first_non_empty(&|key: &str| env::var(key).ok(), keys)
}

fn first_non_empty(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = lookup(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Trims trailing slashes and appends `/v1` to a bare host.
pub fn normalize_api_base(raw: Option<&str>) -> String {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_BASE);
    let mut base = raw.trim_end_matches('/').to_string();
    if let Ok(parsed) = reqwest::Url::parse(&base) {
        if parsed.path().trim().is_empty() || parsed.path() == "/" {
            base = format!("{base}/v1");
        }
    }
    base.trim_end_matches('/').to_string()
}

fn env_u64_clamped(key: &str, default: u64, (min, max): (u64, u64)) -> u64 {
    parse_u64_clamped(first_non_empty_env(&[key]).as_deref(), default, (min, max))
}

fn parse_u64_clamped(raw: Option<&str>, default: u64, (min, max): (u64, u64)) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}
