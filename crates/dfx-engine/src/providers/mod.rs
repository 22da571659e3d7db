mod dryrun;
mod openai;

use std::collections::BTreeMap;

use anyhow::Result;
use dfx_contracts::categories::AnalysisCategory;

pub use dryrun::DryrunVisionProvider;
pub use openai::OpenAiVisionProvider;

use crate::settings::OpenAiSettings;
use crate::AnalysisKind;

/// One request/response exchange with a multimodal model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub kind: AnalysisKind,
    pub instruction: String,
    pub image_data_url: String,
    pub max_output_tokens: u64,
    /// Categories named in the instruction; empty outside specification calls.
    pub categories: Vec<AnalysisCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionReply {
    pub text: String,
    pub model: String,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
}

pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &VisionRequest) -> Result<VisionReply>;
}

#[derive(Default)]
pub struct VisionProviderRegistry {
    providers: BTreeMap<String, Box<dyn VisionProvider>>,
}

impl VisionProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: VisionProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn VisionProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_provider_registry(openai: OpenAiSettings) -> Result<VisionProviderRegistry> {
    let mut registry = VisionProviderRegistry::new();
    registry.register(DryrunVisionProvider);
    registry.register(OpenAiVisionProvider::new(openai)?);
    Ok(registry)
}

/// Joins an error and its causes into one line.
pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_openai_and_dryrun() {
        let registry = default_provider_registry(OpenAiSettings::default()).unwrap();
        assert_eq!(registry.names(), vec!["dryrun", "openai"]);
        assert_eq!(registry.get("dryrun").map(|p| p.name()), Some("dryrun"));
        assert!(registry.get("gemini").is_none());
    }

    #[test]
    fn error_chain_text_preserves_nested_contexts() {
        let err = anyhow::anyhow!("connection reset")
            .context("openai request failed (https://example.test/v1/responses)")
            .context("brainstorm request failed");
        let rendered = error_chain_text(&err, 400);
        assert_eq!(
            rendered,
            "brainstorm request failed | caused by: openai request failed (https://example.test/v1/responses) | caused by: connection reset"
        );
    }

    #[test]
    fn truncate_text_marks_cut() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
