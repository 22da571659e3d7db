pub mod image_prep;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod settings;

use std::path::Path;

use dfx_contracts::categories::{AnalysisCategory, CategorySelection};
use dfx_contracts::events::EventWriter;
use dfx_contracts::records::{
    project_specifications, DesignBrainstorming, ObjectDescription, ProjectionError,
    SpecificationSet,
};
use dfx_contracts::report::ReportSection;
use dfx_contracts::sanitize::{extract_json_object, SanitizeError};
use serde_json::{json, Value};
use thiserror::Error;

use crate::image_prep::prepare_image_data_url;
use crate::providers::{error_chain_text, VisionProvider, VisionRequest};
use crate::settings::AnalyzerSettings;

pub use crate::session::{run_session, SessionOptions, SessionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Describe,
    Brainstorm,
    Specifications,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Describe => "object_description",
            AnalysisKind::Brainstorm => "brainstorming",
            AnalysisKind::Specifications => "specifications",
        }
    }

    pub fn section(self) -> ReportSection {
        match self {
            AnalysisKind::Describe => ReportSection::ObjectDescription,
            AnalysisKind::Brainstorm => ReportSection::Brainstorming,
            AnalysisKind::Specifications => ReportSection::Specifications,
        }
    }
}

/// Why one analysis produced no record. Terminal for that analysis only.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read image {path}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error("model reply is not valid JSON: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        /// Model reply exactly as received, before sanitizing.
        raw: String,
    },

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Image { .. } => "image",
            AnalysisError::Transport { .. } => "transport",
            AnalysisError::Sanitize(_) => "sanitize",
            AnalysisError::Parse { .. } => "parse",
            AnalysisError::Projection(_) => "projection",
        }
    }

    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            AnalysisError::Parse { raw, .. } => Some(raw.as_str()),
            _ => None,
        }
    }
}

/// Runs the three design analyses against one vision provider.
pub struct DfxAnalyzer<'a> {
    provider: &'a dyn VisionProvider,
    settings: AnalyzerSettings,
    events: Option<EventWriter>,
}

impl<'a> DfxAnalyzer<'a> {
    pub fn new(provider: &'a dyn VisionProvider, settings: AnalyzerSettings) -> Self {
        Self {
            provider,
            settings,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn describe_object(&self, image: &Path) -> Result<ObjectDescription, AnalysisError> {
        self.observe(AnalysisKind::Describe, || {
            let value = self.request_json(
                AnalysisKind::Describe,
                image,
                prompts::describe_instruction(),
                self.settings.describe_max_output_tokens,
                &[],
            )?;
            Ok(ObjectDescription::project(&value)?)
        })
    }

    pub fn brainstorm(&self, image: &Path) -> Result<DesignBrainstorming, AnalysisError> {
        self.observe(AnalysisKind::Brainstorm, || {
            let value = self.request_json(
                AnalysisKind::Brainstorm,
                image,
                prompts::brainstorm_instruction(),
                self.settings.analysis_max_output_tokens,
                &[],
            )?;
            Ok(DesignBrainstorming::project(&value)?)
        })
    }

    /// Categories whose entry is absent or malformed are left out of the
    /// result; only a failure of the whole exchange is an error.
    pub fn analyze_specifications(
        &self,
        image: &Path,
        categories: &CategorySelection,
    ) -> Result<SpecificationSet, AnalysisError> {
        self.observe(AnalysisKind::Specifications, || {
            let requested = categories.iter().collect::<Vec<_>>();
            let value = self.request_json(
                AnalysisKind::Specifications,
                image,
                prompts::specification_instruction(categories),
                self.settings.analysis_max_output_tokens,
                &requested,
            )?;
            let set = project_specifications(&value)?;
            self.report_specification_gaps(&set, categories);
            Ok(set)
        })
    }

    fn request_json(
        &self,
        kind: AnalysisKind,
        image: &Path,
        instruction: String,
        max_output_tokens: u64,
        categories: &[AnalysisCategory],
    ) -> Result<Value, AnalysisError> {
        let prepared = prepare_image_data_url(image, self.settings.image_max_dim).map_err(
            |source| AnalysisError::Image {
                path: image.display().to_string(),
                source,
            },
        )?;
        let request = VisionRequest {
            kind,
            instruction,
            image_data_url: prepared.data_url,
            max_output_tokens,
            categories: categories.to_vec(),
        };
        let reply = self
            .provider
            .complete(&request)
            .map_err(|err| AnalysisError::Transport {
                provider: self.provider.name().to_string(),
                message: error_chain_text(&err, 600),
            })?;
        tracing::debug!(
            kind = kind.as_str(),
            model = %reply.model,
            chars = reply.text.len(),
            "model reply received"
        );
        self.emit(
            "model_reply",
            json!({
                "analysis": kind.as_str(),
                "provider": self.provider.name(),
                "model": reply.model,
                "image_sha256": prepared.sha256,
                "max_output_tokens": max_output_tokens,
                "input_tokens": reply.input_tokens,
                "output_tokens": reply.output_tokens,
                "reply_chars": reply.text.chars().count(),
            }),
        );

        let candidate = extract_json_object(&reply.text)?;
        serde_json::from_str(&candidate).map_err(|source| AnalysisError::Parse {
            source,
            raw: reply.text,
        })
    }

    fn report_specification_gaps(&self, set: &SpecificationSet, categories: &CategorySelection) {
        for rejected in &set.rejected {
            tracing::warn!(category = %rejected.category, reason = %rejected.reason, "specification entry rejected");
            self.emit(
                "category_rejected",
                json!({"category": rejected.category, "reason": rejected.reason}),
            );
        }
        for category in set.missing(categories) {
            tracing::warn!(category = category.as_str(), "no specification returned for category");
            self.emit("category_missing", json!({"category": category.as_str()}));
        }
        for name in set.unrequested(categories) {
            tracing::debug!(category = name, "keeping specification for unrequested category");
        }
    }

    fn observe<T>(
        &self,
        kind: AnalysisKind,
        run: impl FnOnce() -> Result<T, AnalysisError>,
    ) -> Result<T, AnalysisError> {
        self.emit("analysis_started", json!({"analysis": kind.as_str()}));
        let result = run();
        match &result {
            Ok(_) => self.emit("analysis_completed", json!({"analysis": kind.as_str()})),
            Err(err) => {
                tracing::warn!(analysis = kind.as_str(), error = %err, "analysis failed");
                self.emit(
                    "analysis_failed",
                    json!({
                        "analysis": kind.as_str(),
                        "error_kind": err.kind(),
                        "error": err.to_string(),
                        "raw_reply": err.raw_reply(),
                    }),
                );
            }
        }
        result
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.record(event_type, payload) {
            tracing::warn!(error = %err, event_type, "failed to write event");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use image::{Rgb, RgbImage};

    use crate::providers::{VisionProvider, VisionReply, VisionRequest};
    use crate::AnalysisKind;

    /// Provider that answers from a per-kind script and records requests.
    #[derive(Default)]
    pub struct ScriptedProvider {
        replies: Mutex<Vec<(AnalysisKind, VecDeque<Result<String, String>>)>>,
        pub seen: Mutex<Vec<VisionRequest>>,
    }

    impl ScriptedProvider {
        pub fn reply(self, kind: AnalysisKind, text: impl Into<String>) -> Self {
            self.push(kind, Ok(text.into()))
        }

        pub fn fail(self, kind: AnalysisKind, message: impl Into<String>) -> Self {
            self.push(kind, Err(message.into()))
        }

        fn push(self, kind: AnalysisKind, entry: Result<String, String>) -> Self {
            {
                let mut replies = self.replies.lock().unwrap();
                match replies.iter_mut().find(|(k, _)| *k == kind) {
                    Some((_, queue)) => queue.push_back(entry),
                    None => replies.push((kind, VecDeque::from([entry]))),
                }
            }
            self
        }

        pub fn requests(&self) -> Vec<VisionRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl VisionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete(&self, request: &VisionRequest) -> Result<VisionReply> {
            self.seen.lock().unwrap().push(request.clone());
            let next = self
                .replies
                .lock()
                .unwrap()
                .iter_mut()
                .find(|(k, _)| *k == request.kind)
                .and_then(|(_, queue)| queue.pop_front());
            match next {
                Some(Ok(text)) => Ok(VisionReply {
                    text,
                    model: "scripted-1".to_string(),
                    input_tokens: Some(10),
                    output_tokens: Some(20),
                }),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted reply for {}", request.kind.as_str())),
            }
        }
    }

    pub fn write_test_image(dir: &Path) -> PathBuf {
        let path = dir.join("design.png");
        RgbImage::from_pixel(32, 32, Rgb([200, 40, 40]))
            .save(&path)
            .unwrap();
        path
    }
}
