use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

use super::{truncate_text, VisionProvider, VisionReply, VisionRequest};
use crate::settings::OpenAiSettings;

/// Vision calls through the OpenAI Responses API.
pub struct OpenAiVisionProvider {
    settings: OpenAiSettings,
    http: HttpClient,
}

impl OpenAiVisionProvider {
    pub fn new(settings: OpenAiSettings) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { settings, http })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.settings.api_base)
    }
}

impl VisionProvider for OpenAiVisionProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, request: &VisionRequest) -> Result<VisionReply> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            bail!("OPENAI_API_KEY is not set");
        };
        let endpoint = self.endpoint();
        let payload = responses_payload(&self.settings.model, request);
        tracing::debug!(
            %endpoint,
            model = %self.settings.model,
            kind = request.kind.as_str(),
            max_output_tokens = request.max_output_tokens,
            "sending vision request"
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .with_context(|| format!("openai request failed ({endpoint})"))?;
        let parsed = response_json_or_error("openai", response)?;
        vision_reply_from_payload(&parsed, &self.settings.model)
    }
}

fn vision_reply_from_payload(parsed: &Value, requested_model: &str) -> Result<VisionReply> {
    let text = extract_openai_output_text(parsed);
    if text.trim().is_empty() {
        bail!("openai returned an empty reply");
    }
    let (input_tokens, output_tokens) = extract_token_usage_pair(parsed);
    let model = parsed
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(requested_model)
        .to_string();
    Ok(VisionReply {
        text,
        model,
        input_tokens,
        output_tokens,
    })
}

fn responses_payload(model: &str, request: &VisionRequest) -> Value {
    json!({
        "model": model,
        "input": [{
            "role": "user",
            "content": [
                {"type": "input_text", "text": request.instruction},
                {"type": "input_image", "image_url": request.image_data_url},
            ],
        }],
        "max_output_tokens": request.max_output_tokens,
    })
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    decode_response_body(provider, status, &body)
}

fn decode_response_body(provider: &str, status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        bail!(
            "{provider} request failed ({}): {}",
            status.as_u16(),
            truncate_text(body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn extract_openai_output_text(response: &Value) -> String {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return text.trim().to_string();
        }
    }

    let mut parts: Vec<String> = Vec::new();
    let rows = response
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for row in rows {
        let Some(obj) = row.as_object() else {
            continue;
        };
        match obj.get("type").and_then(Value::as_str) {
            Some("output_text" | "text") => {
                push_text(&mut parts, obj);
                continue;
            }
            Some("message") | None => {}
            Some(_) => continue,
        }
        let content = obj
            .get("content")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for chunk in content {
            let Some(chunk_obj) = chunk.as_object() else {
                continue;
            };
            let kind = chunk_obj
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if matches!(kind, "output_text" | "text") {
                push_text(&mut parts, chunk_obj);
            }
        }
    }

    parts.join("\n").trim().to_string()
}

fn push_text(parts: &mut Vec<String>, obj: &Map<String, Value>) {
    if let Some(text) = obj.get("text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            parts.push(text.trim().to_string());
        }
    }
}

fn extract_token_usage_pair(payload: &Value) -> (Option<i64>, Option<i64>) {
    let Some(usage) = payload.get("usage").and_then(Value::as_object) else {
        return (None, None);
    };
    (
        read_usage_value(usage, &["input_tokens", "prompt_tokens"]),
        read_usage_value(usage, &["output_tokens", "completion_tokens"]),
    )
}

fn read_usage_value(object: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| value.as_i64().filter(|count| *count >= 0))
}
