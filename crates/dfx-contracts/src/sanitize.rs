//! Isolates the JSON object from a model reply.
//!
//! Models are told to answer with a bare JSON object but often wrap it in
//! prose or a markdown fence. [`extract_json_object`] keeps everything from
//! the first `{` to the last `}`, drops the literal token `json` and trims.
//!
//! This is a heuristic, not a parser. It does not balance braces between the
//! outermost pair, so a stray brace in surrounding prose or the word `json`
//! inside a string value will corrupt the result. Callers only depend on
//! this one function, so a stricter scanner can replace it in place.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("no valid JSON object found in response")]
    NoJsonObject,
}

pub fn extract_json_object(text: &str) -> Result<String, SanitizeError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(SanitizeError::NoJsonObject);
    };
    if end < start {
        return Err(SanitizeError::NoJsonObject);
    }
    let candidate = text[start..=end].replace("json", "");
    Ok(candidate.trim().to_string())
}
