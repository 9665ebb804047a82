use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remove a Markdown code fence (```` ```json ```` or bare ```` ``` ````)
/// around a response.
pub fn strip_code_fence(response: &str) -> &str {
    let mut s = response.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.trim();
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim();
    }
    s
}

/// Parse an extraction response into a JSON object.
pub fn parse_response(response: &str) -> Result<Map<String, Value>, ResponseError> {
    let body = strip_code_fence(response);
    if !body.starts_with('{') {
        return Err(ResponseError::NotAnObject);
    }
    match serde_json::from_str(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(ResponseError::NotAnObject),
    }
}
