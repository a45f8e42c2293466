use serde::{Deserialize, Serialize};

/// `POST /generation/news` request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewsGenerationRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewsGenerationResponse {
    pub title: String,
    pub content: String,
}

/// `POST /generation/dialogue` request. The same body is used by the
/// streaming endpoint `/generation/dialogue/stream`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DialogueRequest {
    pub dialogue: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DialogueAnswer {
    pub answer: String,
}

/// Whether an edit should expand or condense the news text. The backend
/// matches on the literal Russian strings, so serialization must preserve
/// them exactly.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    #[serde(rename = "Длиннее")]
    Longer,
    #[serde(rename = "короче")]
    Shorter,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewsEditRequest {
    pub news_text: String,
    pub user_request: String,
    pub action: EditAction,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EditedNews {
    pub content: String,
}

/// Failure bodies carry the human-readable message under `detail` (FastAPI
/// convention) or `message`. Both are optional; `detail` wins.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Best-effort extraction of a failure message from a raw body. Returns
/// `None` for anything that is not JSON with one of the recognized keys;
/// malformed JSON, an empty body, and a plain-text body all look the same
/// to the caller.
pub fn extract_error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.detail.or(parsed.message).filter(|m| !m.is_empty())
}
