use std::time::Instant;

use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;
use crate::error::CoreResult;
use crate::http_client::HttpClient;
use crate::model::{
    DialogueAnswer, DialogueRequest, EditAction, EditedNews, NewsEditRequest,
    NewsGenerationRequest, NewsGenerationResponse,
};
use crate::stream::{DialogueSession, EventStream};
use crate::telemetry::CallTrace;

pub const NEWS_PATH: &str = "/generation/news";
pub const NEWS_EDIT_PATH: &str = "/generation/news/edit";
pub const DIALOGUE_PATH: &str = "/generation/dialogue";
pub const DIALOGUE_STREAM_PATH: &str = "/generation/dialogue/stream";

/// Client for the portal's generation backend. The bearer token is an
/// explicit constructor parameter; there is no ambient token lookup.
#[derive(Clone)]
pub struct GenerationClient {
    http: HttpClient,
    base: String,
    token: Option<SecretString>,
}

impl GenerationClient {
    pub fn new(http: HttpClient, base: String, token: Option<SecretString>) -> Self {
        Self { http, base, token }
    }

    /// Build from a loaded config, reading the token from the environment
    /// variable the config names (absent variable → unauthenticated client).
    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        let http = HttpClient::from_cfg(&cfg.http)?;
        let token = std::env::var(&cfg.api_token_env)
            .ok()
            .map(SecretString::from);
        Ok(Self::new(http, cfg.base_url.clone(), token))
    }

    #[cfg(test)]
    pub fn new_for_tests(server_base: &str) -> Self {
        Self::new(
            HttpClient::new_default().unwrap(),
            server_base.to_string(),
            Some(SecretString::new("test-token".into())),
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut h = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &self.token {
            h.push((
                "Authorization".to_string(),
                format!("Bearer {}", token.expose_secret()),
            ));
        }
        h
    }

    async fn call<T, R>(&self, path: &'static str, body: &T) -> CoreResult<R>
    where
        T: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base, path);
        let owned_headers = self.headers();
        let hdrs: Vec<(&str, &str)> = owned_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let start = Instant::now();
        match self.http.post_json::<_, R>(&url, body, &hdrs).await {
            Ok((resp, latency_ms)) => {
                crate::telemetry::emit_call(CallTrace {
                    endpoint: path,
                    latency_ms,
                    error_kind: None,
                });
                Ok(resp)
            }
            Err(e) => {
                tracing::warn!(endpoint = path, kind = e.kind(), "generation call failed");
                crate::telemetry::emit_call(CallTrace {
                    endpoint: path,
                    latency_ms: start.elapsed().as_millis() as u32,
                    error_kind: Some(e.kind()),
                });
                Err(e)
            }
        }
    }

    /// Generate a news body from a title.
    pub async fn generate_news(&self, title: &str) -> CoreResult<NewsGenerationResponse> {
        let req = NewsGenerationRequest {
            title: title.to_string(),
        };
        self.call(NEWS_PATH, &req).await
    }

    /// Non-streaming dialogue answer.
    pub async fn generate_dialogue(&self, dialogue: &str) -> CoreResult<DialogueAnswer> {
        let req = DialogueRequest {
            dialogue: dialogue.to_string(),
        };
        self.call(DIALOGUE_PATH, &req).await
    }

    /// Expand or condense an existing news text.
    pub async fn edit_news(
        &self,
        news_text: &str,
        user_request: &str,
        action: EditAction,
    ) -> CoreResult<EditedNews> {
        let req = NewsEditRequest {
            news_text: news_text.to_string(),
            user_request: user_request.to_string(),
            action,
        };
        self.call(NEWS_EDIT_PATH, &req).await
    }

    /// Streaming dialogue answer. The returned stream emits 0..n `Chunk`
    /// events followed by exactly one terminal event. Every failure
    /// (transport, non-success status, missing stream capability, mid-stream
    /// read) resolves to a `Failed` event rather than an `Err`. Dropping
    /// the stream cancels the session.
    pub async fn stream_dialogue(&self, dialogue: &str) -> EventStream {
        let url = format!("{}{}", self.base, DIALOGUE_STREAM_PATH);
        let req = DialogueRequest {
            dialogue: dialogue.to_string(),
        };
        let owned_headers = self.headers();
        let hdrs: Vec<(&str, &str)> = owned_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        match self.http.post_stream(&url, &req, &hdrs).await {
            Ok(body) => Box::pin(DialogueSession::new(DIALOGUE_STREAM_PATH, Some(body))),
            Err(err) => {
                tracing::warn!(
                    endpoint = DIALOGUE_STREAM_PATH,
                    kind = err.kind(),
                    "stream request failed before first chunk"
                );
                Box::pin(DialogueSession::failed(DIALOGUE_STREAM_PATH, err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::FALLBACK_STATUS_MESSAGE;
    use crate::stream::StreamEvent;
    use futures_util::StreamExt;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    #[tokio::test]
    async fn generate_news_200_maps_fields() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/generation/news")
                .header("Authorization", "Bearer test-token")
                .json_body(json!({"title": "Субботник в парке"}));
            then.status(200).json_body(json!({
                "title": "Субботник в парке",
                "content": "Волонтёры привели парк в порядок..."
            }));
        });

        let resp = client.generate_news("Субботник в парке").await.unwrap();
        assert_eq!(resp.title, "Субботник в парке");
        assert!(resp.content.starts_with("Волонтёры"));
        m.assert();
    }

    #[tokio::test]
    async fn generate_dialogue_200_maps_answer() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let _m = server.mock(|when, then| {
            when.method(POST).path("/generation/dialogue");
            then.status(200).json_body(json!({"answer": "Здравствуйте!"}));
        });

        let resp = client
            .generate_dialogue("Пользователь: Привет")
            .await
            .unwrap();
        assert_eq!(resp.answer, "Здравствуйте!");
    }

    #[tokio::test]
    async fn edit_news_sends_action_literal() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let m = server.mock(|when, then| {
            when.method(POST).path("/generation/news/edit").json_body(json!({
                "news_text": "Текст новости",
                "user_request": "добавь деталей",
                "action": "Длиннее"
            }));
            then.status(200).json_body(json!({"content": "Расширенный текст"}));
        });

        let resp = client
            .edit_news("Текст новости", "добавь деталей", EditAction::Longer)
            .await
            .unwrap();
        assert_eq!(resp.content, "Расширенный текст");
        m.assert();
    }

    #[tokio::test]
    async fn generate_news_500_surfaces_detail() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let _m = server.mock(|when, then| {
            when.method(POST).path("/generation/news");
            then.status(500)
                .json_body(json!({"detail": "OpenAI API ключ не настроен."}));
        });

        let err = client.generate_news("x").await.unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API ключ не настроен.");
    }

    #[tokio::test]
    async fn stream_dialogue_happy_path() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/generation/dialogue/stream")
                .json_body(json!({"dialogue": "Пользователь: Привет\nИИ: "}));
            then.status(200).body("Привет!");
        });

        let events: Vec<StreamEvent> = client
            .stream_dialogue("Пользователь: Привет\nИИ: ")
            .await
            .collect()
            .await;

        assert!(!events.is_empty());
        // chunks carry strictly growing prefixes of the final text
        let mut prev_len = 0;
        for ev in &events[..events.len() - 1] {
            match ev {
                StreamEvent::Chunk { text, .. } => {
                    assert!(text.len() > prev_len);
                    assert!("Привет!".starts_with(text.as_str()));
                    prev_len = text.len();
                }
                other => panic!("expected only Chunk before terminal, got {:?}", other),
            }
        }
        match events.last().unwrap() {
            StreamEvent::Complete(t) => assert_eq!(t, "Привет!"),
            other => panic!("expected Complete, got {:?}", other),
        }
        m.assert();
    }

    #[tokio::test]
    async fn stream_dialogue_500_short_circuits() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let _m = server.mock(|when, then| {
            when.method(POST).path("/generation/dialogue/stream");
            then.status(500).json_body(json!({"detail": "quota exceeded"}));
        });

        let events: Vec<StreamEvent> =
            client.stream_dialogue("...").await.collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Failed(msg) => assert_eq!(msg, "quota exceeded"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stream_dialogue_unparsable_failure_body_uses_fallback() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let _m = server.mock(|when, then| {
            when.method(POST).path("/generation/dialogue/stream");
            then.status(503).body("Service Unavailable");
        });

        let events: Vec<StreamEvent> =
            client.stream_dialogue("...").await.collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Failed(msg) => assert_eq!(msg, FALLBACK_STATUS_MESSAGE),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stream_dialogue_network_error_becomes_failed_event() {
        // Likely-closed port: the request never gets a response.
        let client = GenerationClient::new_for_tests("http://127.0.0.1:9");
        let events: Vec<StreamEvent> =
            client.stream_dialogue("...").await.collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Failed(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn concurrent_sessions_are_independent() {
        let server = MockServer::start();
        let client = GenerationClient::new_for_tests(&server.base_url());

        let _m = server.mock(|when, then| {
            when.method(POST).path("/generation/dialogue/stream");
            then.status(200).body("ответ");
        });

        let (a, b) = tokio::join!(
            async {
                let ev: Vec<StreamEvent> =
                    client.stream_dialogue("первый").await.collect().await;
                ev
            },
            async {
                let ev: Vec<StreamEvent> =
                    client.stream_dialogue("второй").await.collect().await;
                ev
            },
        );
        for events in [a, b] {
            match events.last().unwrap() {
                StreamEvent::Complete(t) => assert_eq!(t, "ответ"),
                other => panic!("expected Complete, got {:?}", other),
            }
        }
    }
}
