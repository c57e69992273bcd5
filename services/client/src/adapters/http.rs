//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the remote NutriAI service.
//! It implements both the `AuthService` and `ChatService` ports from the
//! `core` crate using `reqwest`, translating HTTP status codes and transport
//! failures into `PortError`s.

use async_trait::async_trait;
use nutri_chat_core::domain::{RemoteProfile, ThreadId};
use nutri_chat_core::image::ImageData;
use nutri_chat_core::ports::{AuthService, ChatService, PortError, PortResult};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const LOGIN_PATH: &str = "api/auth/login";
const SIGNUP_PATH: &str = "api/auth/signup";
const CHAT_MESSAGE_PATH: &str = "api/chat/message";

//=========================================================================================
// Wire Payloads
//=========================================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    thread_id: ThreadId,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a ImageData>,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the remote ports over JSON/HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` rooted at `base_url`.
    pub fn new(mut base_url: Url, timeout: Duration) -> PortResult<Self> {
        // Endpoint paths are joined relative to the base, which needs a trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> PortResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> PortResult<Response> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)
    }
}

/// Maps a failed `send()` onto the port error taxonomy.
fn transport_error(err: reqwest::Error) -> PortError {
    if err.is_builder() {
        PortError::Unexpected(err.to_string())
    } else {
        warn!("Remote service unreachable: {}", err);
        PortError::Unavailable(err.to_string())
    }
}

async fn read_profile(response: Response) -> PortResult<RemoteProfile> {
    response
        .json::<RemoteProfile>()
        .await
        .map_err(|e| PortError::InvalidResponse(e.to_string()))
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl AuthService for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> PortResult<RemoteProfile> {
        let response = self
            .post_json(LOGIN_PATH, &LoginRequest { email, password })
            .await?;

        match response.status() {
            status if status.is_success() => read_profile(response).await,
            StatusCode::UNAUTHORIZED => Err(PortError::Unauthorized),
            status => Err(PortError::Status(status.as_u16())),
        }
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> PortResult<RemoteProfile> {
        let response = self
            .post_json(SIGNUP_PATH, &SignupRequest { name, email, password })
            .await?;

        match response.status() {
            status if status.is_success() => read_profile(response).await,
            StatusCode::CONFLICT => Err(PortError::Conflict(email.to_string())),
            status => Err(PortError::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl ChatService for HttpBackend {
    async fn send_message(
        &self,
        thread_id: ThreadId,
        content: &str,
        image: Option<&ImageData>,
    ) -> PortResult<String> {
        let request = ChatRequest {
            thread_id,
            content,
            image,
        };
        let response = self.post_json(CHAT_MESSAGE_PATH, &request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Status(status.as_u16()));
        }

        let reply = response
            .json::<ChatReply>()
            .await
            .map_err(|e| PortError::InvalidResponse(e.to_string()))?;
        Ok(reply.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn base_url_gains_trailing_slash() {
        let backend = HttpBackend::new(
            Url::parse("https://nutri.example.com/v2").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            backend.endpoint(LOGIN_PATH).unwrap().as_str(),
            "https://nutri.example.com/v2/api/auth/login"
        );
    }

    #[test]
    fn chat_request_uses_camel_case_and_omits_missing_image() {
        let thread_id = Uuid::nil();
        let body = serde_json::to_value(ChatRequest {
            thread_id,
            content: "Is this high in sugar?",
            image: None,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "threadId": "00000000-0000-0000-0000-000000000000",
                "content": "Is this high in sugar?"
            })
        );
    }
}
