//! In-crate test doubles for the transport and logger seams.

use std::collections::VecDeque;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::logger::Logger;

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: HttpResponse) {
        self.replies.lock().push_back(Ok(response));
    }

    pub(crate) fn push_error(&self, message: &str) {
        self.replies.lock().push_back(Err(TransportError::new(message)));
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no scripted response left")));
        reply.map(|mut response| {
            response.url = url;
            response
        })
    }
}

#[derive(Default)]
pub(crate) struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

pub(crate) fn response(status: u16, content_type: Option<&str>, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        url: String::new(),
        headers: content_type
            .map(|ct| vec![("content-type".to_string(), ct.to_string())])
            .unwrap_or_default(),
        body: body.as_bytes().to_vec(),
    }
}

/// Response with an arbitrary (possibly non-UTF-8) body.
pub(crate) fn raw_response(status: u16, content_type: &str, body: &[u8]) -> HttpResponse {
    HttpResponse {
        body: body.to_vec(),
        ..response(status, Some(content_type), "")
    }
}

pub(crate) fn json_response(status: u16, body: &str) -> HttpResponse {
    response(status, Some("application/json"), body)
}

/// Unsigned JWT with the given claims object.
pub(crate) fn jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

pub(crate) fn token_body(access_token: &str) -> String {
    serde_json::json!({
        "access_token": access_token,
        "expires_in": 60,
        "refresh_expires_in": 1800,
        "refresh_token": "refresh",
        "token_type": "Bearer",
        "not-before-policy": 0,
        "scope": "profile email"
    })
    .to_string()
}
