//! Default `Transport` backed by a blocking ureq agent.
//!
//! ureq is synchronous, so each call runs on tokio's blocking pool. The agent
//! is configured with `http_status_as_error(false)` so 4xx/5xx responses come
//! back as data and the dispatcher does the status interpretation.

use async_trait::async_trait;
use ureq::http;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute(&agent, request))
            .await
            .map_err(|err| TransportError::new(format!("transport task failed: {err}")))?
    }
}

fn execute(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let mut builder = http::Request::builder()
        .method(req.method.as_str())
        .uri(req.url.as_str());
    for (name, value) in &req.headers {
        // ureq frames the body and writes its own content-length.
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    let result = match (req.method, req.body) {
        (HttpMethod::Post | HttpMethod::Put, Some(body)) => {
            let request = builder.body(body).map_err(|e| TransportError::new(e.to_string()))?;
            agent.run(request)
        }
        _ => {
            let request = builder.body(()).map_err(|e| TransportError::new(e.to_string()))?;
            agent.run(request)
        }
    };
    let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| TransportError::new(e.to_string()))?;

    Ok(HttpResponse {
        status,
        url: req.url,
        headers,
        body,
    })
}
