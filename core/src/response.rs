//! Request execution and response classification.
//!
//! # Design
//! `Dispatcher::execute` runs one request through the transport and sorts the
//! outcome into transport failure, status failure or success. The `fetch_*`
//! helpers add a second stage that checks the content type and deserializes
//! the body into the expected shape; failures there are always
//! `ApiError::Validation`, never a transport or status error.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::ClientOptions;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::logger::Logger;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Treat 404 as a successful "absent" outcome.
    pub allow_not_found: bool,
}

/// Executes requests through the injected transport and classifies the result.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    logger: Option<Arc<dyn Logger>>,
}

impl Dispatcher {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            transport: options.transport,
            logger: options.logger,
        }
    }

    pub(crate) fn log(&self, line: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            logger.debug(&line());
        }
    }

    /// Send `request`; `label` and `realm` only shape error messages.
    pub async fn execute(
        &self,
        request: HttpRequest,
        label: &str,
        realm: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse, ApiError> {
        let method = request.method;
        let url = request.url.clone();
        self.log(|| format!("API => {method}: {url}"));

        let response = self.transport.send(request).await.map_err(|err| ApiError::Fetch {
            message: format!("Unable to {label} in realm {realm}: {err}"),
        })?;
        self.log(|| match response.content_type() {
            Some(content_type) => format!(
                "API <= {method}: {}: {} {content_type}",
                response.url, response.status
            ),
            None => format!("API <= {method}: {}: {}", response.url, response.status),
        });

        if !response.is_success() {
            if options.allow_not_found && response.status == 404 {
                return Ok(response);
            }
            return Err(ApiError::HttpStatus {
                message: format!("Unable to {label} in realm {realm}"),
                status: response.status,
                url: response.url,
            });
        }
        Ok(response)
    }

    /// Execute and parse a JSON body of shape `T`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        label: &str,
        realm: &str,
    ) -> Result<T, ApiError> {
        let response = self.execute(request, label, realm, RequestOptions::default()).await?;
        parse_json(&response, label, realm)
    }

    /// Like `fetch_json`, but a 404 yields `Ok(None)`.
    pub async fn fetch_optional_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        label: &str,
        realm: &str,
    ) -> Result<Option<T>, ApiError> {
        let options = RequestOptions {
            allow_not_found: true,
        };
        let response = self.execute(request, label, realm, options).await?;
        if response.status == 404 {
            return Ok(None);
        }
        parse_json(&response, label, realm).map(Some)
    }

    /// Execute a request whose successful response must have no body.
    pub async fn fetch_void(
        &self,
        request: HttpRequest,
        label: &str,
        realm: &str,
    ) -> Result<(), ApiError> {
        let response = self.execute(request, label, realm, RequestOptions::default()).await?;
        expect_empty(&response, label, realm)
    }
}

pub fn is_json_response(response: &HttpResponse) -> bool {
    response
        .content_type()
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("application/json"))
}

/// Check the content type, parse the body and validate it against `T`.
pub fn parse_json<T: DeserializeOwned>(
    response: &HttpResponse,
    label: &str,
    realm: &str,
) -> Result<T, ApiError> {
    if !is_json_response(response) {
        return Err(ApiError::Validation {
            message: format!(
                "Unable to {label} in realm {realm}: invalid response content type: {}",
                response.content_type().unwrap_or("none")
            ),
        });
    }
    let body = std::str::from_utf8(&response.body).map_err(|e| ApiError::Validation {
        message: format!("Unable to {label} in realm {realm}: invalid response body: {e}"),
    })?;
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ApiError::Validation {
            message: format!("Unable to {label} in realm {realm}: invalid JSON: {e}"),
        })?;
    serde_json::from_value(value).map_err(|e| ApiError::Validation {
        message: format!("Unable to {label} in realm {realm}: unexpected response shape: {e}"),
    })
}

/// A successful void response must not carry a content type.
pub fn expect_empty(response: &HttpResponse, label: &str, realm: &str) -> Result<(), ApiError> {
    match response.content_type() {
        None => Ok(()),
        Some(content_type) => Err(ApiError::Validation {
            message: format!(
                "Unable to {label} in realm {realm}: unexpected response content type: {content_type}"
            ),
        }),
    }
}
