//! Authenticated request construction.
//!
//! Every request carries `Authorization: Bearer <token>`. Requests with a
//! payload also carry `Content-Type: application/json` and a `Content-Length`
//! equal to the serialized body's byte length.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};

/// Build a body-less authenticated request.
pub fn build_request(method: HttpMethod, url: String, token: &str) -> HttpRequest {
    HttpRequest {
        method,
        url,
        headers: vec![("authorization".to_string(), format!("Bearer {token}"))],
        body: None,
    }
}

/// Build an authenticated request with a JSON body.
pub fn build_json_request<T: Serialize + ?Sized>(
    method: HttpMethod,
    url: String,
    token: &str,
    payload: &T,
) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization {
        message: format!("Unable to serialize request body: {e}"),
    })?;
    let mut request = build_request(method, url, token);
    request
        .headers
        .push(("content-type".to_string(), "application/json".to_string()));
    request
        .headers
        .push(("content-length".to_string(), body.len().to_string()));
    request.body = Some(body);
    Ok(request)
}

/// Encode a query struct as `k=v&...`. Absent fields are skipped; numbers and
/// booleans are stringified.
pub fn encode_query<T: Serialize>(query: &T) -> Result<String, ApiError> {
    let value = serde_json::to_value(query).map_err(|e| ApiError::Serialization {
        message: format!("Unable to serialize query: {e}"),
    })?;
    let Value::Object(fields) = value else {
        return Err(ApiError::Serialization {
            message: "query must serialize to an object".to_string(),
        });
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::String(s) => {
                serializer.append_pair(&key, &s);
            }
            other => {
                serializer.append_pair(&key, &other.to_string());
            }
        }
    }
    Ok(serializer.finish())
}

/// Append an encoded query to `url`, leaving it untouched when empty.
pub fn with_query(url: String, query: &str) -> String {
    if query.is_empty() {
        url
    } else {
        format!("{url}?{query}")
    }
}

/// Percent-encode a caller-supplied path segment (ids, role names).
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
