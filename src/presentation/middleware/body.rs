//! Body Parsing Middleware
//!
//! Decodes JSON and URL-encoded request bodies into a [`ParsedBody`] request
//! extension. The raw bytes are put back on the request so handlers may still
//! use axum's own body extractors.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::shared::error::AppError;

/// Payload decoded by the body parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Form(Map<String, Value>),
}

impl ParsedBody {
    /// View the payload as a JSON value; forms become an object of strings.
    pub fn to_value(&self) -> Value {
        match self {
            ParsedBody::Json(value) => value.clone(),
            ParsedBody::Form(map) => Value::Object(map.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        Some(BodyKind::Json)
    } else if essence == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else {
        None
    }
}

/// Decode `key=value` pairs. Repeated keys collect into an array.
fn parse_form(bytes: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            None => {
                map.insert(key.into_owned(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    map
}

fn decode(kind: BodyKind, bytes: &Bytes) -> Result<ParsedBody, AppError> {
    match kind {
        BodyKind::Json => serde_json::from_slice(bytes)
            .map(ParsedBody::Json)
            .map_err(|e| AppError::BadRequest(format!("Malformed JSON body: {}", e))),
        BodyKind::Form => Ok(ParsedBody::Form(parse_form(bytes))),
    }
}

/// Whether a body read failed because it ran past the limit.
fn exceeded_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

/// Body parsing middleware. The state is the byte limit.
pub async fn parse_body(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let Some(kind) = body_kind(request.headers()) else {
        return next.run(request).await;
    };

    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) if exceeded_limit(&e) => {
            tracing::debug!(error = %e, limit, "Request body over limit");
            return AppError::PayloadTooLarge { limit }.into_response();
        }
        Err(e) => {
            tracing::debug!(error = %e, "Request body could not be read");
            return AppError::BadRequest("Failed to read request body".into()).into_response();
        }
    };

    if !bytes.is_empty() {
        match decode(kind, &bytes) {
            Ok(parsed) => {
                parts.extensions.insert(parsed);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

impl<S> FromRequestParts<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ParsedBody>()
            .cloned()
            .ok_or_else(|| AppError::BadRequest("Expected a JSON or form-encoded body".into()))
    }
}
