use bytes::Bytes;
use reqwest::Method;

use crate::{ExecError, Result};

/// How the caller intends to consume the response body.
///
/// Drives the `Accept` header and participates in request identity: the same
/// URL fetched as JSON metadata and as raw tile bytes are distinct requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    Json,
    Bytes,
    Text,
}

impl ResponseType {
    pub(crate) fn accept_header(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Bytes => "*/*",
            Self::Text => "text/plain",
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Bytes => "bytes",
            Self::Text => "text",
        }
    }
}

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// No payload.
    None,
    /// JSON payload, serialized with canonical key order.
    Json(serde_json::Value),
    /// Opaque binary payload, sent verbatim.
    Raw(Bytes),
}

impl RequestBody {
    pub(crate) fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Json(_) => Some("application/json"),
            Self::Raw(_) => Some("application/octet-stream"),
        }
    }
}

/// Immutable description of one outgoing request.
///
/// Two descriptors are the same logical request iff their fingerprints match;
/// construction order of JSON keys does not matter because bodies are
/// serialized through [`serde_json::Value`], which keeps keys sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    pub response_type: ResponseType,
}

impl RequestDescriptor {
    /// Builds a GET descriptor with no payload.
    pub fn get(url: impl Into<String>, response_type: ResponseType) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: RequestBody::None,
            response_type,
        }
    }

    /// Builds a POST descriptor with a JSON payload.
    pub fn post_json(
        url: impl Into<String>,
        body: serde_json::Value,
        response_type: ResponseType,
    ) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Json(body),
            response_type,
        }
    }

    /// Builds a POST descriptor with an opaque binary payload.
    pub fn post_bytes(
        url: impl Into<String>,
        body: impl Into<Bytes>,
        response_type: ResponseType,
    ) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Raw(body.into()),
            response_type,
        }
    }

    /// Serializes the body to the exact bytes put on the wire.
    ///
    /// The result is computed once per execution and reused for every retry
    /// attempt and for fingerprinting, so retried attempts are byte-identical
    /// to the first one. A JSON `null` body and an empty binary body collapse
    /// to `None` — they all mean "no payload" to the server.
    pub(crate) fn encode_body(&self) -> Result<Option<Bytes>> {
        match &self.body {
            RequestBody::None => Ok(None),
            RequestBody::Json(serde_json::Value::Null) => Ok(None),
            RequestBody::Json(value) => {
                let encoded = serde_json::to_vec(value)
                    .map_err(|err| ExecError::Body(format!("invalid JSON payload: {err}")))?;
                Ok(Some(Bytes::from(encoded)))
            }
            RequestBody::Raw(bytes) if bytes.is_empty() => Ok(None),
            RequestBody::Raw(bytes) => Ok(Some(bytes.clone())),
        }
    }
}
