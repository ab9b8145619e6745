use bytes::Bytes;

/// Raw response handed back to callers and stored in the cache.
///
/// Cheap to clone — the body is reference-counted — which is what lets one
/// settled operation fan out to every coalesced waiter and into the cache
/// without copying tile payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code of the final attempt.
    pub status: u16,
    /// `Content-Type` header value, when the server sent one.
    pub content_type: Option<String>,
    /// Response body, verbatim.
    pub body: Bytes,
}

impl HttpResponse {
    /// Decodes the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|err| crate::ExecError::Body(format!("invalid JSON response: {err}")))
    }

    /// Decodes the body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
