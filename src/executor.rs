use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use reqwest::header;

use crate::{
    cache::CacheStore,
    descriptor::RequestDescriptor,
    fingerprint::{auth_bucket, fingerprint},
    inflight::{InFlightRegistry, OperationFuture},
    retry::RetryPolicy,
    AuthTokenStore, ExecError, ExecutorOptions, HttpResponse, ReqConfig, Result,
};

/// The single entry point every outgoing call goes through.
///
/// Orchestration order per call: encode body → fingerprint (including the
/// auth bucket) → cache lookup → join-or-register in the in-flight registry
/// → retry-governed transport attempts → cache write on success → registry
/// eviction → settle every waiter.
///
/// Cloning is cheap; clones share the cache, the registry, and the token
/// store, so one executor per process is the expected shape.
#[derive(Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    cache: Arc<CacheStore>,
    inflight: Arc<InFlightRegistry>,
    auth: AuthTokenStore,
    options: ExecutorOptions,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("auth", &self.auth)
            .field("options", &self.options)
            .finish()
    }
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new(AuthTokenStore::new())
    }
}

impl RequestExecutor {
    /// Creates an executor around an injected token store.
    pub fn new(auth: AuthTokenStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: Arc::new(CacheStore::new()),
            inflight: Arc::new(InFlightRegistry::new()),
            auth,
            options: ExecutorOptions::default(),
        }
    }

    /// Applies executor options such as timeout and retry defaults.
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// The token store this executor reads its auth state from.
    pub fn auth(&self) -> &AuthTokenStore {
        &self.auth
    }

    /// Executes one request with caching, coalescing, and retry.
    ///
    /// A fresh cache hit returns immediately without touching the registry
    /// or the network. Otherwise the call either joins an identical
    /// in-flight operation or registers a new one; all callers of one
    /// operation observe the same result or the same error. Once started,
    /// an operation runs to settlement — waiters cannot abandon it.
    pub async fn execute(
        &self,
        descriptor: RequestDescriptor,
        config: ReqConfig,
    ) -> Result<HttpResponse> {
        let body = descriptor.encode_body()?;
        let token = self.auth.current();
        let bucket = auth_bucket(token.as_deref());
        let fingerprint = fingerprint(&descriptor, body.as_deref(), &bucket);

        if let Some(cache_config) = &config.cache {
            if let Some(hit) = self.cache.get(&fingerprint, &cache_config.targets) {
                #[cfg(feature = "tracing")]
                tracing::debug!(%fingerprint, "cache hit");
                return Ok(hit);
            }
        }

        // Check-then-register happens under one registry lock with no await
        // in between; two callers issued back to back deterministically
        // agree on which of them runs the network operation.
        let (operation, joined) = self.inflight.join_or_register(&fingerprint, || {
            self.make_operation(fingerprint.clone(), descriptor, body, token, config)
        });

        #[cfg(feature = "tracing")]
        if joined {
            tracing::debug!(%fingerprint, "joined in-flight operation");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = joined;

        operation.await
    }

    /// Clears every cache target, process-wide.
    ///
    /// In-flight operations are left to settle naturally rather than being
    /// aborted; whatever they write afterwards lands in the emptied cache.
    pub fn invalidate_caches(&self) {
        self.cache.invalidate_all();
    }

    fn make_operation(
        &self,
        fingerprint: String,
        descriptor: RequestDescriptor,
        body: Option<Bytes>,
        token: Option<String>,
        config: ReqConfig,
    ) -> OperationFuture {
        let http = self.http.clone();
        let cache = Arc::clone(&self.cache);
        let inflight = Arc::clone(&self.inflight);
        let policy = RetryPolicy::resolve(
            config.retries,
            self.options.default_retries,
            Duration::from_millis(self.options.retry_delay_ms),
        );
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let cache_config = config.cache;

        async move {
            // Every attempt gets the same encoded body bytes, so retried
            // requests are byte-identical to the first one.
            let result = policy
                .run(|| {
                    send_once(
                        http.clone(),
                        descriptor.clone(),
                        body.clone(),
                        token.clone(),
                        timeout,
                    )
                })
                .await;

            if let (Ok(response), Some(cache_config)) = (&result, &cache_config) {
                cache.put(
                    &fingerprint,
                    response.clone(),
                    cache_config.expires_in,
                    &cache_config.targets,
                );
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(%fingerprint, ok = result.is_ok(), "operation settled");

            // Evict before yielding the output: a call arriving after
            // settlement must start a fresh sequence, never observe this one.
            inflight.remove(&fingerprint);
            result
        }
        .boxed()
        .shared()
    }
}

async fn send_once(
    http: reqwest::Client,
    descriptor: RequestDescriptor,
    body: Option<Bytes>,
    token: Option<String>,
    timeout: Duration,
) -> Result<HttpResponse> {
    let mut request = http
        .request(descriptor.method.clone(), &descriptor.url)
        .header(header::ACCEPT, descriptor.response_type.accept_header())
        .timeout(timeout);

    if let Some(token) = &token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(body) = body {
        if let Some(content_type) = descriptor.body.content_type() {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        request = request.body(body);
    }

    let response = request.send().await.map_err(ExecError::transport)?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let bytes = response.bytes().await.map_err(ExecError::transport)?;

    if !status.is_success() {
        return Err(ExecError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    Ok(HttpResponse {
        status: status.as_u16(),
        content_type,
        body: bytes,
    })
}
