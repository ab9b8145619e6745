//! `sathub-http` is the request execution core of a satellite-imagery API
//! client: every call (GetMap, tile search, date discovery, layer metadata)
//! goes through one [`RequestExecutor::execute`] entry point that caches
//! successful responses, coalesces concurrent identical requests into a
//! single network operation, and retries transient failures — for arbitrary
//! HTTP methods, JSON or binary payloads, and any response type.
//!
//! The crate also owns the process-wide [`AuthTokenStore`]; changing the
//! token moves subsequent requests into a different fingerprint bucket so
//! results obtained under one auth state are never reused under another.

mod auth;
mod cache;
mod descriptor;
mod error;
mod executor;
mod fingerprint;
mod inflight;
mod options;
mod response;
mod retry;

pub use auth::{AuthTokenStore, DEFAULT_TOKEN_URL};
pub use cache::CacheTarget;
pub use descriptor::{RequestBody, RequestDescriptor, ResponseType};
pub use error::ExecError;
pub use executor::RequestExecutor;
pub use options::{CacheConfig, ExecutorOptions, ReqConfig};
pub use response::HttpResponse;

pub type Result<T> = std::result::Result<T, ExecError>;
