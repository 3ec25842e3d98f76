//! Analytics Backend API Adapter
//!
//! HTTP client for the remote analytics backend that performs pattern
//! detection, bias scoring and target / stop-loss computation.
//!
//! Sub-modules:
//! - `backend`: Port implementations (status checks, analysis, feeds)
//! - `client`: HTTP client with concurrency limiting and retries
//! - `types`: API request/response type definitions

pub mod backend;
pub mod client;
pub mod types;

pub use backend::BackendAdapter;
pub use client::{BackendClient, BackendClientConfig};
