//! # remix-http
//!
//! Hosts a [`remix_core::Pipeline`] on hyper: request decoding into a
//! [`RequestContext`](remix_core::RequestContext), outcome mapping to HTTP
//! responses, and a TCP accept loop.

pub mod config;
pub mod error;
pub mod ingress;
pub mod server;
pub mod service;

pub use config::{ConfigError, HttpConfig};
pub use error::error_response;
pub use ingress::{BoxError, IngressError, PathParams, RequestProperties, into_context};
pub use server::{serve, serve_listener};
pub use service::PipelineService;
