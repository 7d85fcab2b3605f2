//! # remix
//!
//! Compose request handling from small stages that declare what they need.
//!
//! ```rust,ignore
//! use remix::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), remix::BoxError> {
//!     remix::observe::init_stdout_tracing();
//!
//!     let user = Computation::from_fn(|view: &MergedView| {
//!         Ok(json!({ "name": view.str("name").unwrap_or("stranger") }))
//!     });
//!
//!     let pipeline = Pipeline::new("hello")
//!         .add_stage(compute("user", user.clone()))
//!         .add_stage(
//!             respond(Computation::from_fn(|view: &MergedView| {
//!                 Ok(ResponseDescriptor::text(format!(
//!                     "Hello, {}!",
//!                     view.path("user.name").and_then(|v| v.as_str()).unwrap_or_default()
//!                 )))
//!             }))
//!             .with_dependencies(DependencySpec::depends_on([user.id()])),
//!         );
//!
//!     remix::serve(HttpConfig::default(), pipeline).await
//! }
//! ```

pub mod observe;

pub use remix_core::{
    computation, context, deps, error, metadata, pipeline, registry, response, stage, stages,
    telemetry, view,
};
pub use remix_core::{
    Computation, Dependencies, DependencySpec, ExecutionRegistry, Fields, MergedView, Pipeline,
    PipelineError, Rejection, RequestContext, ResponseDescriptor, Stage, StageId, StageKind,
    StageMetadata, StepResult,
};
pub use remix_http::{
    BoxError, HttpConfig, PathParams, PipelineService, RequestProperties, error_response, serve,
    serve_listener,
};

pub mod prelude {
    pub use remix_core::prelude::*;
    pub use remix_http::{HttpConfig, PathParams, PipelineService, RequestProperties};

    pub use http::{Method, Request, Response, StatusCode};
}
