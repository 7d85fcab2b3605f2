//! # remix-core
//!
//! Dependency-aware composition of request-processing stages.
//!
//! Stages declare which request fields they `require` and which computations
//! they `depend_on`; each stage sees a merged view of the request and every
//! earlier result, and unmet declarations become typed [`PipelineError`]s
//! instead of silently missing data.
//!
//! ```rust,ignore
//! use remix_core::prelude::*;
//! use serde_json::json;
//!
//! let load_user = Computation::from_fn(|view: &MergedView| {
//!     Ok(json!({ "id": view.get("userId").cloned() }))
//! });
//!
//! let pipeline = Pipeline::new("profile")
//!     .add_stage(compute("user", load_user.clone()).with_dependencies(["userId"]))
//!     .add_stage(respond(Computation::from_fn(|view: &MergedView| {
//!         Ok(ResponseDescriptor::new(view.get("user").cloned().unwrap_or_default()))
//!     }))
//!     .with_dependencies(DependencySpec::depends_on([load_user.id()])));
//! ```

pub mod computation;
pub mod context;
pub mod deps;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod registry;
pub mod response;
pub mod stage;
pub mod stages;
pub mod telemetry;
pub mod view;

pub use computation::{BoxFuture, Computation};
pub use context::{Fields, RequestContext, Scratch, UNNAMED_STAGE};
pub use deps::{Dependencies, DependencySpec, validate_dependencies};
pub use error::{PipelineError, Rejection};
pub use metadata::{StageKind, StageMetadata};
pub use pipeline::Pipeline;
pub use registry::{ExecutionRegistry, StageId};
pub use response::{ResponseDescriptor, ResponseWriter};
pub use stage::{Stage, StepResult};
pub use view::MergedView;

pub mod prelude {
    pub use crate::computation::Computation;
    pub use crate::context::{Fields, RequestContext};
    pub use crate::deps::{Dependencies, DependencySpec};
    pub use crate::error::{PipelineError, Rejection};
    pub use crate::pipeline::Pipeline;
    pub use crate::response::ResponseDescriptor;
    pub use crate::stage::{Stage, StepResult};
    pub use crate::stages::{
        compute, compute_anonymous, import, promote, respond, respond_if, validate, validate_fn,
    };
    pub use crate::view::MergedView;
}
