//! # Telemetry: Observability Decorators
//!
//! [`Traced`] wraps a stage in a tracing span and logs how it handed control
//! back. [`Pipeline::add_stage`](crate::pipeline::Pipeline::add_stage) applies
//! it to every stage.

use crate::context::RequestContext;
use crate::metadata::StageMetadata;
use crate::stage::{Stage, StepResult};
use async_trait::async_trait;
use tracing::{Instrument, info_span};

pub struct Traced<S> {
    inner: S,
    meta: StageMetadata,
}

impl<S: Stage> Traced<S> {
    pub fn new(inner: S) -> Self {
        let meta = inner.metadata();
        Self { inner, meta }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Stage> Stage for Traced<S> {
    fn metadata(&self) -> StageMetadata {
        self.meta.clone()
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        let span = info_span!(
            "Stage",
            remix.stage = %self.meta.label,
            remix.kind = ?self.meta.kind
        );

        async move {
            tracing::debug!(url = %ctx.url(), "Entering stage");
            let start = std::time::Instant::now();

            let result = self.inner.execute(ctx).await;

            let duration = start.elapsed();
            match &result {
                StepResult::Next => {
                    tracing::debug!(?duration, "Stage completed: Next");
                }
                StepResult::Terminate => {
                    tracing::info!(
                        ?duration,
                        status = ctx.response.status().as_u16(),
                        "Stage completed: Terminate"
                    );
                }
                StepResult::Error(e) if e.is_client_error() => {
                    tracing::warn!(error = %e, status = e.status(), ?duration, "Stage rejected request");
                }
                StepResult::Error(e) => {
                    tracing::error!(error = %e, status = e.status(), ?duration, "Stage failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}
