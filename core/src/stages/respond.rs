use crate::computation::Computation;
use crate::context::RequestContext;
use crate::deps::{Dependencies, validate_dependencies};
use crate::error::PipelineError;
use crate::metadata::{StageKind, StageMetadata};
use crate::response::ResponseDescriptor;
use crate::stage::{Stage, StepResult};
use crate::view::MergedView;
use async_trait::async_trait;

const RESPOND_STAGE: &str = "respond";
const RESPOND_IF_STAGE: &str = "respond_if";

/// Terminal stage: computes a response descriptor and writes it.
#[derive(Debug, Clone)]
pub struct Respond {
    computation: Computation<ResponseDescriptor>,
    deps: Dependencies,
}

impl Respond {
    pub fn new(computation: Computation<ResponseDescriptor>) -> Self {
        Self {
            computation,
            deps: Dependencies::None,
        }
    }

    pub fn with_dependencies(mut self, deps: impl Into<Dependencies>) -> Self {
        self.deps = deps.into();
        self
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        ctx.ensure_scratch();
        let url = ctx.url().to_string();
        let method = ctx.method().to_string();

        let view = MergedView::from_context(ctx);
        validate_dependencies(RESPOND_STAGE, &view, &self.deps, &url, &method)?;

        let descriptor = self
            .computation
            .call(view)
            .await
            .map_err(|e| PipelineError::computation(RESPOND_STAGE, &url, &method, e))?;

        write_response(RESPOND_STAGE, ctx, &descriptor)
    }
}

#[async_trait]
impl Stage for Respond {
    fn metadata(&self) -> StageMetadata {
        StageMetadata::new(RESPOND_STAGE, StageKind::Respond)
            .with_id(self.computation.id())
            .with_dependencies(&self.deps)
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        match self.run(ctx).await {
            Ok(()) => StepResult::Terminate,
            Err(e) => StepResult::Error(e),
        }
    }
}

/// Responds only when the computation returns a descriptor; otherwise the
/// pipeline moves on. No dependency validation.
#[derive(Debug, Clone)]
pub struct RespondIf {
    computation: Computation<Option<ResponseDescriptor>>,
}

impl RespondIf {
    pub fn new(computation: Computation<Option<ResponseDescriptor>>) -> Self {
        Self { computation }
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<bool, PipelineError> {
        let url = ctx.url().to_string();
        let method = ctx.method().to_string();

        let response = self
            .computation
            .call(MergedView::from_context(ctx))
            .await
            .map_err(|e| PipelineError::computation(RESPOND_IF_STAGE, &url, &method, e))?;

        match response {
            Some(descriptor) => write_response(RESPOND_IF_STAGE, ctx, &descriptor).map(|()| true),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Stage for RespondIf {
    fn metadata(&self) -> StageMetadata {
        StageMetadata::new(RESPOND_IF_STAGE, StageKind::RespondIf).with_id(self.computation.id())
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        match self.run(ctx).await {
            Ok(true) => StepResult::Terminate,
            Ok(false) => StepResult::Next,
            Err(e) => StepResult::Error(e),
        }
    }
}

fn write_response(
    stage: &str,
    ctx: &mut RequestContext,
    descriptor: &ResponseDescriptor,
) -> Result<(), PipelineError> {
    ctx.response
        .write(descriptor)
        .map_err(|e| PipelineError::InvalidOutput {
            stage: stage.to_string(),
            url: ctx.url().to_string(),
            method: ctx.method().to_string(),
            reason: e.to_string(),
        })
}
