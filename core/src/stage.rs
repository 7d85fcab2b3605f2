use crate::context::RequestContext;
use crate::error::PipelineError;
use crate::metadata::StageMetadata;
use async_trait::async_trait;

/// How a stage hands control back to the pipeline.
#[derive(Debug)]
pub enum StepResult {
    /// Advance to the next stage.
    Next,
    /// A response was written; stop here.
    Terminate,
    /// Stop and hand the error to the host.
    Error(PipelineError),
}

impl StepResult {
    pub fn is_error(&self) -> bool {
        matches!(self, StepResult::Error(_))
    }
}

impl From<Result<(), PipelineError>> for StepResult {
    fn from(result: Result<(), PipelineError>) -> Self {
        match result {
            Ok(()) => StepResult::Next,
            Err(e) => StepResult::Error(e),
        }
    }
}

/// A unit of request processing.
#[async_trait]
pub trait Stage: Send + Sync {
    fn metadata(&self) -> StageMetadata;
    async fn execute(&self, ctx: &mut RequestContext) -> StepResult;
}
