use crate::computation::Computation;
use crate::context::RequestContext;
use crate::error::PipelineError;
use crate::metadata::{StageKind, StageMetadata};
use crate::stage::{Stage, StepResult};
use crate::view::MergedView;
use async_trait::async_trait;

/// Rejects the request when a predicate over the merged view is false.
///
/// The predicate is a [`Computation`], so it may await and may fail; a
/// failure is reported like any other computation error.
#[derive(Debug, Clone)]
pub struct Validate {
    name: String,
    predicate: Computation<bool>,
    message: String,
}

impl Validate {
    pub fn new(name: impl Into<String>, predicate: Computation<bool>) -> Self {
        Self {
            name: name.into(),
            predicate,
            message: String::new(),
        }
    }

    /// Shorthand for a synchronous, infallible predicate.
    pub fn from_fn<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&MergedView) -> bool + Send + Sync + 'static,
    {
        Self::new(
            name,
            Computation::from_fn(move |view: &MergedView| Ok(predicate(view))),
        )
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        ctx.ensure_scratch();
        let url = ctx.url().to_string();
        let method = ctx.method().to_string();
        let view = MergedView::from_context(ctx);

        let passed = self
            .predicate
            .call(view)
            .await
            .map_err(|e| PipelineError::computation(&self.name, &url, &method, e))?;

        if passed {
            Ok(())
        } else {
            Err(PipelineError::ValidationFailed {
                stage: self.name.clone(),
                url,
                method,
                message: self.message.clone(),
            })
        }
    }
}

#[async_trait]
impl Stage for Validate {
    fn metadata(&self) -> StageMetadata {
        let meta = StageMetadata::new(&self.name, StageKind::Validate).with_id(self.predicate.id());
        if self.message.is_empty() {
            meta
        } else {
            meta.with_description(&self.message)
        }
    }

    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        self.run(ctx).await.into()
    }
}
