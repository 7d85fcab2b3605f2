use crate::context::RequestContext;
use crate::metadata::{StageKind, StageMetadata};
use crate::stage::{Stage, StepResult};
use crate::telemetry::Traced;
use async_trait::async_trait;
use tracing::Instrument;
use uuid::Uuid;

/// An ordered chain of stages.
///
/// Built once, then shared (e.g. behind an `Arc`) by every request; each run
/// gets its own [`RequestContext`].
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            stages: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Appends a stage. Stages run in the order they are added.
    pub fn add_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(Traced::new(stage)));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> Vec<StageMetadata> {
        self.stages.iter().map(|stage| stage.metadata()).collect()
    }

    /// Structural description of the pipeline and its stages.
    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "stages": self.stages(),
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stage_count", &self.stages.len())
            .finish()
    }
}

#[async_trait]
impl Stage for Pipeline {
    fn metadata(&self) -> StageMetadata {
        let meta = StageMetadata::new(&self.name, StageKind::Pipeline);
        match &self.description {
            Some(desc) => meta.with_description(desc),
            None => meta,
        }
    }

    /// Runs the stages in order until one terminates or fails.
    async fn execute(&self, ctx: &mut RequestContext) -> StepResult {
        let span = tracing::info_span!("Pipeline", remix.pipeline = %self.name);

        async move {
            for stage in &self.stages {
                match stage.execute(ctx).await {
                    StepResult::Next => continue,
                    StepResult::Terminate => return StepResult::Terminate,
                    StepResult::Error(e) => return StepResult::Error(e),
                }
            }
            StepResult::Next
        }
        .instrument(span)
        .await
    }
}
